use std::time::Duration;

use repo_migrate::config::Config;

// Env vars are process-wide, so every case lives in one test.
#[test]
fn config_from_env() {
    unsafe {
        std::env::remove_var("OTEL_ENDPOINT");
        std::env::remove_var("LOG_LEVEL");
        std::env::remove_var("MIGRATE_POLL_INTERVAL_MS");
    }
    let config = Config::from_env().unwrap();
    assert_eq!(config.otel_endpoint, None);
    assert_eq!(config.log_level, "info");
    assert_eq!(config.poll_interval, Duration::from_millis(500));

    unsafe {
        std::env::set_var("OTEL_ENDPOINT", "http://localhost:4317");
        std::env::set_var("LOG_LEVEL", "repo_migrate=debug");
        std::env::set_var("MIGRATE_POLL_INTERVAL_MS", "250");
    }
    let config = Config::from_env().unwrap();
    assert_eq!(config.otel_endpoint.as_deref(), Some("http://localhost:4317"));
    assert_eq!(config.log_level, "repo_migrate=debug");
    assert_eq!(config.poll_interval, Duration::from_millis(250));

    // Blank endpoint means no export.
    unsafe {
        std::env::set_var("OTEL_ENDPOINT", "  ");
    }
    assert_eq!(Config::from_env().unwrap().otel_endpoint, None);

    for bad in ["0", "-5", "soon"] {
        unsafe {
            std::env::set_var("MIGRATE_POLL_INTERVAL_MS", bad);
        }
        assert!(Config::from_env().is_err(), "accepted {bad:?}");
    }

    // Clean up
    unsafe {
        std::env::remove_var("OTEL_ENDPOINT");
        std::env::remove_var("LOG_LEVEL");
        std::env::remove_var("MIGRATE_POLL_INTERVAL_MS");
    }
}

#[test]
fn config_default_matches_unset_env() {
    let config = Config::default();
    assert!(config.otel_endpoint.is_none());
    assert_eq!(config.log_level, "info");
    assert_eq!(config.poll_interval, Duration::from_millis(500));
}
