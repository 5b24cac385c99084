//! repo-migrate CLI: runs a migration in batch or interactive mode.

use std::io::Write as _;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use repo_migrate::cmdline::CommandLine;
use repo_migrate::config::Config;
use repo_migrate::monitor;
use repo_migrate::params::ProcessParameters;
use repo_migrate::processor::Processor;
use repo_migrate::telemetry::{TelemetryConfig, init_telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "repo-migrate".to_string(),
        default_level: config.log_level.clone(),
    })?;

    let cmdline = CommandLine::parse(std::env::args().skip(1));
    let mut params = ProcessParameters::default();
    if let Err(e) = params.load(&cmdline) {
        eprintln!("Command line error: {e}");
        eprintln!("Run with /? for usage.");
        return Ok(ExitCode::from(2));
    }

    if cmdline.help_requested() {
        println!("{}", ProcessParameters::help_message());
        return Ok(ExitCode::SUCCESS);
    }

    let batch = params.auto_execute;
    let processor = Processor::new(params)?;
    if batch {
        cmd_batch(processor).await
    } else {
        cmd_interactive(processor, config.poll_interval).await
    }
}

async fn cmd_batch(mut processor: Processor) -> anyhow::Result<ExitCode> {
    let processor = tokio::task::spawn_blocking(move || -> anyhow::Result<Processor> {
        processor.process()?;
        Ok(processor)
    })
    .await??;

    let progress = processor.progress();
    println!("{progress}");
    Ok(report_failures(&processor))
}

async fn cmd_interactive(mut processor: Processor, poll: Duration) -> anyhow::Result<ExitCode> {
    processor.set_interactive(true);
    processor.process()?;

    let processor = Arc::new(processor);
    let ctrl = Arc::clone(&processor);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nAbort requested; finishing the current task...");
            ctrl.abort();
        }
    });

    let mut stdout = std::io::stdout();
    monitor::watch(&processor, poll, |progress| {
        // Pad so a shorter line fully covers the previous one.
        let line = progress.to_string();
        let _ = write!(stdout, "\r{line:<100}");
        let _ = stdout.flush();
    })
    .await;
    println!();

    Ok(report_failures(&processor))
}

fn report_failures(processor: &Processor) -> ExitCode {
    let failures = processor.take_failures();
    if failures.is_empty() {
        println!("Migration finished.");
        return ExitCode::SUCCESS;
    }

    eprintln!("{} task(s) failed:", failures.len());
    for failure in &failures {
        eprintln!("{}", failure.report());
    }
    ExitCode::FAILURE
}
