//! Tests for command-line tokenizing and parameter loading.

use std::path::PathBuf;
use std::time::Duration;

use repo_migrate::cmdline::{CommandLine, CommandLineParameter};
use repo_migrate::error::Error;
use repo_migrate::params::{self, ProcessParameters};

fn load(args: &[&str]) -> Result<ProcessParameters, Error> {
    let mut params = ProcessParameters::default();
    params.load(&CommandLine::parse(args))?;
    Ok(params)
}

// ---------------------------------------------------------------------------
// Tokenizing
// ---------------------------------------------------------------------------

#[test]
fn double_dash_with_value() {
    let p = CommandLineParameter::parse("--foo:bar");
    assert_eq!(p.flag, "--");
    assert_eq!(p.name, "foo");
    assert_eq!(p.value, "bar");
    assert!(p.is_flagged());
}

#[test]
fn single_dash_without_value() {
    let p = CommandLineParameter::parse("-x");
    assert_eq!(p.flag, "-");
    assert_eq!(p.name, "x");
    assert_eq!(p.value, "");
}

#[test]
fn slash_flag() {
    let p = CommandLineParameter::parse("/target:C:\\out");
    assert_eq!(p.flag, "/");
    assert_eq!(p.name, "target");
    assert_eq!(p.value, "C:\\out", "only the first colon splits");
}

#[test]
fn bare_value_is_not_flagged() {
    let p = CommandLineParameter::parse("plainvalue");
    assert_eq!(p.flag, "");
    assert_eq!(p.name, "");
    assert_eq!(p.value, "plainvalue");
    assert!(!p.is_flagged());
}

#[test]
fn colon_right_after_flag_stays_in_name() {
    let p = CommandLineParameter::parse("-:x");
    assert_eq!(p.name, ":x");
    assert_eq!(p.value, "");
}

#[test]
fn help_tokens_set_help_requested() {
    let cases: [&[&str]; 4] = [&["/?"], &["--help"], &["-?"], &["src", "/help"]];
    for args in cases {
        let cmdline = CommandLine::parse(args);
        assert!(cmdline.help_requested(), "{args:?}");
    }
    assert!(!CommandLine::parse(["?"]).help_requested(), "bare ? is a value");
    assert!(!CommandLine::parse(["--source:x"]).help_requested());
}

// ---------------------------------------------------------------------------
// Re-serializing
// ---------------------------------------------------------------------------

#[test]
fn display_round_trips_the_three_shapes() {
    assert_eq!(CommandLineParameter::parse("value").to_string(), "value");
    assert_eq!(CommandLineParameter::parse("/auto").to_string(), "/auto");
    assert_eq!(
        CommandLineParameter::parse("--source:dir").to_string(),
        "--source:dir"
    );
}

#[test]
fn display_quotes_values_with_spaces() {
    let p = CommandLineParameter::parse("--name:value with space");
    assert_eq!(p.value, "value with space");
    assert_eq!(p.to_string(), "\"--name:value with space\"");

    let bare = CommandLineParameter::from("two words");
    assert_eq!(bare.to_string(), "\"two words\"");
}

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[test]
fn first_occurrence_wins_but_all_are_kept() {
    let cmdline = CommandLine::parse(["--project:$/a", "first", "-project:$/b", "second"]);

    assert_eq!(cmdline.get("project").unwrap().value, "$/a");
    assert_eq!(cmdline.flag_count(), 1);
    assert_eq!(cmdline.all().len(), 4);
    assert_eq!(cmdline.all()[2].value, "$/b");
    assert_eq!(cmdline.values(), &["first".to_string(), "second".to_string()]);
}

#[test]
fn empty_command_line() {
    let cmdline = CommandLine::parse(Vec::<String>::new());
    assert!(cmdline.is_empty());
    assert!(!cmdline.help_requested());
    assert!(!cmdline.contains("source"));
    assert_eq!(cmdline.names().count(), 0);
}

// ---------------------------------------------------------------------------
// Process parameters
// ---------------------------------------------------------------------------

#[test]
fn defaults() {
    let p = ProcessParameters::default();
    assert_eq!(p.project, params::DEFAULT_PROJECT);
    assert_eq!(p.email_domain, params::DEFAULT_EMAIL_DOMAIN);
    assert_eq!(p.any_comment_threshold().unwrap(), Duration::from_secs(30));
    assert_eq!(p.same_comment_threshold().unwrap(), Duration::from_secs(600));
    assert!(!p.auto_execute);
    assert!(!p.ignore_errors);
}

#[test]
fn load_reads_every_flag() {
    let p = load(&[
        "--source:hist",
        "/project:$/proj",
        "-exclude:*.bak;$/proj/tmp",
        "--target:out",
        "--emaildomain:example.com",
        "--comment:Imported change",
        "--log:run.log",
        "/ignoreerrors",
        "--anycomment:12.5",
        "--samecomment:120",
        "/auto",
    ])
    .unwrap();

    assert_eq!(p.source_dir, Some(PathBuf::from("hist")));
    assert_eq!(p.project, "$/proj");
    assert_eq!(p.exclude_paths.as_deref(), Some("*.bak;$/proj/tmp"));
    assert_eq!(p.target_dir, Some(PathBuf::from("out")));
    assert_eq!(p.email_domain, "example.com");
    assert_eq!(p.default_comment, "Imported change");
    assert_eq!(p.log_file, Some(PathBuf::from("run.log")));
    assert!(p.ignore_errors);
    assert_eq!(p.any_comment_threshold().unwrap(), Duration::from_millis(12_500));
    assert_eq!(p.same_comment_seconds, 120.0);
    assert!(p.auto_execute);
}

#[test]
fn positional_values_fill_source_then_target() {
    let p = load(&["hist", "out"]).unwrap();
    assert_eq!(p.source_dir, Some(PathBuf::from("hist")));
    assert_eq!(p.target_dir, Some(PathBuf::from("out")));

    let p = load(&["--source:hist", "out"]).unwrap();
    assert_eq!(p.source_dir, Some(PathBuf::from("hist")));
    assert_eq!(p.target_dir, Some(PathBuf::from("out")));

    assert!(matches!(load(&["a", "b", "c"]), Err(Error::Config(_))));
}

#[test]
fn switches_can_be_turned_off() {
    let mut p = ProcessParameters {
        auto_execute: true,
        ignore_errors: true,
        ..ProcessParameters::default()
    };
    p.load(&CommandLine::parse(["/auto:false", "--ignoreerrors:no"]))
        .unwrap();
    assert!(!p.auto_execute);
    assert!(!p.ignore_errors);

    assert!(matches!(load(&["/auto:maybe"]), Err(Error::Config(_))));
}

#[test]
fn invalid_parameters_are_rejected() {
    assert!(matches!(load(&["--bogus:1"]), Err(Error::Config(_))));
    assert!(matches!(load(&["--source"]), Err(Error::Config(_))));
    assert!(matches!(load(&["--anycomment:-1"]), Err(Error::Config(_))));
    assert!(matches!(load(&["--samecomment:soon"]), Err(Error::Config(_))));
    assert!(matches!(load(&["--anycomment:1e30"]), Err(Error::Config(_))));
    assert!(matches!(load(&["--samecomment:inf"]), Err(Error::Config(_))));
}

#[test]
fn validate_rejects_out_of_range_windows() {
    let mut p = load(&["hist"]).unwrap();
    p.same_comment_seconds = 1e30;
    assert!(matches!(p.validate(), Err(Error::Config(_))));
    assert!(p.same_comment_threshold().is_err());

    p.same_comment_seconds = f64::NAN;
    assert!(matches!(p.validate(), Err(Error::Config(_))));
}

#[test]
fn help_skips_loading() {
    let p = load(&["--bogus", "/?"]).unwrap();
    assert_eq!(p, ProcessParameters::default());
    assert!(ProcessParameters::help_message().contains("emaildomain"));
}

#[test]
fn validate_requires_source() {
    assert!(matches!(
        ProcessParameters::default().validate(),
        Err(Error::Config(_))
    ));
    assert!(load(&["hist"]).unwrap().validate().is_ok());

    let mut p = load(&["hist"]).unwrap();
    p.project = "  ".to_string();
    assert!(p.validate().is_err());
}
