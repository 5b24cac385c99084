//! # repo-migrate
//!
//! Migrates the history of a legacy version-control repository into a target
//! repository. The work runs as a pipeline of tasks on a single-worker
//! engine with cooperative abort, continuations, progress polling, and
//! failure aggregation.

pub mod cmdline;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod monitor;
pub mod params;
pub mod pipeline;
pub mod processor;
pub mod runlog;
pub mod telemetry;
