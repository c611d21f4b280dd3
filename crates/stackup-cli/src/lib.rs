//! `stackup` command-line interface.
//!
//! Plan files, preflight gating, and the test phase (HTTP checks plus an
//! optional external command) around the `stackup-runtime` sequencer.

#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Used only by the binary
use dotenvy as _;
use tracing_subscriber as _;

pub mod checks;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod parser;
pub mod plan;
pub mod preflight;
pub mod presentation;
pub mod signals;

pub use commands::{Commands, RunArgs};
pub use error::CliError;
pub use parser::Cli;
pub use plan::{Plan, PlanError};
