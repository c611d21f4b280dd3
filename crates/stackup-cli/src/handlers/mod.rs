//! Command handlers.
//!
//! Each handler loads the plan, delegates to `stackup-runtime`, and formats
//! the result for the terminal. Failures are returned as [`crate::CliError`]
//! so `main` can pick the exit code.

pub mod check;
pub mod list;
pub mod run;
