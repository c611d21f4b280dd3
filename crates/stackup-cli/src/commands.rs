//! Available subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

#[derive(Subcommand)]
pub enum Commands {
    /// Start every service in the plan, run its checks, then tear down
    Run(RunArgs),

    /// Validate a plan and evaluate its preflight without starting anything
    Check {
        /// Path to the plan file
        plan: PathBuf,
    },

    /// Print the startup order of a plan
    List {
        /// Path to the plan file
        plan: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Path to the plan file
    pub plan: PathBuf,

    /// Show service output as it happens (also STACKUP_DEBUG=1 or DEBUG=1)
    #[arg(long)]
    pub debug: bool,

    /// Ignore the plan's preflight gate
    #[arg(long)]
    pub no_preflight: bool,

    /// Per-request timeout for checks, in seconds
    #[arg(long, default_value_t = 60)]
    pub check_timeout: u64,

    /// Command to run once all services and checks pass (after `--`)
    #[arg(last = true)]
    pub command: Vec<String>,
}
