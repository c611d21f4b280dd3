//! Main CLI parser and top-level argument handling.

use clap::Parser;

use crate::commands::Commands;

/// Bring up a stack of services in order, test it, and tear it down.
#[derive(Parser)]
#[command(name = "stackup")]
#[command(about = "Run service stacks under test with ordered startup and guaranteed teardown")]
#[command(version)]
pub struct Cli {
    /// Enable verbose/debug logging
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::path::PathBuf;

    #[test]
    fn test_cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_with_trailing_command() {
        let cli = Cli::parse_from([
            "stackup", "run", "--verbose", "stack.toml", "--", "npx", "vitest", "run",
        ]);
        assert!(cli.verbose);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.plan, PathBuf::from("stack.toml"));
        assert_eq!(args.command, vec!["npx", "vitest", "run"]);
        assert!(!args.debug);
    }

    #[test]
    fn test_check_and_list() {
        let cli = Cli::parse_from(["stackup", "check", "stack.toml"]);
        assert!(matches!(cli.command, Commands::Check { .. }));

        let cli = Cli::parse_from(["stackup", "-v", "list", "stack.toml"]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::List { .. }));
    }
}
