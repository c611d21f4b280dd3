//! CLI entry point.

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use stackup_cli::{Cli, CliError, Commands, handlers};

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn dispatch(command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Run(args) => handlers::run::execute(args).await,
        Commands::Check { plan } => handlers::check::execute(&plan),
        Commands::List { plan } => handlers::list::execute(&plan),
    }
}

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = dispatch(cli.command).await {
        error!(error = %e, "stackup failed");
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }
}
