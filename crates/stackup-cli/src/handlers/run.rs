//! Run command handler.
//!
//! Loads a plan, applies its preflight gate, brings the stack up, runs the
//! checks and the trailing command as the test phase, and always tears the
//! stack down before returning.

use std::sync::Arc;
use std::time::Duration;

use stackup_core::{OrchestrationError, Supervisor};
use stackup_runtime::{BufferedLogSink, OrchestratorConfig, Sequencer};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::checks::{self, CheckRunner};
use crate::commands::RunArgs;
use crate::error::CliError;
use crate::plan::Plan;
use crate::preflight::{self, PreflightStatus};
use crate::presentation::{print_log_tail, print_ready};
use crate::signals::wait_for_shutdown_signal;

/// Lines of buffered output shown for a service that failed to come up.
pub const FAILURE_TAIL_LINES: usize = 20;

pub async fn execute(args: RunArgs) -> Result<(), CliError> {
    let plan = Plan::load(&args.plan)?;

    if args.no_preflight {
        info!("Preflight disabled");
    } else if let PreflightStatus::Skipped(reasons) =
        preflight::evaluate(&plan.preflight(), &plan.base_dir)
    {
        for reason in &reasons {
            warn!(%reason, "Preflight requirement not met");
        }
        println!("Skipped {}: {}", args.plan.display(), reasons.join("; "));
        return Ok(());
    }

    let mut config = OrchestratorConfig::from_env();
    if args.debug {
        config.debug_output = true;
    }
    let (supervisor, buffer) = config
        .build_supervisor()
        .map_err(|e| CliError::Config(format!("failed to build HTTP client: {e}")))?;
    let supervisor: Arc<dyn Supervisor> = Arc::new(supervisor);
    let runner = CheckRunner::new(Duration::from_secs(args.check_timeout))
        .map_err(|e| CliError::Config(format!("failed to build HTTP client: {e}")))?;

    let cancel = CancellationToken::new();
    let watcher = spawn_signal_watcher(cancel.clone());

    let checks = plan.checks.clone();
    let command = args.command.clone();
    let result = Sequencer::new(supervisor)
        .run_with_cancel(plan.to_specs(), cancel, |ready| async move {
            print_ready(&ready);
            let passed = runner.run_all(&ready, &checks).await?;
            if passed > 0 {
                println!("{passed} check(s) passed");
            }
            if !command.is_empty() {
                checks::run_command(&command, &ready).await?;
            }
            Ok(())
        })
        .await;
    watcher.abort();

    match result {
        Ok(()) => {
            println!("All services stopped");
            Ok(())
        }
        Err(e) => {
            report_failure(&e, buffer.as_deref());
            Err(e.into())
        }
    }
}

fn spawn_signal_watcher(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        match wait_for_shutdown_signal().await {
            Ok(()) => {
                warn!("Shutdown signal received, tearing down services");
                cancel.cancel();
            }
            Err(e) => warn!(error = %e, "Failed to install signal handlers"),
        }
    })
}

fn report_failure(err: &OrchestrationError, buffer: Option<&BufferedLogSink>) {
    let (Some(service), Some(buffer)) = (err.service(), buffer) else {
        return;
    };
    if err.is_startup_failure() {
        print_log_tail(service, &buffer.tail(service, FAILURE_TAIL_LINES));
    }
}
