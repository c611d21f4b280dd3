//! Check command handler: validate a plan and report its preflight status.

use std::path::Path;

use crate::error::CliError;
use crate::plan::Plan;
use crate::preflight::{self, PreflightStatus};

pub fn execute(plan_path: &Path) -> Result<(), CliError> {
    let plan = Plan::load(plan_path)?;
    println!(
        "{}: {} service(s), {} check(s)",
        plan_path.display(),
        plan.services.len(),
        plan.checks.len()
    );

    match preflight::evaluate(&plan.preflight(), &plan.base_dir) {
        PreflightStatus::Ready => println!("Preflight: ready to run"),
        PreflightStatus::Skipped(reasons) => {
            println!("Preflight: a run would be skipped");
            for reason in reasons {
                println!("  - {reason}");
            }
        }
    }
    Ok(())
}
