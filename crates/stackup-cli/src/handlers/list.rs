//! List command handler.
//!
//! Prints the services of a plan in startup order with their readiness
//! settings. Teardown runs in the reverse of this order.

use std::path::Path;

use crate::error::CliError;
use crate::plan::Plan;
use crate::presentation::{print_separator, truncate_string};

pub fn execute(plan_path: &Path) -> Result<(), CliError> {
    let plan = Plan::load(plan_path)?;
    let specs = plan.to_specs();

    println!(
        "{:<3} {:<20} {:<14} {:<9} {:<10} Readiness URL",
        "#", "Service", "Command", "Timeout", "Healthy"
    );
    print_separator(100);

    for (index, spec) in specs.iter().enumerate() {
        println!(
            "{:<3} {:<20} {:<14} {:<9} {:<10} {}",
            index + 1,
            truncate_string(&spec.name, 19),
            truncate_string(&spec.program, 13),
            format!("{:.1}s", spec.startup_timeout.as_secs_f64()),
            truncate_string(&spec.healthy_statuses.to_string(), 9),
            spec.readiness_url
        );
    }
    Ok(())
}
