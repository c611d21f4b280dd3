//! Shared terminal formatting for command output.

use stackup_core::ReadyServices;
use stackup_runtime::ServiceLogEntry;

/// Truncate to `max_len` characters, marking the cut with `...`.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Print a horizontal separator line.
pub fn print_separator(width: usize) {
    println!("{}", "-".repeat(width));
}

/// Print the services handed to the test phase.
pub fn print_ready(ready: &ReadyServices) {
    println!("{} service(s) ready:", ready.len());
    for service in ready {
        println!(
            "  {:<20} {:<28} pid {:<8} ready after {:.1}s",
            truncate_string(&service.name, 19),
            service.base_url,
            service
                .pid
                .map_or_else(|| "-".to_string(), |pid| pid.to_string()),
            service.ready_after.as_secs_f64()
        );
    }
}

/// Print buffered output of a service that failed to come up.
pub fn print_log_tail(service: &str, entries: &[ServiceLogEntry]) {
    if entries.is_empty() {
        eprintln!("(no output captured from {service})");
        return;
    }
    eprintln!("--- last {} line(s) from {service} ---", entries.len());
    for entry in entries {
        eprintln!("[{}] {}", entry.stream.as_str(), entry.line);
    }
    eprintln!("--- end of {service} output ---");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("backend", 10), "backend");
        assert_eq!(truncate_string("llama-server-large", 10), "llama-s...");
        assert_eq!(truncate_string("ñandú-service", 6), "ñan...");
    }
}
