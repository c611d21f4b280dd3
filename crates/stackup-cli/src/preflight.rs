//! Preflight gating: decide whether a plan can run on this machine.
//!
//! Unmet preflight is not an error. Integration stacks that need a local
//! model or a GPU are skipped cleanly on machines that do not have them.

use std::path::Path;

use crate::plan::{Preflight, resolve_path};

/// Value `enabled_env` must have for the run to proceed.
pub const ENABLED_VALUE: &str = "1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreflightStatus {
    Ready,
    /// Every unmet requirement, in declaration order.
    Skipped(Vec<String>),
}

impl PreflightStatus {
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// Evaluate `preflight` against the process environment and `PATH`.
pub fn evaluate(preflight: &Preflight, base_dir: &Path) -> PreflightStatus {
    evaluate_with(preflight, base_dir, |key| std::env::var(key).ok(), |exe| {
        which::which(exe).is_ok()
    })
}

fn evaluate_with(
    preflight: &Preflight,
    base_dir: &Path,
    env: impl Fn(&str) -> Option<String>,
    on_path: impl Fn(&str) -> bool,
) -> PreflightStatus {
    let mut reasons = Vec::new();

    if let Some(var) = &preflight.enabled_env {
        if env(var).as_deref() != Some(ENABLED_VALUE) {
            reasons.push(format!("{var} is not set to {ENABLED_VALUE}"));
        }
    }
    for exe in &preflight.executables {
        if !on_path(exe) {
            reasons.push(format!("executable '{exe}' not found on PATH"));
        }
    }
    for file in &preflight.files {
        let path = resolve_path(base_dir, file);
        if !path.exists() {
            reasons.push(format!("required file {} does not exist", path.display()));
        }
    }

    if reasons.is_empty() {
        PreflightStatus::Ready
    } else {
        PreflightStatus::Skipped(reasons)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn gate(enabled_env: Option<&str>, executables: &[&str], files: &[&str]) -> Preflight {
        Preflight {
            enabled_env: enabled_env.map(str::to_string),
            executables: executables.iter().map(ToString::to_string).collect(),
            files: files.iter().map(PathBuf::from).collect(),
        }
    }

    #[test]
    fn test_empty_preflight_is_ready() {
        let status = evaluate_with(&Preflight::default(), Path::new("."), |_| None, |_| false);
        assert_eq!(status, PreflightStatus::Ready);
    }

    #[test]
    fn test_enabled_env_must_be_exactly_one() {
        let preflight = gate(Some("RUN_LLAMA_TESTS"), &[], &[]);
        let base = Path::new(".");

        let on = evaluate_with(&preflight, base, |_| Some("1".into()), |_| true);
        assert!(on.is_ready());

        let yes = evaluate_with(&preflight, base, |_| Some("true".into()), |_| true);
        assert!(!yes.is_ready());

        let unset = evaluate_with(&preflight, base, |_| None, |_| true);
        assert_eq!(
            unset,
            PreflightStatus::Skipped(vec!["RUN_LLAMA_TESTS is not set to 1".to_string()])
        );
    }

    #[test]
    fn test_collects_every_unmet_requirement() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("models")).unwrap();
        std::fs::write(dir.path().join("models/tiny.gguf"), b"gguf").unwrap();

        let preflight = gate(
            None,
            &["llama-server", "node"],
            &["models/tiny.gguf", "models/missing.gguf"],
        );
        let status = evaluate_with(&preflight, dir.path(), |_| None, |exe| exe == "node");

        let PreflightStatus::Skipped(reasons) = &status else {
            panic!("expected skip, got {status:?}");
        };
        assert_eq!(reasons.len(), 2);
        assert!(reasons[0].contains("llama-server"));
        assert!(reasons[1].contains("missing.gguf"));
    }

    #[test]
    fn test_real_path_lookup() {
        let preflight = gate(None, &["stackup-definitely-not-installed"], &[]);
        assert!(!evaluate(&preflight, Path::new(".")).is_ready());
    }
}
