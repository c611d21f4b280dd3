//! Integration tests for the run, check and list handlers on real plan files.
//!
//! Services are `sleep` processes whose readiness URL and HTTP surface are an
//! axum server inside the test, so checks run against real responses.
#![cfg(unix)]

use std::path::{Path, PathBuf};

use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use stackup_cli::{CliError, RunArgs, handlers};
use tempfile::TempDir;
use tokio::net::TcpListener;

async fn serve_backend() -> u16 {
    let router = Router::new()
        .route(
            "/health",
            get(|| async { Json(json!({ "status": "ok", "provider": "local" })) }),
        )
        .route(
            "/suggest",
            post(|Json(_): Json<Value>| async {
                Json(json!({ "short": ["Yes", "Sure", "See you then"], "long": "Yes, 7 works." }))
            }),
        );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    port
}

fn write_plan(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("stack.toml");
    std::fs::write(&path, content).unwrap();
    path
}

fn run_args(plan: &Path, command: &[&str]) -> RunArgs {
    RunArgs {
        plan: plan.to_path_buf(),
        debug: false,
        no_preflight: false,
        check_timeout: 5,
        command: command.iter().map(ToString::to_string).collect(),
    }
}

fn backend_plan(port: u16, expected_provider: &str) -> String {
    format!(
        r#"
[[service]]
name = "backend"
command = "sleep"
args = ["30"]
readiness_url = "http://127.0.0.1:{port}/health"
poll_interval_ms = 100
grace_period_ms = 500

[[check]]
service = "backend"
path = "/health"
expect_json = {{ status = "ok", provider = "{expected_provider}" }}

[[check]]
service = "backend"
method = "POST"
path = "/suggest"
body = {{ text = "Are we still on for 7?", tone = "polite" }}
"#
    )
}

#[tokio::test]
async fn test_run_passes_checks_and_command() {
    let port = serve_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let plan = write_plan(&dir, &backend_plan(port, "local"));

    let script = format!(r#"test "$STACKUP_BACKEND_PORT" = "{port}""#);
    handlers::run::execute(run_args(&plan, &["sh", "-c", &script]))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_failing_check_is_test_failure() {
    let port = serve_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let plan = write_plan(&dir, &backend_plan(port, "openai"));

    let err = handlers::run::execute(run_args(&plan, &[])).await.unwrap_err();
    assert!(matches!(err, CliError::TestFailure(_)));
    assert_eq!(err.exit_code(), 1);
    assert!(err.to_string().contains("provider"));
}

#[tokio::test]
async fn test_unmet_preflight_skips_without_starting() {
    let dir = tempfile::tempdir().unwrap();
    // Would fail to spawn if the gate let it through.
    let plan = write_plan(
        &dir,
        r#"
[preflight]
enabled_env = "STACKUP_TEST_GATE_NEVER_SET"

[[service]]
name = "model"
command = "/nonexistent/llama-server"
readiness_url = "http://127.0.0.1:9/completion"
"#,
    );

    handlers::run::execute(run_args(&plan, &[])).await.unwrap();

    let mut forced = run_args(&plan, &[]);
    forced.no_preflight = true;
    let err = handlers::run::execute(forced).await.unwrap_err();
    assert!(matches!(err, CliError::Spawn(_)));
    assert_eq!(err.exit_code(), 71);
}

#[test]
fn test_check_and_list_accept_valid_plan() {
    let dir = tempfile::tempdir().unwrap();
    let plan = write_plan(&dir, &backend_plan(3000, "local"));

    handlers::check::execute(&plan).unwrap();
    handlers::list::execute(&plan).unwrap();
}

#[test]
fn test_invalid_plan_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let plan = write_plan(
        &dir,
        r#"
[[service]]
name = "backend"
command = "node"
readiness_url = "ftp://localhost/health"
"#,
    );

    let err = handlers::check::execute(&plan).unwrap_err();
    assert_eq!(err.exit_code(), 78);
}

#[test]
fn test_bundled_demo_plan_is_valid() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/suggest-stack.toml");
    let plan = stackup_cli::Plan::load(&path).unwrap();

    let names: Vec<&str> = plan.services.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["llama-server", "local-model", "backend"]);
    assert!(plan.to_specs()[0].healthy_statuses.contains(405));
    assert_eq!(plan.checks.len(), 4);
}
