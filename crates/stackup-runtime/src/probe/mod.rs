//! Readiness probing.
//!
//! - `HttpReadinessCheck` - one read-only GET per attempt via reqwest
//! - `ReadinessProber` - the bounded retry loop around any `ReadinessCheck`

mod http;
mod prober;

pub use http::{DEFAULT_REQUEST_TIMEOUT, HttpReadinessCheck};
pub use prober::ReadinessProber;
