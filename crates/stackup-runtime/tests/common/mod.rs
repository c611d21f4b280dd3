//! Shared helpers for stackup-runtime integration tests.

pub mod fakes;
