//! Shared helpers used across pipeline stages.

pub mod logging;
