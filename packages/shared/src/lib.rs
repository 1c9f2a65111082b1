//! Shared utilities for Nagaya packages.

pub mod logger;
pub mod time;
