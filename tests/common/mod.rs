//! Common test utilities and helpers
//!
//! This module provides shared functionality used across integration tests:
//! - Binary invocation with a clean environment (via `portext_command`)
//! - Manifest fixtures (via `helpers`)

pub(crate) mod helpers;

#[allow(unused_imports)]
pub(crate) use helpers::portext_command;
