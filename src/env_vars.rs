//! `PORTEXT_*` environment variable handling.

use std::env;

/// Override for the CUDA toolkit path
pub const TOOLKIT_PATH: &str = "PORTEXT_TOOLKIT_PATH";
/// Target mode (`auto`, `accelerated`, `host-only`)
pub const TARGET: &str = "PORTEXT_TARGET";
/// Override for the capability macro name
pub const CAPABILITY_MACRO: &str = "PORTEXT_CAPABILITY_MACRO";
/// Enable debug output
pub const DEBUG: &str = "PORTEXT_DEBUG";

/// Every variable read by portext, for `portext env`
pub const ALL: [&str; 4] = [TOOLKIT_PATH, TARGET, CAPABILITY_MACRO, DEBUG];

// Unset and empty are treated the same
fn non_empty(var: &str) -> Option<String> {
    env::var(var).ok().filter(|s| !s.trim().is_empty())
}

/// Interpret a boolean flag value ("1", "true", "yes", case-insensitive).
#[must_use]
pub fn parse_flag(value: &str) -> bool {
    let value = value.trim().to_lowercase();
    value == "1" || value == "true" || value == "yes"
}

/// Get the toolkit path override.
pub fn toolkit_path() -> Option<String> {
    non_empty(TOOLKIT_PATH)
}

/// Get the raw target mode string.
pub fn target() -> Option<String> {
    non_empty(TARGET)
}

/// Get the capability macro override.
pub fn capability_macro() -> Option<String> {
    non_empty(CAPABILITY_MACRO)
}

/// Check if debug output is requested.
pub fn debug() -> bool {
    non_empty(DEBUG).is_some_and(|s| parse_flag(&s))
}

/// Get `XDG_CONFIG_HOME`.
pub fn xdg_config_home() -> Option<String> {
    non_empty("XDG_CONFIG_HOME")
}
