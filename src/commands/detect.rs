//! Detect command
//!
//! Reports whether the CUDA toolkit is installed and which target a build
//! would use.

use anyhow::{Context, Result};
use portext::{Config, detect_toolkit};

use crate::ConfigArgs;

/// Probe the toolkit path and print the outcome
pub(crate) fn run(args: &ConfigArgs) -> Result<()> {
    let config = super::load_config(args, Config::default())?;
    let toolkit_path = config.toolkit_path();

    let present = detect_toolkit(&toolkit_path).context("Cannot determine the build target")?;

    if present {
        println!("CUDA toolkit found at {}", toolkit_path.display());
    } else {
        println!("CUDA toolkit not found at {}", toolkit_path.display());
    }

    let target = config.target_mode().target_for(present);
    println!(
        "Target: {target} ({}, {} mode)",
        target.description(),
        config.target_mode()
    );

    Ok(())
}
