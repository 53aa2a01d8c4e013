//! Env Command
//!
//! Displays environment information useful for debugging target selection:
//! portext version, platform, effective configuration, the toolkit probe
//! result and the `PORTEXT_*` variables.

use anyhow::Result;
use portext::{Config, detect_toolkit, env_vars};
use std::env;

use crate::ConfigArgs;

/// Display environment information
pub(crate) fn run(args: &ConfigArgs) -> Result<()> {
    let config = super::load_config(args, Config::default())?;

    println!("## Environment");
    println!();
    println!("Portext    {}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("## Platform");
    println!();
    println!("OS         {}", env::consts::OS);
    println!("Arch       {}", env::consts::ARCH);
    println!("Family     {}", env::consts::FAMILY);
    println!();

    println!("## Configuration");
    println!();
    let toolkit_path = config.toolkit_path();
    println!("Toolkit    {}", toolkit_path.display());
    match detect_toolkit(&toolkit_path) {
        Ok(true) => println!("Installed  yes"),
        Ok(false) => println!("Installed  no"),
        Err(e) => println!("Installed  unknown ({e})"),
    }
    println!("Mode       {}", config.target_mode());
    println!("Marker     {}", config.capability_marker().macro_name());
    println!();

    println!("## Environment Variables");
    println!();
    for var in env_vars::ALL {
        if let Ok(value) = env::var(var) {
            println!("{var:<26} {value}");
        }
    }

    Ok(())
}
