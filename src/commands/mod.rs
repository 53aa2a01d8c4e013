//! Subcommand implementations

pub(crate) mod completion;
pub(crate) mod detect;
pub(crate) mod env;
pub(crate) mod resolve;

use crate::ConfigArgs;
use anyhow::Result;
use portext::Config;

/// Effective configuration: config file, then `PORTEXT_*`, then CLI flags
pub(crate) fn load_config(args: &ConfigArgs, cli: Config) -> Result<Config> {
    let file = Config::load_with_options(args.config.as_deref(), args.no_config)?;
    let cli = Config {
        toolkit_path: args.toolkit_path.clone(),
        ..Config::default()
    }
    .merge(cli);

    Ok(file.merge(Config::from_env()?).merge(cli))
}
