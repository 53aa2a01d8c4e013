//! Configuration file management
//!
//! Reads portext's TOML configuration from project and user locations and
//! layers environment variables and command-line overrides on top.
//!
//! Priority (later wins): config file -> `PORTEXT_*` variables -> CLI flags.

use crate::env_vars;
use crate::extensions::{
    CapabilityMarker, DEFAULT_CAPABILITY_MACRO, DEFAULT_TOOLKIT_PATH, ProbeError, TargetMode,
    TargetSelector,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Project-local config file name
pub const LOCAL_CONFIG_FILE: &str = ".portext.toml";

/// Tool configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// CUDA toolkit path to probe
    #[serde(default)]
    pub toolkit_path: Option<String>,

    /// How to choose the build target
    #[serde(default)]
    pub target: Option<TargetMode>,

    /// Preprocessor macro used as the capability marker
    #[serde(default)]
    pub capability_macro: Option<String>,
}

impl Config {
    /// Load configuration from TOML files.
    /// Priority: ./.portext.toml -> ~/.config/portext/config.toml
    ///
    /// # Errors
    ///
    /// Returns an error if an existing config file cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_with_options(None, false)
    }

    /// Load configuration with custom options.
    ///
    /// # Arguments
    /// * `custom_path` - Optional custom path to config file (overrides defaults)
    /// * `skip_rc` - If true, skip loading config files (return default config)
    ///
    /// # Errors
    ///
    /// Returns an error if config file reading or parsing fails.
    pub fn load_with_options(custom_path: Option<&str>, skip_rc: bool) -> Result<Self> {
        if skip_rc {
            return Ok(Self::default());
        }

        if let Some(path) = custom_path {
            return Self::load_from(path);
        }

        let local = Path::new(LOCAL_CONFIG_FILE);
        if local.exists() {
            return Self::load_from(local);
        }

        if let Some(config_dir) = Self::user_config_dir() {
            let config_path = config_dir.join("config.toml");
            if config_path.exists() {
                return Self::load_from(&config_path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid config TOML.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Parse configuration TOML
    ///
    /// # Errors
    ///
    /// Returns an error on malformed TOML or unknown keys.
    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Configuration taken from `PORTEXT_*` environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if `PORTEXT_TARGET` is not a known mode.
    pub fn from_env() -> Result<Self> {
        let target = env_vars::target()
            .map(|value| value.parse::<TargetMode>())
            .transpose()
            .with_context(|| format!("Invalid {}", env_vars::TARGET))?;

        Ok(Self {
            toolkit_path: env_vars::toolkit_path(),
            target,
            capability_macro: env_vars::capability_macro(),
        })
    }

    /// Merge another config into this one (other takes precedence for set values)
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        if other.toolkit_path.is_some() {
            self.toolkit_path = other.toolkit_path;
        }
        if other.target.is_some() {
            self.target = other.target;
        }
        if other.capability_macro.is_some() {
            self.capability_macro = other.capability_macro;
        }
        self
    }

    /// Toolkit path to probe, defaulting to `/usr/local/cuda`
    #[must_use]
    pub fn toolkit_path(&self) -> PathBuf {
        PathBuf::from(
            self.toolkit_path
                .as_deref()
                .unwrap_or(DEFAULT_TOOLKIT_PATH),
        )
    }

    /// Target mode, defaulting to `auto`
    #[must_use]
    pub fn target_mode(&self) -> TargetMode {
        self.target.unwrap_or_default()
    }

    /// Capability marker, defaulting to `PORTABLE_EXTENSION_CUDA_ENABLED`
    #[must_use]
    pub fn capability_marker(&self) -> CapabilityMarker {
        CapabilityMarker::new(
            self.capability_macro
                .as_deref()
                .unwrap_or(DEFAULT_CAPABILITY_MACRO),
        )
    }

    /// Build the selector for this invocation (probes at most once)
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError`] if probing the toolkit path fails.
    pub fn selector(&self) -> Result<TargetSelector, ProbeError> {
        TargetSelector::from_mode(
            self.target_mode(),
            &self.toolkit_path(),
            self.capability_marker(),
        )
    }

    fn user_config_dir() -> Option<PathBuf> {
        if let Some(xdg_config) = env_vars::xdg_config_home() {
            return Some(PathBuf::from(xdg_config).join("portext"));
        }

        dirs::home_dir().map(|home| home.join(".config").join("portext"))
    }
}
