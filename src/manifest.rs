//! Build manifest parsing
//!
//! A `portext.toml` manifest declares the native extension modules of a
//! package, the way `ext_modules` does in a `setup.py`:
//!
//! ```toml
//! [package]
//! name = "lietorch"
//! version = "0.2"
//!
//! [[module]]
//! name = "lietorch_backends"
//! include_dirs = ["lietorch/include", "/usr/include/eigen3"]
//! sources = [
//!     "lietorch/src/lietorch.cpp",
//!     "lietorch/src/lietorch_gpu.cu",
//!     { path = "lietorch/src/tables.inc", kind = "device" },
//! ]
//!
//! [module.compile_args]
//! host = ["-O2", "-std=c++17"]
//! device = ["-O2", "-std=c++17", "-gencode=arch=compute_60,code=sm_60"]
//! ```
//!
//! Relative paths are resolved against the manifest's directory.

use crate::extensions::{CompilerRole, ConfigurationError, ModuleSpec, SourceFile, SourceKind};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Manifest file name
pub const MANIFEST_FILE: &str = "portext.toml";

/// Errors that can occur while loading a manifest
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Failed to read manifest at {path}: {source}")]
    ReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse manifest: {0}")]
    ParseError(Box<toml::de::Error>),

    #[error("Extension module {0} is declared more than once")]
    DuplicateModule(String),
}

/// `[package]` table
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PackageInfo {
    /// Package name
    pub name: String,
    /// Package version
    #[serde(default)]
    pub version: Option<String>,
    /// Short description
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    #[serde(default)]
    package: Option<PackageInfo>,
    #[serde(default, rename = "module")]
    modules: Vec<RawModule>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawModule {
    name: String,
    #[serde(default)]
    sources: Vec<RawSource>,
    #[serde(default)]
    include_dirs: Vec<PathBuf>,
    #[serde(default)]
    compile_args: Option<RawCompileArgs>,
}

// Either "path/to/file.cu" or { path = "...", kind = "device" }
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawSource {
    Path(PathBuf),
    Tagged { path: PathBuf, kind: SourceKind },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCompileArgs {
    #[serde(default, alias = "cxx")]
    host: Option<Vec<String>>,
    #[serde(default, alias = "nvcc")]
    device: Option<Vec<String>>,
}

/// A parsed `portext.toml`
#[derive(Debug, Clone)]
pub struct Manifest {
    /// Package metadata, if declared
    pub package: Option<PackageInfo>,
    root: PathBuf,
    modules: Vec<RawModule>,
}

impl Manifest {
    /// Load a manifest from disk
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or declares a
    /// module name twice.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = fs::read_to_string(path).map_err(|e| ManifestError::ReadError {
            path: path.display().to_string(),
            source: e,
        })?;

        let root = path.parent().unwrap_or_else(|| Path::new(""));
        Self::parse(&content, root)
    }

    /// Parse manifest content, resolving relative paths against `root`
    ///
    /// # Errors
    ///
    /// Returns an error on malformed TOML or duplicate module names.
    pub fn parse(content: &str, root: &Path) -> Result<Self, ManifestError> {
        let raw: RawManifest =
            toml::from_str(content).map_err(|e| ManifestError::ParseError(Box::new(e)))?;

        let mut seen = HashSet::new();
        for module in &raw.modules {
            if !seen.insert(module.name.as_str()) {
                return Err(ManifestError::DuplicateModule(module.name.clone()));
            }
        }

        Ok(Self {
            package: raw.package,
            root: root.to_path_buf(),
            modules: raw.modules,
        })
    }

    /// Directory relative paths are resolved against
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Declared module names, in manifest order
    #[must_use]
    pub fn module_names(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name.as_str()).collect()
    }

    /// Build the module declarations
    ///
    /// Each module is validated on its own, so a module with missing compile
    /// arguments does not hide the others.
    #[must_use]
    pub fn module_specs(&self) -> Vec<Result<ModuleSpec, ConfigurationError>> {
        self.modules
            .iter()
            .map(|module| self.module_spec(module))
            .collect()
    }

    fn module_spec(&self, module: &RawModule) -> Result<ModuleSpec, ConfigurationError> {
        let missing = |role| ConfigurationError::MissingFlags {
            module: module.name.clone(),
            role,
        };

        let args = module
            .compile_args
            .as_ref()
            .ok_or_else(|| missing(CompilerRole::Host))?;
        let host_flags = args
            .host
            .clone()
            .ok_or_else(|| missing(CompilerRole::Host))?;
        let device_flags = args
            .device
            .clone()
            .ok_or_else(|| missing(CompilerRole::Device))?;

        let sources = module
            .sources
            .iter()
            .map(|source| match source {
                RawSource::Path(path) => SourceFile::classify(self.rooted(path)),
                RawSource::Tagged { path, kind } => SourceFile {
                    path: self.rooted(path),
                    kind: *kind,
                },
            })
            .collect();

        Ok(ModuleSpec {
            name: module.name.clone(),
            sources,
            include_dirs: module.include_dirs.iter().map(|d| self.rooted(d)).collect(),
            host_flags,
            device_flags,
        })
    }

    fn rooted(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

/// Find the manifest in the current directory.
#[must_use]
pub fn find_manifest() -> PathBuf {
    find_manifest_in(".")
}

/// Find the manifest in `dir` or its nearest ancestor that has one.
/// Defaults to `dir/portext.toml` if none exists.
#[must_use]
pub fn find_manifest_in(dir: impl AsRef<Path>) -> PathBuf {
    let dir = dir.as_ref();

    dir.ancestors()
        .map(|ancestor| ancestor.join(MANIFEST_FILE))
        .find(|candidate| candidate.exists())
        .unwrap_or_else(|| dir.join(MANIFEST_FILE))
}
