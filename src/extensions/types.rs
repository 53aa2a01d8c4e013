//! Extension type definitions
//!
//! A native extension module is declared once as a [`ModuleSpec`] and
//! resolved into a [`ResolvedModuleSpec`] for exactly one [`BuildTarget`].
//! Device (CUDA) sources only reach the resolved module on the accelerated
//! target, and every flag list that reaches a compiler carries the
//! capability marker.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Preprocessor macro recording whether a module was built with CUDA support
pub const DEFAULT_CAPABILITY_MACRO: &str = "PORTABLE_EXTENSION_CUDA_ENABLED";

/// File extension of CUDA device sources (`kernel.cu`)
pub const DEVICE_SOURCE_EXTENSION: &str = "cu";

/// Which compiler a source file is meant for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Compiled by the host C++ compiler
    Host,
    /// Compiled by the CUDA toolkit (`nvcc`)
    Device,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => f.write_str("host"),
            Self::Device => f.write_str("device"),
        }
    }
}

/// A single source file of an extension module, tagged with its kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceFile {
    /// Path to the source file
    pub path: PathBuf,
    /// Host or device code
    pub kind: SourceKind,
}

impl SourceFile {
    /// Create a host source entry
    pub fn host(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: SourceKind::Host,
        }
    }

    /// Create a device source entry
    pub fn device(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: SourceKind::Device,
        }
    }

    /// Tag a path by its file extension.
    ///
    /// Files ending in `.cu` are device code, everything else is host code.
    /// This is a declaration-time convenience; resolution only ever looks at
    /// [`SourceFile::kind`].
    ///
    /// - `src/lietorch_gpu.cu` -> device
    /// - `src/lietorch_cpu.cpp` -> host
    /// - `include/kernel.cuh` -> host
    pub fn classify(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let kind = if path
            .extension()
            .is_some_and(|ext| ext == DEVICE_SOURCE_EXTENSION)
        {
            SourceKind::Device
        } else {
            SourceKind::Host
        };

        Self { path, kind }
    }

    /// Check if this file is device code
    #[must_use]
    #[inline]
    pub const fn is_device(&self) -> bool {
        matches!(self.kind, SourceKind::Device)
    }
}

/// Compiler role a flag list belongs to
///
/// Named after the keys the host (`cxx`) and CUDA (`nvcc`) compilers use in
/// extension build arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompilerRole {
    /// Host C++ compiler
    #[serde(rename = "cxx")]
    Host,
    /// CUDA compiler
    #[serde(rename = "nvcc")]
    Device,
}

impl CompilerRole {
    /// Key used for this role in compile argument tables
    #[must_use]
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Host => "cxx",
            Self::Device => "nvcc",
        }
    }
}

impl fmt::Display for CompilerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declaration of one native extension module
///
/// Built once by the caller and never mutated by resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleSpec {
    /// Name of the resulting native module
    pub name: String,
    /// Ordered source files
    pub sources: Vec<SourceFile>,
    /// Header search paths
    pub include_dirs: Vec<PathBuf>,
    /// Arguments for the host compiler
    pub host_flags: Vec<String>,
    /// Arguments for the CUDA compiler (kept even when unused)
    pub device_flags: Vec<String>,
}

impl ModuleSpec {
    /// Start a declaration with no sources, include dirs or flags
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add a source file
    #[must_use]
    pub fn with_source(mut self, source: SourceFile) -> Self {
        self.sources.push(source);
        self
    }

    /// Add several paths, tagging each with [`SourceFile::classify`]
    #[must_use]
    pub fn with_classified_sources<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.sources
            .extend(paths.into_iter().map(SourceFile::classify));
        self
    }

    /// Add a header search path
    #[must_use]
    pub fn with_include_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.include_dirs.push(dir.into());
        self
    }

    /// Set the host compiler arguments
    #[must_use]
    pub fn with_host_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.host_flags = flags.into_iter().map(Into::into).collect();
        self
    }

    /// Set the CUDA compiler arguments
    #[must_use]
    pub fn with_device_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.device_flags = flags.into_iter().map(Into::into).collect();
        self
    }

    /// Number of device sources in the declaration
    #[must_use]
    pub fn device_source_count(&self) -> usize {
        self.sources.iter().filter(|s| s.is_device()).count()
    }
}

/// The single compilation target of a build invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildTarget {
    /// Host and device sources, compiled with the CUDA toolkit
    Accelerated,
    /// Host sources only, compiled with the standard C++ compiler
    HostOnly,
}

impl BuildTarget {
    /// Pick the target implied by toolkit availability
    #[must_use]
    #[inline]
    pub const fn from_toolkit(toolkit_present: bool) -> Self {
        if toolkit_present {
            Self::Accelerated
        } else {
            Self::HostOnly
        }
    }

    /// Check if device code is compiled on this target
    #[must_use]
    #[inline]
    pub const fn is_accelerated(self) -> bool {
        matches!(self, Self::Accelerated)
    }

    /// Get a human-readable description
    #[must_use]
    #[inline]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Accelerated => "CUDA extension",
            Self::HostOnly => "C++ extension (host-only)",
        }
    }
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accelerated => f.write_str("accelerated"),
            Self::HostOnly => f.write_str("host-only"),
        }
    }
}

/// How the build target is chosen
///
/// Config files accept the same spellings as [`FromStr`] (`cuda`, `cpu`, ...).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case", try_from = "String")]
pub enum TargetMode {
    /// Probe for the CUDA toolkit
    #[default]
    Auto,
    /// Always build the accelerated target
    Accelerated,
    /// Always build the host-only target
    HostOnly,
}

impl fmt::Display for TargetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Accelerated => f.write_str("accelerated"),
            Self::HostOnly => f.write_str("host-only"),
        }
    }
}

impl TargetMode {
    /// Target this mode picks given the toolkit probe result
    #[must_use]
    #[inline]
    pub const fn target_for(self, toolkit_present: bool) -> BuildTarget {
        match self {
            Self::Auto => BuildTarget::from_toolkit(toolkit_present),
            Self::Accelerated => BuildTarget::Accelerated,
            Self::HostOnly => BuildTarget::HostOnly,
        }
    }
}

/// Unknown target mode string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown target mode '{0}' (expected auto, accelerated or host-only)")]
pub struct ParseTargetModeError(pub String);

impl FromStr for TargetMode {
    type Err = ParseTargetModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "accelerated" | "cuda" | "gpu" => Ok(Self::Accelerated),
            "host-only" | "host_only" | "host" | "cpu" => Ok(Self::HostOnly),
            _ => Err(ParseTargetModeError(s.to_string())),
        }
    }
}

impl TryFrom<String> for TargetMode {
    type Error = ParseTargetModeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Preprocessor define baked into every compiled module
///
/// Expands to `-D<MACRO>=1` on the accelerated target and `-D<MACRO>=0`
/// on the host-only target, so the module's own code can pick its code
/// paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityMarker {
    macro_name: String,
}

impl CapabilityMarker {
    /// Create a marker for a custom macro name
    pub fn new(macro_name: impl Into<String>) -> Self {
        Self {
            macro_name: macro_name.into(),
        }
    }

    /// Name of the preprocessor macro
    #[must_use]
    pub fn macro_name(&self) -> &str {
        &self.macro_name
    }

    /// Compiler argument defining the macro for `target`
    #[must_use]
    pub fn flag(&self, target: BuildTarget) -> String {
        format!(
            "-D{}={}",
            self.macro_name,
            u8::from(target.is_accelerated())
        )
    }

    /// Check if a compiler argument defines this macro
    ///
    /// Matches `-DMACRO`, `-DMACRO=value`, `--define-macro=MACRO...` and
    /// `-D MACRO...` written as a single argument.
    #[must_use]
    pub fn is_defined_by(&self, flag: &str) -> bool {
        flag.strip_prefix("-D")
            .or_else(|| flag.strip_prefix("--define-macro="))
            .is_some_and(|definition| self.is_named_by(definition.trim_start()))
    }

    /// Number of definitions of this macro in `flags`
    ///
    /// A bare `-D` or `--define-macro` takes the next argument as its
    /// definition, so `["-D", "MACRO=1"]` counts once.
    #[must_use]
    pub fn count_in(&self, flags: &[String]) -> usize {
        let mut count = 0;
        let mut args = flags.iter();

        while let Some(flag) = args.next() {
            let defined = if matches!(flag.as_str(), "-D" | "--define-macro") {
                args.next().is_some_and(|definition| self.is_named_by(definition))
            } else {
                self.is_defined_by(flag)
            };
            if defined {
                count += 1;
            }
        }

        count
    }

    // `MACRO` or `MACRO=value`
    fn is_named_by(&self, definition: &str) -> bool {
        definition
            .strip_prefix(self.macro_name.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('='))
    }
}

impl Default for CapabilityMarker {
    fn default() -> Self {
        Self::new(DEFAULT_CAPABILITY_MACRO)
    }
}

/// Compiler arguments of a resolved module, bucketed by compiler role
///
/// Serializes the way extension build arguments are usually written: a
/// `{ "cxx": [...], "nvcc": [...] }` table on the accelerated target and a
/// plain list when only the host compiler runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CompileFlags {
    /// Separate lists for the host and CUDA compilers
    Accelerated {
        /// Host compiler arguments
        #[serde(rename = "cxx")]
        host: Vec<String>,
        /// CUDA compiler arguments
        #[serde(rename = "nvcc")]
        device: Vec<String>,
    },
    /// One list for the host compiler
    HostOnly(Vec<String>),
}

impl CompileFlags {
    /// Host compiler arguments
    #[must_use]
    pub fn host(&self) -> &[String] {
        match self {
            Self::Accelerated { host, .. } | Self::HostOnly(host) => host,
        }
    }

    /// CUDA compiler arguments, if the CUDA compiler runs
    #[must_use]
    pub fn device(&self) -> Option<&[String]> {
        match self {
            Self::Accelerated { device, .. } => Some(device.as_slice()),
            Self::HostOnly(_) => None,
        }
    }

    /// Every flag list that reaches a compiler, keyed by role
    #[must_use]
    pub fn buckets(&self) -> Vec<(CompilerRole, &[String])> {
        match self {
            Self::Accelerated { host, device } => vec![
                (CompilerRole::Host, host.as_slice()),
                (CompilerRole::Device, device.as_slice()),
            ],
            Self::HostOnly(host) => vec![(CompilerRole::Host, host.as_slice())],
        }
    }
}

/// Extension module ready for the compiler
///
/// Produced by [`TargetSelector::resolve`](super::TargetSelector::resolve);
/// read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedModuleSpec {
    name: String,
    target: BuildTarget,
    sources: Vec<SourceFile>,
    include_dirs: Vec<PathBuf>,
    #[serde(rename = "extra_compile_args")]
    flags: CompileFlags,
}

impl ResolvedModuleSpec {
    pub(crate) const fn new(
        name: String,
        target: BuildTarget,
        sources: Vec<SourceFile>,
        include_dirs: Vec<PathBuf>,
        flags: CompileFlags,
    ) -> Self {
        Self {
            name,
            target,
            sources,
            include_dirs,
            flags,
        }
    }

    /// Module name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Target this module was resolved for
    #[must_use]
    pub const fn target(&self) -> BuildTarget {
        self.target
    }

    /// Sources handed to the compiler(s)
    #[must_use]
    pub fn sources(&self) -> &[SourceFile] {
        &self.sources
    }

    /// Header search paths
    #[must_use]
    pub fn include_dirs(&self) -> &[PathBuf] {
        &self.include_dirs
    }

    /// Compiler arguments by role
    #[must_use]
    pub const fn flags(&self) -> &CompileFlags {
        &self.flags
    }
}
