//! Native extension target selection
//!
//! Turns one extension module declaration into a build that works whether or
//! not the CUDA toolkit is installed (similar to what a portable
//! `CUDAExtension`/`CppExtension` switch does in a Python `setup.py`).
//!
//! - [`detector`] probes for the toolkit
//! - [`selector`] picks the target and rewrites sources and flags
//! - [`types`] holds the declarations and resolved modules

pub mod detector;
pub mod selector;
pub mod types;

pub use detector::{DEFAULT_TOOLKIT_PATH, ProbeError, detect_default_toolkit, detect_toolkit};
pub use selector::{ConfigurationError, TargetSelector, resolve};
pub use types::{
    BuildTarget, CapabilityMarker, CompileFlags, CompilerRole, DEFAULT_CAPABILITY_MACRO,
    DEVICE_SOURCE_EXTENSION, ModuleSpec, ParseTargetModeError, ResolvedModuleSpec, SourceFile,
    SourceKind, TargetMode,
};
