//! Portext internal library code
//!
//! Picks between a CUDA build and a host-only build of native extension
//! modules and rewrites their declarations to match.

pub mod config;
pub mod debug;
pub mod env_vars;
pub mod extensions;
pub mod manifest;

// Re-export common types for convenience
pub use config::Config;
pub use debug::{init_debug, is_debug_enabled};
pub use extensions::{
    BuildTarget, CapabilityMarker, CompileFlags, CompilerRole, ConfigurationError,
    DEFAULT_CAPABILITY_MACRO, DEFAULT_TOOLKIT_PATH, ModuleSpec, ProbeError, ResolvedModuleSpec,
    SourceFile, SourceKind, TargetMode, TargetSelector, detect_toolkit, resolve,
};
pub use manifest::{MANIFEST_FILE, Manifest, ManifestError, PackageInfo, find_manifest};
