//! Target selection
//!
//! Rewrites extension module declarations for one build target. The target
//! is picked once per build invocation (usually by probing for the CUDA
//! toolkit) and carried by a [`TargetSelector`], so every module in a build
//! agrees on it.
//!
//! On the accelerated target all sources are kept and the capability marker
//! is appended to the host and CUDA flag lists independently. On the
//! host-only target device sources and CUDA flags are dropped and the marker
//! is appended to the host flags.

use super::detector::{ProbeError, detect_toolkit};
use super::types::{
    BuildTarget, CapabilityMarker, CompileFlags, CompilerRole, ModuleSpec, ResolvedModuleSpec,
    SourceFile, TargetMode,
};
use std::path::Path;
use thiserror::Error;

/// A module declaration that cannot produce a usable build
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("Extension module has an empty name")]
    EmptyName,

    #[error("Extension module {module} has no sources to compile for the {target} target")]
    NoSources { module: String, target: BuildTarget },

    #[error("Extension module {module} already defines {macro_name} in its {role} flags")]
    MarkerAlreadyDefined {
        module: String,
        role: CompilerRole,
        macro_name: String,
    },

    #[error("Extension module {module} is missing its {role} compile arguments")]
    MissingFlags { module: String, role: CompilerRole },
}

/// Resolves module declarations for a single build target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSelector {
    target: BuildTarget,
    marker: CapabilityMarker,
}

impl TargetSelector {
    /// Create a selector for a known target
    #[must_use]
    pub const fn new(target: BuildTarget, marker: CapabilityMarker) -> Self {
        Self { target, marker }
    }

    /// Probe the default toolkit path and select accordingly
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError`] if the toolkit path exists but cannot be read.
    pub fn detect() -> Result<Self, ProbeError> {
        Self::from_mode(
            TargetMode::Auto,
            Path::new(super::detector::DEFAULT_TOOLKIT_PATH),
            CapabilityMarker::default(),
        )
    }

    /// Select a target according to `mode`
    ///
    /// `Auto` probes `toolkit_path` exactly once; the forced modes never
    /// touch the filesystem.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError`] if `Auto` probing fails for a reason other than
    /// the toolkit being absent.
    pub fn from_mode(
        mode: TargetMode,
        toolkit_path: &Path,
        marker: CapabilityMarker,
    ) -> Result<Self, ProbeError> {
        // Forced modes never need the probe result
        let toolkit_present = mode == TargetMode::Auto && detect_toolkit(toolkit_path)?;
        let target = mode.target_for(toolkit_present);

        crate::debug!("Selected {target} target ({mode} mode)");

        Ok(Self::new(target, marker))
    }

    /// Target every module is resolved for
    #[must_use]
    pub const fn target(&self) -> BuildTarget {
        self.target
    }

    /// Capability marker appended to the flag lists
    #[must_use]
    pub const fn marker(&self) -> &CapabilityMarker {
        &self.marker
    }

    /// Resolve one module declaration
    ///
    /// Pure: the same declaration always resolves to the same result.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if the name is blank, no sources are
    /// left for the target, or a flag list already defines the capability
    /// macro.
    pub fn resolve(&self, spec: &ModuleSpec) -> Result<ResolvedModuleSpec, ConfigurationError> {
        if spec.name.trim().is_empty() {
            return Err(ConfigurationError::EmptyName);
        }

        let sources = self.select_sources(spec);
        if sources.is_empty() {
            return Err(ConfigurationError::NoSources {
                module: spec.name.clone(),
                target: self.target,
            });
        }

        let flags = match self.target {
            BuildTarget::Accelerated => CompileFlags::Accelerated {
                host: self.mark(spec, CompilerRole::Host, &spec.host_flags)?,
                device: self.mark(spec, CompilerRole::Device, &spec.device_flags)?,
            },
            BuildTarget::HostOnly => {
                CompileFlags::HostOnly(self.mark(spec, CompilerRole::Host, &spec.host_flags)?)
            }
        };

        crate::debug!(
            "Resolved {} as {} ({} of {} sources)",
            spec.name,
            self.target.description(),
            sources.len(),
            spec.sources.len()
        );

        Ok(ResolvedModuleSpec::new(
            spec.name.clone(),
            self.target,
            sources,
            spec.include_dirs.clone(),
            flags,
        ))
    }

    /// Resolve several declarations independently
    ///
    /// Results line up with `specs`; a failing module does not stop the
    /// others from resolving.
    #[must_use]
    pub fn resolve_many(
        &self,
        specs: &[ModuleSpec],
    ) -> Vec<Result<ResolvedModuleSpec, ConfigurationError>> {
        specs.iter().map(|spec| self.resolve(spec)).collect()
    }

    /// Count resolved and failed modules
    ///
    /// # Returns
    /// (`resolved_count`, `failed_count`)
    #[must_use]
    pub fn summarize(
        results: &[Result<ResolvedModuleSpec, ConfigurationError>],
    ) -> (usize, usize) {
        let resolved = results.iter().filter(|r| r.is_ok()).count();
        (resolved, results.len() - resolved)
    }

    fn select_sources(&self, spec: &ModuleSpec) -> Vec<SourceFile> {
        if self.target.is_accelerated() {
            return spec.sources.clone();
        }

        spec.sources
            .iter()
            .filter(|source| {
                if source.is_device() {
                    crate::debug!(
                        "Skipping device source {} for {}",
                        source.path.display(),
                        spec.name
                    );
                    false
                } else {
                    true
                }
            })
            .cloned()
            .collect()
    }

    fn mark(
        &self,
        spec: &ModuleSpec,
        role: CompilerRole,
        flags: &[String],
    ) -> Result<Vec<String>, ConfigurationError> {
        if self.marker.count_in(flags) > 0 {
            return Err(ConfigurationError::MarkerAlreadyDefined {
                module: spec.name.clone(),
                role,
                macro_name: self.marker.macro_name().to_string(),
            });
        }

        let mut marked = flags.to_vec();
        marked.push(self.marker.flag(self.target));
        Ok(marked)
    }
}

/// Resolve one declaration with the default capability marker
///
/// `toolkit_present` should come from a single
/// [`detect_toolkit`] call per build invocation.
///
/// # Errors
///
/// See [`TargetSelector::resolve`].
pub fn resolve(
    spec: &ModuleSpec,
    toolkit_present: bool,
) -> Result<ResolvedModuleSpec, ConfigurationError> {
    TargetSelector::new(
        BuildTarget::from_toolkit(toolkit_present),
        CapabilityMarker::default(),
    )
    .resolve(spec)
}
