//! Resolve command
//!
//! Loads the manifest, picks the build target once, and prints every module
//! resolved for that target. Modules that fail are reported on stderr
//! without stopping the others.

use anyhow::{Context, Result};
use portext::{
    BuildTarget, Config, ConfigurationError, Manifest, ResolvedModuleSpec, TargetMode,
    TargetSelector, find_manifest,
};
use serde::Serialize;
use std::fmt::{self, Write};
use std::path::PathBuf;

use crate::ConfigArgs;

/// How resolved modules are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    /// JSON for build tooling
    Json,
    /// Human-readable listing
    Text,
}

#[derive(Debug, Serialize)]
struct Report<'a> {
    package: Option<&'a str>,
    target: BuildTarget,
    capability_macro: &'a str,
    modules: Vec<&'a ResolvedModuleSpec>,
}

/// Resolve all modules declared in the manifest
pub(crate) fn run(
    manifest_path: Option<&str>,
    target: Option<TargetMode>,
    capability_macro: Option<String>,
    format: OutputFormat,
    args: &ConfigArgs,
) -> Result<()> {
    let config = super::load_config(
        args,
        Config {
            target,
            capability_macro,
            ..Config::default()
        },
    )?;

    let manifest_path = manifest_path.map_or_else(find_manifest, PathBuf::from);
    let manifest = Manifest::load(&manifest_path)?;

    // Probe once; every module below shares this selector
    let selector = config
        .selector()
        .context("Cannot determine the build target")?;

    let results = resolve_manifest(&selector, &manifest);
    let mut resolved = Vec::new();
    let mut failures: Vec<&ConfigurationError> = Vec::new();
    for result in &results {
        match result {
            Ok(module) => resolved.push(module),
            Err(e) => failures.push(e),
        }
    }

    let output = match format {
        OutputFormat::Json => {
            let report = Report {
                package: manifest.package.as_ref().map(|p| p.name.as_str()),
                target: selector.target(),
                capability_macro: selector.marker().macro_name(),
                modules: resolved,
            };
            serde_json::to_string_pretty(&report)?
        }
        OutputFormat::Text => render_text(selector.target(), &resolved)?,
    };
    println!("{output}");

    for failure in &failures {
        eprintln!("error: {failure}");
    }

    if failures.is_empty() {
        Ok(())
    } else {
        anyhow::bail!(
            "{} of {} extension modules failed to resolve",
            failures.len(),
            manifest.module_names().len()
        )
    }
}

/// Resolve every manifest module in declaration order
///
/// Manifest errors and resolution errors share one list, so failures are
/// reported in the order the modules are declared.
fn resolve_manifest(
    selector: &TargetSelector,
    manifest: &Manifest,
) -> Vec<Result<ResolvedModuleSpec, ConfigurationError>> {
    manifest
        .module_specs()
        .into_iter()
        .map(|spec| spec.and_then(|spec| selector.resolve(&spec)))
        .collect()
}

fn render_text(
    target: BuildTarget,
    modules: &[&ResolvedModuleSpec],
) -> Result<String, fmt::Error> {
    let mut out = String::new();
    writeln!(out, "Target: {target} ({})", target.description())?;

    for module in modules {
        writeln!(out)?;
        writeln!(out, "{}", module.name())?;
        writeln!(out, "  sources:")?;
        for source in module.sources() {
            writeln!(out, "    {} [{}]", source.path.display(), source.kind)?;
        }
        if !module.include_dirs().is_empty() {
            writeln!(out, "  include dirs:")?;
            for dir in module.include_dirs() {
                writeln!(out, "    {}", dir.display())?;
            }
        }
        for (role, flags) in module.flags().buckets() {
            writeln!(out, "  {role} flags: {}", flags.join(" "))?;
        }
    }

    Ok(out.trim_end().to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Tests can panic")]
mod tests {
    use super::*;
    use portext::{CapabilityMarker, CompilerRole, ModuleSpec, resolve};
    use std::path::Path;

    #[test]
    fn failures_keep_manifest_order() {
        let manifest = Manifest::parse(
            r#"
[[module]]
name = "kernels"
sources = ["x.cu"]
compile_args = { host = [], device = [] }

[[module]]
name = "extras"
sources = ["extras.cpp"]
compile_args = { host = ["-O2"], device = ["-O3"] }

[[module]]
name = "bare"
sources = ["bare.cpp"]
"#,
            Path::new(""),
        )
        .unwrap();
        let selector = TargetSelector::new(BuildTarget::HostOnly, CapabilityMarker::default());

        let results = resolve_manifest(&selector, &manifest);

        assert_eq!(results.len(), 3);
        assert!(matches!(
            results.first(),
            Some(Err(ConfigurationError::NoSources { module, .. })) if module == "kernels"
        ));
        assert!(results.get(1).is_some_and(Result::is_ok));
        assert_eq!(
            results.get(2).cloned().and_then(Result::err),
            Some(ConfigurationError::MissingFlags {
                module: "bare".to_string(),
                role: CompilerRole::Host,
            })
        );
    }

    #[test]
    fn text_listing() {
        let spec = ModuleSpec::new("lietorch_backends")
            .with_classified_sources(["lietorch.cpp", "lietorch_gpu.cu"])
            .with_include_dir("include")
            .with_host_flags(["-O2"])
            .with_device_flags(["-O3"]);
        let module = resolve(&spec, true).unwrap();

        let text = render_text(BuildTarget::Accelerated, &[&module]).unwrap();

        assert!(text.starts_with("Target: accelerated (CUDA extension)"));
        assert!(text.contains("    lietorch_gpu.cu [device]"));
        assert!(text.contains("  cxx flags: -O2 -DPORTABLE_EXTENSION_CUDA_ENABLED=1"));
        assert!(text.contains("  nvcc flags: -O3 -DPORTABLE_EXTENSION_CUDA_ENABLED=1"));
    }

    #[test]
    fn text_listing_host_only() {
        let spec = ModuleSpec::new("ext")
            .with_classified_sources(["ext.cpp", "ext.cu"])
            .with_host_flags(["-O2"]);
        let module = resolve(&spec, false).unwrap();

        let text = render_text(BuildTarget::HostOnly, &[&module]).unwrap();

        assert!(!text.contains("ext.cu"));
        assert!(!text.contains("nvcc"));
        assert!(!text.contains("include dirs"));
        assert!(text.contains("  cxx flags: -O2 -DPORTABLE_EXTENSION_CUDA_ENABLED=0"));
    }
}
