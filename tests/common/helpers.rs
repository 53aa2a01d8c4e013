//! Shared test helpers and utilities

use std::fmt::Write;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

/// Build a `portext` command isolated from the caller's environment
///
/// `PORTEXT_*` variables and user config files would otherwise leak into
/// the test, so they are cleared and `--no-config` is expected from callers
/// that resolve.
#[allow(dead_code)]
pub(crate) fn portext_command() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_portext"));
    for var in portext::env_vars::ALL {
        cmd.env_remove(var);
    }
    cmd
}

/// Write a `portext.toml` declaring the given modules
///
/// # Arguments
/// * `temp_dir` - Directory to create the manifest in
/// * `modules` - Slice of (name, sources) tuples; every module gets
///   `-O2` host flags and `-O3` device flags
///
/// # Returns
/// The path to the created manifest
#[allow(dead_code)]
pub(crate) fn create_test_manifest(temp_dir: &TempDir, modules: &[(&str, Vec<&str>)]) -> PathBuf {
    let manifest_path = temp_dir.path().join("portext.toml");

    let mut content = String::from("[package]\nname = \"fixture\"\nversion = \"0.1.0\"\n");
    for (name, sources) in modules {
        let quoted: Vec<String> = sources.iter().map(|s| format!("\"{s}\"")).collect();
        writeln!(&mut content).unwrap();
        writeln!(&mut content, "[[module]]").unwrap();
        writeln!(&mut content, "name = \"{name}\"").unwrap();
        writeln!(&mut content, "sources = [{}]", quoted.join(", ")).unwrap();
        writeln!(
            &mut content,
            "compile_args = {{ host = [\"-O2\"], device = [\"-O3\"] }}"
        )
        .unwrap();
    }

    fs::write(&manifest_path, content).expect("Failed to write portext.toml");
    manifest_path
}

/// Create a fake CUDA toolkit directory and return its path
#[allow(dead_code)]
pub(crate) fn create_fake_toolkit(temp_dir: &TempDir) -> PathBuf {
    let cuda = temp_dir.path().join("cuda");
    fs::create_dir_all(cuda.join("bin")).expect("Failed to create fake toolkit");
    cuda
}
