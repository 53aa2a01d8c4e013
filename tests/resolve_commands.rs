mod common;

use serde_json::Value;
use tempfile::TempDir;

use common::helpers::{create_fake_toolkit, create_test_manifest};
use common::portext_command;

fn run_resolve(manifest: &std::path::Path, extra: &[&str]) -> std::process::Output {
    portext_command()
        .args(["resolve", "--no-config", "--manifest"])
        .arg(manifest)
        .args(extra)
        .output()
        .expect("Failed to execute portext resolve")
}

fn json_stdout(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("resolve should print JSON")
}

#[test]
fn resolve_host_only_drops_device_sources() {
    let temp = TempDir::new().unwrap();
    let manifest = create_test_manifest(&temp, &[("ext", vec!["a.cpp", "b.cu", "c.cpp"])]);

    let output = run_resolve(&manifest, &["--target", "host-only"]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let report = json_stdout(&output);
    assert_eq!(report["target"], "host-only");
    assert_eq!(report["package"], "fixture");

    let module = &report["modules"][0];
    let sources: Vec<String> = module["sources"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["path"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(sources.len(), 2);
    assert!(sources.iter().all(|s| !s.ends_with(".cu")));
    assert_eq!(
        module["extra_compile_args"],
        serde_json::json!(["-O2", "-DPORTABLE_EXTENSION_CUDA_ENABLED=0"])
    );
}

#[test]
fn resolve_accelerated_keeps_everything() {
    let temp = TempDir::new().unwrap();
    let manifest = create_test_manifest(&temp, &[("ext", vec!["a.cpp", "b.cu", "c.cpp"])]);

    let output = run_resolve(&manifest, &["--target", "accelerated"]);
    assert!(output.status.success());

    let report = json_stdout(&output);
    let module = &report["modules"][0];
    assert_eq!(module["target"], "accelerated");
    assert_eq!(module["sources"].as_array().unwrap().len(), 3);
    assert_eq!(module["sources"][1]["kind"], "device");
    assert_eq!(
        module["extra_compile_args"],
        serde_json::json!({
            "cxx": ["-O2", "-DPORTABLE_EXTENSION_CUDA_ENABLED=1"],
            "nvcc": ["-O3", "-DPORTABLE_EXTENSION_CUDA_ENABLED=1"],
        })
    );
}

#[test]
fn resolve_auto_uses_toolkit_path() {
    let temp = TempDir::new().unwrap();
    let manifest = create_test_manifest(&temp, &[("ext", vec!["a.cpp", "b.cu"])]);
    let cuda = create_fake_toolkit(&temp);

    let output = run_resolve(&manifest, &["--toolkit-path", cuda.to_str().unwrap()]);
    assert!(output.status.success());
    assert_eq!(json_stdout(&output)["target"], "accelerated");

    let missing = temp.path().join("no-cuda");
    let output = run_resolve(&manifest, &["--toolkit-path", missing.to_str().unwrap()]);
    assert!(output.status.success());
    assert_eq!(json_stdout(&output)["target"], "host-only");
}

#[test]
fn env_var_selects_target() {
    let temp = TempDir::new().unwrap();
    let manifest = create_test_manifest(&temp, &[("ext", vec!["a.cpp", "b.cu"])]);

    let output = portext_command()
        .env("PORTEXT_TARGET", "cpu")
        .args(["resolve", "--no-config", "--manifest"])
        .arg(&manifest)
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(json_stdout(&output)["target"], "host-only");
}

#[test]
fn cli_target_overrides_env_var() {
    let temp = TempDir::new().unwrap();
    let manifest = create_test_manifest(&temp, &[("ext", vec!["a.cpp", "b.cu"])]);

    let output = portext_command()
        .env("PORTEXT_TARGET", "host-only")
        .args(["resolve", "--no-config", "--target", "accelerated", "--manifest"])
        .arg(&manifest)
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(json_stdout(&output)["target"], "accelerated");
}

#[test]
fn failing_module_does_not_block_others() {
    let temp = TempDir::new().unwrap();
    let manifest = create_test_manifest(
        &temp,
        &[
            ("kernels", vec!["x.cu"]),
            ("extras", vec!["extras.cpp", "solver.cu"]),
        ],
    );

    let output = run_resolve(&manifest, &["--target", "host-only"]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Extension module kernels has no sources"));
    assert!(stderr.contains("1 of 2 extension modules failed to resolve"));

    let report = json_stdout(&output);
    let modules = report["modules"].as_array().unwrap();
    assert_eq!(modules.len(), 1);
    assert_eq!(report["modules"][0]["name"], "extras");
}

#[test]
fn custom_capability_macro() {
    let temp = TempDir::new().unwrap();
    let manifest = create_test_manifest(&temp, &[("ext", vec!["a.cpp"])]);

    let output = run_resolve(
        &manifest,
        &["--target", "host-only", "--capability-macro", "WITH_CUDA"],
    );
    assert!(output.status.success());

    let report = json_stdout(&output);
    assert_eq!(report["capability_macro"], "WITH_CUDA");
    assert_eq!(
        report["modules"][0]["extra_compile_args"],
        serde_json::json!(["-O2", "-DWITH_CUDA=0"])
    );
}

#[test]
fn config_file_is_read() {
    let temp = TempDir::new().unwrap();
    let manifest = create_test_manifest(&temp, &[("ext", vec!["a.cpp", "b.cu"])]);
    let config = temp.path().join("portext-config.toml");
    std::fs::write(&config, "target = \"accelerated\"\n").unwrap();

    let output = portext_command()
        .args(["resolve", "--config"])
        .arg(&config)
        .arg("--manifest")
        .arg(&manifest)
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(json_stdout(&output)["target"], "accelerated");
}

#[test]
fn text_format() {
    let temp = TempDir::new().unwrap();
    let manifest = create_test_manifest(&temp, &[("ext", vec!["a.cpp", "b.cu"])]);

    let output = run_resolve(&manifest, &["--target", "host-only", "--format", "text"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("Target: host-only"));
    assert!(stdout.contains("cxx flags: -O2 -DPORTABLE_EXTENSION_CUDA_ENABLED=0"));
    assert!(!stdout.contains("b.cu"));
}

#[test]
fn missing_manifest_fails() {
    let temp = TempDir::new().unwrap();

    let output = run_resolve(&temp.path().join("portext.toml"), &[]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to read manifest"));
}

#[test]
fn detect_reports_toolkit() {
    let temp = TempDir::new().unwrap();
    let cuda = create_fake_toolkit(&temp);

    let output = portext_command()
        .args(["detect", "--no-config", "--toolkit-path"])
        .arg(&cuda)
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("CUDA toolkit found"));
    assert!(stdout.contains("Target: accelerated"));
}

#[test]
fn detect_reports_missing_toolkit() {
    let temp = TempDir::new().unwrap();

    let output = portext_command()
        .args(["detect", "--no-config", "--toolkit-path"])
        .arg(temp.path().join("cuda"))
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("CUDA toolkit not found"));
    assert!(stdout.contains("Target: host-only"));
}

#[cfg(unix)]
#[test]
fn detect_fails_on_probe_error() {
    let temp = TempDir::new().unwrap();
    let a = temp.path().join("a");
    let b = temp.path().join("b");
    std::os::unix::fs::symlink(&b, &a).unwrap();
    std::os::unix::fs::symlink(&a, &b).unwrap();

    let output = portext_command()
        .args(["detect", "--no-config", "--toolkit-path"])
        .arg(&a)
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Cannot determine the build target"));
    assert!(stderr.contains("caused by: Failed to probe CUDA toolkit"));
}
