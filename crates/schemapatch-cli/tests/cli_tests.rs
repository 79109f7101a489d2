//! Integration tests for CLI commands

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const WIDGET_CRD: &str = "\
# Widgets are the main resource
apiVersion: apiextensions.k8s.io/v1beta1
kind: CustomResourceDefinition
metadata:
  name: widgets.example.io
spec:
  group: example.io
  names:
    kind: Widget
    plural: widgets
  scope: Namespaced # keep this
  versions:
  - name: v1
    served: true
    storage: true
";

const BUNDLE: &str = "\
groupVersions:
  example.io/api/v1: {group: example.io, version: v1}
schemata:
  - package: example.io/api/v1
    name: Widget
    schema:
      type: object
      description: A widget. It does things.
      properties:
        size: {type: integer}
";

const PATCH: [&str; 5] = ["patch", "--manifests", "crds", "--schemas", "schemas.yaml"];

/// Helper to run schemapatch inside `dir` with a clean environment
fn schemapatch(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_schemapatch"))
        .args(args)
        .current_dir(dir)
        .env("XDG_CONFIG_HOME", dir.join(".config"))
        .env_remove("SCHEMAPATCH_CONFIG")
        .env_remove("SCHEMAPATCH_MANIFESTS")
        .env_remove("SCHEMAPATCH_SCHEMAS")
        .env_remove("SCHEMAPATCH_MAX_DESC_LEN")
        .env_remove("SCHEMAPATCH_OUTPUT_DIR")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute schemapatch")
}

/// A project with one CRD and one schema bundle
fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir(dir.path().join("crds")).unwrap();
    std::fs::write(dir.path().join("crds/widget.yaml"), WIDGET_CRD).unwrap();
    std::fs::write(dir.path().join("crds/notes.yaml"), "just: notes\n").unwrap();
    std::fs::write(dir.path().join("schemas.yaml"), BUNDLE).unwrap();
    dir
}

fn read(dir: &TempDir, path: &str) -> String {
    std::fs::read_to_string(dir.path().join(path)).unwrap()
}

mod patch_command {
    use super::*;

    #[test]
    fn test_patch_in_place_keeps_comments() {
        let dir = project();
        let output = schemapatch(dir.path(), &PATCH);
        assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

        let patched = read(&dir, "crds/widget.yaml");
        assert!(patched.starts_with(WIDGET_CRD), "{patched}");
        assert!(patched.contains("  validation:\n    openAPIV3Schema:\n"));
        assert!(patched.contains("size:\n          type: integer"));
        assert_eq!(read(&dir, "crds/notes.yaml"), "just: notes\n");

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("widget.yaml"));
        assert!(stdout.contains("global"));
    }

    #[test]
    fn test_patch_twice_is_stable() {
        let dir = project();
        assert!(schemapatch(dir.path(), &PATCH).status.success());
        let first = read(&dir, "crds/widget.yaml");
        assert!(schemapatch(dir.path(), &PATCH).status.success());
        assert_eq!(read(&dir, "crds/widget.yaml"), first);
    }

    #[test]
    fn test_patch_to_stdout_leaves_files() {
        let dir = project();
        let output = schemapatch(
            dir.path(),
            &["patch", "--manifests", "crds", "--schemas", "schemas.yaml", "--stdout"],
        );
        assert!(output.status.success());

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("openAPIV3Schema"));
        assert!(stdout.contains("# keep this"));
        assert_eq!(read(&dir, "crds/widget.yaml"), WIDGET_CRD);
    }

    #[test]
    fn test_patch_to_output_dir() {
        let dir = project();
        let output = schemapatch(
            dir.path(),
            &["patch", "--manifests", "crds", "--schemas", "schemas.yaml", "--output-dir", "out"],
        );
        assert!(output.status.success());
        assert!(read(&dir, "out/widget.yaml").contains("openAPIV3Schema"));
        assert!(!dir.path().join("out/notes.yaml").exists());
        assert_eq!(read(&dir, "crds/widget.yaml"), WIDGET_CRD);
    }

    #[test]
    fn test_max_desc_len() {
        let dir = project();
        let output = schemapatch(
            dir.path(),
            &["patch", "--manifests", "crds", "--schemas", "schemas.yaml", "--max-desc-len", "12"],
        );
        assert!(output.status.success());
        let patched = read(&dir, "crds/widget.yaml");
        assert!(patched.contains("description: A widget."));
        assert!(!patched.contains("It does things"));
    }

    #[test]
    fn test_settings_from_config_file() {
        let dir = project();
        std::fs::write(
            dir.path().join("schemapatch.yaml"),
            "manifests: crds\nschemas: [schemas.yaml]\noutputDir: generated\n",
        )
        .unwrap();
        let output = schemapatch(dir.path(), &["patch"]);
        assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
        assert!(dir.path().join("generated/widget.yaml").exists());
    }
}

mod check_command {
    use super::*;

    #[test]
    fn test_check_reports_drift_then_passes() {
        let dir = project();
        let args = ["check", "--manifests", "crds", "--schemas", "schemas.yaml"];

        let output = schemapatch(dir.path(), &args);
        assert_eq!(output.status.code(), Some(2));
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("+++ b/widget.yaml"));
        assert!(stdout.contains("+  validation:"));
        assert_eq!(read(&dir, "crds/widget.yaml"), WIDGET_CRD);

        assert!(schemapatch(dir.path(), &PATCH).status.success());
        let output = schemapatch(dir.path(), &args);
        assert_eq!(output.status.code(), Some(0));
        assert!(String::from_utf8_lossy(&output.stdout).contains("up to date"));
    }
}

mod errors {
    use super::*;

    #[test]
    fn test_missing_manifests_setting_is_usage_error() {
        let dir = project();
        let output = schemapatch(dir.path(), &["patch", "--schemas", "schemas.yaml"]);
        assert_eq!(output.status.code(), Some(64));
        assert!(String::from_utf8_lossy(&output.stderr).contains("--manifests"));
    }

    #[test]
    fn test_unknown_flag_is_usage_error() {
        let dir = project();
        let output = schemapatch(dir.path(), &["patch", "--bogus"]);
        assert_eq!(output.status.code(), Some(64));
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let dir = project();
        let args = ["patch", "--manifests", "nope", "--schemas", "schemas.yaml"];
        let output = schemapatch(dir.path(), &args);
        assert_eq!(output.status.code(), Some(5));
    }

    #[test]
    fn test_duplicate_crd_is_malformed_input() {
        let dir = project();
        std::fs::write(dir.path().join("crds/widget-copy.yaml"), WIDGET_CRD).unwrap();
        let output = schemapatch(dir.path(), &PATCH);
        assert_eq!(output.status.code(), Some(3));
        assert_eq!(read(&dir, "crds/widget.yaml"), WIDGET_CRD);
    }

    #[test]
    fn test_help_succeeds() {
        let dir = project();
        let output = schemapatch(dir.path(), &["--help"]);
        assert!(output.status.success());
        assert!(String::from_utf8_lossy(&output.stdout).contains("check"));
    }
}
