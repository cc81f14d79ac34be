use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

const SHA_VAR: &str = "LEDGERDB_BUILD_SHA";

/// Embeds the commit the binary was built from as `LEDGERDB_BUILD_SHA`.
///
/// Packaged builds without a `.git` directory can pass the value in the
/// environment instead.
fn main() {
    println!("cargo:rerun-if-env-changed={SHA_VAR}");

    let workspace = env::var_os("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .and_then(|dir| dir.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from(".."));
    let head = workspace.join(".git").join("HEAD");
    if head.exists() {
        println!("cargo:rerun-if-changed={}", head.display());
    }

    let sha = env::var(SHA_VAR)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| git_short_sha(&workspace))
        .unwrap_or_else(|| "unknown".to_string());
    println!("cargo:rustc-env={SHA_VAR}={sha}");
}

fn git_short_sha(workspace: &Path) -> Option<String> {
    let out = Command::new("git")
        .arg("-C")
        .arg(workspace)
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    let sha = String::from_utf8_lossy(&out.stdout).trim().to_string();
    (!sha.is_empty()).then_some(sha)
}
