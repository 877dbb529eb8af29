use std::process::Command;

/// Short commit hash, suffixed with `-dirty` when the tree has local edits.
/// Surfaced by the health endpoint as the build identifier.
fn git_build_stamp() -> Option<String> {
    let head = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())?;
    let mut stamp = String::from_utf8_lossy(&head.stdout).trim().to_string();

    let clean = Command::new("git")
        .args(["diff", "--quiet"])
        .status()
        .map(|s| s.success())
        .unwrap_or(true);
    if !clean {
        stamp.push_str("-dirty");
    }
    Some(stamp)
}

fn main() {
    let stamp = git_build_stamp().unwrap_or_else(|| "unknown".to_string());
    println!("cargo:rustc-env=GIT_HASH={stamp}");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads");
}
