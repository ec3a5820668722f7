//
// Microstacker - Focus stacking rig control panel
// Copyright (c) 2024 Microstacker contributors
//
// This project is licensed under the terms of the MIT license
// (see the LICENSE file for details).
//

//!
//! Build script; stores the current commit hash for the version string.
//!

fn main() {
    let output_dir = std::env::var("OUT_DIR").expect("OUT_DIR is always set by Cargo");
    let version_path = std::path::Path::new(&output_dir).join("version");

    std::fs::write(version_path, commit_hash().unwrap_or_else(|| "unspecified".to_string()))
        .expect("cannot write version file");

    println!("cargo:rerun-if-changed=.git/HEAD");
}

/// Returns `None` if `git` is not available or this is not a working copy.
fn commit_hash() -> Option<String> {
    let output = std::process::Command::new("git")
        .args(["log", "-1", "--pretty=format:%h", "--abbrev=8"])
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .output()
        .ok()?;

    if output.status.success() && !output.stdout.is_empty() {
        Some(String::from_utf8_lossy(&output.stdout).to_string())
    } else {
        None
    }
}
