//! Build script for picocalc-kbd
//!
//! Stamps the startup banner with the build date and the source revision.
//! `PICOCALC_KBD_REVISION` overrides the revision for packaged builds that
//! have no git checkout.

use std::process::Command;

/// Trimmed stdout of a successful command
fn command_output(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!text.is_empty()).then_some(text)
}

fn revision() -> String {
    if let Ok(revision) = std::env::var("PICOCALC_KBD_REVISION") {
        return revision;
    }

    let Some(hash) = command_output("git", &["rev-parse", "--short=10", "HEAD"]) else {
        return "unknown".to_string();
    };
    match command_output("git", &["status", "--porcelain", "--untracked-files=no"]) {
        Some(_) => format!("{}-dirty", hash),
        None => hash,
    }
}

fn main() {
    let date = command_output("date", &["-u", "+%Y-%m-%d"]).unwrap_or_else(|| "unknown".to_string());
    let time = command_output("date", &["-u", "+%H:%M:%S"]).unwrap_or_default();

    println!("cargo:rustc-env=BUILD_DATE={}", date);
    println!("cargo:rustc-env=BUILD_TIME={}", time);
    println!("cargo:rustc-env=GIT_HASH={}", revision());

    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=PICOCALC_KBD_REVISION");
    for path in [".git/HEAD", ".git/index", ".git/refs/heads"] {
        if std::path::Path::new(path).exists() {
            println!("cargo:rerun-if-changed={}", path);
        }
    }
}
