//! Stamps the build target and, when available, the git revision into the
//! binary for `prefixio version --extended`.

use std::process::Command;

fn main() {
    if let Ok(target) = std::env::var("TARGET") {
        println!("cargo:rustc-env=PREFIXIO_BUILD_TARGET={target}");
    }
    println!("cargo:rerun-if-env-changed=TARGET");

    let hash = std::env::var("GIT_HASH").ok().or_else(|| {
        Command::new("git")
            .args(["rev-parse", "--short=12", "HEAD"])
            .output()
            .ok()
            .filter(|out| out.status.success())
            .and_then(|out| String::from_utf8(out.stdout).ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    });
    if let Some(hash) = hash {
        println!("cargo:rustc-env=GIT_HASH={hash}");
    }
    println!("cargo:rerun-if-env-changed=GIT_HASH");
}
