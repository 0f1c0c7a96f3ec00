//! Build information module.
//!
//! Compile-time information shown by `bbacl version`:
//! - Package name and version
//! - Git commit hash
//! - Build timestamp
//! - Rust compiler version
//! - Target architecture

#[cfg(feature = "build-info")]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

/// Get formatted version information.
///
/// Output:
/// ```text
/// bbacl 0.3.0 (x86_64-unknown-linux-gnu)
/// Built: Sat, 17 Oct 2026 12:34:56 +0000
/// Commit: a1b2c3d
/// Rustc: rustc 1.82.0
/// ```
#[cfg(feature = "build-info")]
pub fn version_info() -> String {
    format!(
        "{} {} ({})\nBuilt: {}\nCommit: {}\nRustc: {}",
        built_info::PKG_NAME,
        built_info::PKG_VERSION,
        built_info::TARGET,
        built_info::BUILT_TIME_UTC,
        built_info::GIT_COMMIT_HASH_SHORT.unwrap_or("unknown"),
        built_info::RUSTC_VERSION
    )
}

/// Get short version string (package version only).
#[cfg(feature = "build-info")]
pub fn version_short() -> &'static str {
    built_info::PKG_VERSION
}

/// Get package name.
#[cfg(feature = "build-info")]
pub fn package_name() -> &'static str {
    built_info::PKG_NAME
}

// Fallback implementations when build-info feature is disabled
#[cfg(not(feature = "build-info"))]
pub fn version_info() -> String {
    format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

#[cfg(not(feature = "build-info"))]
pub fn version_short() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(not(feature = "build-info"))]
pub fn package_name() -> &'static str {
    env!("CARGO_PKG_NAME")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_info_starts_with_package() {
        let info = version_info();
        assert!(info.starts_with("bbacl "));
        assert!(info.contains(version_short()));
    }

    #[test]
    fn test_package_name() {
        assert_eq!(package_name(), "bbacl");
    }
}
