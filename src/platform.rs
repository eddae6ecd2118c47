use std::env::consts::{ARCH, OS};
use std::fmt;

/// Operating system and architecture tags in the form release assets use
/// (`linux`/`darwin`/`windows`, `amd64`/`arm64`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformDescriptor {
    pub os: String,
    pub arch: String,
}

impl PlatformDescriptor {
    #[must_use]
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// Describe the host this process runs on.
    pub fn detect() -> Result<Self, String> {
        let os = match OS {
            "macos" => "darwin",
            "linux" => "linux",
            "windows" => "windows",
            "freebsd" => "freebsd",
            _ => return Err(format!("unsupported platform: {OS}-{ARCH}")),
        };

        let arch = match ARCH {
            "x86_64" => "amd64",
            "aarch64" => "arm64",
            "x86" => "386",
            "arm" => "arm",
            _ => return Err(format!("unsupported platform: {OS}-{ARCH}")),
        };

        Ok(Self::new(os, arch))
    }

    /// Replace either half of the descriptor with an explicit tag.
    #[must_use]
    pub fn with_overrides(self, os: Option<&str>, arch: Option<&str>) -> Self {
        Self {
            os: os.map_or(self.os, normalize_os),
            arch: arch.map_or(self.arch, normalize_arch),
        }
    }

    #[must_use]
    pub fn is_windows(&self) -> bool {
        self.os == "windows"
    }
}

impl fmt::Display for PlatformDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

/// The on-disk file name of `name` for the given platform.
#[must_use]
pub fn binary_file_name(name: &str, platform: &PlatformDescriptor) -> String {
    if platform.is_windows() {
        format!("{name}.exe")
    } else {
        name.to_string()
    }
}

fn normalize_os(tag: &str) -> String {
    os_alias(&tag.to_ascii_lowercase())
        .unwrap_or(tag)
        .to_ascii_lowercase()
}

fn normalize_arch(tag: &str) -> String {
    arch_alias(&tag.to_ascii_lowercase())
        .unwrap_or(tag)
        .to_ascii_lowercase()
}

fn os_alias(token: &str) -> Option<&'static str> {
    match token {
        "linux" => Some("linux"),
        "darwin" | "macos" | "apple" | "osx" => Some("darwin"),
        "windows" | "win" | "win64" => Some("windows"),
        "freebsd" => Some("freebsd"),
        _ => None,
    }
}

fn arch_alias(token: &str) -> Option<&'static str> {
    match token {
        "amd64" | "x64" | "x86_64" => Some("amd64"),
        "arm64" | "aarch64" => Some("arm64"),
        "386" | "i386" | "i686" | "x86" => Some("386"),
        "arm" | "armv7" | "armv6" => Some("arm"),
        _ => None,
    }
}

/// Derive the declared `(os, arch)` tags of a release asset from its file
/// name. A tag that cannot be recognised comes back empty and therefore never
/// matches any platform.
#[must_use]
pub fn parse_asset_tags(asset_name: &str) -> (String, String) {
    let lowered = asset_name
        .to_ascii_lowercase()
        .replace("x86_64", "amd64")
        .replace("x86-64", "amd64");

    // Platform tags follow the project name, which may itself contain one.
    let mut os = None;
    let mut arch = None;
    for token in lowered.rsplit(|c: char| c == '_' || c == '-' || c == '.') {
        os = os.or_else(|| os_alias(token));
        arch = arch.or_else(|| arch_alias(token));
    }

    (
        os.unwrap_or_default().to_string(),
        arch.unwrap_or_default().to_string(),
    )
}
