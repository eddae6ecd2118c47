use std::fmt;

use crate::progress::ProgressSink;
use crate::InstallerError;

/// A single downloadable artifact of a release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub name: String,
    pub url: String,
    pub os: String,
    pub arch: String,
    pub size: u64,
}

/// A published version with its assets and optional default configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub version: String,
    pub prerelease: bool,
    pub assets: Vec<Asset>,
    pub default_config: Option<Vec<u8>>,
}

/// The read-only view of wherever releases come from.
pub trait ReleaseSource {
    /// All releases, newest first.
    fn releases(&self) -> Result<Vec<Release>, InstallerError>;

    /// Download `asset` of `release`, feeding byte counts to `progress`.
    fn fetch(
        &self,
        asset: &Asset,
        release: &Release,
        progress: &mut dyn ProgressSink,
    ) -> Result<Vec<u8>, InstallerError>;

    /// The default configuration blob published with `release`, if any.
    fn default_config(&self, release: &Release) -> Result<Option<Vec<u8>>, InstallerError> {
        Ok(release.default_config.clone())
    }
}

/// Releases in upstream order (newest first).
#[derive(Debug, Clone, Default)]
pub struct ReleaseCatalog {
    releases: Vec<Release>,
}

impl ReleaseCatalog {
    #[must_use]
    pub const fn new(releases: Vec<Release>) -> Self {
        Self { releases }
    }

    /// Drop releases that carry no assets at all.
    #[must_use]
    pub fn with_assets(self) -> Self {
        Self {
            releases: self
                .releases
                .into_iter()
                .filter(|r| !r.assets.is_empty())
                .collect(),
        }
    }

    /// Keep the releases that satisfy `constraint`, preserving order.
    #[must_use]
    pub fn filter(self, constraint: &VersionConstraint) -> Self {
        Self {
            releases: self
                .releases
                .into_iter()
                .filter(|r| constraint.matches(r))
                .collect(),
        }
    }

    #[must_use]
    pub fn releases(&self) -> &[Release] {
        &self.releases
    }

    #[must_use]
    pub fn versions(&self) -> Vec<String> {
        self.releases.iter().map(|r| r.version.clone()).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.releases.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Stable,
    Prerelease,
}

/// Which releases are acceptable: a channel or one exact version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionConstraint {
    Channel(Channel),
    Exact(String),
}

impl VersionConstraint {
    #[must_use]
    pub fn parse(input: &str) -> Self {
        match input.trim().to_ascii_lowercase().as_str() {
            "" | "latest" | "stable" => Self::Channel(Channel::Stable),
            "pre" | "prerelease" | "beta" | "nightly" => Self::Channel(Channel::Prerelease),
            _ => Self::Exact(input.trim().to_string()),
        }
    }

    #[must_use]
    pub fn matches(&self, release: &Release) -> bool {
        match self {
            Self::Channel(Channel::Stable) => !release.prerelease,
            Self::Channel(Channel::Prerelease) => true,
            Self::Exact(version) => strip_v(version) == strip_v(&release.version),
        }
    }
}

impl Default for VersionConstraint {
    fn default() -> Self {
        Self::Channel(Channel::Stable)
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Channel(Channel::Stable) => f.write_str("stable"),
            Self::Channel(Channel::Prerelease) => f.write_str("prerelease"),
            Self::Exact(version) => f.write_str(version),
        }
    }
}

fn strip_v(version: &str) -> &str {
    version.strip_prefix('v').unwrap_or(version)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    fn release(version: &str, prerelease: bool, assets: usize) -> Release {
        Release {
            version: version.to_string(),
            prerelease,
            assets: (0..assets)
                .map(|i| Asset {
                    name: format!("asset-{i}"),
                    url: format!("https://example.com/{version}/asset-{i}"),
                    os: "linux".to_string(),
                    arch: "amd64".to_string(),
                    size: 1,
                })
                .collect(),
            default_config: None,
        }
    }

    #[test]
    fn with_assets_drops_empty_releases() {
        let catalog = ReleaseCatalog::new(vec![
            release("v3", false, 0),
            release("v2", false, 2),
            release("v1", false, 1),
        ])
        .with_assets();
        assert_eq!(catalog.versions(), vec!["v2", "v1"]);
    }

    #[test]
    fn parse_channels() {
        assert_eq!(
            VersionConstraint::parse("latest"),
            VersionConstraint::Channel(Channel::Stable)
        );
        assert_eq!(
            VersionConstraint::parse("Beta"),
            VersionConstraint::Channel(Channel::Prerelease)
        );
        assert_eq!(
            VersionConstraint::parse("1.4.0"),
            VersionConstraint::Exact("1.4.0".to_string())
        );
    }

    #[test]
    fn stable_channel_skips_prereleases() {
        let catalog = ReleaseCatalog::new(vec![
            release("v2.0.0-rc1", true, 1),
            release("v1.9.0", false, 1),
        ])
        .filter(&VersionConstraint::parse("stable"));
        assert_eq!(catalog.versions(), vec!["v1.9.0"]);
    }

    #[test]
    fn prerelease_channel_keeps_everything_in_order() {
        let catalog = ReleaseCatalog::new(vec![
            release("v2.0.0-rc1", true, 1),
            release("v1.9.0", false, 1),
        ])
        .filter(&VersionConstraint::parse("pre"));
        assert_eq!(catalog.versions(), vec!["v2.0.0-rc1", "v1.9.0"]);
    }

    #[test]
    fn exact_version_ignores_v_prefix() {
        let catalog = ReleaseCatalog::new(vec![release("v1.2.0", false, 1), release("1.1.0", false, 1)]);
        let one_two = catalog.clone().filter(&VersionConstraint::parse("1.2.0"));
        assert_eq!(one_two.versions(), vec!["v1.2.0"]);
        let one_one = catalog.filter(&VersionConstraint::parse("v1.1.0"));
        assert_eq!(one_one.versions(), vec!["1.1.0"]);
    }

    #[test]
    fn exact_version_can_select_prerelease() {
        let catalog = ReleaseCatalog::new(vec![release("v2.0.0-rc1", true, 1)])
            .filter(&VersionConstraint::parse("v2.0.0-rc1"));
        assert_eq!(catalog.len(), 1);
    }
}
