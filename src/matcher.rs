use log::{debug, warn};

use crate::catalog::{Asset, Release, ReleaseCatalog};
use crate::platform::PlatformDescriptor;

/// No searched release publishes an asset for the requested platform.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "no asset for {os}/{arch} in any searched release (searched: {})",
    searched_list(.searched)
)]
pub struct NoMatchingAssetError {
    pub os: String,
    pub arch: String,
    pub searched: Vec<String>,
}

fn searched_list(searched: &[String]) -> String {
    if searched.is_empty() {
        "none".to_string()
    } else {
        searched.join(", ")
    }
}

/// Find the first release, in catalog order, that has an asset for
/// `platform`, and that asset.
///
/// Assets are narrowed by architecture first and operating system second; the
/// first survivor in the release's asset order wins. Releases without a
/// survivor are skipped with a warning.
pub fn find<'a>(
    catalog: &'a ReleaseCatalog,
    platform: &PlatformDescriptor,
) -> Result<(&'a Asset, &'a Release), NoMatchingAssetError> {
    find_with(catalog, platform, |release| {
        warn!(
            "release {} has no asset for {platform}, trying older releases",
            release.version
        );
    })
}

/// [`find`], reporting every skipped release to `on_skip` instead of the log.
pub fn find_with<'a>(
    catalog: &'a ReleaseCatalog,
    platform: &PlatformDescriptor,
    mut on_skip: impl FnMut(&Release),
) -> Result<(&'a Asset, &'a Release), NoMatchingAssetError> {
    let mut searched = Vec::with_capacity(catalog.len());

    for release in catalog.releases() {
        searched.push(release.version.clone());

        let found = release
            .assets
            .iter()
            .filter(|asset| asset.arch == platform.arch)
            .find(|asset| asset.os == platform.os);

        if let Some(asset) = found {
            debug!("selected {} from release {}", asset.name, release.version);
            return Ok((asset, release));
        }

        on_skip(release);
    }

    Err(NoMatchingAssetError {
        os: platform.os.clone(),
        arch: platform.arch.clone(),
        searched,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    fn asset(name: &str, os: &str, arch: &str) -> Asset {
        Asset {
            name: name.to_string(),
            url: format!("https://example.com/{name}"),
            os: os.to_string(),
            arch: arch.to_string(),
            size: 42,
        }
    }

    fn release(version: &str, assets: Vec<Asset>) -> Release {
        Release {
            version: version.to_string(),
            prerelease: false,
            assets,
            default_config: None,
        }
    }

    fn linux_amd64() -> PlatformDescriptor {
        PlatformDescriptor::new("linux", "amd64")
    }

    #[test]
    fn skips_release_without_match() {
        let catalog = ReleaseCatalog::new(vec![
            release("v2", vec![asset("rr_darwin_arm64.tar.gz", "darwin", "arm64")]),
            release("v1", vec![asset("rr_linux_amd64.tar.gz", "linux", "amd64")]),
        ]);

        let mut skipped = Vec::new();
        let (asset, release) =
            find_with(&catalog, &linux_amd64(), |r| skipped.push(r.version.clone())).unwrap();
        assert_eq!(release.version, "v1");
        assert_eq!(asset.name, "rr_linux_amd64.tar.gz");
        assert_eq!(skipped, vec!["v2"]);
    }

    #[test]
    fn stops_at_first_matching_release() {
        let catalog = ReleaseCatalog::new(vec![
            release("v2", vec![asset("new_linux_amd64.tar.gz", "linux", "amd64")]),
            release("v1", vec![asset("old_linux_amd64.tar.gz", "linux", "amd64")]),
        ]);

        let mut skipped = 0;
        let (asset, release) = find_with(&catalog, &linux_amd64(), |_| skipped += 1).unwrap();
        assert_eq!(release.version, "v2");
        assert_eq!(asset.name, "new_linux_amd64.tar.gz");
        assert_eq!(skipped, 0);
    }

    #[test]
    fn right_arch_wrong_os_is_never_selected() {
        let catalog = ReleaseCatalog::new(vec![release(
            "v1",
            vec![
                asset("rr_windows_amd64.zip", "windows", "amd64"),
                asset("rr_darwin_amd64.tar.gz", "darwin", "amd64"),
            ],
        )]);

        let err = find(&catalog, &linux_amd64()).unwrap_err();
        assert_eq!(err.searched, vec!["v1"]);
    }

    #[test]
    fn right_os_wrong_arch_is_never_selected() {
        let catalog = ReleaseCatalog::new(vec![release(
            "v1",
            vec![asset("rr_linux_arm64.tar.gz", "linux", "arm64")],
        )]);

        assert!(find(&catalog, &linux_amd64()).is_err());
    }

    #[test]
    fn first_survivor_in_asset_order_wins() {
        let catalog = ReleaseCatalog::new(vec![release(
            "v1",
            vec![
                asset("rr_linux_arm64.tar.gz", "linux", "arm64"),
                asset("rr_linux_amd64.tar.gz", "linux", "amd64"),
                asset("rr_linux_amd64.zip", "linux", "amd64"),
            ],
        )]);

        let (asset, _) = find(&catalog, &linux_amd64()).unwrap();
        assert_eq!(asset.name, "rr_linux_amd64.tar.gz");
    }

    #[test]
    fn exhausted_catalog_reports_request_and_searched_versions() {
        let catalog = ReleaseCatalog::new(vec![
            release("v3", vec![asset("rr_darwin_arm64.tar.gz", "darwin", "arm64")]),
            release("v2", vec![asset("rr_windows_amd64.zip", "windows", "amd64")]),
            release("v1", vec![asset("rr_linux_386.tar.gz", "linux", "386")]),
        ]);

        let err = find(&catalog, &linux_amd64()).unwrap_err();
        assert_eq!(err.os, "linux");
        assert_eq!(err.arch, "amd64");
        assert_eq!(err.searched, vec!["v3", "v2", "v1"]);

        let message = err.to_string();
        assert!(message.contains("linux/amd64"));
        assert!(message.contains("v3, v2, v1"));
    }

    #[test]
    fn empty_catalog_fails() {
        let err = find(&ReleaseCatalog::default(), &linux_amd64()).unwrap_err();
        assert!(err.searched.is_empty());
        assert!(err.to_string().contains("searched: none"));
    }
}
