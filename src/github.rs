use log::{debug, info, warn};
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::archive::ArchiveKind;
use crate::catalog::{Asset, Release, ReleaseSource};
use crate::download::{self, USER_AGENT};
use crate::platform::parse_asset_tags;
use crate::progress::ProgressSink;
use crate::InstallerError;

pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Name of the release asset holding the default configuration.
pub const DEFAULT_CONFIG_ASSET: &str = "config.default.yml";

/// Checksum list names, in lookup order.
const CHECKSUM_ASSETS: &[&str] = &["checksums.txt", "checksums-sha256.txt", "SHA256SUMS"];

#[derive(Debug, Deserialize)]
struct GitHubRelease {
    tag_name: String,
    #[serde(default)]
    prerelease: bool,
    #[serde(default)]
    draft: bool,
    #[serde(default)]
    assets: Vec<GitHubAsset>,
}

#[derive(Debug, Deserialize)]
struct GitHubAsset {
    name: String,
    browser_download_url: String,
    #[serde(default)]
    size: u64,
}

impl From<GitHubRelease> for Release {
    fn from(release: GitHubRelease) -> Self {
        let assets = release
            .assets
            .into_iter()
            .map(|asset| {
                // Only extractable archives are candidates for a platform.
                let (os, arch) = if ArchiveKind::from_name(&asset.name).is_some() {
                    parse_asset_tags(&asset.name)
                } else {
                    (String::new(), String::new())
                };
                Asset {
                    name: asset.name,
                    url: asset.browser_download_url,
                    os,
                    arch,
                    size: asset.size,
                }
            })
            .collect();

        Self {
            version: release.tag_name,
            prerelease: release.prerelease,
            assets,
            default_config: None,
        }
    }
}

/// Releases of one GitHub repository.
pub struct GitHubSource {
    client: Client,
    repo: String,
    api_base: String,
    token: Option<String>,
    config_asset: String,
}

impl GitHubSource {
    #[must_use]
    pub fn new(repo: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            repo: repo.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            token: std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()),
            config_asset: DEFAULT_CONFIG_ASSET.to_string(),
        }
    }

    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    #[must_use]
    pub fn with_config_asset(mut self, name: impl Into<String>) -> Self {
        self.config_asset = name.into();
        self
    }

    fn get_text(&self, url: &str) -> Result<String, String> {
        let mut request = self
            .client
            .get(url)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let resp = request
            .send()
            .map_err(|e| format!("failed to fetch {url}: {e}"))?;

        if !resp.status().is_success() {
            return Err(format!("GitHub API returned {}", resp.status()));
        }

        resp.text()
            .map_err(|e| format!("failed to read response body: {e}"))
    }

    fn download(&self, asset: &Asset) -> Result<Vec<u8>, String> {
        let mut ignore = |_: u64, _: u64| {};
        download::fetch_with_progress(&self.client, &asset.url, self.token.as_deref(), &mut ignore)
    }

    fn expected_checksum(&self, asset: &Asset, release: &Release) -> Result<Option<String>, String> {
        let Some(list) = CHECKSUM_ASSETS
            .iter()
            .find_map(|name| release.assets.iter().find(|a| a.name == *name))
        else {
            debug!("release {} publishes no checksums", release.version);
            return Ok(None);
        };

        let text = self.download(list)?;
        let text = String::from_utf8_lossy(&text);
        parse_checksum(&text, &asset.name).map(Some)
    }
}

impl ReleaseSource for GitHubSource {
    fn releases(&self) -> Result<Vec<Release>, InstallerError> {
        let url = format!("{}/repos/{}/releases?per_page=100", self.api_base, self.repo);
        let text = self.get_text(&url).map_err(InstallerError::Catalog)?;

        let releases: Vec<GitHubRelease> = serde_json::from_str(&text)
            .map_err(|e| InstallerError::Catalog(format!("failed to parse releases JSON: {e}")))?;

        Ok(releases
            .into_iter()
            .filter(|r| !r.draft)
            .map(Release::from)
            .collect())
    }

    fn fetch(
        &self,
        asset: &Asset,
        release: &Release,
        progress: &mut dyn ProgressSink,
    ) -> Result<Vec<u8>, InstallerError> {
        let expected = self
            .expected_checksum(asset, release)
            .map_err(InstallerError::Download)?;

        info!("downloading {} from {}", asset.name, release.version);
        let bytes = download::fetch_with_progress(
            &self.client,
            &asset.url,
            self.token.as_deref(),
            progress,
        )
        .map_err(InstallerError::Download)?;

        if let Some(expected) = expected {
            download::verify_checksum(&bytes, &expected).map_err(InstallerError::Download)?;
            debug!("verified checksum of {}", asset.name);
        }

        Ok(bytes)
    }

    fn default_config(&self, release: &Release) -> Result<Option<Vec<u8>>, InstallerError> {
        if release.default_config.is_some() {
            return Ok(release.default_config.clone());
        }

        let Some(asset) = release.assets.iter().find(|a| a.name == self.config_asset) else {
            return Ok(None);
        };

        match self.download(asset) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) => {
                warn!("skipping default configuration: {e}");
                Ok(None)
            }
        }
    }
}

/// Parse a checksum list and return the expected hash for `asset_name`.
pub fn parse_checksum(checksums_text: &str, asset_name: &str) -> Result<String, String> {
    for line in checksums_text.lines() {
        // "<hash>  <filename>", "<hash> <filename>" or "<hash> *<filename>"
        let parts: Vec<&str> = line.splitn(2, char::is_whitespace).collect();
        if parts.len() == 2 {
            let filename = parts[1].trim().trim_start_matches('*');
            if filename == asset_name {
                return Ok(parts[0].to_string());
            }
        }
    }
    Err(format!(
        "checksum not found for {asset_name} in checksums file"
    ))
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::significant_drop_tightening
)]
mod tests {
    use super::*;

    const RELEASES_JSON: &str = r#"[
        {"tag_name": "v0.6.0-rc1", "prerelease": true, "assets": [
            {"name": "rr_linux_amd64.tar.gz", "browser_download_url": "https://example.com/rc/rr_linux_amd64.tar.gz", "size": 10}
        ]},
        {"tag_name": "v0.5.0", "assets": [
            {"name": "rr_darwin_arm64.tar.gz", "browser_download_url": "https://example.com/5/rr_darwin_arm64.tar.gz", "size": 11},
            {"name": "checksums.txt", "browser_download_url": "https://example.com/5/checksums.txt", "size": 12}
        ]},
        {"tag_name": "v0.4.0-draft", "draft": true, "assets": []}
    ]"#;

    fn source(server: &mockito::Server) -> GitHubSource {
        GitHubSource::new("owner/rr")
            .with_api_base(server.url())
            .with_token(None)
    }

    fn per_page() -> mockito::Matcher {
        mockito::Matcher::UrlEncoded("per_page".into(), "100".into())
    }

    fn asset(name: &str, url: String) -> Asset {
        let (os, arch) = parse_asset_tags(name);
        Asset {
            name: name.to_string(),
            url,
            os,
            arch,
            size: 0,
        }
    }

    #[test]
    fn parse_checksum_found() {
        let checksums = "\
abc123  rr_darwin_arm64.tar.gz
def456  rr_linux_amd64.tar.gz
";
        assert_eq!(parse_checksum(checksums, "rr_darwin_arm64.tar.gz").unwrap(), "abc123");
        assert_eq!(parse_checksum(checksums, "rr_linux_amd64.tar.gz").unwrap(), "def456");
    }

    #[test]
    fn parse_checksum_binary_mode_marker() {
        let checksums = "abc123 *rr_windows_amd64.zip\n";
        let hash = parse_checksum(checksums, "rr_windows_amd64.zip").unwrap();
        assert_eq!(hash, "abc123");
    }

    #[test]
    fn parse_checksum_not_found() {
        let result = parse_checksum("abc123  other-file.tar.gz\n", "missing.tar.gz");
        assert!(result
            .unwrap_err()
            .contains("checksum not found for missing.tar.gz"));
    }

    #[test]
    fn parse_checksum_blank_lines() {
        let checksums = "\n\nabc123  target.tar.gz\n\n";
        assert_eq!(parse_checksum(checksums, "target.tar.gz").unwrap(), "abc123");
    }

    #[test]
    fn releases_are_converted_in_order_without_drafts() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/repos/owner/rr/releases")
            .match_query(per_page())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(RELEASES_JSON)
            .create();

        let releases = source(&server).releases().unwrap();
        let versions: Vec<_> = releases.iter().map(|r| r.version.as_str()).collect();
        assert_eq!(versions, vec!["v0.6.0-rc1", "v0.5.0"]);
        assert!(releases[0].prerelease);
        assert_eq!(releases[0].assets[0].os, "linux");
        assert_eq!(releases[0].assets[0].arch, "amd64");
        assert_eq!(releases[1].assets[0].os, "darwin");
        assert_eq!(releases[1].assets[1].os, "");
        mock.assert();
    }

    #[test]
    fn sidecar_files_are_not_tagged_for_a_platform() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/repos/owner/rr/releases")
            .match_query(per_page())
            .with_status(200)
            .with_body(
                r#"[{"tag_name": "v1.0.0", "assets": [
                    {"name": "rr_linux_amd64.tar.gz.sha256", "browser_download_url": "https://example.com/rr_linux_amd64.tar.gz.sha256"},
                    {"name": "rr_linux_amd64.tar.gz.sig", "browser_download_url": "https://example.com/rr_linux_amd64.tar.gz.sig"},
                    {"name": "rr_linux_amd64.deb", "browser_download_url": "https://example.com/rr_linux_amd64.deb"},
                    {"name": "rr_linux_amd64.tar.gz", "browser_download_url": "https://example.com/rr_linux_amd64.tar.gz"}
                ]}]"#,
            )
            .create();

        let releases = source(&server).releases().unwrap();
        let tagged: Vec<_> = releases[0]
            .assets
            .iter()
            .filter(|a| !a.os.is_empty() || !a.arch.is_empty())
            .map(|a| a.name.as_str())
            .collect();
        assert_eq!(tagged, vec!["rr_linux_amd64.tar.gz"]);

        let catalog = crate::catalog::ReleaseCatalog::new(releases);
        let platform = crate::platform::PlatformDescriptor::new("linux", "amd64");
        let (asset, _) = crate::matcher::find(&catalog, &platform).unwrap();
        assert_eq!(asset.name, "rr_linux_amd64.tar.gz");
        mock.assert();
    }

    #[test]
    fn releases_api_error() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/repos/owner/rr/releases")
            .match_query(per_page())
            .with_status(403)
            .create();

        let err = source(&server).releases().unwrap_err();
        assert!(err.to_string().contains("GitHub API returned 403"));
        mock.assert();
    }

    #[test]
    fn releases_invalid_json() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/repos/owner/rr/releases")
            .match_query(per_page())
            .with_status(200)
            .with_body("not-json")
            .create();

        let err = source(&server).releases().unwrap_err();
        assert!(err.to_string().contains("failed to parse releases JSON"));
        mock.assert();
    }

    #[test]
    fn fetch_verifies_published_checksum() {
        let mut server = mockito::Server::new();
        let payload = b"archive-bytes";
        let sums = format!("{}  rr_linux_amd64.tar.gz\n", download::sha256_hex(payload));
        let sums_mock = server.mock("GET", "/checksums.txt").with_body(sums).create();
        let asset_mock = server
            .mock("GET", "/rr_linux_amd64.tar.gz")
            .with_body(payload)
            .create();

        let target = asset("rr_linux_amd64.tar.gz", format!("{}/rr_linux_amd64.tar.gz", server.url()));
        let release = Release {
            version: "v1".to_string(),
            prerelease: false,
            assets: vec![
                target.clone(),
                asset("checksums.txt", format!("{}/checksums.txt", server.url())),
            ],
            default_config: None,
        };

        let mut sink = |_: u64, _: u64| {};
        let bytes = source(&server).fetch(&target, &release, &mut sink).unwrap();
        assert_eq!(bytes, payload);
        sums_mock.assert();
        asset_mock.assert();
    }

    #[test]
    fn fetch_rejects_checksum_mismatch() {
        let mut server = mockito::Server::new();
        let _sums = server
            .mock("GET", "/checksums.txt")
            .with_body("0000  rr_linux_amd64.tar.gz\n")
            .create();
        let _asset = server
            .mock("GET", "/rr_linux_amd64.tar.gz")
            .with_body("archive-bytes")
            .create();

        let target = asset("rr_linux_amd64.tar.gz", format!("{}/rr_linux_amd64.tar.gz", server.url()));
        let release = Release {
            version: "v1".to_string(),
            prerelease: false,
            assets: vec![
                target.clone(),
                asset("checksums.txt", format!("{}/checksums.txt", server.url())),
            ],
            default_config: None,
        };

        let mut sink = |_: u64, _: u64| {};
        let err = source(&server).fetch(&target, &release, &mut sink).unwrap_err();
        assert!(matches!(err, InstallerError::Download(ref m) if m.contains("checksum mismatch")));
    }

    #[test]
    fn default_config_comes_from_release_asset() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/config.default.yml")
            .with_body("listen: 127.0.0.1\n")
            .create();

        let release = Release {
            version: "v1".to_string(),
            prerelease: false,
            assets: vec![asset(
                DEFAULT_CONFIG_ASSET,
                format!("{}/config.default.yml", server.url()),
            )],
            default_config: None,
        };

        let config = source(&server).default_config(&release).unwrap();
        assert_eq!(config.as_deref(), Some(&b"listen: 127.0.0.1\n"[..]));
        mock.assert();
    }

    #[test]
    fn default_config_absent() {
        let server = mockito::Server::new();
        let release = Release {
            version: "v1".to_string(),
            prerelease: false,
            assets: Vec::new(),
            default_config: None,
        };
        assert!(source(&server).default_config(&release).unwrap().is_none());
    }
}
