//! End-to-end tests for the installation pipeline.
//!
//! Release catalogs are served from memory or from a local mock of the GitHub
//! API, so the full flow (resolution, download, extraction, conflict
//! handling, configuration) runs without network access.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::fs;
use std::io::Write;
use std::path::Path;

use release_installer::github::GitHubSource;
use release_installer::{
    Asset, FixedAnswer, InstallOptions, InstallerError, PlatformDescriptor, ProgressSink, Release,
    ReleaseSource,
};

struct MemorySource {
    releases: Vec<Release>,
    archive: Vec<u8>,
}

impl ReleaseSource for MemorySource {
    fn releases(&self) -> Result<Vec<Release>, InstallerError> {
        Ok(self.releases.clone())
    }

    fn fetch(
        &self,
        _asset: &Asset,
        _release: &Release,
        progress: &mut dyn ProgressSink,
    ) -> Result<Vec<u8>, InstallerError> {
        progress.update(0, 0);
        progress.update(self.archive.len() as u64, self.archive.len() as u64);
        Ok(self.archive.clone())
    }
}

fn tar_gz(name: &str, content: &[u8]) -> Vec<u8> {
    let mut tar_builder = tar::Builder::new(Vec::new());
    let mut header = tar::Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o755);
    header.set_cksum();
    tar_builder.append_data(&mut header, name, content).unwrap();
    let tar_bytes = tar_builder.into_inner().unwrap();

    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(&tar_bytes).unwrap();
    encoder.finish().unwrap()
}

fn rr_source() -> MemorySource {
    MemorySource {
        releases: vec![Release {
            version: "v1.0.0".to_string(),
            prerelease: false,
            assets: vec![Asset {
                name: "rr_linux_amd64.tar.gz".to_string(),
                url: "https://example.com/rr_linux_amd64.tar.gz".to_string(),
                os: "linux".to_string(),
                arch: "amd64".to_string(),
                size: 0,
            }],
            default_config: None,
        }],
        archive: tar_gz("rr", b"fresh-binary"),
    }
}

fn options(dir: &Path) -> InstallOptions {
    InstallOptions::new("rr", dir, PlatformDescriptor::new("linux", "amd64"))
}

#[test]
fn install_into_empty_directory() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("bin");

    let installation =
        release_installer::install(&rr_source(), &mut FixedAnswer(true), &options(&target))
            .expect("install should succeed");

    assert_eq!(installation.path, target.join("rr"));
    assert_eq!(fs::read(&installation.path).unwrap(), b"fresh-binary");
    assert_eq!(fs::read_dir(&target).unwrap().count(), 1);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(&installation.path).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111, "binary should have executable bits set");
    }
}

#[test]
fn declined_overwrite_fails_and_keeps_original() {
    let dir = tempfile::tempdir().unwrap();
    let existing = dir.path().join("rr");
    fs::write(&existing, b"original-binary").unwrap();

    let result =
        release_installer::install(&rr_source(), &mut FixedAnswer(false), &options(dir.path()));

    assert!(
        matches!(result, Err(InstallerError::NothingInstalled { declined: 1 })),
        "declining every conflict should fail"
    );
    assert_eq!(fs::read(&existing).unwrap(), b"original-binary");
}

#[test]
fn unsupported_platform_names_searched_releases() {
    let dir = tempfile::tempdir().unwrap();
    let mut opts = options(dir.path());
    opts.platform = PlatformDescriptor::new("darwin", "arm64");

    let err = release_installer::install(&rr_source(), &mut FixedAnswer(true), &opts).unwrap_err();

    match err {
        InstallerError::NoMatchingAsset(e) => {
            assert_eq!(e.os, "darwin");
            assert_eq!(e.arch, "arm64");
            assert_eq!(e.searched, vec!["v1.0.0"]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn install_from_github_api() {
    let mut server = mockito::Server::new();
    let archive = tar_gz("rr_1.1.0/rr", b"from-github");
    let body = format!(
        r#"[
            {{"tag_name": "v1.2.0", "assets": [
                {{"name": "rr_darwin_arm64.tar.gz", "browser_download_url": "{url}/v1.2.0/rr_darwin_arm64.tar.gz", "size": 1}}
            ]}},
            {{"tag_name": "v1.1.0", "assets": [
                {{"name": "rr_1.1.0_linux_x86_64.tar.gz", "browser_download_url": "{url}/v1.1.0/rr_1.1.0_linux_x86_64.tar.gz", "size": {size}}},
                {{"name": "config.default.yml", "browser_download_url": "{url}/v1.1.0/config.default.yml", "size": 9}}
            ]}}
        ]"#,
        url = server.url(),
        size = archive.len()
    );

    let releases = server
        .mock("GET", "/repos/owner/rr/releases")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create();
    let asset = server
        .mock("GET", "/v1.1.0/rr_1.1.0_linux_x86_64.tar.gz")
        .with_body(&archive)
        .create();
    let config = server
        .mock("GET", "/v1.1.0/config.default.yml")
        .with_body("debug: 1\n")
        .create();

    let dir = tempfile::tempdir().unwrap();
    let source = GitHubSource::new("owner/rr")
        .with_api_base(server.url())
        .with_token(None);

    let installation =
        release_installer::install(&source, &mut FixedAnswer(true), &options(dir.path())).unwrap();

    assert_eq!(installation.version, "v1.1.0");
    assert_eq!(fs::read(dir.path().join("rr")).unwrap(), b"from-github");
    assert_eq!(
        fs::read_to_string(dir.path().join("config.yml")).unwrap(),
        "debug: 1\n"
    );
    releases.assert();
    asset.assert();
    config.assert();
}
