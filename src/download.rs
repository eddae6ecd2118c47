use std::io::Read;

use log::debug;
use reqwest::blocking::Client;
use sha2::{Digest, Sha256};

use crate::progress::ProgressSink;

pub(crate) const USER_AGENT: &str = concat!("release-installer/", env!("CARGO_PKG_VERSION"));

const CHUNK_SIZE: usize = 64 * 1024;

/// Download `url` into memory, reporting `(bytes so far, total)` as chunks
/// arrive. The total is the advertised length, or 0 until the body ends.
pub fn fetch_with_progress(
    client: &Client,
    url: &str,
    token: Option<&str>,
    progress: &mut dyn ProgressSink,
) -> Result<Vec<u8>, String> {
    let mut request = client
        .get(url)
        .header("User-Agent", USER_AGENT)
        .header("Accept", "application/octet-stream");
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }

    let mut resp = request
        .send()
        .map_err(|e| format!("failed to download {url}: {e}"))?;

    if !resp.status().is_success() {
        return Err(format!("{url} returned {}", resp.status()));
    }

    let total = resp.content_length().unwrap_or(0);
    debug!("downloading {url} ({total} bytes advertised)");
    progress.update(0, total);

    let mut bytes = Vec::with_capacity(usize::try_from(total).unwrap_or(0));
    let mut chunk = vec![0; CHUNK_SIZE];
    loop {
        let read = resp
            .read(&mut chunk)
            .map_err(|e| format!("failed to read {url}: {e}"))?;
        if read == 0 {
            break;
        }
        bytes.extend_from_slice(&chunk[..read]);
        progress.update(bytes.len() as u64, total);
    }

    let received = bytes.len() as u64;
    progress.update(received, received.max(total));
    Ok(bytes)
}

#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Compare the SHA-256 of `bytes` with the published `expected` hash.
pub fn verify_checksum(bytes: &[u8], expected: &str) -> Result<(), String> {
    let actual = sha256_hex(bytes);
    if actual.eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        Err(format!(
            "checksum mismatch: expected {expected}, got {actual}"
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn sha256_of_known_input() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn verify_checksum_accepts_uppercase_hash() {
        let expected = sha256_hex(b"payload").to_uppercase();
        assert!(verify_checksum(b"payload", &expected).is_ok());
    }

    #[test]
    fn verify_checksum_rejects_mismatch() {
        let err = verify_checksum(b"payload", "deadbeef").unwrap_err();
        assert!(err.contains("checksum mismatch"));
    }

    #[test]
    fn fetch_reports_progress_up_to_length() {
        let mut server = mockito::Server::new();
        let body = vec![7u8; 200_000];
        let mock = server
            .mock("GET", "/rr_linux_amd64.tar.gz")
            .with_status(200)
            .with_body(&body)
            .create();

        let mut calls = Vec::new();
        let mut sink = |transferred: u64, total: u64| calls.push((transferred, total));
        let client = Client::new();
        let bytes = fetch_with_progress(
            &client,
            &format!("{}/rr_linux_amd64.tar.gz", server.url()),
            None,
            &mut sink,
        )
        .unwrap();

        assert_eq!(bytes, body);
        assert!(calls.windows(2).all(|w| w[0].0 <= w[1].0));
        assert_eq!(calls.last(), Some(&(200_000, 200_000)));
        mock.assert();
    }

    #[test]
    fn fetch_http_error() {
        let mut server = mockito::Server::new();
        let mock = server.mock("GET", "/missing.zip").with_status(404).create();

        let client = Client::new();
        let mut sink = |_: u64, _: u64| {};
        let err = fetch_with_progress(
            &client,
            &format!("{}/missing.zip", server.url()),
            None,
            &mut sink,
        )
        .unwrap_err();

        assert!(err.contains("404"));
        mock.assert();
    }
}
