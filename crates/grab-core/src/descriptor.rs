//! Descriptor resolver - fetches a torrent file from a URL into a temp file
//!
//! Also home to the HTML sniffing guard: a "torrent" URL that actually served
//! an error page must never reach the swarm provider.

use crate::error::GrabError;
use crate::http::ensure_success;
use reqwest::Client;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

/// Number of leading bytes inspected for an HTML signature
const SNIFF_LEN: usize = 512;

/// A torrent file downloaded to a temporary location
///
/// The file is removed when this value is dropped, whatever the outcome of
/// the transfer that used it.
#[derive(Debug)]
pub struct ResolvedDescriptor {
    path: TempPath,
}

impl ResolvedDescriptor {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Downloads torrent files referenced by URL
#[derive(Debug, Clone)]
pub struct DescriptorResolver {
    client: Client,
    temp_dir: PathBuf,
}

impl DescriptorResolver {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            temp_dir: std::env::temp_dir(),
        }
    }

    /// Use a specific directory for temporary torrent files
    pub fn with_temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = temp_dir.into();
        self
    }

    /// Fetch `url` into a temporary torrent file
    ///
    /// Any non-2xx status fails with `NotFound` before anything touches disk.
    /// Content is not validated here; the swarm engine sniffs it.
    pub async fn resolve_descriptor_url(&self, url: &str) -> Result<ResolvedDescriptor, GrabError> {
        info!("Fetching torrent file: {}", url);

        let response = self.client.get(url).send().await?;
        let response = match ensure_success(response) {
            Ok(response) => response,
            Err(GrabError::ServerError { status, .. }) => {
                warn!("Torrent URL {} returned {}", url, status);
                return Err(GrabError::NotFound {
                    url: url.to_string(),
                    status,
                });
            }
            Err(e) => return Err(e),
        };

        let body = response.bytes().await?;

        let temp = tempfile::Builder::new()
            .prefix("grab-")
            .suffix(".torrent")
            .tempfile_in(&self.temp_dir)?
            .into_temp_path();
        tokio::fs::write(&temp, &body).await?;
        debug!("Wrote {} bytes of torrent data to {}", body.len(), temp.display());

        Ok(ResolvedDescriptor { path: temp })
    }
}

/// Whether a buffer starts like an HTML document rather than a torrent
pub fn looks_like_html(bytes: &[u8]) -> bool {
    let start = bytes
        .strip_prefix(b"\xEF\xBB\xBF".as_slice())
        .unwrap_or(bytes);
    let trimmed = match start.iter().position(|b| !b.is_ascii_whitespace()) {
        Some(pos) => &start[pos..],
        None => return false,
    };

    [b"<!doctype".as_slice(), b"<html".as_slice()]
        .iter()
        .any(|sig| {
            trimmed.len() >= sig.len() && trimmed[..sig.len()].eq_ignore_ascii_case(sig)
        })
}

/// Reject a buffer that is an HTML page
pub fn validate_descriptor_bytes(bytes: &[u8], source: &Path) -> Result<(), GrabError> {
    if looks_like_html(bytes) {
        return Err(GrabError::InvalidDescriptor(format!(
            "{} is an HTML page, not a torrent (the link probably served an error page)",
            source.display()
        )));
    }
    Ok(())
}

/// Sniff the head of a local torrent file, then read it whole
pub async fn read_validated_descriptor(path: &Path) -> Result<Vec<u8>, GrabError> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut head = Vec::with_capacity(SNIFF_LEN);
    (&mut file).take(SNIFF_LEN as u64).read_to_end(&mut head).await?;
    validate_descriptor_bytes(&head, path)?;

    let mut bytes = head;
    file.read_to_end(&mut bytes).await?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_signatures() {
        assert!(looks_like_html(b"<!DOCTYPE html><html><body>404</body></html>"));
        assert!(looks_like_html(b"<!doctype html>"));
        assert!(looks_like_html(b"<html>"));
        assert!(looks_like_html(b"  \r\n<HTML lang=\"en\">"));
        assert!(looks_like_html(b"\xEF\xBB\xBF<!DOCTYPE html>"));
    }

    #[test]
    fn test_torrent_bytes_pass() {
        assert!(!looks_like_html(b"d8:announce35:udp://tracker.example.com:80e"));
        assert!(!looks_like_html(b""));
        assert!(!looks_like_html(b"<htm"));
    }

    #[tokio::test]
    async fn test_read_validated_descriptor() {
        let dir = tempfile::tempdir().unwrap();

        let good = dir.path().join("good.torrent");
        let mut payload = b"d4:info".to_vec();
        payload.extend(std::iter::repeat(b'x').take(2000));
        std::fs::write(&good, &payload).unwrap();
        assert_eq!(read_validated_descriptor(&good).await.unwrap(), payload);

        let bad = dir.path().join("bad.torrent");
        std::fs::write(&bad, "<!DOCTYPE html><title>Not Found</title>").unwrap();
        let err = read_validated_descriptor(&bad).await.unwrap_err();
        assert!(matches!(err, GrabError::InvalidDescriptor(_)));
    }
}
