//! Reference classifier - decides which pathway an input takes

use crate::error::GrabError;
use grab_types::TransferKind;
use std::path::Path;

const MAGNET_PREFIX: &str = "magnet:";
const DESCRIPTOR_EXTENSION: &str = ".torrent";

/// Classify a raw CLI argument
///
/// Rules are tried in order: magnet link, torrent URL, any other http(s) URL,
/// existing local file. Anything else is unresolvable.
pub fn classify(raw: &str) -> Result<TransferKind, GrabError> {
    let input = raw.trim();

    if starts_with_ignore_case(input, MAGNET_PREFIX) {
        return Ok(TransferKind::SwarmMagnet(input.to_string()));
    }

    if is_http_url(input) {
        if is_descriptor_url(input) {
            return Ok(TransferKind::SwarmDescriptorUrl(input.to_string()));
        }
        return Ok(TransferKind::DirectHttp(input.to_string()));
    }

    let path = Path::new(input);
    if !input.is_empty() && path.is_file() {
        return Ok(TransferKind::SwarmDescriptorFile(path.to_path_buf()));
    }

    Err(GrabError::Unresolvable(raw.to_string()))
}

fn starts_with_ignore_case(input: &str, prefix: &str) -> bool {
    input
        .get(..prefix.len())
        .map(|head| head.eq_ignore_ascii_case(prefix))
        .unwrap_or(false)
}

fn is_http_url(input: &str) -> bool {
    starts_with_ignore_case(input, "http://") || starts_with_ignore_case(input, "https://")
}

/// Whether an http(s) URL points at a torrent file
///
/// The path component must end in `.torrent`. Only when there is no query
/// string do we also accept the extension appearing elsewhere in the path
/// (e.g. `/file.torrent/download`), so a query that merely mentions
/// `.torrent` never turns an ISO link into a torrent.
fn is_descriptor_url(input: &str) -> bool {
    let (path, has_query) = match url::Url::parse(input) {
        Ok(parsed) => (parsed.path().to_string(), parsed.query().is_some()),
        Err(_) => {
            let without_fragment = input.split('#').next().unwrap_or(input);
            let has_query = without_fragment.contains('?');
            let before_query = without_fragment.split('?').next().unwrap_or(without_fragment);
            (before_query.to_string(), has_query)
        }
    };

    let path = path.to_ascii_lowercase();
    if path.ends_with(DESCRIPTOR_EXTENSION) {
        return true;
    }

    !has_query && path.contains(DESCRIPTOR_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GrabError;

    #[test]
    fn test_magnet_links() {
        let kind = classify("magnet:?xt=urn:btih:abc123&dn=ubuntu").unwrap();
        assert!(matches!(kind, TransferKind::SwarmMagnet(_)));

        let kind = classify("MAGNET:?xt=urn:btih:ABC").unwrap();
        assert!(matches!(kind, TransferKind::SwarmMagnet(_)));
    }

    #[test]
    fn test_torrent_urls() {
        for url in [
            "https://releases.ubuntu.com/24.04/ubuntu-24.04-desktop-amd64.iso.torrent",
            "http://example.com/a.TORRENT",
            "https://example.com/files/x.torrent?session=1",
            "https://example.com/x.torrent/download",
        ] {
            assert_eq!(
                classify(url).unwrap(),
                TransferKind::SwarmDescriptorUrl(url.to_string()),
                "{url}"
            );
        }
    }

    #[test]
    fn test_query_mentioning_torrent_stays_direct() {
        let url = "https://mirror.example.com/debian-12.iso?ref=debian-12.iso.torrent";
        assert_eq!(
            classify(url).unwrap(),
            TransferKind::DirectHttp(url.to_string())
        );
    }

    #[test]
    fn test_direct_urls() {
        let kind = classify("https://example.com/file.zip").unwrap();
        assert_eq!(
            kind,
            TransferKind::DirectHttp("https://example.com/file.zip".to_string())
        );

        let kind = classify("HTTP://example.com/").unwrap();
        assert!(matches!(kind, TransferKind::DirectHttp(_)));
    }

    #[test]
    fn test_local_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let kind = classify(file.path().to_str().unwrap()).unwrap();
        assert_eq!(
            kind,
            TransferKind::SwarmDescriptorFile(file.path().to_path_buf())
        );
    }

    #[test]
    fn test_directory_is_not_a_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let result = classify(dir.path().to_str().unwrap());
        assert!(matches!(result, Err(GrabError::Unresolvable(_))));
    }

    #[test]
    fn test_unresolvable() {
        for input in ["", "   ", "/definitely/not/here.torrent", "ftp://example.com/x"] {
            assert!(
                matches!(classify(input), Err(GrabError::Unresolvable(_))),
                "{input:?}"
            );
        }
    }
}
