//! Destination filename derivation for direct downloads

/// Used when neither the server nor the URL offers a usable name
pub const FALLBACK_FILENAME: &str = "downloaded_file";

const MIN_NAME_LEN: usize = 2;

/// Pick the destination filename
///
/// Priority: Content-Disposition hint, then the last URL path segment
/// (percent-decoded), then [`FALLBACK_FILENAME`]. Candidates shorter than two
/// characters are skipped.
pub fn derive_filename(content_disposition: Option<&str>, url: &str) -> String {
    content_disposition
        .and_then(parse_content_disposition)
        .and_then(|name| usable(&name))
        .or_else(|| filename_from_url(url).and_then(|name| usable(&name)))
        .unwrap_or_else(|| FALLBACK_FILENAME.to_string())
}

/// Parse the filename out of a Content-Disposition header
///
/// Handles `filename="a.zip"`, `filename=a.zip` and the RFC 5987 form
/// `filename*=UTF-8''a%20b.zip`, preferring the latter when both exist.
pub fn parse_content_disposition(header: &str) -> Option<String> {
    let lower = header.to_ascii_lowercase();

    if let Some(pos) = lower.find("filename*=") {
        let value = header[pos + 10..].trim();
        if let Some(quote_pos) = value.find("''") {
            let encoded = &value[quote_pos + 2..];
            let end = encoded.find(';').unwrap_or(encoded.len());
            let encoded = encoded[..end].trim().trim_matches('"');
            if let Ok(decoded) = urlencoding::decode(encoded) {
                return Some(decoded.into_owned());
            }
        }
    }

    let pos = lower.find("filename=")?;
    let value = header[pos + 9..].trim();
    if let Some(stripped) = value.strip_prefix('"') {
        let end = stripped.find('"')?;
        return Some(stripped[..end].to_string());
    }

    let end = value.find(';').unwrap_or(value.len());
    let name = value[..end].trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Last path segment of a URL, percent-decoded
fn filename_from_url(url: &str) -> Option<String> {
    let path = match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or(url).to_string(),
    };

    let segment = path.rsplit('/').next()?;
    let decoded = urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string());
    Some(decoded)
}

/// Reduce a candidate to a safe single path component, or reject it
fn usable(name: &str) -> Option<String> {
    // Never let a server-supplied name escape the save directory
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| match c {
            ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim().to_string();

    if cleaned == "." || cleaned == ".." || cleaned.chars().count() < MIN_NAME_LEN {
        None
    } else {
        Some(cleaned)
    }
}
