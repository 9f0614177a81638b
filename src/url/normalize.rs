use crate::UrlError;
use url::Url;

/// Normalizes a URL into the form used as the ledger key
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Accept only `http` and `https` (the scheme itself is kept)
/// 3. Lowercase the host
/// 4. Normalize path:
///    - Remove dot segments (`.` and `..`)
///    - Collapse repeated slashes
///    - Empty path becomes `/`
/// 5. Remove fragment (everything after `#`)
/// 6. Remove an empty query string (trailing `?`)
///
/// Default ports are dropped by the parser itself.
///
/// # Examples
///
/// ```
/// use corpus_harvester::url::normalize_url;
///
/// let url = normalize_url("http://A.MN/news/../about#team").unwrap();
/// assert_eq!(url.as_str(), "http://a.mn/about");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    let host = url.host_str().ok_or(UrlError::MissingDomain)?.to_lowercase();
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Parse(format!("Failed to set host: {}", e)))?;

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if url.query() == Some("") {
        url.set_query(None);
    }

    Ok(url)
}

/// Removes dot segments and repeated slashes, keeping a trailing slash
fn normalize_path(path: &str) -> String {
    let trailing_slash = path.len() > 1 && path.ends_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    let mut result = format!("/{}", segments.join("/"));
    if trailing_slash {
        result.push('/');
    }
    result
}
