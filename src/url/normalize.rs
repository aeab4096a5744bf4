use crate::UrlError;
use url::{form_urlencoded, Url};

/// Query parameters that never change page identity
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid"];

/// Normalizes a URL into the identity key used for pages and graph nodes
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed or not HTTP(S)
/// 2. Lowercase the host and remove a `www.` prefix
/// 3. Keep an explicit port
/// 4. Remove dot segments, duplicate slashes and the trailing slash
/// 5. Drop the scheme and the fragment
/// 6. Remove tracking query parameters (`utm_*`, `fbclid`, ...) and sort the rest
///
/// # Examples
///
/// ```
/// use link_spider::url::normalize_url;
///
/// let key = normalize_url("https://WWW.Blog.dev/path/").unwrap();
/// assert_eq!(key, "blog.dev/path");
/// ```
pub fn normalize_url(url_str: &str) -> Result<String, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    let host = url.host_str().ok_or(UrlError::MissingDomain)?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    if host.is_empty() {
        return Err(UrlError::MissingDomain);
    }

    let mut normalized = match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };

    normalized.push_str(&normalize_path(url.path()));

    let params = filter_and_sort_query_params(&url);
    if !params.is_empty() {
        normalized.push('?');
        normalized.push_str(&params.join("&"));
    }

    Ok(normalized)
}

/// Normalizes a URL path; the root path becomes empty
fn normalize_path(path: &str) -> String {
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
        String::new()
    } else {
        format!("/{}", segments.join("/"))
    }
}

/// Filters out tracking parameters and sorts the remaining ones
///
/// Pairs stay percent-encoded as the parser left them; only the name is
/// decoded to match it against the tracking list. Decoding the whole pair
/// would let `+` turn into a space and `%26` into a separator.
fn filter_and_sort_query_params(url: &Url) -> Vec<&str> {
    let mut params: Vec<&str> = url
        .query()
        .unwrap_or("")
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| {
            let name = form_urlencoded::parse(pair.as_bytes())
                .next()
                .map(|(name, _)| name.into_owned())
                .unwrap_or_default();
            !is_tracking_param(&name)
        })
        .collect();

    params.sort_unstable();
    params
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}
