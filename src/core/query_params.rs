/// Splits a request path into its non-empty segments, ignoring any query string.
///
/// # Example
/// ```
/// let segments = glimpse::core::query_params::path_segments("/api/user/follow/42?x=1");
/// assert_eq!(segments, vec!["api", "user", "follow", "42"]);
/// ```
pub fn path_segments(path: &str) -> Vec<&str> {
    let path = match path.find('?') {
        Some(idx) => &path[..idx],
        None => path,
    };
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// URL-decodes a single path segment, falling back to the raw text when the
/// encoding is invalid.
pub fn decode_segment(segment: &str) -> String {
    urlencoding::decode(segment)
        .unwrap_or(std::borrow::Cow::Borrowed(segment))
        .to_string()
}

/// Reads one cookie value out of a `Cookie` request header.
pub fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then_some(value)
    })
}
