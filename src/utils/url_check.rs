//! Syntactic URL validation

use url::Url;

/// Check that a string looks like a fetchable URL
///
/// Only the syntax is checked: the value must parse and carry both a
/// scheme and a host. Blank strings and the literal `nan` (what an empty
/// CSV cell used to turn into) are rejected.
pub fn is_valid_url(candidate: &str) -> bool {
    let candidate = candidate.trim();
    if candidate.is_empty() || candidate.eq_ignore_ascii_case("nan") {
        return false;
    }

    match Url::parse(candidate) {
        Ok(url) => !url.scheme().is_empty() && url.host_str().is_some_and(|h| !h.is_empty()),
        Err(_) => false,
    }
}
