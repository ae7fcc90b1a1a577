//! Helpers for sanitizing data before it enters tracing span attributes.
//!
//! Article URLs can carry session tokens in their query string or userinfo,
//! and user ids are provider subjects. Neither goes into a span verbatim.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use reqwest::Url;

/// Keeps scheme, host, port and path of a URL; drops userinfo, query and
/// fragment.
///
/// - `https://user:pw@example.com/a?token=x#top` → `https://example.com/a`
/// - anything unparsable → `<invalid url>`
pub fn redact_url(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return "<invalid url>".to_string();
    };
    if parsed.cannot_be_a_base() {
        return format!("{}:<redacted>", parsed.scheme());
    }
    // Only fails for cannot-be-a-base URLs, handled above.
    let _ = parsed.set_username("");
    let _ = parsed.set_password(None);
    parsed.set_query(None);
    parsed.set_fragment(None);
    parsed.to_string()
}

/// Short deterministic hash of an identifier, for correlating log lines
/// without printing the identifier itself.
pub fn hash_id(id: &str) -> String {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}
