//! Deep link URL model
//!
//! Custom-scheme activation URLs (`ticketflow://verify/T1?source=scan`) are
//! split into path segments and a decoded query map before anything else
//! looks at them. Parsing here is purely structural; whether the link is a
//! recognized protocol request is the protocol collaborator's call.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;

/// A structurally parsed activation URL. Derived on demand, never persisted
/// (the durable pending slot stores the raw string).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeepLink {
    /// The raw URL as delivered by the OS
    pub url: String,
    /// Authority plus non-empty path segments, percent-decoded
    pub segments: Vec<String>,
    /// Decoded query parameters (last value wins on duplicate keys)
    pub query: HashMap<String, String>,
}

/// Split `scheme://rest`, validating the scheme characters.
/// Returns None when the input has no scheme at all.
fn split_scheme(raw: &str) -> Option<(&str, &str)> {
    let idx = raw.find("://")?;
    let scheme = &raw[..idx];
    if scheme.is_empty() {
        return None;
    }
    let mut chars = scheme.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        return None;
    }
    Some((scheme, &raw[idx + 3..]))
}

fn decode_segment(segment: &str) -> String {
    match urlencoding::decode(segment) {
        Ok(Cow::Borrowed(s)) => s.to_string(),
        Ok(Cow::Owned(s)) => s,
        Err(_) => segment.to_string(),
    }
}

/// Parse a raw activation URL into a [`DeepLink`].
///
/// Returns `None` for strings without a `scheme://` prefix; everything else
/// parses, even if the segment list ends up empty (a bare scheme).
pub fn parse_deep_link(raw: &str) -> Option<DeepLink> {
    let trimmed = raw.trim();
    let (_, rest) = split_scheme(trimmed)?;

    let (path_part, query_part) = match rest.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (rest, None),
    };

    let segments: Vec<String> = path_part
        .split('/')
        .filter(|s| !s.is_empty())
        .map(decode_segment)
        .collect();

    let query: HashMap<String, String> = match query_part {
        Some(qs) => url::form_urlencoded::parse(qs.as_bytes())
            .into_owned()
            .collect(),
        None => HashMap::new(),
    };

    Some(DeepLink {
        url: trimmed.to_string(),
        segments,
        query,
    })
}

/// A bare-scheme activation carries no payload: nothing after the scheme but
/// slashes, and no query string. These open the app without going through
/// the protocol parser.
pub fn is_bare_scheme(raw: &str) -> bool {
    match split_scheme(raw.trim()) {
        Some((_, rest)) => !rest.contains('?') && rest.trim_matches('/').is_empty(),
        None => false,
    }
}

/// Normalize a URL for dedup keying: lowercase the scheme and authority,
/// strip trailing slashes, keep the query byte-for-byte. OS re-deliveries of
/// the same link can differ in scheme case and trailing-slash noise; query
/// strings are payload and stay untouched.
pub fn normalize_link(raw: &str) -> String {
    let trimmed = raw.trim();
    let Some((scheme, rest)) = split_scheme(trimmed) else {
        return trimmed.to_string();
    };

    let (path_part, query_part) = match rest.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (rest, None),
    };

    let path_part = path_part.trim_end_matches('/');
    let mut pieces = path_part.splitn(2, '/');
    let authority = pieces.next().unwrap_or("").to_ascii_lowercase();
    let tail = pieces.next();

    let mut normalized = format!("{}://{}", scheme.to_ascii_lowercase(), authority);
    if let Some(tail) = tail {
        normalized.push('/');
        normalized.push_str(tail);
    }
    if let Some(query) = query_part {
        if !query.is_empty() {
            normalized.push('?');
            normalized.push_str(query);
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_segments_and_query() {
        let link = parse_deep_link("ticketflow://pay?amount=500").unwrap();
        assert_eq!(link.segments, vec!["pay".to_string()]);
        assert_eq!(link.query.get("amount"), Some(&"500".to_string()));
        assert_eq!(link.url, "ticketflow://pay?amount=500");
    }

    #[test]
    fn test_parse_nested_path() {
        let link = parse_deep_link("ticketflow://verify/T1/confirm?source=scan&lang=en").unwrap();
        assert_eq!(
            link.segments,
            vec!["verify".to_string(), "T1".to_string(), "confirm".to_string()]
        );
        assert_eq!(link.query.get("source"), Some(&"scan".to_string()));
        assert_eq!(link.query.get("lang"), Some(&"en".to_string()));
    }

    #[test]
    fn test_parse_decodes_segments_and_query() {
        let link = parse_deep_link("ticketflow://sell/Summer%20Fest?title=VIP+Pass").unwrap();
        assert_eq!(link.segments[1], "Summer Fest");
        assert_eq!(link.query.get("title"), Some(&"VIP Pass".to_string()));
    }

    #[test]
    fn test_parse_rejects_schemeless() {
        assert!(parse_deep_link("not a url").is_none());
        assert!(parse_deep_link("/relative/path?x=1").is_none());
        assert!(parse_deep_link("://missing-scheme").is_none());
    }

    #[test]
    fn test_bare_scheme_detection() {
        assert!(is_bare_scheme("ticketflow://"));
        assert!(is_bare_scheme("ticketflow:///"));
        assert!(is_bare_scheme("  ticketflow://  "));
        assert!(!is_bare_scheme("ticketflow://pay"));
        assert!(!is_bare_scheme("ticketflow://?amount=500"));
        assert!(!is_bare_scheme("plain text"));
    }

    #[test]
    fn test_normalize_case_and_slashes() {
        assert_eq!(
            normalize_link("TicketFlow://Pay/"),
            "ticketflow://pay"
        );
        assert_eq!(
            normalize_link("ticketflow://pay?amount=500"),
            normalize_link("TICKETFLOW://pay/?amount=500")
        );
    }

    #[test]
    fn test_normalize_preserves_query_and_deep_path_case() {
        // Only scheme and authority fold; the tail can be a case-sensitive id
        assert_eq!(
            normalize_link("ticketflow://Verify/TiCkEt1?Code=AbC"),
            "ticketflow://verify/TiCkEt1?Code=AbC"
        );
    }
}
