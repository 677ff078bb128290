//! Header name helpers
//!
//! `http::HeaderName` compares case-insensitively, so canonical casing only
//! matters when a caller supplies the same header more than once under
//! different spellings. In that case the spelling that is already
//! canonical (`Content-Type`, not `content-type`) wins.

use crate::{Error, Result};
use http::header::{HeaderName, HeaderValue};
use std::collections::HashMap;

/// Canonical MIME-style spelling of a header name.
///
/// The first letter and every letter following a hyphen are upper-cased,
/// the rest lower-cased. Names containing a space or a character that is
/// not a valid token character are returned unchanged.
pub fn canonical_header_key(name: &str) -> String {
    if !name.bytes().all(is_token_byte) {
        return name.to_string();
    }

    let mut upper = true;
    name.chars()
        .map(|c| {
            let out = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            out
        })
        .collect()
}

fn is_token_byte(b: u8) -> bool {
    matches!(b,
        b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.'
        | b'^' | b'_' | b'`' | b'|' | b'~'
        | b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z')
}

/// Parse a header name supplied by configuration
pub fn parse_header_name(name: &str) -> Result<HeaderName> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|_| Error::InvalidHeaderName(name.to_string()))
}

/// Parse a header value supplied by configuration
pub fn parse_header_value(name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|_| Error::InvalidHeaderValue {
        name: name.to_string(),
    })
}

/// Resolve a name → value map into one value per header.
///
/// Keys that differ only in case collapse into one header. When several
/// spellings are present, the value stored under the canonical spelling is
/// used; the choice between two non-canonical spellings is unspecified.
/// The result is sorted by header name so it is stable across runs.
pub fn resolve_headers<'a, I>(headers: I) -> Result<Vec<(HeaderName, HeaderValue)>>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut resolved: HashMap<String, (bool, &'a str)> = HashMap::new();

    for (name, value) in headers {
        let canonical = canonical_header_key(name);
        let is_canonical = canonical == name;
        match resolved.get_mut(&canonical) {
            Some(slot) if slot.0 && !is_canonical => {}
            Some(slot) => *slot = (is_canonical, value),
            None => {
                resolved.insert(canonical, (is_canonical, value));
            }
        }
    }

    let mut out = resolved
        .into_iter()
        .map(|(name, (_, value))| Ok((parse_header_name(&name)?, parse_header_value(&name, value)?)))
        .collect::<Result<Vec<_>>>()?;
    out.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
    Ok(out)
}
