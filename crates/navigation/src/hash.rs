//! Hash fragment codec
//!
//! Format: `#nb=<notebook>&sec=<section>&pg=<page>&block=<block>`. Only `nb`
//! is mandatory; values are percent-encoded.

use crate::NavAddress;

const KEY_NOTEBOOK: &str = "nb";
const KEY_SECTION: &str = "sec";
const KEY_PAGE: &str = "pg";
const KEY_BLOCK: &str = "block";

/// Parse a hash fragment into an address.
///
/// The leading `#` is optional. Unknown keys and undecodable values are
/// ignored, empty values count as absent. Returns `None` when there is no
/// notebook.
pub fn parse_hash(hash: &str) -> Option<NavAddress> {
    let body = hash.strip_prefix('#').unwrap_or(hash);

    let mut address = NavAddress::default();
    for pair in body.split('&') {
        let Some((key, raw)) = pair.split_once('=') else {
            continue;
        };
        let Ok(value) = urlencoding::decode(raw) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }
        let value = value.into_owned();
        match key {
            KEY_NOTEBOOK => address.notebook_id = value,
            KEY_SECTION => address.section_id = Some(value),
            KEY_PAGE => address.page_id = Some(value),
            KEY_BLOCK => address.block_id = Some(value),
            _ => {}
        }
    }

    if address.notebook_id.is_empty() {
        None
    } else {
        Some(address)
    }
}

/// Build the hash fragment (with leading `#`) for an address.
pub fn build_hash(address: &NavAddress) -> String {
    let mut hash = format!("#{}={}", KEY_NOTEBOOK, urlencoding::encode(&address.notebook_id));
    let optional = [
        (KEY_SECTION, &address.section_id),
        (KEY_PAGE, &address.page_id),
        (KEY_BLOCK, &address.block_id),
    ];
    for (key, value) in optional {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            hash.push('&');
            hash.push_str(key);
            hash.push('=');
            hash.push_str(&urlencoding::encode(value));
        }
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_hash() {
        let address = parse_hash("#nb=n1&sec=s1&pg=p1&block=b1").unwrap();
        assert_eq!(address, NavAddress::page("n1", "s1", "p1").with_block("b1"));
    }

    #[test]
    fn test_parse_requires_notebook() {
        assert_eq!(parse_hash(""), None);
        assert_eq!(parse_hash("#"), None);
        assert_eq!(parse_hash("#sec=s1&pg=p1"), None);
        assert_eq!(parse_hash("#nb=&sec=s1"), None);
    }

    #[test]
    fn test_parse_without_hash_sign_and_unknown_keys() {
        let address = parse_hash("nb=n1&zoom=2&garbage").unwrap();
        assert_eq!(address, NavAddress::notebook("n1"));
    }

    #[test]
    fn test_build_skips_absent_levels() {
        assert_eq!(build_hash(&NavAddress::notebook("n1")), "#nb=n1");
        let address = NavAddress {
            notebook_id: "n1".into(),
            section_id: None,
            page_id: Some("p1".into()),
            block_id: None,
        };
        assert_eq!(build_hash(&address), "#nb=n1&pg=p1");
    }

    #[test]
    fn test_values_are_percent_encoded() {
        let address = NavAddress::section("my notebook", "a&b=c");
        let hash = build_hash(&address);
        assert_eq!(hash, "#nb=my%20notebook&sec=a%26b%3Dc");
        assert_eq!(parse_hash(&hash), Some(address));
    }
}
