//! Media reference rewriting for rich-text bodies
//!
//! Only the `src` attribute of `<img>` tags is touched; every other byte of
//! the document is preserved, so storage and display forms differ only in
//! how addresses are written.

use crate::address::{normalize_gateway, ContentAddress};
use cid::Cid;
use regex::{Captures, Regex};
use std::str::FromStr;
use std::sync::OnceLock;

fn img_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<img\b[^>]*>").expect("img tag pattern is valid"))
}

fn src_attr() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)(\ssrc\s*=\s*)(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
            .expect("src attribute pattern is valid")
    })
}

/// Result of lifting display URLs out of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    /// Document with bare addresses in place of display URLs
    pub html: String,
    /// Addresses found, in document order, without duplicates
    pub addresses: Vec<ContentAddress>,
}

/// Apply `rewrite` to every `<img src>` value; `None` keeps the value
fn rewrite_img_sources<F>(html: &str, mut rewrite: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    img_tag()
        .replace_all(html, |tag: &Captures| {
            src_attr()
                .replace(&tag[0], |attr: &Captures| {
                    let (value, quote) = if let Some(m) = attr.get(2) {
                        (m.as_str(), "\"")
                    } else if let Some(m) = attr.get(3) {
                        (m.as_str(), "'")
                    } else {
                        (attr.get(4).map(|m| m.as_str()).unwrap_or_default(), "")
                    };

                    match rewrite(value) {
                        Some(new_value) => format!("{}{}{}{}", &attr[1], quote, new_value, quote),
                        None => attr[0].to_string(),
                    }
                })
                .into_owned()
        })
        .into_owned()
}

/// Replace display-URL media sources with their bare content address
///
/// A source is rewritten when it starts with one of `prefixes` and the
/// remainder begins with a content address; any path or query after the
/// address is kept. Already bare sources are left as they are, so the
/// operation is idempotent.
pub fn extract_and_replace<S: AsRef<str>>(html: &str, prefixes: &[S]) -> Extracted {
    let mut addresses: Vec<ContentAddress> = Vec::new();

    let html = rewrite_img_sources(html, |src| {
        let rest = prefixes
            .iter()
            .find_map(|prefix| src.strip_prefix(prefix.as_ref()))?;
        let (bare, _) = split_address(rest)?;

        let address = ContentAddress::unchecked(bare);
        if !addresses.contains(&address) {
            addresses.push(address);
        }
        Some(rest.to_string())
    });

    Extracted { html, addresses }
}

/// Split a media source into its leading content address and the path or
/// query that follows it
///
/// The address is a CID, or an alphanumeric handle with a CID prefix
/// (`Qm`, `baf`). The remainder is empty or starts with `/`, `?` or `#`.
/// Extraction and display rewriting both go through this test.
pub fn split_address(src: &str) -> Option<(&str, &str)> {
    let end = src.find(&['/', '?', '#'][..]).unwrap_or(src.len());
    let (address, rest) = src.split_at(end);

    let is_address = !address.is_empty()
        && address.chars().all(|c| c.is_ascii_alphanumeric())
        && (address.starts_with("Qm") || address.starts_with("baf") || Cid::from_str(address).is_ok());
    is_address.then_some((address, rest))
}

/// Inverse of [`extract_and_replace`]: prefix bare addresses with `gateway`
pub fn add_display_url(html: &str, gateway: &str) -> String {
    let gateway = normalize_gateway(gateway);
    rewrite_img_sources(html, |src| {
        split_address(src).is_some().then(|| format!("{}{}", gateway, src))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::DEFAULT_GATEWAY;

    const PREFIXES: [&str; 1] = [DEFAULT_GATEWAY];

    #[test]
    fn test_extracts_single_image() {
        let html = r#"<p>hi</p><img src="https://ipfs.io/ipfs/Qm123">"#;
        let extracted = extract_and_replace(html, &PREFIXES);

        assert_eq!(extracted.html, r#"<p>hi</p><img src="Qm123">"#);
        assert_eq!(extracted.addresses, vec![ContentAddress::unchecked("Qm123")]);
    }

    #[test]
    fn test_preserves_other_attributes_and_quotes() {
        let html = "<img alt=\"a\" src='https://ipfs.io/ipfs/QmA' width=10/><img data-src=\"https://ipfs.io/ipfs/QmB\" src=https://ipfs.io/ipfs/QmC>";
        let extracted = extract_and_replace(html, &PREFIXES);

        assert_eq!(
            extracted.html,
            "<img alt=\"a\" src='QmA' width=10/><img data-src=\"https://ipfs.io/ipfs/QmB\" src=QmC>"
        );
        assert_eq!(
            extracted.addresses,
            vec![ContentAddress::unchecked("QmA"), ContentAddress::unchecked("QmC")]
        );
    }

    #[test]
    fn test_foreign_sources_untouched() {
        let html = r#"<img src="https://example.com/cat.png"><img src="https://ipfs.io/ipfs/">"#;
        let extracted = extract_and_replace(html, &PREFIXES);

        assert_eq!(extracted.html, html);
        assert!(extracted.addresses.is_empty());
    }

    #[test]
    fn test_duplicates_collected_once() {
        let html = r#"<img src="https://ipfs.io/ipfs/Qm1"><img src="https://ipfs.io/ipfs/Qm1">"#;
        let extracted = extract_and_replace(html, &PREFIXES);
        assert_eq!(extracted.addresses.len(), 1);
    }

    #[test]
    fn test_second_extraction_is_noop() {
        let html = r#"<h1>T</h1><img src="https://ipfs.io/ipfs/Qm1"><p>x</p><IMG SRC="https://ipfs.io/ipfs/Qm2">"#;
        let once = extract_and_replace(html, &PREFIXES);
        let twice = extract_and_replace(&once.html, &PREFIXES);

        assert_eq!(twice.html, once.html);
        assert!(twice.addresses.is_empty());
    }

    #[test]
    fn test_round_trip_restores_original() {
        let html = "<p>intro</p>\n<img class=\"wide\" src=\"https://ipfs.io/ipfs/QmFirst\">\n<p>between</p><img src='https://ipfs.io/ipfs/QmSecond' />";
        let extracted = extract_and_replace(html, &PREFIXES);
        assert_eq!(add_display_url(&extracted.html, DEFAULT_GATEWAY), html);
    }

    #[test]
    fn test_round_trip_keeps_paths_and_queries() {
        let html = r#"<img src="https://ipfs.io/ipfs/QmDir/cat.png"><img src="https://ipfs.io/ipfs/Qm1?filename=a.png">"#;
        let extracted = extract_and_replace(html, &PREFIXES);

        assert_eq!(
            extracted.html,
            r#"<img src="QmDir/cat.png"><img src="Qm1?filename=a.png">"#
        );
        assert_eq!(
            extracted.addresses,
            vec![ContentAddress::unchecked("QmDir"), ContentAddress::unchecked("Qm1")]
        );
        assert_eq!(add_display_url(&extracted.html, DEFAULT_GATEWAY), html);
        assert!(extract_and_replace(&extracted.html, &PREFIXES).addresses.is_empty());
    }

    #[test]
    fn test_non_address_remainder_untouched() {
        let html = r#"<img src="https://ipfs.io/ipfs/images/cat.png"><img src="https://ipfs.io/ipfs/?x=1">"#;
        let extracted = extract_and_replace(html, &PREFIXES);

        assert_eq!(extracted.html, html);
        assert!(extracted.addresses.is_empty());
        assert_eq!(add_display_url(html, DEFAULT_GATEWAY), html);
    }

    #[test]
    fn test_split_address() {
        assert_eq!(split_address("QmDir/cat.png"), Some(("QmDir", "/cat.png")));
        assert_eq!(
            split_address("bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi#top"),
            Some(("bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi", "#top"))
        );
        assert_eq!(split_address("images/cat.png"), None);
        assert_eq!(split_address("data:image/png;base64,AAAA"), None);
        assert_eq!(split_address(""), None);
    }

    #[test]
    fn test_add_display_url_skips_urls_and_paths() {
        let html = r#"<img src="/static/logo.png"><img src="data:image/png;base64,AAAA"><img src="Qm9">"#;
        assert_eq!(
            add_display_url(html, "https://gateway.example/ipfs"),
            r#"<img src="/static/logo.png"><img src="data:image/png;base64,AAAA"><img src="https://gateway.example/ipfs/Qm9">"#
        );
    }
}
