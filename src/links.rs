//! Extraction of `[[...]]` wikilinks from cleaned article text.

use fnv::FnvHashMap;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref LINK: Regex = Regex::new(r"(\w*)\[\[([^\]]+)\]\](\w*)").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// A link occurrence: the anchor text as it appears inline, and the
/// normalized title of the target article.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Link {
    pub anchor: String,
    pub target: String,
}

fn norm_space(s: &str) -> String {
    WHITESPACE.replace_all(s.trim(), " ").into_owned()
}

fn uppercase_first(s: String) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if first.is_lowercase() => {
            let mut out = String::with_capacity(s.len());
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
            out
        }
        _ => s,
    }
}

/// Extract all main-namespace wikilinks from `s` with their frequencies.
///
/// Anchors absorb the alphanumeric prefix and suffix around the brackets,
/// as MediaWiki renders them. Targets are normalized to the form used in
/// `<redirect>` elements: underscores become spaces, whitespace runs
/// collapse, and the first letter is uppercased. File, category and other
/// namespace links (any target containing a colon) are skipped, as are pure
/// section links.
pub fn extract_links(s: &str) -> FnvHashMap<Link, u32> {
    let mut links = FnvHashMap::default();
    for caps in LINK.captures_iter(s) {
        let (before, inner, after) = (&caps[1], &caps[2], &caps[3]);

        let (target, displayed) = match inner.find('|') {
            Some(pipe) => (&inner[..pipe], &inner[pipe + 1..]),
            None => (inner, inner),
        };

        // A colon means a file, category or interwiki link. This misses
        // namespace prefixes spelled with entities, which is acceptable.
        if target.contains(':') {
            continue;
        }

        let anchor = norm_space(displayed);

        // Remove section links.
        let target = match target.find('#') {
            Some(hash) => &target[..hash],
            None => target,
        };
        if target.is_empty() {
            continue;
        }

        let target = norm_space(&target.replace('_', " "));
        if target.is_empty() {
            continue;
        }
        let target = uppercase_first(target);

        let anchor = format!("{}{}{}", before, anchor, after);
        *links.entry(Link { anchor, target }).or_insert(0) += 1;
    }
    links
}
