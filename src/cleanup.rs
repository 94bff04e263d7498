//! Wiki-markup cleanup: strips templates, tables and quasi-XML from article
//! text before tokenization and link counting.

use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref SPECIAL: Regex =
        Regex::new(r#"\{\{|\{\||\|\}|\}\}|<[a-z][a-z0-9 "=]*/?>|</[a-z]+>"#).unwrap();
}

/// Get rid of tables, template calls and quasi-XML, throwing their content
/// away, then unescape HTML entities and normalize to NFC.
///
/// Assumes tables, templates and tags are properly nested, except for
/// spurious end-of-{table,template,element} markers, which are ignored.
/// Pathological nesting loses text but never fails.
pub fn cleanup(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut depth = 0usize;
    let mut rest = s;

    while let Some(m) = SPECIAL.find(rest) {
        if depth == 0 {
            out.push_str(&rest[..m.start()]);
        }
        let tag = m.as_str();
        if tag == "{{" || tag == "{|" {
            depth += 1;
        } else if tag == "}}" || tag == "|}" || tag.starts_with("</") {
            depth = depth.saturating_sub(1);
        } else {
            // Opening tag.
            depth += 1;
        }
        rest = &rest[m.end()..];
    }
    if depth == 0 {
        out.push_str(rest);
    }

    html_escape::decode_html_entities(&out).nfc().collect()
}
