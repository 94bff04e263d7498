use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref TOKEN: Regex = Regex::new(r"([A-Za-z]*\p{Sc}|(\w|\b['.,]\b)+)").unwrap();
    // Single digits and long digit strings; four-digit strings are
    // typically years, which are often linked, so they stay as-is.
    static ref NUMERIC: Regex = Regex::new(r"^\d([\d.,]{4,})?$").unwrap();
}

fn normalize(token: &str) -> String {
    if NUMERIC.is_match(token) {
        "<NUM>".to_owned()
    } else {
        token.to_owned()
    }
}

/// Simple tokenizer for English and similar languages.
///
/// Does some token normalization: numeric tokens are replaced by the
/// sentinel `<NUM>`.
pub fn tokenize(s: &str) -> Vec<String> {
    TOKEN.find_iter(s).map(|m| normalize(m.as_str())).collect()
}

/// Equivalent to `tokenize`, but also returns byte offsets into the input.
///
/// Positions are half-open `(start, end)` ranges. Because tokens are
/// normalized, `&s[start..end]` need not match the returned token.
pub fn tokenize_pos(s: &str) -> (Vec<String>, Vec<(usize, usize)>) {
    let mut tokens = Vec::new();
    let mut pos = Vec::new();
    for m in TOKEN.find_iter(s) {
        tokens.push(normalize(m.as_str()));
        pos.push((m.start(), m.end()));
    }
    (tokens, pos)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_tokenize_normalizes_numbers() {
        let got = tokenize("In 2012, Fortune ranked IBM the No. 2 largest U.S. firm");
        let want = [
            "In", "2012", "Fortune", "ranked", "IBM", "the", "No", "<NUM>", "largest", "U.S",
            "firm",
        ];
        assert_eq!(got, want);
    }

    #[test]
    fn test_tokenize_long_numbers() {
        assert_eq!(tokenize("7"), ["<NUM>"]);
        assert_eq!(tokenize("2012"), ["2012"]);
        assert_eq!(tokenize("10,000.5"), ["<NUM>"]);
    }

    #[test]
    fn test_tokenize_currency() {
        assert_eq!(tokenize("US$40 or €5"), ["US$", "40", "or", "€", "<NUM>"]);
    }

    #[test]
    fn test_tokenize_empty() {
        assert!(tokenize("").is_empty());
        assert!(tokenize(" \t\n").is_empty());
    }

    #[test]
    fn test_tokenize_pos_offsets() {
        let input = "No. 2 firm";
        let (tokens, pos) = tokenize_pos(input);
        assert_eq!(tokens, ["No", "<NUM>", "firm"]);
        assert_eq!(pos, [(0, 2), (4, 5), (6, 10)]);
        // Offsets index the raw input even for normalized tokens.
        assert_eq!(&input[pos[1].0..pos[1].1], "2");
    }

    #[test]
    fn test_tokenize_pos_matches_tokenize() {
        let input = "Kahaani is a 2012 Indian mystery";
        let (tokens, pos) = tokenize_pos(input);
        assert_eq!(tokens, tokenize(input));
        assert_eq!(tokens.len(), pos.len());
    }
}
