//! Rolling FNV-32 hashes over token n-grams.
//!
//! The canonical hash of an n-gram is FNV-32 over its tokens joined by a
//! NUL byte, which is assumed not to occur inside tokens.

const FNV_OFFSET: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

/// Incremental 32-bit FNV-1 state.
#[derive(Clone, Copy)]
struct Fnv32(u32);

impl Fnv32 {
    fn new() -> Self {
        Fnv32(FNV_OFFSET)
    }

    fn write(&mut self, bytes: &[u8]) {
        let mut h = self.0;
        for &b in bytes {
            h = h.wrapping_mul(FNV_PRIME) ^ u32::from(b);
        }
        self.0 = h;
    }

    fn finish(self) -> u32 {
        self.0
    }
}

/// Hash a single n-gram.
pub fn hash_ngram<S: AsRef<str>>(tokens: &[S]) -> u32 {
    let mut h = Fnv32::new();
    for (i, token) in tokens.iter().enumerate() {
        if i > 0 {
            h.write(&[0]);
        }
        h.write(token.as_ref().as_bytes());
    }
    h.finish()
}

/// Hashes of all n-grams in `tokens` with `min_n ≤ n ≤ max_n`.
///
/// Extending a window by one token appends a separator and the new token to
/// the running hash rather than rehashing from scratch. Output is ordered by
/// starting index, then by n-gram length.
pub fn ngram_hashes<S: AsRef<str>>(tokens: &[S], min_n: usize, max_n: usize) -> Vec<u32> {
    let per_start = max_n.saturating_sub(min_n).saturating_add(1);
    let mut out = Vec::with_capacity(tokens.len().saturating_mul(per_start));
    for i in 0..tokens.len() {
        let top = max_n.min(tokens.len() - i);
        if top == 0 || min_n > top {
            continue;
        }
        let mut h = Fnv32::new();
        h.write(tokens[i].as_ref().as_bytes());
        if min_n <= 1 {
            out.push(h.finish());
        }
        for n in 2..=top {
            h.write(&[0]);
            h.write(tokens[i + n - 1].as_ref().as_bytes());
            if n >= min_n {
                out.push(h.finish());
            }
        }
    }
    out
}

/// An n-gram hash with the token range it covers; `end` is exclusive.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NGramPos {
    pub hash: u32,
    pub start: usize,
    pub end: usize,
}

/// Like `ngram_hashes` with `min_n = 1`, but with token positions attached.
pub fn ngram_hashes_pos<S: AsRef<str>>(tokens: &[S], max_n: usize) -> Vec<NGramPos> {
    let mut out = Vec::with_capacity(tokens.len().saturating_mul(max_n));
    for i in 0..tokens.len() {
        let top = max_n.min(tokens.len() - i);
        if top == 0 {
            continue;
        }
        let mut h = Fnv32::new();
        h.write(tokens[i].as_ref().as_bytes());
        out.push(NGramPos {
            hash: h.finish(),
            start: i,
            end: i + 1,
        });
        for n in 2..=top {
            h.write(&[0]);
            h.write(tokens[i + n - 1].as_ref().as_bytes());
            out.push(NGramPos {
                hash: h.finish(),
                start: i,
                end: i + n,
            });
        }
    }
    out
}
