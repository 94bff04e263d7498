pub mod countmin;
pub mod ngrams;
pub mod tokenize;

pub use crate::countmin::Sketch;
pub use crate::ngrams::{hash_ngram, ngram_hashes, ngram_hashes_pos, NGramPos};
pub use crate::tokenize::{tokenize, tokenize_pos};
