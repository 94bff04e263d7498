//! Count-min sketch for approximate n-gram frequencies.
//!
//! Estimates are one-sided: `get` never underestimates the true count, and
//! all arithmetic saturates at `u32::max_value()`.

use std::f64::consts::E;

use thiserror::Error;

use crate::ngrams::hash_ngram;

/// Upper bound on the number of rows in a sketch.
pub const MAX_ROWS: usize = 256;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum SketchError {
    #[error("number of rows must be in 1..={}, got {0}", MAX_ROWS)]
    BadRows(usize),
    #[error("number of columns must be at least one")]
    BadCols,
    #[error("rows have unequal lengths: {0} != {1}")]
    RaggedRows(usize, usize),
    #[error("sketch shapes do not match: {0}x{1} != {2}x{3}")]
    ShapeMismatch(usize, usize, usize, usize),
}

const SEED_BASIS: u32 = 0x811c_9dc5;

/// 32-bit avalanche finalizer (MurmurHash3).
fn mix(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Sketch {
    rows: Vec<Vec<u32>>,
}

impl Sketch {
    /// Construct a sketch of the given shape, all counters zero.
    pub fn new(nrows: usize, ncols: usize) -> Result<Sketch, SketchError> {
        if nrows == 0 || nrows > MAX_ROWS {
            return Err(SketchError::BadRows(nrows));
        }
        if ncols == 0 {
            return Err(SketchError::BadCols);
        }
        Ok(Sketch {
            rows: vec![vec![0; ncols]; nrows],
        })
    }

    /// Construct a sketch that estimates within a factor `epsilon` of the
    /// true count with probability `1 - delta`.
    pub fn new_from_prob(epsilon: f64, delta: f64) -> Result<Sketch, SketchError> {
        let ncols = (E / epsilon).ceil() as usize;
        let nrows = (1.0 / delta).ln().ceil() as usize;
        Sketch::new(nrows, ncols)
    }

    /// Reconstruct a sketch from a counter matrix, e.g. one read back from a
    /// model store.
    pub fn new_from_rows(rows: Vec<Vec<u32>>) -> Result<Sketch, SketchError> {
        if rows.is_empty() || rows.len() > MAX_ROWS {
            return Err(SketchError::BadRows(rows.len()));
        }
        let ncols = rows[0].len();
        if ncols == 0 {
            return Err(SketchError::BadCols);
        }
        for row in &rows[1..] {
            if row.len() != ncols {
                return Err(SketchError::RaggedRows(ncols, row.len()));
            }
        }
        Ok(Sketch { rows })
    }

    pub fn nrows(&self) -> usize {
        self.rows.len()
    }

    pub fn ncols(&self) -> usize {
        self.rows[0].len()
    }

    // Rows must hash near-independently for the min estimate to
    // concentrate, so each row mixes its own seed into the key.
    fn column(&self, h: u32, r: usize) -> usize {
        let seed = mix((r as u32).wrapping_mul(0x9e37_79b9) ^ SEED_BASIS);
        mix(h ^ seed) as usize % self.ncols()
    }

    /// Add `delta` to the count for hash `h`, saturating.
    pub fn add(&mut self, h: u32, delta: u32) {
        for r in 0..self.rows.len() {
            let c = self.column(h, r);
            let cell = &mut self.rows[r][c];
            *cell = cell.saturating_add(delta);
        }
    }

    /// Count a single occurrence of hash `h`.
    pub fn add1(&mut self, h: u32) {
        self.add(h, 1)
    }

    /// Count a single occurrence of the n-gram `tokens`.
    pub fn add_ngram<S: AsRef<str>>(&mut self, tokens: &[S]) {
        self.add1(hash_ngram(tokens))
    }

    /// Estimated count for hash `h`: the minimum over all rows.
    pub fn get(&self, h: u32) -> u32 {
        (0..self.rows.len())
            .map(|r| self.rows[r][self.column(h, r)])
            .min()
            .unwrap_or(0)
    }

    /// Estimated count for the n-gram `tokens`.
    pub fn get_ngram<S: AsRef<str>>(&self, tokens: &[S]) -> u32 {
        self.get(hash_ngram(tokens))
    }

    /// Add `other`'s counters into `self`, cell by cell, saturating.
    ///
    /// Summing sketches gives the sketch of the summed inputs, so per-worker
    /// sketches can be merged in any order.
    pub fn merge(&mut self, other: &Sketch) -> Result<(), SketchError> {
        if self.nrows() != other.nrows() || self.ncols() != other.ncols() {
            return Err(SketchError::ShapeMismatch(
                self.nrows(),
                self.ncols(),
                other.nrows(),
                other.ncols(),
            ));
        }
        for (mine, theirs) in self.rows.iter_mut().zip(&other.rows) {
            for (cell, &v) in mine.iter_mut().zip(theirs) {
                *cell = cell.saturating_add(v);
            }
        }
        Ok(())
    }

    /// The raw counter matrix, row-major.
    pub fn counts(&self) -> &[Vec<u32>] {
        &self.rows
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashMap;

    #[test]
    fn test_new_rejects_bad_shapes() {
        assert_eq!(Sketch::new(0, 1).unwrap_err(), SketchError::BadRows(0));
        assert_eq!(Sketch::new(1, 0).unwrap_err(), SketchError::BadCols);
        assert_eq!(
            Sketch::new(MAX_ROWS + 1, 10).unwrap_err(),
            SketchError::BadRows(MAX_ROWS + 1)
        );
    }

    #[test]
    fn test_new_from_rows_validates() {
        assert!(Sketch::new_from_rows(vec![]).is_err());
        assert!(Sketch::new_from_rows(vec![vec![], vec![]]).is_err());
        assert!(Sketch::new_from_rows(vec![vec![0; 4], vec![0; 3]]).is_err());
        let cm = Sketch::new_from_rows(vec![vec![0; 4], vec![0; 4], vec![0; 4]]).unwrap();
        assert_eq!((cm.nrows(), cm.ncols()), (3, 4));
    }

    #[test]
    fn test_new_from_prob_shape() {
        let cm = Sketch::new_from_prob(0.001, 0.00001).unwrap();
        assert_eq!(cm.nrows(), 12);
        assert_eq!(cm.ncols(), 2719);
    }

    #[test]
    fn test_estimates_within_margin() {
        let mut sketch = Sketch::new(210, 1300).unwrap();
        let mut sketch1 = Sketch::new(210, 1300).unwrap();
        let mut freq: HashMap<u32, u32> = HashMap::new();

        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..10_000 {
            let h = rng.gen::<u32>();
            sketch.add(h, 1);
            sketch1.add1(h);
            *freq.entry(h).or_insert(0) += 1;
        }

        for (&h, &want) in &freq {
            let got = sketch.get(h);
            // One-sided error: never an underestimate.
            assert!(got >= want, "estimate {} below true count {}", got, want);
            assert!(got - want <= 4, "difference too big: got {}, want {}", got, want);
            assert_eq!(got, sketch1.get(h), "Add and Add1 disagree");
        }
    }

    #[test]
    fn test_counts_total() {
        let nrows = 14;
        let mut cm = Sketch::new(nrows, 51).unwrap();
        cm.add1(2_613_621);
        let total: u64 = cm.counts().iter().flatten().map(|&c| u64::from(c)).sum();
        assert_eq!(total, nrows as u64);
    }

    #[test]
    fn test_clone_is_deep() {
        let mut cm = Sketch::new(5, 8).unwrap();
        for &x in &[216, 121, 7, 1, 834, 8015, 15, 1266, 162, 16] {
            cm.add1(x);
        }
        let clone = cm.clone();
        assert_eq!(clone, cm);
        cm.add1(99);
        assert_ne!(clone, cm);
    }

    #[test]
    fn test_merge_matches_triple_add() {
        let mut a = Sketch::new(25, 126).unwrap();
        let mut b = Sketch::new(25, 126).unwrap();
        let mut sum = Sketch::new(25, 126).unwrap();

        let mut rng = StdRng::seed_from_u64(42);
        let keys: Vec<u32> = (0..2000).map(|_| rng.gen()).collect();
        for &key in &keys {
            a.add1(key);
            b.add(key, 2);
            sum.add(key, 3);
        }
        a.merge(&b).unwrap();
        for &key in &keys {
            assert_eq!(a.get(key), sum.get(key));
        }

        let b = Sketch::new(25, 127).unwrap();
        assert!(a.merge(&b).is_err());
        let b = Sketch::new(26, 126).unwrap();
        assert!(a.merge(&b).is_err());
    }

    #[test]
    fn test_merge_commutes_and_associates() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut make = |n: usize| {
            let mut s = Sketch::new(4, 64).unwrap();
            for _ in 0..n {
                s.add1(rng.gen());
            }
            s
        };
        let (a, b, c) = (make(100), make(200), make(300));

        let mut ab = a.clone();
        ab.merge(&b).unwrap();
        let mut ba = b.clone();
        ba.merge(&a).unwrap();
        assert_eq!(ab, ba);

        let mut ab_c = ab.clone();
        ab_c.merge(&c).unwrap();
        let mut bc = b.clone();
        bc.merge(&c).unwrap();
        let mut a_bc = a.clone();
        a_bc.merge(&bc).unwrap();
        assert_eq!(ab_c, a_bc);
    }

    #[test]
    fn test_saturation_is_sticky() {
        let mut cm = Sketch::new(2, 8).unwrap();
        cm.add(13, u32::max_value());
        cm.add(13, u32::max_value());
        cm.add1(13);
        assert_eq!(cm.get(13), u32::max_value());

        let other = cm.clone();
        cm.merge(&other).unwrap();
        assert_eq!(cm.get(13), u32::max_value());
    }

    #[test]
    fn test_ngram_counts() {
        let mut cm = Sketch::new(16, 1024).unwrap();
        let tokens: Vec<&str> = "foo bar baz quux bla barney fred".split(' ').collect();
        let mut grams = Vec::new();
        for i in 0..tokens.len() {
            for n in 1..=5.min(tokens.len() - i) {
                grams.push(&tokens[i..i + n]);
            }
        }
        for gram in &grams {
            cm.add_ngram(gram);
        }
        let counts: Vec<u32> = grams.iter().map(|g| cm.get_ngram(g)).collect();
        for &c in &counts {
            assert_eq!(c, 1);
        }
        // Estimates are deterministic across repeated queries.
        for (gram, &c) in grams.iter().zip(&counts) {
            assert_eq!(cm.get_ngram(gram), c);
        }
    }
}
