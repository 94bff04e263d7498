//! Best-path selection over overlapping candidate mentions.
//!
//! A Viterbi lattice with one state per candidate plus a "no mention" sink
//! walks the byte positions of the input. Whenever a candidate starts at a
//! position, staying in the sink is prohibitively penalized, so the decoder
//! must commit to some mention there; overlapping mentions compete through
//! the per-position observation weights.

use crate::entity::Entity;

/// Select the most probable consistent subset of `cands`.
///
/// Each mention on the decoded path is returned exactly once; the order of
/// the result is unspecified.
pub fn best_path(cands: Vec<Entity>) -> Vec<Entity> {
    if cands.is_empty() {
        return cands;
    }
    let n = cands.len();
    let sink = n;
    // Stand-in for log(0): finite, but never on a surviving path unless
    // there is no alternative.
    let log_eps = f64::MIN_POSITIVE.ln();
    let end_all = cands.iter().map(|c| c.offset + c.length).max().unwrap();

    // Number of candidates starting at each position.
    let mut n_start = vec![0usize; end_all + 1];
    for c in &cands {
        n_start[c.offset] += 1;
    }

    let covers = |k: usize, p: usize| {
        let c = &cands[k];
        c.offset <= p && p < c.offset + c.length
    };

    // Observation log-probabilities: weight 1 for every candidate covering
    // a position plus 1 for the sink, normalized per position. The sink
    // weight lets the path rest between mentions even where some rejected
    // candidate covers the position.
    let mut obs = vec![vec![log_eps; n + 1]; end_all];
    for (p, row) in obs.iter_mut().enumerate() {
        let covering: Vec<usize> = (0..n).filter(|&k| covers(k, p)).collect();
        let share = (1.0 / (covering.len() as f64 + 1.0)).ln();
        for &k in &covering {
            row[k] = share;
        }
        row[sink] = share;
    }

    let neg_log = |count: usize| {
        if count > 0 {
            -(count as f64).ln()
        } else {
            0.0
        }
    };

    // Score of arriving in state j at position p from state i at the
    // previous position.
    let trans = |i: usize, j: usize, p: usize| -> f64 {
        let ns = n_start[p];
        if i == sink && j == sink {
            if ns == 0 {
                0.0
            } else {
                log_eps
            }
        } else if i == sink {
            if ns > 0 {
                neg_log(ns)
            } else {
                std::f64::NEG_INFINITY
            }
        } else {
            let end_i = cands[i].offset + cands[i].length;
            if j == sink {
                if p == end_i {
                    neg_log(ns)
                } else {
                    log_eps
                }
            } else if i == j && p < end_i {
                0.0
            } else if p == end_i {
                neg_log(ns)
            } else {
                log_eps
            }
        }
    };

    // Standard Viterbi over a lattice of width n+1 and depth end_all+1.
    let mut delta = vec![log_eps; n + 1];
    delta[sink] = 0.0;
    let mut psi = vec![vec![0usize; n + 1]; end_all];
    for p in 0..end_all {
        let mut next = vec![std::f64::NEG_INFINITY; n + 1];
        for j in 0..=n {
            let mut best = std::f64::NEG_INFINITY;
            let mut arg = sink;
            for i in 0..=n {
                let score = delta[i] + trans(i, j, p);
                if score > best {
                    best = score;
                    arg = i;
                }
            }
            next[j] = best + obs[p][j];
            psi[p][j] = arg;
        }
        delta = next;
    }

    // Backtrace, collecting the distinct non-sink states on the path.
    let mut state = sink;
    let mut best = std::f64::NEG_INFINITY;
    for (j, &score) in delta.iter().enumerate() {
        if score > best {
            best = score;
            state = j;
        }
    }
    let mut keep = vec![false; n];
    for p in (0..end_all).rev() {
        if state != sink {
            keep[state] = true;
        }
        state = psi[p][state];
    }

    cands
        .into_iter()
        .zip(keep)
        .filter_map(|(c, keep)| if keep { Some(c) } else { None })
        .collect()
}
