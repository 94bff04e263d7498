use std::path::Path;

use log::info;
use rusqlite::{params, Connection};
use thiserror::Error;

use nlp::{hash_ngram, ngram_hashes_pos, tokenize_pos, Sketch};
use storage::{load_sketch, Settings, StoreError};

use crate::bestpath::best_path;
use crate::entity::Entity;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("{0}")]
    Store(#[from] StoreError),
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// An entity linker backed by a model database and its n-gram sketch.
pub struct Semanticizer {
    conn: Connection,
    ngram_count: Sketch,
    max_ngram: usize,
}

impl Semanticizer {
    /// Load a semanticizer from a model produced by the dump processor.
    ///
    /// Also returns the settings the model was built with.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<(Semanticizer, Settings), LinkError> {
        let (conn, settings) = storage::load_model(path.as_ref())?;
        let ngram_count = load_sketch(&conn)?;
        info!(
            "loaded model for {} with maxngram {}",
            settings.dump_name, settings.max_ngram
        );
        let max_ngram = settings.max_ngram;
        Ok((
            Semanticizer {
                conn,
                ngram_count,
                max_ngram,
            },
            settings,
        ))
    }

    /// Candidates for hash value `h`. `offset` and `end` index into the
    /// original string and are recorded on the returned mentions.
    fn candidates(&self, h: u32, offset: usize, end: usize) -> Result<Vec<Entity>, LinkError> {
        let mut stmt = self.conn.prepare_cached(
            "select (select title from titles where id = targetid), count
             from linkstats where ngramhash = ?1",
        )?;

        let mut cands = Vec::new();
        let mut total = 0f64;
        let rows = stmt.query_map(params![h], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?;
        for row in rows {
            let (target, count) = row?;
            total += count;
            // The commonness field holds the raw per-target link count
            // until the total over all candidates is known.
            cands.push(Entity {
                target,
                ngram_count: 0.0,
                link_count: 0.0,
                commonness: count,
                sense_prob: 0.0,
                offset,
                length: end - offset,
            });
        }

        let estimate = f64::from(self.ngram_count.get(h));
        for c in &mut cands {
            c.ngram_count = estimate;
            c.sense_prob = c.commonness / estimate;
            c.commonness /= total;
            c.link_count = total;
        }
        Ok(cands)
    }

    /// All candidate entity mentions in the string `s`, in n-gram
    /// generation order.
    pub fn all(&self, s: &str) -> Result<Vec<Entity>, LinkError> {
        let (tokens, pos) = tokenize_pos(s);
        let mut cands = Vec::new();
        for np in ngram_hashes_pos(&tokens, self.max_ngram) {
            let offset = pos[np.start].0;
            let end = pos[np.end - 1].1;
            cands.extend(self.candidates(np.hash, offset, end)?);
        }
        Ok(cands)
    }

    /// Candidate entity mentions whose anchor text is exactly `s`.
    pub fn exact_match(&self, s: &str) -> Result<Vec<Entity>, LinkError> {
        let (tokens, pos) = tokenize_pos(s);
        if tokens.is_empty() {
            return Ok(Vec::new());
        }
        let h = hash_ngram(&tokens);
        let offset = pos[0].0;
        let end = pos[pos.len() - 1].1;
        self.candidates(h, offset, end)
    }

    /// The most probable consistent set of mentions in `s`.
    pub fn best_path(&self, s: &str) -> Result<Vec<Entity>, LinkError> {
        Ok(best_path(self.all(s)?))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn make_semanticizer() -> Semanticizer {
        let settings = Settings {
            dump_name: "testwiki".to_owned(),
            max_ngram: 2,
        };
        let conn = storage::make_db(Path::new(":memory:"), false, &settings).unwrap();
        conn.execute(
            "insert into linkstats values (?1, 0, 1)",
            params![hash_ngram(&["Hello", "world"])],
        )
        .unwrap();
        conn.execute("insert into titles values (0, 'dmr')", [])
            .unwrap();
        Semanticizer {
            conn,
            ngram_count: Sketch::new(10, 4).unwrap(),
            max_ngram: 2,
        }
    }

    #[test]
    fn test_all_candidates() {
        let sem = make_semanticizer();
        let all = sem.all("Hello world").unwrap();
        assert_eq!(all.len(), 1, "expected one entity mention, got {:?}", all);
        assert_eq!(all[0].target, "dmr");
        assert_eq!(all[0].offset, 0);
        assert_eq!(all[0].length, 11);
        assert!(all[0].link_count > 0.0);
    }

    #[test]
    fn test_exact_match() {
        let sem = make_semanticizer();
        let all = sem.exact_match("Hello world").unwrap();
        assert_eq!(all.len(), 1, "expected one entity mention, got {:?}", all);
        assert_eq!(all[0].offset, 0);
        assert_eq!(all[0].length, 11);

        let all = sem.exact_match("Hello world program").unwrap();
        assert!(all.is_empty(), "expected no entity mentions, got {:?}", all);
    }

    #[test]
    fn test_empty_input() {
        let sem = make_semanticizer();
        assert!(sem.all("").unwrap().is_empty());
        assert!(sem.exact_match("").unwrap().is_empty());
        assert!(sem.best_path("   ").unwrap().is_empty());
    }

    #[test]
    fn test_commonness_sums_to_one() {
        let sem = make_semanticizer();
        sem.conn
            .execute("insert into titles values (1, 'ken')", [])
            .unwrap();
        sem.conn
            .execute(
                "insert into linkstats values (?1, 1, 3)",
                params![hash_ngram(&["Hello", "world"])],
            )
            .unwrap();

        let all = sem.exact_match("Hello world").unwrap();
        assert_eq!(all.len(), 2);
        let total: f64 = all.iter().map(|c| c.commonness).sum();
        assert!((total - 1.0).abs() < 1e-12);
        for c in &all {
            assert_eq!(c.link_count, 4.0);
        }
    }
}
