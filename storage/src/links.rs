use rusqlite::{params, Connection};

use crate::db::StoreError;

/// A link statistic ready for the store: the anchor text has been projected
/// onto its top-level n-gram hashes, each carrying a fractional weight.
#[derive(Clone, Debug, PartialEq)]
pub struct ProcessedLink {
    pub target: String,
    pub anchor_hashes: Vec<u32>,
    pub weight: f64,
}

/// Drain `links` into the store inside a single transaction.
///
/// Returns the number of links written. The transaction commits only once
/// the iterator is exhausted, so with a channel receiver as input the commit
/// happens when the sending side closes the queue.
pub fn store_links<I>(conn: &mut Connection, links: I) -> Result<usize, StoreError>
where
    I: IntoIterator<Item = ProcessedLink>,
{
    let tx = conn.transaction()?;
    let mut written = 0;
    {
        let mut ins_title = tx.prepare("insert or ignore into titles values (NULL, ?1)")?;
        let mut ins_link = tx.prepare(
            "insert or ignore into linkstats values
             (?1, (select id from titles where title = ?2), 0)",
        )?;
        let mut update = tx.prepare(
            "update linkstats set count = count + ?1
             where ngramhash = ?2
             and targetid = (select id from titles where title = ?3)",
        )?;

        for link in links {
            for &h in &link.anchor_hashes {
                ins_title.execute(params![link.target])?;
                ins_link.execute(params![h, link.target])?;
                update.execute(params![link.weight, h, link.target])?;
            }
            written += 1;
        }
    }
    tx.commit()?;
    Ok(written)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::db::{make_db, Settings};
    use std::path::Path;

    fn test_db() -> Connection {
        let settings = Settings {
            dump_name: "testwiki".to_owned(),
            max_ngram: 2,
        };
        make_db(Path::new(":memory:"), false, &settings).unwrap()
    }

    fn link(target: &str, hashes: &[u32], weight: f64) -> ProcessedLink {
        ProcessedLink {
            target: target.to_owned(),
            anchor_hashes: hashes.to_vec(),
            weight,
        }
    }

    #[test]
    fn test_store_links_accumulates_counts() {
        let mut conn = test_db();
        let links = vec![
            link("Foo", &[42], 1.0),
            link("Foo", &[42], 2.0),
            link("Bar", &[42], 1.0),
            link("Foo", &[7, 13], 0.5),
        ];
        let n = store_links(&mut conn, links).unwrap();
        assert_eq!(n, 4);

        let count: f64 = conn
            .query_row(
                "select count from linkstats
                 where ngramhash = 42
                 and targetid = (select id from titles where title = 'Foo')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!((count - 3.0).abs() < 1e-12);

        let titles: i64 = conn
            .query_row("select count(*) from titles", [], |row| row.get(0))
            .unwrap();
        assert_eq!(titles, 2);

        let rows: i64 = conn
            .query_row("select count(*) from linkstats", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 4);
    }

    #[test]
    fn test_store_links_empty_commit() {
        let mut conn = test_db();
        assert_eq!(store_links(&mut conn, vec![]).unwrap(), 0);
    }
}
