use std::fs;
use std::path::Path;

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use thiserror::Error;

use nlp::countmin::SketchError;

pub const DEFAULT_MAX_NGRAM: usize = 7;

/// Parameters a model was built with.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Settings {
    /// Filename of the dump the model was derived from.
    pub dump_name: String,
    /// Maximum length of n-grams.
    pub max_ngram: usize,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("model is missing parameter {0:?}")]
    MissingParameter(&'static str),
    #[error("invalid value {value:?} for parameter {key}")]
    BadParameter { key: &'static str, value: String },
    #[error("model contains no n-gram sketch")]
    MissingSketch,
    #[error("stored sketch is malformed: {0}")]
    BadSketch(#[from] SketchError),
}

const SCHEMA: &str = "
    drop table if exists linkstats;
    drop table if exists ngramfreq;

    create table parameters (
        key   text primary key not NULL,
        value text default NULL
    );

    create table ngramfreq (
        row   integer not NULL,
        col   integer not NULL,
        count integer not NULL
    );

    create table titles (
        id    integer primary key,
        title text    unique not NULL
    );

    create table linkstats (
        ngramhash integer not NULL,
        targetid  integer not NULL,
        count     float   not NULL
    );

    create index target on linkstats(targetid);
    create unique index hash_target on linkstats(ngramhash, targetid);
";

/// Create a model database at `path`, deleting any existing file first when
/// `overwrite` is set.
pub fn make_db(path: &Path, overwrite: bool, settings: &Settings) -> Result<Connection, StoreError> {
    if settings.max_ngram < 1 {
        return Err(StoreError::BadParameter {
            key: "maxngram",
            value: settings.max_ngram.to_string(),
        });
    }
    if overwrite {
        let _ = fs::remove_file(path);
    }
    let conn = Connection::open(path)?;
    // Journaling and synchronous writes are off for the duration of the
    // bulk load; a crashed run leaves a model that load_model rejects.
    // The journal_mode pragma reports the new mode back as a row.
    let _: String = conn.query_row("pragma journal_mode = off", [], |row| row.get(0))?;
    conn.execute_batch("pragma synchronous = off")?;
    conn.execute_batch(SCHEMA)?;
    conn.execute(
        "insert into parameters values ('dumpname', ?1)",
        params![settings.dump_name],
    )?;
    conn.execute(
        "insert into parameters values ('maxngram', ?1)",
        params![settings.max_ngram.to_string()],
    )?;
    Ok(conn)
}

/// Open an existing model and read back the parameters it was built with.
pub fn load_model(path: &Path) -> Result<(Connection, Settings), StoreError> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_WRITE)?;
    let settings = read_settings(&conn)?;
    Ok((conn, settings))
}

fn read_parameter(conn: &Connection, key: &'static str) -> Result<String, StoreError> {
    let value: Option<Option<String>> = conn
        .query_row(
            "select value from parameters where key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    value.and_then(|v| v).ok_or(StoreError::MissingParameter(key))
}

fn read_settings(conn: &Connection) -> Result<Settings, StoreError> {
    let raw = read_parameter(conn, "maxngram")?;
    let max_ngram = match raw.parse::<usize>() {
        Ok(n) if n >= 1 => n,
        _ => {
            return Err(StoreError::BadParameter {
                key: "maxngram",
                value: raw,
            })
        }
    };
    let dump_name = read_parameter(conn, "dumpname")?;
    Ok(Settings {
        dump_name,
        max_ngram,
    })
}

/// Finalize a fully built model: drop the index that only the redirect pass
/// needs, then compact the file.
pub fn finalize(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch("drop index target; vacuum;")?;
    Ok(())
}
