//! Persistent storage for entity-linking models.
//!
//! A model is a single SQLite database holding run parameters, article
//! titles, per-(n-gram, target) link statistics and the serialized n-gram
//! count-min sketch.

pub mod db;
pub mod links;
pub mod redirects;
pub mod sketch;

pub use crate::db::{finalize, load_model, make_db, Settings, StoreError, DEFAULT_MAX_NGRAM};
pub use rusqlite::Connection;
pub use crate::links::{store_links, ProcessedLink};
pub use crate::redirects::store_redirects;
pub use crate::sketch::{load_sketch, store_sketch};
