//! Entity linking against a model built by the dump processor.

pub mod bestpath;
pub mod entity;
pub mod semanticizer;

pub use crate::bestpath::best_path;
pub use crate::entity::Entity;
pub use crate::semanticizer::{LinkError, Semanticizer};
