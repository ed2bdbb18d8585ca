//! Configuration for cardsort
//!
//! Provides types, discovery and parsing for `cardsort.toml`.

pub mod loader;
pub mod schema;

pub use loader::*;
pub use schema::*;
