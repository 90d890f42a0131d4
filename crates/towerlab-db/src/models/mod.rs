//! Database models for persistent storage.

mod document;

pub use document::*;
