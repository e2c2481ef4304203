//! Vecsearch - semantic vector search over a product catalog
//!
//! Maintains a searchable embedding index over catalog items and answers
//! nearest-neighbor queries by cosine similarity. Embeddings come from a
//! pluggable provider (local embedding service or an OpenAI-style API) and
//! are persisted in SQLite, either as native binary vectors with in-engine
//! distance pushdown or as a JSON-encoded fallback for older engines.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod content;
pub mod error;
pub mod indexer;
pub mod provider;
pub mod search;
pub mod service;
pub mod storage;

pub use error::{Result, VecSearchError};
