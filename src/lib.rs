//! Lead Identity Resolution Engine
//!
//! This library decides whether an incoming lead record (from scraping or
//! enrichment) refers to a person already stored, and if so, how to
//! reconcile the two records without data loss or duplication.
//!
//! # Modules
//!
//! - `core`: Core business logic namespace.
//! - `data`: Data access layer namespace.
//! - `obs`: Observability and logging.
//! - `aliases`: Field-alias boundary for raw incoming dicts.
//! - `config`: Configuration and confidence constants.
//! - `engine`: Ingestion coordinator (`add_lead`, `find_duplicates`).
//! - `errors`: Error handling types.
//! - `lock`: Keyed identity lock.
//! - `matching`: Match strategy evaluator and candidate aggregator.
//! - `merge`: Merge policy engine.
//! - `models`: Core data models.
//! - `normalize`: Identity normalizers (URL, email, phone, name).
//! - `similarity`: Name similarity scoring.
//! - `store`: Store contract and the bundled memory/Postgres adapters.

pub mod core;
pub mod data;
pub mod obs;

// Re-export primary modules for shared use in tests and other binaries
pub mod aliases;
pub mod config;
pub mod engine;
pub mod errors;
pub mod lock;
pub mod matching;
pub mod merge;
pub mod models;
pub mod normalize;
pub mod similarity;
pub mod store;
