//! gg-iv - Recipe Image Verification engine
//!
//! Verifies that every recipe's assigned photo matches its textual content
//! (name, ingredients, category), scores each match, proposes better assets
//! from a pre-built image index, and applies safe, high-confidence
//! corrections behind a lock registry with a rollback journal.
//!
//! Library interface exposed for integration testing.

pub mod applier;
pub mod index;
pub mod index_builder;
pub mod locks;
pub mod ontology;
pub mod report;
pub mod scorer;
pub mod types;
pub mod verifier;
