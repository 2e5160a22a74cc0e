//! # GlycoGuide Common Library
//!
//! Shared code for GlycoGuide batch tooling including:
//! - Database pool initialization and meal queries
//! - Error types
//! - Configuration loading and data directory resolution

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
