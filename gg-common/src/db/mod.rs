//! Database access layer
//!
//! Pool initialization, schema creation, and meal queries.

pub mod init;
pub mod meals;
pub mod models;

pub use init::init_database;
pub use models::Recipe;
