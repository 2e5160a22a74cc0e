//! Database models

use serde::{Deserialize, Serialize};

/// A recipe row from the meals table
///
/// Read-only to the verification tooling except for `image_url`, which the
/// fix applier may rewrite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub id: String,
    pub name: String,
    pub ingredients: Vec<String>,
    pub category: String,
    pub image_url: String,
    pub glycemic_index: String,
    pub glycemic_value: Option<f64>,
}
