//! Image lock registry
//!
//! Manually-set exemptions that protect specific recipes from automated
//! image changes. The registry is read once per apply run and treated as
//! an immutable snapshot; the applier must refuse to run without it.

use gg_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Persisted map of recipe id to lock reason
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LockRegistry {
    #[serde(default)]
    pub locked_recipes: BTreeMap<String, String>,
}

impl LockRegistry {
    /// Load the registry; a missing file is an error
    ///
    /// Fail-closed: the applier calls this before building any candidate
    /// and aborts the whole run when the file cannot be loaded, rather
    /// than proceeding unprotected.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Lock file missing at {}; refusing to run without lock protection",
                path.display()
            )));
        }

        let data = std::fs::read_to_string(path)?;
        let registry: LockRegistry = serde_json::from_str(&data)?;
        info!(locks = registry.locked_recipes.len(), "Loaded image locks");
        Ok(registry)
    }

    /// The single authoritative lock guard
    ///
    /// Consulted both when the candidate set is built and again
    /// immediately before each mutating call.
    pub fn lock_reason(&self, recipe_id: &str) -> Option<&str> {
        self.locked_recipes.get(recipe_id).map(String::as_str)
    }

    pub fn is_locked(&self, recipe_id: &str) -> bool {
        self.lock_reason(recipe_id).is_some()
    }

    /// Persist the registry as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Lock a recipe's image against automated changes
///
/// Starts a fresh registry when none exists yet; only the applier is
/// required to fail closed on a missing file.
pub fn lock_recipe(path: &Path, recipe_id: &str, reason: &str) -> Result<()> {
    let mut registry = if path.exists() {
        LockRegistry::load(path)?
    } else {
        LockRegistry::default()
    };

    registry
        .locked_recipes
        .insert(recipe_id.to_string(), reason.to_string());
    registry.save(path)?;

    info!(recipe_id = %recipe_id, reason = %reason, "Locked recipe image");
    Ok(())
}
