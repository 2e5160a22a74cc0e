//! Image index: the pre-built catalog of available assets
//!
//! Loaded once per run and treated as an immutable snapshot. Assets added
//! or removed after the index was built are not seen until the next
//! `build-index` run.

use crate::ontology::Ontology;
use crate::scorer::MatchScorer;
use gg_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Scores below this are never proposed as replacements
const MIN_ACCEPTABLE_SCORE: i32 = -20;
/// Category fallback floor; matches at or below are discarded
const MIN_FALLBACK_SCORE: i32 = 10;
/// Fallback weight per category pattern hit
const PATTERN_WEIGHT: i32 = 15;
/// Fallback weight for a protein match
const PROTEIN_WEIGHT: i32 = 25;
/// Fallback weight per overlapping ingredient token
const INGREDIENT_WEIGHT: i32 = 10;

/// One indexed asset
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageIndexEntry {
    pub filename: String,
    pub full_path: String,
    #[serde(default)]
    pub tokens: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
}

/// Proposed replacement asset for a poorly matched recipe
#[derive(Debug, Clone)]
pub struct Suggestion {
    pub filename: String,
    pub score: i32,
    pub reason: String,
}

/// Immutable snapshot of the asset catalog
pub struct ImageIndex {
    entries: Vec<ImageIndexEntry>,
}

impl ImageIndex {
    /// Load the index from disk; absence is fatal
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to load image index {}: {}. Run `gg-iv build-index` first",
                path.display(),
                e
            ))
        })?;
        let entries: Vec<ImageIndexEntry> = serde_json::from_str(&data)?;
        tracing::info!(images = entries.len(), "Loaded image index");
        Ok(Self::from_entries(entries))
    }

    /// Build an index from in-memory entries (test fixtures, index builder)
    ///
    /// Entries are kept sorted by filename so score ties always resolve to
    /// the lexicographically smallest filename, keeping suggestions
    /// reproducible across runs.
    pub fn from_entries(mut entries: Vec<ImageIndexEntry>) -> Self {
        entries.sort_by(|a, b| a.filename.cmp(&b.filename));
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the best replacement asset for a recipe
    ///
    /// Every candidate must be form-factor compatible with the recipe name;
    /// a beverage recipe never gets a solid-food suggestion, and vice
    /// versa. When no candidate scores decently, a category-based fallback
    /// is tried. `None` is a valid outcome and not an error.
    pub fn find_best_match(
        &self,
        scorer: &MatchScorer,
        ontology: &Ontology,
        recipe_tokens: &BTreeSet<String>,
        recipe_name: &str,
        category: &str,
    ) -> Option<Suggestion> {
        let recipe_is_beverage = ontology.is_beverage_text(recipe_name);

        let mut best: Option<Suggestion> = None;
        let mut best_score = MIN_ACCEPTABLE_SCORE;

        for entry in &self.entries {
            if ontology.is_beverage_filename(&entry.filename) != recipe_is_beverage {
                continue;
            }

            let entry_tokens: BTreeSet<String> = entry.tokens.iter().cloned().collect();
            let result = scorer.calculate(recipe_tokens, &entry_tokens, category);

            if result.score > best_score {
                best_score = result.score;
                let issues = if result.issues.is_empty() {
                    "None".to_string()
                } else {
                    result
                        .issues
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join("; ")
                };
                best = Some(Suggestion {
                    filename: entry.filename.clone(),
                    score: result.score,
                    reason: format!("Score: {}, Issues: {}", result.score, issues),
                });
            }
        }

        // Nothing decent: try a category-based fallback
        if best.as_ref().map_or(true, |b| b.score < 0) {
            let expanded = ontology.expand(recipe_tokens);
            if let Some(fallback) =
                self.category_fallback(ontology, &expanded, recipe_is_beverage, category)
            {
                if best.as_ref().map_or(true, |b| fallback.score > b.score) {
                    best = Some(fallback);
                }
            }
        }

        best
    }

    /// Fallback matching on category patterns, protein type, and raw
    /// ingredient overlap
    fn category_fallback(
        &self,
        ontology: &Ontology,
        recipe_tokens: &BTreeSet<String>,
        recipe_is_beverage: bool,
        category: &str,
    ) -> Option<Suggestion> {
        let patterns = ontology
            .category(category)
            .map(|vocab| vocab.fallback_patterns.as_slice())
            .unwrap_or_default();

        let recipe_protein = ontology
            .proteins()
            .iter()
            .find(|protein| recipe_tokens.iter().any(|t| t.contains(protein.as_str())));

        let mut best: Option<Suggestion> = None;
        let mut best_score = MIN_FALLBACK_SCORE;

        for entry in &self.entries {
            if ontology.is_beverage_filename(&entry.filename) != recipe_is_beverage {
                continue;
            }

            let pattern_hits = patterns
                .iter()
                .filter(|pattern| entry.tokens.iter().any(|t| t.contains(pattern.as_str())))
                .count();
            let mut score = pattern_hits as i32 * PATTERN_WEIGHT;

            if let Some(protein) = recipe_protein {
                if entry.tokens.iter().any(|t| t.contains(protein.as_str())) {
                    score += PROTEIN_WEIGHT;
                }
            }

            let common_ingredients = recipe_tokens
                .iter()
                .filter(|t| entry.tokens.contains(*t))
                .count();
            score += common_ingredients as i32 * INGREDIENT_WEIGHT;

            if score > best_score {
                best_score = score;
                best = Some(Suggestion {
                    filename: entry.filename.clone(),
                    score,
                    reason: format!(
                        "Category fallback: {} ({} pattern matches, {} ingredient matches)",
                        category, pattern_hits, common_ingredients
                    ),
                });
            }
        }

        best
    }
}
