//! Match scoring between recipe token sets and image filename token sets
//!
//! Produces a signed score, the full issue list, and a confidence band for
//! a (recipe, image) pair. All category logic comes from the ontology; the
//! scorer itself holds only the arithmetic.

use crate::ontology::Ontology;
use crate::types::{Confidence, Issue};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Heavy penalty for a disqualifying term in the image filename
const FORBIDDEN_PENALTY: i32 = 50;
/// Bonus when the filename carries a keyword of the recipe's category
const CATEGORY_BONUS: i32 = 20;
/// Penalty when it carries none
const CATEGORY_PENALTY: i32 = 10;
/// Overlap ratio below which an issue is recorded
const LOW_OVERLAP_THRESHOLD: f64 = 0.2;

/// Outcome of scoring one (recipe, image) pair
#[derive(Debug, Clone)]
pub struct MatchResult {
    /// Signed match score; lower is worse
    pub score: i32,
    /// All reasons the pair looks wrong, not just the worst one
    pub issues: Vec<Issue>,
    /// How trustworthy the pairing is
    pub confidence: Confidence,
}

impl MatchResult {
    /// Whether any issue disqualifies the image outright
    pub fn has_forbidden_issue(&self) -> bool {
        self.issues.iter().any(Issue::is_forbidden)
    }
}

/// Match scorer over ontology token sets
#[derive(Clone)]
pub struct MatchScorer {
    ontology: Arc<Ontology>,
}

impl MatchScorer {
    /// Create a scorer backed by the given ontology
    pub fn new(ontology: Arc<Ontology>) -> Self {
        Self { ontology }
    }

    /// Score an image's filename tokens against a recipe's tokens
    ///
    /// **Algorithm:**
    /// 1. Expand both sides with ingredient synonyms
    /// 2. Forbidden terms for the category present in the image tokens but
    ///    absent from the recipe tokens: heavy penalty, disqualifying issue
    /// 3. Category keyword present in the image tokens: bonus; absent:
    ///    penalty and a mismatch issue
    /// 4. Token overlap ratio contributes up to 100 points
    ///
    /// An unknown category skips steps 2 and 3, so the score rests purely
    /// on overlap. Empty token sets score as zero overlap.
    pub fn calculate(
        &self,
        recipe_tokens: &BTreeSet<String>,
        image_tokens: &BTreeSet<String>,
        category: &str,
    ) -> MatchResult {
        let mut issues = Vec::new();
        let mut score: i32 = 0;

        let recipe_expanded = self.ontology.expand(recipe_tokens);
        let image_expanded = self.ontology.expand(image_tokens);

        let mut has_forbidden = false;
        if let Some(vocab) = self.ontology.category(category) {
            let forbidden_found: Vec<String> = vocab
                .forbidden
                .iter()
                .filter(|term| {
                    image_expanded.contains(*term) && !recipe_expanded.contains(*term)
                })
                .cloned()
                .collect();

            if !forbidden_found.is_empty() {
                has_forbidden = true;
                score -= FORBIDDEN_PENALTY;
                issues.push(Issue::ForbiddenIngredients {
                    terms: forbidden_found,
                });
            }

            let category_match = vocab
                .keywords
                .iter()
                .any(|keyword| image_expanded.contains(keyword));
            if category_match {
                score += CATEGORY_BONUS;
            } else {
                score -= CATEGORY_PENALTY;
                issues.push(Issue::CategoryMismatch {
                    category: category.to_string(),
                });
            }
        }

        let common = recipe_expanded.intersection(&image_expanded).count();
        let overlap_ratio = common as f64 / recipe_expanded.len().max(1) as f64;
        let overlap_percent = (overlap_ratio * 100.0).round();
        score += overlap_percent as i32;

        if overlap_ratio < LOW_OVERLAP_THRESHOLD {
            issues.push(Issue::LowOverlap {
                percent: overlap_percent as u32,
            });
        }

        // A forbidden issue caps confidence below HIGH regardless of score
        let confidence = if score >= 80 && issues.is_empty() {
            Confidence::High
        } else if score >= 50 && !has_forbidden {
            Confidence::Medium
        } else {
            Confidence::Low
        };

        MatchResult {
            score,
            issues,
            confidence,
        }
    }
}
