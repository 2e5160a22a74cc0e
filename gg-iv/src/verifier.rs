//! Verifier orchestrator
//!
//! Batch-iterates the recipe catalog, scores each recipe's current image
//! against its name, ingredients, and category, classifies severity, and
//! proposes replacement assets from the image index.
//!
//! # Concurrency
//! Recipes are processed in fixed-size batches: every recipe in a batch is
//! scored concurrently, batches run strictly sequentially, and results are
//! zipped back into input order so report output is reproducible.
//!
//! # Error Handling
//! A failed scoring task degrades that one recipe's result and never
//! aborts the batch. Failing to load the recipe set or the image index is
//! fatal: there is nothing meaningful to verify without them.

use crate::index::ImageIndex;
use crate::ontology::Ontology;
use crate::report::ReportGenerator;
use crate::scorer::MatchScorer;
use crate::types::{ActionTier, AuditReport, Confidence, Issue, VerificationResult};
use chrono::Utc;
use gg_common::db::{meals, Recipe};
use gg_common::Result;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{info, warn};

/// Scores below this tier a result as RECOMMENDED
const RECOMMENDED_BELOW: i32 = 50;
/// Scores below this (and at or above `RECOMMENDED_BELOW`) as OPTIONAL
const OPTIONAL_BELOW: i32 = 70;

/// Tunable verification bounds
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Recipes scored concurrently per batch
    pub batch_size: usize,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self { batch_size: 50 }
    }
}

/// Verifier orchestrator over the recipe store and image index
pub struct Verifier {
    db: SqlitePool,
    ontology: Arc<Ontology>,
    scorer: MatchScorer,
    index: Arc<ImageIndex>,
    reports: ReportGenerator,
    config: VerifierConfig,
}

impl Verifier {
    pub fn new(
        db: SqlitePool,
        ontology: Arc<Ontology>,
        index: Arc<ImageIndex>,
        reports: ReportGenerator,
        config: VerifierConfig,
    ) -> Self {
        let scorer = MatchScorer::new(ontology.clone());
        Self {
            db,
            ontology,
            scorer,
            index,
            reports,
            config,
        }
    }

    /// Verify every recipe and persist the audit report
    pub async fn verify_all_recipes(&self) -> Result<AuditReport> {
        let recipes = meals::fetch_all_recipes(&self.db).await?;
        info!(recipes = recipes.len(), "Starting recipe image verification");

        let mut results: Vec<VerificationResult> = Vec::with_capacity(recipes.len());
        let mut critical = 0usize;
        let mut recommended = 0usize;
        let mut optional = 0usize;
        let mut ok = 0usize;

        let total_batches = recipes.len().div_ceil(self.config.batch_size.max(1));
        for (batch_no, batch) in recipes.chunks(self.config.batch_size.max(1)).enumerate() {
            // Fan out one scoring task per recipe in the batch
            let mut handles = Vec::with_capacity(batch.len());
            for recipe in batch {
                let recipe = recipe.clone();
                let ontology = self.ontology.clone();
                let scorer = self.scorer.clone();
                let index = self.index.clone();
                handles.push(tokio::spawn(async move {
                    verify_recipe(&ontology, &scorer, &index, &recipe)
                }));
            }

            // Zip completions back into input order
            for (handle, recipe) in handles.into_iter().zip(batch) {
                let result = match handle.await {
                    Ok(result) => result,
                    Err(e) => {
                        warn!(recipe = %recipe.name, error = %e, "Scoring task failed");
                        degraded_result(recipe, e.to_string())
                    }
                };

                match result.action_required {
                    ActionTier::Critical => critical += 1,
                    ActionTier::Recommended => recommended += 1,
                    ActionTier::Optional => optional += 1,
                    ActionTier::Ok => ok += 1,
                }
                results.push(result);
            }

            info!(
                batch = batch_no + 1,
                total_batches,
                processed = results.len(),
                "Processed verification batch"
            );
        }

        let report = AuditReport {
            timestamp: Utc::now(),
            total_recipes: results.len(),
            critical_issues: critical,
            recommended_fixes: recommended,
            optional_issues: optional,
            ok_recipes: ok,
            results,
        };

        self.reports.persist(&report)?;
        Ok(report)
    }
}

/// Verify one recipe against its currently assigned image
fn verify_recipe(
    ontology: &Ontology,
    scorer: &MatchScorer,
    index: &ImageIndex,
    recipe: &Recipe,
) -> VerificationResult {
    // Recipe tokens come from the name and ingredients joined as free text
    let mut recipe_text = recipe.name.clone();
    for ingredient in &recipe.ingredients {
        recipe_text.push(' ');
        recipe_text.push_str(ingredient);
    }
    let recipe_tokens = ontology.tokenize(&recipe_text);

    let current_image = recipe
        .image_url
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string();
    let image_tokens = ontology.filename_tokens(&recipe.image_url);

    let matched = scorer.calculate(&recipe_tokens, &image_tokens, &recipe.category);

    let action_required = if matched.has_forbidden_issue() {
        ActionTier::Critical
    } else if matched.score < RECOMMENDED_BELOW {
        ActionTier::Recommended
    } else if matched.score < OPTIONAL_BELOW {
        ActionTier::Optional
    } else {
        ActionTier::Ok
    };

    let (suggested_image, suggested_reason) = if action_required != ActionTier::Ok {
        match index.find_best_match(
            scorer,
            ontology,
            &recipe_tokens,
            &recipe.name,
            &recipe.category,
        ) {
            Some(suggestion) => (Some(suggestion.filename), Some(suggestion.reason)),
            None => (None, None),
        }
    } else {
        (None, None)
    };

    VerificationResult {
        recipe_id: recipe.id.clone(),
        recipe_name: recipe.name.clone(),
        current_image,
        issues: matched.issues,
        match_score: matched.score,
        confidence: matched.confidence,
        suggested_image,
        suggested_reason,
        action_required,
    }
}

/// Result recorded when a recipe's scoring task failed outright
///
/// Carries no suggestion, so the fix applier can never act on it.
fn degraded_result(recipe: &Recipe, detail: String) -> VerificationResult {
    VerificationResult {
        recipe_id: recipe.id.clone(),
        recipe_name: recipe.name.clone(),
        current_image: recipe
            .image_url
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string(),
        issues: vec![Issue::ScoringFailed { detail }],
        match_score: 0,
        confidence: Confidence::Low,
        suggested_image: None,
        suggested_reason: None,
        action_required: ActionTier::Recommended,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::ImageIndexEntry;

    fn recipe(id: &str, name: &str, ingredients: &[&str], category: &str, image: &str) -> Recipe {
        Recipe {
            id: id.to_string(),
            name: name.to_string(),
            ingredients: ingredients.iter().map(|s| s.to_string()).collect(),
            category: category.to_string(),
            image_url: format!("/attached_assets/generated_images/{}", image),
            glycemic_index: "low".to_string(),
            glycemic_value: None,
        }
    }

    fn entry(filename: &str, tokens: &[&str]) -> ImageIndexEntry {
        ImageIndexEntry {
            filename: filename.to_string(),
            full_path: format!("/assets/{}", filename),
            tokens: tokens.iter().map(|s| s.to_string()).collect(),
            categories: vec![],
        }
    }

    fn fixtures(entries: Vec<ImageIndexEntry>) -> (Arc<Ontology>, MatchScorer, ImageIndex) {
        let ontology = Arc::new(Ontology::default());
        let scorer = MatchScorer::new(ontology.clone());
        (ontology, scorer, ImageIndex::from_entries(entries))
    }

    #[test]
    fn test_mismatched_beverage_is_critical_with_beverage_suggestion() {
        let (ontology, scorer, index) = fixtures(vec![
            entry("BBQ_ribs_sauce.png", &["bbq", "rib", "sauce"]),
            entry(
                "Vanilla_Banana_Smoothie.png",
                &["vanilla", "banana", "smoothie"],
            ),
        ]);
        let r = recipe(
            "r1",
            "Classic Vanilla Smoothie",
            &["banana", "vanilla extract", "almond milk"],
            "beverage",
            "BBQ_ribs_sauce.png",
        );

        let result = verify_recipe(&ontology, &scorer, &index, &r);
        assert_eq!(result.action_required, ActionTier::Critical);
        assert!(result.match_score < 0);
        assert!(result.has_forbidden_issue());
        assert_eq!(
            result.suggested_image.as_deref(),
            Some("Vanilla_Banana_Smoothie.png")
        );
    }

    #[test]
    fn test_well_matched_recipe_is_ok_without_suggestion() {
        let (ontology, scorer, index) = fixtures(vec![entry(
            "Spare_Soup.png",
            &["spare", "soup"],
        )]);
        let r = recipe(
            "r2",
            "Trinidad Callaloo Soup",
            &["callaloo", "okra", "coconut"],
            "lunch",
            "Trinidad_Callaloo_Soup_Coconut_c703225f.png",
        );

        let result = verify_recipe(&ontology, &scorer, &index, &r);
        assert_eq!(result.action_required, ActionTier::Ok);
        assert!(result.suggested_image.is_none());
        assert!(result.issues.is_empty());
    }

    #[test]
    fn test_classification_thresholds() {
        let (ontology, scorer, index) = fixtures(vec![]);

        // Zero overlap, no category vocab: score 0 -> RECOMMENDED
        let r = recipe("r3", "Mystery Meal", &["saffron"], "general", "Zebra_Print.png");
        let result = verify_recipe(&ontology, &scorer, &index, &r);
        assert_eq!(result.action_required, ActionTier::Recommended);

        // Full overlap, no category vocab: score 100 -> OK
        let r = recipe("r4", "Saffron Tagine", &[], "general", "Saffron_Tagine.png");
        let result = verify_recipe(&ontology, &scorer, &index, &r);
        assert_eq!(result.action_required, ActionTier::Ok);
    }

    #[test]
    fn test_degraded_result_is_inert_for_the_applier() {
        let r = recipe("r5", "Broken Row", &[], "lunch", "whatever.png");
        let result = degraded_result(&r, "task panicked".to_string());

        assert_eq!(result.action_required, ActionTier::Recommended);
        assert!(result.suggested_image.is_none());
        assert!(!result.has_forbidden_issue());
        assert_eq!(result.issues.len(), 1);
    }

    #[tokio::test]
    async fn test_verify_all_preserves_input_order_and_counts() {
        use gg_common::db::init::create_meals_table;
        use sqlx::sqlite::SqlitePoolOptions;
        use tempfile::TempDir;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap();
        create_meals_table(&pool).await.unwrap();

        for (id, name, image) in [
            ("a1", "Saffron Tagine", "Saffron_Tagine.png"),
            ("b2", "Mystery Meal", "Zebra_Print.png"),
            ("c3", "Plain Congee", "Unrelated_Stuff.png"),
        ] {
            sqlx::query(
                "INSERT INTO meals (id, name, ingredients, category, image_url) VALUES (?, ?, '[]', 'general', ?)",
            )
            .bind(id)
            .bind(name)
            .bind(format!("/assets/{}", image))
            .execute(&pool)
            .await
            .unwrap();
        }

        let dir = TempDir::new().unwrap();
        let verifier = Verifier::new(
            pool,
            Arc::new(Ontology::default()),
            Arc::new(ImageIndex::from_entries(vec![])),
            ReportGenerator::new(dir.path().to_path_buf()),
            VerifierConfig { batch_size: 2 },
        );

        let report = verifier.verify_all_recipes().await.unwrap();
        assert_eq!(report.total_recipes, 3);
        // Input (id) order preserved across batch boundaries
        let ids: Vec<_> = report.results.iter().map(|r| r.recipe_id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "b2", "c3"]);
        assert_eq!(
            report.critical_issues
                + report.recommended_fixes
                + report.optional_issues
                + report.ok_recipes,
            report.total_recipes
        );

        // Determinism: a second pass produces identical classifications
        let second = verifier.verify_all_recipes().await.unwrap();
        let tiers: Vec<_> = report.results.iter().map(|r| r.action_required).collect();
        let second_tiers: Vec<_> = second.results.iter().map(|r| r.action_required).collect();
        assert_eq!(tiers, second_tiers);
    }
}
