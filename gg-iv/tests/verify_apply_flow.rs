//! End-to-end verification and apply flow tests
//!
//! Runs the verifier and fix applier against a real SQLite file, an
//! on-disk image index, and a lock registry in a temp directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sqlx::SqlitePool;
use tempfile::TempDir;

use gg_common::db::init_database;
use gg_iv::applier::{ApplierConfig, FixApplier};
use gg_iv::index::{ImageIndex, ImageIndexEntry};
use gg_iv::ontology::Ontology;
use gg_iv::report::ReportGenerator;
use gg_iv::types::ActionTier;
use gg_iv::verifier::{Verifier, VerifierConfig};

struct TestEnv {
    dir: TempDir,
    pool: SqlitePool,
}

impl TestEnv {
    fn data_dir(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    fn locks_path(&self) -> PathBuf {
        self.dir.path().join("image-locks.json")
    }

    fn verifier(&self) -> Verifier {
        let index = ImageIndex::load(&self.dir.path().join("image-index.json")).unwrap();
        Verifier::new(
            self.pool.clone(),
            Arc::new(Ontology::default()),
            Arc::new(index),
            ReportGenerator::new(self.data_dir()),
            VerifierConfig::default(),
        )
    }

    fn applier(&self, dry_run: bool) -> FixApplier {
        FixApplier::new(
            self.pool.clone(),
            Arc::new(Ontology::default()),
            self.locks_path(),
            self.data_dir(),
            ApplierConfig::default(),
            dry_run,
        )
    }

    async fn image_url(&self, id: &str) -> String {
        sqlx::query_scalar("SELECT image_url FROM meals WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }
}

fn index_entry(filename: &str, tokens: &[&str]) -> ImageIndexEntry {
    ImageIndexEntry {
        filename: filename.to_string(),
        full_path: format!("/attached_assets/generated_images/{}", filename),
        tokens: tokens.iter().map(|s| s.to_string()).collect(),
        categories: vec![],
    }
}

fn write_index(dir: &Path, entries: &[ImageIndexEntry]) {
    std::fs::write(
        dir.join("image-index.json"),
        serde_json::to_string_pretty(entries).unwrap(),
    )
    .unwrap();
}

async fn seed_recipe(
    pool: &SqlitePool,
    id: &str,
    name: &str,
    ingredients: &[&str],
    category: &str,
    image: &str,
) {
    let ingredients = serde_json::to_string(ingredients).unwrap();
    sqlx::query(
        r#"
        INSERT INTO meals (id, name, ingredients, category, image_url, glycemic_index)
        VALUES (?, ?, ?, ?, ?, 'low')
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(ingredients)
    .bind(category)
    .bind(format!("/attached_assets/generated_images/{}", image))
    .execute(pool)
    .await
    .unwrap();
}

/// Catalog with one critical beverage mismatch, one clean recipe, and one
/// locked critical mismatch that must never be touched
async fn setup() -> TestEnv {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("glycoguide.db")).await.unwrap();

    seed_recipe(
        &pool,
        "r1",
        "Classic Vanilla Smoothie",
        &["banana", "vanilla extract", "almond milk"],
        "beverage",
        "BBQ_ribs_sauce.png",
    )
    .await;
    seed_recipe(
        &pool,
        "r2",
        "Trinidad Callaloo Soup",
        &["callaloo", "okra", "coconut"],
        "lunch",
        "Trinidad_Callaloo_Soup_Coconut_c703225f.png",
    )
    .await;
    seed_recipe(
        &pool,
        "r3",
        "Chocolate Cake",
        &["chocolate", "flour"],
        "dessert",
        "Pork_Belly_Platter.png",
    )
    .await;

    write_index(
        dir.path(),
        &[
            index_entry("BBQ_ribs_sauce.png", &["bbq", "rib", "sauce"]),
            index_entry("Chocolate_Cake.png", &["chocolate", "cake"]),
            index_entry(
                "Trinidad_Callaloo_Soup_Coconut_c703225f.png",
                &["trinidad", "callaloo", "soup", "coconut"],
            ),
            index_entry(
                "Vanilla_Banana_Smoothie.png",
                &["vanilla", "banana", "smoothie"],
            ),
        ],
    );

    std::fs::write(
        dir.path().join("image-locks.json"),
        r#"{ "locked_recipes": { "r3": "manually fixed, do not touch" } }"#,
    )
    .unwrap();

    TestEnv { dir, pool }
}

#[tokio::test]
async fn dry_run_classifies_and_reports_without_mutating() {
    let env = setup().await;
    let verifier = env.verifier();

    let report = verifier.verify_all_recipes().await.unwrap();

    assert_eq!(report.total_recipes, 3);
    assert_eq!(report.critical_issues, 2);
    assert_eq!(report.ok_recipes, 1);

    // Severity tier and the forbidden marker always agree
    for result in &report.results {
        assert_eq!(
            result.action_required == ActionTier::Critical,
            result.has_forbidden_issue(),
            "tier/issue mismatch for {}",
            result.recipe_name
        );
    }

    // The beverage recipe only ever gets a beverage suggestion
    let smoothie = &report.results[0];
    assert_eq!(smoothie.recipe_id, "r1");
    assert_eq!(
        smoothie.suggested_image.as_deref(),
        Some("Vanilla_Banana_Smoothie.png")
    );

    // The clean recipe gets no suggestion
    let callaloo = report
        .results
        .iter()
        .find(|r| r.recipe_id == "r2")
        .unwrap();
    assert_eq!(callaloo.action_required, ActionTier::Ok);
    assert!(callaloo.suggested_image.is_none());

    // Nothing was written to the store
    assert!(env.image_url("r1").await.ends_with("BBQ_ribs_sauce.png"));
    assert!(env.image_url("r3").await.ends_with("Pork_Belly_Platter.png"));

    // Both artifacts landed on disk
    let artifacts: Vec<_> = std::fs::read_dir(env.dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    assert!(artifacts.iter().any(|n| n.starts_with("image-audit-") && n.ends_with(".json")));
    assert!(artifacts.iter().any(|n| n.starts_with("image-audit-summary-")));
}

#[tokio::test]
async fn two_dry_runs_are_deterministic() {
    let env = setup().await;
    let verifier = env.verifier();

    let first = verifier.verify_all_recipes().await.unwrap();
    let second = verifier.verify_all_recipes().await.unwrap();

    // Identical ordering, scores, tiers, and suggestions
    assert_eq!(
        serde_json::to_value(&first.results).unwrap(),
        serde_json::to_value(&second.results).unwrap()
    );
}

#[tokio::test]
async fn live_apply_fixes_unlocked_criticals_and_honors_locks() {
    let env = setup().await;
    let verifier = env.verifier();
    let applier = env.applier(false);

    let outcome = applier.apply_surgical_fixes(&verifier).await.unwrap();

    assert_eq!(outcome.applied, 1);
    assert_eq!(outcome.failed, 0);

    // The unlocked critical was corrected
    assert_eq!(
        env.image_url("r1").await,
        "/attached_assets/generated_images/Vanilla_Banana_Smoothie.png"
    );
    // The locked critical was not, despite having a perfect replacement
    assert!(env.image_url("r3").await.ends_with("Pork_Belly_Platter.png"));
    // The clean recipe was not touched either
    assert!(env
        .image_url("r2")
        .await
        .ends_with("Trinidad_Callaloo_Soup_Coconut_c703225f.png"));

    // Rollback journal completeness: one entry per applied change, each
    // applied id exactly once
    let journal: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(&outcome.journal_path).unwrap(),
    )
    .unwrap();
    assert_eq!(journal["totalApplied"], 1);
    assert_eq!(journal["totalFailed"], 0);
    let changes = journal["changes"].as_array().unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0]["id"], "r1");
    assert!(changes[0]["oldImage"]
        .as_str()
        .unwrap()
        .contains("BBQ_ribs_sauce.png"));
}

#[tokio::test]
async fn dry_run_applier_is_rejected_and_mutates_nothing() {
    let env = setup().await;
    let verifier = env.verifier();
    let applier = env.applier(true);

    let err = applier.apply_surgical_fixes(&verifier).await.unwrap_err();
    assert!(matches!(err, gg_common::Error::InvalidInput(_)));

    assert!(env.image_url("r1").await.ends_with("BBQ_ribs_sauce.png"));
}

#[tokio::test]
async fn missing_lock_file_fails_closed() {
    let env = setup().await;
    std::fs::remove_file(env.locks_path()).unwrap();

    let verifier = env.verifier();
    let applier = env.applier(false);

    let err = applier.apply_surgical_fixes(&verifier).await.unwrap_err();
    assert!(matches!(err, gg_common::Error::Config(_)));

    // Fail-closed: nothing was verified or mutated on the applier's path
    assert!(env.image_url("r1").await.ends_with("BBQ_ribs_sauce.png"));
}
