//! gg-iv - Recipe Image Verification CLI
//!
//! Verifies that every recipe's assigned photo matches its name,
//! ingredients, and category; proposes replacements from the image index;
//! and, with `verify --apply`, corrects safe high-confidence mismatches
//! behind the lock registry.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gg_common::config;
use gg_iv::applier::{ApplierConfig, FixApplier};
use gg_iv::index::ImageIndex;
use gg_iv::index_builder::IndexBuilder;
use gg_iv::locks;
use gg_iv::ontology::Ontology;
use gg_iv::report::ReportGenerator;
use gg_iv::verifier::{Verifier, VerifierConfig};

/// Command-line arguments for gg-iv
#[derive(Parser, Debug)]
#[command(name = "gg-iv")]
#[command(about = "Recipe image verification and safe auto-correction for GlycoGuide")]
#[command(version)]
struct Args {
    /// Data directory holding the image index, locks, and audit artifacts
    #[arg(long, env = "GG_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// SQLite database path (defaults to <data-dir>/glycoguide.db)
    #[arg(long, env = "GG_DATABASE")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Verify recipe images against the index (dry run unless --apply)
    Verify {
        /// Apply safe fixes after a clean verification pass
        #[arg(long)]
        apply: bool,
    },
    /// Build the image index from the generated-images directory
    BuildIndex {
        /// Directory of generated image assets
        #[arg(long, env = "GG_IMAGE_DIR")]
        image_dir: Option<PathBuf>,
    },
    /// Lock a recipe's image against automated changes
    Lock {
        /// Recipe id to lock
        recipe_id: String,
        /// Why the image must not be touched
        reason: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gg_iv=info,gg_common=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let toml_config = config::load_config_file().unwrap_or_default();

    let data_dir = config::resolve_data_dir(args.data_dir.as_ref(), "GG_DATA_DIR");

    let db_path = args
        .database
        .clone()
        .or_else(|| toml_config.database_path.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| data_dir.join("glycoguide.db"));

    match args.command {
        Command::Verify { apply } => run_verify(&data_dir, &db_path, apply).await,
        Command::BuildIndex { image_dir } => {
            let image_dir = image_dir
                .or_else(|| toml_config.image_dir.as_ref().map(PathBuf::from))
                .context("no image directory configured; pass --image-dir or set GG_IMAGE_DIR")?;
            run_build_index(&data_dir, &image_dir)
        }
        Command::Lock { recipe_id, reason } => {
            locks::lock_recipe(&data_dir.join("image-locks.json"), &recipe_id, &reason)
                .context("failed to lock recipe image")?;
            Ok(())
        }
    }
}

async fn run_verify(data_dir: &PathBuf, db_path: &PathBuf, apply: bool) -> Result<()> {
    let mode = if apply { "LIVE" } else { "DRY RUN" };
    info!(mode, "Starting recipe image verification");

    let pool = gg_common::db::init_database(db_path)
        .await
        .context("failed to open recipe database")?;

    let ontology = Arc::new(Ontology::default());
    let index = Arc::new(
        ImageIndex::load(&data_dir.join("image-index.json"))
            .context("failed to load image index")?,
    );

    let verifier = Verifier::new(
        pool.clone(),
        ontology.clone(),
        index,
        ReportGenerator::new(data_dir.clone()),
        VerifierConfig::default(),
    );

    let report = verifier.verify_all_recipes().await?;
    println!("{}", ReportGenerator::render_summary(&report));

    if report.critical_issues > 0 {
        warn!(
            critical = report.critical_issues,
            "Critical image mismatches found"
        );
    }

    if apply {
        if report.critical_issues > 0 {
            bail!(
                "refusing to apply fixes while {} critical issues remain; \
                 resolve them and re-run with --apply",
                report.critical_issues
            );
        }

        let applier = FixApplier::new(
            pool,
            ontology,
            data_dir.join("image-locks.json"),
            data_dir.clone(),
            ApplierConfig::default(),
            false,
        );

        let outcome = applier.apply_surgical_fixes(&verifier).await?;
        println!(
            "Applied {} fixes ({} failed, {} locked recipes skipped); rollback journal: {}",
            outcome.applied,
            outcome.failed,
            outcome.skipped_locked,
            outcome.journal_path.display()
        );
    }

    Ok(())
}

fn run_build_index(data_dir: &PathBuf, image_dir: &PathBuf) -> Result<()> {
    let builder = IndexBuilder::new(image_dir.clone(), Ontology::default());
    let entries = builder.build().context("failed to scan image assets")?;
    builder
        .save(&entries, &data_dir.join("image-index.json"))
        .context("failed to save image index")?;
    println!("Indexed {} images into {}", entries.len(), data_dir.display());
    Ok(())
}
