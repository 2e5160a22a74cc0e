//! Surgical fix applier
//!
//! Applies only safe, high-confidence image corrections: critical
//! mismatches plus a narrow slice of recommended fixes. Locked recipes are
//! never touched, every run leaves a rollback journal, and a missing lock
//! file aborts the whole run before any candidate is built.

use crate::locks::LockRegistry;
use crate::ontology::Ontology;
use crate::report::ReportGenerator;
use crate::types::{
    ActionTier, AuditReport, Confidence, FixFailure, RollbackJournal, RollbackRecord,
    VerificationResult,
};
use crate::verifier::Verifier;
use chrono::Utc;
use gg_common::db::meals;
use gg_common::{Error, Result};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Asset URL prefix for generated recipe images
const GENERATED_IMAGE_PREFIX: &str = "/attached_assets/generated_images";

/// How many sample changes the fix summary shows
const SUMMARY_SAMPLE_LIMIT: usize = 10;

/// Tunable apply bounds
#[derive(Debug, Clone)]
pub struct ApplierConfig {
    /// Store mutations issued per batch
    pub batch_size: usize,
    /// Pause between batches, a cooperative yield toward the store
    pub batch_pause: Duration,
}

impl Default for ApplierConfig {
    fn default() -> Self {
        Self {
            batch_size: 25,
            batch_pause: Duration::from_millis(500),
        }
    }
}

/// A fix that passed every selection gate
#[derive(Debug, Clone)]
struct FixCandidate {
    recipe_id: String,
    recipe_name: String,
    current_image: String,
    new_image_url: String,
    reason: String,
}

/// Outcome of a live apply run
#[derive(Debug)]
pub struct FixOutcome {
    pub applied: usize,
    pub failed: usize,
    pub skipped_locked: usize,
    pub journal_path: PathBuf,
}

/// Applies safe corrections against the recipe store
pub struct FixApplier {
    db: SqlitePool,
    ontology: Arc<Ontology>,
    locks_path: PathBuf,
    data_dir: PathBuf,
    config: ApplierConfig,
    dry_run: bool,
}

impl FixApplier {
    pub fn new(
        db: SqlitePool,
        ontology: Arc<Ontology>,
        locks_path: PathBuf,
        data_dir: PathBuf,
        config: ApplierConfig,
        dry_run: bool,
    ) -> Self {
        Self {
            db,
            ontology,
            locks_path,
            data_dir,
            config,
            dry_run,
        }
    }

    /// Re-verify the catalog, then apply the safe subset of fixes
    ///
    /// Refuses outright in dry-run mode, before any I/O. The lock registry
    /// must load before any candidate is built; a missing or unreadable
    /// lock file aborts the run.
    pub async fn apply_surgical_fixes(&self, verifier: &Verifier) -> Result<FixOutcome> {
        if self.dry_run {
            return Err(Error::InvalidInput(
                "cannot apply fixes in dry-run mode".to_string(),
            ));
        }

        let locks = LockRegistry::load(&self.locks_path)?;

        info!("Starting surgical fix pass (regression-safe)");
        let report = verifier.verify_all_recipes().await?;

        let candidates = self.select_candidates(&report, &locks);

        let mut changes: Vec<RollbackRecord> = Vec::new();
        let mut failures: Vec<FixFailure> = Vec::new();
        let mut skipped_locked = 0usize;

        let total_batches = candidates.len().div_ceil(self.config.batch_size.max(1));
        for (batch_no, batch) in candidates.chunks(self.config.batch_size.max(1)).enumerate() {
            info!(
                batch = batch_no + 1,
                total_batches,
                size = batch.len(),
                "Applying fix batch"
            );

            for fix in batch {
                // Same guard again, immediately before the mutating call
                if let Some(reason) = locks.lock_reason(&fix.recipe_id) {
                    warn!(recipe = %fix.recipe_name, reason, "Skipping locked recipe");
                    skipped_locked += 1;
                    continue;
                }

                // The journal entry precedes the mutation so an interrupted
                // batch still records the attempted change
                changes.push(RollbackRecord {
                    id: fix.recipe_id.clone(),
                    recipe_name: fix.recipe_name.clone(),
                    old_image: fix.current_image.clone(),
                    new_image: fix.new_image_url.clone(),
                    reason: fix.reason.clone(),
                });

                match meals::update_meal_image(&self.db, &fix.recipe_id, &fix.new_image_url).await {
                    Ok(()) => {
                        debug!(recipe = %fix.recipe_name, image = %fix.new_image_url, "Fixed");
                    }
                    Err(e) => {
                        error!(recipe = %fix.recipe_name, error = %e, "Fix failed");
                        // Withdraw the journal entry; the change never landed
                        changes.pop();
                        failures.push(FixFailure {
                            recipe_name: fix.recipe_name.clone(),
                            error: e.to_string(),
                        });
                    }
                }
            }

            if batch_no + 1 < total_batches {
                tokio::time::sleep(self.config.batch_pause).await;
            }
        }

        let journal = RollbackJournal {
            timestamp: Utc::now(),
            total_applied: changes.len(),
            total_failed: failures.len(),
            changes,
            failures,
        };

        let journal_path = self.persist_journal(&journal)?;
        self.persist_fix_summary(&journal)?;

        info!(
            applied = journal.total_applied,
            failed = journal.total_failed,
            skipped_locked,
            journal = %journal_path.display(),
            "Fix pass complete"
        );

        Ok(FixOutcome {
            applied: journal.total_applied,
            failed: journal.total_failed,
            skipped_locked,
            journal_path,
        })
    }

    /// Select the safe subset of a fresh report's results
    ///
    /// Critical mismatches with a suggestion, plus recommended results
    /// restricted to negative scores with a high-confidence suggestion and
    /// no forbidden issue (those are already in the critical set). Every
    /// candidate must be unlocked and form-factor compatible.
    fn select_candidates(&self, report: &AuditReport, locks: &LockRegistry) -> Vec<FixCandidate> {
        let critical: Vec<&VerificationResult> = report
            .results
            .iter()
            .filter(|r| {
                r.action_required == ActionTier::Critical
                    && r.suggested_image.is_some()
                    && !locks.is_locked(&r.recipe_id)
                    && self.form_factor_ok(r)
            })
            .collect();

        let high_value_recommended: Vec<&VerificationResult> = report
            .results
            .iter()
            .filter(|r| {
                r.action_required == ActionTier::Recommended
                    && r.suggested_image.is_some()
                    && r.match_score < 0
                    && r.confidence == Confidence::High
                    && !locks.is_locked(&r.recipe_id)
                    && self.form_factor_ok(r)
                    && !r.has_forbidden_issue()
            })
            .collect();

        info!(
            candidates = critical.len() + high_value_recommended.len(),
            critical = critical.len(),
            recommended = high_value_recommended.len(),
            rejected = report.results.len() - critical.len() - high_value_recommended.len(),
            "Surgical fixes identified"
        );

        critical
            .into_iter()
            .chain(high_value_recommended)
            .filter_map(|r| {
                let suggested = r.suggested_image.as_ref()?;
                let issues = r
                    .issues
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ");
                Some(FixCandidate {
                    recipe_id: r.recipe_id.clone(),
                    recipe_name: r.recipe_name.clone(),
                    current_image: r.current_image.clone(),
                    new_image_url: format!("{}/{}", GENERATED_IMAGE_PREFIX, suggested),
                    reason: format!("{}: {}", r.action_required.as_str(), issues),
                })
            })
            .collect()
    }

    /// Form-factor gate: never swap a solid-food photo onto a beverage
    /// recipe or vice versa, however good the textual score looks
    fn form_factor_ok(&self, result: &VerificationResult) -> bool {
        let Some(suggested) = result.suggested_image.as_ref() else {
            return false;
        };
        let compatible = self
            .ontology
            .form_factor_compatible(&result.recipe_name, suggested);
        if !compatible {
            info!(
                recipe = %result.recipe_name,
                suggested = %suggested,
                "Form-factor mismatch, candidate rejected"
            );
        }
        compatible
    }

    fn persist_journal(&self, journal: &RollbackJournal) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.data_dir)?;
        let stamp = ReportGenerator::file_stamp(&journal.timestamp);
        let path = self
            .data_dir
            .join(format!("image-fix-rollback-{}.json", stamp));
        std::fs::write(&path, serde_json::to_string_pretty(journal)?)?;
        Ok(path)
    }

    /// Human-readable fix summary; counts are the contract, the savings
    /// estimate is presentational only
    fn persist_fix_summary(&self, journal: &RollbackJournal) -> Result<PathBuf> {
        let total = journal.total_applied + journal.total_failed;
        let success_rate = if total > 0 {
            (journal.total_applied as f64 / total as f64 * 100.0).round() as u32
        } else {
            100
        };
        let review_days = total.div_ceil(20);

        let mut summary = String::new();
        summary.push_str("RECIPE IMAGE FIX SUMMARY\n");
        summary.push_str(&format!("Generated: {}\n\n", journal.timestamp.to_rfc3339()));
        summary.push_str("RESULTS:\n");
        summary.push_str(&format!("  Successfully fixed: {}\n", journal.total_applied));
        summary.push_str(&format!("  Failed fixes:       {}\n", journal.total_failed));
        summary.push_str(&format!("  Success rate:       {}%\n\n", success_rate));

        if !journal.changes.is_empty() {
            summary.push_str("SAMPLE FIXES APPLIED:\n");
            for change in journal.changes.iter().take(SUMMARY_SAMPLE_LIMIT) {
                summary.push_str(&format!("  - {}: {}\n", change.recipe_name, change.reason));
            }
            summary.push('\n');
        }

        summary.push_str("ESTIMATED SAVINGS:\n");
        summary.push_str(&format!(
            "  Manual review at $80 CAD/day would take ~{} days (~${} CAD)\n",
            review_days,
            review_days * 80
        ));

        let stamp = ReportGenerator::file_stamp(&journal.timestamp);
        let path = self.data_dir.join(format!("fix-summary-{}.txt", stamp));
        std::fs::write(&path, summary)?;
        Ok(path)
    }
}

impl FixApplier {
    #[cfg(test)]
    pub(crate) fn select_candidates_for_test(
        &self,
        report: &AuditReport,
        locks: &LockRegistry,
    ) -> Vec<(String, String)> {
        self.select_candidates(report, locks)
            .into_iter()
            .map(|c| (c.recipe_id, c.new_image_url))
            .collect()
    }
}
