//! Audit report persistence
//!
//! Writes the structured report and a condensed text summary, one pair per
//! run under timestamped names. Artifacts are write-once; nothing here is
//! read back.

use crate::types::{ActionTier, AuditReport};
use chrono::{DateTime, SecondsFormat, Utc};
use gg_common::Result;
use std::path::PathBuf;
use tracing::info;

/// How many entries each summary section shows
const SUMMARY_SECTION_LIMIT: usize = 10;

/// Persists audit artifacts under the data directory
pub struct ReportGenerator {
    data_dir: PathBuf,
}

impl ReportGenerator {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Filesystem-safe timestamp: ISO format with `:` and `.` replaced
    pub fn file_stamp(timestamp: &DateTime<Utc>) -> String {
        timestamp
            .to_rfc3339_opts(SecondsFormat::Millis, true)
            .replace([':', '.'], "-")
    }

    /// Write the JSON report and text summary; returns both paths
    pub fn persist(&self, report: &AuditReport) -> Result<(PathBuf, PathBuf)> {
        std::fs::create_dir_all(&self.data_dir)?;
        let stamp = Self::file_stamp(&report.timestamp);

        let report_path = self.data_dir.join(format!("image-audit-{}.json", stamp));
        std::fs::write(&report_path, serde_json::to_string_pretty(report)?)?;

        let summary_path = self
            .data_dir
            .join(format!("image-audit-summary-{}.txt", stamp));
        std::fs::write(&summary_path, Self::render_summary(report))?;

        info!(
            report = %report_path.display(),
            summary = %summary_path.display(),
            "Audit report saved"
        );

        Ok((report_path, summary_path))
    }

    /// Render the human-readable summary
    ///
    /// Critical issues first, then the worst-scored recommended fixes
    /// (ascending by score so the worst appear first).
    pub fn render_summary(report: &AuditReport) -> String {
        let mut summary = String::new();
        summary.push_str("RECIPE IMAGE AUDIT REPORT\n");
        summary.push_str(&format!("Generated: {}\n\n", report.timestamp.to_rfc3339()));
        summary.push_str("SUMMARY:\n");
        summary.push_str(&format!("  Total recipes:     {}\n", report.total_recipes));
        summary.push_str(&format!("  Critical issues:   {}\n", report.critical_issues));
        summary.push_str(&format!("  Recommended fixes: {}\n", report.recommended_fixes));
        summary.push_str(&format!("  Optional issues:   {}\n", report.optional_issues));
        summary.push_str(&format!("  OK recipes:        {}\n\n", report.ok_recipes));

        if report.critical_issues > 0 {
            summary.push_str("CRITICAL ISSUES (forbidden ingredient mismatches):\n");
            for result in report
                .results
                .iter()
                .filter(|r| r.action_required == ActionTier::Critical)
                .take(SUMMARY_SECTION_LIMIT)
            {
                let issues = result
                    .issues
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                summary.push_str(&format!("  - {}: {}\n", result.recipe_name, issues));
                if let Some(suggested) = &result.suggested_image {
                    summary.push_str(&format!("    -> Suggested: {}\n", suggested));
                }
            }
            summary.push('\n');
        }

        if report.recommended_fixes > 0 {
            summary.push_str("TOP RECOMMENDED FIXES:\n");
            let mut recommended: Vec<_> = report
                .results
                .iter()
                .filter(|r| r.action_required == ActionTier::Recommended)
                .collect();
            recommended.sort_by_key(|r| r.match_score);
            for result in recommended.iter().take(SUMMARY_SECTION_LIMIT) {
                summary.push_str(&format!(
                    "  - {} (Score: {})\n",
                    result.recipe_name, result.match_score
                ));
                if let Some(suggested) = &result.suggested_image {
                    summary.push_str(&format!("    -> Suggested: {}\n", suggested));
                }
            }
        }

        summary
    }
}
