//! Shared types for the verification engine
//!
//! Report and journal types serialize with camelCase keys to keep the
//! on-disk artifacts compatible with the historical audit files.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

/// Confidence band for a match result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "HIGH",
            Confidence::Medium => "MEDIUM",
            Confidence::Low => "LOW",
        }
    }
}

/// Severity tier of a verification result, gating automated correction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActionTier {
    Critical,
    Recommended,
    Optional,
    Ok,
}

impl ActionTier {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionTier::Critical => "CRITICAL",
            ActionTier::Recommended => "RECOMMENDED",
            ActionTier::Optional => "OPTIONAL",
            ActionTier::Ok => "OK",
        }
    }
}

/// A single verification issue
///
/// Severity classification matches on the variant, not on rendered text.
/// `Display` produces the human-readable strings carried in reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Issue {
    /// Forbidden terms appear in the image filename but not in the recipe
    ForbiddenIngredients { terms: Vec<String> },
    /// Image filename carries no keyword for the recipe's category
    CategoryMismatch { category: String },
    /// Token overlap between recipe and image below threshold
    LowOverlap { percent: u32 },
    /// Scoring failed for this recipe; recorded instead of aborting the batch
    ScoringFailed { detail: String },
}

impl Issue {
    /// Whether this issue disqualifies the current image outright
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Issue::ForbiddenIngredients { .. })
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::ForbiddenIngredients { terms } => {
                write!(f, "Forbidden ingredients in image: {}", terms.join(", "))
            }
            Issue::CategoryMismatch { category } => {
                write!(f, "Image doesn't match meal category: {}", category)
            }
            Issue::LowOverlap { percent } => {
                write!(f, "Low ingredient overlap: {}%", percent)
            }
            Issue::ScoringFailed { detail } => {
                write!(f, "Scoring failed: {}", detail)
            }
        }
    }
}

impl Serialize for Issue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Outcome of verifying one recipe against its current image
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub recipe_id: String,
    pub recipe_name: String,
    pub current_image: String,
    pub issues: Vec<Issue>,
    pub match_score: i32,
    pub confidence: Confidence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_reason: Option<String>,
    pub action_required: ActionTier,
}

impl VerificationResult {
    /// Whether any issue disqualifies the current image
    pub fn has_forbidden_issue(&self) -> bool {
        self.issues.iter().any(Issue::is_forbidden)
    }
}

/// Aggregated result of one verification pass over the full catalog
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub timestamp: DateTime<Utc>,
    pub total_recipes: usize,
    pub critical_issues: usize,
    pub recommended_fixes: usize,
    pub optional_issues: usize,
    pub ok_recipes: usize,
    pub results: Vec<VerificationResult>,
}

/// One applied mutation, sufficient to manually reverse it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackRecord {
    pub id: String,
    pub recipe_name: String,
    pub old_image: String,
    pub new_image: String,
    pub reason: String,
}

/// One failed mutation attempt
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FixFailure {
    pub recipe_name: String,
    pub error: String,
}

/// Audit trail of every mutation in a single live apply run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackJournal {
    pub timestamp: DateTime<Utc>,
    pub total_applied: usize,
    pub total_failed: usize,
    pub changes: Vec<RollbackRecord>,
    pub failures: Vec<FixFailure>,
}
