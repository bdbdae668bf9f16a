//! Failure classification.
//!
//! Classifiers are grouped into tiers that run in a fixed order:
//! 1. Regex tier - static log patterns, some extracting evidence
//! 2. Secondary tier - the more expensive matcher family
//! 3. Step-context tier - keyed on test name and failed step
//!
//! The orchestrator concatenates every tier's output and reduces it to a
//! ranked list (see [`rank`]).

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{debug, info};

use crate::types::{Classification, ClassificationKind, TestFailureRecord};

/// Classifier id of the unclassifiable fallback.
pub const DEFAULT_REVIEW_ID: &str = "DEFAULT_REVIEW";

/// Confidence of the unclassifiable fallback.
pub const DEFAULT_REVIEW_CONFIDENCE: f64 = 0.5;

/// Position of a classifier in the orchestration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Regex,
    Secondary,
    StepContext,
}

/// When the secondary tier is consulted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum TierPolicy {
    /// Run every tier unconditionally
    #[default]
    Always,
    /// Skip the secondary tier when a regex-tier match reaches `threshold`
    OnLowConfidence { threshold: f64 },
}

/// A single classifier.
pub trait Classifier: Send + Sync {
    /// Name for logging.
    fn name(&self) -> &'static str;

    /// Tier this classifier belongs to.
    fn tier(&self) -> Tier;

    /// Classify a record. Returns every match, in table order.
    fn classify(&self, record: &TestFailureRecord) -> Vec<Classification>;
}

// ============================================================================
// Regex tier
// ============================================================================

/// A literal log pattern mapped to a pre-built classification.
struct PatternRule {
    pattern: Regex,
    classification: Classification,
}

impl PatternRule {
    fn literal(text: &str, classification: Classification) -> Self {
        let pattern = Regex::new(&format!("(?i){}", regex::escape(text)))
            .expect("escaped literal is a valid regex");
        Self {
            pattern,
            classification,
        }
    }
}

static PATTERN_RULES: LazyLock<Vec<PatternRule>> = LazyLock::new(|| {
    use ClassificationKind as K;
    vec![
        PatternRule::literal(
            "Connection timed out",
            Classification::new("REGEX_TIMEOUT", K::KnownFlake, 0.99).with_detail("ticket", "PROJ-123"),
        ),
        PatternRule::literal(
            "database migration setup",
            Classification::new("REGEX_DB_MIGRATE", K::SetupFailure, 0.95)
                .with_detail("error", "DB migration failed"),
        ),
        PatternRule::literal(
            "mysql validation failed",
            Classification::new("REGEX_MYSQL_VALIDATE", K::OcpMysqlValidationFailure, 0.96)
                .with_detail("reason", "Validation script returned non-zero"),
        ),
        PatternRule::literal(
            "mysql cleanup failed",
            Classification::new("REGEX_MYSQL_CLEANUP", K::OcpMysqlCleanupFailure, 0.96)
                .with_detail("reason", "Cleanup script returned non-zero"),
        ),
        PatternRule::literal(
            "ocp-mysql deploy failed",
            Classification::new("REGEX_MYSQL_DEPLOY", K::OcpMysqlDeployFailure, 0.97)
                .with_detail("reason", "Deployment playbook failed"),
        ),
        PatternRule::literal(
            "backup completed with warnings",
            Classification::new("REGEX_BACKUP_PARTIAL", K::BackupPartiallyFailed, 0.90)
                .with_detail("warning", "Some files were skipped"),
        ),
        PatternRule::literal(
            "backup successful",
            Classification::new("REGEX_BACKUP_SUCCESS", K::BackupSuccessful, 1.0),
        ),
        PatternRule::literal(
            "Test skipped due to unstable environment",
            Classification::new("REGEX_SKIP_ENV", K::Skip, 1.0)
                .with_detail("reason", "Unstable Environment"),
        ),
        PatternRule::literal(
            "Skipping test, feature flag is disabled",
            Classification::new("REGEX_SKIP_FLAG", K::NewSkip, 1.0)
                .with_detail("reason", "Feature Flag Disabled"),
        ),
    ]
});

/// Ansible host failure followed, possibly lines later, by the role that was
/// being applied. Quotes may be JSON-escaped.
static ANSIBLE_ROLE_FAILURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)ansible-playbook error: one or more host failed.*use_role\\?"\s*:\s*\\?"([^"\\]+)"#,
    )
    .expect("valid ansible regex")
});

/// Tier-1 classifier over the raw log.
#[derive(Debug, Default, Clone, Copy)]
pub struct RegexClassifier;

impl RegexClassifier {
    /// Extract the failed ansible role, if the log shows one.
    fn ansible_failure(logs: &str) -> Option<Classification> {
        let caps = ANSIBLE_ROLE_FAILURE.captures(logs)?;
        let role_path = caps.get(1)?.as_str();
        let role = role_path
            .rsplit('/')
            .find(|segment| !segment.is_empty())
            .unwrap_or(role_path);

        Some(
            Classification::new("REGEX_ANSIBLE_FAILURE", ClassificationKind::AnsibleDeployFailure, 0.98)
                .with_detail("failed_role", role)
                .with_detail("error_type", "Host Failed"),
        )
    }
}

impl Classifier for RegexClassifier {
    fn name(&self) -> &'static str {
        "regex"
    }

    fn tier(&self) -> Tier {
        Tier::Regex
    }

    fn classify(&self, record: &TestFailureRecord) -> Vec<Classification> {
        let mut found: Vec<Classification> = PATTERN_RULES
            .iter()
            .filter(|rule| rule.pattern.is_match(&record.logs))
            .map(|rule| rule.classification.clone())
            .collect();

        if let Some(ansible) = Self::ansible_failure(&record.logs) {
            found.push(ansible);
        }
        found
    }
}

// ============================================================================
// Secondary tier
// ============================================================================

static SECONDARY_RULES: LazyLock<Vec<(&'static str, Classification)>> = LazyLock::new(|| {
    vec![
        (
            "nullpointerexception",
            Classification::new("LLM_NPE", ClassificationKind::ProductBug, 0.92)
                .with_detail("exception", "NullPointerException"),
        ),
        (
            "permission denied",
            Classification::new("LLM_PERMS", ClassificationKind::InfraError, 0.88)
                .with_detail("error", "Permission denied"),
        ),
    ]
});

/// Tier-2 classifier: deterministic stand-in for model-based inference.
#[derive(Debug, Default, Clone, Copy)]
pub struct SecondaryClassifier;

impl Classifier for SecondaryClassifier {
    fn name(&self) -> &'static str {
        "secondary"
    }

    fn tier(&self) -> Tier {
        Tier::Secondary
    }

    fn classify(&self, record: &TestFailureRecord) -> Vec<Classification> {
        let logs = record.logs.to_lowercase();
        SECONDARY_RULES
            .iter()
            .filter(|(needle, _)| logs.contains(needle))
            .map(|(_, classification)| classification.clone())
            .collect()
    }
}

// ============================================================================
// Step-context tier
// ============================================================================

/// Matches a (test name, failed step) pair.
struct StepRule {
    test_name_contains: &'static str,
    failed_step_contains: &'static str,
    classifier_id: &'static str,
    kind: ClassificationKind,
    confidence: f64,
    reason: &'static str,
}

const STEP_RULES: &[StepRule] = &[StepRule {
    test_name_contains: "test_mysql_backup",
    failed_step_contains: "Verify backup integrity",
    classifier_id: "STEP_BACKUP_INTEGRITY",
    kind: ClassificationKind::BackupIntegrityFailure,
    confidence: 1.0,
    reason: "Checksum mismatch",
}];

/// Tier-3 classifier over the step parser's output.
#[derive(Debug, Default, Clone, Copy)]
pub struct StepContextClassifier;

impl Classifier for StepContextClassifier {
    fn name(&self) -> &'static str {
        "step-context"
    }

    fn tier(&self) -> Tier {
        Tier::StepContext
    }

    fn classify(&self, record: &TestFailureRecord) -> Vec<Classification> {
        let Some(failed_step) = record.failed_step.as_deref() else {
            return Vec::new();
        };

        STEP_RULES
            .iter()
            .filter(|rule| {
                record.test_name.contains(rule.test_name_contains)
                    && failed_step.contains(rule.failed_step_contains)
            })
            .map(|rule| {
                Classification::new(rule.classifier_id, rule.kind, rule.confidence)
                    .with_detail("reason", rule.reason)
                    .with_detail("failed_step", failed_step)
            })
            .collect()
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Runs classifier tiers and reduces their output.
pub struct ClassifierOrchestrator {
    /// Classifiers sorted by tier; registration order kept within a tier
    classifiers: Vec<Box<dyn Classifier>>,
    policy: TierPolicy,
}

impl Default for ClassifierOrchestrator {
    fn default() -> Self {
        Self::new(TierPolicy::Always)
    }
}

impl ClassifierOrchestrator {
    /// Create an orchestrator with the built-in classifiers.
    #[must_use]
    pub fn new(policy: TierPolicy) -> Self {
        Self::with_classifiers(
            vec![
                Box::new(RegexClassifier),
                Box::new(SecondaryClassifier),
                Box::new(StepContextClassifier),
            ],
            policy,
        )
    }

    /// Create an orchestrator with specific classifiers.
    #[must_use]
    pub fn with_classifiers(mut classifiers: Vec<Box<dyn Classifier>>, policy: TierPolicy) -> Self {
        classifiers.sort_by_key(|c| c.tier());
        Self {
            classifiers,
            policy,
        }
    }

    /// Active tier policy.
    #[must_use]
    pub fn policy(&self) -> TierPolicy {
        self.policy
    }

    /// Classify a record into a ranked, deduplicated list.
    ///
    /// Never returns an empty list.
    #[must_use]
    pub fn classify(&self, record: &TestFailureRecord) -> Vec<Classification> {
        info!(test_run_id = %record.test_run_id, test_name = %record.test_name, "Classifying failure");

        let mut all = Vec::new();
        // Decided once, when the first secondary classifier is reached; tier
        // order guarantees `all` then holds regex-tier output only.
        let mut escalate: Option<bool> = None;
        for classifier in &self.classifiers {
            if classifier.tier() == Tier::Secondary
                && !*escalate.get_or_insert_with(|| self.should_escalate(&all))
            {
                debug!(classifier = classifier.name(), "Regex tier conclusive, skipping secondary tier");
                continue;
            }

            for hit in classifier.classify(record) {
                debug!(
                    classifier = classifier.name(),
                    classifier_id = %hit.classifier_id,
                    kind = ?hit.kind,
                    confidence = hit.confidence,
                    "Match found"
                );
                all.push(hit);
            }
        }

        rank(all)
    }

    /// Decide whether the secondary tier runs, given the regex-tier output.
    fn should_escalate(&self, regex_tier: &[Classification]) -> bool {
        match self.policy {
            TierPolicy::Always => true,
            TierPolicy::OnLowConfidence { threshold } => {
                !regex_tier.iter().any(|c| c.confidence >= threshold)
            }
        }
    }
}

/// Reduce the concatenated tier output to the final classification list.
///
/// In order:
/// 1. Any skip-kind classification overrides everything; the first one wins.
/// 2. An empty input becomes a single manual-review fallback.
/// 3. Otherwise dedup by classifier id (first position, last value) and
///    stable-sort by confidence, highest first.
#[must_use]
pub fn rank(all: Vec<Classification>) -> Vec<Classification> {
    if let Some(skip) = all.iter().find(|c| c.kind.is_skip()) {
        info!(classifier_id = %skip.classifier_id, "Exclusive skip classification found, overriding others");
        return vec![skip.clone()];
    }

    if all.is_empty() {
        info!("No specific match, defaulting to manual review");
        return vec![Classification::new(
            DEFAULT_REVIEW_ID,
            ClassificationKind::NeedsManualReview,
            DEFAULT_REVIEW_CONFIDENCE,
        )];
    }

    let mut unique: IndexMap<String, Classification> = IndexMap::with_capacity(all.len());
    for classification in all {
        unique.insert(classification.classifier_id.clone(), classification);
    }

    let mut ranked: Vec<Classification> = unique.into_values().collect();
    ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    ranked
}
