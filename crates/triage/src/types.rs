//! Core types for failure triage.
//!
//! This module defines the primary data structures for:
//! - Representing ingested test failures and their derived state
//! - Classifying failures into root-cause categories
//! - Describing decided follow-up actions and their execution results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Free-form key/value map used for classification evidence and action payloads.
pub type Details = BTreeMap<String, Value>;

/// Root-cause classification of a test failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClassificationKind {
    /// Failure matches a known flaky signature
    KnownFlake,
    /// Environment or infrastructure problem, not the product
    InfraError,
    /// Newly observed product defect
    ProductBug,
    /// Test setup (fixtures, migrations) failed before the test body ran
    SetupFailure,
    /// Ansible playbook failed while deploying a role
    AnsibleDeployFailure,
    /// OCP MySQL validation script failed
    OcpMysqlValidationFailure,
    /// OCP MySQL cleanup script failed
    OcpMysqlCleanupFailure,
    /// OCP MySQL deployment playbook failed
    OcpMysqlDeployFailure,
    /// Backup data did not verify after restore
    BackupIntegrityFailure,
    /// Backup finished with warnings
    BackupPartiallyFailed,
    /// Backup reported success
    BackupSuccessful,
    /// Test was intentionally skipped
    Skip,
    /// Test was skipped by a newly introduced skip condition
    NewSkip,
    /// Nothing recognised the failure
    NeedsManualReview,
}

impl ClassificationKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 14] = [
        Self::KnownFlake,
        Self::InfraError,
        Self::ProductBug,
        Self::SetupFailure,
        Self::AnsibleDeployFailure,
        Self::OcpMysqlValidationFailure,
        Self::OcpMysqlCleanupFailure,
        Self::OcpMysqlDeployFailure,
        Self::BackupIntegrityFailure,
        Self::BackupPartiallyFailed,
        Self::BackupSuccessful,
        Self::Skip,
        Self::NewSkip,
        Self::NeedsManualReview,
    ];

    /// Human-readable label used at the presentation boundary.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::KnownFlake => "Known Flake",
            Self::InfraError => "Infrastructure Error",
            Self::ProductBug => "New Product Bug",
            Self::SetupFailure => "Setup Failure",
            Self::AnsibleDeployFailure => "Ansible Deploy Failure",
            Self::OcpMysqlValidationFailure => "ocp-mysql-validation-failure",
            Self::OcpMysqlCleanupFailure => "ocp-mysql-cleanup-failure",
            Self::OcpMysqlDeployFailure => "ocp-mysql-deploy-failure",
            Self::BackupIntegrityFailure => "Backup Integrity Failure",
            Self::BackupPartiallyFailed => "backup-partially-failed",
            Self::BackupSuccessful => "backup-successful",
            Self::Skip => "skip",
            Self::NewSkip => "new-skip",
            Self::NeedsManualReview => "Needs Manual Review",
        }
    }

    /// Check if this kind marks an intentionally skipped test.
    #[must_use]
    pub fn is_skip(self) -> bool {
        matches!(self, Self::Skip | Self::NewSkip)
    }
}

/// Follow-up operation decided for a classified failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    /// File a new ticket
    CreateJiraTicket,
    /// Comment on an existing ticket
    UpdateJiraTicket,
    /// Post to a chat channel
    NotifySlack,
    /// Queue the test for another run
    MarkForRerun,
    /// Flag the failure for a human
    MarkForManualReview,
    /// Run a remediation script
    RunCustomScript,
    /// Explicitly take no action
    DoNothing,
}

impl ActionKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::CreateJiraTicket,
        Self::UpdateJiraTicket,
        Self::NotifySlack,
        Self::MarkForRerun,
        Self::MarkForManualReview,
        Self::RunCustomScript,
        Self::DoNothing,
    ];

    /// Human-readable label used at the presentation boundary.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::CreateJiraTicket => "Create Jira Ticket",
            Self::UpdateJiraTicket => "Update Jira Ticket",
            Self::NotifySlack => "Notify Slack",
            Self::MarkForRerun => "Mark for Rerun",
            Self::MarkForManualReview => "Mark for Manual Review",
            Self::RunCustomScript => "Run Custom Script",
            Self::DoNothing => "Do Nothing",
        }
    }
}

/// Failure fields supplied by the ingestion side.
///
/// Derived fields (steps, failed step, analysis) are never accepted from the
/// caller; the pipeline computes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTestFailure {
    /// Caller-chosen identifier; generated when absent
    #[serde(default)]
    pub test_run_id: Option<String>,
    pub test_name: String,
    pub suite: String,
    pub build_id: String,
    pub environment: String,
    /// Raw log text of the failed run
    pub logs: String,
    /// Version tag of the product under test
    pub version: String,
    pub repository: String,
    pub platform: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub rerun_count: u32,
}

impl NewTestFailure {
    /// Create a submission with the required fields and no tags.
    #[must_use]
    pub fn new(
        test_name: impl Into<String>,
        suite: impl Into<String>,
        build_id: impl Into<String>,
        environment: impl Into<String>,
        logs: impl Into<String>,
        version: impl Into<String>,
        repository: impl Into<String>,
        platform: impl Into<String>,
    ) -> Self {
        Self {
            test_run_id: None,
            test_name: test_name.into(),
            suite: suite.into(),
            build_id: build_id.into(),
            environment: environment.into(),
            logs: logs.into(),
            version: version.into(),
            repository: repository.into(),
            platform: platform.into(),
            tags: BTreeSet::new(),
            rerun_count: 0,
        }
    }

    /// Attach tags.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Set the rerun count.
    #[must_use]
    pub fn with_rerun_count(mut self, rerun_count: u32) -> Self {
        self.rerun_count = rerun_count;
        self
    }
}

/// One ingested test failure and everything the pipeline derived from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestFailureRecord {
    /// Unique key in the result store
    pub test_run_id: String,
    pub test_name: String,
    pub suite: String,
    pub build_id: String,
    pub environment: String,
    pub platform: String,
    pub logs: String,
    pub version: String,
    pub repository: String,
    pub tags: BTreeSet<String>,
    pub rerun_count: u32,
    /// When the failure was ingested
    pub received_at: DateTime<Utc>,
    /// Execution steps extracted from the log
    pub steps: Vec<String>,
    /// Last accepted step before the first failure indicator
    pub failed_step: Option<String>,
    /// Accumulated classification/decision/execution output
    pub analysis: Analysis,
}

impl From<NewTestFailure> for TestFailureRecord {
    fn from(new: NewTestFailure) -> Self {
        Self {
            test_run_id: new
                .test_run_id
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            test_name: new.test_name,
            suite: new.suite,
            build_id: new.build_id,
            environment: new.environment,
            platform: new.platform,
            logs: new.logs,
            version: new.version,
            repository: new.repository,
            tags: new.tags,
            rerun_count: new.rerun_count,
            received_at: Utc::now(),
            steps: Vec::new(),
            failed_step: None,
            analysis: Analysis::default(),
        }
    }
}

impl TestFailureRecord {
    /// Short summary for log lines.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} ({}) in {} on build {}",
            self.test_name, self.suite, self.environment, self.build_id
        )
    }
}

/// Analysis state attached to a record.
///
/// Each field is a key of the shallow merge performed by
/// [`crate::store::ResultStore::merge_analysis`]: a `Some` in the partial
/// value replaces the stored field, a `None` leaves it untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifications: Option<Vec<Classification>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<ActionCommand>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_results: Option<Vec<ActionResult>>,
}

impl Analysis {
    /// Partial analysis carrying the decision output.
    #[must_use]
    pub fn decided(classifications: Vec<Classification>, actions: Vec<ActionCommand>) -> Self {
        Self {
            classifications: Some(classifications),
            actions: Some(actions),
            action_results: None,
        }
    }

    /// Partial analysis carrying execution results.
    #[must_use]
    pub fn executed(action_results: Vec<ActionResult>) -> Self {
        Self {
            action_results: Some(action_results),
            ..Self::default()
        }
    }

    /// Shallow-merge `partial` into `self`.
    pub fn merge(&mut self, partial: Self) {
        if let Some(classifications) = partial.classifications {
            self.classifications = Some(classifications);
        }
        if let Some(actions) = partial.actions {
            self.actions = Some(actions);
        }
        if let Some(action_results) = partial.action_results {
            self.action_results = Some(action_results);
        }
    }

    /// Check if nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classifications.is_none() && self.actions.is_none() && self.action_results.is_none()
    }
}

/// Output of one classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    /// Matcher identifier; dedup key
    pub classifier_id: String,
    pub kind: ClassificationKind,
    /// Confidence in [0, 1]
    pub confidence: f64,
    /// Extracted evidence
    #[serde(default)]
    pub details: Details,
}

impl Classification {
    /// Create a classification with empty details.
    #[must_use]
    pub fn new(classifier_id: impl Into<String>, kind: ClassificationKind, confidence: f64) -> Self {
        Self {
            classifier_id: classifier_id.into(),
            kind,
            confidence: confidence.clamp(0.0, 1.0),
            details: Details::new(),
        }
    }

    /// Add one detail entry.
    #[must_use]
    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

/// One decided follow-up action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionCommand {
    pub kind: ActionKind,
    /// Execution parameters
    #[serde(default)]
    pub payload: Details,
}

impl ActionCommand {
    /// Create a command with an empty payload.
    #[must_use]
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            payload: Details::new(),
        }
    }

    /// Add one payload entry.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.payload.insert(key.to_string(), value.into());
        self
    }

    /// Get a string payload entry.
    #[must_use]
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }
}

/// Status of an executed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionStatus {
    /// The target system accepted the action
    Success,
    /// The action was only recorded
    Info,
}

/// Links to artifacts produced by an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifacts {
    pub report_url: String,
}

/// Kind-specific part of an action result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ActionOutcome {
    /// A ticket was filed
    TicketCreated { ticket_id: String },
    /// A chat message was posted
    MessageSent { message_sent_to: String },
    /// A remediation script ran
    ScriptRun {
        script: String,
        logs: String,
        artifacts: Artifacts,
    },
    /// The action was acknowledged without side effects
    Recorded { message: String },
}

/// Result of executing one [`ActionCommand`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    pub kind: ActionKind,
    pub status: ActionStatus,
    pub executed_at: DateTime<Utc>,
    #[serde(flatten)]
    pub outcome: ActionOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_kinds() {
        assert!(ClassificationKind::Skip.is_skip());
        assert!(ClassificationKind::NewSkip.is_skip());
        assert!(!ClassificationKind::KnownFlake.is_skip());
        assert!(!ClassificationKind::NeedsManualReview.is_skip());
    }

    #[test]
    fn test_display_names_are_unique() {
        let labels: BTreeSet<_> = ClassificationKind::ALL
            .iter()
            .map(|k| k.display_name())
            .collect();
        assert_eq!(labels.len(), ClassificationKind::ALL.len());

        let labels: BTreeSet<_> = ActionKind::ALL.iter().map(|k| k.display_name()).collect();
        assert_eq!(labels.len(), ActionKind::ALL.len());
    }

    #[test]
    fn test_record_generates_id_when_absent() {
        let new = NewTestFailure::new(
            "test_login", "Auth", "build-1", "staging", "ERROR", "1.0", "main", "AWS",
        );
        let a = TestFailureRecord::from(new.clone());
        let b = TestFailureRecord::from(new);
        assert!(!a.test_run_id.is_empty());
        assert_ne!(a.test_run_id, b.test_run_id);
        assert!(a.steps.is_empty());
        assert!(a.failed_step.is_none());
        assert!(a.analysis.is_empty());
    }

    #[test]
    fn test_record_keeps_supplied_id() {
        let mut new = NewTestFailure::new(
            "test_login", "Auth", "build-1", "staging", "ERROR", "1.0", "main", "AWS",
        )
        .with_tags(["smoke", "p0", "smoke"])
        .with_rerun_count(2);
        new.test_run_id = Some("run-42".into());

        let record = TestFailureRecord::from(new);
        assert_eq!(record.test_run_id, "run-42");
        assert_eq!(record.tags.len(), 2);
        assert_eq!(record.rerun_count, 2);
    }

    #[test]
    fn test_analysis_merge_is_shallow() {
        let mut analysis = Analysis::decided(
            vec![Classification::new("A", ClassificationKind::KnownFlake, 0.9)],
            vec![ActionCommand::new(ActionKind::MarkForRerun)],
        );

        analysis.merge(Analysis::executed(vec![]));
        assert_eq!(analysis.classifications.as_ref().map(Vec::len), Some(1));
        assert_eq!(analysis.actions.as_ref().map(Vec::len), Some(1));
        assert_eq!(analysis.action_results.as_ref().map(Vec::len), Some(0));

        analysis.merge(Analysis::decided(vec![], vec![]));
        assert_eq!(analysis.classifications.as_ref().map(Vec::len), Some(0));
        assert_eq!(analysis.action_results.as_ref().map(Vec::len), Some(0));
    }

    #[test]
    fn test_confidence_is_clamped() {
        let c = Classification::new("X", ClassificationKind::ProductBug, 1.7);
        assert!((c.confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_submission_deserializes_with_defaults() {
        let json = r#"{
            "testName": "test_a",
            "suite": "S",
            "buildId": "b-1",
            "environment": "ci",
            "logs": "boom",
            "version": "1.0",
            "repository": "main",
            "platform": "GCP"
        }"#;
        let new: NewTestFailure = serde_json::from_str(json).unwrap();
        assert!(new.test_run_id.is_none());
        assert!(new.tags.is_empty());
        assert_eq!(new.rerun_count, 0);
    }
}
