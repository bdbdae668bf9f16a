//! Decision engine: turns classifications into action commands.
//!
//! Rules are applied to every classification in the ranked list, so several
//! root causes can each contribute actions. Proposals are then merged by
//! action kind with stable-key, last-value-wins semantics: the merged command
//! sits where its kind was first proposed and carries the payload of the last
//! proposal.

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::classifier::ClassifierOrchestrator;
use crate::config::TriageConfig;
use crate::steps::parse_steps;
use crate::store::ResultStore;
use crate::types::{
    ActionCommand, ActionKind, Analysis, Classification, ClassificationKind, TestFailureRecord,
};

/// Reason attached to the fallback manual-review command.
pub const NO_RULE_MATCHED_REASON: &str = "no specific rule matched";

/// Classifications and actions decided for one record.
#[derive(Debug, Clone)]
pub struct Decision {
    pub test_run_id: String,
    pub classifications: Vec<Classification>,
    pub actions: Vec<ActionCommand>,
}

/// Rule-based decision engine.
pub struct DecisionEngine {
    classifier: ClassifierOrchestrator,
    store: ResultStore,
    config: TriageConfig,
}

impl DecisionEngine {
    /// Create a new engine.
    #[must_use]
    pub fn new(classifier: ClassifierOrchestrator, store: ResultStore, config: TriageConfig) -> Self {
        Self {
            classifier,
            store,
            config,
        }
    }

    /// Run parse, classify and decide for one record, persisting as it goes.
    ///
    /// Any analysis from a previous run of the same identifier is discarded.
    pub fn process(&self, mut record: TestFailureRecord) -> Decision {
        let parsed = parse_steps(&record.logs);
        record.steps = parsed.steps;
        record.failed_step = parsed.failed_step;
        record.analysis = Analysis::default();
        debug!(
            test_run_id = %record.test_run_id,
            steps = record.steps.len(),
            failed_step = record.failed_step.as_deref().unwrap_or("-"),
            "Parsed steps"
        );
        self.store.save(record.clone());

        let classifications = self.classifier.classify(&record);
        info!(
            test_run_id = %record.test_run_id,
            count = classifications.len(),
            "Received classifications, applying rules"
        );

        let actions = self.decide(&record, &classifications);
        self.store.merge_analysis(
            &record.test_run_id,
            Analysis::decided(classifications.clone(), actions.clone()),
        );

        Decision {
            test_run_id: record.test_run_id,
            classifications,
            actions,
        }
    }

    /// Map ranked classifications to deduplicated action commands.
    ///
    /// Pure; never returns an empty list.
    #[must_use]
    pub fn decide(
        &self,
        record: &TestFailureRecord,
        classifications: &[Classification],
    ) -> Vec<ActionCommand> {
        if let Some(primary) = classifications.first() {
            if primary.kind.is_skip() {
                info!(classifier_id = %primary.classifier_id, "Skip rule matched, doing nothing");
                return vec![ActionCommand::new(ActionKind::DoNothing)];
            }
        }

        let mut proposed: Vec<ActionCommand> = classifications
            .iter()
            .flat_map(|c| self.actions_for(record, c))
            .collect();

        if proposed.is_empty() {
            info!(test_run_id = %record.test_run_id, "No rule matched, marking for manual review");
            proposed.push(
                ActionCommand::new(ActionKind::MarkForManualReview)
                    .with("reason", NO_RULE_MATCHED_REASON),
            );
        }

        dedup_by_kind(proposed)
    }

    /// Commands proposed for one classification.
    fn actions_for(
        &self,
        record: &TestFailureRecord,
        classification: &Classification,
    ) -> Vec<ActionCommand> {
        let actions = match classification.kind {
            ClassificationKind::ProductBug => vec![ActionCommand::new(ActionKind::CreateJiraTicket)
                .with("test_name", record.test_name.as_str())],
            ClassificationKind::BackupIntegrityFailure => {
                vec![ActionCommand::new(ActionKind::NotifySlack)
                    .with("channel", self.config.storage_channel.as_str())
                    .with(
                        "details",
                        serde_json::Value::Object(
                            classification
                                .details
                                .iter()
                                .map(|(k, v)| (k.clone(), v.clone()))
                                .collect(),
                        ),
                    )]
            }
            ClassificationKind::KnownFlake => vec![
                ActionCommand::new(ActionKind::MarkForRerun).with("reason", "Known flaky test"),
            ],
            ClassificationKind::InfraError => vec![
                ActionCommand::new(ActionKind::RunCustomScript)
                    .with("script_path", self.config.cleanup_script.as_str()),
                ActionCommand::new(ActionKind::MarkForManualReview)
                    .with("reason", "Infrastructure instability"),
            ],
            ClassificationKind::AnsibleDeployFailure => {
                let mut notify = ActionCommand::new(ActionKind::NotifySlack)
                    .with("channel", self.config.ansible_channel.as_str());
                if let Some(role) = classification.details.get("failed_role") {
                    notify = notify.with("failed_role", role.clone());
                }
                vec![notify]
            }
            ClassificationKind::SetupFailure
            | ClassificationKind::OcpMysqlValidationFailure
            | ClassificationKind::OcpMysqlCleanupFailure
            | ClassificationKind::OcpMysqlDeployFailure
            | ClassificationKind::BackupPartiallyFailed
            | ClassificationKind::BackupSuccessful
            | ClassificationKind::Skip
            | ClassificationKind::NewSkip
            | ClassificationKind::NeedsManualReview => Vec::new(),
        };

        for action in &actions {
            debug!(
                classifier_id = %classification.classifier_id,
                action = ?action.kind,
                "Rule matched"
            );
        }
        actions
    }
}

/// Merge commands by kind: first position, last payload.
#[must_use]
pub fn dedup_by_kind(actions: Vec<ActionCommand>) -> Vec<ActionCommand> {
    let mut merged: IndexMap<ActionKind, ActionCommand> = IndexMap::with_capacity(actions.len());
    for action in actions {
        merged.insert(action.kind, action);
    }
    merged.into_values().collect()
}
