//! Triage pipeline - orchestrates the parse-classify-decide-execute flow.
//!
//! Records are processed one at a time, start to finish, in submission order.

use tracing::{info, warn};

use crate::classifier::ClassifierOrchestrator;
use crate::config::TriageConfig;
use crate::decision::{Decision, DecisionEngine};
use crate::error::{Result, TriageError};
use crate::executor::ActionExecutor;
use crate::store::ResultStore;
use crate::types::{ActionResult, Analysis, NewTestFailure, TestFailureRecord};

/// Result of one simulation run.
#[derive(Debug, Clone, Default)]
pub struct SimulationReport {
    /// Finished records, one per identifier, in first-submission order
    pub records: Vec<TestFailureRecord>,
    /// Human-readable narration of the run
    pub flow_log: Vec<String>,
}

/// Triage pipeline.
pub struct TriagePipeline {
    store: ResultStore,
    engine: DecisionEngine,
    executor: ActionExecutor,
}

impl TriagePipeline {
    /// Create a pipeline writing to `store`.
    #[must_use]
    pub fn new(config: TriageConfig, store: ResultStore) -> Self {
        let classifier = ClassifierOrchestrator::new(config.tier_policy);
        let engine = DecisionEngine::new(classifier, store.clone(), config.clone());
        let executor = ActionExecutor::new(config);
        Self {
            store,
            engine,
            executor,
        }
    }

    /// The store this pipeline writes to.
    #[must_use]
    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// Ingest one failure and run it through the whole pipeline.
    ///
    /// Returns the record identifier.
    pub fn submit(&self, failure: NewTestFailure) -> String {
        let mut flow_log = Vec::new();
        self.process(TestFailureRecord::from(failure), &mut flow_log)
    }

    /// Run a fresh simulation over `batch`.
    ///
    /// The store is cleared first so repeated runs never accumulate records.
    pub fn run_simulation(&self, batch: Vec<NewTestFailure>) -> SimulationReport {
        let mut flow_log = vec!["Starting new simulation run...".to_string()];
        self.store.clear();

        info!(count = batch.len(), "Starting simulation run");
        for failure in batch {
            self.process(TestFailureRecord::from(failure), &mut flow_log);
        }
        flow_log.push("Simulation complete.".to_string());

        // The store was cleared above, so it holds exactly this run, once per id
        let records = self.store.list_all();
        SimulationReport { records, flow_log }
    }

    /// Get a finished record.
    pub fn get_record(&self, test_run_id: &str) -> Result<TestFailureRecord> {
        self.store.get(test_run_id).ok_or_else(|| {
            warn!(test_run_id, "Test run not found");
            TriageError::NotFound {
                id: test_run_id.to_string(),
            }
        })
    }

    /// All records, in insertion order.
    #[must_use]
    pub fn list_records(&self) -> Vec<TestFailureRecord> {
        self.store.list_all()
    }

    fn process(&self, record: TestFailureRecord, flow_log: &mut Vec<String>) -> String {
        flow_log.push(format!("--- Processing Test: {} ---", record.test_name));
        flow_log.push(format!("-> Classifying '{}'...", record.test_name));
        info!(test_run_id = %record.test_run_id, failure = %record.summary(), "Processing test failure");

        let decision = self.engine.process(record);
        narrate_decision(&decision, flow_log);

        let results: Vec<ActionResult> = decision
            .actions
            .iter()
            .map(|command| {
                flow_log.push(format!(
                    "   [ActionExecutor] Executing: {}",
                    command.kind.display_name()
                ));
                self.executor.execute(command)
            })
            .collect();
        self.store
            .merge_analysis(&decision.test_run_id, Analysis::executed(results));

        decision.test_run_id
    }
}

fn narrate_decision(decision: &Decision, flow_log: &mut Vec<String>) {
    for classification in &decision.classifications {
        flow_log.push(format!(
            "   [Classifier] {} -> {} ({:.2})",
            classification.classifier_id,
            classification.kind.display_name(),
            classification.confidence
        ));
    }
    flow_log.push(format!(
        "   [DecisionEngine] Received {} classification(s). Applying rules...",
        decision.classifications.len()
    ));
    for action in &decision.actions {
        flow_log.push(format!(
            "   [DecisionEngine] Action: {}",
            action.kind.display_name()
        ));
    }
}
