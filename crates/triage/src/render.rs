//! Rendering of finished records for display.
//!
//! Internal enum tags never leave the crate as display text: every kind goes
//! through its `display_name()` table, and JSON views carry
//! [`LABEL_SCHEMA_VERSION`] so consumers can detect label changes.

use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt::Write as _;

use crate::error::Result;
use crate::pipeline::SimulationReport;
use crate::types::{
    ActionKind, ActionOutcome, ActionResult, ActionStatus, ClassificationKind, Details,
    TestFailureRecord,
};

/// Version of the kind-to-label mapping.
pub const LABEL_SCHEMA_VERSION: u32 = 1;

/// Text shown when the step parser found no failed step.
pub const NO_FAILED_STEP: &str = "no failed step detected";

/// Turns records into display text.
pub trait Renderer {
    /// Render one finished record.
    fn render_record(&self, record: &TestFailureRecord) -> Result<String>;

    /// Render a whole simulation run.
    fn render_report(&self, report: &SimulationReport) -> Result<String>;

    /// Render the catalogue of known kinds.
    fn render_catalog(&self, catalog: &KindCatalog) -> Result<String>;
}

// ============================================================================
// Views
// ============================================================================

/// Display view of a classification.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationView {
    pub classifier_id: String,
    pub classification: &'static str,
    pub confidence: f64,
    pub details: Details,
    pub details_pretty: String,
}

/// Display view of a decided action.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionView {
    pub action: &'static str,
    pub payload: Details,
}

/// Display view of an action result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResultView {
    pub action: &'static str,
    pub status: &'static str,
    pub executed_at: String,
    #[serde(flatten)]
    pub outcome: ActionOutcome,
}

/// Display view of a finished record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordView {
    pub schema_version: u32,
    pub test_run_id: String,
    pub test_name: String,
    pub suite: String,
    pub build_id: String,
    pub environment: String,
    pub platform: String,
    pub version: String,
    pub repository: String,
    pub tags: BTreeSet<String>,
    pub rerun_count: u32,
    pub received_at: String,
    pub steps: Vec<String>,
    pub failed_step: Option<String>,
    pub classifications: Vec<ClassificationView>,
    pub actions: Vec<ActionView>,
    pub action_results: Vec<ActionResultView>,
    pub logs: String,
}

impl RecordView {
    /// Build the view of a record.
    pub fn from_record(record: &TestFailureRecord) -> Result<Self> {
        let classifications = record
            .analysis
            .classifications
            .iter()
            .flatten()
            .map(|c| {
                Ok(ClassificationView {
                    classifier_id: c.classifier_id.clone(),
                    classification: c.kind.display_name(),
                    confidence: c.confidence,
                    details: c.details.clone(),
                    details_pretty: serde_json::to_string_pretty(&c.details)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let actions = record
            .analysis
            .actions
            .iter()
            .flatten()
            .map(|a| ActionView {
                action: a.kind.display_name(),
                payload: a.payload.clone(),
            })
            .collect();

        let action_results = record
            .analysis
            .action_results
            .iter()
            .flatten()
            .map(ActionResultView::from)
            .collect();

        Ok(Self {
            schema_version: LABEL_SCHEMA_VERSION,
            test_run_id: record.test_run_id.clone(),
            test_name: record.test_name.clone(),
            suite: record.suite.clone(),
            build_id: record.build_id.clone(),
            environment: record.environment.clone(),
            platform: record.platform.clone(),
            version: record.version.clone(),
            repository: record.repository.clone(),
            tags: record.tags.clone(),
            rerun_count: record.rerun_count,
            received_at: record.received_at.to_rfc3339(),
            steps: record.steps.clone(),
            failed_step: record.failed_step.clone(),
            classifications,
            actions,
            action_results,
            logs: record.logs.clone(),
        })
    }
}

impl From<&ActionResult> for ActionResultView {
    fn from(result: &ActionResult) -> Self {
        Self {
            action: result.kind.display_name(),
            status: status_label(result.status),
            executed_at: result.executed_at.to_rfc3339(),
            outcome: result.outcome.clone(),
        }
    }
}

fn status_label(status: ActionStatus) -> &'static str {
    match status {
        ActionStatus::Success => "SUCCESS",
        ActionStatus::Info => "INFO",
    }
}

/// Sorted display labels of every kind.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KindCatalog {
    pub schema_version: u32,
    pub classification_types: Vec<&'static str>,
    pub action_types: Vec<&'static str>,
}

impl KindCatalog {
    /// Build the catalogue.
    #[must_use]
    pub fn new() -> Self {
        let mut classification_types: Vec<_> = ClassificationKind::ALL
            .iter()
            .map(|k| k.display_name())
            .collect();
        classification_types.sort_unstable();

        let mut action_types: Vec<_> = ActionKind::ALL.iter().map(|k| k.display_name()).collect();
        action_types.sort_unstable();

        Self {
            schema_version: LABEL_SCHEMA_VERSION,
            classification_types,
            action_types,
        }
    }
}

impl Default for KindCatalog {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// JSON
// ============================================================================

/// Pretty-printed JSON output.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonRenderer;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportView<'a> {
    schema_version: u32,
    test_results: Vec<RecordView>,
    flow_log: &'a [String],
}

impl Renderer for JsonRenderer {
    fn render_record(&self, record: &TestFailureRecord) -> Result<String> {
        Ok(serde_json::to_string_pretty(&RecordView::from_record(record)?)?)
    }

    fn render_report(&self, report: &SimulationReport) -> Result<String> {
        let view = ReportView {
            schema_version: LABEL_SCHEMA_VERSION,
            test_results: report
                .records
                .iter()
                .map(RecordView::from_record)
                .collect::<Result<_>>()?,
            flow_log: &report.flow_log,
        };
        Ok(serde_json::to_string_pretty(&view)?)
    }

    fn render_catalog(&self, catalog: &KindCatalog) -> Result<String> {
        Ok(serde_json::to_string_pretty(catalog)?)
    }
}

// ============================================================================
// Text
// ============================================================================

/// Colored terminal output.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextRenderer;

impl TextRenderer {
    fn write_record(out: &mut String, view: &RecordView) {
        let _ = writeln!(
            out,
            "{} {}",
            view.test_name.bold(),
            format!("[{}]", view.test_run_id).dimmed()
        );
        let _ = writeln!(
            out,
            "  suite: {}  build: {}  env: {}  platform: {}  version: {}  repo: {}",
            view.suite, view.build_id, view.environment, view.platform, view.version, view.repository
        );
        if !view.tags.is_empty() {
            let tags: Vec<&str> = view.tags.iter().map(String::as_str).collect();
            let _ = writeln!(out, "  tags: {}", tags.join(", "));
        }
        if view.rerun_count > 0 {
            let _ = writeln!(out, "  reruns: {}", view.rerun_count);
        }

        if !view.steps.is_empty() {
            let _ = writeln!(out, "  steps:");
            for step in &view.steps {
                let marker = if view.failed_step.as_deref() == Some(step.as_str()) {
                    "x".red().to_string()
                } else {
                    "-".normal().to_string()
                };
                let _ = writeln!(out, "    {marker} {step}");
            }
        }
        let _ = writeln!(
            out,
            "  failed step: {}",
            view.failed_step.as_deref().unwrap_or(NO_FAILED_STEP)
        );

        let _ = writeln!(out, "  classifications:");
        for c in &view.classifications {
            let _ = writeln!(
                out,
                "    {} {} ({:.2})",
                c.classification.yellow(),
                c.classifier_id.dimmed(),
                c.confidence
            );
            for (key, value) in &c.details {
                let _ = writeln!(out, "        {key}: {}", plain(value));
            }
        }

        let _ = writeln!(out, "  actions:");
        for (index, action) in view.actions.iter().enumerate() {
            let result = view.action_results.get(index);
            let status = match result.map(|r| r.status) {
                Some("SUCCESS") => "SUCCESS".green().to_string(),
                Some(other) => other.blue().to_string(),
                None => "PENDING".dimmed().to_string(),
            };
            let _ = writeln!(out, "    {} [{status}]", action.action.cyan());
            if let Some(result) = result {
                for line in outcome_lines(&result.outcome) {
                    let _ = writeln!(out, "        {line}");
                }
            }
        }
    }
}

impl Renderer for TextRenderer {
    fn render_record(&self, record: &TestFailureRecord) -> Result<String> {
        let mut out = String::new();
        Self::write_record(&mut out, &RecordView::from_record(record)?);
        Ok(out)
    }

    fn render_report(&self, report: &SimulationReport) -> Result<String> {
        let mut out = String::new();
        let _ = writeln!(out, "{}", "Flow".bold().underline());
        for line in &report.flow_log {
            let _ = writeln!(out, "{line}");
        }
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{}",
            format!("Test results ({})", report.records.len()).bold().underline()
        );
        for record in &report.records {
            let _ = writeln!(out);
            Self::write_record(&mut out, &RecordView::from_record(record)?);
        }
        Ok(out)
    }

    fn render_catalog(&self, catalog: &KindCatalog) -> Result<String> {
        let mut out = String::new();
        let _ = writeln!(out, "{}", "Classification types".bold());
        for label in &catalog.classification_types {
            let _ = writeln!(out, "  {label}");
        }
        let _ = writeln!(out, "{}", "Action types".bold());
        for label in &catalog.action_types {
            let _ = writeln!(out, "  {label}");
        }
        Ok(out)
    }
}

/// Human lines describing an action outcome.
fn outcome_lines(outcome: &ActionOutcome) -> Vec<String> {
    match outcome {
        ActionOutcome::TicketCreated { ticket_id } => vec![format!("ticket: {ticket_id}")],
        ActionOutcome::MessageSent { message_sent_to } => {
            vec![format!("sent to: {message_sent_to}")]
        }
        ActionOutcome::ScriptRun {
            script,
            logs,
            artifacts,
        } => {
            let mut lines = vec![format!("script: {script}")];
            lines.extend(logs.lines().map(|line| format!("| {line}")));
            lines.push(format!("report: {}", artifacts.report_url));
            lines
        }
        ActionOutcome::Recorded { message } => vec![message.clone()],
    }
}

/// Strings without JSON quotes, everything else as compact JSON.
fn plain(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
