//! Action execution against simulated target systems.
//!
//! Nothing leaves the process: ticket ids, chat deliveries, script transcripts
//! and artifact links are synthesized locally.

use chrono::Utc;
use tracing::info;

use crate::config::TriageConfig;
use crate::types::{ActionCommand, ActionKind, ActionOutcome, ActionResult, ActionStatus, Artifacts};

/// Executes action commands. Stateless per call.
#[derive(Debug, Clone)]
pub struct ActionExecutor {
    config: TriageConfig,
}

impl Default for ActionExecutor {
    fn default() -> Self {
        Self::new(TriageConfig::default())
    }
}

impl ActionExecutor {
    /// Create a new executor.
    #[must_use]
    pub fn new(config: TriageConfig) -> Self {
        Self { config }
    }

    /// Execute one command.
    #[must_use]
    pub fn execute(&self, command: &ActionCommand) -> ActionResult {
        info!(action = command.kind.display_name(), "Executing action");

        let (status, outcome) = match command.kind {
            ActionKind::CreateJiraTicket => (
                ActionStatus::Success,
                ActionOutcome::TicketCreated {
                    ticket_id: self.new_ticket_id(),
                },
            ),
            ActionKind::NotifySlack => (
                ActionStatus::Success,
                ActionOutcome::MessageSent {
                    message_sent_to: command
                        .payload_str("channel")
                        .unwrap_or(self.config.default_channel.as_str())
                        .to_string(),
                },
            ),
            ActionKind::RunCustomScript => {
                let script = command
                    .payload_str("script_path")
                    .unwrap_or(self.config.cleanup_script.as_str())
                    .to_string();
                (
                    ActionStatus::Success,
                    ActionOutcome::ScriptRun {
                        logs: script_transcript(&script),
                        artifacts: Artifacts {
                            report_url: self.new_report_url(),
                        },
                        script,
                    },
                )
            }
            ActionKind::UpdateJiraTicket
            | ActionKind::MarkForRerun
            | ActionKind::MarkForManualReview
            | ActionKind::DoNothing => (
                ActionStatus::Info,
                ActionOutcome::Recorded {
                    message: format!("Action '{}' recorded.", command.kind.display_name()),
                },
            ),
        };

        ActionResult {
            kind: command.kind,
            status,
            executed_at: Utc::now(),
            outcome,
        }
    }

    /// Execute commands in order.
    #[must_use]
    pub fn execute_all(&self, commands: &[ActionCommand]) -> Vec<ActionResult> {
        commands.iter().map(|command| self.execute(command)).collect()
    }

    fn new_ticket_id(&self) -> String {
        let hex = uuid::Uuid::new_v4().simple().to_string();
        format!("{}-{}", self.config.ticket_project, hex[..4].to_uppercase())
    }

    fn new_report_url(&self) -> String {
        let hex = uuid::Uuid::new_v4().simple().to_string();
        format!(
            "{}/cleanup/{}.html",
            self.config.artifacts_base_url.trim_end_matches('/'),
            &hex[..8]
        )
    }
}

/// Canned transcript of a cleanup script run.
fn script_transcript(script: &str) -> String {
    [
        format!("Executing {script}..."),
        "Connecting to cluster...".to_string(),
        "Found 3 stale pods.".to_string(),
        "Pod 'test-pod-123' deleted.".to_string(),
        "Pod 'test-pod-456' deleted.".to_string(),
        "Pod 'test-pod-789' deleted.".to_string(),
        "Script finished.".to_string(),
    ]
    .join("\n")
}
