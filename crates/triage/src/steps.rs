//! Execution step extraction from raw logs.
//!
//! Logs mark checkpoints with `STEP: <text>` lines. The parser returns the
//! meaningful steps in order and the step that was active when the first
//! failure indicator appeared.

use regex::Regex;
use std::sync::LazyLock;

/// Matches a step marker anywhere in a line, so timestamped or prefixed
/// lines still count.
static STEP_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"STEP:\s*(.*?)\s*$").expect("valid step regex"));

/// Housekeeping steps that are never reported as the failing step.
const IGNORED_STEP_PHRASES: &[&str] = &[
    "setting up environment",
    "cleaning up resources",
    "starting test",
];

/// Case-insensitive substrings that mark a line as a failure indicator.
const FAILURE_KEYWORDS: &[&str] = &["fail", "panic", "error", "fatal"];

/// Steps extracted from one log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSteps {
    /// Non-ignored steps in log order
    pub steps: Vec<String>,
    /// Last non-ignored step seen before the first failure line
    pub failed_step: Option<String>,
}

/// Parse steps and the failed step from raw log text.
///
/// Scanning for the failed step stops at the first line containing a failure
/// keyword; a step marker on that same line is recorded before stopping.
/// The step list itself always covers the whole log.
#[must_use]
pub fn parse_steps(logs: &str) -> ParsedSteps {
    let mut steps = Vec::new();
    let mut candidate: Option<&str> = None;
    let mut scanning = true;

    for line in logs.lines() {
        let step = step_text(line).filter(|text| !text.is_empty() && !is_ignored(text));

        if let Some(text) = step {
            steps.push(text.to_string());
            if scanning {
                candidate = Some(text);
            }
        }

        if scanning && is_failure_line(line) {
            scanning = false;
        }
    }

    ParsedSteps {
        steps,
        failed_step: candidate.map(str::to_string),
    }
}

/// Extract the text of a step marker line.
fn step_text(line: &str) -> Option<&str> {
    STEP_MARKER
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn is_ignored(step: &str) -> bool {
    let lower = step.to_lowercase();
    IGNORED_STEP_PHRASES
        .iter()
        .any(|phrase| lower.contains(phrase))
}

fn is_failure_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    FAILURE_KEYWORDS.iter().any(|kw| lower.contains(kw))
}
