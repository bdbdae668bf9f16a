//! CI test failure triage.
//!
//! Ingests failed test runs, extracts the step narrative from their logs,
//! classifies the failure through tiered matchers, decides follow-up actions
//! and executes them against simulated ticketing, chat and script targets.
//!
//! # Usage
//!
//! ```no_run
//! use triage::{NewTestFailure, ResultStore, TriageConfig, TriagePipeline};
//!
//! let pipeline = TriagePipeline::new(TriageConfig::default(), ResultStore::new());
//! let id = pipeline.submit(NewTestFailure::new(
//!     "test_user_login_timeout",
//!     "Auth",
//!     "build-501",
//!     "staging",
//!     "ERROR: Connection timed out to auth-service",
//!     "1.2.3",
//!     "stage",
//!     "AWS",
//! ));
//! let record = pipeline.get_record(&id).unwrap();
//! ```
//!
//! # Architecture
//!
//! - [`steps`] splits logs into named steps and finds the failed one
//! - [`ClassifierOrchestrator`] runs the [`Classifier`] tiers and ranks results
//! - [`DecisionEngine`] maps ranked classifications to action commands
//! - [`ActionExecutor`] produces simulated action results
//! - [`ResultStore`] holds every record and its accumulated analysis
//! - [`TriagePipeline`] wires them together, one record at a time

pub mod classifier;
pub mod config;
pub mod decision;
pub mod error;
pub mod executor;
pub mod pipeline;
pub mod render;
pub mod scenarios;
pub mod steps;
pub mod store;
pub mod types;

pub use classifier::{Classifier, ClassifierOrchestrator, Tier, TierPolicy};
pub use config::TriageConfig;
pub use decision::{Decision, DecisionEngine, NO_RULE_MATCHED_REASON};
pub use error::{Result, TriageError};
pub use executor::ActionExecutor;
pub use pipeline::{SimulationReport, TriagePipeline};
pub use render::{JsonRenderer, KindCatalog, RecordView, Renderer, TextRenderer};
pub use steps::{parse_steps, ParsedSteps};
pub use store::ResultStore;
pub use types::{
    ActionCommand, ActionKind, ActionOutcome, ActionResult, ActionStatus, Analysis,
    Classification, ClassificationKind, NewTestFailure, TestFailureRecord,
};
