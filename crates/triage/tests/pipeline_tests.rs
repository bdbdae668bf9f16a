//! Integration tests for the triage pipeline.
//!
//! These drive the public API end to end: submit failures, then inspect the
//! finished records in the result store.

use triage::classifier::{rank, DEFAULT_REVIEW_ID};
use triage::scenarios::default_batch;
use triage::{
    parse_steps, ActionKind, ActionOutcome, ActionStatus, Classification, ClassificationKind,
    ClassifierOrchestrator, NewTestFailure, ResultStore, TestFailureRecord, TierPolicy,
    TriageConfig, TriageError, TriagePipeline, NO_RULE_MATCHED_REASON,
};

fn pipeline() -> TriagePipeline {
    TriagePipeline::new(TriageConfig::default(), ResultStore::new())
}

fn failure(test_name: &str, logs: &str) -> NewTestFailure {
    NewTestFailure::new(test_name, "Suite", "build-1", "ci", logs, "1.0", "main", "GCP")
}

fn finished(logs: &str) -> TestFailureRecord {
    let pipeline = pipeline();
    let id = pipeline.submit(failure("test_case", logs));
    pipeline.get_record(&id).unwrap()
}

fn action_kinds(record: &TestFailureRecord) -> Vec<ActionKind> {
    record
        .analysis
        .actions
        .iter()
        .flatten()
        .map(|a| a.kind)
        .collect()
}

fn classification_kinds(record: &TestFailureRecord) -> Vec<ClassificationKind> {
    record
        .analysis
        .classifications
        .iter()
        .flatten()
        .map(|c| c.kind)
        .collect()
}

/// Scenario behaviour of single submissions
mod scenario_tests {
    use super::*;

    #[test]
    fn test_timeout_marks_for_rerun() {
        let record = finished("ERROR: Connection timed out to auth-service");
        let classifications = record.analysis.classifications.clone().unwrap();

        assert_eq!(classifications.len(), 1);
        assert_eq!(classifications[0].classifier_id, "REGEX_TIMEOUT");
        assert_eq!(classifications[0].kind, ClassificationKind::KnownFlake);
        assert!((classifications[0].confidence - 0.99).abs() < f64::EPSILON);
        assert_eq!(action_kinds(&record), vec![ActionKind::MarkForRerun]);
    }

    #[test]
    fn test_npe_and_permissions_both_contribute() {
        let record = finished(
            "ERROR: NullPointerException while rendering, then permission denied for user 'reporter'.",
        );

        assert_eq!(
            classification_kinds(&record),
            vec![ClassificationKind::ProductBug, ClassificationKind::InfraError]
        );
        assert_eq!(
            action_kinds(&record),
            vec![
                ActionKind::CreateJiraTicket,
                ActionKind::RunCustomScript,
                ActionKind::MarkForManualReview,
            ]
        );
    }

    #[test]
    fn test_unrecognised_log_goes_to_manual_review() {
        let record = finished("Assertion mismatch: expected 42 documents, got 41");
        let classifications = record.analysis.classifications.clone().unwrap();
        let actions = record.analysis.actions.clone().unwrap();

        assert_eq!(classifications.len(), 1);
        assert_eq!(classifications[0].classifier_id, DEFAULT_REVIEW_ID);
        assert_eq!(classifications[0].kind, ClassificationKind::NeedsManualReview);
        assert!((classifications[0].confidence - 0.5).abs() < f64::EPSILON);

        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].kind, ActionKind::MarkForManualReview);
        assert_eq!(actions[0].payload_str("reason"), Some(NO_RULE_MATCHED_REASON));
    }

    #[test]
    fn test_skip_overrides_everything() {
        let record = finished(
            "FATAL: NullPointerException\nINFO: Skipping test, feature flag is disabled",
        );
        assert_eq!(classification_kinds(&record), vec![ClassificationKind::NewSkip]);
        assert_eq!(action_kinds(&record), vec![ActionKind::DoNothing]);

        let results = record.analysis.action_results.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, ActionStatus::Info);
    }

    #[test]
    fn test_ansible_failure_reports_role() {
        let logs = "Error during command execution: ansible-playbook error: one or more host failed\n\
                    Command executed: ansible-playbook --extra-vars {\"use_role\":\"/work/ansible/roles/ocp-mysql\"} main.yml";
        let record = finished(logs);
        let classifications = record.analysis.classifications.clone().unwrap();

        assert_eq!(classifications[0].classifier_id, "REGEX_ANSIBLE_FAILURE");
        assert_eq!(classifications[0].details["failed_role"], "ocp-mysql");

        let actions = record.analysis.actions.unwrap();
        assert_eq!(actions[0].kind, ActionKind::NotifySlack);
        assert_eq!(actions[0].payload_str("channel"), Some("#devops-ansible"));

        let results = record.analysis.action_results.unwrap();
        assert_eq!(
            results[0].outcome,
            ActionOutcome::MessageSent {
                message_sent_to: "#devops-ansible".into()
            }
        );
    }

    #[test]
    fn test_backup_integrity_uses_failed_step() {
        let pipeline = pipeline();
        let id = pipeline.submit(failure(
            "test_mysql_backup_and_verify",
            "STEP: Running backup\nSTEP: Verify backup integrity\nFAIL: Checksum mismatch",
        ));
        let record = pipeline.get_record(&id).unwrap();

        assert_eq!(record.failed_step.as_deref(), Some("Verify backup integrity"));
        assert_eq!(
            classification_kinds(&record),
            vec![ClassificationKind::BackupIntegrityFailure]
        );
        let actions = record.analysis.actions.unwrap();
        assert_eq!(actions[0].kind, ActionKind::NotifySlack);
        assert_eq!(actions[0].payload_str("channel"), Some("#storage-team"));
    }

    #[test]
    fn test_every_action_has_a_result() {
        let record = finished("permission denied\nConnection timed out\nNullPointerException");
        let actions = record.analysis.actions.unwrap();
        let results = record.analysis.action_results.unwrap();

        assert_eq!(actions.len(), results.len());
        for (action, result) in actions.iter().zip(&results) {
            assert_eq!(action.kind, result.kind);
        }
    }

    #[test]
    fn test_configured_channels_are_used() {
        let config = TriageConfig {
            storage_channel: "#backups".into(),
            ..TriageConfig::default()
        };
        let pipeline = TriagePipeline::new(config, ResultStore::new());
        let id = pipeline.submit(failure(
            "test_mysql_backup_nightly",
            "STEP: Verify backup integrity\nFAIL: digest differs",
        ));
        let record = pipeline.get_record(&id).unwrap();
        let actions = record.analysis.actions.unwrap();
        assert_eq!(actions[0].payload_str("channel"), Some("#backups"));
    }
}

/// Invariants of the classification and decision stages
mod property_tests {
    use super::*;

    const LOGS: &[&str] = &[
        "",
        "ERROR: Connection timed out",
        "WARN: Connection timed out... FATAL: NullPointerException",
        "backup successful\nbackup completed with warnings\nConnection timed out",
        "mysql validation failed due to permission denied",
        "WARN: Test skipped due to unstable environment\npermission denied",
        "STEP: a\nSTEP: b\nerror",
    ];

    #[test]
    fn test_classifications_are_never_empty_and_sorted() {
        for logs in LOGS {
            let record = finished(logs);
            let classifications = record.analysis.classifications.unwrap();
            assert!(!classifications.is_empty(), "empty for {logs:?}");
            assert!(
                classifications
                    .windows(2)
                    .all(|w| w[0].confidence >= w[1].confidence),
                "unsorted for {logs:?}"
            );
        }
    }

    #[test]
    fn test_skip_is_exclusive() {
        for logs in LOGS {
            let record = finished(logs);
            let classifications = record.analysis.classifications.unwrap();
            if classifications.iter().any(|c| c.kind.is_skip()) {
                assert_eq!(classifications.len(), 1, "skip not exclusive for {logs:?}");
            }
        }
    }

    #[test]
    fn test_classifier_ids_are_unique() {
        for logs in LOGS {
            let record = finished(logs);
            let classifications = record.analysis.classifications.unwrap();
            let mut ids: Vec<_> = classifications.iter().map(|c| &c.classifier_id).collect();
            ids.sort();
            ids.dedup();
            assert_eq!(ids.len(), classifications.len(), "duplicate ids for {logs:?}");
        }
    }

    #[test]
    fn test_action_kinds_are_unique() {
        for logs in LOGS {
            let record = finished(logs);
            let mut kinds = action_kinds(&record);
            assert!(!kinds.is_empty());
            let total = kinds.len();
            kinds.sort_by_key(|k| k.display_name());
            kinds.dedup();
            assert_eq!(kinds.len(), total, "duplicate actions for {logs:?}");
        }
    }

    #[test]
    fn test_rank_keeps_ties_in_input_order() {
        let ranked = rank(vec![
            Classification::new("A", ClassificationKind::InfraError, 0.9),
            Classification::new("B", ClassificationKind::ProductBug, 0.9),
            Classification::new("C", ClassificationKind::KnownFlake, 0.95),
        ]);
        let ids: Vec<_> = ranked.iter().map(|c| c.classifier_id.as_str()).collect();
        assert_eq!(ids, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_step_markers_round_trip() {
        let names = ["Provision cluster", "Deploy app", "Run backup"];
        let logs: String = names.iter().map(|n| format!("STEP: {n}\n")).collect();
        let parsed = parse_steps(&format!("{logs}ERROR: boom"));

        assert_eq!(parsed.steps, names);
        assert_eq!(parsed.failed_step.as_deref(), Some("Run backup"));
    }

    #[test]
    fn test_low_confidence_policy_skips_secondary_tier() {
        let record = TestFailureRecord::from(failure(
            "t",
            "Connection timed out, then NullPointerException",
        ));

        let always = ClassifierOrchestrator::new(TierPolicy::Always).classify(&record);
        assert_eq!(always.len(), 2);

        let gated = ClassifierOrchestrator::new(TierPolicy::OnLowConfidence { threshold: 0.9 })
            .classify(&record);
        assert_eq!(gated.len(), 1);
        assert_eq!(gated[0].classifier_id, "REGEX_TIMEOUT");
    }
}

/// Simulation runs over the built-in batch
mod simulation_tests {
    use super::*;

    fn by_name<'a>(records: &'a [TestFailureRecord], name: &str) -> &'a TestFailureRecord {
        records
            .iter()
            .find(|r| r.test_name == name)
            .unwrap_or_else(|| panic!("missing record {name}"))
    }

    #[test]
    fn test_default_batch_runs_in_order() {
        let pipeline = pipeline();
        let batch = default_batch();
        let expected: Vec<String> = batch.iter().map(|f| f.test_name.clone()).collect();

        let report = pipeline.run_simulation(batch);
        let names: Vec<String> = report.records.iter().map(|r| r.test_name.clone()).collect();
        assert_eq!(names, expected);
        assert!(report
            .records
            .iter()
            .all(|r| r.analysis.action_results.is_some()));
    }

    #[test]
    fn test_default_batch_outcomes() {
        let report = pipeline().run_simulation(default_batch());
        let records = &report.records;

        assert_eq!(
            action_kinds(by_name(records, "test_user_login_timeout")),
            vec![ActionKind::MarkForRerun]
        );
        assert_eq!(
            action_kinds(by_name(records, "test_calculate_invoice")),
            vec![ActionKind::CreateJiraTicket]
        );
        assert_eq!(
            action_kinds(by_name(records, "test_full_checkout_multi_error")),
            vec![ActionKind::MarkForRerun, ActionKind::CreateJiraTicket]
        );
        assert_eq!(
            action_kinds(by_name(records, "test_ansible_role_deploy")),
            vec![ActionKind::NotifySlack]
        );
        assert_eq!(
            action_kinds(by_name(records, "test_mysql_backup_and_verify")),
            vec![ActionKind::NotifySlack]
        );
        assert_eq!(
            action_kinds(by_name(records, "test_feature_x_flow")),
            vec![ActionKind::DoNothing]
        );
        assert_eq!(
            action_kinds(by_name(records, "test_e2e_on_unstable_env")),
            vec![ActionKind::DoNothing]
        );
        assert_eq!(
            action_kinds(by_name(records, "test_search_index_drift")),
            vec![ActionKind::MarkForManualReview]
        );

        let backup = by_name(records, "test_mysql_backup_and_verify");
        assert_eq!(backup.failed_step.as_deref(), Some("Verify backup integrity"));
        assert!(!backup.steps.iter().any(|s| s == "Setting up environment"));
    }

    #[test]
    fn test_repeated_runs_do_not_accumulate() {
        let pipeline = pipeline();
        let size = default_batch().len();

        pipeline.run_simulation(default_batch());
        pipeline.run_simulation(default_batch());
        assert_eq!(pipeline.list_records().len(), size);
    }

    #[test]
    fn test_flow_log_brackets_the_run() {
        let report = pipeline().run_simulation(default_batch());
        assert_eq!(report.flow_log.first().unwrap(), "Starting new simulation run...");
        assert_eq!(report.flow_log.last().unwrap(), "Simulation complete.");
        let processed = report
            .flow_log
            .iter()
            .filter(|line| line.starts_with("--- Processing Test:"))
            .count();
        assert_eq!(processed, report.records.len());
    }

    #[test]
    fn test_unknown_record_is_not_found() {
        let pipeline = pipeline();
        pipeline.run_simulation(default_batch());
        let err = pipeline.get_record("does-not-exist").unwrap_err();
        assert!(matches!(err, TriageError::NotFound { .. }));
        assert!(err.to_string().contains("does-not-exist"));
    }
}
