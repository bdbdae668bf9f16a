//! Built-in demonstration batch for simulation runs.

use crate::types::NewTestFailure;

const ANSIBLE_ERROR_LOG: &str = r#"{
    context: "(DefaultExecute::Execute)",
    message: "Error during command execution: ansible-playbook error: one or more host failed\n\nCommand executed: /home/jenkins/ws/workspace/oadp-e2e-qe/.venv/bin/ansible-playbook --extra-vars {\"namespace\":\"test-oadp-609\",\"use_role\":\"/home/jenkins/ws/workspace/oadp-e2e-qe/sample-applications/ocpdeployer/ansible/roles/ocp-mysql\",\"with_deploy\":true} --connection local main.yml\n\nexit status 2",
    wrappedErrors: nil,
}"#;

const BACKUP_VERIFY_LOG: &str = "STEP: Setting up environment
STEP: Deploying application stack
STEP: Running backup for mysql-persistent
STEP: Verify backup integrity
FAIL: Checksum mismatch for file /backup/data/db.sql";

const VM_PROVISIONING_LOG: &str =
    "STEP: Launching new VM\nERROR: Request failed, permission denied when creating security group.";

const PARTIAL_BACKUP_LOG: &str = "STEP: Starting backup
backup successful
WARN: backup completed with warnings
ERROR: Connection timed out";

const CLEANUP_LOG: &str = "STEP: Validating application after restore
STEP: Tearing down test resources
ERROR: mysql cleanup failed";

/// The default simulation batch, in processing order.
#[must_use]
pub fn default_batch() -> Vec<NewTestFailure> {
    vec![
        NewTestFailure::new(
            "test_user_login_timeout",
            "Auth",
            "build-501",
            "staging",
            "ERROR: Connection timed out to auth-service",
            "1.2.3",
            "stage",
            "AWS_GCP",
        )
        .with_tags(["smoke"]),
        NewTestFailure::new(
            "test_calculate_invoice",
            "Billing",
            "build-501",
            "staging",
            "FATAL: java.lang.NullPointerException",
            "1.2.3",
            "stage",
            "AWS_GCP",
        )
        .with_tags(["p0"]),
        NewTestFailure::new(
            "test_full_checkout_multi_error",
            "E2E",
            "build-503",
            "staging",
            "WARN: Connection timed out... FATAL: NullPointerException",
            "1.3.0",
            "stage",
            "AZURE",
        )
        .with_tags(["p1", "critical"]),
        NewTestFailure::new(
            "test_report_generation_perms",
            "Reporting",
            "build-504",
            "prod",
            "ERROR: NullPointerException while rendering, then permission denied for user 'reporter'.",
            "1.3.1",
            "main",
            "AWS_RDS",
        )
        .with_tags(["p2"]),
        NewTestFailure::new(
            "test_ansible_role_deploy",
            "Deployment",
            "build-505",
            "ci",
            ANSIBLE_ERROR_LOG,
            "1.4.0",
            "main",
            "OCP_BAREMETAL",
        )
        .with_tags(["deployment"]),
        NewTestFailure::new(
            "test_mysql_backup_and_verify",
            "DB-Backup",
            "build-507",
            "prod",
            BACKUP_VERIFY_LOG,
            "1.4.1",
            "main",
            "GCP",
        )
        .with_tags(["db", "critical"]),
        NewTestFailure::new(
            "test_mysql_validation_with_perms",
            "DB-Restore",
            "build-508",
            "dev",
            "STEP: Validating application after restore\nERROR: mysql validation failed due to permission denied on /data",
            "1.4.1",
            "dev-branch",
            "AWS",
        )
        .with_tags(["db"]),
        NewTestFailure::new(
            "test_partial_backup_flake",
            "DB-Backup",
            "build-509",
            "staging",
            PARTIAL_BACKUP_LOG,
            "1.4.1",
            "stage",
            "GCP",
        )
        .with_tags(["db"]),
        NewTestFailure::new(
            "test_successful_backup_cleanup_fail",
            "DB-Backup",
            "build-510",
            "prod",
            CLEANUP_LOG,
            "1.4.2",
            "main",
            "AZURE",
        )
        .with_tags(["db"]),
        NewTestFailure::new(
            "test_vm_provisioning_error",
            "Infra",
            "build-511",
            "ci",
            VM_PROVISIONING_LOG,
            "1.5.0",
            "main",
            "vSphere",
        )
        .with_tags(["provisioning"]),
        NewTestFailure::new(
            "test_infra_setup_failure",
            "Setup",
            "build-512",
            "ci",
            "STEP: Provisioning network\nFATAL: database migration setup failed",
            "1.4.2",
            "main",
            "OCP",
        )
        .with_tags(["infra"]),
        NewTestFailure::new(
            "test_feature_x_flow",
            "Feature-Flags",
            "build-513",
            "dev",
            "STEP: Checking feature flag\nINFO: Skipping test, feature flag is disabled",
            "1.5.0",
            "feature-x",
            "KIND",
        )
        .with_tags(["feature-toggle"]),
        NewTestFailure::new(
            "test_e2e_on_unstable_env",
            "E2E-Infra",
            "build-514",
            "ci",
            "WARN: Test skipped due to unstable environment",
            "1.5.0",
            "main",
            "OCP",
        )
        .with_tags(["infra", "skip"]),
        NewTestFailure::new(
            "test_search_index_drift",
            "Search",
            "build-515",
            "staging",
            "STEP: Rebuilding index\nAssertion mismatch: expected 42 documents, got 41",
            "1.5.1",
            "main",
            "AWS",
        )
        .with_tags(["search"]),
    ]
}
