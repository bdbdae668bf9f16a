//! Configuration for the triage pipeline.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::classifier::TierPolicy;
use crate::error::{Result, TriageError};

/// Default ticket project key.
pub const DEFAULT_TICKET_PROJECT: &str = "PROJ";

/// Default channel for storage/backup notifications.
pub const DEFAULT_STORAGE_CHANNEL: &str = "#storage-team";

/// Default channel for ansible deployment notifications.
pub const DEFAULT_ANSIBLE_CHANNEL: &str = "#devops-ansible";

/// Channel used when a notify command names none.
pub const DEFAULT_CHANNEL: &str = "#default";

/// Default remediation script for infrastructure errors.
pub const DEFAULT_CLEANUP_SCRIPT: &str = "/scripts/cleanup_stale_resources.sh";

/// Default base URL for generated artifacts.
pub const DEFAULT_ARTIFACTS_BASE_URL: &str = "http://artifacts.example.com";

/// Triage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TriageConfig {
    /// Project key prefixed to generated ticket ids
    pub ticket_project: String,
    /// Channel notified about backup integrity failures
    pub storage_channel: String,
    /// Channel notified about ansible deployment failures
    pub ansible_channel: String,
    /// Fallback channel for notify commands without one
    pub default_channel: String,
    /// Script run for infrastructure errors
    pub cleanup_script: String,
    /// Base URL for generated artifact links
    pub artifacts_base_url: String,
    /// When the secondary classifier tier runs
    pub tier_policy: TierPolicy,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            ticket_project: DEFAULT_TICKET_PROJECT.into(),
            storage_channel: DEFAULT_STORAGE_CHANNEL.into(),
            ansible_channel: DEFAULT_ANSIBLE_CHANNEL.into(),
            default_channel: DEFAULT_CHANNEL.into(),
            cleanup_script: DEFAULT_CLEANUP_SCRIPT.into(),
            artifacts_base_url: DEFAULT_ARTIFACTS_BASE_URL.into(),
            tier_policy: TierPolicy::Always,
        }
    }
}

impl TriageConfig {
    /// Load configuration.
    ///
    /// Reads the JSON file at `path` when given, otherwise starts from
    /// defaults, then applies environment overrides and validates.
    ///
    /// # Optional Environment Variables
    /// - `TRIAGE_TICKET_PROJECT`
    /// - `TRIAGE_STORAGE_CHANNEL`
    /// - `TRIAGE_ANSIBLE_CHANNEL`
    /// - `TRIAGE_DEFAULT_CHANNEL`
    /// - `TRIAGE_CLEANUP_SCRIPT`
    /// - `TRIAGE_ARTIFACTS_URL`
    /// - `TRIAGE_ESCALATION_THRESHOLD`: run the secondary tier only below this confidence
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Read configuration from a JSON file without env overrides.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| TriageError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&content).map_err(|source| TriageError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Loaded triage config");
        Ok(config)
    }

    /// Apply `TRIAGE_*` environment overrides.
    pub fn apply_env(&mut self) -> Result<()> {
        override_from_env("TRIAGE_TICKET_PROJECT", &mut self.ticket_project);
        override_from_env("TRIAGE_STORAGE_CHANNEL", &mut self.storage_channel);
        override_from_env("TRIAGE_ANSIBLE_CHANNEL", &mut self.ansible_channel);
        override_from_env("TRIAGE_DEFAULT_CHANNEL", &mut self.default_channel);
        override_from_env("TRIAGE_CLEANUP_SCRIPT", &mut self.cleanup_script);
        override_from_env("TRIAGE_ARTIFACTS_URL", &mut self.artifacts_base_url);

        if let Ok(raw) = std::env::var("TRIAGE_ESCALATION_THRESHOLD") {
            let threshold: f64 = raw.trim().parse().map_err(|_| {
                TriageError::InvalidConfig(format!(
                    "TRIAGE_ESCALATION_THRESHOLD is not a number: {raw}"
                ))
            })?;
            self.tier_policy = TierPolicy::OnLowConfidence { threshold };
        }
        Ok(())
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("ticketProject", &self.ticket_project),
            ("storageChannel", &self.storage_channel),
            ("ansibleChannel", &self.ansible_channel),
            ("defaultChannel", &self.default_channel),
            ("cleanupScript", &self.cleanup_script),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(TriageError::InvalidConfig(format!("{name} must not be empty")));
            }
        }

        if let TierPolicy::OnLowConfidence { threshold } = self.tier_policy {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(TriageError::InvalidConfig(format!(
                    "escalation threshold must be within [0, 1], got {threshold}"
                )));
            }
        }
        Ok(())
    }
}

fn override_from_env(var: &str, target: &mut String) {
    if let Ok(value) = std::env::var(var) {
        if !value.trim().is_empty() {
            *target = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    const ENV_VARS: &[&str] = &[
        "TRIAGE_TICKET_PROJECT",
        "TRIAGE_STORAGE_CHANNEL",
        "TRIAGE_ANSIBLE_CHANNEL",
        "TRIAGE_DEFAULT_CHANNEL",
        "TRIAGE_CLEANUP_SCRIPT",
        "TRIAGE_ARTIFACTS_URL",
        "TRIAGE_ESCALATION_THRESHOLD",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = TriageConfig::load(None).unwrap();
        assert_eq!(config, TriageConfig::default());
        assert_eq!(config.tier_policy, TierPolicy::Always);
    }

    #[test]
    #[serial]
    fn test_partial_file_keeps_defaults() {
        clear_env();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r##"{{"storageChannel": "#backups", "tierPolicy": {{"mode": "onLowConfidence", "threshold": 0.9}}}}"##
        )
        .unwrap();

        let config = TriageConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.storage_channel, "#backups");
        assert_eq!(config.ticket_project, DEFAULT_TICKET_PROJECT);
        assert_eq!(
            config.tier_policy,
            TierPolicy::OnLowConfidence { threshold: 0.9 }
        );
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        clear_env();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"ticketProject": "FILE"}}"#).unwrap();

        std::env::set_var("TRIAGE_TICKET_PROJECT", "OADP");
        std::env::set_var("TRIAGE_ESCALATION_THRESHOLD", "0.75");
        let config = TriageConfig::load(Some(file.path()));
        clear_env();

        let config = config.unwrap();
        assert_eq!(config.ticket_project, "OADP");
        assert_eq!(
            config.tier_policy,
            TierPolicy::OnLowConfidence { threshold: 0.75 }
        );
    }

    #[test]
    #[serial]
    fn test_bad_threshold_is_rejected() {
        clear_env();
        std::env::set_var("TRIAGE_ESCALATION_THRESHOLD", "1.5");
        let result = TriageConfig::load(None);
        std::env::set_var("TRIAGE_ESCALATION_THRESHOLD", "high");
        let unparsable = TriageConfig::load(None);
        clear_env();

        assert!(matches!(result, Err(TriageError::InvalidConfig(_))));
        assert!(matches!(unparsable, Err(TriageError::InvalidConfig(_))));
    }

    #[test]
    #[serial]
    fn test_missing_file_is_an_error() {
        clear_env();
        let dir = tempfile::tempdir().unwrap();
        let result = TriageConfig::load(Some(&dir.path().join("absent.json")));
        assert!(matches!(result, Err(TriageError::ConfigRead { .. })));
    }

    #[test]
    #[serial]
    fn test_malformed_file_is_an_error() {
        clear_env();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let result = TriageConfig::load(Some(file.path()));
        assert!(matches!(result, Err(TriageError::ConfigParse { .. })));
    }

    #[test]
    fn test_empty_channel_is_rejected() {
        let config = TriageConfig {
            storage_channel: "  ".into(),
            ..TriageConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
