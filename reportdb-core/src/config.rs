use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::auth::Permission;
use crate::database::entities::common_types::Severity;
use crate::errors::{CoreError, CoreResult};

/// One hundred years. Larger windows would overflow timestamp arithmetic.
pub const MAX_RUN_LOCK_TIMEOUT_SECS: i64 = 100 * 365 * 24 * 60 * 60;

/// Who gets which product permission.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionConfig {
    /// Grant for callers without a user name
    pub anonymous: Vec<Permission>,
    pub users: HashMap<String, Vec<Permission>>,
}

impl Default for PermissionConfig {
    fn default() -> Self {
        Self {
            anonymous: vec![Permission::Admin],
            users: HashMap::new(),
        }
    }
}

/// Report store settings loaded from YAML and the environment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub max_query_size: u64,
    pub max_run_count: Option<u64>,
    pub run_lock_timeout_secs: u64,
    pub diff_chunk_size: usize,
    pub store_retry_attempts: u32,
    pub store_retry_base_delay_ms: u64,
    pub review_status_change_disabled: bool,
    pub severity_map: HashMap<String, Severity>,
    pub system_comments: HashMap<String, String>,
    pub permissions: PermissionConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_query_size: 500,
            max_run_count: None,
            run_lock_timeout_secs: 1800,
            diff_chunk_size: 500,
            store_retry_attempts: 3,
            store_retry_base_delay_ms: 60_000,
            review_status_change_disabled: false,
            severity_map: HashMap::new(),
            system_comments: default_system_comments(),
            permissions: PermissionConfig::default(),
        }
    }
}

pub fn default_system_comments() -> HashMap<String, String> {
    HashMap::from([
        (
            "rev_st_changed".to_string(),
            "changed review status from {0} to {1}".to_string(),
        ),
        (
            "rev_st_changed_msg".to_string(),
            "changed review status from {0} to {1} with comment: {2}".to_string(),
        ),
        (
            "comment_changed".to_string(),
            "changed comment message from {0} to {1}".to_string(),
        ),
    ])
}

impl StoreConfig {
    /// Read an optional YAML file, then apply `REPORTDB_*` overrides.
    pub fn load(path: Option<&Path>) -> CoreResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let values: HashMap<String, String> = std::env::vars()
            .filter(|(key, _)| key.starts_with("REPORTDB_"))
            .collect();
        config.apply_overrides(&values);
        Ok(config)
    }

    pub fn from_file(path: &Path) -> CoreResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CoreError::io(format!(
                "Failed to read configuration {}: {}",
                path.display(),
                e
            ))
            .with_source(e)
        })?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> CoreResult<Self> {
        let mut config: StoreConfig = serde_yaml::from_str(raw).map_err(|e| {
            CoreError::validation(format!("Invalid configuration: {}", e)).with_source(e)
        })?;
        // Custom templates extend the built-in ones
        for (key, template) in default_system_comments() {
            config.system_comments.entry(key).or_insert(template);
        }
        Ok(config)
    }

    pub fn apply_overrides(&mut self, values: &HashMap<String, String>) {
        fn parse<T: std::str::FromStr>(values: &HashMap<String, String>, key: &str) -> Option<T> {
            let raw = values.get(key).filter(|value| !value.is_empty())?;
            match raw.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Ignoring invalid value for {}: {}", key, raw);
                    None
                }
            }
        }

        if let Some(value) = parse(values, "REPORTDB_MAX_QUERY_SIZE") {
            self.max_query_size = value;
        }
        if let Some(value) = values.get("REPORTDB_MAX_RUN_COUNT") {
            self.max_run_count = match value.trim() {
                "" | "none" | "unlimited" => None,
                _ => parse(values, "REPORTDB_MAX_RUN_COUNT").or(self.max_run_count),
            };
        }
        if let Some(value) = parse(values, "REPORTDB_RUN_LOCK_TIMEOUT_SECS") {
            self.run_lock_timeout_secs = value;
        }
        if let Some(value) = parse(values, "REPORTDB_DIFF_CHUNK_SIZE") {
            self.diff_chunk_size = value;
        }
        if let Some(value) = parse(values, "REPORTDB_STORE_RETRY_ATTEMPTS") {
            self.store_retry_attempts = value;
        }
        if let Some(value) = parse(values, "REPORTDB_STORE_RETRY_BASE_DELAY_MS") {
            self.store_retry_base_delay_ms = value;
        }
        if let Some(value) = parse(values, "REPORTDB_REVIEW_STATUS_CHANGE_DISABLED") {
            self.review_status_change_disabled = value;
        }
    }

    /// Lock expiry window, capped at `MAX_RUN_LOCK_TIMEOUT_SECS`.
    pub fn run_lock_timeout(&self) -> chrono::Duration {
        let secs = i64::try_from(self.run_lock_timeout_secs)
            .unwrap_or(i64::MAX)
            .min(MAX_RUN_LOCK_TIMEOUT_SECS);
        chrono::Duration::seconds(secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.store_retry_base_delay_ms)
    }

    pub fn severity_for(&self, checker: &str) -> Option<Severity> {
        self.severity_map.get(checker).copied()
    }

    /// Clamp a requested page size, logging when it was too large.
    pub fn clamp_limit(&self, limit: Option<u64>) -> u64 {
        match limit {
            Some(limit) if limit > 0 && limit <= self.max_query_size => limit,
            Some(limit) if limit > self.max_query_size => {
                warn!(
                    "Query limit {} was larger than max query limit {}, setting limit to {}",
                    limit, self.max_query_size, self.max_query_size
                );
                self.max_query_size
            }
            _ => self.max_query_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = StoreConfig::default();
        assert_eq!(config.max_query_size, 500);
        assert_eq!(config.max_run_count, None);
        assert_eq!(config.run_lock_timeout_secs, 1800);
        assert_eq!(config.diff_chunk_size, 500);
        assert_eq!(config.store_retry_attempts, 3);
        assert_eq!(config.permissions.anonymous, vec![Permission::Admin]);
        assert!(config.system_comments.contains_key("rev_st_changed_msg"));
    }

    #[test]
    fn yaml_overrides_and_keeps_builtin_templates() {
        let config = StoreConfig::from_yaml(
            r#"
max_run_count: 2
severity_map:
  core.NullDereference: HIGH
system_comments:
  rev_st_changed: "{0} -> {1}"
permissions:
  anonymous: [PRODUCT_ACCESS]
  users:
    ci: [PRODUCT_STORE]
"#,
        )
        .unwrap();
        assert_eq!(config.max_run_count, Some(2));
        assert_eq!(
            config.severity_for("core.NullDereference"),
            Some(Severity::High)
        );
        assert_eq!(config.system_comments["rev_st_changed"], "{0} -> {1}");
        assert!(config.system_comments.contains_key("comment_changed"));
        assert_eq!(config.permissions.users["ci"], vec![Permission::Store]);
        assert_eq!(config.max_query_size, 500);
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = StoreConfig::default();
        let values = HashMap::from([
            ("REPORTDB_MAX_RUN_COUNT".to_string(), "5".to_string()),
            ("REPORTDB_DIFF_CHUNK_SIZE".to_string(), "100".to_string()),
            ("REPORTDB_RUN_LOCK_TIMEOUT_SECS".to_string(), "bogus".to_string()),
            (
                "REPORTDB_REVIEW_STATUS_CHANGE_DISABLED".to_string(),
                "true".to_string(),
            ),
        ]);
        config.apply_overrides(&values);
        assert_eq!(config.max_run_count, Some(5));
        assert_eq!(config.diff_chunk_size, 100);
        assert_eq!(config.run_lock_timeout_secs, 1800);
        assert!(config.review_status_change_disabled);
    }

    #[test]
    fn oversized_lock_timeout_is_capped() {
        let config = StoreConfig {
            run_lock_timeout_secs: u64::MAX,
            ..StoreConfig::default()
        };
        let timeout = config.run_lock_timeout();
        assert!(timeout > chrono::Duration::zero());
        assert_eq!(timeout.num_seconds(), MAX_RUN_LOCK_TIMEOUT_SECS);
        assert_eq!(StoreConfig::default().run_lock_timeout().num_seconds(), 1800);
    }

    #[test]
    fn limits_are_clamped() {
        let config = StoreConfig::default();
        assert_eq!(config.clamp_limit(Some(10)), 10);
        assert_eq!(config.clamp_limit(Some(10_000)), 500);
        assert_eq!(config.clamp_limit(None), 500);
    }

    #[test]
    fn invalid_yaml_is_a_validation_error() {
        let err = StoreConfig::from_yaml("max_query_size: [").unwrap_err();
        assert_eq!(err.kind(), crate::errors::CoreErrorKind::Validation);
    }
}
