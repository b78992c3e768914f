use crate::config::error::ConfigError;
use serde::Deserialize;
use std::collections::BTreeMap;

// ---------------- ETL Config ----------------
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EtlConfig {
    pub s3_etl_bucket: Option<String>,
    pub s3_base_path: String,
    pub role: Option<String>,
    pub resource_role: Option<String>,
    pub max_retries: u32,
    pub retry_delay: String,
    pub sns_topic_arn_failure: Option<String>,
    pub sns_topic_arn_warning: Option<String>,
    /// `HH:MM` used when a scheduled pipeline does not set `load_time`.
    pub daily_load_time: String,
    pub name_prefix: String,
    pub worker_group: Option<String>,
    pub region: Option<String>,
    /// Directory on the worker machines holding the shell executors.
    pub executor_dir: String,
    /// Prefix (relative to the base path) where QA executors write their records.
    pub qa_log_path: String,
    pub tags: BTreeMap<String, String>,
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            s3_etl_bucket: None,
            s3_base_path: String::new(),
            role: None,
            resource_role: None,
            max_retries: 0,
            retry_delay: "10 Minutes".to_string(),
            sns_topic_arn_failure: None,
            sns_topic_arn_warning: None,
            daily_load_time: "01:00".to_string(),
            name_prefix: String::new(),
            worker_group: None,
            region: None,
            executor_dir: "/usr/local/bin".to_string(),
            qa_log_path: "qa".to_string(),
            tags: BTreeMap::new(),
        }
    }
}

impl EtlConfig {
    pub fn bucket(&self) -> Result<&str, ConfigError> {
        self.s3_etl_bucket
            .as_deref()
            .ok_or_else(|| ConfigError::missing("etl.s3_etl_bucket"))
    }

    pub fn role(&self) -> Result<&str, ConfigError> {
        self.role
            .as_deref()
            .ok_or_else(|| ConfigError::missing("etl.role"))
    }

    pub fn resource_role(&self) -> Result<&str, ConfigError> {
        self.resource_role
            .as_deref()
            .ok_or_else(|| ConfigError::missing("etl.resource_role"))
    }

    /// Base path with surrounding slashes removed, so keys can be joined with `/`.
    pub fn base_path(&self) -> &str {
        self.s3_base_path.trim_matches('/')
    }

    pub fn executor(&self, name: &str) -> String {
        format!("{}/{}", self.executor_dir.trim_end_matches('/'), name)
    }
}
