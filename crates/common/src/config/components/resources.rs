use crate::config::error::ConfigError;
use crate::config::loader::merge_yaml;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

/// Overlay a pipeline's partial resource section on the configured defaults.
fn overlay<T: Serialize + DeserializeOwned>(base: &T, overrides: &Value) -> Result<T, ConfigError> {
    let mut merged = serde_yaml::to_value(base)?;
    if !overrides.is_null() {
        merge_yaml(&mut merged, overrides.clone());
    }
    Ok(serde_yaml::from_value(merged)?)
}

// ---------------- EC2 Config ----------------
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Ec2Config {
    pub instance_type: String,
    pub ami: Option<String>,
    pub security_group: Option<String>,
    pub security_group_ids: Vec<String>,
    pub subnet_id: Option<String>,
    pub key_pair: Option<String>,
    pub terminate_after: String,
}

impl Default for Ec2Config {
    fn default() -> Self {
        Self {
            instance_type: "m1.large".to_string(),
            ami: None,
            security_group: None,
            security_group_ids: Vec::new(),
            subnet_id: None,
            key_pair: None,
            terminate_after: "6 Hours".to_string(),
        }
    }
}

impl Ec2Config {
    pub fn with_overrides(&self, overrides: &Value) -> Result<Self, ConfigError> {
        overlay(self, overrides)
    }
}

// ---------------- EMR Config ----------------
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmrConfig {
    pub master_instance_type: String,
    pub core_instance_type: String,
    pub num_core_instances: u32,
    pub task_instance_type: Option<String>,
    pub num_task_instances: u32,
    pub task_bid_price: Option<String>,
    pub ami_version: String,
    pub terminate_after: String,
    pub key_pair: Option<String>,
    pub subnet_id: Option<String>,
    pub bootstrap_actions: Vec<String>,
}

impl Default for EmrConfig {
    fn default() -> Self {
        Self {
            master_instance_type: "m1.large".to_string(),
            core_instance_type: "m1.large".to_string(),
            num_core_instances: 1,
            task_instance_type: None,
            num_task_instances: 0,
            task_bid_price: None,
            ami_version: "3.3.1".to_string(),
            terminate_after: "6 Hours".to_string(),
            key_pair: None,
            subnet_id: None,
            bootstrap_actions: Vec::new(),
        }
    }
}

impl EmrConfig {
    pub fn with_overrides(&self, overrides: &Value) -> Result<Self, ConfigError> {
        overlay(self, overrides)
    }

    /// Major version of the AMI series (`"2.4.2"` gives 2).
    pub fn ami_major(&self) -> u32 {
        self.ami_version
            .split('.')
            .next()
            .and_then(|major| major.trim().parse().ok())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_only_named_keys() {
        let base = Ec2Config {
            ami: Some("ami-base".into()),
            ..Ec2Config::default()
        };
        let overrides: Value = serde_yaml::from_str("instance_type: c4.xlarge").unwrap();
        let merged = base.with_overrides(&overrides).unwrap();
        assert_eq!(merged.instance_type, "c4.xlarge");
        assert_eq!(merged.ami.as_deref(), Some("ami-base"));
        assert_eq!(merged.terminate_after, "6 Hours");
    }

    #[test]
    fn null_overrides_keep_defaults() {
        let merged = EmrConfig::default().with_overrides(&Value::Null).unwrap();
        assert_eq!(merged.ami_version, "3.3.1");
        assert_eq!(merged.ami_major(), 3);
    }
}
