use crate::config::components::databases::{DatabaseConfig, RdbmsHostConfig, RedshiftConfig};
use crate::config::components::etl::EtlConfig;
use crate::config::components::resources::{Ec2Config, EmrConfig};
use crate::config::components::runtime::{HooksConfig, LoggingConfig};
use crate::config::components::steps::{BootstrapConfig, CustomStepConfig};
use crate::config::error::ConfigError;
use serde::Deserialize;
use serde_yaml::Value;
use std::collections::BTreeMap;

// ---------------- global config ----------------
/// Immutable settings record built once at start-up and passed by reference
/// to everything that needs a default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DuctConfig {
    pub etl: EtlConfig,
    pub ec2: Ec2Config,
    pub emr: EmrConfig,
    pub redshift: RedshiftConfig,
    pub mysql: BTreeMap<String, RdbmsHostConfig>,
    pub postgres: BTreeMap<String, RdbmsHostConfig>,
    pub database: DatabaseConfig,
    pub bootstrap: BootstrapConfig,
    pub teardown: Option<Value>,
    pub custom_steps: Vec<CustomStepConfig>,
    pub logging: LoggingConfig,
    pub hooks: HooksConfig,
}

impl DuctConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_yaml::from_str(yaml)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        // an empty file parses to Null
        let value = match value {
            Value::Null => Value::Mapping(Default::default()),
            other => other,
        };
        let config: DuctConfig = serde_yaml::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for permission in &self.database.permissions {
            permission.validate()?;
        }
        let mut seen = std::collections::HashSet::new();
        for custom in &self.custom_steps {
            if !seen.insert(custom.step_type.as_str()) {
                return Err(ConfigError::invalid(format!(
                    "custom step '{}' is declared twice",
                    custom.step_type
                )));
            }
        }
        Ok(())
    }

    pub fn mysql_host(&self, alias: &str) -> Result<&RdbmsHostConfig, ConfigError> {
        self.mysql.get(alias).ok_or_else(|| {
            ConfigError::not_found(format!(
                "mysql host '{}' not configured, available hosts are {}",
                alias,
                self.mysql.keys().cloned().collect::<Vec<_>>().join(", ")
            ))
        })
    }

    pub fn postgres_host(&self, alias: &str) -> Result<&RdbmsHostConfig, ConfigError> {
        self.postgres.get(alias).ok_or_else(|| {
            ConfigError::not_found(format!(
                "postgres host '{}' not configured, available hosts are {}",
                alias,
                self.postgres.keys().cloned().collect::<Vec<_>>().join(", ")
            ))
        })
    }

    /// Failure topic used when the pipeline does not name its own.
    pub fn default_topic_arn(&self) -> Option<&str> {
        self.etl.sns_topic_arn_failure.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = DuctConfig::from_yaml_str("").expect("empty config");
        assert_eq!(config.etl.max_retries, 0);
        assert_eq!(config.ec2.instance_type, "m1.large");
        assert!(config.etl.bucket().is_err());
    }

    #[test]
    fn sections_are_read() {
        let yaml = r#"
etl:
  s3_etl_bucket: etl-bucket
  s3_base_path: /dev/etl/
  role: DataPipelineDefaultRole
  resource_role: DataPipelineDefaultResourceRole
mysql:
  orders_db:
    host: db.internal
    username: etl
    password: secret
database:
  permissions:
    - permission: select
      group: analysts
"#;
        let config = DuctConfig::from_yaml_str(yaml).expect("parse config");
        assert_eq!(config.etl.bucket().unwrap(), "etl-bucket");
        assert_eq!(config.etl.base_path(), "dev/etl");
        assert_eq!(config.mysql_host("orders_db").unwrap().host, "db.internal");
        assert!(config.mysql_host("missing").is_err());
        assert_eq!(config.database.permissions.len(), 1);
    }

    #[test]
    fn permission_without_grantee_is_rejected() {
        let yaml = r#"
database:
  permissions:
    - permission: select
"#;
        let err = DuctConfig::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }
}
