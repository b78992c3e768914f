use crate::config::error::ConfigError;
use serde::Deserialize;

// ---------------- Redshift Config ----------------
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RedshiftConfig {
    pub database_name: Option<String>,
    pub cluster_id: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl RedshiftConfig {
    pub fn database_name(&self) -> Result<&str, ConfigError> {
        required(&self.database_name, "redshift.database_name")
    }

    pub fn cluster_id(&self) -> Result<&str, ConfigError> {
        required(&self.cluster_id, "redshift.cluster_id")
    }

    pub fn username(&self) -> Result<&str, ConfigError> {
        required(&self.username, "redshift.username")
    }

    pub fn password(&self) -> Result<&str, ConfigError> {
        required(&self.password, "redshift.password")
    }
}

fn required<'a>(value: &'a Option<String>, key: &str) -> Result<&'a str, ConfigError> {
    value.as_deref().ok_or_else(|| ConfigError::missing(key))
}

// ---------------- RDBMS host Config ----------------
/// Connection details for one `mysql`/`postgres` host alias.
#[derive(Debug, Clone, Deserialize)]
pub struct RdbmsHostConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub region: Option<String>,
}

// ---------------- Database (grants) Config ----------------
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub permissions: Vec<Permission>,
}

/// One entry of `database.permissions`; expands into GRANT statements for
/// every relation the pipeline creates.
#[derive(Debug, Clone, Deserialize)]
pub struct Permission {
    pub permission: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub with_grant_option: bool,
}

impl Permission {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.user.is_none() && self.group.is_none() {
            return Err(ConfigError::invalid(format!(
                "database.permissions entry '{}' needs a user or a group",
                self.permission
            )));
        }
        Ok(())
    }
}
