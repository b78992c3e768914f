use crate::error::ComponentError;
use crate::object::{ObjectId, PipelineObject};
use common::config::components::databases::{RdbmsHostConfig, RedshiftConfig};

pub const REDSHIFT_DATABASE_ID: &str = "RedshiftDatabase";

#[derive(Debug, Clone, PartialEq)]
pub struct RedshiftDatabase {
    pub id: ObjectId,
    pub database_name: String,
    pub cluster_id: String,
    pub username: String,
    pub password: String,
}

impl RedshiftDatabase {
    pub fn from_config(config: &RedshiftConfig) -> Result<Self, ComponentError> {
        Ok(Self {
            id: ObjectId::new(REDSHIFT_DATABASE_ID),
            database_name: config.database_name()?.to_string(),
            cluster_id: config.cluster_id()?.to_string(),
            username: config.username()?.to_string(),
            password: config.password()?.to_string(),
        })
    }

    pub(crate) fn lower(&self) -> PipelineObject {
        let mut object = PipelineObject::new(&self.id, "RedshiftDatabase");
        object
            .set("databaseName", self.database_name.as_str())
            .set("clusterId", self.cluster_id.as_str())
            .set("username", self.username.as_str())
            .set("*password", self.password.as_str());
        object
    }
}

/// RDBMS reached over JDBC from the worker machines.
#[derive(Debug, Clone, PartialEq)]
pub struct JdbcDatabase {
    pub id: ObjectId,
    pub connection_string: String,
    pub driver_class: String,
    pub username: String,
    pub password: String,
}

impl JdbcDatabase {
    pub fn mysql(id: impl Into<ObjectId>, host: &RdbmsHostConfig, database: &str) -> Self {
        Self::with_driver(id, host, database, "mysql", 3306, "com.mysql.jdbc.Driver")
    }

    pub fn postgres(id: impl Into<ObjectId>, host: &RdbmsHostConfig, database: &str) -> Self {
        Self::with_driver(id, host, database, "postgresql", 5432, "org.postgresql.Driver")
    }

    fn with_driver(
        id: impl Into<ObjectId>,
        host: &RdbmsHostConfig,
        database: &str,
        scheme: &str,
        default_port: u16,
        driver_class: &str,
    ) -> Self {
        let port = host.port.unwrap_or(default_port);
        Self {
            id: id.into(),
            connection_string: format!("jdbc:{scheme}://{}:{port}/{database}", host.host),
            driver_class: driver_class.to_string(),
            username: host.username.clone(),
            password: host.password.clone(),
        }
    }

    pub(crate) fn lower(&self) -> PipelineObject {
        let mut object = PipelineObject::new(&self.id, "JdbcDatabase");
        object
            .set("connectionString", self.connection_string.as_str())
            .set("jdbcDriverClass", self.driver_class.as_str())
            .set("username", self.username.as_str())
            .set("*password", self.password.as_str());
        object
    }
}
