use crate::object::{ObjectId, PipelineObject};
use common::types::S3Path;

/// Object-store directory or file.
#[derive(Debug, Clone, PartialEq)]
pub struct S3Node {
    pub id: ObjectId,
    pub schedule: ObjectId,
    pub path: S3Path,
}

impl S3Node {
    pub fn new(id: impl Into<ObjectId>, schedule: &ObjectId, path: S3Path) -> Self {
        Self {
            id: id.into(),
            schedule: schedule.clone(),
            path,
        }
    }

    pub fn is_directory(&self) -> bool {
        self.path.is_directory
    }

    pub(crate) fn lower(&self) -> PipelineObject {
        let key = if self.path.is_directory {
            "directoryPath"
        } else {
            "filePath"
        };
        let mut object = PipelineObject::new(&self.id, "S3DataNode");
        object.set("schedule", &self.schedule).set(key, &self.path);
        object
    }
}

/// Warehouse table, addressed as `[schema.]table`.
#[derive(Debug, Clone, PartialEq)]
pub struct RedshiftNode {
    pub id: ObjectId,
    pub schedule: ObjectId,
    pub database: ObjectId,
    pub schema_name: Option<String>,
    pub table_name: String,
}

impl RedshiftNode {
    pub fn new(
        id: impl Into<ObjectId>,
        schedule: &ObjectId,
        database: &ObjectId,
        full_name: &str,
    ) -> Self {
        let (schema_name, table_name) = match full_name.split_once('.') {
            Some((schema, table)) => (Some(schema.to_string()), table.to_string()),
            None => (None, full_name.to_string()),
        };
        Self {
            id: id.into(),
            schedule: schedule.clone(),
            database: database.clone(),
            schema_name,
            table_name,
        }
    }

    pub fn full_name(&self) -> String {
        match &self.schema_name {
            Some(schema) => format!("{schema}.{}", self.table_name),
            None => self.table_name.clone(),
        }
    }

    pub(crate) fn lower(&self) -> PipelineObject {
        let mut object = PipelineObject::new(&self.id, "RedshiftDataNode");
        object
            .set("schedule", &self.schedule)
            .set("database", &self.database)
            .set_opt("schemaName", self.schema_name.as_deref())
            .set("tableName", self.table_name.as_str());
        object
    }
}

/// Result set of a query against an RDBMS.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlDataNode {
    pub id: ObjectId,
    pub schedule: ObjectId,
    pub database: ObjectId,
    pub table: String,
    pub select_query: String,
}

impl SqlDataNode {
    pub(crate) fn lower(&self) -> PipelineObject {
        let mut object = PipelineObject::new(&self.id, "SqlDataNode");
        object
            .set("schedule", &self.schedule)
            .set("database", &self.database)
            .set("table", self.table.as_str())
            .set("selectQuery", self.select_query.as_str());
        object
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s3_node_key_follows_path_kind() {
        let schedule = ObjectId::new("DefaultSchedule");
        let dir = S3Node::new("out", &schedule, S3Path::directory("b", "data/x"));
        assert_eq!(dir.lower().get_str("directoryPath"), Some("s3://b/data/x/"));
        let file = S3Node::new("in", &schedule, S3Path::file("b", "src/a.tsv"));
        assert_eq!(file.lower().get_str("filePath"), Some("s3://b/src/a.tsv"));
        assert!(file.lower().get("directoryPath").is_none());
    }

    #[test]
    fn redshift_node_splits_schema() {
        let schedule = ObjectId::new("DefaultSchedule");
        let db = ObjectId::new("RedshiftDatabase");
        let node = RedshiftNode::new("n", &schedule, &db, "staging.orders");
        assert_eq!(node.schema_name.as_deref(), Some("staging"));
        assert_eq!(node.full_name(), "staging.orders");
        let bare = RedshiftNode::new("n", &schedule, &db, "orders");
        assert!(bare.lower().get("schemaName").is_none());
    }
}
