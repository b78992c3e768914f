use common::types::S3Path;
use serde::Serialize;
use std::fmt::{Display, Formatter};

pub const DEPENDS_ON: &str = "dependsOn";

/// Stable identifier of a workflow object; references serialise as this id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ObjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ObjectId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FieldValue {
    #[serde(rename = "stringValue")]
    String(String),
    #[serde(rename = "refValue")]
    Ref(ObjectId),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<&ObjectId> for FieldValue {
    fn from(value: &ObjectId) -> Self {
        FieldValue::Ref(value.clone())
    }
}

impl From<ObjectId> for FieldValue {
    fn from(value: ObjectId) -> Self {
        FieldValue::Ref(value)
    }
}

/// Object-store paths are recorded as URI strings, never references.
impl From<&S3Path> for FieldValue {
    fn from(value: &S3Path) -> Self {
        FieldValue::String(value.uri())
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::String(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub key: String,
    #[serde(flatten)]
    pub value: FieldValue,
}

/// Wire form of one workflow object: an id, a name and an ordered multimap
/// of fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineObject {
    pub id: ObjectId,
    pub name: String,
    pub fields: Vec<Field>,
}

impl PipelineObject {
    /// Object carrying a leading `type` field.
    pub fn new(id: &ObjectId, object_type: &str) -> Self {
        let mut object = Self::untyped(id);
        object.set("type", object_type);
        object
    }

    pub fn untyped(id: &ObjectId) -> Self {
        Self {
            id: id.clone(),
            name: id.to_string(),
            fields: vec![],
        }
    }

    /// Append a field. Keys may repeat, except that a `dependsOn` reference
    /// is recorded once.
    pub fn set(&mut self, key: &str, value: impl Into<FieldValue>) -> &mut Self {
        let value = value.into();
        if key == DEPENDS_ON && self.fields.iter().any(|f| f.key == key && f.value == value) {
            return self;
        }
        self.fields.push(Field {
            key: key.to_string(),
            value,
        });
        self
    }

    pub fn set_opt<V: Into<FieldValue>>(&mut self, key: &str, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.set(key, value);
        }
        self
    }

    pub fn set_all<V: Into<FieldValue>>(
        &mut self,
        key: &str,
        values: impl IntoIterator<Item = V>,
    ) -> &mut Self {
        for value in values {
            self.set(key, value);
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|f| f.key == key).map(|f| &f.value)
    }

    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a FieldValue> + 'a {
        self.fields
            .iter()
            .filter(move |f| f.key == key)
            .map(|f| &f.value)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(FieldValue::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn object_type(&self) -> Option<&str> {
        self.get_str("type")
    }

    /// Ids referenced under `key`.
    pub fn refs<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a ObjectId> + 'a {
        self.get_all(key).filter_map(|v| match v {
            FieldValue::Ref(id) => Some(id),
            FieldValue::String(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn wire_form_uses_string_and_ref_values() {
        let schedule = ObjectId::new("DefaultSchedule");
        let mut object = PipelineObject::new(&ObjectId::new("Load0"), "ShellCommandActivity");
        object
            .set("schedule", &schedule)
            .set("scriptArgument", "--a")
            .set("scriptArgument", "--b")
            .set(DEPENDS_ON, &ObjectId::new("Extract0"))
            .set(DEPENDS_ON, &ObjectId::new("Extract0"));

        assert_eq!(
            serde_json::to_value(&object).unwrap(),
            json!({
                "id": "Load0",
                "name": "Load0",
                "fields": [
                    {"key": "type", "stringValue": "ShellCommandActivity"},
                    {"key": "schedule", "refValue": "DefaultSchedule"},
                    {"key": "scriptArgument", "stringValue": "--a"},
                    {"key": "scriptArgument", "stringValue": "--b"},
                    {"key": "dependsOn", "refValue": "Extract0"}
                ]
            })
        );
        assert_eq!(object.get_all("scriptArgument").count(), 2);
        assert_eq!(object.refs(DEPENDS_ON).count(), 1);
        assert_eq!(object.object_type(), Some("ShellCommandActivity"));
    }

    #[test]
    fn paths_are_strings() {
        let mut object = PipelineObject::untyped(&ObjectId::new("Default"));
        object.set("pipelineLogUri", &S3Path::directory("bucket", "logs/p"));
        assert_eq!(object.get_str("pipelineLogUri"), Some("s3://bucket/logs/p/"));
    }
}
