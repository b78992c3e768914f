use crate::activity::Activity;
use crate::base::{DefaultObject, Schedule, SnsAlarm};
use crate::data_nodes::{RedshiftNode, S3Node, SqlDataNode};
use crate::databases::{JdbcDatabase, RedshiftDatabase};
use crate::error::ComponentError;
use crate::object::{FieldValue, ObjectId, PipelineObject};
use crate::resources::{Ec2Resource, EmrCluster};
use log::debug;
use serde::Serialize;
use std::collections::HashMap;

/// Anything that can be placed in a compiled pipeline.
pub trait ToPipelineObject {
    fn object_id(&self) -> &ObjectId;
    fn to_pipeline_object(&self) -> PipelineObject;
}

#[derive(Debug, Clone)]
pub enum WorkflowObject {
    Schedule(Schedule),
    Default(DefaultObject),
    SnsAlarm(SnsAlarm),
    Ec2Resource(Ec2Resource),
    EmrCluster(EmrCluster),
    S3Node(S3Node),
    RedshiftNode(RedshiftNode),
    SqlDataNode(SqlDataNode),
    RedshiftDatabase(RedshiftDatabase),
    JdbcDatabase(JdbcDatabase),
    Activity(Activity),
}

impl ToPipelineObject for WorkflowObject {
    fn object_id(&self) -> &ObjectId {
        match self {
            WorkflowObject::Schedule(o) => &o.id,
            WorkflowObject::Default(o) => &o.id,
            WorkflowObject::SnsAlarm(o) => &o.id,
            WorkflowObject::Ec2Resource(o) => &o.id,
            WorkflowObject::EmrCluster(o) => &o.id,
            WorkflowObject::S3Node(o) => &o.id,
            WorkflowObject::RedshiftNode(o) => &o.id,
            WorkflowObject::SqlDataNode(o) => &o.id,
            WorkflowObject::RedshiftDatabase(o) => &o.id,
            WorkflowObject::JdbcDatabase(o) => &o.id,
            WorkflowObject::Activity(o) => &o.id,
        }
    }

    fn to_pipeline_object(&self) -> PipelineObject {
        match self {
            WorkflowObject::Schedule(o) => o.lower(),
            WorkflowObject::Default(o) => o.lower(),
            WorkflowObject::SnsAlarm(o) => o.lower(),
            WorkflowObject::Ec2Resource(o) => o.lower(),
            WorkflowObject::EmrCluster(o) => o.lower(),
            WorkflowObject::S3Node(o) => o.lower(),
            WorkflowObject::RedshiftNode(o) => o.lower(),
            WorkflowObject::SqlDataNode(o) => o.lower(),
            WorkflowObject::RedshiftDatabase(o) => o.lower(),
            WorkflowObject::JdbcDatabase(o) => o.lower(),
            WorkflowObject::Activity(o) => o.lower(),
        }
    }
}

macro_rules! workflow_object_from {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for WorkflowObject {
                fn from(value: $ty) -> Self {
                    WorkflowObject::$variant(value)
                }
            }
        )*
    };
}

workflow_object_from!(
    Schedule => Schedule,
    Default => DefaultObject,
    SnsAlarm => SnsAlarm,
    Ec2Resource => Ec2Resource,
    EmrCluster => EmrCluster,
    S3Node => S3Node,
    RedshiftNode => RedshiftNode,
    SqlDataNode => SqlDataNode,
    RedshiftDatabase => RedshiftDatabase,
    JdbcDatabase => JdbcDatabase,
    Activity => Activity,
);

impl WorkflowObject {
    pub fn as_activity(&self) -> Option<&Activity> {
        match self {
            WorkflowObject::Activity(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_activity_mut(&mut self) -> Option<&mut Activity> {
        match self {
            WorkflowObject::Activity(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_s3_node(&self) -> Option<&S3Node> {
        match self {
            WorkflowObject::S3Node(n) => Some(n),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct Definition {
    #[serde(rename = "pipelineObjects")]
    pipeline_objects: Vec<PipelineObject>,
}

/// The id-keyed set of objects making up one compiled pipeline, in
/// insertion order.
#[derive(Debug, Clone, Default)]
pub struct WorkflowGraph {
    objects: Vec<WorkflowObject>,
    index: HashMap<ObjectId, usize>,
}

impl WorkflowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, object: impl Into<WorkflowObject>) -> Result<ObjectId, ComponentError> {
        let object = object.into();
        let id = object.object_id().clone();
        if self.index.contains_key(&id) {
            return Err(ComponentError::duplicate(id.as_str()));
        }
        debug!("adding workflow object {id}");
        self.index.insert(id.clone(), self.objects.len());
        self.objects.push(object);
        Ok(id)
    }

    pub fn extend<I, T>(&mut self, objects: I) -> Result<(), ComponentError>
    where
        I: IntoIterator<Item = T>,
        T: Into<WorkflowObject>,
    {
        for object in objects {
            self.add(object)?;
        }
        Ok(())
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &ObjectId) -> Option<&WorkflowObject> {
        self.index.get(id).map(|&i| &self.objects[i])
    }

    pub fn get_mut(&mut self, id: &ObjectId) -> Option<&mut WorkflowObject> {
        self.index.get(id).map(|&i| &mut self.objects[i])
    }

    pub fn activity(&self, id: &ObjectId) -> Option<&Activity> {
        self.get(id).and_then(WorkflowObject::as_activity)
    }

    pub fn activity_mut(&mut self, id: &ObjectId) -> Option<&mut Activity> {
        self.get_mut(id).and_then(WorkflowObject::as_activity_mut)
    }

    pub fn activities(&self) -> impl Iterator<Item = &Activity> {
        self.objects.iter().filter_map(WorkflowObject::as_activity)
    }

    pub fn activities_mut(&mut self) -> impl Iterator<Item = &mut Activity> {
        self.objects.iter_mut().filter_map(WorkflowObject::as_activity_mut)
    }

    pub fn objects(&self) -> &[WorkflowObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Every reference field must name an object in the graph.
    pub fn check_references(&self) -> Result<(), ComponentError> {
        for object in &self.objects {
            let lowered = object.to_pipeline_object();
            for field in &lowered.fields {
                if let FieldValue::Ref(target) = &field.value {
                    if !self.contains(target) {
                        return Err(ComponentError::not_found(format!(
                            "object '{}' field '{}' references unknown object '{}'",
                            lowered.id, field.key, target
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn to_pipeline_objects(&self) -> Vec<PipelineObject> {
        self.objects
            .iter()
            .map(ToPipelineObject::to_pipeline_object)
            .collect()
    }

    /// Orchestrator definition document: `{"pipelineObjects": [...]}`.
    pub fn to_json_string(&self) -> Result<String, ComponentError> {
        let definition = Definition {
            pipeline_objects: self.to_pipeline_objects(),
        };
        Ok(serde_json::to_string_pretty(&definition)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{ActivityKind, Runner};
    use crate::base::SCHEDULE_ID;
    use common::types::{Frequency, S3Path};

    fn graph() -> WorkflowGraph {
        let mut graph = WorkflowGraph::new();
        let schedule = Schedule::new("2026-10-17T01:00:00", Frequency::OneTime);
        let schedule_id = graph.add(schedule).unwrap();
        graph
            .add(S3Node::new("Input0", &schedule_id, S3Path::file("b", "src/a.tsv")))
            .unwrap();
        graph
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut graph = graph();
        let schedule_id = ObjectId::new(SCHEDULE_ID);
        let err = graph
            .add(S3Node::new("Input0", &schedule_id, S3Path::file("b", "x")))
            .unwrap_err();
        assert!(matches!(err, ComponentError::Duplicate { .. }));
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn dangling_references_are_reported() {
        let mut graph = graph();
        let activity = Activity::new(
            "Copy0",
            ActivityKind::Copy,
            &ObjectId::new(SCHEDULE_ID),
            Runner::Resource(ObjectId::new("Ec2Resource")),
        )
        .with_inputs([ObjectId::new("Input0")]);
        graph.add(activity).unwrap();
        let err = graph.check_references().unwrap_err();
        assert!(err.to_string().contains("Ec2Resource"));
    }

    #[test]
    fn definition_document_lists_objects_in_order() {
        let graph = graph();
        let json: serde_json::Value = serde_json::from_str(&graph.to_json_string().unwrap()).unwrap();
        let ids: Vec<&str> = json["pipelineObjects"]
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["DefaultSchedule", "Input0"]);
        assert!(graph.check_references().is_ok());
    }
}
