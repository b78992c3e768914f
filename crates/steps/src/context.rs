use crate::error::StepError;
use common::config::DuctConfig;
use common::types::{Frequency, S3Path};
use common::utils::resolve_path;
use components::{Activity, ActivityKind, ObjectId, Runner, S3Node, WorkflowObject};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A data node as seen by the steps that read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRef {
    pub id: ObjectId,
    /// Set for object-store nodes.
    pub path: Option<S3Path>,
}

impl NodeRef {
    pub fn s3(node: &S3Node) -> Self {
        Self {
            id: node.id.clone(),
            path: Some(node.path.clone()),
        }
    }

    pub fn warehouse(id: &ObjectId) -> Self {
        Self {
            id: id.clone(),
            path: None,
        }
    }

    pub fn is_s3(&self) -> bool {
        self.path.is_some()
    }
}

/// Nodes a step reads or writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Nodes {
    #[default]
    None,
    Single(NodeRef),
    Named(BTreeMap<String, NodeRef>),
}

impl Nodes {
    pub fn is_none(&self) -> bool {
        matches!(self, Nodes::None)
    }

    pub fn refs(&self) -> Vec<&NodeRef> {
        match self {
            Nodes::None => vec![],
            Nodes::Single(node) => vec![node],
            Nodes::Named(nodes) => nodes.values().collect(),
        }
    }

    pub fn ids(&self) -> Vec<ObjectId> {
        self.refs().into_iter().map(|n| n.id.clone()).collect()
    }

    /// The node when this is exactly one object-store node.
    pub fn single_s3(&self) -> Option<&NodeRef> {
        match self {
            Nodes::Single(node) if node.is_s3() => Some(node),
            _ => None,
        }
    }
}

/// Per-step scratch directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepPaths {
    pub src: S3Path,
    pub data: S3Path,
    pub logs: S3Path,
}

/// Everything a step expander may consult. Built by the compiler for one
/// step at a time.
#[derive(Debug, Clone)]
pub struct StepContext<'a> {
    pub id: String,
    pub config: &'a DuctConfig,
    pub pipeline_name: &'a str,
    pub frequency: Frequency,
    pub schedule: ObjectId,
    pub runner: Option<Runner>,
    pub emr_ami_major: Option<u32>,
    pub warehouse: Option<ObjectId>,
    pub input: Nodes,
    pub max_retries: u32,
    pub alarm: Option<ObjectId>,
    pub topic_arn: Option<String>,
    pub paths: StepPaths,
    pub qa_log_dir: S3Path,
    /// Directory of the pipeline definition; relative file names resolve here.
    pub base_dir: &'a Path,
}

impl StepContext<'_> {
    pub fn sub_id(&self, suffix: &str) -> ObjectId {
        ObjectId::new(format!("{}{}", self.id, suffix))
    }

    pub fn runner(&self) -> Result<Runner, StepError> {
        self.runner
            .clone()
            .ok_or_else(|| StepError::input("step has no resource to run on"))
    }

    pub fn warehouse(&self) -> Result<&ObjectId, StepError> {
        self.warehouse
            .as_ref()
            .ok_or_else(|| StepError::input("step needs the warehouse database"))
    }

    pub fn emr_ami_major(&self) -> Result<u32, StepError> {
        self.emr_ami_major
            .ok_or_else(|| StepError::input("step needs an EMR cluster"))
    }

    /// Activity carrying the pipeline's schedule, runner, retry policy and
    /// failure alarm.
    pub fn activity(&self, id: ObjectId, kind: ActivityKind) -> Result<Activity, StepError> {
        Ok(Activity::new(id, kind, &self.schedule, self.runner()?)
            .with_retries(self.max_retries, self.config.etl.retry_delay.clone())
            .with_on_fail(self.alarm.clone()))
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        resolve_path(self.base_dir, path)
    }

    pub fn executor(&self, name: &str) -> String {
        self.config.etl.executor(name)
    }

    /// The object-store node this step must read.
    pub fn require_s3_input(&self) -> Result<&NodeRef, StepError> {
        self.input.single_s3().ok_or_else(|| {
            StepError::input("step needs a single object-store input node")
        })
    }

    pub fn s3_node(&self, id: ObjectId, path: S3Path) -> S3Node {
        S3Node::new(id, &self.schedule, path)
    }
}

/// What a staged file is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSource {
    Inline(String),
    File(PathBuf),
    Directory(PathBuf),
}

/// A file the activation phase uploads before submitting the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub dest: S3Path,
    pub source: ArtifactSource,
}

/// Result of expanding one step.
#[derive(Debug, Clone, Default)]
pub struct StepOutput {
    pub objects: Vec<WorkflowObject>,
    pub activities: Vec<ObjectId>,
    pub output: Nodes,
    pub artifacts: Vec<Artifact>,
}

impl StepOutput {
    pub fn add_activity(&mut self, activity: Activity) -> ObjectId {
        let id = activity.id.clone();
        self.activities.push(id.clone());
        self.objects.push(activity.into());
        id
    }

    pub fn add_object(&mut self, object: impl Into<WorkflowObject>) {
        self.objects.push(object.into());
    }

    /// Register an object-store node and return its reference.
    pub fn add_s3_node(&mut self, node: S3Node) -> NodeRef {
        let node_ref = NodeRef::s3(&node);
        self.objects.push(node.into());
        node_ref
    }

    pub fn stage(&mut self, dest: S3Path, source: ArtifactSource) {
        self.artifacts.push(Artifact { dest, source });
    }

    pub fn activity_mut(&mut self, id: &ObjectId) -> Option<&mut Activity> {
        self.objects
            .iter_mut()
            .filter_map(WorkflowObject::as_activity_mut)
            .find(|a| &a.id == id)
    }
}
