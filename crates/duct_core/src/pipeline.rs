use crate::compiler::schedule::PipelinePaths;
use common::types::{Frequency, S3Path};
use components::{ComponentError, ObjectId, WorkflowGraph};
use dag::error::DagError;
use dag::ActivityDag;
use std::collections::BTreeMap;
use steps::{Artifact, Nodes, StepKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepRole {
    Bootstrap,
    Step,
    Teardown,
}

/// What one step expanded into.
#[derive(Debug, Clone)]
pub struct CompiledStep {
    pub id: String,
    pub kind: StepKind,
    pub role: StepRole,
    pub activities: Vec<ObjectId>,
    /// Steps that must finish first, explicit or through an input node.
    pub depends_on: Vec<String>,
    pub input: Nodes,
    pub output: Nodes,
}

#[derive(Debug, Clone)]
pub struct CompiledPipeline {
    pub name: String,
    pub version: String,
    pub frequency: Frequency,
    pub description: Option<String>,
    pub tags: BTreeMap<String, String>,
    pub paths: PipelinePaths,
    pub graph: WorkflowGraph,
    pub steps: Vec<CompiledStep>,
    pub artifacts: Vec<Artifact>,
}

impl CompiledPipeline {
    pub fn step(&self, id: &str) -> Option<&CompiledStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// The document submitted to the orchestrator.
    pub fn definition_json(&self) -> Result<String, ComponentError> {
        self.graph.to_json_string()
    }

    pub fn definition_path(&self) -> S3Path {
        self.paths.definition()
    }

    pub fn activity_dag(&self) -> Result<ActivityDag, DagError> {
        ActivityDag::build(self.graph.activities())
    }

    pub fn to_dot_string(&self) -> Result<String, DagError> {
        Ok(self.activity_dag()?.to_dot_string())
    }
}
