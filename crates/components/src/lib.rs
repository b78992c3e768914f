pub mod activity;
pub mod base;
pub mod data_nodes;
pub mod databases;
pub mod error;
pub mod object;
pub mod resources;
pub mod workflow;

pub use activity::{Activity, ActivityKind, Runner, ShellCommand, SqlCommand};
pub use base::{DefaultObject, Schedule, SnsAlarm};
pub use data_nodes::{RedshiftNode, S3Node, SqlDataNode};
pub use databases::{JdbcDatabase, RedshiftDatabase};
pub use error::ComponentError;
pub use object::{Field, FieldValue, ObjectId, PipelineObject};
pub use resources::{Ec2Resource, EmrCluster};
pub use workflow::{ToPipelineObject, WorkflowGraph, WorkflowObject};
