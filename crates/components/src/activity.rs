use crate::object::{ObjectId, PipelineObject, DEPENDS_ON};
use common::types::S3Path;

pub const DEFAULT_RETRY_DELAY: &str = "10 Minutes";

/// Where an activity executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Runner {
    Resource(ObjectId),
    WorkerGroup(String),
}

impl Runner {
    pub fn resource(&self) -> Option<&ObjectId> {
        match self {
            Runner::Resource(id) => Some(id),
            Runner::WorkerGroup(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShellCommand {
    pub command: Option<String>,
    pub script_uri: Option<S3Path>,
    pub script_arguments: Vec<String>,
    /// Stage the input and output nodes on the runner's local disk.
    pub stage: bool,
}

impl ShellCommand {
    pub fn command(command: impl Into<String>) -> Self {
        Self {
            command: Some(command.into()),
            stage: true,
            ..Self::default()
        }
    }

    pub fn script(script_uri: S3Path) -> Self {
        Self {
            script_uri: Some(script_uri),
            stage: true,
            ..Self::default()
        }
    }

    pub fn with_arguments(mut self, arguments: impl IntoIterator<Item = String>) -> Self {
        self.script_arguments.extend(arguments);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlCommand {
    pub database: ObjectId,
    pub script: Option<String>,
    pub script_uri: Option<S3Path>,
    pub script_arguments: Vec<String>,
    pub queue: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActivityKind {
    ShellCommand(ShellCommand),
    Copy,
    RedshiftCopy {
        insert_mode: String,
        command_options: Vec<String>,
    },
    Emr {
        steps: Vec<String>,
    },
    Sql(SqlCommand),
}

impl ActivityKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            ActivityKind::ShellCommand(_) => "ShellCommandActivity",
            ActivityKind::Copy => "CopyActivity",
            ActivityKind::RedshiftCopy { .. } => "RedshiftCopyActivity",
            ActivityKind::Emr { .. } => "EmrActivity",
            ActivityKind::Sql(_) => "SqlActivity",
        }
    }
}

/// A unit of work run on a resource, with its node wiring and retry
/// metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Activity {
    pub id: ObjectId,
    pub kind: ActivityKind,
    pub schedule: ObjectId,
    pub runner: Runner,
    pub inputs: Vec<ObjectId>,
    pub outputs: Vec<ObjectId>,
    pub max_retries: u32,
    pub retry_delay: String,
    pub on_fail: Option<ObjectId>,
    depends_on: Vec<ObjectId>,
}

impl Activity {
    pub fn new(id: impl Into<ObjectId>, kind: ActivityKind, schedule: &ObjectId, runner: Runner) -> Self {
        Self {
            id: id.into(),
            kind,
            schedule: schedule.clone(),
            runner,
            inputs: vec![],
            outputs: vec![],
            max_retries: 0,
            retry_delay: DEFAULT_RETRY_DELAY.to_string(),
            on_fail: None,
            depends_on: vec![],
        }
    }

    pub fn with_inputs(mut self, inputs: impl IntoIterator<Item = ObjectId>) -> Self {
        for input in inputs {
            if !self.inputs.contains(&input) {
                self.inputs.push(input);
            }
        }
        self
    }

    pub fn with_output(mut self, output: ObjectId) -> Self {
        if !self.outputs.contains(&output) {
            self.outputs.push(output);
        }
        self
    }

    pub fn with_retries(mut self, max_retries: u32, retry_delay: impl Into<String>) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay.into();
        self
    }

    pub fn with_on_fail(mut self, alarm: Option<ObjectId>) -> Self {
        self.on_fail = alarm;
        self
    }

    /// Record a predecessor. Self edges and repeats are ignored.
    pub fn add_dependency(&mut self, id: &ObjectId) {
        if *id != self.id && !self.depends_on.contains(id) {
            self.depends_on.push(id.clone());
        }
    }

    pub fn depends_on(&self) -> &[ObjectId] {
        &self.depends_on
    }

    pub fn set_depends_on(&mut self, ids: Vec<ObjectId>) {
        self.depends_on.clear();
        for id in &ids {
            self.add_dependency(id);
        }
    }

    pub(crate) fn lower(&self) -> PipelineObject {
        let mut object = PipelineObject::new(&self.id, self.kind.type_name());
        object.set("schedule", &self.schedule);
        match &self.runner {
            Runner::Resource(id) => object.set("runsOn", id),
            Runner::WorkerGroup(group) => object.set("workerGroup", group.as_str()),
        };
        object
            .set_all("input", &self.inputs)
            .set_all("output", &self.outputs)
            .set_all(DEPENDS_ON, &self.depends_on)
            .set("maximumRetries", self.max_retries)
            .set("retryDelay", self.retry_delay.as_str())
            .set_opt("onFail", self.on_fail.as_ref());

        match &self.kind {
            ActivityKind::ShellCommand(shell) => {
                object
                    .set_opt("command", shell.command.as_deref())
                    .set_opt("scriptUri", shell.script_uri.as_ref())
                    .set_all("scriptArgument", shell.script_arguments.iter().map(String::as_str));
                if shell.stage {
                    object.set("stage", true);
                }
            }
            ActivityKind::Copy => {}
            ActivityKind::RedshiftCopy {
                insert_mode,
                command_options,
            } => {
                object
                    .set("insertMode", insert_mode.as_str())
                    .set_all("commandOptions", command_options.iter().map(String::as_str));
            }
            ActivityKind::Emr { steps } => {
                object.set_all("step", steps.iter().map(String::as_str));
            }
            ActivityKind::Sql(sql) => {
                object
                    .set("database", &sql.database)
                    .set_opt("script", sql.script.as_deref())
                    .set_opt("scriptUri", sql.script_uri.as_ref())
                    .set_all("scriptArgument", sql.script_arguments.iter().map(String::as_str))
                    .set_opt("queue", sql.queue.as_deref());
            }
        }
        object
    }
}
