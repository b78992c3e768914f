mod resources;
pub mod schedule;

use crate::compiler::resources::ResourcePool;
use crate::compiler::schedule::{start_date_time, version_name, PipelinePaths, START_FORMAT};
use crate::definition::PipelineDefinition;
use crate::error::CompileError;
use crate::hooks::Hooks;
use crate::pipeline::{CompiledPipeline, CompiledStep, StepRole};
use chrono::{DateTime, Utc};
use common::config::DuctConfig;
use common::types::S3Path;
use components::{
    DefaultObject, ObjectId, RedshiftDatabase, Runner, Schedule, SnsAlarm, WorkflowGraph,
};
use dag::ActivityDag;
use log::{debug, info, warn};
use serde_yaml::Value;
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;
use steps::{
    Artifact, InputNodeSpec, NodeRef, Nodes, RunnerKind, StepContext, StepDescriptor, StepKind,
    StepRegistry,
};

/// Turns pipeline definitions into workflow graphs.
#[derive(Debug)]
pub struct PipelineCompiler<'a> {
    config: &'a DuctConfig,
    registry: StepRegistry,
    hooks: Hooks,
    now: DateTime<Utc>,
}

impl<'a> PipelineCompiler<'a> {
    /// Fails when a custom step in the config cannot be registered.
    pub fn new(config: &'a DuctConfig) -> Result<Self, CompileError> {
        Ok(Self {
            config,
            registry: StepRegistry::with_custom_steps(&config.custom_steps)?,
            hooks: Hooks::default(),
            now: Utc::now(),
        })
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Pin the clock used for the version name and the schedule start.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    pub fn compile(&self, definition: PipelineDefinition) -> Result<CompiledPipeline, CompileError> {
        let started = Instant::now();
        let definition = self.hooks.run_before(definition, &self.config.hooks)?;
        let etl = &self.config.etl;

        let name = format!("{}{}", etl.name_prefix, definition.name);
        let version = version_name(self.now);
        let paths = PipelinePaths::new(etl, &name, &version, definition.frequency)?;
        info!("compiling pipeline '{name}' ({version})");

        let start = start_date_time(
            definition.frequency,
            definition.load_time.as_ref(),
            &etl.daily_load_time,
            definition.time_delta.as_deref(),
            self.now,
        )?;

        let mut graph = WorkflowGraph::new();
        let schedule = graph.add(Schedule::new(
            start.format(START_FORMAT).to_string(),
            definition.frequency,
        ))?;
        let topic_arn = definition
            .topic_arn
            .clone()
            .or_else(|| self.config.default_topic_arn().map(str::to_string));
        let alarm = match &topic_arn {
            Some(topic) => Some(graph.add(SnsAlarm::failure(topic, &name, etl.role()?))?),
            None => None,
        };
        let mut default =
            DefaultObject::new(etl.role()?, etl.resource_role()?, paths.logs.clone(), &schedule);
        default.on_fail = alarm.clone();
        graph.add(default)?;

        let worker_group = definition
            .worker_group
            .clone()
            .or_else(|| etl.worker_group.clone());
        let resources = ResourcePool::new(
            self.config,
            definition.ec2_resource_config.as_ref(),
            definition.emr_cluster_config.as_ref(),
            worker_group,
            schedule.clone(),
            paths.logs.clone(),
        );

        let mut build = Build {
            config: self.config,
            registry: &self.registry,
            definition: &definition,
            pipeline_name: &name,
            paths: &paths,
            schedule,
            alarm,
            topic_arn,
            graph,
            resources,
            warehouse: None,
            nodes: BTreeMap::new(),
            producers: HashMap::new(),
            steps: vec![],
            step_index: HashMap::new(),
            ec2_bootstrap: vec![],
            emr_bootstrap: vec![],
            artifacts: vec![],
            last_output: Nodes::None,
        };

        for (index, descriptor) in definition.steps.iter().enumerate() {
            let id = build.step_id(descriptor, "", index)?;
            build.expand_step(descriptor, id, StepRole::Step, &[])?;
        }
        build.teardown()?;

        let Build {
            mut graph,
            steps,
            artifacts,
            ..
        } = build;

        let reduced = ActivityDag::build(graph.activities())?.reduced_dependencies();
        for activity in graph.activities_mut() {
            if let Some(deps) = reduced.get(&activity.id) {
                activity.set_depends_on(deps.clone());
            }
        }
        graph.check_references()?;

        let pipeline = CompiledPipeline {
            name,
            version,
            frequency: definition.frequency,
            description: definition.description.clone(),
            tags: etl.tags.clone(),
            paths,
            graph,
            steps,
            artifacts,
        };
        let pipeline = self.hooks.run_after(pipeline, &self.config.hooks)?;
        info!(
            "compiled '{}' into {} objects ({} steps) in {:.3}s",
            pipeline.name,
            pipeline.graph.len(),
            pipeline.steps.len(),
            started.elapsed().as_secs_f64()
        );
        Ok(pipeline)
    }
}

#[derive(Debug, Clone, Copy)]
enum ResourceType {
    Ec2,
    Emr,
}

impl ResourceType {
    fn label(&self) -> &'static str {
        match self {
            ResourceType::Ec2 => "Ec2",
            ResourceType::Emr => "Emr",
        }
    }
}

/// State of one compilation.
struct Build<'c> {
    config: &'c DuctConfig,
    registry: &'c StepRegistry,
    definition: &'c PipelineDefinition,
    pipeline_name: &'c str,
    paths: &'c PipelinePaths,
    schedule: ObjectId,
    alarm: Option<ObjectId>,
    topic_arn: Option<String>,
    graph: WorkflowGraph,
    resources: ResourcePool<'c>,
    warehouse: Option<ObjectId>,
    /// Intermediate nodes by step id or alias.
    nodes: BTreeMap<String, NodeRef>,
    /// Node id to the step that produced it.
    producers: HashMap<ObjectId, String>,
    steps: Vec<CompiledStep>,
    step_index: HashMap<String, usize>,
    ec2_bootstrap: Vec<ObjectId>,
    emr_bootstrap: Vec<ObjectId>,
    artifacts: Vec<Artifact>,
    last_output: Nodes,
}

impl Build<'_> {
    fn step_id(
        &self,
        descriptor: &StepDescriptor,
        prefix: &str,
        index: usize,
    ) -> Result<String, CompileError> {
        if let Some(name) = &descriptor.name {
            return Ok(name.clone());
        }
        let kind = self.registry.resolve(&descriptor.step_type)?.kind;
        Ok(format!("{prefix}{}{index}", kind.class_name()))
    }

    fn teardown(&mut self) -> Result<(), CompileError> {
        let descriptor = match (&self.definition.teardown, &self.config.teardown) {
            (Some(descriptor), _) => descriptor.clone(),
            (None, Some(value)) => StepDescriptor::from_value(value.clone())?,
            (None, None) => return Ok(()),
        };
        let kind = self.registry.resolve(&descriptor.step_type)?.kind;
        let id = match &descriptor.name {
            Some(name) => name.clone(),
            None => format!("Teardown{}", kind.class_name()),
        };
        // A resource first used by the teardown brings its bootstrap steps,
        // which the teardown must wait for as well.
        self.runner_for(kind.runner_kind())?;
        let others: Vec<String> = self.steps.iter().map(|s| s.id.clone()).collect();
        self.expand_step(&descriptor, id, StepRole::Teardown, &others)
    }

    fn runner_for(&mut self, kind: RunnerKind) -> Result<(Option<Runner>, Option<u32>), CompileError> {
        match kind {
            RunnerKind::NoRunner => Ok((None, None)),
            RunnerKind::Ec2 => {
                let (runner, newly) = self.resources.ec2(&mut self.graph)?;
                if newly {
                    self.bootstrap(ResourceType::Ec2)?;
                }
                Ok((Some(runner), None))
            }
            RunnerKind::Emr => {
                let (runner, ami, newly) = self.resources.emr(&mut self.graph)?;
                if newly {
                    self.bootstrap(ResourceType::Emr)?;
                }
                Ok((Some(runner), Some(ami)))
            }
        }
    }

    /// Expand the bootstrap steps of a resource that was just materialized.
    /// The pipeline's own `bootstrap` section replaces the configured one.
    fn bootstrap(&mut self, resource: ResourceType) -> Result<(), CompileError> {
        let values: Vec<Value> = match (&self.definition.bootstrap, resource) {
            (Some(own), ResourceType::Ec2) => own.ec2.clone(),
            (Some(own), ResourceType::Emr) => own.emr.clone(),
            (None, ResourceType::Ec2) => self.config.bootstrap.ec2.clone(),
            (None, ResourceType::Emr) => self.config.bootstrap.emr.clone(),
        };
        let prefix = format!("Bootstrap{}", resource.label());
        let mut previous: Option<String> = None;
        for (index, value) in values.into_iter().enumerate() {
            let descriptor = StepDescriptor::from_value(value)?;
            let id = self.step_id(&descriptor, &prefix, index)?;
            let chained: Vec<String> = previous.iter().cloned().collect();
            self.expand_step(&descriptor, id.clone(), StepRole::Bootstrap, &chained)?;

            let activities = self.steps[self.step_index[&id]].activities.clone();
            match resource {
                ResourceType::Ec2 => self.ec2_bootstrap.extend(activities),
                ResourceType::Emr => self.emr_bootstrap.extend(activities),
            }
            previous = Some(id);
        }
        Ok(())
    }

    fn resolve_input(
        &mut self,
        descriptor: &StepDescriptor,
        id: &str,
        role: StepRole,
    ) -> Result<Nodes, CompileError> {
        match (&descriptor.input_node, &descriptor.input_path) {
            (Some(_), Some(_)) => Err(CompileError::input(format!(
                "step '{id}' sets both input_node and input_path"
            ))),
            (Some(InputNodeSpec::Single(name)), None) => Ok(Nodes::Single(self.node(id, name)?)),
            (Some(InputNodeSpec::Renamed(renames)), None) => {
                let mut named = BTreeMap::new();
                for (producer, alias) in renames {
                    named.insert(alias.clone(), self.node(id, producer)?);
                }
                Ok(Nodes::Named(named))
            }
            (None, Some(uri)) => {
                let path = S3Path::from_uri(uri)?;
                let node = components::S3Node::new(format!("{id}InputPath"), &self.schedule, path);
                let node_ref = NodeRef::s3(&node);
                self.graph.add(node)?;
                Ok(Nodes::Single(node_ref))
            }
            (None, None) => match (role, self.last_output.single_s3()) {
                (StepRole::Step, Some(previous)) => {
                    debug!("step '{id}' reads {} implicitly", previous.id);
                    Ok(Nodes::Single(previous.clone()))
                }
                _ => Ok(Nodes::None),
            },
        }
    }

    fn node(&self, step: &str, name: &str) -> Result<NodeRef, CompileError> {
        self.nodes.get(name).cloned().ok_or_else(|| {
            CompileError::reference(format!(
                "step '{step}' reads input_node '{name}' which no earlier step produced"
            ))
        })
    }

    fn expand_step(
        &mut self,
        descriptor: &StepDescriptor,
        id: String,
        role: StepRole,
        extra_deps: &[String],
    ) -> Result<(), CompileError> {
        if self.step_index.contains_key(&id) {
            return Err(CompileError::input(format!("duplicate step id '{id}'")));
        }
        let registry = self.registry;
        let definition = self.definition;
        let entry = registry.resolve(&descriptor.step_type)?;
        let kind: StepKind = entry.kind;

        let (runner, emr_ami_major) = self.runner_for(kind.runner_kind())?;
        if kind.uses_warehouse() && self.warehouse.is_none() {
            let database = RedshiftDatabase::from_config(&self.config.redshift)?;
            self.warehouse = Some(self.graph.add(database)?);
        }

        let input = self.resolve_input(descriptor, &id, role)?;

        let mut depends_on: Vec<String> = vec![];
        let push_dep = |dep: &str, deps: &mut Vec<String>| {
            if dep != id && !deps.iter().any(|d| d == dep) {
                deps.push(dep.to_string());
            }
        };
        for dep in &descriptor.depends_on {
            if !self.step_index.contains_key(dep) {
                return Err(CompileError::reference(format!(
                    "step '{id}' depends on '{dep}' which is not an earlier step"
                )));
            }
            push_dep(dep, &mut depends_on);
        }
        for node in input.refs() {
            if let Some(producer) = self.producers.get(&node.id) {
                push_dep(producer, &mut depends_on);
            }
        }
        for dep in extra_deps {
            push_dep(dep, &mut depends_on);
        }

        let max_retries = descriptor
            .max_retries
            .or(definition.max_retries)
            .unwrap_or(self.config.etl.max_retries);
        let ctx = StepContext {
            id: id.clone(),
            config: self.config,
            pipeline_name: self.pipeline_name,
            frequency: definition.frequency,
            schedule: self.schedule.clone(),
            runner,
            emr_ami_major,
            warehouse: self.warehouse.clone(),
            input: input.clone(),
            max_retries,
            alarm: self.alarm.clone(),
            topic_arn: self.topic_arn.clone(),
            paths: self.paths.for_step(&id),
            qa_log_dir: self.paths.qa.clone(),
            base_dir: &definition.base_dir,
        };

        let mut args = descriptor.clone();
        args.merge_defaults(&entry.defaults);
        let mut output = steps::expand(kind, args.args, &ctx)?;

        let mut upstream: Vec<ObjectId> = depends_on
            .iter()
            .flat_map(|dep| self.steps[self.step_index[dep]].activities.clone())
            .collect();
        if role == StepRole::Step {
            match kind.runner_kind() {
                RunnerKind::Ec2 => upstream.extend(self.ec2_bootstrap.iter().cloned()),
                RunnerKind::Emr => upstream.extend(self.emr_bootstrap.iter().cloned()),
                RunnerKind::NoRunner => {}
            }
        }
        for activity_id in output.activities.clone() {
            if let Some(activity) = output.activity_mut(&activity_id) {
                for dep in &upstream {
                    activity.add_dependency(dep);
                }
            }
        }

        self.graph.extend(std::mem::take(&mut output.objects))?;
        self.register_output(&id, &output.output);
        if role == StepRole::Step {
            self.last_output = output.output.clone();
        }
        self.artifacts.append(&mut output.artifacts);

        debug!(
            "step '{id}' ({kind}) -> {} activities, depends on {:?}",
            output.activities.len(),
            depends_on
        );
        self.step_index.insert(id.clone(), self.steps.len());
        self.steps.push(CompiledStep {
            id,
            kind,
            role,
            activities: output.activities,
            depends_on,
            input,
            output: output.output,
        });
        Ok(())
    }

    fn register_output(&mut self, id: &str, output: &Nodes) {
        match output {
            Nodes::None => {}
            Nodes::Single(node) => {
                self.nodes.insert(id.to_string(), node.clone());
                self.producers.insert(node.id.clone(), id.to_string());
            }
            Nodes::Named(named) => {
                for (name, node) in named {
                    if self.nodes.insert(name.clone(), node.clone()).is_some() {
                        warn!("step '{id}' replaces the registered node '{name}'");
                    }
                    self.producers.insert(node.id.clone(), id.to_string());
                }
            }
        }
    }
}
