use crate::activate::{activate, ActivationReport};
use crate::compiler::PipelineCompiler;
use crate::definition::PipelineDefinition;
use crate::pipeline::CompiledPipeline;
use common::config::DuctConfig;
use common::error::DuctError;
use log::info;
use shared_clients::{ObjectStore, RetryPolicy};
use std::path::Path;

pub fn compile_file(path: &Path, config: &DuctConfig) -> Result<CompiledPipeline, DuctError> {
    let definition = PipelineDefinition::from_file(path).map_err(DuctError::compile)?;
    PipelineCompiler::new(config)
        .map_err(DuctError::init)?
        .compile(definition)
        .map_err(DuctError::compile)
}

/// Compile and order the activity graph, returning the execution order.
pub fn validate_file(path: &Path, config: &DuctConfig) -> Result<Vec<String>, DuctError> {
    let pipeline = compile_file(path, config)?;
    let dag = pipeline.activity_dag().map_err(DuctError::compile)?;
    let order: Vec<String> = dag
        .toposort()
        .map_err(DuctError::compile)?
        .into_iter()
        .map(|node| node.id.to_string())
        .collect();
    info!(
        "pipeline '{}' is valid: {} steps, {} activities",
        pipeline.name,
        pipeline.steps.len(),
        order.len()
    );
    Ok(order)
}

/// DOT rendering of the activity graph, also written to `output` when given.
pub fn visualize_file(
    path: &Path,
    config: &DuctConfig,
    output: Option<&Path>,
) -> Result<String, DuctError> {
    let pipeline = compile_file(path, config)?;
    let dag = pipeline.activity_dag().map_err(DuctError::compile)?;
    if let Some(output) = output {
        dag.export_dot_to(output).map_err(DuctError::compile)?;
        info!("wrote {}", output.display());
    }
    Ok(dag.to_dot_string())
}

pub fn activate_file(
    path: &Path,
    config: &DuctConfig,
    store: &mut dyn ObjectStore,
    policy: &RetryPolicy,
) -> Result<ActivationReport, DuctError> {
    let pipeline = compile_file(path, config)?;
    activate(&pipeline, store, policy).map_err(DuctError::activate)
}
