use crate::definition::PipelineDefinition;
use crate::error::CompileError;
use crate::pipeline::CompiledPipeline;
use common::config::components::runtime::HooksConfig;
use log::debug;
use std::fmt::{Debug, Formatter};

pub type BeforeCompile =
    Box<dyn Fn(PipelineDefinition) -> Result<PipelineDefinition, CompileError> + Send + Sync>;
pub type AfterCompile =
    Box<dyn Fn(CompiledPipeline) -> Result<CompiledPipeline, CompileError> + Send + Sync>;

/// Callbacks around compilation, registered at start-up by name. The
/// `hooks.enabled` config list selects which of them run.
#[derive(Default)]
pub struct Hooks {
    before: Vec<(String, BeforeCompile)>,
    after: Vec<(String, AfterCompile)>,
}

impl Debug for Hooks {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("before", &self.before.iter().map(|(n, _)| n).collect::<Vec<_>>())
            .field("after", &self.after.iter().map(|(n, _)| n).collect::<Vec<_>>())
            .finish()
    }
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn before_compile<F>(mut self, name: impl Into<String>, hook: F) -> Self
    where
        F: Fn(PipelineDefinition) -> Result<PipelineDefinition, CompileError> + Send + Sync + 'static,
    {
        self.before.push((name.into(), Box::new(hook)));
        self
    }

    pub fn after_compile<F>(mut self, name: impl Into<String>, hook: F) -> Self
    where
        F: Fn(CompiledPipeline) -> Result<CompiledPipeline, CompileError> + Send + Sync + 'static,
    {
        self.after.push((name.into(), Box::new(hook)));
        self
    }

    pub fn run_before(
        &self,
        mut definition: PipelineDefinition,
        config: &HooksConfig,
    ) -> Result<PipelineDefinition, CompileError> {
        for (name, hook) in &self.before {
            if config.is_enabled(name) {
                debug!("running before_compile hook '{name}'");
                definition = hook(definition)?;
            }
        }
        Ok(definition)
    }

    pub fn run_after(
        &self,
        mut pipeline: CompiledPipeline,
        config: &HooksConfig,
    ) -> Result<CompiledPipeline, CompileError> {
        for (name, hook) in &self.after {
            if config.is_enabled(name) {
                debug!("running after_compile hook '{name}'");
                pipeline = hook(pipeline)?;
            }
        }
        Ok(pipeline)
    }
}
