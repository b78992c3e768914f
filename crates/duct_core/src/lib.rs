//! Pipeline compiler: reads a pipeline definition, expands its steps into a
//! workflow graph and stages the result in the object store.

pub mod activate;
pub mod compiler;
pub mod definition;
pub mod error;
pub mod functions;
pub mod hooks;
pub mod pipeline;

pub use activate::{activate, ActivationReport};
pub use compiler::schedule::{PipelinePaths, RUN_PLACEHOLDER, START_FORMAT};
pub use compiler::PipelineCompiler;
pub use definition::{BootstrapSteps, LoadTime, PipelineDefinition};
pub use error::{ActivateError, CompileError};
pub use hooks::Hooks;
pub use pipeline::{CompiledPipeline, CompiledStep, StepRole};
