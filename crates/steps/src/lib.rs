//! Step library: every `step_type` a pipeline definition may use, and the
//! expansion of one step into workflow objects.

pub mod context;
pub mod descriptor;
pub mod error;
pub mod kind;
mod kinds;
pub mod templates;
mod util;

pub use context::{Artifact, ArtifactSource, NodeRef, Nodes, StepContext, StepOutput, StepPaths};
pub use descriptor::{InputNodeSpec, StepDescriptor};
pub use error::StepError;
pub use kind::{RegisteredStep, RunnerKind, StepKind, StepRegistry};
pub use kinds::executors;

use kinds::extract::RdbmsFlavor;
use kinds::{composite, emr, extract, load, qa, sql, transform};
use log::debug;
use serde_yaml::Mapping;
use util::parse_args;

/// Expand one step. `args` holds the step-specific keys of its descriptor
/// with any custom-step defaults already merged in.
pub fn expand(kind: StepKind, args: Mapping, ctx: &StepContext) -> Result<StepOutput, StepError> {
    debug!("expanding step {} ({kind})", ctx.id);
    dispatch(kind, args, ctx).map_err(|e| e.in_step(&ctx.id))
}

fn dispatch(kind: StepKind, args: Mapping, ctx: &StepContext) -> Result<StepOutput, StepError> {
    match kind {
        StepKind::ExtractLocal => extract::extract_local(parse_args(args)?, ctx),
        StepKind::ExtractS3 => extract::extract_s3(parse_args(args)?, ctx),
        StepKind::ExtractRds => extract::extract_rdbms(parse_args(args)?, RdbmsFlavor::Mysql, ctx),
        StepKind::ExtractPostgres => {
            extract::extract_rdbms(parse_args(args)?, RdbmsFlavor::Postgres, ctx)
        }
        StepKind::ExtractRedshift => extract::extract_redshift(parse_args(args)?, ctx),
        StepKind::Transform => transform::transform(parse_args(args)?, ctx),
        StepKind::EmrStreaming => emr::emr_streaming(parse_args(args)?, ctx),
        StepKind::EmrStep => emr::emr_step(parse_args(args)?, ctx),
        StepKind::SqlCommand => sql::sql_command(parse_args(args)?, ctx),
        StepKind::LoadRedshift => load::load_redshift(parse_args(args)?, ctx),
        StepKind::CreateLoadRedshift => load::create_load_redshift(parse_args(args)?, ctx),
        StepKind::Upsert => sql::upsert(parse_args(args)?, ctx),
        StepKind::Reload => sql::reload(parse_args(args)?, ctx),
        StepKind::CreateUpdateSql => sql::create_update_sql(parse_args(args)?, ctx),
        StepKind::PrimaryKeyCheck => qa::primary_key_check(parse_args(args)?, ctx),
        StepKind::CountCheck => qa::count_check(parse_args(args)?, ctx),
        StepKind::ColumnCheck => qa::column_check(parse_args(args)?, ctx),
        StepKind::PipelineDependencies => qa::pipeline_dependencies(parse_args(args)?, ctx),
        StepKind::LoadReloadPk => composite::load_reload_pk(parse_args(args)?, ctx),
        StepKind::SafeCreateLoad => composite::safe_create_load(parse_args(args)?, ctx),
    }
}
