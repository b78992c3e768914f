use super::{copy_command_options, create_load_activity, LoaderOptions};
use crate::context::{NodeRef, Nodes, StepContext, StepOutput};
use crate::error::StepError;
use crate::util::read_table;
use catalog::Relation;
use components::{ActivityKind, RedshiftNode};
use log::debug;
use serde::Deserialize;
use std::path::PathBuf;

pub(crate) const INSERT_MODES: [&str; 4] = ["KEEP_EXISTING", "OVERWRITE_EXISTING", "TRUNCATE", "APPEND"];

fn default_insert_mode() -> String {
    "TRUNCATE".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct LoadRedshiftArgs {
    schema: String,
    table: String,
    #[serde(default = "default_insert_mode")]
    insert_mode: String,
    max_errors: Option<u32>,
    replace_invalid_char: Option<String>,
    #[serde(default)]
    gzip: bool,
}

/// Copy the step's object-store input into a warehouse table.
pub(crate) fn load_redshift(args: LoadRedshiftArgs, ctx: &StepContext) -> Result<StepOutput, StepError> {
    let insert_mode = args.insert_mode.to_ascii_uppercase();
    if !INSERT_MODES.contains(&insert_mode.as_str()) {
        return Err(StepError::input(format!(
            "insert_mode '{}' is not one of {}",
            args.insert_mode,
            INSERT_MODES.join(", ")
        )));
    }
    let input = ctx.require_s3_input()?.clone();

    let mut out = StepOutput::default();
    let table = RedshiftNode::new(
        ctx.sub_id("Table"),
        &ctx.schedule,
        ctx.warehouse()?,
        &format!("{}.{}", args.schema, args.table),
    );
    let table_ref = NodeRef::warehouse(&table.id);
    out.add_object(table);

    let copy = ctx
        .activity(
            ctx.sub_id(""),
            ActivityKind::RedshiftCopy {
                insert_mode,
                command_options: copy_command_options(
                    args.max_errors,
                    args.replace_invalid_char.as_deref(),
                    args.gzip,
                    false,
                ),
            },
        )?
        .with_inputs([input.id])
        .with_output(table_ref.id.clone());
    out.add_activity(copy);
    out.output = Nodes::Single(table_ref);
    Ok(out)
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct CreateLoadRedshiftArgs {
    table_definition: PathBuf,
    max_error: Option<u32>,
    replace_invalid_char: Option<String>,
    #[serde(default)]
    no_escape: bool,
    #[serde(default)]
    gzip: bool,
    command_options: Option<String>,
}

/// Create the table when missing, then load the input into it.
pub(crate) fn create_load_redshift(
    args: CreateLoadRedshiftArgs,
    ctx: &StepContext,
) -> Result<StepOutput, StepError> {
    let table = read_table(ctx, &args.table_definition)?;
    let input = ctx.require_s3_input()?;
    debug!("step {} loads {}", ctx.id, table.full_name());

    let options = LoaderOptions {
        max_error: args.max_error,
        replace_invalid_char: args.replace_invalid_char.as_deref(),
        no_escape: args.no_escape,
        gzip: args.gzip,
        command_options: args.command_options.as_deref(),
    };
    let mut out = StepOutput::default();
    out.add_activity(create_load_activity(ctx, ctx.sub_id(""), &table, input, &options)?);
    Ok(out)
}
