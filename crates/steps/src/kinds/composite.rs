use super::{
    create_load_activity, executors, primary_key_arguments, qa_activity, require_primary_key,
    sql_runner_activity, LoaderOptions, QaOptions,
};
use crate::context::{StepContext, StepOutput};
use crate::error::StepError;
use crate::util::read_table;
use catalog::Relation;
use components::Activity;
use serde::Deserialize;
use std::path::PathBuf;

fn yes() -> bool {
    true
}

/// Add each activity after the previous one.
fn chain(out: &mut StepOutput, activities: Vec<Activity>) {
    let mut previous = None;
    for mut activity in activities {
        if let Some(prev) = &previous {
            activity.add_dependency(prev);
        }
        previous = Some(out.add_activity(activity));
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct LoadReloadPkArgs {
    staging_table_definition: PathBuf,
    production_table_definition: PathBuf,
    max_error: Option<u32>,
    replace_invalid_char: Option<String>,
    #[serde(default)]
    no_escape: bool,
    #[serde(default)]
    gzip: bool,
    command_options: Option<String>,
    #[serde(default = "yes")]
    analyze_table: bool,
    test_name: Option<String>,
    #[serde(default)]
    log_to_s3: bool,
}

/// Load into staging, reload production from it, then check production's
/// primary key.
pub(crate) fn load_reload_pk(args: LoadReloadPkArgs, ctx: &StepContext) -> Result<StepOutput, StepError> {
    let staging = read_table(ctx, &args.staging_table_definition)?;
    let production = read_table(ctx, &args.production_table_definition)?;
    require_primary_key(&production, "load-reload-pk")?;
    let input = ctx.require_s3_input()?;

    let options = LoaderOptions {
        max_error: args.max_error,
        replace_invalid_char: args.replace_invalid_char.as_deref(),
        no_escape: args.no_escape,
        gzip: args.gzip,
        command_options: args.command_options.as_deref(),
    };
    let load = create_load_activity(ctx, ctx.sub_id("Load"), &staging, input, &options)?;
    let reload = sql_runner_activity(
        ctx,
        ctx.sub_id("Reload"),
        &production,
        &production.reload_script(&staging)?.wrap_transaction(),
        args.analyze_table,
        false,
    )?;
    let qa = QaOptions {
        test_name: args.test_name.as_deref(),
        log_to_s3: args.log_to_s3,
    };
    let check = qa_activity(
        ctx,
        ctx.sub_id("PrimaryKeyCheck"),
        executors::PRIMARY_KEY_CHECK,
        primary_key_arguments(&production),
        &qa,
    )?;

    let mut out = StepOutput::default();
    chain(&mut out, vec![load, reload, check]);
    Ok(out)
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SafeCreateLoadArgs {
    table_definition: PathBuf,
    max_error: Option<u32>,
    replace_invalid_char: Option<String>,
    #[serde(default)]
    no_escape: bool,
    #[serde(default)]
    gzip: bool,
    command_options: Option<String>,
    #[serde(default = "yes")]
    analyze_table: bool,
}

/// Rebuild a staging copy of the table, load it, then swap its rows into
/// the destination and drop it. A failed load leaves the destination
/// untouched.
pub(crate) fn safe_create_load(
    args: SafeCreateLoadArgs,
    ctx: &StepContext,
) -> Result<StepOutput, StepError> {
    let destination = read_table(ctx, &args.table_definition)?;
    require_primary_key(&destination, "safe-create-load")?;
    let staging = destination.renamed(&format!("{}_staging", destination.full_name()))?;
    let input = ctx.require_s3_input()?;
    let permissions = &ctx.config.database.permissions;

    let create = sql_runner_activity(
        ctx,
        ctx.sub_id("CreateStaging"),
        &staging,
        &staging.recreate_script(permissions),
        false,
        false,
    )?;
    let options = LoaderOptions {
        max_error: args.max_error,
        replace_invalid_char: args.replace_invalid_char.as_deref(),
        no_escape: args.no_escape,
        gzip: args.gzip,
        command_options: args.command_options.as_deref(),
    };
    let load = create_load_activity(ctx, ctx.sub_id("Load"), &staging, input, &options)?;

    let mut swap_script = destination.reload_script(&staging)?;
    swap_script.append(staging.drop_script());
    let swap = sql_runner_activity(
        ctx,
        ctx.sub_id("Swap"),
        &destination,
        &swap_script.wrap_transaction(),
        args.analyze_table,
        false,
    )?;

    let mut out = StepOutput::default();
    chain(&mut out, vec![create, load, swap]);
    Ok(out)
}
