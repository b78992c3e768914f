use super::sql_runner_activity;
use crate::context::{ArtifactSource, StepContext, StepOutput};
use crate::error::StepError;
use crate::util::{exactly_one, file_name, read_script, read_table, RowSource};
use catalog::{HistoryTable, Relation};
use components::{ActivityKind, SqlCommand};
use log::debug;
use serde::Deserialize;
use sql::SqlScript;
use std::path::PathBuf;

fn yes() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SqlCommandArgs {
    command: Option<String>,
    script: Option<PathBuf>,
    #[serde(default)]
    script_arguments: Vec<String>,
    queue: Option<String>,
    #[serde(default)]
    wrap_transaction: bool,
}

/// SQL run by the orchestrator against the warehouse database. A script
/// file is staged under the step's source prefix.
pub(crate) fn sql_command(args: SqlCommandArgs, ctx: &StepContext) -> Result<StepOutput, StepError> {
    exactly_one(&[("command", args.command.is_some()), ("script", args.script.is_some())])?;
    let mut out = StepOutput::default();

    let mut command = SqlCommand {
        database: ctx.warehouse()?.clone(),
        script: None,
        script_uri: None,
        script_arguments: args.script_arguments,
        queue: args.queue,
    };
    let wrap_transaction = args.wrap_transaction;
    let wrap = |script: SqlScript| {
        if wrap_transaction {
            script.wrap_transaction()
        } else {
            script
        }
    };
    match (args.command, args.script) {
        (Some(sql), _) => {
            command.script = Some(wrap(SqlScript::new(&sql)).sql());
        }
        (None, Some(path)) => {
            let script = wrap(read_script(ctx, &path)?);
            let dest = ctx.paths.src.join_file(file_name(&path)?);
            out.stage(dest.clone(), ArtifactSource::Inline(script.sql()));
            command.script_uri = Some(dest);
        }
        (None, None) => unreachable!("checked by exactly_one"),
    }

    out.add_activity(ctx.activity(ctx.sub_id(""), ActivityKind::Sql(command))?);
    Ok(out)
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct UpsertArgs {
    source: Option<PathBuf>,
    sql: Option<String>,
    destination: PathBuf,
    #[serde(default = "yes")]
    enforce_primary_key: bool,
    #[serde(default)]
    delete_existing: bool,
    history: Option<PathBuf>,
    #[serde(default = "yes")]
    analyze_table: bool,
}

/// Merge the source rows into the destination inside one transaction,
/// optionally folding the result into a history table.
pub(crate) fn upsert(args: UpsertArgs, ctx: &StepContext) -> Result<StepOutput, StepError> {
    let destination = read_table(ctx, &args.destination)?;
    let source = RowSource::resolve(ctx, args.source.as_deref(), args.sql.as_deref())?;

    let mut script = destination.upsert_script(
        source.projection(),
        args.enforce_primary_key,
        args.delete_existing,
    )?;
    if let Some(history) = &args.history {
        let history = HistoryTable::from_table(read_table(ctx, history)?)?;
        debug!(
            "step {} keeps history of {} in {}",
            ctx.id,
            destination.full_name(),
            history.table().full_name()
        );
        script.append(history.update_history_script(&destination)?);
    }

    let mut out = StepOutput::default();
    out.add_activity(sql_runner_activity(
        ctx,
        ctx.sub_id(""),
        &destination,
        &script.wrap_transaction(),
        args.analyze_table,
        false,
    )?);
    Ok(out)
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ReloadArgs {
    source: Option<PathBuf>,
    sql: Option<String>,
    destination: PathBuf,
    #[serde(default = "yes")]
    analyze_table: bool,
}

pub(crate) fn reload(args: ReloadArgs, ctx: &StepContext) -> Result<StepOutput, StepError> {
    let destination = read_table(ctx, &args.destination)?;
    let source = RowSource::resolve(ctx, args.source.as_deref(), args.sql.as_deref())?;
    let script = destination.reload_script(source.projection())?;

    let mut out = StepOutput::default();
    out.add_activity(sql_runner_activity(
        ctx,
        ctx.sub_id(""),
        &destination,
        &script.wrap_transaction(),
        args.analyze_table,
        false,
    )?);
    Ok(out)
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct CreateUpdateSqlArgs {
    table_definition: PathBuf,
    script: Option<PathBuf>,
    command: Option<String>,
    #[serde(default = "yes")]
    analyze_table: bool,
    #[serde(default)]
    non_transactional: bool,
}

/// Create the table when missing and run arbitrary SQL that refreshes it.
pub(crate) fn create_update_sql(
    args: CreateUpdateSqlArgs,
    ctx: &StepContext,
) -> Result<StepOutput, StepError> {
    exactly_one(&[("script", args.script.is_some()), ("command", args.command.is_some())])?;
    let table = read_table(ctx, &args.table_definition)?;
    let script = match (&args.script, &args.command) {
        (Some(path), _) => read_script(ctx, path)?,
        (None, Some(sql)) => SqlScript::new(sql),
        (None, None) => unreachable!("checked by exactly_one"),
    };
    if script.is_empty() {
        return Err(StepError::input("the update SQL has no statements"));
    }

    let mut out = StepOutput::default();
    out.add_activity(sql_runner_activity(
        ctx,
        ctx.sub_id(""),
        &table,
        &script,
        args.analyze_table,
        args.non_transactional,
    )?);
    Ok(out)
}
