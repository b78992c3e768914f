use super::{executors, primary_key_arguments, qa_activity, require_primary_key, QaOptions};
use crate::context::{StepContext, StepOutput};
use crate::error::StepError;
use crate::util::{arg, exactly_one, read_table};
use catalog::{Relation, Table};
use components::{ActivityKind, ShellCommand};
use serde::Deserialize;
use sql::SqlStatement;
use std::path::PathBuf;

/// Start date handed to the dependency poller when none is configured.
pub(crate) const SCHEDULED_START_DATE: &str = "#{format(@scheduledStartTime,'YYYY-MM-dd')}";

fn default_tolerance() -> f64 {
    1.0
}

fn default_sample_size() -> u32 {
    100
}

fn default_refresh_rate() -> u32 {
    300
}

fn count_sql(sql: &str, alias: &str) -> Result<String, StepError> {
    let statement = SqlStatement::new(sql)?;
    Ok(format!("SELECT COUNT(1) FROM ({}) AS {alias}", statement.sql()))
}

/// The host alias must name a configured RDBMS; the executor resolves it.
fn source_host_argument(ctx: &StepContext, host: Option<&str>) -> Result<Option<String>, StepError> {
    match host {
        Some(alias) => {
            ctx.config.mysql_host(alias)?;
            Ok(Some(arg("source_host", alias)))
        }
        None => Ok(None),
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct PrimaryKeyCheckArgs {
    table_definition: PathBuf,
    test_name: Option<String>,
    #[serde(default)]
    log_to_s3: bool,
}

pub(crate) fn primary_key_check(
    args: PrimaryKeyCheckArgs,
    ctx: &StepContext,
) -> Result<StepOutput, StepError> {
    let table = read_table(ctx, &args.table_definition)?;
    require_primary_key(&table, "primary-key-check")?;
    let qa = QaOptions {
        test_name: args.test_name.as_deref(),
        log_to_s3: args.log_to_s3,
    };
    let mut out = StepOutput::default();
    out.add_activity(qa_activity(
        ctx,
        ctx.sub_id(""),
        executors::PRIMARY_KEY_CHECK,
        primary_key_arguments(&table),
        &qa,
    )?);
    Ok(out)
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct CountCheckArgs {
    source_sql: String,
    source_host: Option<String>,
    destination_sql: Option<String>,
    destination_table_definition: Option<PathBuf>,
    #[serde(default = "default_tolerance")]
    tolerance: f64,
    test_name: Option<String>,
    #[serde(default)]
    log_to_s3: bool,
}

/// Compare row counts of a source query and the loaded destination.
pub(crate) fn count_check(args: CountCheckArgs, ctx: &StepContext) -> Result<StepOutput, StepError> {
    exactly_one(&[
        ("destination_sql", args.destination_sql.is_some()),
        (
            "destination_table_definition",
            args.destination_table_definition.is_some(),
        ),
    ])?;
    let destination = match (&args.destination_sql, &args.destination_table_definition) {
        (Some(sql), _) => count_sql(sql, "destination")?,
        (None, Some(path)) => {
            let table = read_table(ctx, path)?;
            format!("SELECT COUNT(1) FROM {}", table.full_name())
        }
        (None, None) => unreachable!("checked by exactly_one"),
    };

    let mut arguments = vec![arg("source_sql", count_sql(&args.source_sql, "source")?)];
    arguments.extend(source_host_argument(ctx, args.source_host.as_deref())?);
    arguments.push(arg("destination_sql", destination));
    arguments.push(arg("tolerance", args.tolerance));

    let qa = QaOptions {
        test_name: args.test_name.as_deref(),
        log_to_s3: args.log_to_s3,
    };
    let mut out = StepOutput::default();
    out.add_activity(qa_activity(ctx, ctx.sub_id(""), executors::COUNT_CHECK, arguments, &qa)?);
    Ok(out)
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ColumnCheckArgs {
    source_sql: String,
    source_host: Option<String>,
    destination_table_definition: PathBuf,
    #[serde(default = "default_sample_size")]
    sample_size: u32,
    #[serde(default = "default_tolerance")]
    tolerance: f64,
    test_name: Option<String>,
    #[serde(default)]
    log_to_s3: bool,
}

fn destination_columns_sql(table: &Table) -> String {
    format!(
        "SELECT {} FROM {}",
        table.column_names().join(", "),
        table.full_name()
    )
}

/// Compare sampled rows column by column, matched on the destination key.
pub(crate) fn column_check(args: ColumnCheckArgs, ctx: &StepContext) -> Result<StepOutput, StepError> {
    let table = read_table(ctx, &args.destination_table_definition)?;
    require_primary_key(&table, "column-check")?;
    let source = SqlStatement::new(&args.source_sql)?;

    let mut arguments = vec![arg("source_sql", source.sql())];
    arguments.extend(source_host_argument(ctx, args.source_host.as_deref())?);
    arguments.push(arg("destination_sql", destination_columns_sql(&table)));
    arguments.push(arg("primary_key", table.primary_keys().join(",")));
    arguments.push(arg("sample_size", args.sample_size));
    arguments.push(arg("tolerance", args.tolerance));

    let qa = QaOptions {
        test_name: args.test_name.as_deref(),
        log_to_s3: args.log_to_s3,
    };
    let mut out = StepOutput::default();
    out.add_activity(qa_activity(ctx, ctx.sub_id(""), executors::COLUMN_CHECK, arguments, &qa)?);
    Ok(out)
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct PipelineDependenciesArgs {
    dependent_pipelines: Vec<String>,
    #[serde(default = "default_refresh_rate")]
    refresh_rate: u32,
    start_date: Option<String>,
    #[serde(default)]
    ignore_failed: bool,
}

/// Poll the orchestrator until the named pipelines finish their run for
/// the same day.
pub(crate) fn pipeline_dependencies(
    args: PipelineDependenciesArgs,
    ctx: &StepContext,
) -> Result<StepOutput, StepError> {
    if args.dependent_pipelines.is_empty() {
        return Err(StepError::input("dependent_pipelines is empty"));
    }
    let mut arguments = vec![
        arg("pipeline_name", ctx.pipeline_name),
        arg("dependencies", args.dependent_pipelines.join(",")),
        arg("refresh_rate", args.refresh_rate),
        arg(
            "start_date",
            args.start_date.as_deref().unwrap_or(SCHEDULED_START_DATE),
        ),
    ];
    arguments.extend(ctx.topic_arn.as_deref().map(|t| arg("sns_topic_arn", t)));
    if args.ignore_failed {
        arguments.push("--ignore_failed".to_string());
    }

    let mut shell = ShellCommand::command(ctx.executor(executors::PIPELINE_DEPENDENCY_CHECK))
        .with_arguments(arguments);
    shell.stage = false;
    let mut out = StepOutput::default();
    out.add_activity(ctx.activity(ctx.sub_id(""), ActivityKind::ShellCommand(shell))?);
    Ok(out)
}
