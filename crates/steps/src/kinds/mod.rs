pub(crate) mod composite;
pub(crate) mod emr;
pub(crate) mod extract;
pub(crate) mod load;
pub(crate) mod qa;
pub(crate) mod sql;
pub(crate) mod transform;

use crate::context::{NodeRef, StepContext};
use crate::error::StepError;
use crate::util::{arg, one_line};
use catalog::{Relation, Table};
use components::{Activity, ActivityKind, ObjectId, ShellCommand};
use ::sql::SqlScript;

/// Executables installed on the worker machines.
pub mod executors {
    pub const CREATE_LOAD_REDSHIFT: &str = "create_load_redshift.sh";
    pub const SQL_RUNNER: &str = "sql_runner.sh";
    pub const PRIMARY_KEY_CHECK: &str = "primary_key_check.sh";
    pub const COUNT_CHECK: &str = "count_check.sh";
    pub const COLUMN_CHECK: &str = "column_check.sh";
    pub const PIPELINE_DEPENDENCY_CHECK: &str = "pipeline_dependency_check.sh";
}

pub(crate) const COPY_DELIMITER: &str = "DELIMITER '\\t'";
pub(crate) const COPY_ESCAPE: &str = "ESCAPE";
pub(crate) const COPY_TRUNCATE_COLUMNS: &str = "TRUNCATECOLUMNS";
pub(crate) const COPY_NULL_AS: &str = "NULL AS 'NULL'";

/// Warehouse COPY options; unloads leave out `TRUNCATECOLUMNS`.
pub(crate) fn copy_command_options(
    max_error: Option<u32>,
    replace_invalid_char: Option<&str>,
    gzip: bool,
    unload: bool,
) -> Vec<String> {
    let mut options = vec![COPY_DELIMITER.to_string(), COPY_ESCAPE.to_string()];
    if !unload {
        options.push(COPY_TRUNCATE_COLUMNS.to_string());
    }
    options.push(COPY_NULL_AS.to_string());
    if let Some(n) = max_error {
        options.push(format!("MAXERROR {n}"));
    }
    if let Some(c) = replace_invalid_char {
        options.push(format!("ACCEPTINVCHARS AS '{c}'"));
    }
    if gzip {
        options.push("GZIP".to_string());
    }
    options
}

pub(crate) fn require_primary_key(table: &Table, purpose: &str) -> Result<(), StepError> {
    if table.primary_keys().is_empty() {
        return Err(StepError::structure(format!(
            "{purpose} needs a primary key but '{}' has none",
            table.full_name()
        )));
    }
    Ok(())
}

/// Options handed to the warehouse loader executor.
#[derive(Debug, Default)]
pub(crate) struct LoaderOptions<'a> {
    pub max_error: Option<u32>,
    pub replace_invalid_char: Option<&'a str>,
    pub no_escape: bool,
    pub gzip: bool,
    pub command_options: Option<&'a str>,
}

pub(crate) fn create_load_activity(
    ctx: &StepContext,
    id: ObjectId,
    table: &Table,
    input: &NodeRef,
    options: &LoaderOptions,
) -> Result<Activity, StepError> {
    let source = input
        .path
        .as_ref()
        .ok_or_else(|| StepError::input("the loader reads from an object-store node"))?;
    let mut arguments = vec![
        arg("table_definition", table.statement()),
        arg("s3_input_paths", source),
    ];
    arguments.extend(options.max_error.map(|n| arg("max_error", n)));
    arguments.extend(options.replace_invalid_char.map(|c| arg("replace_invalid_char", c)));
    if options.no_escape {
        arguments.push("--no_escape".to_string());
    }
    if options.gzip {
        arguments.push("--gzip".to_string());
    }
    arguments.extend(options.command_options.map(|o| arg("command_options", o)));

    let mut shell = ShellCommand::command(ctx.executor(executors::CREATE_LOAD_REDSHIFT))
        .with_arguments(arguments);
    shell.stage = false;
    Ok(ctx
        .activity(id, ActivityKind::ShellCommand(shell))?
        .with_inputs([input.id.clone()]))
}

pub(crate) fn sql_runner_activity(
    ctx: &StepContext,
    id: ObjectId,
    table: &Table,
    script: &SqlScript,
    analyze: bool,
    non_transactional: bool,
) -> Result<Activity, StepError> {
    let mut arguments = vec![
        arg("table_definition", table.statement()),
        arg("sql", one_line(script)),
    ];
    if analyze {
        arguments.push("--analyze".to_string());
    }
    if non_transactional {
        arguments.push("--non_transactional".to_string());
    }
    let mut shell =
        ShellCommand::command(ctx.executor(executors::SQL_RUNNER)).with_arguments(arguments);
    shell.stage = false;
    ctx.activity(id, ActivityKind::ShellCommand(shell))
}

/// Settings shared by the QA check steps.
#[derive(Debug, Default)]
pub(crate) struct QaOptions<'a> {
    pub test_name: Option<&'a str>,
    pub log_to_s3: bool,
}

/// Shell activity running a QA executor. The test name, alarm topic and
/// record location follow the check-specific arguments.
pub(crate) fn qa_activity(
    ctx: &StepContext,
    id: ObjectId,
    executor: &str,
    mut arguments: Vec<String>,
    qa: &QaOptions,
) -> Result<Activity, StepError> {
    arguments.push(arg("test_name", qa.test_name.unwrap_or(&ctx.id)));
    arguments.extend(ctx.topic_arn.as_deref().map(|t| arg("sns_topic_arn", t)));
    if qa.log_to_s3 {
        arguments.push("--log_to_s3".to_string());
        arguments.push(arg("s3_log_dir", &ctx.qa_log_dir));
    }
    let mut shell = ShellCommand::command(ctx.executor(executor)).with_arguments(arguments);
    shell.stage = false;
    ctx.activity(id, ActivityKind::ShellCommand(shell))
}

pub(crate) fn primary_key_arguments(table: &Table) -> Vec<String> {
    vec![
        arg("table", table.statement()),
        arg("primary_key", table.primary_keys().join(",")),
    ]
}
