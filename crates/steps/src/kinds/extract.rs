use super::copy_command_options;
use crate::context::{ArtifactSource, NodeRef, Nodes, StepContext, StepOutput};
use crate::error::StepError;
use crate::util::{exactly_one, file_name};
use catalog::SelectStatement;
use common::types::S3Path;
use components::{
    ActivityKind, JdbcDatabase, RedshiftNode, ShellCommand, SqlDataNode,
};
use serde::Deserialize;
use sql::SqlStatement;
use std::path::PathBuf;

/// Rewrites literal `\n` markers to NULL and strips NUL bytes.
const RDBMS_CLEANUP: &str =
    r"cat ${INPUT1_STAGING_DIR}/* | sed 's/\\n/NULL/g' | tr -d '\000' > ${OUTPUT1_STAGING_DIR}/part-00000.tsv";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ExtractLocalArgs {
    path: PathBuf,
}

pub(crate) fn extract_local(args: ExtractLocalArgs, ctx: &StepContext) -> Result<StepOutput, StepError> {
    if !ctx.frequency.is_one_time() {
        return Err(StepError::input(format!(
            "extract-local is only allowed in one-time pipelines, this one runs {}",
            ctx.frequency
        )));
    }
    let local = ctx.resolve(&args.path);
    if !local.is_file() {
        return Err(StepError::input(format!("local file '{}' does not exist", local.display())));
    }
    let dest = ctx.paths.src.join_file(file_name(&local)?);

    let mut out = StepOutput::default();
    let node = out.add_s3_node(ctx.s3_node(ctx.sub_id("Output"), dest.clone()));
    out.stage(dest, ArtifactSource::File(local));
    out.output = Nodes::Single(node);
    Ok(out)
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ExtractS3Args {
    file_uri: Option<String>,
    directory_uri: Option<String>,
}

pub(crate) fn extract_s3(args: ExtractS3Args, ctx: &StepContext) -> Result<StepOutput, StepError> {
    exactly_one(&[
        ("file_uri", args.file_uri.is_some()),
        ("directory_uri", args.directory_uri.is_some()),
    ])?;
    let path = match (args.file_uri, args.directory_uri) {
        (Some(uri), _) => {
            let parsed = S3Path::from_uri(&uri)?;
            if parsed.is_directory {
                return Err(StepError::input(format!("file_uri '{uri}' names a directory")));
            }
            parsed
        }
        (None, Some(uri)) => {
            let parsed = S3Path::from_uri(&uri)?;
            S3Path::directory(parsed.bucket, parsed.key)
        }
        (None, None) => unreachable!("checked by exactly_one"),
    };
    let mut out = StepOutput::default();
    let node = out.add_s3_node(ctx.s3_node(ctx.sub_id("Output"), path));
    out.output = Nodes::Single(node);
    Ok(out)
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum RdbmsFlavor {
    Mysql,
    Postgres,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ExtractRdbmsArgs {
    host_name: String,
    database: Option<String>,
    sql: Option<String>,
    table: Option<String>,
}

/// Query an RDBMS into a scratch file, then clean it into the step output.
pub(crate) fn extract_rdbms(
    args: ExtractRdbmsArgs,
    flavor: RdbmsFlavor,
    ctx: &StepContext,
) -> Result<StepOutput, StepError> {
    exactly_one(&[("sql", args.sql.is_some()), ("table", args.table.is_some())])?;
    let host = match flavor {
        RdbmsFlavor::Mysql => ctx.config.mysql_host(&args.host_name)?,
        RdbmsFlavor::Postgres => ctx.config.postgres_host(&args.host_name)?,
    };
    let database_name = args
        .database
        .as_deref()
        .or(host.database.as_deref())
        .ok_or_else(|| {
            StepError::input(format!(
                "no database given for host '{}' in the step or the config",
                args.host_name
            ))
        })?;

    let (table, query) = match (args.table, args.sql) {
        (Some(table), _) => {
            let query = format!("SELECT * FROM {table}");
            (table, query)
        }
        (None, Some(sql)) => {
            let statement = SqlStatement::new(&sql)?;
            let select = SelectStatement::new(statement.sql())?;
            let table = select.dependencies().first().cloned().ok_or_else(|| {
                StepError::input("the extract query does not read from any table")
            })?;
            (table, statement.sql().to_string())
        }
        (None, None) => unreachable!("checked by exactly_one"),
    };

    let mut out = StepOutput::default();
    let database_id = ctx.sub_id("Database");
    let database = match flavor {
        RdbmsFlavor::Mysql => JdbcDatabase::mysql(database_id.clone(), host, database_name),
        RdbmsFlavor::Postgres => JdbcDatabase::postgres(database_id.clone(), host, database_name),
    };
    out.add_object(database);

    let sql_node_id = ctx.sub_id("SqlNode");
    out.add_object(SqlDataNode {
        id: sql_node_id.clone(),
        schedule: ctx.schedule.clone(),
        database: database_id,
        table,
        select_query: query,
    });
    let raw = out.add_s3_node(ctx.s3_node(
        ctx.sub_id("Intermediate"),
        ctx.paths.data.join_dir("intermediate"),
    ));
    let output = out.add_s3_node(ctx.s3_node(ctx.sub_id("Output"), ctx.paths.data.join_dir("output")));

    let copy = ctx
        .activity(ctx.sub_id("Copy"), ActivityKind::Copy)?
        .with_inputs([sql_node_id])
        .with_output(raw.id.clone());
    let copy_id = out.add_activity(copy);

    let mut clean = ctx
        .activity(
            ctx.sub_id(""),
            ActivityKind::ShellCommand(ShellCommand::command(RDBMS_CLEANUP)),
        )?
        .with_inputs([raw.id])
        .with_output(output.id.clone());
    clean.add_dependency(&copy_id);
    out.add_activity(clean);

    out.output = Nodes::Single(output);
    Ok(out)
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ExtractRedshiftArgs {
    schema: String,
    table: String,
}

/// Unload a warehouse table into the step's output directory.
pub(crate) fn extract_redshift(
    args: ExtractRedshiftArgs,
    ctx: &StepContext,
) -> Result<StepOutput, StepError> {
    let mut out = StepOutput::default();
    let table = RedshiftNode::new(
        ctx.sub_id("Table"),
        &ctx.schedule,
        ctx.warehouse()?,
        &format!("{}.{}", args.schema, args.table),
    );
    let table_ref = NodeRef::warehouse(&table.id);
    out.add_object(table);
    let output = out.add_s3_node(ctx.s3_node(ctx.sub_id("Output"), ctx.paths.data.join_dir("output")));

    let unload = ctx
        .activity(
            ctx.sub_id(""),
            ActivityKind::RedshiftCopy {
                insert_mode: "OVERWRITE_EXISTING".to_string(),
                command_options: copy_command_options(None, None, false, true),
            },
        )?
        .with_inputs([table_ref.id])
        .with_output(output.id.clone());
    out.add_activity(unload);
    out.output = Nodes::Single(output);
    Ok(out)
}
