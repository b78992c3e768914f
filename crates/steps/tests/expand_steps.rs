use common::config::DuctConfig;
use common::types::{Frequency, S3Path};
use components::{Activity, ActivityKind, ObjectId, Runner, ShellCommand, WorkflowObject};
use pretty_assertions::assert_eq;
use serde_yaml::Mapping;
use steps::{
    expand, ArtifactSource, NodeRef, Nodes, StepContext, StepError, StepKind, StepOutput, StepPaths,
};
use tempfile::TempDir;
use test_utils::{fixture_dir, SAMPLE_CONFIG};

const CUSTOMERS: &str = "CREATE TABLE analytics.customers (
    id INTEGER PRIMARY KEY,
    name VARCHAR(200),
    city VARCHAR(100)
);";

const CUSTOMERS_STAGING: &str = "CREATE TABLE staging.customers (
    id INTEGER,
    name VARCHAR(200),
    city VARCHAR(100)
);";

struct Fixture {
    config: DuctConfig,
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = fixture_dir(&[
            ("tables/customers.sql", CUSTOMERS),
            ("tables/customers_staging.sql", CUSTOMERS_STAGING),
            ("data/customers.tsv", "1\tann\tleeds\n"),
            ("scripts/tools/run.py", "print('hi')\n"),
            ("scripts/tools/helper.py", "\n"),
            ("mapper.py", "\n"),
            ("reducer.py", "\n"),
        ]);
        Self {
            config: DuctConfig::from_yaml_str(SAMPLE_CONFIG).unwrap(),
            dir,
        }
    }

    fn context(&self, id: &str) -> StepContext<'_> {
        let version = S3Path::directory("etl-bucket", "dev/etl")
            .join_dir("PIPE")
            .join_dir("demo")
            .join_dir("version_20260101000000")
            .join_dir(id);
        let section = |name: &str| S3Path::directory("etl-bucket", version.key.replace("PIPE", name));
        StepContext {
            id: id.to_string(),
            config: &self.config,
            pipeline_name: "demo",
            frequency: Frequency::OneTime,
            schedule: ObjectId::new("DefaultSchedule"),
            runner: Some(Runner::Resource(ObjectId::new("Ec2Resource"))),
            emr_ami_major: Some(3),
            warehouse: Some(ObjectId::new("RedshiftDatabase")),
            input: Nodes::None,
            max_retries: 1,
            alarm: Some(ObjectId::new("FailureAlarm")),
            topic_arn: Some("arn:aws:sns:us-east-1:000000000000:etl-failures".to_string()),
            paths: StepPaths {
                src: section("src"),
                data: section("data"),
                logs: section("logs"),
            },
            qa_log_dir: S3Path::directory("etl-bucket", "dev/etl/qa/demo"),
            base_dir: self.dir.path(),
        }
    }
}

fn s3_input(id: &str) -> Nodes {
    Nodes::Single(NodeRef {
        id: ObjectId::new(id),
        path: Some(S3Path::directory("etl-bucket", "dev/etl/data/demo/in")),
    })
}

fn args(yaml: &str) -> Mapping {
    serde_yaml::from_str(yaml).unwrap()
}

fn activities(out: &StepOutput) -> Vec<&Activity> {
    out.objects.iter().filter_map(WorkflowObject::as_activity).collect()
}

fn shell(activity: &Activity) -> &ShellCommand {
    match &activity.kind {
        ActivityKind::ShellCommand(shell) => shell,
        other => panic!("expected a shell command, got {other:?}"),
    }
}

fn ids(values: &[&str]) -> Vec<ObjectId> {
    values.iter().map(|v| ObjectId::new(*v)).collect()
}

#[test]
fn extract_local_stages_the_file() {
    let fx = Fixture::new();
    let out = expand(
        StepKind::ExtractLocal,
        args("path: data/customers.tsv"),
        &fx.context("ExtractLocalStep0"),
    )
    .unwrap();

    assert!(out.activities.is_empty());
    let node = out.output.single_s3().unwrap();
    assert_eq!(node.id, ObjectId::new("ExtractLocalStep0Output"));
    let dest = node.path.clone().unwrap();
    assert_eq!(
        dest.uri(),
        "s3://etl-bucket/dev/etl/src/demo/version_20260101000000/ExtractLocalStep0/customers.tsv"
    );
    assert_eq!(out.artifacts.len(), 1);
    assert_eq!(out.artifacts[0].dest, dest);
    assert!(matches!(out.artifacts[0].source, ArtifactSource::File(_)));
}

#[test]
fn extract_local_needs_a_one_time_pipeline() {
    let fx = Fixture::new();
    let mut ctx = fx.context("ExtractLocalStep0");
    ctx.frequency = Frequency::Daily;
    let err = expand(StepKind::ExtractLocal, args("path: data/customers.tsv"), &ctx).unwrap_err();
    assert!(matches!(err, StepError::Input { .. }));
    assert!(err.to_string().contains("step 'ExtractLocalStep0'"));
}

#[test]
fn unknown_arguments_are_rejected() {
    let fx = Fixture::new();
    let err = expand(
        StepKind::ExtractS3,
        args("file_uri: s3://b/k.tsv\nfile_url: s3://b/x"),
        &fx.context("ExtractS3Step0"),
    )
    .unwrap_err();
    assert!(err.to_string().contains("file_url"));
}

#[test]
fn extract_rds_copies_then_cleans() {
    let fx = Fixture::new();
    let out = expand(
        StepKind::ExtractRds,
        args("host_name: orders_db\ndatabase: orders\nsql: SELECT id, total FROM orders.order_lines WHERE total > 0;"),
        &fx.context("ExtractRdsStep0"),
    )
    .unwrap();

    let acts = activities(&out);
    assert_eq!(acts.len(), 2);
    assert_eq!(acts[0].id, ObjectId::new("ExtractRdsStep0Copy"));
    assert_eq!(acts[0].kind, ActivityKind::Copy);
    assert_eq!(acts[0].inputs, ids(&["ExtractRdsStep0SqlNode"]));
    assert_eq!(acts[1].id, ObjectId::new("ExtractRdsStep0"));
    assert_eq!(acts[1].depends_on(), ids(&["ExtractRdsStep0Copy"]).as_slice());
    assert!(shell(acts[1]).command.as_deref().unwrap().contains("tr -d '\\000'"));

    let sql_node = out
        .objects
        .iter()
        .find_map(|o| match o {
            WorkflowObject::SqlDataNode(node) => Some(node),
            _ => None,
        })
        .unwrap();
    assert_eq!(sql_node.table, "orders.order_lines");
    assert_eq!(out.output.ids(), ids(&["ExtractRdsStep0Output"]));
}

#[test]
fn load_redshift_copies_into_the_table() {
    let fx = Fixture::new();
    let mut ctx = fx.context("LoadRedshiftStep1");
    ctx.input = s3_input("ExtractLocalStep0Output");
    let out = expand(
        StepKind::LoadRedshift,
        args("schema: analytics\ntable: customers\nmax_errors: 10"),
        &ctx,
    )
    .unwrap();

    let acts = activities(&out);
    assert_eq!(acts.len(), 1);
    assert_eq!(acts[0].inputs, ids(&["ExtractLocalStep0Output"]));
    assert_eq!(acts[0].outputs, ids(&["LoadRedshiftStep1Table"]));
    assert_eq!(acts[0].on_fail, Some(ObjectId::new("FailureAlarm")));
    match &acts[0].kind {
        ActivityKind::RedshiftCopy {
            insert_mode,
            command_options,
        } => {
            assert_eq!(insert_mode, "TRUNCATE");
            assert_eq!(
                command_options,
                &vec![
                    "DELIMITER '\\t'".to_string(),
                    "ESCAPE".to_string(),
                    "TRUNCATECOLUMNS".to_string(),
                    "NULL AS 'NULL'".to_string(),
                    "MAXERROR 10".to_string(),
                ]
            );
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(!out.output.refs()[0].is_s3());
}

#[test]
fn load_redshift_validates_its_input() {
    let fx = Fixture::new();
    let mut ctx = fx.context("LoadRedshiftStep1");
    let err = expand(StepKind::LoadRedshift, args("schema: a\ntable: b"), &ctx).unwrap_err();
    assert!(err.to_string().contains("object-store input"));

    ctx.input = s3_input("In");
    let err = expand(
        StepKind::LoadRedshift,
        args("schema: a\ntable: b\ninsert_mode: MERGE"),
        &ctx,
    )
    .unwrap_err();
    assert!(err.to_string().contains("insert_mode 'MERGE'"));
}

#[test]
fn create_load_passes_the_definition_to_the_loader() {
    let fx = Fixture::new();
    let mut ctx = fx.context("CreateLoadRedshiftStep1");
    ctx.input = s3_input("In");
    let out = expand(
        StepKind::CreateLoadRedshift,
        args("table_definition: tables/customers.sql\ngzip: true"),
        &ctx,
    )
    .unwrap();
    let shell = shell(activities(&out)[0]);
    assert_eq!(
        shell.command.as_deref(),
        Some("/opt/dataduct/bin/create_load_redshift.sh")
    );
    assert!(!shell.stage);
    assert!(shell.script_arguments[0].starts_with("--table_definition=CREATE TABLE analytics.customers"));
    assert_eq!(
        shell.script_arguments[1],
        "--s3_input_paths=s3://etl-bucket/dev/etl/data/demo/in/"
    );
    assert_eq!(shell.script_arguments[2], "--gzip");
}

#[test]
fn upsert_runs_one_transaction() {
    let fx = Fixture::new();
    let out = expand(
        StepKind::Upsert,
        args("source: tables/customers_staging.sql\ndestination: tables/customers.sql"),
        &fx.context("UpsertStep2"),
    )
    .unwrap();
    let arguments = &shell(activities(&out)[0]).script_arguments;
    let sql = arguments
        .iter()
        .find_map(|a| a.strip_prefix("--sql="))
        .unwrap();
    assert!(sql.starts_with("BEGIN; CREATE TABLE IF NOT EXISTS analytics.customers"));
    assert!(sql.contains("FROM staging.customers"));
    assert!(sql.ends_with("COMMIT;"));
    assert!(arguments.contains(&"--analyze".to_string()));
}

#[test]
fn upsert_needs_exactly_one_source() {
    let fx = Fixture::new();
    let err = expand(
        StepKind::Upsert,
        args("destination: tables/customers.sql"),
        &fx.context("UpsertStep2"),
    )
    .unwrap_err();
    assert!(err.to_string().contains("exactly one of 'source' or 'sql'"));
}

#[test]
fn sql_command_stages_scripts() {
    let fx = Fixture::new();
    test_utils::write_fixture(fx.dir.path(), "sql/refresh.sql", "DELETE FROM a; -- old\nINSERT INTO a SELECT 1;");
    let out = expand(
        StepKind::SqlCommand,
        args("script: sql/refresh.sql\nwrap_transaction: true\nqueue: etl"),
        &fx.context("SqlCommandStep0"),
    )
    .unwrap();
    let command = match &activities(&out)[0].kind {
        ActivityKind::Sql(command) => command,
        other => panic!("unexpected {other:?}"),
    };
    assert_eq!(command.database, ObjectId::new("RedshiftDatabase"));
    assert_eq!(command.queue.as_deref(), Some("etl"));
    assert_eq!(command.script_uri.as_ref(), Some(&out.artifacts[0].dest));
    assert_eq!(
        out.artifacts[0].source,
        ArtifactSource::Inline("BEGIN;\nDELETE FROM a;\nINSERT INTO a SELECT 1;\nCOMMIT;".to_string())
    );
}

#[test]
fn transform_with_a_script_directory() {
    let fx = Fixture::new();
    let mut ctx = fx.context("TransformStep1");
    ctx.input = s3_input("ExtractS3Step0Output");
    let out = expand(
        StepKind::Transform,
        args("script_directory: scripts/tools\nscript_name: run.py\nscript_arguments: [--verbose, {date: 2026-01-01, limit: 5}]"),
        &ctx,
    )
    .unwrap();

    let activity = activities(&out)[0];
    assert_eq!(
        activity.inputs,
        ids(&["ExtractS3Step0Output", "TransformStep1ScriptDirectory"])
    );
    assert_eq!(activity.outputs, ids(&["TransformStep1Output"]));
    let shell = shell(activity);
    assert!(shell.stage);
    assert_eq!(
        shell.script_arguments,
        vec!["--verbose", "--date=2026-01-01", "--limit=5"]
    );
    assert_eq!(shell.script_uri.as_ref().unwrap().base_name(), "launcher.sh");

    let launcher = out
        .artifacts
        .iter()
        .find_map(|a| match &a.source {
            ArtifactSource::Inline(body) => Some(body),
            _ => None,
        })
        .unwrap();
    assert!(launcher.contains("${INPUT2_STAGING_DIR}"));
    assert!(launcher.contains("/run.py\" \"$@\""));
    assert!(out
        .artifacts
        .iter()
        .any(|a| matches!(a.source, ArtifactSource::Directory(_)) && a.dest.is_directory));
}

#[test]
fn transform_with_named_inputs_and_outputs() {
    let fx = Fixture::new();
    let mut ctx = fx.context("TransformStep2");
    ctx.input = Nodes::Named(
        [
            ("customers".to_string(), NodeRef::warehouse(&ObjectId::new("A"))),
            ("orders".to_string(), NodeRef::warehouse(&ObjectId::new("B"))),
        ]
        .into_iter()
        .collect(),
    );
    let out = expand(
        StepKind::Transform,
        args("command: ./join.sh\noutput_node: [joined, rejects]"),
        &ctx,
    )
    .unwrap();

    let activity = activities(&out)[0];
    assert_eq!(activity.inputs, ids(&["A", "B"]));
    assert_eq!(
        shell(activity).script_arguments,
        vec![
            "--customers=${INPUT1_STAGING_DIR}",
            "--orders=${INPUT2_STAGING_DIR}"
        ]
    );
    match &out.output {
        Nodes::Named(named) => {
            assert_eq!(named["joined"].id, ObjectId::new("TransformStep2_joined"));
            assert!(named["rejects"].path.as_ref().unwrap().uri().ends_with("/TransformStep2/rejects/"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn emr_streaming_step_string() {
    let fx = Fixture::new();
    let mut ctx = fx.context("EmrStreamingStep1");
    ctx.runner = Some(Runner::Resource(ObjectId::new("EmrCluster")));
    ctx.input = s3_input("In");
    let out = expand(
        StepKind::EmrStreaming,
        args("mapper: mapper.py\nreducer: reducer.py\nhadoop_params: -D mapred.reduce.tasks=1,2"),
        &ctx,
    )
    .unwrap();
    let steps = match &activities(&out)[0].kind {
        ActivityKind::Emr { steps } => steps.clone(),
        other => panic!("unexpected {other:?}"),
    };
    let src = "s3://etl-bucket/dev/etl/src/demo/version_20260101000000/EmrStreamingStep1";
    let data = "s3://etl-bucket/dev/etl/data/demo/version_20260101000000/EmrStreamingStep1";
    assert_eq!(
        steps,
        vec![format!(
            "/home/hadoop/contrib/streaming/hadoop-streaming.jar,-D,mapred.reduce.tasks=1\\\\,2,\
-files,{src}/mapper.py\\\\,{src}/reducer.py,-mapper,mapper.py,-reducer,reducer.py,\
-input,s3://etl-bucket/dev/etl/data/demo/in/,-output,{data}/output/"
        )]
    );
}

#[test]
fn emr_streaming_on_old_amis_uses_full_uris() {
    let fx = Fixture::new();
    let mut ctx = fx.context("EmrStreamingStep1");
    ctx.emr_ami_major = Some(1);
    ctx.input = s3_input("In");
    let out = expand(StepKind::EmrStreaming, args("mapper: mapper.py"), &ctx).unwrap();
    let ActivityKind::Emr { steps } = &activities(&out)[0].kind else {
        panic!("expected an EMR activity");
    };
    assert!(steps[0].contains(",-mapper,s3://etl-bucket/"));
    assert!(steps[0].contains(",-reducer,NONE,"));
    assert!(!steps[0].contains("-files"));
}

#[test]
fn primary_key_check_reports_to_the_alarm_topic() {
    let fx = Fixture::new();
    let out = expand(
        StepKind::PrimaryKeyCheck,
        args("table_definition: tables/customers.sql\nlog_to_s3: true"),
        &fx.context("PrimaryKeyCheckStep3"),
    )
    .unwrap();
    let arguments = &shell(activities(&out)[0]).script_arguments;
    assert_eq!(arguments[1], "--primary_key=id");
    assert_eq!(&arguments[2..], &[
        "--test_name=PrimaryKeyCheckStep3".to_string(),
        "--sns_topic_arn=arn:aws:sns:us-east-1:000000000000:etl-failures".to_string(),
        "--log_to_s3".to_string(),
        "--s3_log_dir=s3://etl-bucket/dev/etl/qa/demo/".to_string(),
    ]);
}

#[test]
fn checks_need_a_primary_key() {
    let fx = Fixture::new();
    let err = expand(
        StepKind::PrimaryKeyCheck,
        args("table_definition: tables/customers_staging.sql"),
        &fx.context("PrimaryKeyCheckStep3"),
    )
    .unwrap_err();
    assert!(matches!(err, StepError::Structure { .. }));
}

#[test]
fn count_check_wraps_both_sides() {
    let fx = Fixture::new();
    let out = expand(
        StepKind::CountCheck,
        args("source_sql: SELECT id FROM orders.customers\nsource_host: orders_db\ndestination_table_definition: tables/customers.sql\ntolerance: 2.5"),
        &fx.context("CountCheckStep4"),
    )
    .unwrap();
    let arguments = &shell(activities(&out)[0]).script_arguments;
    assert_eq!(
        &arguments[..4],
        &[
            "--source_sql=SELECT COUNT(1) FROM (SELECT id FROM orders.customers) AS source".to_string(),
            "--source_host=orders_db".to_string(),
            "--destination_sql=SELECT COUNT(1) FROM analytics.customers".to_string(),
            "--tolerance=2.5".to_string(),
        ]
    );
}

#[test]
fn pipeline_dependencies_arguments() {
    let fx = Fixture::new();
    let out = expand(
        StepKind::PipelineDependencies,
        args("dependent_pipelines: [orders, customers]\nignore_failed: true"),
        &fx.context("PipelineDependenciesStep0"),
    )
    .unwrap();
    let arguments = &shell(activities(&out)[0]).script_arguments;
    assert_eq!(
        arguments,
        &vec![
            "--pipeline_name=demo".to_string(),
            "--dependencies=orders,customers".to_string(),
            "--refresh_rate=300".to_string(),
            "--start_date=#{format(@scheduledStartTime,'YYYY-MM-dd')}".to_string(),
            "--sns_topic_arn=arn:aws:sns:us-east-1:000000000000:etl-failures".to_string(),
            "--ignore_failed".to_string(),
        ]
    );
}

#[test]
fn load_reload_pk_chains_its_stages() {
    let fx = Fixture::new();
    let mut ctx = fx.context("LoadReloadAndPrimaryKeyStep1");
    ctx.input = s3_input("In");
    let out = expand(
        StepKind::LoadReloadPk,
        args("staging_table_definition: tables/customers_staging.sql\nproduction_table_definition: tables/customers.sql"),
        &ctx,
    )
    .unwrap();
    let acts = activities(&out);
    let names: Vec<&str> = acts.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "LoadReloadAndPrimaryKeyStep1Load",
            "LoadReloadAndPrimaryKeyStep1Reload",
            "LoadReloadAndPrimaryKeyStep1PrimaryKeyCheck"
        ]
    );
    assert!(acts[0].depends_on().is_empty());
    assert_eq!(acts[1].depends_on(), ids(&["LoadReloadAndPrimaryKeyStep1Load"]).as_slice());
    assert_eq!(acts[2].depends_on(), ids(&["LoadReloadAndPrimaryKeyStep1Reload"]).as_slice());
    assert_eq!(out.activities.len(), 3);
}

#[test]
fn safe_create_load_swaps_through_staging() {
    let fx = Fixture::new();
    let mut ctx = fx.context("SafeCreateLoadStep1");
    ctx.input = s3_input("In");
    let out = expand(
        StepKind::SafeCreateLoad,
        args("table_definition: tables/customers.sql"),
        &ctx,
    )
    .unwrap();
    let acts = activities(&out);
    assert_eq!(acts.len(), 3);
    let create = shell(acts[0]);
    assert!(create.script_arguments[0].starts_with("--table_definition=CREATE TABLE analytics.customers_staging"));
    assert!(create.script_arguments[1].contains("DROP TABLE IF EXISTS analytics.customers_staging CASCADE;"));
    assert!(create.script_arguments[1].contains("GRANT select ON analytics.customers_staging TO GROUP analysts;"));

    let swap = shell(acts[2]);
    assert!(swap.script_arguments[1].contains("DROP TABLE IF EXISTS analytics.customers_staging CASCADE; COMMIT;"));
    assert_eq!(acts[2].depends_on(), ids(&["SafeCreateLoadStep1Load"]).as_slice());
}
