use crate::context::{ArtifactSource, Nodes, StepContext, StepOutput};
use crate::error::StepError;
use crate::util::file_name;
use common::types::S3Path;
use components::ActivityKind;
use serde::Deserialize;
use std::path::PathBuf;

pub(crate) const STREAMING_JAR: &str = "/home/hadoop/contrib/streaming/hadoop-streaming.jar";
/// Separator the cluster step parser reads as a literal comma.
const ESCAPED_COMMA: &str = r"\\,";

fn escape(part: &str) -> String {
    part.replace(',', ESCAPED_COMMA)
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct EmrStreamingArgs {
    mapper: PathBuf,
    reducer: Option<PathBuf>,
    hadoop_params: Option<String>,
}

/// Hadoop streaming job over the step's object-store inputs.
pub(crate) fn emr_streaming(args: EmrStreamingArgs, ctx: &StepContext) -> Result<StepOutput, StepError> {
    let ami_major = ctx.emr_ami_major()?;
    let inputs = ctx.input.refs();
    if inputs.is_empty() || inputs.iter().any(|n| !n.is_s3()) {
        return Err(StepError::input("emr-streaming needs object-store input nodes"));
    }

    let mut out = StepOutput::default();
    let mut stage = |local: &PathBuf| -> Result<S3Path, StepError> {
        let local = ctx.resolve(local);
        let dest = ctx.paths.src.join_file(file_name(&local)?);
        out.stage(dest.clone(), ArtifactSource::File(local));
        Ok(dest)
    };
    let mapper = stage(&args.mapper)?;
    let reducer = args.reducer.as_ref().map(&mut stage).transpose()?;

    let mut parts = vec![STREAMING_JAR.to_string()];
    parts.extend(
        args.hadoop_params
            .iter()
            .flat_map(|p| p.split_whitespace())
            .map(escape),
    );
    if ami_major >= 2 {
        let files: Vec<String> = std::iter::once(&mapper)
            .chain(reducer.as_ref())
            .map(|p| escape(&p.uri()))
            .collect();
        parts.push("-files".to_string());
        parts.push(files.join(ESCAPED_COMMA));
        parts.push("-mapper".to_string());
        parts.push(escape(mapper.base_name()));
        parts.push("-reducer".to_string());
        parts.push(reducer.as_ref().map_or("NONE".to_string(), |r| escape(r.base_name())));
    } else {
        parts.push("-mapper".to_string());
        parts.push(escape(&mapper.uri()));
        parts.push("-reducer".to_string());
        parts.push(reducer.as_ref().map_or("NONE".to_string(), |r| escape(&r.uri())));
    }
    for input in &inputs {
        if let Some(path) = &input.path {
            parts.push("-input".to_string());
            parts.push(escape(&path.uri()));
        }
    }

    let output = out.add_s3_node(ctx.s3_node(ctx.sub_id("Output"), ctx.paths.data.join_dir("output")));
    if let Some(path) = &output.path {
        parts.push("-output".to_string());
        parts.push(escape(&path.uri()));
    }

    let activity = ctx
        .activity(
            ctx.sub_id(""),
            ActivityKind::Emr {
                steps: vec![parts.join(",")],
            },
        )?
        .with_inputs(inputs.iter().map(|n| n.id.clone()))
        .with_output(output.id.clone());
    out.add_activity(activity);
    out.output = Nodes::Single(output);
    Ok(out)
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct EmrStepArgs {
    step_string: String,
}

/// A cluster step given verbatim.
pub(crate) fn emr_step(args: EmrStepArgs, ctx: &StepContext) -> Result<StepOutput, StepError> {
    ctx.emr_ami_major()?;
    if args.step_string.trim().is_empty() {
        return Err(StepError::input("step_string is empty"));
    }
    let mut out = StepOutput::default();
    let activity = ctx
        .activity(
            ctx.sub_id(""),
            ActivityKind::Emr {
                steps: vec![args.step_string],
            },
        )?
        .with_inputs(ctx.input.ids());
    out.add_activity(activity);
    Ok(out)
}
