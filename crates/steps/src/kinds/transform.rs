use crate::context::{ArtifactSource, NodeRef, Nodes, StepContext, StepOutput};
use crate::error::StepError;
use crate::templates::render_launcher;
use crate::util::{arg, exactly_one, file_name, yaml_scalar};
use components::{ActivityKind, ShellCommand};
use serde::Deserialize;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

pub(crate) const LAUNCHER_NAME: &str = "launcher.sh";

/// A script argument: passed through as written, or a mapping rendered as
/// `--key=value` pairs.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ScriptArgument {
    Plain(String),
    Pairs(BTreeMap<String, Value>),
}

impl ScriptArgument {
    fn render(&self) -> Result<Vec<String>, StepError> {
        match self {
            ScriptArgument::Plain(s) => Ok(vec![s.clone()]),
            ScriptArgument::Pairs(pairs) => pairs
                .iter()
                .map(|(k, v)| Ok(arg(k, yaml_scalar(v)?)))
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct TransformArgs {
    command: Option<String>,
    script: Option<PathBuf>,
    script_directory: Option<PathBuf>,
    script_name: Option<String>,
    #[serde(default)]
    script_arguments: Vec<ScriptArgument>,
    output_node: Option<Vec<String>>,
    #[serde(default)]
    no_input: bool,
    #[serde(default)]
    no_output: bool,
}

pub(crate) fn transform(args: TransformArgs, ctx: &StepContext) -> Result<StepOutput, StepError> {
    exactly_one(&[
        ("command", args.command.is_some()),
        ("script", args.script.is_some()),
        ("script_directory", args.script_directory.is_some()),
    ])?;
    if args.script_directory.is_some() != args.script_name.is_some() {
        return Err(StepError::input(
            "script_name is required with script_directory and only then",
        ));
    }
    if args.no_output && args.output_node.is_some() {
        return Err(StepError::input("output_node cannot be combined with no_output"));
    }

    let mut out = StepOutput::default();
    let mut inputs: Vec<NodeRef> = vec![];
    let mut arguments: Vec<String> = vec![];

    if !args.no_input {
        if let Nodes::Named(named) = &ctx.input {
            for (alias, node) in named {
                inputs.push(node.clone());
                arguments.push(arg(alias, format!("${{INPUT{}_STAGING_DIR}}", inputs.len())));
            }
        } else {
            inputs.extend(ctx.input.refs().into_iter().cloned());
        }
    }
    for argument in &args.script_arguments {
        arguments.extend(argument.render()?);
    }

    let shell = match (args.command, args.script, args.script_directory, args.script_name) {
        (Some(command), ..) => ShellCommand::command(command),
        (None, Some(script), ..) => {
            let local = ctx.resolve(&script);
            let dest = ctx.paths.src.join_file(file_name(&local)?);
            out.stage(dest.clone(), ArtifactSource::File(local));
            ShellCommand::script(dest)
        }
        (None, None, Some(directory), Some(script_name)) => {
            let local = ctx.resolve(&directory);
            if !local.is_dir() {
                return Err(StepError::input(format!(
                    "script_directory '{}' is not a directory",
                    local.display()
                )));
            }
            let dest = ctx.paths.src.join_dir(file_name(&local)?);
            out.stage(dest.clone(), ArtifactSource::Directory(local));
            inputs.push(out.add_s3_node(ctx.s3_node(ctx.sub_id("ScriptDirectory"), dest)));

            let launcher = ctx.paths.src.join_file(LAUNCHER_NAME);
            out.stage(
                launcher.clone(),
                ArtifactSource::Inline(render_launcher(inputs.len(), &script_name)?),
            );
            ShellCommand::script(launcher)
        }
        _ => unreachable!("checked above"),
    };

    let mut activity = ctx
        .activity(
            ctx.sub_id(""),
            ActivityKind::ShellCommand(shell.with_arguments(arguments)),
        )?
        .with_inputs(inputs.into_iter().map(|n| n.id));

    if !args.no_output {
        out.output = match args.output_node {
            Some(subs) => {
                let mut named = BTreeMap::new();
                for sub in subs {
                    let node = out.add_s3_node(ctx.s3_node(
                        ctx.sub_id(&format!("_{sub}")),
                        ctx.paths.data.join_dir(&sub),
                    ));
                    activity = activity.with_output(node.id.clone());
                    named.insert(sub, node);
                }
                Nodes::Named(named)
            }
            None => {
                let node = out.add_s3_node(
                    ctx.s3_node(ctx.sub_id("Output"), ctx.paths.data.join_dir("output")),
                );
                activity = activity.with_output(node.id.clone());
                Nodes::Single(node)
            }
        };
    }

    out.add_activity(activity);
    Ok(out)
}
