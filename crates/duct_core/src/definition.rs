use crate::error::CompileError;
use common::types::Frequency;
use log::debug;
use serde::Deserialize;
use serde_yaml::Value;
use std::fs;
use std::path::{Path, PathBuf};
use steps::StepDescriptor;

/// `load_time`: a clock time or minutes after the start of the period.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum LoadTime {
    Minutes(u32),
    Clock(String),
}

impl LoadTime {
    /// Hour and minute of the first run.
    pub fn hour_minute(&self) -> Result<(u32, u32), CompileError> {
        match self {
            LoadTime::Minutes(minutes) => Ok(((minutes / 60) % 24, minutes % 60)),
            LoadTime::Clock(clock) => parse_clock(clock),
        }
    }
}

pub(crate) fn parse_clock(clock: &str) -> Result<(u32, u32), CompileError> {
    let invalid = || CompileError::input(format!("load_time '{clock}' is not HH:MM"));
    let (hour, minute) = clock.trim().split_once(':').ok_or_else(invalid)?;
    let hour: u32 = hour.parse().map_err(|_| invalid())?;
    let minute: u32 = minute.parse().map_err(|_| invalid())?;
    if hour > 23 || minute > 59 {
        return Err(invalid());
    }
    Ok((hour, minute))
}

/// Per-resource bootstrap steps declared by the pipeline itself.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BootstrapSteps {
    pub ec2: Vec<Value>,
    pub emr: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDefinition {
    name: String,
    frequency: Frequency,
    #[serde(default)]
    steps: Vec<Value>,
    description: Option<String>,
    load_time: Option<LoadTime>,
    time_delta: Option<String>,
    topic_arn: Option<String>,
    max_retries: Option<u32>,
    ec2_resource_config: Option<Value>,
    emr_cluster_config: Option<Value>,
    worker_group: Option<String>,
    bootstrap: Option<BootstrapSteps>,
    teardown: Option<Value>,
}

/// A pipeline YAML file, parsed but not yet compiled.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineDefinition {
    pub name: String,
    pub frequency: Frequency,
    pub steps: Vec<StepDescriptor>,
    pub description: Option<String>,
    pub load_time: Option<LoadTime>,
    pub time_delta: Option<String>,
    pub topic_arn: Option<String>,
    pub max_retries: Option<u32>,
    pub ec2_resource_config: Option<Value>,
    pub emr_cluster_config: Option<Value>,
    pub worker_group: Option<String>,
    pub bootstrap: Option<BootstrapSteps>,
    pub teardown: Option<StepDescriptor>,
    /// Directory relative step paths are resolved against.
    pub base_dir: PathBuf,
}

impl PipelineDefinition {
    pub fn from_yaml_str(yaml: &str, base_dir: impl Into<PathBuf>) -> Result<Self, CompileError> {
        let raw: RawDefinition = serde_yaml::from_str(yaml)?;
        if raw.name.trim().is_empty() {
            return Err(CompileError::input("pipeline 'name' is empty"));
        }
        if raw.steps.is_empty() {
            return Err(CompileError::input(format!("pipeline '{}' has no steps", raw.name)));
        }
        let steps = raw
            .steps
            .into_iter()
            .enumerate()
            .map(|(i, value)| {
                StepDescriptor::from_value(value).map_err(|e| e.in_step(format!("#{i}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let teardown = raw.teardown.map(StepDescriptor::from_value).transpose()?;

        Ok(Self {
            name: raw.name,
            frequency: raw.frequency,
            steps,
            description: raw.description,
            load_time: raw.load_time,
            time_delta: raw.time_delta,
            topic_arn: raw.topic_arn,
            max_retries: raw.max_retries,
            ec2_resource_config: raw.ec2_resource_config,
            emr_cluster_config: raw.emr_cluster_config,
            worker_group: raw.worker_group,
            bootstrap: raw.bootstrap,
            teardown,
            base_dir: base_dir.into(),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, CompileError> {
        debug!("reading pipeline definition {}", path.display());
        let yaml = fs::read_to_string(path).map_err(|e| CompileError::io(path, e))?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self::from_yaml_str(&yaml, base_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIPELINE: &str = r#"
name: orders
frequency: daily
load_time: "03:15"
description: nightly orders load
steps:
  - step_type: extract-s3
    file_uri: s3://raw/orders.tsv
  - step_type: load-redshift
    schema: analytics
    table: orders
teardown:
  step_type: transform
  command: echo done
  no_input: true
"#;

    #[test]
    fn parses_root_keys_and_steps() {
        let def = PipelineDefinition::from_yaml_str(PIPELINE, "/pipelines").unwrap();
        assert_eq!(def.name, "orders");
        assert_eq!(def.frequency, Frequency::Daily);
        assert_eq!(def.load_time.as_ref().unwrap().hour_minute().unwrap(), (3, 15));
        assert_eq!(def.steps.len(), 2);
        assert_eq!(def.steps[1].step_type, "load-redshift");
        assert_eq!(def.teardown.as_ref().unwrap().step_type, "transform");
        assert_eq!(def.base_dir, PathBuf::from("/pipelines"));
    }

    #[test]
    fn rejects_unknown_keys_and_frequencies() {
        let err = PipelineDefinition::from_yaml_str("name: a\nfrequency: daily\nsteps: []\nowner: me", ".")
            .unwrap_err();
        assert!(err.to_string().contains("owner"));
        let err =
            PipelineDefinition::from_yaml_str("name: a\nfrequency: monthly\nsteps: []", ".").unwrap_err();
        assert!(matches!(err, CompileError::Yaml { .. }));
    }

    #[test]
    fn steps_are_required() {
        let err = PipelineDefinition::from_yaml_str("name: a\nfrequency: one-time", ".").unwrap_err();
        assert!(err.to_string().contains("has no steps"));
    }

    #[test]
    fn load_time_forms() {
        assert_eq!(LoadTime::Minutes(90).hour_minute().unwrap(), (1, 30));
        assert!(LoadTime::Clock("25:00".into()).hour_minute().is_err());
        assert!(LoadTime::Clock("noon".into()).hour_minute().is_err());
    }
}
