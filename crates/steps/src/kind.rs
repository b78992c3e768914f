use crate::error::StepError;
use common::config::components::steps::CustomStepConfig;
use log::debug;
use serde_yaml::Mapping;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// The runner an expanded step needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerKind {
    Ec2,
    Emr,
    NoRunner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StepKind {
    ExtractLocal,
    ExtractS3,
    ExtractRds,
    ExtractPostgres,
    ExtractRedshift,
    Transform,
    EmrStreaming,
    EmrStep,
    SqlCommand,
    LoadRedshift,
    CreateLoadRedshift,
    Upsert,
    Reload,
    CreateUpdateSql,
    PrimaryKeyCheck,
    CountCheck,
    ColumnCheck,
    PipelineDependencies,
    LoadReloadPk,
    SafeCreateLoad,
}

impl StepKind {
    pub const ALL: [StepKind; 20] = [
        StepKind::ExtractLocal,
        StepKind::ExtractS3,
        StepKind::ExtractRds,
        StepKind::ExtractPostgres,
        StepKind::ExtractRedshift,
        StepKind::Transform,
        StepKind::EmrStreaming,
        StepKind::EmrStep,
        StepKind::SqlCommand,
        StepKind::LoadRedshift,
        StepKind::CreateLoadRedshift,
        StepKind::Upsert,
        StepKind::Reload,
        StepKind::CreateUpdateSql,
        StepKind::PrimaryKeyCheck,
        StepKind::CountCheck,
        StepKind::ColumnCheck,
        StepKind::PipelineDependencies,
        StepKind::LoadReloadPk,
        StepKind::SafeCreateLoad,
    ];

    /// The `step_type` spelling used in pipeline definitions.
    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::ExtractLocal => "extract-local",
            StepKind::ExtractS3 => "extract-s3",
            StepKind::ExtractRds => "extract-rds",
            StepKind::ExtractPostgres => "extract-postgres",
            StepKind::ExtractRedshift => "extract-redshift",
            StepKind::Transform => "transform",
            StepKind::EmrStreaming => "emr-streaming",
            StepKind::EmrStep => "emr-step",
            StepKind::SqlCommand => "sql-command",
            StepKind::LoadRedshift => "load-redshift",
            StepKind::CreateLoadRedshift => "create-load-redshift",
            StepKind::Upsert => "upsert",
            StepKind::Reload => "reload",
            StepKind::CreateUpdateSql => "create-update-sql",
            StepKind::PrimaryKeyCheck => "primary-key-check",
            StepKind::CountCheck => "count-check",
            StepKind::ColumnCheck => "column-check",
            StepKind::PipelineDependencies => "pipeline-dependencies",
            StepKind::LoadReloadPk => "load-reload-pk",
            StepKind::SafeCreateLoad => "safe-create-load",
        }
    }

    /// Prefix of auto-generated step ids.
    pub fn class_name(&self) -> &'static str {
        match self {
            StepKind::ExtractLocal => "ExtractLocalStep",
            StepKind::ExtractS3 => "ExtractS3Step",
            StepKind::ExtractRds => "ExtractRdsStep",
            StepKind::ExtractPostgres => "ExtractPostgresStep",
            StepKind::ExtractRedshift => "ExtractRedshiftStep",
            StepKind::Transform => "TransformStep",
            StepKind::EmrStreaming => "EmrStreamingStep",
            StepKind::EmrStep => "EmrJobStep",
            StepKind::SqlCommand => "SqlCommandStep",
            StepKind::LoadRedshift => "LoadRedshiftStep",
            StepKind::CreateLoadRedshift => "CreateLoadRedshiftStep",
            StepKind::Upsert => "UpsertStep",
            StepKind::Reload => "ReloadStep",
            StepKind::CreateUpdateSql => "CreateUpdateSqlStep",
            StepKind::PrimaryKeyCheck => "PrimaryKeyCheckStep",
            StepKind::CountCheck => "CountCheckStep",
            StepKind::ColumnCheck => "ColumnCheckStep",
            StepKind::PipelineDependencies => "PipelineDependenciesStep",
            StepKind::LoadReloadPk => "LoadReloadAndPrimaryKeyStep",
            StepKind::SafeCreateLoad => "SafeCreateLoadStep",
        }
    }

    pub fn runner_kind(&self) -> RunnerKind {
        match self {
            StepKind::ExtractLocal | StepKind::ExtractS3 => RunnerKind::NoRunner,
            StepKind::EmrStreaming | StepKind::EmrStep => RunnerKind::Emr,
            _ => RunnerKind::Ec2,
        }
    }

    /// Steps that reference the warehouse database object directly.
    pub fn uses_warehouse(&self) -> bool {
        matches!(
            self,
            StepKind::ExtractRedshift | StepKind::LoadRedshift | StepKind::SqlCommand
        )
    }
}

impl Display for StepKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepKind {
    type Err = StepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StepKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| StepError::input(format!("unknown step_type '{s}'")))
    }
}

/// A `step_type` the compiler can expand: a built-in kind plus preset
/// arguments for custom aliases.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredStep {
    pub kind: StepKind,
    pub defaults: Mapping,
}

/// Static table from `step_type` to expander, populated at start-up.
#[derive(Debug, Clone)]
pub struct StepRegistry {
    entries: BTreeMap<String, RegisteredStep>,
}

impl Default for StepRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl StepRegistry {
    pub fn builtin() -> Self {
        let entries = StepKind::ALL
            .into_iter()
            .map(|kind| {
                (
                    kind.as_str().to_string(),
                    RegisteredStep {
                        kind,
                        defaults: Mapping::new(),
                    },
                )
            })
            .collect();
        Self { entries }
    }

    pub fn with_custom_steps(custom: &[CustomStepConfig]) -> Result<Self, StepError> {
        let mut registry = Self::builtin();
        for step in custom {
            registry.register_custom(step)?;
        }
        Ok(registry)
    }

    pub fn register_custom(&mut self, custom: &CustomStepConfig) -> Result<(), StepError> {
        if self.entries.contains_key(&custom.step_type) {
            return Err(StepError::input(format!(
                "custom step '{}' clashes with an existing step type",
                custom.step_type
            )));
        }
        let kind: StepKind = custom.base.parse().map_err(|_| {
            StepError::input(format!(
                "custom step '{}' is based on unknown step type '{}'",
                custom.step_type, custom.base
            ))
        })?;
        debug!("registered custom step '{}' on '{}'", custom.step_type, kind);
        self.entries.insert(
            custom.step_type.clone(),
            RegisteredStep {
                kind,
                defaults: custom.defaults.clone(),
            },
        );
        Ok(())
    }

    pub fn resolve(&self, step_type: &str) -> Result<&RegisteredStep, StepError> {
        self.entries.get(step_type).ok_or_else(|| {
            StepError::input(format!(
                "unknown step_type '{step_type}', expected one of {}",
                self.entries.keys().cloned().collect::<Vec<_>>().join(", ")
            ))
        })
    }

    pub fn step_types(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
