use crate::context::StepContext;
use crate::error::StepError;
use catalog::{Projection, SelectStatement, Table, View};
use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};
use sql::SqlScript;
use std::fmt::Display;
use std::path::Path;

pub(crate) fn parse_args<T: DeserializeOwned>(args: Mapping) -> Result<T, StepError> {
    serde_yaml::from_value(Value::Mapping(args)).map_err(|e| StepError::input(e.to_string()))
}

pub(crate) fn read_script(ctx: &StepContext, path: &Path) -> Result<SqlScript, StepError> {
    Ok(SqlScript::from_file(ctx.resolve(path))?)
}

pub(crate) fn read_table(ctx: &StepContext, path: &Path) -> Result<Table, StepError> {
    Ok(Table::from_script(&read_script(ctx, path)?)?)
}

/// Rows feeding an upsert or reload.
#[derive(Debug)]
pub(crate) enum RowSource {
    Table(Table),
    View(View),
    Select(SelectStatement),
}

impl RowSource {
    pub(crate) fn from_script(script: &SqlScript) -> Result<Self, StepError> {
        if script.creates_table() {
            Ok(RowSource::Table(Table::from_script(script)?))
        } else if script.creates_view() {
            Ok(RowSource::View(View::from_script(script)?))
        } else {
            Ok(RowSource::Select(SelectStatement::new(&script.sql())?))
        }
    }

    /// Either a definition file or inline select text; exactly one.
    pub(crate) fn resolve(
        ctx: &StepContext,
        path: Option<&Path>,
        sql: Option<&str>,
    ) -> Result<Self, StepError> {
        match (path, sql) {
            (Some(path), None) => Self::from_script(&read_script(ctx, path)?),
            (None, Some(sql)) => Ok(RowSource::Select(SelectStatement::new(sql)?)),
            _ => Err(StepError::input("exactly one of 'source' or 'sql' is required")),
        }
    }

    pub(crate) fn projection(&self) -> &dyn Projection {
        match self {
            RowSource::Table(t) => t,
            RowSource::View(v) => v,
            RowSource::Select(s) => s,
        }
    }
}

/// `--key=value`.
pub(crate) fn arg(key: &str, value: impl Display) -> String {
    format!("--{key}={value}")
}

/// A script as one command-line argument.
pub(crate) fn one_line(script: &SqlScript) -> String {
    script
        .statements()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Name of the single key that is set among mutually exclusive options.
pub(crate) fn exactly_one<'a>(options: &[(&'a str, bool)]) -> Result<&'a str, StepError> {
    let set: Vec<&str> = options.iter().filter(|(_, on)| *on).map(|(k, _)| *k).collect();
    match set.as_slice() {
        [one] => Ok(one),
        _ => Err(StepError::input(format!(
            "exactly one of {} is required",
            options
                .iter()
                .map(|(k, _)| format!("'{k}'"))
                .collect::<Vec<_>>()
                .join(", ")
        ))),
    }
}

pub(crate) fn yaml_scalar(value: &Value) -> Result<String, StepError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(StepError::input(format!(
            "expected a scalar argument value, found {other:?}"
        ))),
    }
}

pub(crate) fn file_name(path: &Path) -> Result<String, StepError> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| StepError::input(format!("'{}' has no file name", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_one_names_the_options() {
        assert_eq!(exactly_one(&[("command", false), ("script", true)]).unwrap(), "script");
        let err = exactly_one(&[("command", true), ("script", true)]).unwrap_err();
        assert!(err.to_string().contains("'command', 'script'"));
        assert!(exactly_one(&[("command", false)]).is_err());
    }

    #[test]
    fn scripts_collapse_to_one_line() {
        let script = SqlScript::new("DELETE FROM a;\nINSERT INTO a SELECT 1;");
        assert_eq!(one_line(&script), "DELETE FROM a; INSERT INTO a SELECT 1;");
    }
}
