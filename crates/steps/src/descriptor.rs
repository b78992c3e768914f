use crate::error::StepError;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

/// How a step names the nodes it reads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum InputNodeSpec {
    /// A registered node id.
    Single(String),
    /// `producer id -> alias` pairs, giving the step a named set of inputs.
    Renamed(BTreeMap<String, String>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

/// One entry of a pipeline's `steps` list, split into the keys every step
/// understands and the step-specific remainder.
#[derive(Debug, Clone, PartialEq)]
pub struct StepDescriptor {
    pub step_type: String,
    pub name: Option<String>,
    pub depends_on: Vec<String>,
    pub input_node: Option<InputNodeSpec>,
    pub input_path: Option<String>,
    pub max_retries: Option<u32>,
    pub args: Mapping,
}

fn take<T: serde::de::DeserializeOwned>(
    mapping: &mut Mapping,
    key: &str,
) -> Result<Option<T>, StepError> {
    match mapping.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_yaml::from_value(value)
            .map(Some)
            .map_err(|e| StepError::input(format!("key '{key}': {e}"))),
    }
}

impl StepDescriptor {
    pub fn new(step_type: impl Into<String>) -> Self {
        Self {
            step_type: step_type.into(),
            name: None,
            depends_on: vec![],
            input_node: None,
            input_path: None,
            max_retries: None,
            args: Mapping::new(),
        }
    }

    pub fn from_value(value: Value) -> Result<Self, StepError> {
        let Value::Mapping(mut mapping) = value else {
            return Err(StepError::input("a step must be a mapping"));
        };
        let step_type: String = take(&mut mapping, "step_type")?
            .ok_or_else(|| StepError::input("step is missing 'step_type'"))?;
        let depends_on = match take::<OneOrMany>(&mut mapping, "depends_on")? {
            None => vec![],
            Some(OneOrMany::One(name)) => vec![name],
            Some(OneOrMany::Many(names)) => names,
        };
        Ok(Self {
            name: take(&mut mapping, "name")?,
            input_node: take(&mut mapping, "input_node")?,
            input_path: take(&mut mapping, "input_path")?,
            max_retries: take(&mut mapping, "max_retries")?,
            step_type,
            depends_on,
            args: mapping,
        })
    }

    pub fn with_arg(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.args.insert(Value::String(key.to_string()), value.into());
        self
    }

    /// Layer the descriptor's own arguments over preset defaults.
    pub fn merge_defaults(&mut self, defaults: &Mapping) {
        for (key, value) in defaults {
            if !self.args.contains_key(key) {
                self.args.insert(key.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Result<StepDescriptor, StepError> {
        StepDescriptor::from_value(serde_yaml::from_str(yaml).unwrap())
    }

    #[test]
    fn common_keys_are_split_off() {
        let step = parse(
            "step_type: transform\nname: clean\ndepends_on: extract\ninput_node: {a: first}\ncommand: ls\n",
        )
        .unwrap();
        assert_eq!(step.step_type, "transform");
        assert_eq!(step.name.as_deref(), Some("clean"));
        assert_eq!(step.depends_on, vec!["extract"]);
        assert_eq!(
            step.input_node,
            Some(InputNodeSpec::Renamed(BTreeMap::from([(
                "a".to_string(),
                "first".to_string()
            )])))
        );
        assert_eq!(step.args.len(), 1);
        assert!(step.args.contains_key("command"));
    }

    #[test]
    fn missing_step_type_is_an_input_error() {
        let err = parse("name: x\n").unwrap_err();
        assert!(err.to_string().contains("step_type"));
        assert!(parse("- a\n").is_err());
    }

    #[test]
    fn defaults_sit_under_descriptor_arguments() {
        let mut step = parse("step_type: transform\ncommand: mine\n").unwrap();
        let defaults: Mapping = serde_yaml::from_str("command: preset\nno_input: true\n").unwrap();
        step.merge_defaults(&defaults);
        assert_eq!(step.args.get("command"), Some(&Value::from("mine")));
        assert_eq!(step.args.get("no_input"), Some(&Value::from(true)));
    }
}
