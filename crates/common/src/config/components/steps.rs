use serde::Deserialize;
use serde_yaml::{Mapping, Value};

/// Step descriptors injected ahead of the real work on each resource type.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct BootstrapConfig {
    pub ec2: Vec<Value>,
    pub emr: Vec<Value>,
}

impl BootstrapConfig {
    pub fn is_empty(&self) -> bool {
        self.ec2.is_empty() && self.emr.is_empty()
    }
}

/// A step kind registered at start-up as an alias of a built-in step with
/// preset arguments.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomStepConfig {
    pub step_type: String,
    pub base: String,
    #[serde(default)]
    pub defaults: Mapping,
}
