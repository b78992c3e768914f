use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// How often a compiled pipeline runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Frequency {
    OneTime,
    Hourly,
    Daily,
    Weekly,
}

impl Frequency {
    /// Orchestrator period string and, for one-time pipelines, the
    /// occurrence count.
    pub fn period(&self) -> (&'static str, Option<u32>) {
        match self {
            Frequency::OneTime => ("15 minutes", Some(1)),
            Frequency::Hourly => ("1 hour", None),
            Frequency::Daily => ("1 day", None),
            Frequency::Weekly => ("1 week", None),
        }
    }

    pub fn is_one_time(&self) -> bool {
        matches!(self, Frequency::OneTime)
    }
}

impl Display for Frequency {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Frequency::OneTime => "one-time",
            Frequency::Hourly => "hourly",
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
        };
        f.write_str(s)
    }
}
