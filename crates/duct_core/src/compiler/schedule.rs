use crate::definition::{parse_clock, LoadTime};
use crate::error::CompileError;
use chrono::{DateTime, Duration, NaiveDateTime, Timelike, Utc};
use common::config::components::etl::EtlConfig;
use common::types::{Frequency, S3Path};
use steps::StepPaths;

pub const START_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
/// Data prefix segment that separates the runs of a scheduled pipeline.
pub const RUN_PLACEHOLDER: &str = "#{format(@scheduledStartTime,'YYYY-MM-dd_HHmmss')}";
pub const DEFINITION_FILE: &str = "pipeline_definition.json";

/// `version_<utc yyyymmddhhmmss>`: keeps each compilation's scratch data
/// apart from earlier runs.
pub fn version_name(now: DateTime<Utc>) -> String {
    format!("version_{}", now.format("%Y%m%d%H%M%S"))
}

fn period(frequency: Frequency) -> Duration {
    match frequency {
        Frequency::OneTime => Duration::zero(),
        Frequency::Hourly => Duration::hours(1),
        Frequency::Daily => Duration::days(1),
        Frequency::Weekly => Duration::weeks(1),
    }
}

/// `Nd`, `Nh` or `Nm`, optionally negative.
pub fn parse_time_delta(delta: &str) -> Result<Duration, CompileError> {
    let invalid = || CompileError::input(format!("time_delta '{delta}' is not of the form Nd, Nh or Nm"));
    let delta = delta.trim();
    let unit = delta.chars().last().ok_or_else(invalid)?;
    let amount: i64 = delta[..delta.len() - unit.len_utf8()]
        .trim()
        .parse()
        .map_err(|_| invalid())?;
    let duration = match unit {
        'd' => Duration::try_days(amount),
        'h' => Duration::try_hours(amount),
        'm' => Duration::try_minutes(amount),
        _ => return Err(invalid()),
    };
    duration.ok_or_else(|| CompileError::input(format!("time_delta '{delta}' is out of range")))
}

/// First scheduled start. One-time pipelines start now; scheduled ones at
/// the next `load_time` that is not in the past, shifted by `time_delta`.
pub fn start_date_time(
    frequency: Frequency,
    load_time: Option<&LoadTime>,
    default_load_time: &str,
    time_delta: Option<&str>,
    now: DateTime<Utc>,
) -> Result<NaiveDateTime, CompileError> {
    let now = now.naive_utc().with_nanosecond(0).unwrap_or(now.naive_utc());
    let start = match frequency {
        Frequency::OneTime => now,
        Frequency::Hourly => {
            let minute = match load_time {
                Some(LoadTime::Minutes(m)) => m % 60,
                Some(clock) => clock.hour_minute()?.1,
                None => 0,
            };
            let candidate = at(now, now.hour(), minute)?;
            if candidate < now {
                candidate + period(frequency)
            } else {
                candidate
            }
        }
        Frequency::Daily | Frequency::Weekly => {
            let (hour, minute) = match load_time {
                Some(load_time) => load_time.hour_minute()?,
                None => parse_clock(default_load_time)?,
            };
            let candidate = at(now, hour, minute)?;
            if candidate < now {
                candidate + period(frequency)
            } else {
                candidate
            }
        }
    };
    match time_delta {
        Some(delta) => start
            .checked_add_signed(parse_time_delta(delta)?)
            .ok_or_else(|| {
                CompileError::input(format!("time_delta '{delta}' moves the start out of range"))
            }),
        None => Ok(start),
    }
}

fn at(day: NaiveDateTime, hour: u32, minute: u32) -> Result<NaiveDateTime, CompileError> {
    day.date()
        .and_hms_opt(hour, minute, 0)
        .ok_or_else(|| CompileError::input(format!("invalid load time {hour:02}:{minute:02}")))
}

/// Versioned scratch prefixes of one compiled pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelinePaths {
    pub src: S3Path,
    pub data: S3Path,
    pub logs: S3Path,
    pub qa: S3Path,
}

impl PipelinePaths {
    pub fn new(
        etl: &EtlConfig,
        pipeline: &str,
        version: &str,
        frequency: Frequency,
    ) -> Result<Self, CompileError> {
        let base = S3Path::directory(etl.bucket()?, etl.base_path());
        let section = |name: &str| base.join_dir(name).join_dir(pipeline).join_dir(version);
        let mut data = section("data");
        if !frequency.is_one_time() {
            data = data.join_dir(RUN_PLACEHOLDER);
        }
        Ok(Self {
            src: section("src"),
            data,
            logs: section("logs"),
            qa: base.join_dir(&etl.qa_log_path).join_dir(pipeline),
        })
    }

    pub fn for_step(&self, step_id: &str) -> StepPaths {
        StepPaths {
            src: self.src.join_dir(step_id),
            data: self.data.join_dir(step_id),
            logs: self.logs.join_dir(step_id),
        }
    }

    /// Where activation writes the definition document.
    pub fn definition(&self) -> S3Path {
        self.src.join_file(DEFINITION_FILE)
    }
}
