use crate::object::{ObjectId, PipelineObject};
use common::types::{Frequency, S3Path};

pub const DEFAULT_OBJECT_ID: &str = "Default";
pub const SCHEDULE_ID: &str = "DefaultSchedule";
pub const FAILURE_ALARM_ID: &str = "FailureAlarm";

#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    pub id: ObjectId,
    /// `YYYY-MM-DDTHH:MM:SS`, the form the orchestrator expects.
    pub start_date_time: String,
    pub period: String,
    pub occurrences: Option<u32>,
}

impl Schedule {
    pub fn new(start_date_time: impl Into<String>, frequency: Frequency) -> Self {
        let (period, occurrences) = frequency.period();
        Self {
            id: ObjectId::new(SCHEDULE_ID),
            start_date_time: start_date_time.into(),
            period: period.to_string(),
            occurrences,
        }
    }

    pub(crate) fn lower(&self) -> PipelineObject {
        let mut object = PipelineObject::new(&self.id, "Schedule");
        object
            .set("startDateTime", self.start_date_time.as_str())
            .set("period", self.period.as_str())
            .set_opt("occurrences", self.occurrences);
        object
    }
}

/// Pipeline-wide defaults inherited by every other object.
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultObject {
    pub id: ObjectId,
    pub role: String,
    pub resource_role: String,
    pub pipeline_log_uri: S3Path,
    pub schedule: ObjectId,
    pub failure_and_rerun_mode: String,
    pub on_fail: Option<ObjectId>,
}

impl DefaultObject {
    pub fn new(
        role: impl Into<String>,
        resource_role: impl Into<String>,
        pipeline_log_uri: S3Path,
        schedule: &ObjectId,
    ) -> Self {
        Self {
            id: ObjectId::new(DEFAULT_OBJECT_ID),
            role: role.into(),
            resource_role: resource_role.into(),
            pipeline_log_uri,
            schedule: schedule.clone(),
            failure_and_rerun_mode: "CASCADE".to_string(),
            on_fail: None,
        }
    }

    pub(crate) fn lower(&self) -> PipelineObject {
        let mut object = PipelineObject::untyped(&self.id);
        object
            .set("scheduleType", "cron")
            .set("failureAndRerunMode", self.failure_and_rerun_mode.as_str())
            .set("role", self.role.as_str())
            .set("resourceRole", self.resource_role.as_str())
            .set("pipelineLogUri", &self.pipeline_log_uri)
            .set("schedule", &self.schedule)
            .set_opt("onFail", self.on_fail.as_ref());
        object
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnsAlarm {
    pub id: ObjectId,
    pub topic_arn: String,
    pub subject: String,
    pub message: String,
    pub role: String,
}

impl SnsAlarm {
    /// Failure alarm whose message interpolates the failing object's
    /// runtime attributes.
    pub fn failure(topic_arn: impl Into<String>, pipeline_name: &str, role: impl Into<String>) -> Self {
        Self {
            id: ObjectId::new(FAILURE_ALARM_ID),
            topic_arn: topic_arn.into(),
            subject: format!("Data Pipeline Failure: {pipeline_name}"),
            message: [
                "Error for interval #{node.@scheduledStartTime}..#{node.@scheduledEndTime}.",
                "Object: #{node.name}",
                "Error message: #{node.errorMessage}",
                "Error stack trace: #{node.errorStackTrace}",
            ]
            .join("\n"),
            role: role.into(),
        }
    }

    pub(crate) fn lower(&self) -> PipelineObject {
        let mut object = PipelineObject::new(&self.id, "SnsAlarm");
        object
            .set("topicArn", self.topic_arn.as_str())
            .set("subject", self.subject.as_str())
            .set("message", self.message.as_str())
            .set("role", self.role.as_str());
        object
    }
}
