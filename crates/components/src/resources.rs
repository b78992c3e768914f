use crate::object::{ObjectId, PipelineObject};
use common::config::components::resources::{Ec2Config, EmrConfig};
use common::types::S3Path;

pub const EC2_RESOURCE_ID: &str = "Ec2Resource";
pub const EMR_CLUSTER_ID: &str = "EmrCluster";

/// On-demand VM that shell, copy and SQL activities run on.
#[derive(Debug, Clone)]
pub struct Ec2Resource {
    pub id: ObjectId,
    pub schedule: ObjectId,
    pub config: Ec2Config,
    pub log_uri: S3Path,
    pub role: String,
    pub resource_role: String,
}

impl Ec2Resource {
    pub(crate) fn lower(&self) -> PipelineObject {
        let c = &self.config;
        let mut object = PipelineObject::new(&self.id, "Ec2Resource");
        object
            .set("schedule", &self.schedule)
            .set("instanceType", c.instance_type.as_str())
            .set_opt("imageId", c.ami.as_deref())
            .set_opt("securityGroups", c.security_group.as_deref())
            .set_all("securityGroupIds", c.security_group_ids.iter().map(String::as_str))
            .set_opt("subnetId", c.subnet_id.as_deref())
            .set_opt("keyPair", c.key_pair.as_deref())
            .set("terminateAfter", c.terminate_after.as_str())
            .set("logUri", &self.log_uri)
            .set("role", self.role.as_str())
            .set("resourceRole", self.resource_role.as_str());
        object
    }
}

#[derive(Debug, Clone)]
pub struct EmrCluster {
    pub id: ObjectId,
    pub schedule: ObjectId,
    pub config: EmrConfig,
    pub log_uri: S3Path,
    pub role: String,
    pub resource_role: String,
}

impl EmrCluster {
    pub fn ami_major(&self) -> u32 {
        self.config.ami_major()
    }

    pub(crate) fn lower(&self) -> PipelineObject {
        let c = &self.config;
        let mut object = PipelineObject::new(&self.id, "EmrCluster");
        object
            .set("schedule", &self.schedule)
            .set("masterInstanceType", c.master_instance_type.as_str())
            .set("coreInstanceType", c.core_instance_type.as_str())
            .set("coreInstanceCount", c.num_core_instances);
        if c.num_task_instances > 0 {
            object
                .set_opt("taskInstanceType", c.task_instance_type.as_deref())
                .set("taskInstanceCount", c.num_task_instances)
                .set_opt("taskInstanceBidPrice", c.task_bid_price.as_deref());
        }
        object
            .set("amiVersion", c.ami_version.as_str())
            .set("terminateAfter", c.terminate_after.as_str())
            .set_opt("keyPair", c.key_pair.as_deref())
            .set_opt("subnetId", c.subnet_id.as_deref())
            .set_all("bootstrapAction", c.bootstrap_actions.iter().map(String::as_str))
            .set("logUri", &self.log_uri)
            .set("role", self.role.as_str())
            .set("resourceRole", self.resource_role.as_str());
        object
    }
}
