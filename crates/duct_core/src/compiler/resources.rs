use crate::error::CompileError;
use common::config::DuctConfig;
use common::types::S3Path;
use components::resources::{EC2_RESOURCE_ID, EMR_CLUSTER_ID};
use components::{Ec2Resource, EmrCluster, ObjectId, Runner, WorkflowGraph};
use log::info;
use serde_yaml::Value;

/// Runners that are only added to the graph once some step needs them.
#[derive(Debug)]
pub(crate) struct ResourcePool<'a> {
    config: &'a DuctConfig,
    ec2_overrides: Option<&'a Value>,
    emr_overrides: Option<&'a Value>,
    worker_group: Option<String>,
    schedule: ObjectId,
    log_uri: S3Path,
    ec2: Option<Runner>,
    emr: Option<(Runner, u32)>,
}

impl<'a> ResourcePool<'a> {
    pub(crate) fn new(
        config: &'a DuctConfig,
        ec2_overrides: Option<&'a Value>,
        emr_overrides: Option<&'a Value>,
        worker_group: Option<String>,
        schedule: ObjectId,
        log_uri: S3Path,
    ) -> Self {
        Self {
            config,
            ec2_overrides,
            emr_overrides,
            worker_group,
            schedule,
            log_uri,
            ec2: None,
            emr: None,
        }
    }

    /// The VM runner, or the worker group standing in for it. The flag is
    /// set the first time, when the caller owes the bootstrap steps.
    pub(crate) fn ec2(&mut self, graph: &mut WorkflowGraph) -> Result<(Runner, bool), CompileError> {
        if let Some(runner) = &self.ec2 {
            return Ok((runner.clone(), false));
        }
        let runner = match &self.worker_group {
            Some(group) => {
                info!("activities run on worker group '{group}'");
                Runner::WorkerGroup(group.clone())
            }
            None => {
                let config = match self.ec2_overrides {
                    Some(overrides) => self.config.ec2.with_overrides(overrides)?,
                    None => self.config.ec2.clone(),
                };
                let id = graph.add(Ec2Resource {
                    id: ObjectId::new(EC2_RESOURCE_ID),
                    schedule: self.schedule.clone(),
                    config,
                    log_uri: self.log_uri.clone(),
                    role: self.config.etl.role()?.to_string(),
                    resource_role: self.config.etl.resource_role()?.to_string(),
                })?;
                info!("materialized {id}");
                Runner::Resource(id)
            }
        };
        self.ec2 = Some(runner.clone());
        Ok((runner, true))
    }

    /// The cluster runner and its AMI major version.
    pub(crate) fn emr(&mut self, graph: &mut WorkflowGraph) -> Result<(Runner, u32, bool), CompileError> {
        if let Some((runner, ami)) = &self.emr {
            return Ok((runner.clone(), *ami, false));
        }
        let config = match self.emr_overrides {
            Some(overrides) => self.config.emr.with_overrides(overrides)?,
            None => self.config.emr.clone(),
        };
        let cluster = EmrCluster {
            id: ObjectId::new(EMR_CLUSTER_ID),
            schedule: self.schedule.clone(),
            config,
            log_uri: self.log_uri.clone(),
            role: self.config.etl.role()?.to_string(),
            resource_role: self.config.etl.resource_role()?.to_string(),
        };
        let ami = cluster.ami_major();
        let id = graph.add(cluster)?;
        info!("materialized {id} (AMI {ami}.x)");
        let runner = Runner::Resource(id);
        self.emr = Some((runner.clone(), ami));
        Ok((runner, ami, true))
    }
}
