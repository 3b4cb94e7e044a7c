// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Operational objects published by the configuration manager (cm-state and jobs)

use crate::records::{NsrId, VnfrId};
use crate::state::ConfigState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::net::IpAddr;

/// Configuration status of a VNF as reported by its config agent
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigStatus {
    #[default]
    Unknown,
    Configuring,
    Configured,
    Error,
}
impl Display for ConfigStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConfigStatus::Unknown => "unknown",
            ConfigStatus::Configuring => "configuring",
            ConfigStatus::Configured => "configured",
            ConfigStatus::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// Status of one primitive execution, and aggregate status of a job
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}
impl ExecutionStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, ExecutionStatus::Pending)
    }
    /// Aggregate the statuses of a job: any failure fails the job; any pending keeps it pending.
    pub fn aggregate(statuses: impl IntoIterator<Item = ExecutionStatus>) -> ExecutionStatus {
        let mut result = ExecutionStatus::Completed;
        for status in statuses {
            match status {
                ExecutionStatus::Failed => return ExecutionStatus::Failed,
                ExecutionStatus::Pending => result = ExecutionStatus::Pending,
                ExecutionStatus::Completed => {}
            }
        }
        result
    }
}
impl Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CmMgmtInterface {
    pub ip_address: Option<IpAddr>,
    pub port: Option<u16>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CmConnectionPoint {
    pub name: String,
    pub ip_address: Option<IpAddr>,
}

/// cm-state entry for one VNFR
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CmVnfr {
    pub id: VnfrId,
    pub name: String,
    pub state: ConfigState,
    pub mgmt_interface: CmMgmtInterface,
    pub cfg_type: Option<String>,
    pub cfg_location: Option<String>,
    pub connection_point: Vec<CmConnectionPoint>,
}

impl CmVnfr {
    #[must_use]
    pub fn new(id: VnfrId, name: &str) -> Self {
        Self {
            id,
            name: name.to_owned(),
            state: ConfigState::Init,
            mgmt_interface: CmMgmtInterface::default(),
            cfg_type: None,
            cfg_location: None,
            connection_point: vec![],
        }
    }
}

/// cm-state entry for one NSR
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CmNsr {
    pub id: NsrId,
    pub name: String,
    pub state: ConfigState,
    pub cm_vnfr: Vec<CmVnfr>,
}

impl CmNsr {
    #[must_use]
    pub fn new(id: NsrId, name: &str) -> Self {
        Self {
            id,
            name: name.to_owned(),
            state: ConfigState::Init,
            cm_vnfr: vec![],
        }
    }
    #[must_use]
    pub fn vnfr(&self, id: &VnfrId) -> Option<&CmVnfr> {
        self.cm_vnfr.iter().find(|v| &v.id == id)
    }
    pub fn vnfr_mut(&mut self, id: &VnfrId) -> Option<&mut CmVnfr> {
        self.cm_vnfr.iter_mut().find(|v| &v.id == id)
    }
}

/// The aggregate snapshot of all the NSRs tracked. Always published whole.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CmState {
    pub cm_nsr: Vec<CmNsr>,
}

impl CmState {
    #[must_use]
    pub fn nsr(&self, id: &NsrId) -> Option<&CmNsr> {
        self.cm_nsr.iter().find(|n| &n.id == id)
    }
}

/// One primitive execution within a job
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct JobPrimitive {
    pub name: String,
    pub execution_id: String,
    pub execution_status: ExecutionStatus,
    #[serde(default)]
    pub execution_error_details: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct JobVnfr {
    pub id: VnfrId,
    pub primitive: Vec<JobPrimitive>,
}

/// A config-agent job: the record of one exec-ns-config-primitive request
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConfigAgentJob {
    pub job_id: u64,
    pub job_name: String,
    pub nsr_id: NsrId,
    pub job_status: ExecutionStatus,
    pub triggered_by: String,
    pub create_time: DateTime<Utc>,
    pub vnfr: Vec<JobVnfr>,
    #[serde(default)]
    pub job_status_details: Option<String>,
}

impl ConfigAgentJob {
    /// Recompute the aggregate status out of the primitive executions
    pub fn refresh_status(&mut self) {
        let statuses = self
            .vnfr
            .iter()
            .flat_map(|v| v.primitive.iter().map(|p| p.execution_status));
        if self.vnfr.is_empty() {
            return;
        }
        self.job_status = ExecutionStatus::aggregate(statuses);
    }
    #[must_use]
    pub fn pending_executions(&self) -> Vec<String> {
        self.vnfr
            .iter()
            .flat_map(|v| v.primitive.iter())
            .filter(|p| p.execution_status == ExecutionStatus::Pending)
            .map(|p| p.execution_id.clone())
            .collect()
    }
}
