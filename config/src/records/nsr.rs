// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Network service records

use super::{NsrId, VnfrId};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Operational status of an NSR, as set by the orchestrator
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NsrOperStatus {
    #[default]
    Init,
    VlInitPhase,
    VnfInitPhase,
    Running,
    Terminate,
    VnfTerminatePhase,
    VlTerminatePhase,
    Terminated,
    Failed,
}
impl Display for NsrOperStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NsrOperStatus::Init => "init",
            NsrOperStatus::VlInitPhase => "vl-init-phase",
            NsrOperStatus::VnfInitPhase => "vnf-init-phase",
            NsrOperStatus::Running => "running",
            NsrOperStatus::Terminate => "terminate",
            NsrOperStatus::VnfTerminatePhase => "vnf-terminate-phase",
            NsrOperStatus::VlTerminatePhase => "vl-terminate-phase",
            NsrOperStatus::Terminated => "terminated",
            NsrOperStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// A running network service instance
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Nsr {
    pub id: NsrId,
    pub name: String,
    pub nsd_ref: String,
    #[serde(default)]
    pub operational_status: NsrOperStatus,
    #[serde(default)]
    pub constituent_vnfr_ref: Vec<VnfrId>,
}

impl Nsr {
    #[must_use]
    pub fn new(id: impl Into<NsrId>, name: &str, nsd_ref: &str) -> Self {
        Self {
            id: id.into(),
            name: name.to_owned(),
            nsd_ref: nsd_ref.to_owned(),
            ..Self::default()
        }
    }
    #[must_use]
    pub fn set_status(mut self, status: NsrOperStatus) -> Self {
        self.operational_status = status;
        self
    }
    #[must_use]
    pub fn add_vnfr(mut self, vnfr: impl Into<VnfrId>) -> Self {
        self.constituent_vnfr_ref.push(vnfr.into());
        self
    }
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.operational_status == NsrOperStatus::Running
    }
}

/// An xpath-addressed input parameter supplied when the NS was instantiated
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct InputParameter {
    pub xpath: String,
    pub value: String,
}

/// The user-provided configuration of an NSR
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NsrConfig {
    pub id: NsrId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub input_parameter: Vec<InputParameter>,
}
