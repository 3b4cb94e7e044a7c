// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Inputs and outputs of the two RPCs served by the configuration manager:
//! `exec-ns-config-primitive` and `get-ns-config-primitive-values`.

use crate::records::{NameValue, NsrId, VnfrId};
use crate::status::ExecutionStatus;
use serde::{Deserialize, Serialize};

/// One VNF primitive invocation requested through `exec-ns-config-primitive`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct VnfPrimitiveRequest {
    pub name: String,
    pub index: u32,
    #[serde(default)]
    pub parameter: Vec<NameValue>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct VnfRequest {
    pub member_vnf_index_ref: u32,
    pub vnfr_id_ref: VnfrId,
    #[serde(default)]
    pub vnf_primitive: Vec<VnfPrimitiveRequest>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExecNsConfigPrimitiveInput {
    pub nsr_id_ref: NsrId,
    pub name: String,
    #[serde(default)]
    pub user_defined_script: Option<String>,
    #[serde(default)]
    pub parameter: Vec<NameValue>,
    #[serde(default)]
    pub vnf_list: Vec<VnfRequest>,
    #[serde(default = "ExecNsConfigPrimitiveInput::default_trigger")]
    pub triggered_by: String,
}
impl ExecNsConfigPrimitiveInput {
    fn default_trigger() -> String {
        "user".to_string()
    }
    #[must_use]
    pub fn new(nsr_id: impl Into<NsrId>, name: &str) -> Self {
        Self {
            nsr_id_ref: nsr_id.into(),
            name: name.to_owned(),
            triggered_by: Self::default_trigger(),
            ..Self::default()
        }
    }
    #[must_use]
    pub fn add_vnf(mut self, vnf: VnfRequest) -> Self {
        self.vnf_list.push(vnf);
        self
    }
}

/// Result of one VNF primitive execution. Agents fill `execution_status`, `execution_id`
/// and optionally `execution_error_details`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PrimitiveOutput {
    pub name: String,
    pub index: u32,
    pub execution_id: String,
    pub execution_status: ExecutionStatus,
    #[serde(default)]
    pub execution_error_details: Option<String>,
}
impl PrimitiveOutput {
    #[must_use]
    pub fn new(name: &str, index: u32) -> Self {
        Self {
            name: name.to_owned(),
            index,
            ..Self::default()
        }
    }
    pub fn set_failed(&mut self, details: impl Into<String>) {
        self.execution_status = ExecutionStatus::Failed;
        self.execution_error_details = Some(details.into());
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct VnfOut {
    pub vnfr_id_ref: VnfrId,
    pub member_vnf_index_ref: u32,
    pub vnf_out_primitive: Vec<PrimitiveOutput>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExecNsConfigPrimitiveOutput {
    pub job_id: u64,
    pub job_status: ExecutionStatus,
    pub nsr_id_ref: NsrId,
    pub name: String,
    pub vnf_out_list: Vec<VnfOut>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GetNsConfigPrimitiveValuesInput {
    pub nsr_id_ref: NsrId,
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct VnfPrimitiveValues {
    pub name: String,
    pub index: u32,
    pub parameter: Vec<NameValue>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct VnfPrimitiveGroupValues {
    pub member_vnf_index_ref: u32,
    pub vnfd_id_ref: String,
    pub inputs: Vec<VnfPrimitiveValues>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GetNsConfigPrimitiveValuesOutput {
    pub ns_parameter: Vec<NameValue>,
    pub vnf_primitive_group: Vec<VnfPrimitiveGroupValues>,
}

impl GetNsConfigPrimitiveValuesOutput {
    #[must_use]
    pub fn ns_value(&self, name: &str) -> Option<&str> {
        self.ns_parameter
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }
}
