// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Config agents: the backends that apply configuration to VNFs.
//!
//! Every backend implements [`ConfigAgentPlugin`]. The [`registry::ConfigAgentRegistry`]
//! keeps one live plugin per [`AgentType`] and routes calls for a VNFR to the plugin that
//! manages it.

pub mod juju;
pub mod netconf;
pub mod registry;
pub mod riftca;
pub mod script;

use async_trait::async_trait;
use config::VnfrId;
use config::records::{AgentType, NameValue};
use config::rpc::{PrimitiveOutput, VnfPrimitiveRequest};
use config::status::{ConfigStatus, ExecutionStatus};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracectl::trace_target;

pub use crate::processor::state::{NsrInfo, VnfCfg, VnfProgress};
use juju::JujuError;
use netconf::NetconfErr;

trace_target!("agents", tracectl::LevelFilter::INFO, &["management", "agents"]);

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("NETCONF failure: {0}")]
    Netconf(#[from] NetconfErr),
    #[error("Juju failure: {0}")]
    Juju(#[from] JujuError),
    #[error("Script {script} failed: {reason}")]
    Script { script: String, reason: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("VNFR {0} is not managed by this agent")]
    NotManaged(VnfrId),
    #[error("Unsupported configuration method '{0}'")]
    Unsupported(String),
    #[error("Bad configuration: {0}")]
    BadConfig(String),
}

pub type AgentResult<T> = Result<T, AgentError>;

/// Completion handle of an NS-level script
pub type NsConfigTask = JoinHandle<AgentResult<bool>>;

/// An NS-level configuration request: a user-defined script run with a view of the NSR
#[derive(Clone, Debug, PartialEq)]
pub struct NsConfigRequest {
    pub name: String,
    pub user_defined_script: String,
    pub parameter: Vec<NameValue>,
    pub triggered_by: String,
}

#[async_trait]
pub trait ConfigAgentPlugin: Send + Sync {
    fn agent_type(&self) -> AgentType;

    /// Name of the config-agent account the plugin serves
    fn name(&self) -> &str;

    /// A VNFR now exists. Returns whether the agent will manage it.
    async fn notify_create_vnfr(&self, nsr: &NsrInfo, vnf: &VnfCfg) -> AgentResult<bool>;

    async fn notify_terminate_vnfr(&self, nsr: &NsrInfo, vnf: &VnfCfg) -> AgentResult<()>;

    /// Apply the initial configuration of a VNF. Calling this on a VNF that is already
    /// configured must not configure it again.
    async fn apply_initial_config(
        &self,
        nsr: &NsrInfo,
        vnf: &VnfCfg,
        progress: &VnfProgress,
    ) -> AgentResult<bool>;

    /// Start an NS-level script. `vnfs` are the VNFs of the NSR this agent manages.
    async fn apply_ns_config(
        &self,
        nsr: &NsrInfo,
        vnfs: &[VnfCfg],
        request: &NsConfigRequest,
    ) -> AgentResult<Option<NsConfigTask>>;

    /// Execute one config primitive on a VNF, recording the execution in `output`
    async fn vnf_config_primitive(
        &self,
        nsr: &NsrInfo,
        vnf: &VnfCfg,
        primitive: &VnfPrimitiveRequest,
        output: &mut PrimitiveOutput,
    ) -> AgentResult<()>;

    async fn get_config_status(&self, nsr: &NsrInfo, vnf: &VnfCfg) -> AgentResult<ConfigStatus>;

    /// Last known status of a primitive execution. Must not block.
    fn get_action_status(&self, execution_id: &str) -> Option<ExecutionStatus>;

    /// Refresh the status of a primitive execution from the backend, if it has one
    async fn poll_action_status(&self, _execution_id: &str) {}

    fn is_vnfr_managed(&self, vnfr_id: &VnfrId) -> bool;

    fn add_vnfr_managed(&self, vnf: &VnfCfg) -> AgentResult<()>;

    fn remove_vnfr_managed(&self, vnfr_id: &VnfrId);
}
