// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The built-in config agent. It configures VNFs over NETCONF or by running a script with
//! the materialized configuration of the VNF, and runs the user-defined scripts of
//! primitives.

use async_trait::async_trait;
use config::records::{AgentType, ConfigAgentAccount, ConfigMethod, NetconfMethod};
use config::rpc::{PrimitiveOutput, VnfPrimitiveRequest};
use config::status::{ConfigStatus, ExecutionStatus};
use config::{ConfigState, VnfrId};
use ordermap::OrderMap;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
#[allow(unused)]
use tracing::{debug, error, info, warn};

use super::netconf::{NetconfConnector, NetconfTarget, TcpNetconfConnector, connect_with_retry};
use super::script::{resolve_script, run_script, spawn_ns_script};
use super::{
    AgentError, AgentResult, ConfigAgentPlugin, NsConfigRequest, NsConfigTask, NsrInfo, VnfCfg,
    VnfProgress,
};
use crate::processor::params::CmParams;
use crate::processor::xlate::file_name_safe;

/// Timing and paths the built-in agent needs
#[derive(Clone, Debug)]
pub struct RiftCaParams {
    pub connection_timeout: Duration,
    pub connection_retry_interval: Duration,
    pub script_dir: PathBuf,
}
impl From<&CmParams> for RiftCaParams {
    fn from(params: &CmParams) -> Self {
        Self {
            connection_timeout: params.connection_timeout,
            connection_retry_interval: params.connection_retry_interval,
            script_dir: params.script_dir(),
        }
    }
}

pub struct RiftCaAgent {
    name: String,
    params: RiftCaParams,
    netconf: Arc<dyn NetconfConnector>,
    /// managed VNFs and their configuration status
    vnfs: RwLock<OrderMap<VnfrId, ConfigStatus>>,
    executions: Mutex<OrderMap<String, ExecutionStatus>>,
}

/// Input of the script of a VNF primitive
#[derive(Serialize)]
struct PrimitiveInput<'a> {
    vnfr_name: &'a str,
    unit_name: String,
    mgmt_ip_address: Option<std::net::IpAddr>,
    mgmt_port: Option<u16>,
    primitive: &'a str,
    parameter: BTreeMap<&'a str, &'a str>,
}

impl RiftCaAgent {
    #[must_use]
    pub fn new(params: RiftCaParams) -> Self {
        Self::with_connector(params, Arc::new(TcpNetconfConnector))
    }
    #[must_use]
    pub fn with_connector(params: RiftCaParams, netconf: Arc<dyn NetconfConnector>) -> Self {
        Self {
            name: ConfigAgentAccount::DEFAULT_NAME.to_string(),
            params,
            netconf,
            vnfs: RwLock::new(OrderMap::new()),
            executions: Mutex::new(OrderMap::new()),
        }
    }

    fn status(&self, id: &VnfrId) -> Option<ConfigStatus> {
        self.vnfs.read().get(id).copied()
    }
    fn set_status(&self, id: &VnfrId, status: ConfigStatus) {
        if let Some(current) = self.vnfs.write().get_mut(id) {
            *current = status;
        }
    }

    async fn apply_script(&self, vnf: &VnfCfg, progress: &VnfProgress) -> AgentResult<()> {
        let Some(cfg_file) = &vnf.cfg_file else {
            info!("{}: no configuration to apply", vnf.describe());
            return Ok(());
        };
        progress.report(ConfigState::CfgSend).await;
        run_script(vnf.script_type.as_deref(), cfg_file, std::iter::empty::<&str>()).await
    }

    async fn apply_netconf(&self, vnf: &VnfCfg, progress: &VnfProgress) -> AgentResult<()> {
        let (Some(cfg_file), Some(host)) = (&vnf.cfg_file, vnf.mgmt_ip) else {
            self.set_status(vnf.id(), ConfigStatus::Error);
            return Err(AgentError::BadConfig(format!(
                "{}: NETCONF needs a configuration file and a management address",
                vnf.describe()
            )));
        };
        let method = vnf
            .vnfr
            .vnf_configuration
            .as_ref()
            .and_then(|c| c.netconf.clone())
            .unwrap_or_default();
        let payload = tokio::fs::read_to_string(cfg_file).await?;
        let target = NetconfTarget {
            host,
            port: vnf
                .mgmt_port
                .or(method.port)
                .unwrap_or(NetconfMethod::DEFAULT_PORT),
        };

        let mut session = match connect_with_retry(
            self.netconf.as_ref(),
            &target,
            progress,
            self.params.connection_timeout,
            self.params.connection_retry_interval,
        )
        .await
        {
            Ok(session) => session,
            Err(e) => {
                // connection budget spent: no retry within this pass
                self.set_status(vnf.id(), ConfigStatus::Error);
                return Err(e.into());
            }
        };
        progress.report(ConfigState::CfgSend).await;
        let result = session.edit_config(&method.target, &payload).await;
        session.close().await;
        result.map_err(AgentError::from)
    }
}

#[async_trait]
impl ConfigAgentPlugin for RiftCaAgent {
    fn agent_type(&self) -> AgentType {
        AgentType::RiftCa
    }
    fn name(&self) -> &str {
        &self.name
    }

    async fn notify_create_vnfr(&self, _nsr: &NsrInfo, vnf: &VnfCfg) -> AgentResult<bool> {
        Ok(self.is_vnfr_managed(vnf.id()))
    }

    async fn notify_terminate_vnfr(&self, _nsr: &NsrInfo, vnf: &VnfCfg) -> AgentResult<()> {
        debug!("Forgetting {}", vnf.describe());
        self.remove_vnfr_managed(vnf.id());
        Ok(())
    }

    async fn apply_initial_config(
        &self,
        _nsr: &NsrInfo,
        vnf: &VnfCfg,
        progress: &VnfProgress,
    ) -> AgentResult<bool> {
        match self.status(vnf.id()) {
            None => return Err(AgentError::NotManaged(vnf.id().clone())),
            Some(ConfigStatus::Configured) => {
                debug!("{} is already configured", vnf.describe());
                return Ok(true);
            }
            Some(_) => self.set_status(vnf.id(), ConfigStatus::Configuring),
        }
        let result = match vnf.method {
            ConfigMethod::Script => self.apply_script(vnf, progress).await,
            ConfigMethod::Netconf => self.apply_netconf(vnf, progress).await,
            other => {
                self.set_status(vnf.id(), ConfigStatus::Error);
                Err(AgentError::Unsupported(other.to_string()))
            }
        };
        result?;
        self.set_status(vnf.id(), ConfigStatus::Configured);
        info!("Applied initial configuration of {}", vnf.describe());
        Ok(true)
    }

    async fn apply_ns_config(
        &self,
        nsr: &NsrInfo,
        vnfs: &[VnfCfg],
        request: &NsConfigRequest,
    ) -> AgentResult<Option<NsConfigTask>> {
        let task = spawn_ns_script(nsr, vnfs, request, &self.params.script_dir).await?;
        Ok(Some(task))
    }

    async fn vnf_config_primitive(
        &self,
        nsr: &NsrInfo,
        vnf: &VnfCfg,
        primitive: &VnfPrimitiveRequest,
        output: &mut PrimitiveOutput,
    ) -> AgentResult<()> {
        output.execution_id = uuid::Uuid::new_v4().to_string();
        let script = vnf
            .vnfr
            .vnf_configuration
            .as_ref()
            .and_then(|c| c.primitive(&primitive.name))
            .and_then(|p| p.user_defined_script.clone());
        let Some(script) = script else {
            output.set_failed(format!("primitive '{}' has no script", primitive.name));
            self.executions
                .lock()
                .insert(output.execution_id.clone(), output.execution_status);
            return Ok(());
        };

        let input = PrimitiveInput {
            vnfr_name: &vnf.vnfr.name,
            unit_name: vnf.unique_name(),
            mgmt_ip_address: vnf.mgmt_ip,
            mgmt_port: vnf.mgmt_port,
            primitive: &primitive.name,
            parameter: primitive
                .parameter
                .iter()
                .map(|p| (p.name.as_str(), p.value.as_str()))
                .collect(),
        };
        let yaml = serde_yaml_ng::to_string(&input)
            .map_err(|e| AgentError::BadConfig(e.to_string()))?;
        tokio::fs::create_dir_all(&nsr.dir).await?;
        let input_file = nsr
            .dir
            .join(file_name_safe(&format!("{}-{}.yaml", primitive.name, output.execution_id)));
        tokio::fs::write(&input_file, yaml).await?;

        let script = resolve_script(&self.params.script_dir, &script);
        match run_script(None, &script, [&input_file]).await {
            Ok(()) => output.execution_status = ExecutionStatus::Completed,
            Err(e) => output.set_failed(e.to_string()),
        }
        self.executions
            .lock()
            .insert(output.execution_id.clone(), output.execution_status);
        Ok(())
    }

    async fn get_config_status(&self, _nsr: &NsrInfo, vnf: &VnfCfg) -> AgentResult<ConfigStatus> {
        self.status(vnf.id())
            .ok_or_else(|| AgentError::NotManaged(vnf.id().clone()))
    }

    fn get_action_status(&self, execution_id: &str) -> Option<ExecutionStatus> {
        self.executions.lock().get(execution_id).copied()
    }

    fn is_vnfr_managed(&self, vnfr_id: &VnfrId) -> bool {
        self.vnfs.read().contains_key(vnfr_id)
    }

    fn add_vnfr_managed(&self, vnf: &VnfCfg) -> AgentResult<()> {
        if !matches!(vnf.method, ConfigMethod::Script | ConfigMethod::Netconf) {
            return Err(AgentError::Unsupported(vnf.method.to_string()));
        }
        self.vnfs
            .write()
            .entry(vnf.id().clone())
            .or_insert(ConfigStatus::Unknown);
        Ok(())
    }

    fn remove_vnfr_managed(&self, vnfr_id: &VnfrId) {
        self.vnfs.write().remove(vnfr_id);
    }
}
