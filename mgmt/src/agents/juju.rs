// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The Juju config agent: VNFs are charm services, deployed when their VNFR is created and
//! configured through charm config and actions.

use async_trait::async_trait;
use config::ConfigState;
use config::VnfrId;
use config::records::{AgentType, JujuAccount, NameValue};
use config::rpc::{PrimitiveOutput, VnfPrimitiveRequest};
use config::status::{ConfigStatus, ExecutionStatus};
use ordermap::OrderMap;
use parking_lot::{Mutex, RwLock};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
#[allow(unused)]
use tracing::{debug, error, info, warn};

use super::script::spawn_ns_script;
use super::{
    AgentError, AgentResult, ConfigAgentPlugin, NsConfigRequest, NsConfigTask, NsrInfo, VnfCfg,
    VnfProgress,
};
use crate::processor::params::CmParams;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum JujuError {
    #[error("Not connected to the Juju controller")]
    NotConnected,
    #[error("Juju API error: {0}")]
    Api(String),
    #[error("No such service or action: {0}")]
    NotFound(String),
    #[error("Timed out waiting for {0}")]
    Timeout(String),
}

/// Status of a charm service
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceStatus {
    Unknown,
    Maintenance,
    Active,
    Blocked,
    Error,
    Terminated,
}

impl From<ServiceStatus> for ConfigStatus {
    fn from(status: ServiceStatus) -> Self {
        match status {
            ServiceStatus::Active => ConfigStatus::Configured,
            ServiceStatus::Maintenance | ServiceStatus::Blocked => ConfigStatus::Configuring,
            ServiceStatus::Error => ConfigStatus::Error,
            ServiceStatus::Unknown | ServiceStatus::Terminated => ConfigStatus::Unknown,
        }
    }
}

/// Calls of the Juju controller API the agent relies on
#[async_trait]
pub trait JujuApi: Send + Sync {
    async fn deploy(&self, service: &str, charm: &str, config: &[NameValue]) -> Result<(), JujuError>;
    async fn is_deployed(&self, service: &str) -> Result<bool, JujuError>;
    async fn set_config(&self, service: &str, config: &[NameValue]) -> Result<(), JujuError>;
    /// Queue an action on the service. Returns the action id.
    async fn execute_action(
        &self,
        service: &str,
        action: &str,
        params: &[NameValue],
    ) -> Result<String, JujuError>;
    async fn action_status(&self, action_id: &str) -> Result<ExecutionStatus, JujuError>;
    async fn service_status(&self, service: &str) -> Result<ServiceStatus, JujuError>;
    async fn destroy(&self, service: &str) -> Result<(), JujuError>;
    async fn reconnect(&self) -> Result<(), JujuError>;
}

/// Opens API connections to the controller of an account
#[async_trait]
pub trait JujuConnector: Send + Sync {
    async fn connect(&self, account: &JujuAccount) -> Result<Arc<dyn JujuApi>, JujuError>;
}

#[derive(Clone, Debug)]
pub struct JujuParams {
    pub destroy_retries: u32,
    pub destroy_retry_interval: Duration,
    /// pause between polls of a running action
    pub action_poll_interval: Duration,
    pub action_poll_retries: u32,
}
impl From<&CmParams> for JujuParams {
    fn from(params: &CmParams) -> Self {
        Self {
            destroy_retries: params.destroy_retries,
            destroy_retry_interval: params.destroy_retry_interval,
            action_poll_interval: params.job_poll_interval,
            action_poll_retries: params.vnf_retries,
        }
    }
}

/// Service name of a VNF: lowercase alphanumerics and '-'
#[must_use]
pub fn service_name(vnf: &VnfCfg) -> String {
    let raw = format!("{}-{}-{}", vnf.nsr_name, vnf.vnfr.short_name, vnf.member_index());
    let mut name = String::with_capacity(raw.len());
    for c in raw.chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_alphanumeric() {
            name.push(c);
        } else if !name.ends_with('-') {
            name.push('-');
        }
    }
    name.trim_matches('-').to_string()
}

struct JujuVnf {
    service: String,
    charm: String,
    status: ConfigStatus,
}

pub struct JujuAgent {
    name: String,
    account: JujuAccount,
    api: Arc<dyn JujuApi>,
    params: JujuParams,
    script_dir: std::path::PathBuf,
    vnfs: RwLock<OrderMap<VnfrId, JujuVnf>>,
    actions: Mutex<OrderMap<String, ExecutionStatus>>,
}

impl JujuAgent {
    #[must_use]
    pub fn new(
        name: &str,
        account: JujuAccount,
        api: Arc<dyn JujuApi>,
        params: &CmParams,
    ) -> Self {
        Self {
            name: name.to_owned(),
            account,
            api,
            params: JujuParams::from(params),
            script_dir: params.script_dir(),
            vnfs: RwLock::new(OrderMap::new()),
            actions: Mutex::new(OrderMap::new()),
        }
    }
    #[must_use]
    pub fn account(&self) -> &JujuAccount {
        &self.account
    }

    /// Run an API call. On failure, reconnect and try once more.
    async fn with_reconnect<T, F, Fut>(&self, what: &str, call: F) -> Result<T, JujuError>
    where
        F: Fn(Arc<dyn JujuApi>) -> Fut,
        Fut: Future<Output = Result<T, JujuError>>,
    {
        match call(self.api.clone()).await {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!("Juju {what} failed: {e}. Reconnecting...");
                self.api.reconnect().await?;
                call(self.api.clone()).await
            }
        }
    }

    fn service(&self, id: &VnfrId) -> Option<(String, String)> {
        self.vnfs
            .read()
            .get(id)
            .map(|v| (v.service.clone(), v.charm.clone()))
    }
    fn set_status(&self, id: &VnfrId, status: ConfigStatus) {
        if let Some(vnf) = self.vnfs.write().get_mut(id) {
            vnf.status = status;
        }
    }

    /// Wait for an action to complete
    async fn wait_action(&self, action_id: &str) -> Result<ExecutionStatus, JujuError> {
        for _ in 0..=self.params.action_poll_retries {
            let status = self
                .with_reconnect("action status", |api| async move {
                    api.action_status(action_id).await
                })
                .await?;
            self.actions.lock().insert(action_id.to_string(), status);
            if status.is_terminal() {
                return Ok(status);
            }
            tokio::time::sleep(self.params.action_poll_interval).await;
        }
        Err(JujuError::Timeout(format!("action {action_id}")))
    }
}

#[async_trait]
impl ConfigAgentPlugin for JujuAgent {
    fn agent_type(&self) -> AgentType {
        AgentType::Juju
    }
    fn name(&self) -> &str {
        &self.name
    }

    async fn notify_create_vnfr(&self, _nsr: &NsrInfo, vnf: &VnfCfg) -> AgentResult<bool> {
        let (service, charm) = self
            .service(vnf.id())
            .ok_or_else(|| AgentError::NotManaged(vnf.id().clone()))?;
        let deployed = self
            .with_reconnect("is-deployed", |api| {
                let service = service.clone();
                async move { api.is_deployed(&service).await }
            })
            .await?;
        if deployed {
            debug!("Service {service} is already deployed");
        } else {
            info!("Deploying charm {charm} as {service} for {}", vnf.describe());
            self.with_reconnect("deploy", |api| {
                let (service, charm) = (service.clone(), charm.clone());
                async move { api.deploy(&service, &charm, &[]).await }
            })
            .await?;
        }
        Ok(true)
    }

    async fn notify_terminate_vnfr(&self, _nsr: &NsrInfo, vnf: &VnfCfg) -> AgentResult<()> {
        let Some((service, _)) = self.service(vnf.id()) else {
            return Ok(());
        };
        self.remove_vnfr_managed(vnf.id());
        for attempt in 1..=self.params.destroy_retries {
            match self.api.destroy(&service).await {
                Ok(()) | Err(JujuError::NotFound(_)) => {
                    info!("Destroyed service {service} of {}", vnf.describe());
                    return Ok(());
                }
                Err(e) => {
                    debug!("Attempt {attempt} to destroy {service} failed: {e}");
                    tokio::time::sleep(self.params.destroy_retry_interval).await;
                }
            }
        }
        error!("Failed to destroy service {service} of {}", vnf.describe());
        Err(JujuError::Timeout(format!("destruction of {service}")).into())
    }

    async fn apply_initial_config(
        &self,
        nsr: &NsrInfo,
        vnf: &VnfCfg,
        progress: &VnfProgress,
    ) -> AgentResult<bool> {
        let (service, _) = self
            .service(vnf.id())
            .ok_or_else(|| AgentError::NotManaged(vnf.id().clone()))?;
        let configured = self.vnfs.read().get(vnf.id()).map(|v| v.status) == Some(ConfigStatus::Configured);
        if configured && self.get_config_status(nsr, vnf).await? == ConfigStatus::Configured {
            debug!("{} is already configured", vnf.describe());
            return Ok(true);
        }

        self.set_status(vnf.id(), ConfigStatus::Configuring);
        progress.report(ConfigState::CfgSend).await;
        let primitives = vnf
            .vnfr
            .vnf_configuration
            .as_ref()
            .map(|c| c.initial_primitives().into_iter().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        for primitive in primitives {
            if primitive.name == "config" {
                self.with_reconnect("set-config", |api| {
                    let (service, params) = (service.clone(), primitive.parameter.clone());
                    async move { api.set_config(&service, &params).await }
                })
                .await?;
                continue;
            }
            let action_id = self
                .with_reconnect("execute-action", |api| {
                    let service = service.clone();
                    let (name, params) = (primitive.name.clone(), primitive.parameter.clone());
                    async move { api.execute_action(&service, &name, &params).await }
                })
                .await?;
            if self.wait_action(&action_id).await? == ExecutionStatus::Failed {
                return Err(JujuError::Api(format!(
                    "initial primitive '{}' failed on {service}",
                    primitive.name
                ))
                .into());
            }
        }
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
        let task = spawn_ns_script(nsr, vnfs, request, &self.script_dir).await?;
        Ok(Some(task))
    }

    async fn vnf_config_primitive(
        &self,
        _nsr: &NsrInfo,
        vnf: &VnfCfg,
        primitive: &VnfPrimitiveRequest,
        output: &mut PrimitiveOutput,
    ) -> AgentResult<()> {
        let (service, _) = self
            .service(vnf.id())
            .ok_or_else(|| AgentError::NotManaged(vnf.id().clone()))?;
        let result = self
            .with_reconnect("execute-action", |api| {
                let service = service.clone();
                async move {
                    api.execute_action(&service, &primitive.name, &primitive.parameter)
                        .await
                }
            })
            .await;
        match result {
            Ok(action_id) => {
                output.execution_id = action_id.clone();
                output.execution_status = ExecutionStatus::Pending;
                self.actions.lock().insert(action_id, ExecutionStatus::Pending);
            }
            Err(e) => output.set_failed(e.to_string()),
        }
        Ok(())
    }

    async fn get_config_status(&self, _nsr: &NsrInfo, vnf: &VnfCfg) -> AgentResult<ConfigStatus> {
        let (service, _) = self
            .service(vnf.id())
            .ok_or_else(|| AgentError::NotManaged(vnf.id().clone()))?;
        let status = self
            .with_reconnect("service status", |api| {
                let service = service.clone();
                async move { api.service_status(&service).await }
            })
            .await?;
        Ok(status.into())
    }

    fn get_action_status(&self, execution_id: &str) -> Option<ExecutionStatus> {
        self.actions.lock().get(execution_id).copied()
    }

    async fn poll_action_status(&self, execution_id: &str) {
        if !self.actions.lock().contains_key(execution_id) {
            return;
        }
        match self.api.action_status(execution_id).await {
            Ok(status) => {
                self.actions.lock().insert(execution_id.to_string(), status);
            }
            Err(e) => warn!("Failed to get status of action {execution_id}: {e}"),
        }
    }

    fn is_vnfr_managed(&self, vnfr_id: &VnfrId) -> bool {
        self.vnfs.read().contains_key(vnfr_id)
    }

    fn add_vnfr_managed(&self, vnf: &VnfCfg) -> AgentResult<()> {
        let charm = vnf
            .vnfr
            .vnf_configuration
            .as_ref()
            .and_then(|c| c.juju.as_ref())
            .map(|j| j.charm.clone())
            .ok_or_else(|| AgentError::BadConfig(format!("{} declares no charm", vnf.describe())))?;
        let service = service_name(vnf);
        debug!("Managing {} as service {service}", vnf.describe());
        self.vnfs.write().entry(vnf.id().clone()).or_insert(JujuVnf {
            service,
            charm,
            status: ConfigStatus::Unknown,
        });
        Ok(())
    }

    fn remove_vnfr_managed(&self, vnfr_id: &VnfrId) {
        self.vnfs.write().remove(vnfr_id);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::processor::board::CmStateBoard;
    use crate::processor::state::test::{nsr_state, script_vnfr, vnf_cfg};
    use crate::store::MemoryRecordStore;
    use crate::testing::MockJujuApi;
    use config::records::{ConfigMethod, InitialConfigPrimitive, JujuMethod, VnfConfiguration};
    use tracing_test::traced_test;

    fn account() -> JujuAccount {
        JujuAccount {
            ip_address: "127.0.0.1".parse().unwrap(),
            port: 17070,
            user: "admin".to_string(),
            secret: "secret".to_string(),
        }
    }

    fn juju_vnf(state: &crate::processor::state::NsrConfigState) -> VnfCfg {
        let vnfr = script_vnfr("v1", 1, 0).set_configuration(VnfConfiguration {
            juju: Some(JujuMethod {
                charm: "pingcharm".to_string(),
            }),
            initial_config_primitive: vec![
                InitialConfigPrimitive {
                    seq: 2,
                    name: "start".to_string(),
                    parameter: vec![],
                },
                InitialConfigPrimitive {
                    seq: 1,
                    name: "config".to_string(),
                    parameter: vec![NameValue::new("rate", "5")],
                },
            ],
            ..VnfConfiguration::default()
        });
        vnf_cfg(state.info(), &vnfr)
    }

    #[test]
    fn test_service_name() {
        let nsr = crate::processor::state::test::nsr_info("nsr-1");
        let mut vnfr = script_vnfr("v1", 3, 0);
        vnfr.short_name = "Ping_VNF".to_string();
        let vnf = vnf_cfg(&nsr, &vnfr);
        assert_eq!(service_name(&vnf), "nsr-1-name-ping-vnf-3");
    }

    #[tokio::test]
    #[traced_test]
    async fn test_deploy_and_configure() {
        let board = CmStateBoard::new(Arc::new(MemoryRecordStore::new()));
        let state = nsr_state(&board, "nsr-1", &[("v1", 0)]).await;
        let vnf = juju_vnf(&state);
        assert_eq!(vnf.method, ConfigMethod::Juju);

        let api = Arc::new(MockJujuApi::default());
        let agent = JujuAgent::new("juju-1", account(), api.clone(), &CmParams::default());
        agent.add_vnfr_managed(&vnf).unwrap();
        assert!(agent.notify_create_vnfr(state.info(), &vnf).await.unwrap());
        assert!(agent.notify_create_vnfr(state.info(), &vnf).await.unwrap());
        assert_eq!(api.deploys(), 1);

        let progress = state.progress(vnf.id());
        assert!(agent.apply_initial_config(state.info(), &vnf, &progress).await.unwrap());
        assert_eq!(api.calls(), vec!["set-config", "action:start"]);
        assert_eq!(
            agent.get_config_status(state.info(), &vnf).await.unwrap(),
            ConfigStatus::Configured
        );

        // already configured and active: nothing applied again
        assert!(agent.apply_initial_config(state.info(), &vnf, &progress).await.unwrap());
        assert_eq!(api.calls(), vec!["set-config", "action:start"]);
    }

    #[tokio::test]
    async fn test_reconnect_on_failure() {
        let board = CmStateBoard::new(Arc::new(MemoryRecordStore::new()));
        let state = nsr_state(&board, "nsr-1", &[("v1", 0)]).await;
        let vnf = juju_vnf(&state);
        let api = Arc::new(MockJujuApi::default());
        let agent = JujuAgent::new("juju-1", account(), api.clone(), &CmParams::default());
        agent.add_vnfr_managed(&vnf).unwrap();

        api.fail_next(1);
        assert!(agent.notify_create_vnfr(state.info(), &vnf).await.unwrap());
        assert_eq!(api.reconnects(), 1);
        assert_eq!(api.deploys(), 1);
    }

    #[tokio::test]
    async fn test_primitive_action_status() {
        let board = CmStateBoard::new(Arc::new(MemoryRecordStore::new()));
        let state = nsr_state(&board, "nsr-1", &[("v1", 0)]).await;
        let vnf = juju_vnf(&state);
        let api = Arc::new(MockJujuApi::default());
        let agent = JujuAgent::new("juju-1", account(), api.clone(), &CmParams::default());
        agent.add_vnfr_managed(&vnf).unwrap();

        let request = VnfPrimitiveRequest {
            name: "restart".to_string(),
            index: 1,
            parameter: vec![],
        };
        let mut output = PrimitiveOutput::new("restart", 1);
        agent
            .vnf_config_primitive(state.info(), &vnf, &request, &mut output)
            .await
            .unwrap();
        assert_eq!(output.execution_status, ExecutionStatus::Pending);
        assert_eq!(
            agent.get_action_status(&output.execution_id),
            Some(ExecutionStatus::Pending)
        );
        agent.poll_action_status(&output.execution_id).await;
        assert_eq!(
            agent.get_action_status(&output.execution_id),
            Some(ExecutionStatus::Completed)
        );
        assert_eq!(agent.get_action_status("unknown"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroy_on_terminate() {
        let board = CmStateBoard::new(Arc::new(MemoryRecordStore::new()));
        let state = nsr_state(&board, "nsr-1", &[("v1", 0)]).await;
        let vnf = juju_vnf(&state);
        let api = Arc::new(MockJujuApi::default());
        let agent = JujuAgent::new("juju-1", account(), api.clone(), &CmParams::default());
        agent.add_vnfr_managed(&vnf).unwrap();
        agent.notify_create_vnfr(state.info(), &vnf).await.unwrap();

        api.fail_next(2);
        agent.notify_terminate_vnfr(state.info(), &vnf).await.unwrap();
        assert!(!agent.is_vnfr_managed(vnf.id()));
        assert_eq!(api.deploys(), 1);
        assert!(api.deployed().is_empty());
    }
}
