// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Registry of the live config agents. It holds one plugin per [`AgentType`], with the
//! built-in agent always present, and dispatches the calls for a VNF to the plugin that
//! manages it. Plugin failures are logged here and turned into failed attempts.

use config::records::{AgentAccountType, AgentType, ConfigAgentAccount};
use config::rpc::{PrimitiveOutput, VnfPrimitiveRequest};
use config::status::{ConfigStatus, ExecutionStatus};
use config::{ConfigError, VnfrId};
use ordermap::OrderMap;
use parking_lot::RwLock;
use std::sync::Arc;
#[allow(unused)]
use tracing::{debug, error, info, warn};

use super::juju::{JujuAgent, JujuConnector};
use super::riftca::{RiftCaAgent, RiftCaParams};
use super::{AgentResult, ConfigAgentPlugin, NsConfigRequest, NsConfigTask, NsrInfo, VnfCfg, VnfProgress};
use crate::processor::params::CmParams;

pub struct ConfigAgentRegistry {
    plugins: RwLock<OrderMap<AgentType, Arc<dyn ConfigAgentPlugin>>>,
    params: CmParams,
    juju: Option<Arc<dyn JujuConnector>>,
}

impl ConfigAgentRegistry {
    /// A registry with the built-in agent. Juju accounts can only be added if a connector
    /// to Juju controllers is provided.
    #[must_use]
    pub fn new(params: &CmParams, juju: Option<Arc<dyn JujuConnector>>) -> Self {
        let registry = Self::empty(params, juju);
        registry.register(Arc::new(RiftCaAgent::new(RiftCaParams::from(params))));
        registry
    }

    /// A registry with no plugin at all
    #[must_use]
    pub fn empty(params: &CmParams, juju: Option<Arc<dyn JujuConnector>>) -> Self {
        Self {
            plugins: RwLock::new(OrderMap::new()),
            params: params.clone(),
            juju,
        }
    }

    /// Register a plugin, replacing the one of the same type if any
    pub fn register(&self, plugin: Arc<dyn ConfigAgentPlugin>) {
        let agent_type = plugin.agent_type();
        info!("Registering config agent '{}' of type {agent_type}", plugin.name());
        if let Some(old) = self.plugins.write().insert(agent_type, plugin) {
            warn!("Config agent '{}' of type {agent_type} was replaced", old.name());
        }
    }

    #[must_use]
    pub fn plugin(&self, agent_type: AgentType) -> Option<Arc<dyn ConfigAgentPlugin>> {
        self.plugins.read().get(&agent_type).cloned()
    }

    #[must_use]
    pub fn plugins(&self) -> Vec<Arc<dyn ConfigAgentPlugin>> {
        self.plugins.read().values().cloned().collect()
    }

    /// Instantiate the plugin of a config-agent account
    pub async fn add_account(&self, account: &ConfigAgentAccount) -> Result<(), ConfigError> {
        match &account.account_type {
            AgentAccountType::RiftCa => {
                debug!("Account '{}' is served by the built-in agent", account.name);
                Ok(())
            }
            AgentAccountType::Juju(juju_account) => {
                if let Some(existing) = self.plugin(AgentType::Juju) {
                    return Err(ConfigError::DuplicateAccount(existing.name().to_string()));
                }
                let connector = self
                    .juju
                    .as_ref()
                    .ok_or_else(|| ConfigError::NoSuchAgent(AgentType::Juju.to_string()))?;
                let api = connector.connect(juju_account).await.map_err(|e| {
                    error!("Failed to connect to Juju controller of '{}': {e}", account.name);
                    ConfigError::InternalFailure(e.to_string())
                })?;
                let agent = JujuAgent::new(&account.name, juju_account.clone(), api, &self.params);
                self.register(Arc::new(agent));
                Ok(())
            }
        }
    }

    /// Drop the plugin of a config-agent account. The built-in agent stays.
    pub fn delete_account(&self, name: &str) -> Result<(), ConfigError> {
        let mut plugins = self.plugins.write();
        let agent_type = plugins
            .iter()
            .find(|(_, plugin)| plugin.name() == name)
            .map(|(agent_type, _)| *agent_type)
            .ok_or_else(|| ConfigError::NoSuchAgent(name.to_string()))?;
        if agent_type == AgentType::RiftCa {
            debug!("Not removing built-in config agent '{name}'");
            return Ok(());
        }
        plugins.remove(&agent_type);
        info!("Removed config agent '{name}' of type {agent_type}");
        Ok(())
    }

    /// Hand a VNF to the plugin of its agent type. The VNF is removed from any other plugin
    /// so that exactly one plugin manages it.
    pub fn assign(&self, vnf: &VnfCfg) -> Result<Arc<dyn ConfigAgentPlugin>, ConfigError> {
        let plugin = self
            .plugin(vnf.agent)
            .ok_or_else(|| ConfigError::NoSuchAgent(vnf.agent.to_string()))?;
        for other in self.plugins() {
            if other.agent_type() != vnf.agent && other.is_vnfr_managed(vnf.id()) {
                other.remove_vnfr_managed(vnf.id());
            }
        }
        plugin.add_vnfr_managed(vnf).map_err(|e| {
            error!("Failed to assign {} to '{}': {e}", vnf.describe(), plugin.name());
            ConfigError::ConfigAgentVnfrAdd(vnf.id().clone(), e.to_string())
        })?;
        debug!("{} is managed by '{}'", vnf.describe(), plugin.name());
        Ok(plugin)
    }

    /// The plugin managing a VNF
    #[must_use]
    pub fn owner(&self, vnfr_id: &VnfrId) -> Option<Arc<dyn ConfigAgentPlugin>> {
        self.plugins
            .read()
            .values()
            .find(|plugin| plugin.is_vnfr_managed(vnfr_id))
            .cloned()
    }

    /// The plugins managing at least one of `vnfs`, each with the VNFs it manages. The
    /// built-in agent stands in when none does.
    #[must_use]
    pub fn agents_for(&self, vnfs: &[VnfCfg]) -> Vec<(Arc<dyn ConfigAgentPlugin>, Vec<VnfCfg>)> {
        let mut agents: Vec<(Arc<dyn ConfigAgentPlugin>, Vec<VnfCfg>)> = vec![];
        for plugin in self.plugins() {
            let managed: Vec<VnfCfg> = vnfs
                .iter()
                .filter(|vnf| plugin.is_vnfr_managed(vnf.id()))
                .cloned()
                .collect();
            if !managed.is_empty() {
                agents.push((plugin, managed));
            }
        }
        if agents.is_empty() {
            if let Some(default) = self.plugin(AgentType::RiftCa) {
                agents.push((default, vec![]));
            }
        }
        agents
    }

    pub async fn notify_create_vnfr(&self, nsr: &NsrInfo, vnf: &VnfCfg) -> bool {
        let Some(plugin) = self.owner(vnf.id()) else {
            error!("No config agent manages {}", vnf.describe());
            return false;
        };
        plugin
            .notify_create_vnfr(nsr, vnf)
            .await
            .inspect_err(|e| {
                error!(
                    "'{}' failed to handle creation of {}: {e}",
                    plugin.name(),
                    vnf.describe()
                );
            })
            .unwrap_or(false)
    }

    pub async fn notify_terminate_vnfr(&self, nsr: &NsrInfo, vnf: &VnfCfg) {
        let Some(plugin) = self.owner(vnf.id()) else {
            debug!("No config agent manages {}", vnf.describe());
            return;
        };
        if let Err(e) = plugin.notify_terminate_vnfr(nsr, vnf).await {
            error!("'{}' failed to handle termination of {}: {e}", plugin.name(), vnf.describe());
        }
    }

    /// Apply the initial configuration of a VNF through its owner. Any failure is a failed
    /// attempt.
    pub async fn apply_initial_config(
        &self,
        nsr: &NsrInfo,
        vnf: &VnfCfg,
        progress: &VnfProgress,
    ) -> bool {
        let Some(plugin) = self.owner(vnf.id()) else {
            error!("No config agent manages {}", vnf.describe());
            return false;
        };
        match plugin.apply_initial_config(nsr, vnf, progress).await {
            Ok(done) => done,
            Err(e) => {
                error!(
                    "'{}' failed to configure {}: {e}",
                    plugin.name(),
                    vnf.describe()
                );
                false
            }
        }
    }

    pub async fn get_config_status(&self, nsr: &NsrInfo, vnf: &VnfCfg) -> ConfigStatus {
        let Some(plugin) = self.owner(vnf.id()) else {
            return ConfigStatus::Unknown;
        };
        plugin
            .get_config_status(nsr, vnf)
            .await
            .inspect_err(|e| warn!("Failed to get config status of {}: {e}", vnf.describe()))
            .unwrap_or(ConfigStatus::Unknown)
    }

    /// Start an NS-level script through `plugin`. Failures are logged and returned.
    pub async fn apply_ns_config(
        &self,
        plugin: &Arc<dyn ConfigAgentPlugin>,
        nsr: &NsrInfo,
        vnfs: &[VnfCfg],
        request: &NsConfigRequest,
    ) -> AgentResult<Option<NsConfigTask>> {
        plugin
            .apply_ns_config(nsr, vnfs, request)
            .await
            .inspect_err(|e| {
                error!(
                    "'{}' failed to run '{}' for NSR {}: {e}",
                    plugin.name(),
                    request.name,
                    nsr.name
                );
            })
    }

    /// Execute a primitive on a VNF. Failures are recorded in `output`.
    pub async fn vnf_config_primitive(
        &self,
        nsr: &NsrInfo,
        vnf: &VnfCfg,
        primitive: &VnfPrimitiveRequest,
        output: &mut PrimitiveOutput,
    ) {
        let Some(plugin) = self.owner(vnf.id()) else {
            output.set_failed(format!("no config agent manages VNFR {}", vnf.id()));
            return;
        };
        if let Err(e) = plugin.vnf_config_primitive(nsr, vnf, primitive, output).await {
            error!(
                "'{}' failed to execute primitive '{}' on {}: {e}",
                plugin.name(),
                primitive.name,
                vnf.describe()
            );
            output.set_failed(e.to_string());
        }
    }

    /// Status of a primitive execution, from whichever plugin knows it
    #[must_use]
    pub fn get_action_status(&self, execution_id: &str) -> Option<ExecutionStatus> {
        self.plugins
            .read()
            .values()
            .find_map(|plugin| plugin.get_action_status(execution_id))
    }

    pub async fn poll_action_status(&self, execution_id: &str) {
        for plugin in self.plugins() {
            plugin.poll_action_status(execution_id).await;
        }
    }
}
