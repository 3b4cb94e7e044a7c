// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Mock config agents and backends for tests

use async_trait::async_trait;
use config::VnfrId;
use config::records::{AgentType, JujuAccount, NameValue};
use config::rpc::{PrimitiveOutput, VnfPrimitiveRequest};
use config::status::{ConfigStatus, ExecutionStatus};
use ordermap::{OrderMap, OrderSet};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::Notify;
use tokio::time::Duration;

use crate::agents::juju::{JujuApi, JujuConnector, JujuError, ServiceStatus};
use crate::agents::netconf::{NetconfConnector, NetconfErr, NetconfSession, NetconfTarget};
use crate::agents::{
    AgentError, AgentResult, ConfigAgentPlugin, NsConfigRequest, NsConfigTask, NsrInfo, VnfCfg,
    VnfProgress,
};

type ApplyHook = Box<dyn Fn(&VnfrId) + Send + Sync>;

/// A config agent that records what it is asked to do. Configuration succeeds unless the
/// VNF was marked as failing.
pub(crate) struct MockPlugin {
    agent_type: AgentType,
    managed: Mutex<OrderSet<VnfrId>>,
    failing: Mutex<OrderSet<VnfrId>>,
    status_on_failure: Mutex<ConfigStatus>,
    log: Arc<Mutex<Vec<VnfrId>>>,
    on_apply: Mutex<Option<ApplyHook>>,
    apply_gate: Mutex<Option<Arc<Notify>>>,
    primitive_gate: Mutex<Option<Arc<Notify>>>,
    applies: AtomicU32,
    creates: AtomicU32,
    terminates: AtomicU32,
    ns_configs: Mutex<Vec<NsConfigRequest>>,
    executions: Mutex<OrderMap<String, ExecutionStatus>>,
}

impl MockPlugin {
    pub(crate) fn new(agent_type: AgentType) -> Self {
        Self::with_log(agent_type, Arc::new(Mutex::new(vec![])))
    }
    /// A mock appending the VNFs it configures to a log shared with other mocks
    pub(crate) fn with_log(agent_type: AgentType, log: Arc<Mutex<Vec<VnfrId>>>) -> Self {
        Self {
            agent_type,
            managed: Mutex::new(OrderSet::new()),
            failing: Mutex::new(OrderSet::new()),
            status_on_failure: Mutex::new(ConfigStatus::Configuring),
            log,
            on_apply: Mutex::new(None),
            apply_gate: Mutex::new(None),
            primitive_gate: Mutex::new(None),
            applies: AtomicU32::new(0),
            creates: AtomicU32::new(0),
            terminates: AtomicU32::new(0),
            ns_configs: Mutex::new(vec![]),
            executions: Mutex::new(OrderMap::new()),
        }
    }
    pub(crate) fn fail(&self, id: &VnfrId) {
        self.failing.lock().insert(id.clone());
    }
    /// Status reported for failing VNFs
    pub(crate) fn set_status_on_failure(&self, status: ConfigStatus) {
        *self.status_on_failure.lock() = status;
    }
    pub(crate) fn on_apply(&self, hook: impl Fn(&VnfrId) + Send + Sync + 'static) {
        *self.on_apply.lock() = Some(Box::new(hook));
    }
    /// Block every initial configuration until the gate is notified
    pub(crate) fn hold_applies(&self, gate: Arc<Notify>) {
        *self.apply_gate.lock() = Some(gate);
    }
    pub(crate) fn release_applies(&self) {
        *self.apply_gate.lock() = None;
    }
    /// Block every primitive execution until the gate is notified
    pub(crate) fn hold_primitives(&self, gate: Arc<Notify>) {
        *self.primitive_gate.lock() = Some(gate);
    }
    pub(crate) fn applies(&self) -> u32 {
        self.applies.load(Ordering::SeqCst)
    }
    pub(crate) fn creates(&self) -> u32 {
        self.creates.load(Ordering::SeqCst)
    }
    pub(crate) fn terminates(&self) -> u32 {
        self.terminates.load(Ordering::SeqCst)
    }
    pub(crate) fn log(&self) -> Vec<VnfrId> {
        self.log.lock().clone()
    }
    pub(crate) fn ns_configs(&self) -> Vec<String> {
        self.ns_configs.lock().iter().map(|r| r.name.clone()).collect()
    }
}

#[async_trait]
impl ConfigAgentPlugin for MockPlugin {
    fn agent_type(&self) -> AgentType {
        self.agent_type
    }
    fn name(&self) -> &str {
        self.agent_type.as_str()
    }
    async fn notify_create_vnfr(&self, _nsr: &NsrInfo, vnf: &VnfCfg) -> AgentResult<bool> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(self.is_vnfr_managed(vnf.id()))
    }
    async fn notify_terminate_vnfr(&self, _nsr: &NsrInfo, vnf: &VnfCfg) -> AgentResult<()> {
        self.terminates.fetch_add(1, Ordering::SeqCst);
        self.remove_vnfr_managed(vnf.id());
        Ok(())
    }
    async fn apply_initial_config(
        &self,
        _nsr: &NsrInfo,
        vnf: &VnfCfg,
        _progress: &VnfProgress,
    ) -> AgentResult<bool> {
        self.applies.fetch_add(1, Ordering::SeqCst);
        self.log.lock().push(vnf.id().clone());
        if let Some(hook) = self.on_apply.lock().as_ref() {
            hook(vnf.id());
        }
        let gate = self.apply_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.failing.lock().contains(vnf.id()) {
            return Err(AgentError::BadConfig(format!("{} fails", vnf.id())));
        }
        Ok(true)
    }
    async fn apply_ns_config(
        &self,
        _nsr: &NsrInfo,
        _vnfs: &[VnfCfg],
        request: &NsConfigRequest,
    ) -> AgentResult<Option<NsConfigTask>> {
        self.ns_configs.lock().push(request.clone());
        let ok = !request.user_defined_script.contains("fail");
        Ok(Some(tokio::spawn(async move { Ok(ok) })))
    }
    async fn vnf_config_primitive(
        &self,
        _nsr: &NsrInfo,
        vnf: &VnfCfg,
        primitive: &VnfPrimitiveRequest,
        output: &mut PrimitiveOutput,
    ) -> AgentResult<()> {
        let gate = self.primitive_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.failing.lock().contains(vnf.id()) {
            return Err(AgentError::BadConfig(format!("{} fails", vnf.id())));
        }
        let mut executions = self.executions.lock();
        output.execution_id = format!("{}-{}-{}", self.name(), primitive.name, executions.len());
        output.execution_status = ExecutionStatus::Pending;
        executions.insert(output.execution_id.clone(), ExecutionStatus::Completed);
        Ok(())
    }
    async fn get_config_status(&self, _nsr: &NsrInfo, vnf: &VnfCfg) -> AgentResult<ConfigStatus> {
        if self.failing.lock().contains(vnf.id()) {
            Ok(*self.status_on_failure.lock())
        } else {
            Ok(ConfigStatus::Configured)
        }
    }
    fn get_action_status(&self, execution_id: &str) -> Option<ExecutionStatus> {
        self.executions.lock().get(execution_id).copied()
    }
    fn is_vnfr_managed(&self, vnfr_id: &VnfrId) -> bool {
        self.managed.lock().contains(vnfr_id)
    }
    fn add_vnfr_managed(&self, vnf: &VnfCfg) -> AgentResult<()> {
        self.managed.lock().insert(vnf.id().clone());
        Ok(())
    }
    fn remove_vnfr_managed(&self, vnfr_id: &VnfrId) {
        self.managed.lock().remove(vnfr_id);
    }
}

/// NETCONF connector that either never connects or opens sessions recording their edits
pub(crate) struct MockNetconfConnector {
    fail: bool,
    attempts: AtomicU32,
    edits: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockNetconfConnector {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            attempts: AtomicU32::new(0),
            edits: Arc::new(Mutex::new(vec![])),
        }
    }
    pub(crate) fn recording() -> Self {
        Self {
            fail: false,
            ..Self::failing()
        }
    }
    pub(crate) fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
    pub(crate) fn edits(&self) -> Vec<(String, String)> {
        self.edits.lock().clone()
    }
}

struct RecordingSession {
    edits: Arc<Mutex<Vec<(String, String)>>>,
}

#[async_trait]
impl NetconfSession for RecordingSession {
    async fn edit_config(&mut self, target: &str, payload: &str) -> Result<(), NetconfErr> {
        self.edits
            .lock()
            .push((target.to_string(), payload.to_string()));
        Ok(())
    }
    async fn close(&mut self) {}
}

#[async_trait]
impl NetconfConnector for MockNetconfConnector {
    async fn connect(
        &self,
        target: &NetconfTarget,
        _tout: Duration,
    ) -> Result<Box<dyn NetconfSession>, NetconfErr> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(NetconfErr::ConnectFailed(
                target.addr(),
                "connection refused".to_string(),
            ));
        }
        Ok(Box::new(RecordingSession {
            edits: self.edits.clone(),
        }))
    }
}

/// In-memory Juju controller. Actions complete as soon as they are queued.
#[derive(Default)]
pub(crate) struct MockJujuApi {
    deployed: Mutex<OrderMap<String, String>>,
    actions: Mutex<OrderMap<String, ExecutionStatus>>,
    calls: Mutex<Vec<String>>,
    deploys: AtomicU32,
    reconnects: AtomicU32,
    fail_next: AtomicU32,
}

impl MockJujuApi {
    /// Make the next `count` API calls fail
    pub(crate) fn fail_next(&self, count: u32) {
        self.fail_next.store(count, Ordering::SeqCst);
    }
    pub(crate) fn deploys(&self) -> u32 {
        self.deploys.load(Ordering::SeqCst)
    }
    pub(crate) fn reconnects(&self) -> u32 {
        self.reconnects.load(Ordering::SeqCst)
    }
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
    pub(crate) fn deployed(&self) -> Vec<String> {
        self.deployed.lock().keys().cloned().collect()
    }
    fn check(&self) -> Result<(), JujuError> {
        let failed = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            Err(JujuError::Api("injected failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl JujuApi for MockJujuApi {
    async fn deploy(&self, service: &str, charm: &str, _config: &[NameValue]) -> Result<(), JujuError> {
        self.check()?;
        self.deploys.fetch_add(1, Ordering::SeqCst);
        self.deployed
            .lock()
            .insert(service.to_string(), charm.to_string());
        Ok(())
    }
    async fn is_deployed(&self, service: &str) -> Result<bool, JujuError> {
        self.check()?;
        Ok(self.deployed.lock().contains_key(service))
    }
    async fn set_config(&self, _service: &str, _config: &[NameValue]) -> Result<(), JujuError> {
        self.check()?;
        self.calls.lock().push("set-config".to_string());
        Ok(())
    }
    async fn execute_action(
        &self,
        _service: &str,
        action: &str,
        _params: &[NameValue],
    ) -> Result<String, JujuError> {
        self.check()?;
        self.calls.lock().push(format!("action:{action}"));
        let mut actions = self.actions.lock();
        let id = format!("action-{}", actions.len());
        actions.insert(id.clone(), ExecutionStatus::Completed);
        Ok(id)
    }
    async fn action_status(&self, action_id: &str) -> Result<ExecutionStatus, JujuError> {
        self.check()?;
        self.actions
            .lock()
            .get(action_id)
            .copied()
            .ok_or_else(|| JujuError::NotFound(action_id.to_string()))
    }
    async fn service_status(&self, service: &str) -> Result<ServiceStatus, JujuError> {
        self.check()?;
        if self.deployed.lock().contains_key(service) {
            Ok(ServiceStatus::Active)
        } else {
            Ok(ServiceStatus::Unknown)
        }
    }
    async fn destroy(&self, service: &str) -> Result<(), JujuError> {
        self.check()?;
        self.deployed
            .lock()
            .remove(service)
            .map(|_| ())
            .ok_or_else(|| JujuError::NotFound(service.to_string()))
    }
    async fn reconnect(&self) -> Result<(), JujuError> {
        self.reconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct MockJujuConnector {
    pub(crate) api: Arc<MockJujuApi>,
}

#[async_trait]
impl JujuConnector for MockJujuConnector {
    async fn connect(&self, _account: &JujuAccount) -> Result<Arc<dyn JujuApi>, JujuError> {
        Ok(self.api.clone())
    }
}
