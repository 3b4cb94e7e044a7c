// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The configuration manager: discovers running NSRs, builds their configuration state,
//! hands them to the scheduler, and serves the control channel.

use config::records::{AgentType, ConfigMethod, NsrOperStatus, Vnfr};
use config::status::CmNsr;
use config::{ConfigError, ConfigState, NsrId};
use ordermap::OrderMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::time::{Duration, MissedTickBehavior, interval};
#[allow(unused)]
use tracing::{debug, error, info, warn};

use crate::agents::registry::ConfigAgentRegistry;
use crate::pool::ParameterPool;
use crate::processor::board::CmStateBoard;
use crate::processor::ctl::{CmCtlMsg, CmCtlSender, reply};
use crate::processor::display::PriorityTable;
use crate::processor::jobs::JobTable;
use crate::processor::params::CmParams;
use crate::processor::sched::{AttemptReport, ConfigScheduler, SchedCtx};
use crate::processor::state::{NsrConfigState, NsrHandle, NsrInfo, VnfCfg};
use crate::processor::xlate::{XlateTable, file_name_safe, materialize, write_debug_artifacts};
use crate::rpc;
use crate::store::{NsrEvent, RecordStore, StoreError};

const CTL_CHANNEL_SIZE: usize = 100;

/// Outcome of one discovery attempt of a running NSR
enum Discovery {
    Done,
    NotReady(&'static str),
}

pub struct ConfigManager {
    params: CmParams,
    store: Arc<dyn RecordStore>,
    registry: Arc<ConfigAgentRegistry>,
    board: CmStateBoard,
    sched: ConfigScheduler,
    jobs: JobTable,
    nsrs: OrderMap<NsrId, NsrHandle>,
    discovering: VecDeque<(NsrId, u32)>,
    rx: mpsc::Receiver<CmCtlMsg>,
    report_rx: mpsc::Receiver<AttemptReport>,
}

impl ConfigManager {
    #[must_use]
    pub fn new(
        params: CmParams,
        store: Arc<dyn RecordStore>,
        registry: Arc<ConfigAgentRegistry>,
    ) -> (Self, CmCtlSender) {
        let (tx, rx) = mpsc::channel(CTL_CHANNEL_SIZE);
        let (sched, report_rx) = ConfigScheduler::new(SchedCtx {
            params: params.clone(),
            store: store.clone(),
            registry: registry.clone(),
        });
        let manager = Self {
            board: CmStateBoard::new(store.clone()),
            jobs: JobTable::new(store.clone()),
            params,
            store,
            registry,
            sched,
            nsrs: OrderMap::new(),
            discovering: VecDeque::new(),
            rx,
            report_rx,
        };
        (manager, CmCtlSender::new(tx))
    }

    /// Run the configuration manager until told to finish
    pub async fn run(mut self) {
        info!("Configuration manager starting\n{}", self.params);
        self.load_accounts().await;
        let mut events = self.store.subscribe_nsr();
        let mut events_open = true;
        self.scan_running().await;

        let mut discovery = ticker(self.params.discovery_interval);
        let mut config = ticker(self.params.config_interval);
        let mut job_poll = ticker(self.params.job_poll_interval);
        loop {
            tokio::select! {
                msg = self.rx.recv() => match msg {
                    Some(CmCtlMsg::Finish) | None => break,
                    Some(msg) => self.handle_ctl(msg).await,
                },
                event = events.recv(), if events_open => match event {
                    Ok(event) => self.handle_nsr_event(event).await,
                    Err(RecvError::Lagged(missed)) => {
                        warn!("Missed {missed} NSR events: rescanning NSRs");
                        self.scan_running().await;
                    }
                    Err(RecvError::Closed) => {
                        warn!("NSR event subscription closed");
                        events_open = false;
                    }
                },
                Some(report) = self.report_rx.recv() => self.sched.reap(report).await,
                _ = discovery.tick() => self.discover_pending().await,
                _ = config.tick() => self.sched.tick(),
                _ = job_poll.tick() => self.jobs.refresh(&self.registry).await,
            }
        }
        info!("Configuration manager stopped");
    }

    async fn load_accounts(&self) {
        match self.store.get_config_agents(None).await {
            Ok(accounts) => {
                for account in accounts {
                    if let Err(e) = self.registry.add_account(&account).await {
                        error!("Failed to add config-agent account '{}': {e}", account.name);
                    }
                }
            }
            Err(e) => error!("Failed to fetch config-agent accounts: {e}"),
        }
    }

    async fn scan_running(&mut self) {
        match self.store.get_nsrs().await {
            Ok(nsrs) => {
                for nsr in nsrs.into_iter().filter(|nsr| nsr.is_running()) {
                    if let Err(e) = self.on_nsr_running(nsr.id).await {
                        debug!("{e}");
                    }
                }
            }
            Err(e) => error!("Failed to fetch NSRs: {e}"),
        }
    }

    async fn handle_nsr_event(&mut self, event: NsrEvent) {
        match event {
            NsrEvent::Create(nsr) | NsrEvent::Update(nsr) => match nsr.operational_status {
                NsrOperStatus::Running => {
                    if let Err(e) = self.on_nsr_running(nsr.id).await {
                        debug!("{e}");
                    }
                }
                NsrOperStatus::Terminate
                | NsrOperStatus::VnfTerminatePhase
                | NsrOperStatus::VlTerminatePhase
                | NsrOperStatus::Terminated => self.on_nsr_terminate(&nsr.id).await,
                _ => {}
            },
            NsrEvent::Delete(id) => self.on_nsr_terminate(&id).await,
        }
    }

    async fn handle_ctl(&mut self, msg: CmCtlMsg) {
        match msg {
            CmCtlMsg::Finish => {}
            CmCtlMsg::NsrRunning(id, reply_to) => reply(reply_to, self.on_nsr_running(id).await),
            CmCtlMsg::NsrTerminate(id, reply_to) => {
                self.on_nsr_terminate(&id).await;
                reply(reply_to, Ok(()));
            }
            CmCtlMsg::AddAccount(account, reply_to) => {
                reply(reply_to, self.registry.add_account(&account).await);
            }
            CmCtlMsg::DeleteAccount(name, reply_to) => {
                reply(reply_to, self.registry.delete_account(&name));
            }
            CmCtlMsg::ExecNsConfigPrimitive(input, reply_to) => {
                let result = match self.nsrs.get_mut(&input.nsr_id_ref) {
                    Some(handle) => {
                        rpc::exec_ns_config_primitive(handle, input, &self.registry, &self.jobs)
                            .await
                    }
                    None => Err(ConfigError::NoSuchNsr(input.nsr_id_ref)),
                };
                reply(reply_to, result);
            }
            CmCtlMsg::GetNsConfigPrimitiveValues(input, reply_to) => {
                let result = match self.nsrs.get_mut(&input.nsr_id_ref) {
                    Some(handle) => rpc::get_ns_config_primitive_values(handle, &input),
                    None => Err(ConfigError::NoSuchNsr(input.nsr_id_ref)),
                };
                reply(reply_to, result);
            }
            CmCtlMsg::GetCmState(reply_to) => reply(reply_to, Ok(self.board.snapshot())),
        }
    }

    /// An NSR reached the running state: discover it now, or retry later if its records
    /// are not all there yet.
    pub(crate) async fn on_nsr_running(&mut self, id: NsrId) -> Result<(), ConfigError> {
        if self.nsrs.contains_key(&id) {
            return Err(ConfigError::AlreadyProcessed(id));
        }
        if self.discovering.iter().any(|(pending, _)| pending == &id) {
            debug!("NSR {id} is already being discovered");
            return Ok(());
        }
        info!("NSR {id} is running");
        match self.try_discover(&id).await {
            Ok(Discovery::Done) => {}
            Ok(Discovery::NotReady(what)) => {
                debug!("NSR {id} not ready for discovery: {what}");
                self.discovering
                    .push_back((id, self.params.discovery_retries));
            }
            Err(e) => {
                warn!("Discovery of NSR {id} failed: {e}");
                self.discovering
                    .push_back((id, self.params.discovery_retries));
            }
        }
        Ok(())
    }

    /// Retry the discovery of the NSRs whose records were incomplete
    async fn discover_pending(&mut self) {
        let pending: Vec<_> = self.discovering.drain(..).collect();
        for (id, retries_left) in pending {
            let outcome = match self.try_discover(&id).await {
                Ok(Discovery::Done) => continue,
                Ok(Discovery::NotReady(what)) => what.to_string(),
                Err(e) => e.to_string(),
            };
            if retries_left == 0 {
                error!("Giving up discovery of NSR {id}: {outcome}");
                self.publish_discovery_failure(&id).await;
            } else {
                debug!("NSR {id} still not ready ({outcome}): {retries_left} retries left");
                self.discovering.push_back((id, retries_left - 1));
            }
        }
    }

    /// Report an NSR that could not be discovered in CFG_PROCESS_FAILED
    async fn publish_discovery_failure(&self, id: &NsrId) {
        let name = match self.store.get_nsr(id).await {
            Ok(Some(nsr)) => nsr.name,
            _ => id.to_string(),
        };
        let mut cm_nsr = CmNsr::new(id.clone(), &name);
        cm_nsr.state = ConfigState::CfgProcessFailed;
        self.board.register(Arc::new(Mutex::new(cm_nsr)));
        self.board.publish().await;
    }

    async fn try_discover(&mut self, id: &NsrId) -> Result<Discovery, StoreError> {
        let Some(nsr) = self.store.get_nsr(id).await? else {
            return Ok(Discovery::NotReady("no NSR record"));
        };
        if !nsr.is_running() {
            return Ok(Discovery::NotReady("NSR is not running"));
        }
        let Some(nsd) = self.store.get_nsd(id).await? else {
            return Ok(Discovery::NotReady("no NSD record"));
        };
        let mut vnfrs = Vec::with_capacity(nsr.constituent_vnfr_ref.len());
        for vnfr_id in &nsr.constituent_vnfr_ref {
            let Some(vnfr) = self.store.get_vnfr(vnfr_id).await? else {
                return Ok(Discovery::NotReady("missing VNFR records"));
            };
            vnfrs.push(vnfr);
        }
        let config = self.store.get_nsr_config(id).await?;
        let accounts = self.store.get_config_agents(None).await?;

        let info = NsrInfo {
            id: id.clone(),
            dir: self
                .params
                .run_dir
                .join(file_name_safe(&format!("{}-{id}", nsr.name))),
            name: nsr.name,
            nsd: Arc::new(nsd),
            config,
            accounts,
        };
        let mut state = NsrConfigState::new(info, self.board.clone());
        if state.set_state(ConfigState::Received).await.is_err() {
            return Ok(Discovery::Done);
        }

        let mut xlate = XlateTable::new(&vnfrs);
        let mut failed = false;
        for vnfr in &vnfrs {
            state.add_vnfr(vnfr);
            if !self.process_vnfr(&mut state, vnfr, &mut xlate).await {
                failed = true;
            }
        }

        let pools: OrderMap<String, ParameterPool> = state
            .info()
            .nsd
            .parameter_pool
            .iter()
            .map(|decl| (decl.name.clone(), ParameterPool::from_decl(decl)))
            .collect();

        if let Err(e) =
            write_debug_artifacts(&state.info().dir, state.priority_table(), &xlate).await
        {
            warn!("Failed to write debug artifacts of NSR {}: {e}", state.name());
        }
        debug!("{}", PriorityTable(state.name(), state.priority_table()));

        self.nsrs.insert(id.clone(), state.handle(pools));
        if failed {
            error!("Failed to process the configuration of NSR {}", state.name());
            let _ = state.set_state(ConfigState::CfgProcessFailed).await;
        } else {
            self.sched.enqueue(state, self.params.nsr_retries).await;
        }
        Ok(Discovery::Done)
    }

    /// Derive the working record of a VNF and hand it to its config agent. Returns false if
    /// the VNF could not be processed.
    async fn process_vnfr(
        &self,
        state: &mut NsrConfigState,
        vnfr: &Vnfr,
        xlate: &mut XlateTable,
    ) -> bool {
        let progress = state.progress(&vnfr.id);
        let Some(method) = vnfr.config_method() else {
            info!("VNF {} of NSR {} has no configuration", vnfr.name, state.name());
            progress.report(ConfigState::ReadyNoCfg).await;
            return true;
        };
        progress.report(ConfigState::Received).await;
        progress.report(ConfigState::CfgProcess).await;
        match self.build_vnf_cfg(state.info(), vnfr, method, xlate).await {
            Ok(vnf) => {
                self.registry.notify_create_vnfr(state.info(), &vnf).await;
                state.add_vnf_cfg(vnf);
                progress.report(ConfigState::CfgSched).await;
                true
            }
            Err(e) => {
                error!(
                    "Failed to process VNF {} (member {}) of NSR {}: {e}",
                    vnfr.name,
                    vnfr.member_vnf_index_ref,
                    state.name()
                );
                progress.report(ConfigState::CfgProcessFailed).await;
                false
            }
        }
    }

    async fn build_vnf_cfg(
        &self,
        nsr: &NsrInfo,
        vnfr: &Vnfr,
        method: ConfigMethod,
        xlate: &mut XlateTable,
    ) -> Result<VnfCfg, ConfigError> {
        let agent = AgentType::for_method(method)?;
        let cfg = vnfr.vnf_configuration.clone().unwrap_or_default();
        let access = cfg.config_access.clone().unwrap_or_default();
        let mut vnf = VnfCfg {
            vnfr: vnfr.clone(),
            nsr_id: nsr.id.clone(),
            nsr_name: nsr.name.clone(),
            method,
            agent,
            priority: cfg.config_attributes.config_priority,
            delay: Duration::from_secs(cfg.config_attributes.config_delay),
            mgmt_ip: access.mgmt_ip_address.or_else(|| vnfr.mgmt_ip()),
            mgmt_port: vnfr.mgmt_interface.port,
            username: access.username,
            password: access.password,
            script_type: cfg.script.map(|s| s.script_type),
            cfg_file: None,
            cfg_retries: 0,
        };
        if method == ConfigMethod::Netconf {
            if let Some(port) = cfg.netconf.as_ref().and_then(|n| n.port) {
                vnf.mgmt_port = Some(port);
            }
        }
        vnf.cfg_file = materialize(&nsr.dir, &vnf, xlate).await.map_err(|e| {
            ConfigError::Descriptor(format!("failed to write the configuration: {e}"))
        })?;
        self.registry.assign(&vnf)?;
        Ok(vnf)
    }

    /// Stop tracking an NSR: drop it from discovery and from the scheduler, signal any
    /// attempt in flight, tell the config agents and retract its records.
    pub(crate) async fn on_nsr_terminate(&mut self, id: &NsrId) {
        self.discovering.retain(|(pending, _)| pending != id);
        self.sched.remove(id);
        let Some(handle) = self.nsrs.remove(id) else {
            debug!("NSR {id} is not tracked");
            self.board.retract(id).await;
            return;
        };
        info!("Terminating NSR {} ({id})", handle.info.name);
        handle.mark_deleted();
        for vnf in &handle.vnfs {
            self.registry.notify_terminate_vnfr(&handle.info, vnf).await;
        }
        self.board.retract(id).await;
        self.jobs.retract(id).await;
    }
}

fn ticker(period: Duration) -> tokio::time::Interval {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}
