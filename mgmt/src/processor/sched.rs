// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The configuration scheduler: a FIFO of NSRs waiting for a configuration attempt, and the
//! attempts in flight. Attempts run as tasks and report back to the engine, which hands the
//! reports to [`ConfigScheduler::reap`].

use config::status::ConfigStatus;
use config::{ConfigState, NsrId};
use futures::future::join_all;
use ordermap::OrderMap;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
#[allow(unused)]
use tracing::{debug, error, info, warn};

use crate::agents::NsConfigRequest;
use crate::agents::registry::ConfigAgentRegistry;
use crate::processor::params::CmParams;
use crate::processor::state::{NsrConfigState, VnfCfg};
use crate::store::RecordStore;

/// What configuration attempts need besides the state of the NSR
pub struct SchedCtx {
    pub params: CmParams,
    pub store: Arc<dyn RecordStore>,
    pub registry: Arc<ConfigAgentRegistry>,
}

/// An NSR waiting in the scheduler, with what is left of its retry budget
pub struct SchedItem {
    pub state: NsrConfigState,
    pub retries_left: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// every VNF and the NS initial config succeeded
    Configured,
    /// a VNF or the NS initial config failed for good
    Failed,
    /// the NSR was not ready for configuration: try again later
    Retry,
    /// the NSR went away during the attempt
    Deleted,
}

pub struct AttemptReport {
    attempt_id: u64,
    item: SchedItem,
    pub outcome: AttemptOutcome,
}
impl AttemptReport {
    #[must_use]
    pub fn nsr_id(&self) -> &NsrId {
        self.item.state.id()
    }
}

const REPORT_CHANNEL_SIZE: usize = 64;

pub struct ConfigScheduler {
    pending: VecDeque<SchedItem>,
    inflight: OrderMap<NsrId, (u64, JoinHandle<()>)>,
    next_attempt: u64,
    report_tx: mpsc::Sender<AttemptReport>,
    ctx: Arc<SchedCtx>,
}

impl ConfigScheduler {
    #[must_use]
    pub fn new(ctx: SchedCtx) -> (Self, mpsc::Receiver<AttemptReport>) {
        let (report_tx, report_rx) = mpsc::channel(REPORT_CHANNEL_SIZE);
        let sched = Self {
            pending: VecDeque::new(),
            inflight: OrderMap::new(),
            next_attempt: 1,
            report_tx,
            ctx: Arc::new(ctx),
        };
        (sched, report_rx)
    }

    /// Queue an NSR for configuration. Only an NSR in RECEIVED that is not queued yet is
    /// accepted; anything else is dropped and `false` returned.
    pub async fn enqueue(&mut self, state: NsrConfigState, retries: u32) -> bool {
        if state.state() != ConfigState::Received {
            debug!(
                "Not scheduling NSR {} in state {}",
                state.name(),
                state.state()
            );
            return false;
        }
        if self.is_pending(state.id()) {
            debug!("NSR {} is already scheduled", state.name());
            return false;
        }
        if state.set_state(ConfigState::CfgSched).await.is_err() {
            return false;
        }
        info!("Scheduled configuration of NSR {} ({})", state.name(), state.id());
        self.pending.push_back(SchedItem {
            state,
            retries_left: retries,
        });
        true
    }

    #[must_use]
    pub fn is_pending(&self, id: &NsrId) -> bool {
        self.pending.iter().any(|item| item.state.id() == id)
    }
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
    #[must_use]
    pub fn pending_ids(&self) -> Vec<NsrId> {
        self.pending.iter().map(|i| i.state.id().clone()).collect()
    }
    #[must_use]
    pub fn is_inflight(&self, id: &NsrId) -> bool {
        self.inflight.contains_key(id)
    }

    /// Drop a queued NSR. An attempt in flight is left to notice the deletion flag.
    pub fn remove(&mut self, id: &NsrId) {
        self.pending.retain(|item| item.state.id() != id);
    }

    /// Start a configuration attempt for the NSR at the head of the queue
    pub fn tick(&mut self) {
        let Some(item) = self.pending.pop_front() else {
            return;
        };
        let id = item.state.id().clone();
        let attempt_id = self.next_attempt;
        self.next_attempt += 1;
        debug!(
            "Starting configuration attempt {attempt_id} of NSR {} ({} retries left)",
            item.state.name(),
            item.retries_left
        );

        let ctx = self.ctx.clone();
        let report_tx = self.report_tx.clone();
        let handle = tokio::spawn(async move {
            let mut item = item;
            let outcome = run_attempt(&mut item.state, &ctx).await;
            let report = AttemptReport {
                attempt_id,
                item,
                outcome,
            };
            if report_tx.send(report).await.is_err() {
                warn!("Configuration manager left: dropping report of attempt {attempt_id}");
            }
        });
        if let Some((stale_id, stale)) = self.inflight.insert(id.clone(), (attempt_id, handle)) {
            warn!("Cancelling stale configuration attempt {stale_id} of NSR {id}");
            stale.abort();
        }
    }

    /// Process the report of a finished attempt. NSRs that were not ready go back to the
    /// tail of the queue while their retry budget lasts.
    pub async fn reap(&mut self, report: AttemptReport) {
        let id = report.nsr_id().clone();
        match self.inflight.get(&id) {
            Some((attempt_id, _)) if *attempt_id == report.attempt_id => {
                self.inflight.remove(&id);
            }
            _ => {
                debug!("Ignoring report of stale attempt {}", report.attempt_id);
                return;
            }
        }
        let AttemptReport {
            mut item, outcome, ..
        } = report;
        let name = item.state.name().to_owned();
        match outcome {
            AttemptOutcome::Configured => info!("NSR {name} ({id}) is configured"),
            AttemptOutcome::Failed => error!("Configuration of NSR {name} ({id}) failed"),
            AttemptOutcome::Deleted => info!("NSR {name} ({id}) was deleted during configuration"),
            AttemptOutcome::Retry if item.state.being_deleted() => {
                debug!("Not rescheduling deleted NSR {name}");
            }
            AttemptOutcome::Retry if item.retries_left > 0 => {
                item.retries_left -= 1;
                debug!("Rescheduling NSR {name} ({} retries left)", item.retries_left);
                self.pending.push_back(item);
            }
            AttemptOutcome::Retry => {
                error!("NSR {name} ({id}) never became ready for configuration: giving up");
                let _ = item.state.set_state(ConfigState::CfgFailed).await;
            }
        }
    }
}

/// One configuration attempt of an NSR: its VNFs in priority order, then the initial
/// primitives of the NS.
pub(crate) async fn run_attempt(state: &mut NsrConfigState, ctx: &SchedCtx) -> AttemptOutcome {
    if state.being_deleted() {
        return AttemptOutcome::Deleted;
    }
    match ctx.store.get_nsr(state.id()).await {
        Ok(Some(nsr)) if nsr.is_running() => {}
        Ok(Some(nsr)) => {
            info!(
                "NSR {} is {}: configuration deferred",
                state.name(),
                nsr.operational_status
            );
            return AttemptOutcome::Retry;
        }
        Ok(None) => {
            warn!("NSR {} not found in the record store", state.name());
            return AttemptOutcome::Retry;
        }
        Err(e) => {
            error!("Failed to fetch NSR {}: {e}", state.name());
            return AttemptOutcome::Retry;
        }
    }
    if state.set_state(ConfigState::CfgSend).await.is_err() {
        return AttemptOutcome::Failed;
    }

    state.prepare_queue();
    while let Some(vnf_id) = state.pop_pending() {
        if state.being_deleted() {
            info!("NSR {} is being deleted: stopping configuration", state.name());
            return AttemptOutcome::Deleted;
        }
        let Some(vnf) = state.vnf(&vnf_id).cloned() else {
            continue;
        };
        let progress = state.progress(&vnf_id);
        if progress.state().is_some_and(ConfigState::is_success) {
            continue;
        }
        if vnf.cfg_retries == 0 {
            if !vnf.delay.is_zero() {
                progress.report(ConfigState::CfgDelay).await;
                debug!("Delaying configuration of {} by {:?}", vnf.describe(), vnf.delay);
                tokio::time::sleep(vnf.delay).await;
            }
        } else {
            tokio::time::sleep(ctx.params.vnf_retry_backoff).await;
        }

        let attempts = state.bump_retries(&vnf_id);
        info!("Configuring {} (attempt {attempts})", vnf.describe());
        if ctx
            .registry
            .apply_initial_config(state.info(), &vnf, &progress)
            .await
        {
            if progress.state() != Some(ConfigState::CfgSend) {
                progress.report(ConfigState::CfgSend).await;
            }
            if progress.set(ConfigState::Ready).await.is_ok() {
                info!("{} is configured", vnf.describe());
            }
            continue;
        }

        let status = ctx.registry.get_config_status(state.info(), &vnf).await;
        if status == ConfigStatus::Error || attempts >= ctx.params.vnf_retries {
            error!(
                "Failed to configure {} after {attempts} attempts (agent status {status})",
                vnf.describe()
            );
            progress.report(ConfigState::CfgFailed).await;
            state.vnf_failed = true;
        } else {
            progress.report(ConfigState::CfgSched).await;
            state.requeue_vnf(vnf_id);
        }
    }

    if state.being_deleted() {
        return AttemptOutcome::Deleted;
    }
    if !state.vnf_failed && !run_ns_initial_config(state, ctx).await {
        state.nsr_failed = true;
    }
    let (next, outcome) = if state.vnf_failed || state.nsr_failed {
        (ConfigState::CfgFailed, AttemptOutcome::Failed)
    } else {
        (ConfigState::Ready, AttemptOutcome::Configured)
    };
    let _ = state.set_state(next).await;
    outcome
}

/// Run the initial primitives of the NS, in `seq` order, through every agent managing a
/// VNF of the NSR, concurrently across agents. Returns false on the first failure.
async fn run_ns_initial_config(state: &NsrConfigState, ctx: &SchedCtx) -> bool {
    let nsd = state.info().nsd.clone();
    let primitives = nsd.initial_primitives();
    if primitives.is_empty() {
        return true;
    }
    let vnfs: Vec<VnfCfg> = state.vnfs().cloned().collect();
    let agents = ctx.registry.agents_for(&vnfs);
    for primitive in primitives {
        let request = NsConfigRequest {
            name: primitive.name.clone(),
            user_defined_script: primitive.user_defined_script.clone(),
            parameter: primitive.parameter.clone(),
            triggered_by: "initial-config".to_string(),
        };
        info!(
            "Running initial primitive {} '{}' of NSR {}",
            primitive.seq,
            primitive.name,
            state.name()
        );
        let mut tasks = Vec::with_capacity(agents.len());
        for (plugin, managed) in &agents {
            match ctx
                .registry
                .apply_ns_config(plugin, state.info(), managed, &request)
                .await
            {
                Ok(Some(task)) => tasks.push(task),
                Ok(None) => {}
                Err(_) => return false,
            }
        }
        for result in join_all(tasks).await {
            match result {
                Ok(Ok(true)) => {}
                Ok(Ok(false)) => {
                    error!("Initial primitive '{}' of NSR {} failed", primitive.name, state.name());
                    return false;
                }
                Ok(Err(e)) => {
                    error!(
                        "Initial primitive '{}' of NSR {} failed: {e}",
                        primitive.name,
                        state.name()
                    );
                    return false;
                }
                Err(e) => {
                    error!("Initial primitive '{}' task failed: {e}", primitive.name);
                    return false;
                }
            }
        }
    }
    true
}
