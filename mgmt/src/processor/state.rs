// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Configuration state of an NSR and working records of its VNFs

use config::records::{
    ConfigAgentAccount, ConfigMethod, NameValue, Nsd, NsrConfig, Vnfr,
};
use config::records::AgentType;
use config::status::{CmConnectionPoint, CmMgmtInterface, CmNsr, CmVnfr};
use config::{ConfigError, ConfigState, NsrId, VnfrId};
use ordermap::OrderMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error};

use crate::pool::ParameterPool;
use crate::processor::board::{CmStateBoard, SharedCmNsr};

/// What config agents get to know about an NSR
#[derive(Clone, Debug)]
pub struct NsrInfo {
    pub id: NsrId,
    pub name: String,
    pub nsd: Arc<Nsd>,
    pub config: Option<NsrConfig>,
    /// directory for the files materialized for this NSR
    pub dir: PathBuf,
    pub accounts: Vec<ConfigAgentAccount>,
}

/// Working record of a VNF under configuration. Owned by the configuration manager.
#[derive(Clone, Debug)]
pub struct VnfCfg {
    pub vnfr: Vnfr,
    pub nsr_id: NsrId,
    pub nsr_name: String,
    pub method: ConfigMethod,
    pub agent: AgentType,
    pub priority: u32,
    pub delay: Duration,
    pub mgmt_ip: Option<IpAddr>,
    pub mgmt_port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// interpreter of the script method
    pub script_type: Option<String>,
    /// materialized (translated) configuration template
    pub cfg_file: Option<PathBuf>,
    pub cfg_retries: u32,
}

impl VnfCfg {
    #[must_use]
    pub fn id(&self) -> &VnfrId {
        &self.vnfr.id
    }
    #[must_use]
    pub fn member_index(&self) -> u32 {
        self.vnfr.member_vnf_index_ref
    }
    /// Name of the VNF, unique within the NSR
    #[must_use]
    pub fn unique_name(&self) -> String {
        format!("{}__{}__{}", self.nsr_name, self.vnfr.short_name, self.member_index())
    }
    /// Initial-config primitives declared for the VNF, in `seq` order
    #[must_use]
    pub fn initial_parameters(&self) -> Vec<NameValue> {
        self.vnfr
            .vnf_configuration
            .iter()
            .flat_map(|c| c.initial_primitives())
            .flat_map(|p| p.parameter.iter().cloned())
            .collect()
    }
    /// A short description of the VNF for logs: name, member index and management address
    #[must_use]
    pub fn describe(&self) -> String {
        let mgmt = self
            .mgmt_ip
            .map_or_else(|| "--".to_string(), |ip| ip.to_string());
        format!(
            "NSR '{}' VNF '{}' (member {}, mgmt {mgmt})",
            self.nsr_name,
            self.vnfr.name,
            self.member_index()
        )
    }
}

/// Entry of the priority table
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct PriorityEntry {
    pub vnfr_id: VnfrId,
    pub name: String,
    pub member_vnf_index: u32,
    pub configuration_type: ConfigMethod,
    pub configuration_options: Option<String>,
    #[serde(with = "secs")]
    pub configuration_delay: Duration,
}

mod secs {
    use serde::Serializer;
    use std::time::Duration;
    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }
}

impl PriorityEntry {
    #[must_use]
    pub fn new(vnf: &VnfCfg) -> Self {
        Self {
            vnfr_id: vnf.id().clone(),
            name: vnf.vnfr.name.clone(),
            member_vnf_index: vnf.member_index(),
            configuration_type: vnf.method,
            configuration_options: vnf.script_type.clone(),
            configuration_delay: vnf.delay,
        }
    }
}

/// Handle through which the state of one VNF is advanced, by the scheduler or by the config
/// agent applying its configuration (e.g. the connection sub-states).
#[derive(Clone)]
pub struct VnfProgress {
    status: SharedCmNsr,
    vnfr_id: VnfrId,
    board: CmStateBoard,
}

impl VnfProgress {
    #[must_use]
    pub fn state(&self) -> Option<ConfigState> {
        self.status.lock().vnfr(&self.vnfr_id).map(|v| v.state)
    }
    #[must_use]
    pub fn vnfr_id(&self) -> &VnfrId {
        &self.vnfr_id
    }
    /// Move the VNF to `next` and publish. Transitions out of the table are rejected.
    pub async fn set(&self, next: ConfigState) -> Result<(), ConfigError> {
        {
            let mut nsr = self.status.lock();
            let vnfr = nsr
                .vnfr_mut(&self.vnfr_id)
                .ok_or_else(|| ConfigError::NoSuchVnfr(self.vnfr_id.clone()))?;
            let current = vnfr.state;
            if current == next {
                return Ok(());
            }
            vnfr.state = current.transition(next).inspect_err(|e| {
                error!("VNFR {}: {e}", self.vnfr_id);
            })?;
            debug!("VNFR {}: {current} -> {next}", self.vnfr_id);
        }
        self.board.publish().await;
        Ok(())
    }
    /// Like [`VnfProgress::set`], for callers that can do nothing about a rejected transition
    pub async fn report(&self, next: ConfigState) {
        let _ = self.set(next).await;
    }
}

/// Configuration state of one NSR: its VNFs, their priorities, and the NS and VNF states.
/// Owned by one task at a time: the engine while the NSR is being processed, the
/// scheduler while queued, and the configuration task while an attempt is in flight.
pub struct NsrConfigState {
    info: Arc<NsrInfo>,
    status: SharedCmNsr,
    board: CmStateBoard,
    priority_table: BTreeMap<u32, Vec<PriorityEntry>>,
    vnfr_table: OrderMap<VnfrId, VnfCfg>,
    pending_vnf_queue: VecDeque<VnfrId>,
    being_deleted: Arc<AtomicBool>,
    pub vnf_failed: bool,
    pub nsr_failed: bool,
}

impl NsrConfigState {
    /// Create the configuration state of an NSR and register its status in the board
    #[must_use]
    pub fn new(info: NsrInfo, board: CmStateBoard) -> Self {
        let status = Arc::new(Mutex::new(CmNsr::new(info.id.clone(), &info.name)));
        board.register(status.clone());
        Self {
            info: Arc::new(info),
            status,
            board,
            priority_table: BTreeMap::new(),
            vnfr_table: OrderMap::new(),
            pending_vnf_queue: VecDeque::new(),
            being_deleted: Arc::new(AtomicBool::new(false)),
            vnf_failed: false,
            nsr_failed: false,
        }
    }
    #[must_use]
    pub fn id(&self) -> &NsrId {
        &self.info.id
    }
    #[must_use]
    pub fn name(&self) -> &str {
        &self.info.name
    }
    #[must_use]
    pub fn info(&self) -> &Arc<NsrInfo> {
        &self.info
    }
    #[must_use]
    pub fn status(&self) -> &SharedCmNsr {
        &self.status
    }
    #[must_use]
    pub fn state(&self) -> ConfigState {
        self.status.lock().state
    }

    /// Move the NS to `next` and publish
    pub async fn set_state(&self, next: ConfigState) -> Result<(), ConfigError> {
        {
            let mut nsr = self.status.lock();
            let current = nsr.state;
            if current == next {
                return Ok(());
            }
            nsr.state = current.transition(next).inspect_err(|e| {
                error!("NSR {} ({}): {e}", self.info.name, self.info.id);
            })?;
            debug!("NSR {} ({}): {current} -> {next}", self.info.name, self.info.id);
        }
        self.board.publish().await;
        Ok(())
    }

    #[must_use]
    pub fn being_deleted(&self) -> bool {
        self.being_deleted.load(Ordering::Acquire)
    }
    /// The flag that signals the termination of the NSR to any task configuring it
    #[must_use]
    pub fn deletion_flag(&self) -> Arc<AtomicBool> {
        self.being_deleted.clone()
    }

    /// Track a VNF. Its status record starts at INIT.
    pub fn add_vnfr(&mut self, vnfr: &Vnfr) {
        let mut cm_vnfr = CmVnfr::new(vnfr.id.clone(), &vnfr.name);
        cm_vnfr.mgmt_interface = CmMgmtInterface {
            ip_address: vnfr.mgmt_ip(),
            port: vnfr.mgmt_interface.port,
        };
        cm_vnfr.connection_point = vnfr
            .connection_point
            .iter()
            .map(|cp| CmConnectionPoint {
                name: cp.name.clone(),
                ip_address: cp.ip_address,
            })
            .collect();
        cm_vnfr.cfg_type = vnfr.config_method().map(|m| m.to_string());
        let mut status = self.status.lock();
        if status.vnfr(&vnfr.id).is_none() {
            status.cm_vnfr.push(cm_vnfr);
        }
    }

    /// Attach the working record of a configurable VNF and file it in its priority bucket
    pub fn add_vnf_cfg(&mut self, vnf: VnfCfg) {
        if let Some(cm_vnfr) = self.status.lock().vnfr_mut(vnf.id()) {
            cm_vnfr.cfg_location = vnf.cfg_file.as_ref().map(|p| p.display().to_string());
        }
        self.priority_table
            .entry(vnf.priority)
            .or_default()
            .push(PriorityEntry::new(&vnf));
        self.vnfr_table.insert(vnf.id().clone(), vnf);
    }

    #[must_use]
    pub fn vnf(&self, id: &VnfrId) -> Option<&VnfCfg> {
        self.vnfr_table.get(id)
    }
    pub fn vnfs(&self) -> impl Iterator<Item = &VnfCfg> {
        self.vnfr_table.values()
    }
    #[must_use]
    pub fn priority_table(&self) -> &BTreeMap<u32, Vec<PriorityEntry>> {
        &self.priority_table
    }
    #[must_use]
    pub fn vnf_state(&self, id: &VnfrId) -> Option<ConfigState> {
        self.status.lock().vnfr(id).map(|v| v.state)
    }
    #[must_use]
    pub fn progress(&self, id: &VnfrId) -> VnfProgress {
        VnfProgress {
            status: self.status.clone(),
            vnfr_id: id.clone(),
            board: self.board.clone(),
        }
    }
    pub async fn set_vnf_state(&self, id: &VnfrId, next: ConfigState) -> Result<(), ConfigError> {
        self.progress(id).set(next).await
    }

    /// Count one more configuration attempt of a VNF and return the count
    pub fn bump_retries(&mut self, id: &VnfrId) -> u32 {
        self.vnfr_table.get_mut(id).map_or(0, |vnf| {
            vnf.cfg_retries += 1;
            vnf.cfg_retries
        })
    }

    /// Build the queue of VNFs to configure: ascending priority, discovery order within a
    /// priority.
    pub fn prepare_queue(&mut self) {
        self.pending_vnf_queue = self
            .priority_table
            .values()
            .flatten()
            .filter(|entry| self.vnfr_table.contains_key(&entry.vnfr_id))
            .map(|entry| entry.vnfr_id.clone())
            .collect();
    }
    pub fn pop_pending(&mut self) -> Option<VnfrId> {
        self.pending_vnf_queue.pop_front()
    }
    pub fn requeue_vnf(&mut self, id: VnfrId) {
        self.pending_vnf_queue.push_back(id);
    }
    #[must_use]
    pub fn pending_vnfs(&self) -> Vec<VnfrId> {
        self.pending_vnf_queue.iter().cloned().collect()
    }

    /// What the engine keeps of the NSR while the configuration state is away
    #[must_use]
    pub fn handle(&self, pools: OrderMap<String, ParameterPool>) -> NsrHandle {
        NsrHandle {
            info: self.info.clone(),
            vnfs: self.vnfr_table.values().cloned().collect(),
            pools,
            status: self.status.clone(),
            being_deleted: self.being_deleted.clone(),
        }
    }
}

/// The engine-side view of a tracked NSR: static VNF records, parameter pools and the
/// shared status. Used for termination and for the RPCs.
pub struct NsrHandle {
    pub info: Arc<NsrInfo>,
    pub vnfs: Vec<VnfCfg>,
    pub pools: OrderMap<String, ParameterPool>,
    pub status: SharedCmNsr,
    pub being_deleted: Arc<AtomicBool>,
}

impl NsrHandle {
    #[must_use]
    pub fn state(&self) -> ConfigState {
        self.status.lock().state
    }
    pub fn mark_deleted(&self) {
        self.being_deleted.store(true, Ordering::Release);
    }
    #[must_use]
    pub fn vnf(&self, id: &VnfrId) -> Option<&VnfCfg> {
        self.vnfs.iter().find(|v| v.id() == id)
    }
    #[must_use]
    pub fn vnf_by_index(&self, member_index: u32) -> Option<&VnfCfg> {
        self.vnfs.iter().find(|v| v.member_index() == member_index)
    }
}
