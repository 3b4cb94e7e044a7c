// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! In-memory record store

use async_trait::async_trait;
use config::records::{ConfigAgentAccount, Nsd, Nsr, NsrConfig, NsrOperStatus, Vlr, Vnfr};
use config::status::{CmState, ConfigAgentJob};
use config::{NsrId, VnfrId};
use ordermap::OrderMap;
use parking_lot::RwLock;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;
use tracing::debug;

use super::{NsrEvent, OperRecord, RecordStore, StoreError, StoreResult};
use super::{CM_STATE_PATH, job_path};

/// Layout of the YAML documents a [`MemoryRecordStore`] can be seeded from
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RecordSeed {
    #[serde(default)]
    nsr: Vec<Nsr>,
    #[serde(default)]
    nsr_config: Vec<NsrConfig>,
    #[serde(default)]
    nsd: Vec<Nsd>,
    #[serde(default)]
    vnfr: Vec<Vnfr>,
    #[serde(default)]
    vlr: Vec<Vlr>,
    #[serde(default)]
    config_agent: Vec<ConfigAgentAccount>,
}

#[derive(Default)]
struct MemoryDb {
    nsrs: OrderMap<NsrId, Nsr>,
    nsr_configs: OrderMap<NsrId, NsrConfig>,
    nsds: OrderMap<String, Nsd>,
    vnfrs: OrderMap<VnfrId, Vnfr>,
    vlrs: OrderMap<String, Vlr>,
    accounts: Vec<ConfigAgentAccount>,
    oper: OrderMap<String, OperRecord>,
}

/// A [`RecordStore`] that keeps everything in memory
pub struct MemoryRecordStore {
    db: RwLock<MemoryDb>,
    events: broadcast::Sender<NsrEvent>,
    unavailable: AtomicBool,
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRecordStore {
    const EVENT_QUEUE_LEN: usize = 256;

    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(Self::EVENT_QUEUE_LEN);
        Self {
            db: RwLock::new(MemoryDb::default()),
            events,
            unavailable: AtomicBool::new(false),
        }
    }

    /// Build a store out of a YAML document with (optional) sequences `nsr`, `nsr-config`,
    /// `nsd`, `vnfr`, `vlr` and `config-agent`.
    pub fn from_yaml(yaml: &str) -> StoreResult<Self> {
        let seed: RecordSeed =
            serde_yaml_ng::from_str(yaml).map_err(|e| StoreError::Malformed(e.to_string()))?;
        let store = Self::new();
        {
            let mut db = store.db.write();
            for nsd in seed.nsd {
                db.nsds.insert(nsd.id.clone(), nsd);
            }
            for vnfr in seed.vnfr {
                db.vnfrs.insert(vnfr.id.clone(), vnfr);
            }
            for vlr in seed.vlr {
                db.vlrs.insert(vlr.id.clone(), vlr);
            }
            for cfg in seed.nsr_config {
                db.nsr_configs.insert(cfg.id.clone(), cfg);
            }
            for nsr in seed.nsr {
                db.nsrs.insert(nsr.id.clone(), nsr);
            }
            db.accounts = seed.config_agent;
            debug!(
                "Seeded record store: {} NSRs, {} NSDs, {} VNFRs",
                db.nsrs.len(),
                db.nsds.len(),
                db.vnfrs.len()
            );
        }
        Ok(store)
    }

    fn notify(&self, event: NsrEvent) {
        // no subscribers is not an error
        let _ = self.events.send(event);
    }

    /// Make every operation fail with [`StoreError::Unavailable`], or stop doing so
    pub fn set_unavailable(&self, value: bool) {
        self.unavailable.store(value, Ordering::Relaxed);
    }
    fn check(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::Relaxed) {
            Err(StoreError::Unavailable)
        } else {
            Ok(())
        }
    }

    /// Add or replace an NSR, notifying subscribers
    pub fn put_nsr(&self, nsr: Nsr) {
        let existed = self.db.write().nsrs.insert(nsr.id.clone(), nsr.clone()).is_some();
        if existed {
            self.notify(NsrEvent::Update(nsr));
        } else {
            self.notify(NsrEvent::Create(nsr));
        }
    }
    /// Change the operational status of an NSR, notifying subscribers
    pub fn set_nsr_status(&self, id: &NsrId, status: NsrOperStatus) -> StoreResult<()> {
        let nsr = {
            let mut db = self.db.write();
            let nsr = db
                .nsrs
                .get_mut(id)
                .ok_or_else(|| StoreError::Failure(format!("no NSR {id}")))?;
            nsr.operational_status = status;
            nsr.clone()
        };
        self.notify(NsrEvent::Update(nsr));
        Ok(())
    }
    pub fn remove_nsr(&self, id: &NsrId) {
        if self.db.write().nsrs.remove(id).is_some() {
            self.notify(NsrEvent::Delete(id.clone()));
        }
    }
    pub fn put_nsd(&self, nsd: Nsd) {
        self.db.write().nsds.insert(nsd.id.clone(), nsd);
    }
    pub fn put_nsr_config(&self, cfg: NsrConfig) {
        self.db.write().nsr_configs.insert(cfg.id.clone(), cfg);
    }
    pub fn put_vnfr(&self, vnfr: Vnfr) {
        self.db.write().vnfrs.insert(vnfr.id.clone(), vnfr);
    }
    pub fn put_vlr(&self, vlr: Vlr) {
        self.db.write().vlrs.insert(vlr.id.clone(), vlr);
    }
    pub fn add_account(&self, account: ConfigAgentAccount) {
        self.db.write().accounts.push(account);
    }

    /// The operational object published at `path`, if any
    #[must_use]
    pub fn oper(&self, path: &str) -> Option<OperRecord> {
        self.db.read().oper.get(path).cloned()
    }
    /// The last cm-state snapshot published
    #[must_use]
    pub fn cm_state(&self) -> Option<CmState> {
        match self.oper(CM_STATE_PATH) {
            Some(OperRecord::CmState(state)) => Some(state),
            _ => None,
        }
    }
    #[must_use]
    pub fn job(&self, job_id: u64) -> Option<ConfigAgentJob> {
        match self.oper(&job_path(job_id)) {
            Some(OperRecord::Job(job)) => Some(job),
            _ => None,
        }
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get_nsrs(&self) -> StoreResult<Vec<Nsr>> {
        self.check()?;
        Ok(self.db.read().nsrs.values().cloned().collect())
    }
    async fn get_nsr(&self, id: &NsrId) -> StoreResult<Option<Nsr>> {
        self.check()?;
        Ok(self.db.read().nsrs.get(id).cloned())
    }
    async fn get_nsr_config(&self, id: &NsrId) -> StoreResult<Option<NsrConfig>> {
        self.check()?;
        Ok(self.db.read().nsr_configs.get(id).cloned())
    }
    async fn get_nsd(&self, nsr_id: &NsrId) -> StoreResult<Option<Nsd>> {
        self.check()?;
        let db = self.db.read();
        Ok(db
            .nsrs
            .get(nsr_id)
            .and_then(|nsr| db.nsds.get(&nsr.nsd_ref))
            .cloned())
    }
    async fn get_vnfr(&self, id: &VnfrId) -> StoreResult<Option<Vnfr>> {
        self.check()?;
        Ok(self.db.read().vnfrs.get(id).cloned())
    }
    async fn get_vlr(&self, id: &str) -> StoreResult<Option<Vlr>> {
        self.check()?;
        Ok(self.db.read().vlrs.get(id).cloned())
    }
    async fn get_config_agents(&self, name: Option<&str>) -> StoreResult<Vec<ConfigAgentAccount>> {
        self.check()?;
        Ok(self
            .db
            .read()
            .accounts
            .iter()
            .filter(|a| name.is_none_or(|name| a.name == name))
            .cloned()
            .collect())
    }
    async fn publish(&self, path: &str, record: OperRecord) -> StoreResult<()> {
        self.check()?;
        self.db.write().oper.insert(path.to_owned(), record);
        Ok(())
    }
    async fn delete(&self, path: &str) -> StoreResult<()> {
        self.check()?;
        self.db.write().oper.remove(path);
        Ok(())
    }
    fn subscribe_nsr(&self) -> broadcast::Receiver<NsrEvent> {
        self.events.subscribe()
    }
}
