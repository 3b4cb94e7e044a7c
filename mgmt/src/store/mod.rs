// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Record store contract.
//!
//! The configuration manager reads NSR, NSD, VNFR, VLR and config-agent account records from
//! a record store and publishes its operational objects (cm-state, jobs) to it, at
//! structured paths. NSR lifecycle changes are delivered through a broadcast subscription.

mod memory;

pub use memory::MemoryRecordStore;

use async_trait::async_trait;
use config::records::{ConfigAgentAccount, Nsd, Nsr, NsrConfig, Vlr, Vnfr};
use config::status::{CmState, ConfigAgentJob};
use config::{NsrId, VnfrId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

/// Path of the aggregate cm-state snapshot
pub const CM_STATE_PATH: &str = "/cm-state";

/// Path of the cm-state record of one NSR
#[must_use]
pub fn cm_nsr_path(nsr_id: &NsrId) -> String {
    format!("{CM_STATE_PATH}/cm-nsr[id='{nsr_id}']")
}

/// Path of a config-agent job
#[must_use]
pub fn job_path(job_id: u64) -> String {
    format!("/cm-jobs/job[id='{job_id}']")
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("Record store is unavailable")]
    Unavailable,
    #[error("Malformed records: {0}")]
    Malformed(String),
    #[error("Record store failure: {0}")]
    Failure(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for config::ConfigError {
    fn from(e: StoreError) -> Self {
        config::ConfigError::Store(e.to_string())
    }
}

/// The operational objects the configuration manager publishes
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperRecord {
    CmState(CmState),
    Job(ConfigAgentJob),
}

/// NSR lifecycle notification
#[derive(Clone, Debug, PartialEq)]
pub enum NsrEvent {
    Create(Nsr),
    Update(Nsr),
    Delete(NsrId),
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_nsrs(&self) -> StoreResult<Vec<Nsr>>;
    async fn get_nsr(&self, id: &NsrId) -> StoreResult<Option<Nsr>>;
    async fn get_nsr_config(&self, id: &NsrId) -> StoreResult<Option<NsrConfig>>;
    /// The descriptor an NSR was instantiated from
    async fn get_nsd(&self, nsr_id: &NsrId) -> StoreResult<Option<Nsd>>;
    async fn get_vnfr(&self, id: &VnfrId) -> StoreResult<Option<Vnfr>>;
    async fn get_vlr(&self, id: &str) -> StoreResult<Option<Vlr>>;
    /// Config-agent accounts, all of them or the one with the given name
    async fn get_config_agents(&self, name: Option<&str>) -> StoreResult<Vec<ConfigAgentAccount>>;
    /// Publish an operational object at a path. Last write wins.
    async fn publish(&self, path: &str, record: OperRecord) -> StoreResult<()>;
    async fn delete(&self, path: &str) -> StoreResult<()>;
    fn subscribe_nsr(&self) -> broadcast::Receiver<NsrEvent>;
}
