// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The cm-state board: the set of per-NSR status records, published whole on every change.

use config::NsrId;
use config::status::{CmNsr, CmState};
use ordermap::OrderMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error};

use crate::store::{CM_STATE_PATH, OperRecord, RecordStore, cm_nsr_path};

/// Status record of one NSR, shared by the board and the configuration state of the NSR
pub type SharedCmNsr = Arc<Mutex<CmNsr>>;

#[derive(Clone)]
pub struct CmStateBoard {
    entries: Arc<Mutex<OrderMap<NsrId, SharedCmNsr>>>,
    store: Arc<dyn RecordStore>,
    // serializes snapshot+publish so that the store never goes back in time
    publish_lock: Arc<tokio::sync::Mutex<()>>,
}

impl CmStateBoard {
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(OrderMap::new())),
            store,
            publish_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }
    pub fn register(&self, nsr: SharedCmNsr) {
        let id = nsr.lock().id.clone();
        debug!("Tracking cm-state of NSR {id}");
        self.entries.lock().insert(id, nsr);
    }
    pub fn remove(&self, id: &NsrId) -> Option<SharedCmNsr> {
        self.entries.lock().remove(id)
    }
    #[must_use]
    pub fn snapshot(&self) -> CmState {
        let entries = self.entries.lock();
        CmState {
            cm_nsr: entries.values().map(|nsr| nsr.lock().clone()).collect(),
        }
    }

    /// Publish the full cm-state. Failures are logged: the next change publishes again.
    pub async fn publish(&self) {
        let _guard = self.publish_lock.lock().await;
        let snapshot = self.snapshot();
        debug!("Publishing cm-state:\n{snapshot}");
        if let Err(e) = self
            .store
            .publish(CM_STATE_PATH, OperRecord::CmState(snapshot))
            .await
        {
            error!("Failed to publish cm-state: {e}");
        }
    }

    /// Stop tracking an NSR, retract its record and publish the resulting cm-state
    pub async fn retract(&self, id: &NsrId) {
        self.remove(id);
        if let Err(e) = self.store.delete(&cm_nsr_path(id)).await {
            error!("Failed to delete cm-state of NSR {id}: {e}");
        }
        self.publish().await;
    }
}
