// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Config-agent jobs: the record of every exec-ns-config-primitive request, refreshed until
//! all of its primitive executions are over.

use chrono::Utc;
use config::NsrId;
use config::status::{ConfigAgentJob, ExecutionStatus, JobVnfr};
use ordermap::OrderMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
#[allow(unused)]
use tracing::{debug, error, info, warn};

use crate::agents::registry::ConfigAgentRegistry;
use crate::store::{OperRecord, RecordStore, job_path};

#[derive(Clone)]
pub struct JobTable {
    jobs: Arc<Mutex<OrderMap<u64, ConfigAgentJob>>>,
    next_id: Arc<AtomicU64>,
    store: Arc<dyn RecordStore>,
}

impl JobTable {
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            jobs: Arc::new(Mutex::new(OrderMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            store,
        }
    }

    /// Create a job. It stays pending until executions are added or it is finished.
    pub fn create(&self, nsr_id: &NsrId, name: &str, triggered_by: &str) -> u64 {
        let job_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let job = ConfigAgentJob {
            job_id,
            job_name: name.to_owned(),
            nsr_id: nsr_id.clone(),
            job_status: ExecutionStatus::Pending,
            triggered_by: triggered_by.to_owned(),
            create_time: Utc::now(),
            vnfr: vec![],
            job_status_details: None,
        };
        debug!("Created job {job_id} '{name}' for NSR {nsr_id}");
        self.jobs.lock().insert(job_id, job);
        job_id
    }

    /// Set the primitive executions of a job and recompute its status
    pub fn set_executions(&self, job_id: u64, vnfr: Vec<JobVnfr>) -> Option<ExecutionStatus> {
        let mut jobs = self.jobs.lock();
        let job = jobs.get_mut(&job_id)?;
        job.vnfr = vnfr;
        job.refresh_status();
        Some(job.job_status)
    }

    /// Set the final status of a job with no per-VNF execution (NS scripts)
    pub fn finish(&self, job_id: u64, status: ExecutionStatus, details: Option<String>) {
        if let Some(job) = self.jobs.lock().get_mut(&job_id) {
            job.job_status = status;
            job.job_status_details = details;
            info!("Job {job_id} '{}' is {status}", job.job_name);
        }
    }

    #[must_use]
    pub fn get(&self, job_id: u64) -> Option<ConfigAgentJob> {
        self.jobs.lock().get(&job_id).cloned()
    }

    /// Drop the jobs of an NSR
    pub fn remove_nsr(&self, nsr_id: &NsrId) -> Vec<u64> {
        let mut jobs = self.jobs.lock();
        let ids: Vec<u64> = jobs
            .values()
            .filter(|job| &job.nsr_id == nsr_id)
            .map(|job| job.job_id)
            .collect();
        for id in &ids {
            jobs.remove(id);
        }
        ids
    }

    pub async fn publish(&self, job_id: u64) {
        let Some(job) = self.get(job_id) else {
            return;
        };
        debug!("Publishing job:\n{job}");
        if let Err(e) = self.store.publish(&job_path(job_id), OperRecord::Job(job)).await {
            error!("Failed to publish job {job_id}: {e}");
        }
    }

    pub async fn retract(&self, nsr_id: &NsrId) {
        for job_id in self.remove_nsr(nsr_id) {
            if let Err(e) = self.store.delete(&job_path(job_id)).await {
                error!("Failed to delete job {job_id}: {e}");
            }
        }
    }

    /// Refresh the executions still pending from the config agents, and publish the jobs
    /// that changed.
    pub async fn refresh(&self, registry: &ConfigAgentRegistry) {
        let pending: Vec<(u64, Vec<String>)> = self
            .jobs
            .lock()
            .values()
            .filter(|job| job.job_status == ExecutionStatus::Pending)
            .map(|job| (job.job_id, job.pending_executions()))
            .filter(|(_, executions)| !executions.is_empty())
            .collect();

        for (job_id, executions) in pending {
            for execution_id in &executions {
                registry.poll_action_status(execution_id).await;
            }
            let changed = {
                let mut jobs = self.jobs.lock();
                let Some(job) = jobs.get_mut(&job_id) else {
                    continue;
                };
                let mut changed = false;
                for primitive in job.vnfr.iter_mut().flat_map(|v| v.primitive.iter_mut()) {
                    if primitive.execution_status != ExecutionStatus::Pending {
                        continue;
                    }
                    if let Some(status) = registry.get_action_status(&primitive.execution_id) {
                        changed |= status != primitive.execution_status;
                        primitive.execution_status = status;
                    }
                }
                job.refresh_status();
                changed
            };
            if changed {
                self.publish(job_id).await;
            }
        }
    }
}
