// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use std::io::Error;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, info};

use crate::agents::juju::JujuConnector;
use crate::agents::registry::ConfigAgentRegistry;
use crate::processor::ctl::CmCtlSender;
use crate::processor::params::CmParams;
use crate::processor::proc::ConfigManager;
use crate::store::RecordStore;

/// Start the configuration manager in its own thread. Returns the handle of the thread and
/// the sender to control the manager. The thread exits when the manager is told to finish.
pub fn start_mgmt(
    params: CmParams,
    store: Arc<dyn RecordStore>,
    juju: Option<Arc<dyn JujuConnector>>,
) -> Result<(JoinHandle<()>, CmCtlSender), Error> {
    let registry = Arc::new(ConfigAgentRegistry::new(&params, juju));
    let (manager, ctl) = ConfigManager::new(params, store, registry);

    let handle = std::thread::Builder::new()
        .name("mgmt".to_string())
        .spawn(move || {
            debug!("Starting configuration manager thread");

            /* create tokio runtime */
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_io()
                .enable_time()
                .build()
                .expect("Tokio runtime creation failed");

            /* block thread to run the configuration manager */
            rt.block_on(manager.run());
            info!("Configuration manager thread exiting");
        })?;
    Ok((handle, ctl))
}
