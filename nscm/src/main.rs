// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![deny(clippy::all, clippy::pedantic)]
#![deny(rustdoc::all)]
#![allow(rustdoc::missing_crate_level_docs)]

use args::{CmdArgs, Parser};
use mgmt::processor::launch::start_mgmt;
use mgmt::store::MemoryRecordStore;
use std::sync::Arc;
use tracectl::{get_trace_ctl, trace_target};
use tracing::{error, info, level_filters::LevelFilter};

trace_target!("nscm", LevelFilter::INFO, &[]);
fn init_logging() {
    let tctl = get_trace_ctl();
    tctl.set_default_level(LevelFilter::INFO);
}

fn load_records(args: &CmdArgs) -> MemoryRecordStore {
    let Some(path) = args.records() else {
        info!("No records file given: starting with an empty record store");
        return MemoryRecordStore::new();
    };
    let yaml = match std::fs::read_to_string(path) {
        Ok(yaml) => yaml,
        Err(e) => {
            error!("Failed to read records from {}: {e}", path.display());
            panic!("Failed to read records from {}: {e}", path.display());
        }
    };
    match MemoryRecordStore::from_yaml(&yaml) {
        Ok(store) => store,
        Err(e) => {
            error!("Bad records file {}: {e}", path.display());
            panic!("Bad records file {}: {e}", path.display());
        }
    }
}

fn main() {
    /* parse cmd line args */
    let args = CmdArgs::parse();

    /* initialize logging */
    init_logging();
    if let Some(tracing) = args.tracing() {
        if let Err(e) = get_trace_ctl().setup_from_string(tracing) {
            error!("Invalid tracing configuration: {e}");
            panic!("Invalid tracing configuration: {e}");
        }
    }
    if args.show_tracing_tags() {
        get_trace_ctl().dump_targets_by_tag();
        std::process::exit(0);
    }
    if args.show_tracing_targets() {
        get_trace_ctl().dump();
        std::process::exit(0);
    }

    let params = match args.cm_params() {
        Ok(params) => params,
        Err(e) => {
            error!("{e}");
            panic!("Configuration manager parameters are invalid. Aborting...");
        }
    };
    info!("Starting NS configuration manager...");
    info!("{params}");

    let store = Arc::new(load_records(&args));

    let (stop_tx, stop_rx) = std::sync::mpsc::channel();
    ctrlc::set_handler(move || stop_tx.send(()).expect("Error sending SIGINT signal"))
        .expect("failed to set SIGINT handler");

    /* start management; no Juju controller client is linked in */
    let (handle, ctl) =
        start_mgmt(params, store, None).expect("Failed to start the configuration manager");

    stop_rx.recv().expect("failed to receive stop signal");
    info!("Shutting down NS configuration manager");
    if let Err(e) = ctl.blocking_finish() {
        error!("{e}");
    }
    if handle.join().is_err() {
        error!("Configuration manager thread panicked");
    }
    std::process::exit(0);
}
