// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Models for the network-service configuration manager.
//!
//! The records (NSR, VNFR, NSD, VLR and config-agent accounts) are what the record store
//! provides and are read-only for the configuration manager. The [`ConfigState`] machine,
//! the published cm-state snapshot ([`status::CmState`]), the config-agent jobs and the RPC
//! inputs and outputs are the objects the configuration manager owns and publishes.

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod display;
pub mod errors;
pub mod records;
pub mod rpc;
pub mod state;
pub mod status;

pub use errors::{ConfigError, ConfigResult, stringify}; // re-export
pub use records::{NsrId, VnfrId}; // re-export
pub use state::ConfigState; // re-export

use tracectl::trace_target;
trace_target!("config", tracectl::LevelFilter::INFO, &["management"]);
