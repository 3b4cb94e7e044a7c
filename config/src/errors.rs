// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Type for configuration failures.
//! These are the errors surfaced synchronously to callers (RPC requests, agent assignment,
//! state transitions). Failures to configure a VNF are not errors of this kind: they are
//! recorded in the published cm-state instead.

use crate::records::{NsrId, VnfrId};
use crate::state::ConfigState;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Unknown config agent type '{0}'")]
    UnknownAgentType(String),
    #[error("Failed to add VNFR {0} to config agent: {1}")]
    ConfigAgentVnfrAdd(VnfrId, String),
    #[error("No config agent account of type '{0}' is configured")]
    NoSuchAgent(String),
    #[error("Config agent account '{0}' already exists")]
    DuplicateAccount(String),
    #[error("No NSR with id {0}")]
    NoSuchNsr(NsrId),
    #[error("No VNFR with id {0}")]
    NoSuchVnfr(VnfrId),
    #[error("No NSD for NSR {0}")]
    NoSuchNsd(NsrId),
    #[error("No config primitive '{0}'")]
    NoSuchPrimitive(String),
    #[error("No parameter pool '{0}'")]
    NoSuchPool(String),
    #[error("Parameter pool '{0}' is exhausted")]
    PoolExhausted(String),
    #[error("Invalid transition {from} -> {to}")]
    InvalidTransition { from: ConfigState, to: ConfigState },
    #[error("NSR {0} is already being configured")]
    AlreadyProcessed(NsrId),
    #[error("Descriptor error: {0}")]
    Descriptor(String),
    #[error("Missing mandatory parameter: {0}")]
    MissingParameter(String),
    #[error("Record store failure: {0}")]
    Store(String),
    #[error("Internal error: {0}")]
    InternalFailure(String),
}

/// Result-like type for configurations
pub type ConfigResult = Result<(), ConfigError>;

#[must_use]
pub fn stringify(conf_result: &ConfigResult) -> String {
    match conf_result {
        Ok(()) => "Ok".to_string(),
        Err(e) => format!("FAILED: {e}"),
    }
}
