// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Configuration lifecycle of NSRs and VNFRs.
//!
//! ```text
//! INIT ─► RECEIVED ─► CFG_PROCESS ─► CFG_SCHED ─► [CFG_DELAY] ─► CONNECTING ─► *_CONNECTED ─► CFG_SEND ─► READY
//!  │                      │              ▲                          │  ▲                          │
//!  │                      ▼              │                          ▼  │                          ▼
//!  └─► READY_NO_CFG   CFG_PROCESS_FAILED └──── retry ◄───────── FAILED_CONNECTION ──────────► CFG_FAILED
//! ```
//!
//! The NS-level state uses the same enum and skips the connection sub-states. Every state
//! between CFG_SCHED and CFG_SEND may fail (CFG_FAILED) or re-enter CFG_SCHED for a retry.
//! Transitions not in [`ConfigState::can_transition_to`] are rejected.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigState {
    #[default]
    Init,
    Received,
    CfgProcess,
    CfgProcessFailed,
    CfgSched,
    CfgDelay,
    Connecting,
    FailedConnection,
    NetconfConnected,
    NetconfSshConnected,
    RestconfConnected,
    CfgSend,
    CfgFailed,
    ReadyNoCfg,
    Ready,
}

impl ConfigState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ConfigState::Init => "init",
            ConfigState::Received => "received",
            ConfigState::CfgProcess => "cfg_process",
            ConfigState::CfgProcessFailed => "cfg_process_failed",
            ConfigState::CfgSched => "cfg_sched",
            ConfigState::CfgDelay => "cfg_delay",
            ConfigState::Connecting => "connecting",
            ConfigState::FailedConnection => "failed_connection",
            ConfigState::NetconfConnected => "netconf_connected",
            ConfigState::NetconfSshConnected => "netconf_ssh_connected",
            ConfigState::RestconfConnected => "restconf_connected",
            ConfigState::CfgSend => "cfg_send",
            ConfigState::CfgFailed => "cfg_failed",
            ConfigState::ReadyNoCfg => "ready_no_cfg",
            ConfigState::Ready => "ready",
        }
    }

    #[must_use]
    pub fn is_connected(self) -> bool {
        matches!(
            self,
            ConfigState::NetconfConnected
                | ConfigState::NetconfSshConnected
                | ConfigState::RestconfConnected
        )
    }

    /// States from which nothing moves on without an explicit retry.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ConfigState::Ready
                | ConfigState::ReadyNoCfg
                | ConfigState::CfgFailed
                | ConfigState::CfgProcessFailed
        )
    }

    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, ConfigState::Ready | ConfigState::ReadyNoCfg)
    }

    /// The transition table.
    #[must_use]
    pub fn can_transition_to(self, next: ConfigState) -> bool {
        use ConfigState::{
            CfgDelay, CfgFailed, CfgProcess, CfgProcessFailed, CfgSched, CfgSend, Connecting,
            FailedConnection, Init, NetconfConnected, NetconfSshConnected, Ready, ReadyNoCfg,
            Received, RestconfConnected,
        };
        match self {
            Init => matches!(next, Received | ReadyNoCfg),
            Received => matches!(next, CfgProcess | CfgSched | CfgProcessFailed),
            CfgProcess => matches!(next, CfgSched | CfgProcessFailed),
            CfgSched => matches!(next, CfgDelay | Connecting | CfgSend | CfgFailed),
            CfgDelay => matches!(next, Connecting | CfgSend | CfgFailed | CfgSched),
            Connecting => matches!(
                next,
                FailedConnection
                    | NetconfConnected
                    | NetconfSshConnected
                    | RestconfConnected
                    | CfgFailed
                    | CfgSched
            ),
            FailedConnection => matches!(next, Connecting | CfgFailed | CfgSched),
            NetconfConnected | NetconfSshConnected | RestconfConnected => {
                matches!(next, CfgSend | CfgFailed | CfgSched)
            }
            CfgSend => matches!(next, Ready | CfgFailed | CfgSched),
            CfgFailed => matches!(next, CfgSched),
            Ready | ReadyNoCfg | CfgProcessFailed => false,
        }
    }

    /// Validate a transition to `next`. Staying in the same state is accepted.
    pub fn transition(self, next: ConfigState) -> Result<ConfigState, ConfigError> {
        if self == next || self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(ConfigError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl Display for ConfigState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ConfigState {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const ALL: [ConfigState; 15] = [
            ConfigState::Init,
            ConfigState::Received,
            ConfigState::CfgProcess,
            ConfigState::CfgProcessFailed,
            ConfigState::CfgSched,
            ConfigState::CfgDelay,
            ConfigState::Connecting,
            ConfigState::FailedConnection,
            ConfigState::NetconfConnected,
            ConfigState::NetconfSshConnected,
            ConfigState::RestconfConnected,
            ConfigState::CfgSend,
            ConfigState::CfgFailed,
            ConfigState::ReadyNoCfg,
            ConfigState::Ready,
        ];
        ALL.into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| format!("Unknown config state '{s}'"))
    }
}
