// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Config-agent accounts

use crate::errors::ConfigError;
use crate::records::ConfigMethod;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::net::IpAddr;

/// The kinds of config agents. Each kind has at most one live plugin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    /// built-in agent: script and NETCONF backends
    RiftCa,
    Juju,
}

impl AgentType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AgentType::RiftCa => "riftca",
            AgentType::Juju => "juju",
        }
    }
    /// The agent type in charge of a configuration method
    pub fn for_method(method: ConfigMethod) -> Result<AgentType, ConfigError> {
        match method {
            ConfigMethod::Netconf | ConfigMethod::Script => Ok(AgentType::RiftCa),
            ConfigMethod::Juju => Ok(AgentType::Juju),
            ConfigMethod::Rest => Err(ConfigError::UnknownAgentType(method.to_string())),
        }
    }
}

impl Display for AgentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct JujuAccount {
    pub ip_address: IpAddr,
    #[serde(default = "JujuAccount::default_port")]
    pub port: u16,
    #[serde(default = "JujuAccount::default_user")]
    pub user: String,
    pub secret: String,
}
impl JujuAccount {
    fn default_port() -> u16 {
        17070
    }
    fn default_user() -> String {
        "admin".to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentAccountType {
    RiftCa,
    Juju(JujuAccount),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConfigAgentAccount {
    pub name: String,
    pub account_type: AgentAccountType,
}

impl ConfigAgentAccount {
    /// Name of the account that always exists, even if none is configured
    pub const DEFAULT_NAME: &'static str = "RiftCA";

    #[must_use]
    pub fn default_riftca() -> Self {
        Self {
            name: Self::DEFAULT_NAME.to_string(),
            account_type: AgentAccountType::RiftCa,
        }
    }
    #[must_use]
    pub fn agent_type(&self) -> AgentType {
        match self.account_type {
            AgentAccountType::RiftCa => AgentType::RiftCa,
            AgentAccountType::Juju(_) => AgentType::Juju,
        }
    }
}
