// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! VNF records and their descriptor-derived configuration

use super::VnfrId;
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::net::IpAddr;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VnfrOperStatus {
    #[default]
    Init,
    VmInitPhase,
    VlInitPhase,
    Running,
    Terminate,
    Terminated,
    Failed,
}

/// A name/value pair, as used for primitive parameters
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameValue {
    pub name: String,
    pub value: String,
}
impl NameValue {
    #[must_use]
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_owned(),
            value: value.to_owned(),
        }
    }
}

/// How the configuration of a VNF is delivered. Only one may be declared per VNF.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigMethod {
    Netconf,
    Rest,
    Script,
    Juju,
}
impl ConfigMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ConfigMethod::Netconf => "netconf",
            ConfigMethod::Rest => "rest",
            ConfigMethod::Script => "script",
            ConfigMethod::Juju => "juju",
        }
    }
}
impl Display for ConfigMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
impl FromStr for ConfigMethod {
    type Err = ConfigError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "netconf" => Ok(ConfigMethod::Netconf),
            "rest" => Ok(ConfigMethod::Rest),
            "script" => Ok(ConfigMethod::Script),
            "juju" => Ok(ConfigMethod::Juju),
            other => Err(ConfigError::UnknownAgentType(other.to_owned())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NetconfMethod {
    #[serde(default = "NetconfMethod::default_target")]
    pub target: String,
    #[serde(default)]
    pub port: Option<u16>,
}
impl NetconfMethod {
    pub const DEFAULT_PORT: u16 = 830;
    fn default_target() -> String {
        "running".to_string()
    }
}
impl Default for NetconfMethod {
    fn default() -> Self {
        Self {
            target: Self::default_target(),
            port: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RestMethod {
    #[serde(default)]
    pub port: Option<u16>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScriptMethod {
    /// interpreter the materialized config file is handed to, e.g. `bash` or `python3`
    pub script_type: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct JujuMethod {
    pub charm: String,
}

/// Credentials and address used to reach the VNF for configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConfigAccess {
    #[serde(default)]
    pub mgmt_ip_address: Option<IpAddr>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Scheduling attributes: lower priorities are configured first
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConfigAttributes {
    #[serde(default)]
    pub config_priority: u32,
    /// seconds to wait before the first configuration attempt
    #[serde(default)]
    pub config_delay: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct InitialConfigPrimitive {
    pub seq: u32,
    pub name: String,
    #[serde(default)]
    pub parameter: Vec<NameValue>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConfigPrimitive {
    pub name: String,
    #[serde(default)]
    pub parameter: Vec<super::PrimitiveParameter>,
    #[serde(default)]
    pub user_defined_script: Option<String>,
}

/// The `vnf-configuration` block of a VNFD, copied into the VNFR
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct VnfConfiguration {
    #[serde(default)]
    pub netconf: Option<NetconfMethod>,
    #[serde(default)]
    pub rest: Option<RestMethod>,
    #[serde(default)]
    pub script: Option<ScriptMethod>,
    #[serde(default)]
    pub juju: Option<JujuMethod>,
    #[serde(default)]
    pub config_access: Option<ConfigAccess>,
    #[serde(default)]
    pub config_attributes: ConfigAttributes,
    #[serde(default)]
    pub initial_config_primitive: Vec<InitialConfigPrimitive>,
    #[serde(default)]
    pub service_primitive: Vec<ConfigPrimitive>,
    #[serde(default)]
    pub config_template: Option<String>,
}

impl VnfConfiguration {
    /// The declared configuration method, if any
    #[must_use]
    pub fn config_method(&self) -> Option<ConfigMethod> {
        if self.netconf.is_some() {
            Some(ConfigMethod::Netconf)
        } else if self.rest.is_some() {
            Some(ConfigMethod::Rest)
        } else if self.script.is_some() {
            Some(ConfigMethod::Script)
        } else if self.juju.is_some() {
            Some(ConfigMethod::Juju)
        } else {
            None
        }
    }
    #[must_use]
    pub fn primitive(&self, name: &str) -> Option<&ConfigPrimitive> {
        self.service_primitive.iter().find(|p| p.name == name)
    }
    /// Initial-config primitives in `seq` order
    #[must_use]
    pub fn initial_primitives(&self) -> Vec<&InitialConfigPrimitive> {
        let mut prims: Vec<_> = self.initial_config_primitive.iter().collect();
        prims.sort_by_key(|p| p.seq);
        prims
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MgmtInterface {
    #[serde(default)]
    pub ip_address: Option<IpAddr>,
    #[serde(default)]
    pub port: Option<u16>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConnectionPoint {
    pub name: String,
    #[serde(default)]
    pub ip_address: Option<IpAddr>,
    #[serde(default)]
    pub vlr_ref: Option<String>,
}

/// One VNF instance of an NSR
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Vnfr {
    pub id: VnfrId,
    pub name: String,
    pub short_name: String,
    pub member_vnf_index_ref: u32,
    #[serde(default)]
    pub vnfd_ref: String,
    #[serde(default)]
    pub operational_status: VnfrOperStatus,
    #[serde(default)]
    pub mgmt_interface: MgmtInterface,
    #[serde(default)]
    pub vnf_configuration: Option<VnfConfiguration>,
    #[serde(default)]
    pub connection_point: Vec<ConnectionPoint>,
}

impl Vnfr {
    #[must_use]
    pub fn new(id: impl Into<VnfrId>, name: &str, member_vnf_index: u32) -> Self {
        Self {
            id: id.into(),
            name: name.to_owned(),
            short_name: name.to_owned(),
            member_vnf_index_ref: member_vnf_index,
            operational_status: VnfrOperStatus::Running,
            ..Self::default()
        }
    }
    #[must_use]
    pub fn set_mgmt(mut self, ip: IpAddr, port: Option<u16>) -> Self {
        self.mgmt_interface = MgmtInterface {
            ip_address: Some(ip),
            port,
        };
        self
    }
    #[must_use]
    pub fn set_configuration(mut self, cfg: VnfConfiguration) -> Self {
        self.vnf_configuration = Some(cfg);
        self
    }
    #[must_use]
    pub fn config_method(&self) -> Option<ConfigMethod> {
        self.vnf_configuration
            .as_ref()
            .and_then(VnfConfiguration::config_method)
    }
    /// Management address: the one in config-access wins over the one of the mgmt interface.
    #[must_use]
    pub fn mgmt_ip(&self) -> Option<IpAddr> {
        self.vnf_configuration
            .as_ref()
            .and_then(|c| c.config_access.as_ref())
            .and_then(|a| a.mgmt_ip_address)
            .or(self.mgmt_interface.ip_address)
    }
}

/// A virtual link record
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Vlr {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub network_id: Option<String>,
}
