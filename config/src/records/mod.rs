// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Records read from the record store

pub mod agent;
pub mod nsd;
pub mod nsr;
pub mod vnfr;

pub use agent::{AgentAccountType, AgentType, ConfigAgentAccount, JujuAccount};
pub use nsd::{
    ConstituentVnfd, Nsd, NsConfigPrimitive, NsInitialConfigPrimitive, ParameterPoolDecl,
    PoolValues, PrimitiveParameter, VnfPrimitiveGroup, VnfPrimitiveRef,
};
pub use nsr::{InputParameter, Nsr, NsrConfig, NsrOperStatus};
pub use vnfr::{
    ConfigAccess, ConfigAttributes, ConfigMethod, ConfigPrimitive, ConnectionPoint,
    InitialConfigPrimitive, JujuMethod, MgmtInterface, NameValue, NetconfMethod, RestMethod,
    ScriptMethod, VnfConfiguration, Vlr, Vnfr, VnfrOperStatus,
};

use serde::{Deserialize, Serialize};
use std::fmt::Display;

macro_rules! string_id {
    ($name:ident, $what:literal) => {
        #[doc = concat!("Identifier of ", $what)]
        #[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }
        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(NsrId, "a network service record");
string_id!(VnfrId, "a VNF record");
