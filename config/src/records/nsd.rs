// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Network service descriptors

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConstituentVnfd {
    pub member_vnf_index: u32,
    pub vnfd_id_ref: String,
    #[serde(default)]
    pub start_by_default: Option<bool>,
}

/// A parameter of a config primitive. If `parameter_pool` is set, values are drawn from the
/// pool of that name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PrimitiveParameter {
    pub name: String,
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub mandatory: bool,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub parameter_pool: Option<String>,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub hidden: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct VnfPrimitiveRef {
    pub index: u32,
    pub name: String,
}

/// The VNF primitives an NS primitive fans out to, for one member VNF
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct VnfPrimitiveGroup {
    pub member_vnf_index_ref: u32,
    pub vnfd_id_ref: String,
    #[serde(default)]
    pub vnfd_name: Option<String>,
    #[serde(default)]
    pub primitive: Vec<VnfPrimitiveRef>,
}

/// An NS-level (service) config primitive
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NsConfigPrimitive {
    pub name: String,
    #[serde(default)]
    pub parameter: Vec<PrimitiveParameter>,
    #[serde(default)]
    pub vnf_primitive_group: Vec<VnfPrimitiveGroup>,
    #[serde(default)]
    pub user_defined_script: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NsInitialConfigPrimitive {
    pub seq: u32,
    pub name: String,
    pub user_defined_script: String,
    #[serde(default)]
    pub parameter: Vec<super::NameValue>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PoolValues {
    Range { start_value: u64, end_value: u64 },
    List(Vec<u64>),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ParameterPoolDecl {
    pub name: String,
    pub values: PoolValues,
}

impl PoolValues {
    /// Whether `value` belongs to the pool
    #[must_use]
    pub fn contains(&self, value: u64) -> bool {
        match self {
            PoolValues::Range {
                start_value,
                end_value,
            } => (*start_value..=*end_value).contains(&value),
            PoolValues::List(values) => values.contains(&value),
        }
    }
    /// Number of values in the pool. An inverted range is empty.
    #[must_use]
    pub fn size(&self) -> u64 {
        match self {
            PoolValues::Range {
                start_value,
                end_value,
            } => end_value
                .checked_sub(*start_value)
                .map_or(0, |span| span.saturating_add(1)),
            PoolValues::List(values) => u64::try_from(values.len()).unwrap_or(u64::MAX),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Nsd {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub constituent_vnfd: Vec<ConstituentVnfd>,
    #[serde(default)]
    pub service_primitive: Vec<NsConfigPrimitive>,
    #[serde(default)]
    pub initial_config_primitive: Vec<NsInitialConfigPrimitive>,
    #[serde(default)]
    pub parameter_pool: Vec<ParameterPoolDecl>,
}

impl Nsd {
    #[must_use]
    pub fn primitive(&self, name: &str) -> Option<&NsConfigPrimitive> {
        self.service_primitive.iter().find(|p| p.name == name)
    }
    /// NS initial-config primitives in `seq` order
    #[must_use]
    pub fn initial_primitives(&self) -> Vec<&NsInitialConfigPrimitive> {
        let mut prims: Vec<_> = self.initial_config_primitive.iter().collect();
        prims.sort_by_key(|p| p.seq);
        prims
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_pool_values() {
        let range = PoolValues::Range {
            start_value: 5000,
            end_value: 5003,
        };
        assert_eq!(range.size(), 4);
        assert!(range.contains(5000) && range.contains(5003));
        assert!(!range.contains(5004));

        let huge = PoolValues::Range {
            start_value: 0,
            end_value: u64::MAX,
        };
        assert_eq!(huge.size(), u64::MAX);
        let inverted = PoolValues::Range {
            start_value: 10,
            end_value: 5,
        };
        assert_eq!(inverted.size(), 0);
        assert!(!inverted.contains(7));

        let list = PoolValues::List(vec![10, 20, 30]);
        assert_eq!(list.size(), 3);
        assert!(list.contains(20) && !list.contains(15));
    }

    #[test]
    fn test_nsd_from_yaml() {
        let yaml = r"
id: nsd-1
name: ping-pong
constituent-vnfd:
  - member-vnf-index: 1
    vnfd-id-ref: ping
parameter-pool:
  - name: ports
    values:
      range:
        start-value: 10
        end-value: 12
service-primitive:
  - name: start-traffic
    parameter:
      - name: port
        parameter-pool: ports
";
        let nsd: Nsd = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(nsd.constituent_vnfd.len(), 1);
        assert_eq!(
            nsd.parameter_pool[0].values,
            PoolValues::Range {
                start_value: 10,
                end_value: 12
            }
        );
        let prim = nsd.primitive("start-traffic").unwrap();
        assert_eq!(prim.parameter[0].parameter_pool.as_deref(), Some("ports"));
    }
}
