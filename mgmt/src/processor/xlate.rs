// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Translation of the tags in VNF configuration templates, and materialization of the
//! translated configurations.
//!
//! Recognized tags:
//! - `<rw_mgmt_ip>`, `<rw_mgmt_port>`, `<rw_username>`, `<rw_password>`
//! - `<rw_vnf_name>`, `<rw_member_index>`
//! - `<rw_connection_point_name NAME>`: address of connection point NAME of the VNF
//! - `<rw_mgmt_ip INDEX>`: management address of member INDEX of the NSR
//!
//! Unknown tags are kept as they are.

use config::records::{ConfigMethod, Vnfr};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
#[allow(unused)]
use tracing::{debug, error, info, warn};

use crate::processor::state::{PriorityEntry, VnfCfg};

const TAG_OPEN: &str = "<rw_";

/// Tag values of the VNFs of an NSR
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct XlateTable {
    /// management address of every member
    pub members: BTreeMap<u32, String>,
    /// per-VNF tags, by unique VNF name
    pub vnfs: BTreeMap<String, BTreeMap<String, String>>,
}

impl XlateTable {
    /// Collect the member addresses of the VNFRs of an NSR
    #[must_use]
    pub fn new(vnfrs: &[Vnfr]) -> Self {
        Self {
            members: vnfrs
                .iter()
                .filter_map(|v| v.mgmt_ip().map(|ip| (v.member_vnf_index_ref, ip.to_string())))
                .collect(),
            vnfs: BTreeMap::new(),
        }
    }

    /// Build and remember the tag values of a VNF
    pub fn add_vnf(&mut self, vnf: &VnfCfg) -> &BTreeMap<String, String> {
        let mut tags = BTreeMap::new();
        let mut add = |tag: &str, value: Option<String>| {
            if let Some(value) = value {
                tags.insert(tag.to_string(), value);
            }
        };
        add("rw_mgmt_ip", vnf.mgmt_ip.map(|ip| ip.to_string()));
        add("rw_mgmt_port", vnf.mgmt_port.map(|port| port.to_string()));
        add("rw_username", vnf.username.clone());
        add("rw_password", vnf.password.clone());
        add("rw_vnf_name", Some(vnf.vnfr.name.clone()));
        add("rw_member_index", Some(vnf.member_index().to_string()));
        for cp in &vnf.vnfr.connection_point {
            add(
                &format!("rw_connection_point_name {}", cp.name),
                cp.ip_address.map(|ip| ip.to_string()),
            );
        }
        self.vnfs.entry(vnf.unique_name()).or_default().extend(tags);
        &self.vnfs[&vnf.unique_name()]
    }

    fn lookup(&self, vnf_tags: &BTreeMap<String, String>, tag: &str) -> Option<String> {
        if let Some(value) = vnf_tags.get(tag) {
            return Some(value.clone());
        }
        let index = tag.strip_prefix("rw_mgmt_ip ")?.trim().parse::<u32>().ok()?;
        self.members.get(&index).cloned()
    }

    /// Replace the tags of `template` with the values for `vnf`
    pub fn translate(&mut self, template: &str, vnf: &VnfCfg) -> String {
        let vnf_tags = self.add_vnf(vnf).clone();
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find(TAG_OPEN) {
            out.push_str(&rest[..start]);
            let candidate = &rest[start..];
            let Some(end) = candidate.find('>') else {
                rest = candidate;
                break;
            };
            let tag = &candidate[1..end];
            if let Some(value) = self.lookup(&vnf_tags, tag) {
                out.push_str(&value);
            } else {
                warn!("{}: no value for tag <{tag}>", vnf.describe());
                out.push_str(&candidate[..=end]);
            }
            rest = &candidate[end + 1..];
        }
        out.push_str(rest);
        out
    }
}

/// A record name usable as a single path component: separators and control characters
/// become `_`, and so do names that would walk the directory tree.
#[must_use]
pub fn file_name_safe(name: &str) -> String {
    let safe: String = name
        .chars()
        .map(|c| {
            if c == '/' || c == '\\' || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    match safe.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => safe,
    }
}

/// Path of the materialized configuration of a VNF
#[must_use]
pub fn cfg_file_path(dir: &Path, vnf: &VnfCfg) -> PathBuf {
    let ext = match vnf.method {
        ConfigMethod::Netconf => "xml",
        _ => "cfg",
    };
    dir.join(format!("{}.{ext}", file_name_safe(&vnf.unique_name())))
}

/// Translate the template of a VNF and write the result in `dir`. Returns the path of the
/// file, or `None` if the VNF has no template.
pub async fn materialize(
    dir: &Path,
    vnf: &VnfCfg,
    table: &mut XlateTable,
) -> std::io::Result<Option<PathBuf>> {
    let Some(template) = vnf
        .vnfr
        .vnf_configuration
        .as_ref()
        .and_then(|c| c.config_template.as_deref())
    else {
        return Ok(None);
    };
    let translated = table.translate(template, vnf);
    tokio::fs::create_dir_all(dir).await?;
    let path = cfg_file_path(dir, vnf);
    tokio::fs::write(&path, translated).await?;
    debug!("Wrote configuration of {} to {}", vnf.describe(), path.display());
    Ok(Some(path))
}

#[derive(Serialize)]
struct PriorityArtifact<'a> {
    priority: u32,
    vnfs: &'a [PriorityEntry],
}

/// Write the priority table and the tag table of an NSR for inspection
pub async fn write_debug_artifacts(
    dir: &Path,
    priorities: &BTreeMap<u32, Vec<PriorityEntry>>,
    table: &XlateTable,
) -> Result<(), String> {
    let priorities: Vec<_> = priorities
        .iter()
        .map(|(priority, vnfs)| PriorityArtifact {
            priority: *priority,
            vnfs,
        })
        .collect();
    let prio_yaml = serde_yaml_ng::to_string(&priorities).map_err(|e| e.to_string())?;
    let tags_yaml = serde_yaml_ng::to_string(table).map_err(|e| e.to_string())?;
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| e.to_string())?;
    tokio::fs::write(dir.join("priority-table.yaml"), prio_yaml)
        .await
        .map_err(|e| e.to_string())?;
    tokio::fs::write(dir.join("xlate-tags.yaml"), tags_yaml)
        .await
        .map_err(|e| e.to_string())?;
    Ok(())
}
