// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use std::collections::BTreeMap;
use std::fmt::Display;

use crate::processor::state::PriorityEntry;

macro_rules! PRIO_TBL_FMT {
    () => {
        " {:>8} {:<38} {:<24} {:>6} {:<8} {:<10} {:>6}"
    };
}
fn fmt_priority_heading(f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    writeln!(
        f,
        "{}",
        format_args!(
            PRIO_TBL_FMT!(),
            "priority", "vnfr", "name", "member", "type", "options", "delay"
        )
    )
}
fn fmt_priority_entry(
    priority: u32,
    entry: &PriorityEntry,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(
        f,
        "{}",
        format_args!(
            PRIO_TBL_FMT!(),
            priority,
            entry.vnfr_id,
            entry.name,
            entry.member_vnf_index,
            entry.configuration_type,
            entry.configuration_options.as_deref().unwrap_or("--"),
            format!("{}s", entry.configuration_delay.as_secs())
        )
    )
}

/// The priority table of an NSR: VNFs in configuration order
pub struct PriorityTable<'a>(pub &'a str, pub &'a BTreeMap<u32, Vec<PriorityEntry>>);
impl Display for PriorityTable<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count: usize = self.1.values().map(Vec::len).sum();
        writeln!(
            f,
            " ━━━━━━━━━ priority table of NSR {} ({count} VNFs) ━━━━━━━━━",
            self.0
        )?;
        fmt_priority_heading(f)?;
        for (priority, entries) in self.1 {
            for entry in entries {
                fmt_priority_entry(*priority, entry, f)?;
            }
        }
        Ok(())
    }
}
