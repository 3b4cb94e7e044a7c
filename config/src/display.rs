// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Display of the cm-state snapshot and of config-agent jobs

use crate::status::{CmNsr, CmState, CmVnfr, ConfigAgentJob};
use std::fmt::Display;

macro_rules! CMSTATE_TBL_FMT {
    () => {
        " {:<38} {:<24} {:<22} {:<8} {:<18} {}"
    };
}

fn fmt_cmstate_heading(f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    writeln!(
        f,
        "{}",
        format_args!(
            CMSTATE_TBL_FMT!(),
            "id", "name", "state", "type", "mgmt", "location"
        )
    )
}

fn fmt_cm_vnfr(vnfr: &CmVnfr, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let mgmt = match (vnfr.mgmt_interface.ip_address, vnfr.mgmt_interface.port) {
        (Some(ip), Some(port)) => format!("{ip}:{port}"),
        (Some(ip), None) => ip.to_string(),
        _ => "--".to_string(),
    };
    writeln!(
        f,
        "{}",
        format_args!(
            CMSTATE_TBL_FMT!(),
            format!("  {}", vnfr.id),
            vnfr.name,
            vnfr.state,
            vnfr.cfg_type.as_deref().unwrap_or("--"),
            mgmt,
            vnfr.cfg_location.as_deref().unwrap_or("--")
        )
    )
}

impl Display for CmNsr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{}",
            format_args!(CMSTATE_TBL_FMT!(), self.id, self.name, self.state, "", "", "")
        )?;
        for vnfr in &self.cm_vnfr {
            fmt_cm_vnfr(vnfr, f)?;
        }
        Ok(())
    }
}

impl Display for CmState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, " ━━━━━━━━━ cm-state ({} NSRs) ━━━━━━━━━", self.cm_nsr.len())?;
        fmt_cmstate_heading(f)?;
        for nsr in &self.cm_nsr {
            nsr.fmt(f)?;
        }
        Ok(())
    }
}

impl Display for ConfigAgentJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let created = self.create_time.format("%H:%M:%S on %Y/%m/%d");
        writeln!(
            f,
            " job {} '{}' nsr:{} status:{} by:{} created:{created}",
            self.job_id, self.job_name, self.nsr_id, self.job_status, self.triggered_by
        )?;
        for vnfr in &self.vnfr {
            for prim in &vnfr.primitive {
                writeln!(
                    f,
                    "   {:<38} {:<20} {:<38} {}",
                    vnfr.id, prim.name, prim.execution_id, prim.execution_status
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use crate::records::{NsrId, VnfrId};
    use crate::state::ConfigState;
    use crate::status::{CmNsr, CmState, CmVnfr};

    #[test]
    fn test_cmstate_display() {
        let mut nsr = CmNsr::new(NsrId::new("nsr-1"), "pingpong");
        nsr.state = ConfigState::Ready;
        let mut vnfr = CmVnfr::new(VnfrId::new("vnfr-1"), "ping");
        vnfr.state = ConfigState::Ready;
        vnfr.cfg_type = Some("script".to_string());
        vnfr.mgmt_interface.ip_address = Some("10.0.0.1".parse().unwrap());
        nsr.cm_vnfr.push(vnfr);
        let state = CmState { cm_nsr: vec![nsr] };
        let out = state.to_string();
        assert!(out.contains("pingpong"));
        assert!(out.contains("10.0.0.1"));
        assert!(out.contains("script"));
        assert!(out.contains("ready"));
    }
}
