// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Execution of configuration scripts, and of the NS-level scripts that get a YAML view of
//! the NSR as input.

use config::records::{ConfigAgentAccount, NameValue};
use serde::Serialize;
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use tokio::process::Command;
#[allow(unused)]
use tracing::{debug, error, info, warn};

use super::{AgentError, AgentResult, NsConfigRequest, NsConfigTask, NsrInfo, VnfCfg};
use crate::processor::xlate::file_name_safe;

/// Run `script` with `args`, through `interpreter` if given. A non-zero exit is a failure.
pub async fn run_script<I, S>(interpreter: Option<&str>, script: &Path, args: I) -> AgentResult<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = match interpreter {
        Some(interpreter) => {
            let mut cmd = Command::new(interpreter);
            cmd.arg(script);
            cmd
        }
        None => Command::new(script),
    };
    cmd.args(args).kill_on_drop(true);

    debug!("Running {cmd:?}");
    let output = cmd.output().await.map_err(|e| AgentError::Script {
        script: script.display().to_string(),
        reason: e.to_string(),
    })?;
    if output.status.success() {
        debug!("Script {} succeeded", script.display());
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let reason = format!("{}: {}", output.status, stderr.trim());
        error!("Script {} failed: {reason}", script.display());
        Err(AgentError::Script {
            script: script.display().to_string(),
            reason,
        })
    }
}

/// Locate a user-defined script: relative paths are looked up in `script_dir`
#[must_use]
pub fn resolve_script(script_dir: &Path, script: &str) -> PathBuf {
    let path = Path::new(script);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        script_dir.join(path)
    }
}

#[derive(Debug, Serialize)]
struct NsrRef<'a> {
    id: &'a str,
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct VnfView {
    name: String,
    id: String,
    mgmt_ip_address: Option<IpAddr>,
    mgmt_port: Option<u16>,
    unit_name: String,
    initial_parameters: BTreeMap<String, String>,
}

/// What an NS-level script gets to see, keyed by member index
#[derive(Debug, Serialize)]
struct NsView<'a> {
    nsr: NsrRef<'a>,
    primitive: &'a str,
    triggered_by: &'a str,
    parameter: BTreeMap<&'a str, &'a str>,
    vnfr: BTreeMap<u32, VnfView>,
    config_agent: &'a [ConfigAgentAccount],
}

fn as_map(params: &[NameValue]) -> BTreeMap<String, String> {
    params
        .iter()
        .map(|p| (p.name.clone(), p.value.clone()))
        .collect()
}

fn ns_view_yaml(
    nsr: &NsrInfo,
    vnfs: &[VnfCfg],
    request: &NsConfigRequest,
) -> Result<String, serde_yaml_ng::Error> {
    let view = NsView {
        nsr: NsrRef {
            id: nsr.id.as_str(),
            name: &nsr.name,
        },
        primitive: &request.name,
        triggered_by: &request.triggered_by,
        parameter: request
            .parameter
            .iter()
            .map(|p| (p.name.as_str(), p.value.as_str()))
            .collect(),
        vnfr: vnfs
            .iter()
            .map(|vnf| {
                let view = VnfView {
                    name: vnf.vnfr.name.clone(),
                    id: vnf.id().to_string(),
                    mgmt_ip_address: vnf.mgmt_ip,
                    mgmt_port: vnf.mgmt_port,
                    unit_name: vnf.unique_name(),
                    initial_parameters: as_map(&vnf.initial_parameters()),
                };
                (vnf.member_index(), view)
            })
            .collect(),
        config_agent: &nsr.accounts,
    };
    serde_yaml_ng::to_string(&view)
}

/// Write the view of the NSR for `request` and spawn its script. The script gets the path
/// of the view as its only argument.
pub async fn spawn_ns_script(
    nsr: &NsrInfo,
    vnfs: &[VnfCfg],
    request: &NsConfigRequest,
    script_dir: &Path,
) -> AgentResult<NsConfigTask> {
    let yaml = ns_view_yaml(nsr, vnfs, request)
        .map_err(|e| AgentError::BadConfig(format!("Failed to render NS view: {e}")))?;
    tokio::fs::create_dir_all(&nsr.dir).await?;
    let input = nsr
        .dir
        .join(file_name_safe(&format!("{}-{}.yaml", request.name, uuid::Uuid::new_v4())));
    tokio::fs::write(&input, yaml).await?;

    let script = resolve_script(script_dir, &request.user_defined_script);
    info!(
        "Running NS script {} of NSR {} for '{}'",
        script.display(),
        nsr.name,
        request.name
    );
    Ok(tokio::spawn(async move {
        run_script(None, &script, [&input]).await.map(|()| true)
    }))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::processor::state::test::{nsr_info, script_vnfr, vnf_cfg};

    async fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        tokio::fs::create_dir_all(dir).await.unwrap();
        let path = dir.join(name);
        tokio::fs::write(&path, body).await.unwrap();
        path
    }

    #[tokio::test]
    async fn test_run_script_exit_code() {
        let dir = std::env::temp_dir().join(format!("nscm-script-{}", uuid::Uuid::new_v4()));
        let ok = write_script(&dir, "ok.sh", "exit 0\n").await;
        let ko = write_script(&dir, "ko.sh", "echo boom >&2; exit 3\n").await;

        run_script(Some("sh"), &ok, ["cfg"]).await.unwrap();
        let err = run_script(Some("sh"), &ko, ["cfg"]).await.unwrap_err();
        assert!(matches!(err, AgentError::Script { ref reason, .. } if reason.contains("boom")));
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[test]
    fn test_ns_view() {
        let nsr = nsr_info("nsr-1");
        let vnfr = script_vnfr("v1", 1, 0);
        let vnfs = vec![vnf_cfg(&nsr, &vnfr)];
        let request = NsConfigRequest {
            name: "start".to_string(),
            user_defined_script: "start.py".to_string(),
            parameter: vec![NameValue::new("port", "5000")],
            triggered_by: "user".to_string(),
        };
        let yaml = ns_view_yaml(&nsr, &vnfs, &request).unwrap();
        let value: serde_yaml_ng::Value = serde_yaml_ng::from_str(&yaml).unwrap();
        assert_eq!(value["nsr"]["id"].as_str(), Some("nsr-1"));
        assert_eq!(value["parameter"]["port"].as_str(), Some("5000"));
        assert_eq!(
            value["vnfr"][1]["unit_name"].as_str(),
            Some("nsr-1-name__vnf-v1__1")
        );
        assert_eq!(value["vnfr"][1]["mgmt_ip_address"].as_str(), Some("10.0.0.1"));
    }

    #[test]
    fn test_resolve_script() {
        let dir = Path::new("/var/scripts");
        assert_eq!(resolve_script(dir, "a.sh"), PathBuf::from("/var/scripts/a.sh"));
        assert_eq!(resolve_script(dir, "/bin/true"), PathBuf::from("/bin/true"));
    }
}
