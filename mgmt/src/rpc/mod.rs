// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The config primitive RPCs: `exec-ns-config-primitive` and
//! `get-ns-config-primitive-values`. Both run on the engine task, against the handle of a
//! tracked NSR.

use config::records::{NameValue, PrimitiveParameter};
use config::rpc::{
    ExecNsConfigPrimitiveInput, ExecNsConfigPrimitiveOutput, GetNsConfigPrimitiveValuesInput,
    GetNsConfigPrimitiveValuesOutput, PrimitiveOutput, VnfOut, VnfPrimitiveGroupValues,
    VnfPrimitiveRequest, VnfPrimitiveValues, VnfRequest,
};
use config::status::{ExecutionStatus, JobPrimitive, JobVnfr};
use config::{ConfigError, NsrId};
use ordermap::OrderMap;
use std::sync::Arc;
#[allow(unused)]
use tracing::{debug, error, info, warn};

use crate::agents::{NsConfigRequest, NsrInfo};
use crate::agents::registry::ConfigAgentRegistry;
use crate::pool::ParameterPool;
use crate::processor::jobs::JobTable;
use crate::processor::state::{NsrHandle, VnfCfg};

type Pools = OrderMap<String, ParameterPool>;

fn pool<'a>(pools: &'a mut Pools, name: &str) -> Result<&'a mut ParameterPool, ConfigError> {
    pools
        .get_mut(name)
        .ok_or_else(|| ConfigError::NoSuchPool(name.to_owned()))
}

/// Complete the parameters of a primitive invocation from their declarations: values of
/// pool-backed parameters are reserved (the supplied ones) or allocated (the missing ones),
/// missing values get their default, and a mandatory parameter without value is an error.
fn resolve_parameters(
    decls: &[PrimitiveParameter],
    supplied: &[NameValue],
    pools: &mut Pools,
) -> Result<Vec<NameValue>, ConfigError> {
    let mut resolved = supplied.to_vec();
    for decl in decls {
        let given = supplied.iter().find(|p| p.name == decl.name);
        if let Some(pool_name) = &decl.parameter_pool {
            let pool = pool(pools, pool_name)?;
            match given {
                Some(param) => match param.value.parse::<u64>() {
                    Ok(value) => pool.add_used_value(value),
                    Err(_) => warn!(
                        "Value '{}' of parameter {} is not from pool '{pool_name}'",
                        param.value, decl.name
                    ),
                },
                None => {
                    let value = pool.get_next_unused_value()?;
                    resolved.push(NameValue::new(&decl.name, &value.to_string()));
                }
            }
        } else if given.is_none() {
            match &decl.default_value {
                Some(default) => resolved.push(NameValue::new(&decl.name, default)),
                None if decl.mandatory => {
                    return Err(ConfigError::MissingParameter(decl.name.clone()));
                }
                None => {}
            }
        }
    }
    Ok(resolved)
}

/// Proposed values of a set of declared parameters: pool values are allocated, others
/// take their default if they have one.
fn proposed_values(
    decls: &[PrimitiveParameter],
    pools: &mut Pools,
) -> Result<Vec<NameValue>, ConfigError> {
    let mut values = vec![];
    for decl in decls {
        if let Some(pool_name) = &decl.parameter_pool {
            let value = pool(pools, pool_name)?.get_next_unused_value()?;
            values.push(NameValue::new(&decl.name, &value.to_string()));
        } else if let Some(default) = &decl.default_value {
            values.push(NameValue::new(&decl.name, default));
        }
    }
    Ok(values)
}

fn vnf_primitive_decls(vnf: &VnfCfg, name: &str) -> Vec<PrimitiveParameter> {
    vnf.vnfr
        .vnf_configuration
        .as_ref()
        .and_then(|cfg| cfg.primitive(name))
        .map(|p| p.parameter.clone())
        .unwrap_or_default()
}

/// The VNF primitives to run: the requested ones, or else the groups the NSD declares
fn vnf_requests(
    handle: &NsrHandle,
    input: &ExecNsConfigPrimitiveInput,
) -> Result<Vec<VnfRequest>, ConfigError> {
    if !input.vnf_list.is_empty() {
        return Ok(input.vnf_list.clone());
    }
    let Some(declared) = handle.info.nsd.primitive(&input.name) else {
        return Ok(vec![]);
    };
    declared
        .vnf_primitive_group
        .iter()
        .map(|group| {
            let vnf = handle.vnf_by_index(group.member_vnf_index_ref).ok_or_else(|| {
                ConfigError::Descriptor(format!(
                    "primitive '{}' refers to unknown member {}",
                    input.name, group.member_vnf_index_ref
                ))
            })?;
            Ok(VnfRequest {
                member_vnf_index_ref: group.member_vnf_index_ref,
                vnfr_id_ref: vnf.id().clone(),
                vnf_primitive: group
                    .primitive
                    .iter()
                    .map(|p| VnfPrimitiveRequest {
                        name: p.name.clone(),
                        index: p.index,
                        parameter: vec![],
                    })
                    .collect(),
            })
        })
        .collect()
}

fn output(
    nsr_id: &NsrId,
    name: &str,
    job_id: u64,
    job_status: ExecutionStatus,
) -> ExecNsConfigPrimitiveOutput {
    ExecNsConfigPrimitiveOutput {
        job_id,
        job_status,
        nsr_id_ref: nsr_id.clone(),
        name: name.to_owned(),
        vnf_out_list: vec![],
    }
}

/// Execute a config primitive of an NSR. A primitive with a user-defined script is run by
/// the config agents of the NSR; otherwise each of its VNF primitives is run by the agent
/// that manages the VNF. Either way the executions run in the background and are tracked
/// in a job, which is returned pending.
pub async fn exec_ns_config_primitive(
    handle: &mut NsrHandle,
    input: ExecNsConfigPrimitiveInput,
    registry: &Arc<ConfigAgentRegistry>,
    jobs: &JobTable,
) -> Result<ExecNsConfigPrimitiveOutput, ConfigError> {
    let nsd = handle.info.nsd.clone();
    let declared = nsd.primitive(&input.name);
    let script = input
        .user_defined_script
        .clone()
        .or_else(|| declared.and_then(|p| p.user_defined_script.clone()));

    if let Some(script) = script {
        let mut pools = handle.pools.clone();
        let parameter = resolve_parameters(
            declared.map(|p| p.parameter.as_slice()).unwrap_or_default(),
            &input.parameter,
            &mut pools,
        )?;
        handle.pools = pools;
        return exec_ns_script(handle, &input, script, parameter, registry, jobs).await;
    }

    let requests = vnf_requests(handle, &input)?;
    if requests.is_empty() {
        return Err(ConfigError::NoSuchPrimitive(input.name));
    }

    // resolve everything before running anything: nothing is committed on error
    let mut pools = handle.pools.clone();
    let mut resolved: Vec<(VnfCfg, u32, Vec<VnfPrimitiveRequest>)> = vec![];
    for request in &requests {
        let vnf = handle
            .vnf(&request.vnfr_id_ref)
            .or_else(|| handle.vnf_by_index(request.member_vnf_index_ref))
            .ok_or_else(|| ConfigError::NoSuchVnfr(request.vnfr_id_ref.clone()))?;
        let mut primitives = vec![];
        for primitive in &request.vnf_primitive {
            let decls = vnf_primitive_decls(vnf, &primitive.name);
            primitives.push(VnfPrimitiveRequest {
                name: primitive.name.clone(),
                index: primitive.index,
                parameter: resolve_parameters(&decls, &primitive.parameter, &mut pools)?,
            });
        }
        resolved.push((vnf.clone(), request.member_vnf_index_ref, primitives));
    }
    handle.pools = pools;

    let job_id = jobs.create(&handle.info.id, &input.name, &input.triggered_by);
    let vnf_out_list: Vec<VnfOut> = resolved
        .iter()
        .map(|(vnf, member_index, primitives)| VnfOut {
            vnfr_id_ref: vnf.id().clone(),
            member_vnf_index_ref: *member_index,
            vnf_out_primitive: primitives
                .iter()
                .map(|p| PrimitiveOutput::new(&p.name, p.index))
                .collect(),
        })
        .collect();
    jobs.set_executions(job_id, job_executions(&vnf_out_list));
    jobs.publish(job_id).await;

    // agents may take long to run a primitive: the engine does not wait for them
    let registry = registry.clone();
    let jobs = jobs.clone();
    let nsr = handle.info.clone();
    let name = input.name.clone();
    tokio::spawn(async move {
        let vnf_out_list = run_vnf_primitives(&registry, &nsr, resolved).await;
        let Some(job_status) = jobs.set_executions(job_id, job_executions(&vnf_out_list)) else {
            debug!("Job {job_id} of NSR {} is gone", nsr.name);
            return;
        };
        jobs.publish(job_id).await;
        info!("Job {job_id}: primitive '{name}' of NSR {} is {job_status}", nsr.name);
    });

    let mut out = output(&handle.info.id, &input.name, job_id, ExecutionStatus::Pending);
    out.vnf_out_list = vnf_out_list;
    Ok(out)
}

async fn run_vnf_primitives(
    registry: &ConfigAgentRegistry,
    nsr: &NsrInfo,
    resolved: Vec<(VnfCfg, u32, Vec<VnfPrimitiveRequest>)>,
) -> Vec<VnfOut> {
    let mut vnf_out_list = Vec::with_capacity(resolved.len());
    for (vnf, member_index, primitives) in resolved {
        let mut outputs = Vec::with_capacity(primitives.len());
        for primitive in primitives {
            let mut out = PrimitiveOutput::new(&primitive.name, primitive.index);
            registry
                .vnf_config_primitive(nsr, &vnf, &primitive, &mut out)
                .await;
            debug!(
                "Primitive '{}' on {}: {} ({})",
                primitive.name,
                vnf.describe(),
                out.execution_status,
                out.execution_id
            );
            outputs.push(out);
        }
        vnf_out_list.push(VnfOut {
            vnfr_id_ref: vnf.id().clone(),
            member_vnf_index_ref: member_index,
            vnf_out_primitive: outputs,
        });
    }
    vnf_out_list
}

fn job_executions(vnf_out_list: &[VnfOut]) -> Vec<JobVnfr> {
    vnf_out_list
        .iter()
        .map(|vnf| JobVnfr {
            id: vnf.vnfr_id_ref.clone(),
            primitive: vnf
                .vnf_out_primitive
                .iter()
                .map(|p| JobPrimitive {
                    name: p.name.clone(),
                    execution_id: p.execution_id.clone(),
                    execution_status: p.execution_status,
                    execution_error_details: p.execution_error_details.clone(),
                })
                .collect(),
        })
        .collect()
}

async fn exec_ns_script(
    handle: &NsrHandle,
    input: &ExecNsConfigPrimitiveInput,
    script: String,
    parameter: Vec<NameValue>,
    registry: &ConfigAgentRegistry,
    jobs: &JobTable,
) -> Result<ExecNsConfigPrimitiveOutput, ConfigError> {
    let request = NsConfigRequest {
        name: input.name.clone(),
        user_defined_script: script,
        parameter,
        triggered_by: input.triggered_by.clone(),
    };
    let job_id = jobs.create(&handle.info.id, &input.name, &input.triggered_by);

    let mut tasks = vec![];
    for (plugin, vnfs) in registry.agents_for(&handle.vnfs) {
        match registry
            .apply_ns_config(&plugin, &handle.info, &vnfs, &request)
            .await
        {
            Ok(Some(task)) => tasks.push(task),
            Ok(None) => {}
            Err(e) => {
                jobs.finish(job_id, ExecutionStatus::Failed, Some(e.to_string()));
                jobs.publish(job_id).await;
                return Ok(output(
                    &handle.info.id,
                    &input.name,
                    job_id,
                    ExecutionStatus::Failed,
                ));
            }
        }
    }
    jobs.publish(job_id).await;

    let jobs = jobs.clone();
    tokio::spawn(async move {
        let mut failure = None;
        for task in tasks {
            match task.await {
                Ok(Ok(true)) => {}
                Ok(Ok(false)) => failure = Some("script reported a failure".to_string()),
                Ok(Err(e)) => failure = Some(e.to_string()),
                Err(e) => failure = Some(e.to_string()),
            }
        }
        match failure {
            None => jobs.finish(job_id, ExecutionStatus::Completed, None),
            Some(details) => jobs.finish(job_id, ExecutionStatus::Failed, Some(details)),
        }
        jobs.publish(job_id).await;
    });

    Ok(output(
        &handle.info.id,
        &input.name,
        job_id,
        ExecutionStatus::Pending,
    ))
}

/// Values to invoke a config primitive of an NSR with. Pool-backed values handed out are
/// marked as used.
pub fn get_ns_config_primitive_values(
    handle: &mut NsrHandle,
    input: &GetNsConfigPrimitiveValuesInput,
) -> Result<GetNsConfigPrimitiveValuesOutput, ConfigError> {
    let nsd = handle.info.nsd.clone();
    let primitive = nsd
        .primitive(&input.name)
        .ok_or_else(|| ConfigError::NoSuchPrimitive(input.name.clone()))?;

    let mut pools = handle.pools.clone();
    let ns_parameter = proposed_values(&primitive.parameter, &mut pools)?;
    let mut vnf_primitive_group = vec![];
    for group in &primitive.vnf_primitive_group {
        let vnf = handle.vnf_by_index(group.member_vnf_index_ref);
        let mut inputs = vec![];
        for vnf_primitive in &group.primitive {
            let decls = vnf
                .map(|vnf| vnf_primitive_decls(vnf, &vnf_primitive.name))
                .unwrap_or_default();
            inputs.push(VnfPrimitiveValues {
                name: vnf_primitive.name.clone(),
                index: vnf_primitive.index,
                parameter: proposed_values(&decls, &mut pools)?,
            });
        }
        vnf_primitive_group.push(VnfPrimitiveGroupValues {
            member_vnf_index_ref: group.member_vnf_index_ref,
            vnfd_id_ref: group.vnfd_id_ref.clone(),
            inputs,
        });
    }
    handle.pools = pools;
    Ok(GetNsConfigPrimitiveValuesOutput {
        ns_parameter,
        vnf_primitive_group,
    })
}
