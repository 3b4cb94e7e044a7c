// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#[cfg(test)]
#[allow(dead_code)]
pub mod test {
    use config::records::{
        AgentAccountType, AgentType, ConfigAgentAccount, ConfigAttributes, ConfigPrimitive,
        InitialConfigPrimitive, JujuAccount, JujuMethod, NameValue, NetconfMethod,
        NsConfigPrimitive, NsInitialConfigPrimitive, Nsd, Nsr, NsrOperStatus, ParameterPoolDecl,
        PoolValues, PrimitiveParameter, RestMethod, ScriptMethod, VnfConfiguration,
        VnfPrimitiveGroup, VnfPrimitiveRef, Vnfr,
    };
    use config::rpc::{ExecNsConfigPrimitiveInput, GetNsConfigPrimitiveValuesInput};
    use config::status::{CmNsr, ConfigStatus, ExecutionStatus};
    use config::{ConfigError, ConfigState, NsrId, VnfrId};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tokio::sync::Notify;
    use tracing_test::traced_test;

    use crate::agents::registry::ConfigAgentRegistry;
    use crate::agents::riftca::{RiftCaAgent, RiftCaParams};
    use crate::processor::board::CmStateBoard;
    use crate::processor::ctl::CmCtlSender;
    use crate::processor::params::CmParams;
    use crate::processor::proc::ConfigManager;
    use crate::processor::sched::{AttemptOutcome, SchedCtx, run_attempt};
    use crate::processor::state::test::nsr_state;
    use crate::store::MemoryRecordStore;
    use crate::testing::{MockJujuConnector, MockNetconfConnector, MockPlugin};

    fn test_params() -> CmParams {
        CmParams {
            discovery_interval: Duration::from_millis(20),
            config_interval: Duration::from_millis(20),
            vnf_retry_backoff: Duration::from_millis(10),
            job_poll_interval: Duration::from_millis(20),
            run_dir: std::env::temp_dir().join(format!("nscm-{}", uuid::Uuid::new_v4())),
            ..CmParams::default()
        }
    }

    fn script_vnfr(id: &str, index: u32, priority: u32) -> Vnfr {
        Vnfr::new(id, &format!("vnf-{id}"), index)
            .set_mgmt(format!("10.0.0.{index}").parse().unwrap(), None)
            .set_configuration(VnfConfiguration {
                script: Some(ScriptMethod {
                    script_type: "sh".to_string(),
                }),
                config_attributes: ConfigAttributes {
                    config_priority: priority,
                    config_delay: 0,
                },
                ..VnfConfiguration::default()
            })
    }

    fn nsd() -> Nsd {
        Nsd {
            id: "nsd-1".to_string(),
            name: "ping-pong".to_string(),
            ..Nsd::default()
        }
    }

    /// Put a running NSR with its VNFRs and descriptor in the store
    fn seed(store: &MemoryRecordStore, id: &str, nsd: Nsd, vnfrs: &[Vnfr]) {
        let mut nsr = Nsr::new(id, &format!("{id}-name"), &nsd.id);
        for vnfr in vnfrs {
            store.put_vnfr(vnfr.clone());
            nsr = nsr.add_vnfr(vnfr.id.clone());
        }
        store.put_nsd(nsd);
        store.put_nsr(nsr.set_status(NsrOperStatus::Running));
    }

    fn mock_registry(params: &CmParams) -> (Arc<ConfigAgentRegistry>, Arc<MockPlugin>) {
        let registry = Arc::new(ConfigAgentRegistry::empty(params, None));
        let plugin = Arc::new(MockPlugin::new(AgentType::RiftCa));
        registry.register(plugin.clone());
        (registry, plugin)
    }

    fn start(
        params: CmParams,
        store: Arc<MemoryRecordStore>,
        registry: Arc<ConfigAgentRegistry>,
    ) -> CmCtlSender {
        let (manager, ctl) = ConfigManager::new(params, store, registry);
        tokio::spawn(manager.run());
        ctl
    }

    /// Wait until the published cm-state of an NSR satisfies `pred`
    async fn wait_for(
        store: &MemoryRecordStore,
        id: &str,
        pred: impl Fn(&CmNsr) -> bool,
    ) -> CmNsr {
        let id = NsrId::new(id);
        for _ in 0..500 {
            if let Some(nsr) = store.cm_state().and_then(|s| s.nsr(&id).cloned()) {
                if pred(&nsr) {
                    return nsr;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("NSR {id} never reached the expected state: {:?}", store.cm_state());
    }

    fn vnf_state(nsr: &CmNsr, id: &str) -> ConfigState {
        nsr.vnfr(&VnfrId::new(id)).map(|v| v.state).unwrap()
    }

    fn sched_ctx(
        params: CmParams,
        store: Arc<MemoryRecordStore>,
        registry: Arc<ConfigAgentRegistry>,
    ) -> SchedCtx {
        SchedCtx {
            params,
            store,
            registry,
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn test_priority_ordering() {
        let params = test_params();
        let store = Arc::new(MemoryRecordStore::new());
        let (registry, plugin) = mock_registry(&params);
        let vnfrs = [
            script_vnfr("v1", 1, 1),
            script_vnfr("v2", 2, 0),
            script_vnfr("v3", 3, 1),
            script_vnfr("v4", 4, 0),
        ];
        seed(&store, "nsr-1", nsd(), &vnfrs);

        let ctl = start(params, store.clone(), registry);
        let nsr = wait_for(&store, "nsr-1", |n| n.state == ConfigState::Ready).await;
        assert!(nsr.cm_vnfr.iter().all(|v| v.state == ConfigState::Ready));
        let order: Vec<String> = plugin.log().iter().map(ToString::to_string).collect();
        assert_eq!(order, vec!["v2", "v4", "v1", "v3"]);
        ctl.finish().await.unwrap();
    }

    #[tokio::test]
    #[traced_test]
    async fn test_retry_exhaustion() {
        let params = CmParams {
            vnf_retries: 3,
            ..test_params()
        };
        let store = Arc::new(MemoryRecordStore::new());
        let board = CmStateBoard::new(store.clone());
        let (registry, plugin) = mock_registry(&params);
        store.put_nsr(Nsr::new("nsr-1", "nsr-1-name", "nsd-1").set_status(NsrOperStatus::Running));

        let mut state = nsr_state(&board, "nsr-1", &[("v1", 0), ("v2", 1)]).await;
        for vnf in state.vnfs() {
            registry.assign(vnf).unwrap();
        }
        plugin.fail(&VnfrId::new("v1"));
        state.set_state(ConfigState::CfgSched).await.unwrap();

        let ctx = sched_ctx(params, store.clone(), registry);
        let outcome = run_attempt(&mut state, &ctx).await;
        assert_eq!(outcome, AttemptOutcome::Failed);

        // exactly the budget for v1, once for v2
        let log = plugin.log();
        assert_eq!(log.iter().filter(|v| v.as_str() == "v1").count(), 3);
        assert_eq!(log.iter().filter(|v| v.as_str() == "v2").count(), 1);
        assert_eq!(plugin.applies(), 4);
        assert!(state.vnf_failed);
        assert_eq!(state.vnf_state(&VnfrId::new("v1")), Some(ConfigState::CfgFailed));
        assert_eq!(state.vnf_state(&VnfrId::new("v2")), Some(ConfigState::Ready));
        assert_eq!(state.state(), ConfigState::CfgFailed);
        assert_eq!(store.cm_state().unwrap().cm_nsr[0].state, ConfigState::CfgFailed);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_agent_error_status_is_terminal() {
        let params = test_params();
        let store = Arc::new(MemoryRecordStore::new());
        let board = CmStateBoard::new(store.clone());
        let (registry, plugin) = mock_registry(&params);
        store.put_nsr(Nsr::new("nsr-1", "nsr-1-name", "nsd-1").set_status(NsrOperStatus::Running));

        let mut state = nsr_state(&board, "nsr-1", &[("v1", 0)]).await;
        for vnf in state.vnfs() {
            registry.assign(vnf).unwrap();
        }
        plugin.fail(&VnfrId::new("v1"));
        plugin.set_status_on_failure(ConfigStatus::Error);
        state.set_state(ConfigState::CfgSched).await.unwrap();

        let ctx = sched_ctx(params, store, registry);
        assert_eq!(run_attempt(&mut state, &ctx).await, AttemptOutcome::Failed);
        assert_eq!(plugin.applies(), 1);
        assert!(logs_contain("after 1 attempts"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_termination_mid_configuration() {
        let params = test_params();
        let store = Arc::new(MemoryRecordStore::new());
        let board = CmStateBoard::new(store.clone());
        let (registry, plugin) = mock_registry(&params);
        store.put_nsr(Nsr::new("nsr-1", "nsr-1-name", "nsd-1").set_status(NsrOperStatus::Running));

        let mut state = nsr_state(&board, "nsr-1", &[("v1", 0), ("v2", 1), ("v3", 2)]).await;
        for vnf in state.vnfs() {
            registry.assign(vnf).unwrap();
        }
        let flag = state.deletion_flag();
        plugin.on_apply(move |_| flag.store(true, Ordering::Release));
        state.set_state(ConfigState::CfgSched).await.unwrap();

        let ctx = sched_ctx(params, store, registry);
        assert_eq!(run_attempt(&mut state, &ctx).await, AttemptOutcome::Deleted);
        assert_eq!(plugin.applies(), 1);
        assert_eq!(state.vnf_state(&VnfrId::new("v2")), Some(ConfigState::CfgSched));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_scenario_script_and_juju() {
        let params = test_params();
        let marker = params.run_dir.join("applied");
        let store = Arc::new(MemoryRecordStore::new());
        let juju = Arc::new(MockJujuConnector::default());
        let registry = Arc::new(ConfigAgentRegistry::new(&params, Some(juju.clone())));
        store.add_account(ConfigAgentAccount {
            name: "juju-1".to_string(),
            account_type: AgentAccountType::Juju(JujuAccount {
                ip_address: "127.0.0.1".parse().unwrap(),
                port: 17070,
                user: "admin".to_string(),
                secret: "secret".to_string(),
            }),
        });

        let mut ping = script_vnfr("v1", 1, 0);
        if let Some(cfg) = ping.vnf_configuration.as_mut() {
            cfg.config_template = Some(format!(
                "echo <rw_mgmt_ip> >> {}\nexit 0\n",
                marker.display()
            ));
        }
        let pong = Vnfr::new("v2", "vnf-v2", 2)
            .set_mgmt("10.0.0.2".parse().unwrap(), None)
            .set_configuration(VnfConfiguration {
                juju: Some(JujuMethod {
                    charm: "pong".to_string(),
                }),
                config_attributes: ConfigAttributes {
                    config_priority: 1,
                    config_delay: 0,
                },
                initial_config_primitive: vec![InitialConfigPrimitive {
                    seq: 1,
                    name: "config".to_string(),
                    parameter: vec![NameValue::new("mode", "pong")],
                }],
                ..VnfConfiguration::default()
            });
        seed(&store, "nsr-1", nsd(), &[ping, pong]);

        let ctl = start(params.clone(), store.clone(), registry);
        let nsr = wait_for(&store, "nsr-1", |n| n.state.is_terminal()).await;
        assert_eq!(nsr.state, ConfigState::Ready);
        assert_eq!(vnf_state(&nsr, "v1"), ConfigState::Ready);
        assert_eq!(vnf_state(&nsr, "v2"), ConfigState::Ready);

        // the script ran once with the translated template
        let applied = tokio::fs::read_to_string(&marker).await.unwrap();
        assert_eq!(applied, "10.0.0.1\n");
        // the charm was deployed and configured once
        assert_eq!(juju.api.deploys(), 1);
        assert_eq!(juju.api.calls(), vec!["set-config".to_string()]);
        assert!(nsr.cm_vnfr[0].cfg_location.is_some());

        ctl.finish().await.unwrap();
        let _ = tokio::fs::remove_dir_all(&params.run_dir).await;
    }

    #[tokio::test]
    #[traced_test]
    async fn test_record_names_stay_in_run_dir() {
        let params = test_params();
        let store = Arc::new(MemoryRecordStore::new());
        let (registry, _plugin) = mock_registry(&params);
        let mut vnfr = script_vnfr("v1", 1, 0);
        vnfr.short_name = "../ping".to_string();
        if let Some(cfg) = vnfr.vnf_configuration.as_mut() {
            cfg.config_template = Some("ping <rw_mgmt_ip>\n".to_string());
        }
        store.put_vnfr(vnfr);
        store.put_nsd(nsd());
        store.put_nsr(
            Nsr::new("nsr-1", "tenant/../ns", "nsd-1")
                .add_vnfr("v1")
                .set_status(NsrOperStatus::Running),
        );

        let ctl = start(params.clone(), store.clone(), registry);
        let nsr = wait_for(&store, "nsr-1", |n| n.state == ConfigState::Ready).await;
        let location = nsr.cm_vnfr[0].cfg_location.clone().unwrap();
        let location = std::path::Path::new(&location);
        assert_eq!(
            location.parent(),
            Some(params.run_dir.join("tenant_.._ns-nsr-1").as_path())
        );
        assert_eq!(
            location.file_name().and_then(|f| f.to_str()),
            Some("tenant_.._ns__.._ping__1.cfg")
        );
        ctl.finish().await.unwrap();
        let _ = tokio::fs::remove_dir_all(&params.run_dir).await;
    }

    #[tokio::test]
    #[traced_test]
    async fn test_scenario_netconf_unreachable() {
        let params = CmParams {
            connection_timeout: Duration::from_millis(100),
            connection_retry_interval: Duration::from_millis(20),
            ..test_params()
        };
        let store = Arc::new(MemoryRecordStore::new());
        let connector = Arc::new(MockNetconfConnector::failing());
        let registry = Arc::new(ConfigAgentRegistry::empty(&params, None));
        registry.register(Arc::new(RiftCaAgent::with_connector(
            RiftCaParams::from(&params),
            connector.clone(),
        )));

        let router = Vnfr::new("v1", "vnf-v1", 1)
            .set_mgmt("10.0.0.1".parse().unwrap(), None)
            .set_configuration(VnfConfiguration {
                netconf: Some(NetconfMethod {
                    target: "running".to_string(),
                    port: Some(830),
                }),
                config_template: Some("<config><ip><rw_mgmt_ip></ip></config>".to_string()),
                ..VnfConfiguration::default()
            });
        seed(&store, "nsr-1", nsd(), &[router]);

        let ctl = start(params.clone(), store.clone(), registry);
        let nsr = wait_for(&store, "nsr-1", |n| n.state.is_terminal()).await;
        assert_eq!(nsr.state, ConfigState::CfgFailed);
        assert_eq!(vnf_state(&nsr, "v1"), ConfigState::CfgFailed);

        // a single connection budget: the VNF is not retried past it
        let attempts = connector.attempts();
        assert!(attempts >= 1);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(connector.attempts(), attempts);

        ctl.finish().await.unwrap();
        let _ = tokio::fs::remove_dir_all(&params.run_dir).await;
    }

    #[tokio::test]
    #[traced_test]
    async fn test_scenario_pool_values() {
        let params = test_params();
        let store = Arc::new(MemoryRecordStore::new());
        let (registry, _plugin) = mock_registry(&params);
        let nsd = Nsd {
            service_primitive: vec![NsConfigPrimitive {
                name: "add-tenant".to_string(),
                parameter: vec![PrimitiveParameter {
                    name: "vlan".to_string(),
                    parameter_pool: Some("vlans".to_string()),
                    ..PrimitiveParameter::default()
                }],
                ..NsConfigPrimitive::default()
            }],
            parameter_pool: vec![ParameterPoolDecl {
                name: "vlans".to_string(),
                values: PoolValues::List(vec![10, 20, 30]),
            }],
            ..nsd()
        };
        seed(&store, "nsr-1", nsd, &[script_vnfr("v1", 1, 0)]);

        let ctl = start(params, store.clone(), registry);
        wait_for(&store, "nsr-1", |n| n.state == ConfigState::Ready).await;

        let input = GetNsConfigPrimitiveValuesInput {
            nsr_id_ref: NsrId::new("nsr-1"),
            name: "add-tenant".to_string(),
        };
        let first = ctl.get_ns_config_primitive_values(input.clone()).await.unwrap();
        assert_eq!(first.ns_value("vlan"), Some("10"));
        let second = ctl.get_ns_config_primitive_values(input).await.unwrap();
        assert_eq!(second.ns_value("vlan"), Some("20"));

        let unknown = GetNsConfigPrimitiveValuesInput {
            nsr_id_ref: NsrId::new("nsr-2"),
            name: "add-tenant".to_string(),
        };
        assert_eq!(
            ctl.get_ns_config_primitive_values(unknown).await,
            Err(ConfigError::NoSuchNsr(NsrId::new("nsr-2")))
        );
        ctl.finish().await.unwrap();
    }

    #[tokio::test]
    #[traced_test]
    async fn test_slow_primitive_does_not_block_engine() {
        let params = test_params();
        let store = Arc::new(MemoryRecordStore::new());
        let (registry, plugin) = mock_registry(&params);
        let nsd = Nsd {
            service_primitive: vec![NsConfigPrimitive {
                name: "add-user".to_string(),
                vnf_primitive_group: vec![VnfPrimitiveGroup {
                    member_vnf_index_ref: 1,
                    vnfd_id_ref: "ping-vnfd".to_string(),
                    vnfd_name: None,
                    primitive: vec![VnfPrimitiveRef {
                        index: 1,
                        name: "create-user".to_string(),
                    }],
                }],
                ..NsConfigPrimitive::default()
            }],
            ..nsd()
        };
        let mut vnfr = script_vnfr("v1", 1, 0);
        if let Some(cfg) = vnfr.vnf_configuration.as_mut() {
            cfg.service_primitive.push(ConfigPrimitive {
                name: "create-user".to_string(),
                parameter: vec![],
                user_defined_script: None,
            });
        }
        seed(&store, "nsr-1", nsd, &[vnfr]);

        let ctl = start(params, store.clone(), registry);
        wait_for(&store, "nsr-1", |n| n.state == ConfigState::Ready).await;

        let gate = Arc::new(Notify::new());
        plugin.hold_primitives(gate.clone());
        let input = ExecNsConfigPrimitiveInput::new("nsr-1", "add-user");
        let out = tokio::time::timeout(Duration::from_secs(1), ctl.exec_ns_config_primitive(input))
            .await
            .expect("exec-ns-config-primitive waited for the primitive")
            .unwrap();
        assert_eq!(out.job_status, ExecutionStatus::Pending);
        assert_eq!(out.vnf_out_list[0].vnf_out_primitive[0].name, "create-user");

        // the engine keeps answering while the primitive runs
        let cm_state = tokio::time::timeout(Duration::from_secs(1), ctl.get_cm_state())
            .await
            .expect("get-cm-state blocked behind the primitive")
            .unwrap();
        assert_eq!(cm_state.cm_nsr.len(), 1);
        assert_eq!(store.job(out.job_id).unwrap().job_status, ExecutionStatus::Pending);

        // the job poller finishes the job once the primitive is done
        gate.notify_one();
        for _ in 0..200 {
            if store.job(out.job_id).unwrap().job_status != ExecutionStatus::Pending {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let job = store.job(out.job_id).unwrap();
        assert_eq!(job.job_status, ExecutionStatus::Completed);
        assert_eq!(job.vnfr[0].primitive[0].execution_id, "riftca-create-user-0");
        ctl.finish().await.unwrap();
    }

    #[tokio::test]
    #[traced_test]
    async fn test_scenario_no_configuration() {
        let params = test_params();
        let store = Arc::new(MemoryRecordStore::new());
        let (registry, plugin) = mock_registry(&params);
        let bare = Vnfr::new("v1", "vnf-v1", 1).set_mgmt("10.0.0.1".parse().unwrap(), None);
        seed(&store, "nsr-1", nsd(), &[bare]);

        let ctl = start(params, store.clone(), registry);
        let nsr = wait_for(&store, "nsr-1", |n| n.state.is_terminal()).await;
        assert_eq!(nsr.state, ConfigState::Ready);
        assert_eq!(vnf_state(&nsr, "v1"), ConfigState::ReadyNoCfg);
        assert_eq!(plugin.applies(), 0);
        assert_eq!(plugin.creates(), 0);
        ctl.finish().await.unwrap();
    }

    #[tokio::test]
    #[traced_test]
    async fn test_unsupported_method_fails_processing() {
        let params = test_params();
        let store = Arc::new(MemoryRecordStore::new());
        let (registry, plugin) = mock_registry(&params);
        let rest = Vnfr::new("v2", "vnf-v2", 2).set_configuration(VnfConfiguration {
            rest: Some(RestMethod { port: Some(8080) }),
            ..VnfConfiguration::default()
        });
        seed(&store, "nsr-1", nsd(), &[script_vnfr("v1", 1, 0), rest]);

        let ctl = start(params, store.clone(), registry);
        let nsr = wait_for(&store, "nsr-1", |n| n.state.is_terminal()).await;
        assert_eq!(nsr.state, ConfigState::CfgProcessFailed);
        assert_eq!(vnf_state(&nsr, "v2"), ConfigState::CfgProcessFailed);
        // never scheduled
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(plugin.applies(), 0);
        ctl.finish().await.unwrap();
    }

    #[tokio::test]
    #[traced_test]
    async fn test_discovery_waits_for_records() {
        let params = test_params();
        let store = Arc::new(MemoryRecordStore::new());
        let (registry, plugin) = mock_registry(&params);
        let vnfr = script_vnfr("v1", 1, 0);
        store.put_nsd(nsd());
        store.put_nsr(
            Nsr::new("nsr-1", "nsr-1-name", "nsd-1")
                .add_vnfr("v1")
                .set_status(NsrOperStatus::Running),
        );

        let ctl = start(params, store.clone(), registry);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(store.cm_state().is_none_or(|s| s.cm_nsr.is_empty()));

        store.put_vnfr(vnfr);
        wait_for(&store, "nsr-1", |n| n.state == ConfigState::Ready).await;
        assert_eq!(plugin.applies(), 1);

        // an NSR is configured once
        assert_eq!(
            ctl.nsr_running(NsrId::new("nsr-1")).await,
            Err(ConfigError::AlreadyProcessed(NsrId::new("nsr-1")))
        );
        ctl.finish().await.unwrap();
    }

    #[tokio::test]
    #[traced_test]
    async fn test_discovery_gives_up() {
        let params = CmParams {
            discovery_retries: 2,
            ..test_params()
        };
        let store = Arc::new(MemoryRecordStore::new());
        let (registry, plugin) = mock_registry(&params);
        store.put_nsd(nsd());
        store.put_nsr(
            Nsr::new("nsr-1", "nsr-1-name", "nsd-1")
                .add_vnfr("v1")
                .set_status(NsrOperStatus::Running),
        );

        // the VNFR never shows up
        let ctl = start(params, store.clone(), registry);
        let nsr = wait_for(&store, "nsr-1", |n| n.state.is_terminal()).await;
        assert_eq!(nsr.state, ConfigState::CfgProcessFailed);
        assert_eq!(nsr.name, "nsr-1-name");
        assert!(logs_contain("Giving up discovery of NSR nsr-1"));
        assert_eq!(plugin.applies(), 0);

        ctl.nsr_terminate(NsrId::new("nsr-1")).await.unwrap();
        assert!(ctl.get_cm_state().await.unwrap().cm_nsr.is_empty());
        ctl.finish().await.unwrap();
    }

    #[tokio::test]
    #[traced_test]
    async fn test_terminate() {
        let params = test_params();
        let store = Arc::new(MemoryRecordStore::new());
        let (registry, plugin) = mock_registry(&params);
        seed(&store, "nsr-1", nsd(), &[script_vnfr("v1", 1, 0)]);
        seed(&store, "nsr-2", nsd(), &[script_vnfr("v2", 1, 0)]);

        let ctl = start(params, store.clone(), registry.clone());
        wait_for(&store, "nsr-1", |n| n.state == ConfigState::Ready).await;
        wait_for(&store, "nsr-2", |n| n.state == ConfigState::Ready).await;

        store.remove_nsr(&NsrId::new("nsr-1"));
        ctl.nsr_terminate(NsrId::new("nsr-2")).await.unwrap();
        for _ in 0..100 {
            if ctl.get_cm_state().await.unwrap().cm_nsr.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(ctl.get_cm_state().await.unwrap().cm_nsr.is_empty());
        assert!(store.cm_state().unwrap().cm_nsr.is_empty());
        assert_eq!(plugin.terminates(), 2);
        assert!(registry.owner(&VnfrId::new("v1")).is_none());
        ctl.finish().await.unwrap();
    }

    #[tokio::test]
    #[traced_test]
    async fn test_ns_initial_config() {
        let params = test_params();
        let store = Arc::new(MemoryRecordStore::new());
        let (registry, plugin) = mock_registry(&params);
        let nsd = Nsd {
            initial_config_primitive: vec![
                NsInitialConfigPrimitive {
                    seq: 2,
                    name: "second".to_string(),
                    user_defined_script: "second.sh".to_string(),
                    parameter: vec![],
                },
                NsInitialConfigPrimitive {
                    seq: 1,
                    name: "first".to_string(),
                    user_defined_script: "first.sh".to_string(),
                    parameter: vec![],
                },
            ],
            ..nsd()
        };
        seed(&store, "nsr-1", nsd.clone(), &[script_vnfr("v1", 1, 0)]);

        let ctl = start(params, store.clone(), registry);
        let nsr = wait_for(&store, "nsr-1", |n| n.state.is_terminal()).await;
        assert_eq!(nsr.state, ConfigState::Ready);
        assert_eq!(plugin.ns_configs(), vec!["first".to_string(), "second".to_string()]);

        // a failing NS script fails the NSR
        let failing = Nsd {
            id: "nsd-2".to_string(),
            initial_config_primitive: vec![NsInitialConfigPrimitive {
                seq: 1,
                name: "broken".to_string(),
                user_defined_script: "fail.sh".to_string(),
                parameter: vec![],
            }],
            ..nsd
        };
        seed(&store, "nsr-2", failing, &[script_vnfr("v2", 1, 0)]);
        let nsr = wait_for(&store, "nsr-2", |n| n.state.is_terminal()).await;
        assert_eq!(nsr.state, ConfigState::CfgFailed);
        assert_eq!(vnf_state(&nsr, "v2"), ConfigState::Ready);
        ctl.finish().await.unwrap();
    }

    #[test]
    fn test_start_mgmt() {
        let store = Arc::new(MemoryRecordStore::new());
        let params = test_params();
        let (handle, ctl) = crate::processor::launch::start_mgmt(params, store, None).unwrap();
        ctl.blocking_finish().unwrap();
        handle.join().unwrap();
    }
}
