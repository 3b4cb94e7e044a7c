// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

pub use clap::Parser;
use mgmt::processor::params::{
    CmParams, CmParamsBuilder, DEFAULT_CONFIG_INTERVAL, DEFAULT_CONNECTION_RETRY_INTERVAL,
    DEFAULT_CONNECTION_TIMEOUT, DEFAULT_DESTROY_RETRIES, DEFAULT_DESTROY_RETRY_INTERVAL,
    DEFAULT_DISCOVERY_INTERVAL, DEFAULT_DISCOVERY_RETRIES,
    DEFAULT_JOB_POLL_INTERVAL, DEFAULT_NSR_RETRIES, DEFAULT_RUN_DIR, DEFAULT_VNF_RETRIES,
    DEFAULT_VNF_RETRY_BACKOFF,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "NS configuration manager")]
#[command(version = "1.0")]
#[command(about = "Configures the VNFs of running network services", long_about = None)]
pub struct CmdArgs {
    #[arg(
        long,
        value_name = "PATH",
        help = "YAML file with the initial records (NSDs, NSRs, VNFRs and config-agent accounts)"
    )]
    records: Option<PathBuf>,

    #[arg(
        long,
        value_name = "PATH",
        default_value = DEFAULT_RUN_DIR,
        help = "Directory for the generated config files and debug artifacts"
    )]
    run_dir: PathBuf,

    #[arg(long, value_name = "SECONDS", default_value_t = DEFAULT_DISCOVERY_INTERVAL.as_secs())]
    discovery_interval: u64,

    #[arg(long, value_name = "N", default_value_t = DEFAULT_DISCOVERY_RETRIES)]
    discovery_retries: u32,

    #[arg(long, value_name = "SECONDS", default_value_t = DEFAULT_CONFIG_INTERVAL.as_secs())]
    config_interval: u64,

    #[arg(
        long,
        value_name = "N",
        default_value_t = DEFAULT_NSR_RETRIES,
        help = "Times an NSR that is not running yet is rescheduled before giving up"
    )]
    nsr_retries: u32,

    #[arg(
        long,
        value_name = "N",
        default_value_t = DEFAULT_VNF_RETRIES,
        value_parser = clap::value_parser!(u32).range(1..),
        help = "Attempts to configure a VNF within a configuration pass"
    )]
    vnf_retries: u32,

    #[arg(long, value_name = "SECONDS", default_value_t = DEFAULT_VNF_RETRY_BACKOFF.as_secs())]
    vnf_retry_backoff: u64,

    #[arg(long, value_name = "SECONDS", default_value_t = DEFAULT_CONNECTION_TIMEOUT.as_secs())]
    connection_timeout: u64,

    #[arg(
        long,
        value_name = "SECONDS",
        default_value_t = DEFAULT_CONNECTION_RETRY_INTERVAL.as_secs()
    )]
    connection_retry_interval: u64,

    #[arg(
        long,
        value_name = "N",
        default_value_t = DEFAULT_DESTROY_RETRIES,
        help = "Attempts to destroy the charm service of a terminated VNF"
    )]
    destroy_retries: u32,

    #[arg(
        long,
        value_name = "SECONDS",
        default_value_t = DEFAULT_DESTROY_RETRY_INTERVAL.as_secs()
    )]
    destroy_retry_interval: u64,

    #[arg(long, value_name = "SECONDS", default_value_t = DEFAULT_JOB_POLL_INTERVAL.as_secs())]
    job_poll_interval: u64,

    #[arg(
        long,
        default_value_t = false,
        help = "Show the available tracing tags and exit"
    )]
    show_tracing_tags: bool,

    #[arg(
        long,
        default_value_t = false,
        help = "Show configurable tracing targets and exit"
    )]
    show_tracing_targets: bool,

    #[arg(
        long,
        value_name = "tracing configuration",
        help = "Tracing config string as comma-separated sequence of tag=level, with level one in [off,error,warn,info,debug,trace].
Passing default=level sets the default log-level.
Passing all=level allows setting the log-level of all targets to level.
E.g. default=error,all=info,agents=debug will set the default target to error, and all the registered targets to info, but enable debug for the config agents"
    )]
    tracing: Option<String>,
}

impl CmdArgs {
    pub fn show_tracing_tags(&self) -> bool {
        self.show_tracing_tags
    }
    pub fn show_tracing_targets(&self) -> bool {
        self.show_tracing_targets
    }
    pub fn tracing(&self) -> Option<&String> {
        self.tracing.as_ref()
    }
    pub fn records(&self) -> Option<&PathBuf> {
        self.records.as_ref()
    }

    /// Build the parameters of the configuration manager
    pub fn cm_params(&self) -> Result<CmParams, String> {
        if self.connection_retry_interval == 0 {
            return Err("--connection-retry-interval must be at least one second".to_string());
        }
        let params = CmParamsBuilder::default()
            .discovery_interval(Duration::from_secs(self.discovery_interval.max(1)))
            .discovery_retries(self.discovery_retries)
            .config_interval(Duration::from_secs(self.config_interval.max(1)))
            .nsr_retries(self.nsr_retries)
            .vnf_retries(self.vnf_retries)
            .vnf_retry_backoff(Duration::from_secs(self.vnf_retry_backoff))
            .connection_timeout(Duration::from_secs(self.connection_timeout))
            .connection_retry_interval(Duration::from_secs(self.connection_retry_interval))
            .destroy_retries(self.destroy_retries)
            .destroy_retry_interval(Duration::from_secs(self.destroy_retry_interval))
            .job_poll_interval(Duration::from_secs(self.job_poll_interval.max(1)))
            .run_dir(self.run_dir.clone())
            .build()
            .map_err(|e| format!("Bad configuration manager parameters: {e}"))?;
        debug!("{params}");
        Ok(params)
    }
}
