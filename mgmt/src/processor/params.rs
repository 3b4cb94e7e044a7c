// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Parameters of the configuration manager

use derive_builder::Builder;
use std::fmt::Display;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DISCOVERY_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_DISCOVERY_RETRIES: u32 = 5;
pub const DEFAULT_CONFIG_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_NSR_RETRIES: u32 = 5;
pub const DEFAULT_VNF_RETRIES: u32 = 5;
pub const DEFAULT_VNF_RETRY_BACKOFF: Duration = Duration::from_secs(5);
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_CONNECTION_RETRY_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_DESTROY_RETRIES: u32 = 25;
pub const DEFAULT_DESTROY_RETRY_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_JOB_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_RUN_DIR: &str = "/tmp/nscm";

/// Timing, retry budgets and paths of the configuration manager. N.B. we derive a builder
/// type `CmParamsBuilder` with defaults for every field.
#[derive(Builder, Clone, Debug, PartialEq)]
pub struct CmParams {
    /// period of the NSR discovery queue
    #[builder(default = DEFAULT_DISCOVERY_INTERVAL)]
    pub discovery_interval: Duration,

    /// attempts to fetch the records of a running NSR
    #[builder(default = DEFAULT_DISCOVERY_RETRIES)]
    pub discovery_retries: u32,

    /// period of the configuration scheduler
    #[builder(default = DEFAULT_CONFIG_INTERVAL)]
    pub config_interval: Duration,

    /// scheduler-level retries of an NSR
    #[builder(default = DEFAULT_NSR_RETRIES)]
    pub nsr_retries: u32,

    /// attempts to configure a VNF within a configuration pass
    #[builder(default = DEFAULT_VNF_RETRIES)]
    pub vnf_retries: u32,

    #[builder(default = DEFAULT_VNF_RETRY_BACKOFF)]
    pub vnf_retry_backoff: Duration,

    #[builder(default = DEFAULT_CONNECTION_TIMEOUT)]
    pub connection_timeout: Duration,

    #[builder(default = DEFAULT_CONNECTION_RETRY_INTERVAL)]
    pub connection_retry_interval: Duration,

    #[builder(default = DEFAULT_DESTROY_RETRIES)]
    pub destroy_retries: u32,

    #[builder(default = DEFAULT_DESTROY_RETRY_INTERVAL)]
    pub destroy_retry_interval: Duration,

    #[builder(default = DEFAULT_JOB_POLL_INTERVAL)]
    pub job_poll_interval: Duration,

    /// where config files, NS script inputs and debug artifacts are written
    #[builder(setter(into), default = PathBuf::from(DEFAULT_RUN_DIR))]
    pub run_dir: PathBuf,
}

impl Default for CmParams {
    fn default() -> Self {
        Self {
            discovery_interval: DEFAULT_DISCOVERY_INTERVAL,
            discovery_retries: DEFAULT_DISCOVERY_RETRIES,
            config_interval: DEFAULT_CONFIG_INTERVAL,
            nsr_retries: DEFAULT_NSR_RETRIES,
            vnf_retries: DEFAULT_VNF_RETRIES,
            vnf_retry_backoff: DEFAULT_VNF_RETRY_BACKOFF,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            connection_retry_interval: DEFAULT_CONNECTION_RETRY_INTERVAL,
            destroy_retries: DEFAULT_DESTROY_RETRIES,
            destroy_retry_interval: DEFAULT_DESTROY_RETRY_INTERVAL,
            job_poll_interval: DEFAULT_JOB_POLL_INTERVAL,
            run_dir: PathBuf::from(DEFAULT_RUN_DIR),
        }
    }
}

impl CmParams {
    /// Directory where the user-defined scripts of primitives are looked up if not absolute
    #[must_use]
    pub fn script_dir(&self) -> PathBuf {
        self.run_dir.join("scripts")
    }
}

impl Display for CmParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        writeln!(f, "Configuration manager parameters")?;
        writeln!(
            f,
            "  discovery   : every {:?}, {} retries",
            self.discovery_interval, self.discovery_retries
        )?;
        writeln!(
            f,
            "  scheduler   : every {:?}, {} NSR retries",
            self.config_interval, self.nsr_retries
        )?;
        writeln!(
            f,
            "  vnf         : {} attempts, backoff {:?}",
            self.vnf_retries, self.vnf_retry_backoff
        )?;
        writeln!(
            f,
            "  connection  : budget {:?}, retry every {:?}",
            self.connection_timeout, self.connection_retry_interval
        )?;
        writeln!(
            f,
            "  destroy     : {} retries every {:?}",
            self.destroy_retries, self.destroy_retry_interval
        )?;
        writeln!(f, "  jobs        : polled every {:?}", self.job_poll_interval)?;
        writeln!(f, "  run dir     : {}", self.run_dir.display())
    }
}
