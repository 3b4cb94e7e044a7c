// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Runtime control of logging targets.
//!
//! Every crate of the configuration manager declares its target with [`trace_target!`].
//! Targets are gathered at link time and can be re-levelled at runtime, either one by one or
//! by tag, with configuration strings such as `default=info,mgmt=debug,juju=warn`.

pub mod control;
pub mod display;
pub mod targets;

pub use control::{LogControl, LogCtlError, get_trace_ctl};
pub use tracing_subscriber::filter::LevelFilter;
