// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Configuration engine.
//! This module discovers running NSRs, tracks the configuration state of their VNFs and
//! schedules the application of their configuration.

pub mod board;
pub mod ctl;
pub mod display;
pub mod jobs;
pub mod launch;
pub mod params;
pub mod proc;
pub mod sched;
pub mod state;
pub mod xlate;

#[cfg(test)]
mod tests;
