// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Network-service configuration manager.
//!
//! The [`processor`] discovers running NSRs in the [`store`], builds their configuration
//! state, and schedules the application of the configuration of every VNF through the
//! config agents of the [`agents`] registry. The [`rpc`] module serves config primitives on
//! top of it, using the [`pool`] of reserved parameter values of every NSR.

/* config agents and their registry */
pub mod agents;

/* parameter pools */
pub mod pool;

/* configuration engine */
pub mod processor;

/* config primitive RPCs */
pub mod rpc;

/* record store contract */
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

use tracectl::trace_target;
trace_target!("mgmt", tracectl::LevelFilter::INFO, &["management"]);
