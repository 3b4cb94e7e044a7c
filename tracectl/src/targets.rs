// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Link-time registry of logging targets

use crate::LevelFilter;
use linkme::distributed_slice;

/// A logging target declared by some crate, with its default level and tags.
pub struct LogTarget {
    pub(crate) target: &'static str,
    pub(crate) name: &'static str,
    pub(crate) level: LevelFilter,
    pub(crate) tags: &'static [&'static str],
    pub(crate) custom: bool,
}
impl LogTarget {
    pub const fn new(
        target: &'static str,
        name: &'static str,
        level: LevelFilter,
        tags: &'static [&'static str],
        custom: bool,
    ) -> Self {
        Self {
            target,
            name,
            level,
            tags,
            custom,
        }
    }
}

#[distributed_slice]
pub static LOG_TARGETS: [LogTarget];

#[doc(hidden)]
#[macro_export]
macro_rules! log_target_deps {
    () => {
        use linkme::distributed_slice;
        use $crate::LevelFilter;
        use $crate::targets::{LOG_TARGETS, LogTarget};
    };
}

/// Declare the logging target of the calling module, with a name, a default level and tags.
#[macro_export]
macro_rules! trace_target {
    // a const scope keeps the static name local, so that the macro can be used many times
    ($name:expr, $level:expr, $tags:expr) => {
        const _: () = {
            use $crate::log_target_deps;
            log_target_deps!();

            #[distributed_slice(LOG_TARGETS)]
            static LOG_TGT: LogTarget = LogTarget::new(module_path!(), $name, $level, $tags, false);
        };
    };
}

/// Declare a target that is not a module path, e.g. that of a third-party crate.
#[macro_export]
macro_rules! custom_target {
    ($target:expr, $level:expr, $tags:expr) => {
        const _: () = {
            use $crate::log_target_deps;
            log_target_deps!();

            #[distributed_slice(LOG_TARGETS)]
            static LOG_TGT: LogTarget = LogTarget::new($target, $target, $level, $tags, true);
        };
    };
}
