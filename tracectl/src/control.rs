// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Logging control: a database of targets and a reloadable filter.

use ordermap::OrderMap;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;
#[allow(unused)]
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, Registry, filter::LevelFilter, prelude::*, reload};

use crate::display::TargetsByTag;
use crate::targets::LOG_TARGETS;
use crate::trace_target;

trace_target!("tracectl", LevelFilter::INFO, &[]);

#[derive(Debug, Error, PartialEq)]
pub enum LogCtlError {
    #[error("Invalid syntax '{0}': expected tag=level")]
    Syntax(String),
    #[error("Invalid level '{0}'")]
    BadLevel(String),
    #[error("Unknown tag '{0}'")]
    UnknownTag(String),
}

/// Configuration of a single target
#[derive(Debug, Clone)]
pub struct TargetCfg {
    pub(crate) target: &'static str,
    pub(crate) name: &'static str,
    pub(crate) level: LevelFilter,
    pub(crate) tags: Vec<&'static str>,
    pub(crate) custom: bool,
}
impl TargetCfg {
    #[must_use]
    pub fn target(&self) -> &'static str {
        self.target
    }
    #[must_use]
    pub fn level(&self) -> LevelFilter {
        self.level
    }
    #[must_use]
    pub fn is_custom(&self) -> bool {
        self.custom
    }
}

#[derive(Debug)]
pub(crate) struct TargetDb {
    pub(crate) default: LevelFilter,
    pub(crate) targets: OrderMap<&'static str, TargetCfg>,
    pub(crate) tags: OrderMap<&'static str, BTreeSet<&'static str>>,
}

impl TargetDb {
    fn new(default: LevelFilter) -> Self {
        let mut db = Self {
            default,
            targets: OrderMap::new(),
            tags: OrderMap::new(),
        };
        for t in LOG_TARGETS {
            db.add(t.target, t.name, t.level, t.tags, t.custom);
        }
        db
    }
    fn add(
        &mut self,
        target: &'static str,
        name: &'static str,
        level: LevelFilter,
        tags: &'static [&'static str],
        custom: bool,
    ) {
        // a target is always reachable by its own name
        let mut all_tags = tags.to_vec();
        if !all_tags.contains(&name) {
            all_tags.push(name);
        }
        for tag in &all_tags {
            self.tags.entry(*tag).or_default().insert(target);
        }
        let cfg = TargetCfg {
            target,
            name,
            level,
            tags: all_tags,
            custom,
        };
        if self.targets.insert(target, cfg).is_some() {
            warn!("Logging target {target} was declared more than once");
        }
    }
    fn filter(&self) -> EnvFilter {
        self.targets
            .values()
            .filter_map(|t| format!("{}={}", t.target, t.level).parse().ok())
            .fold(EnvFilter::new(self.default.to_string()), |f, d| {
                f.add_directive(d)
            })
    }
    fn set_tag_level(&mut self, tag: &str, level: LevelFilter) -> usize {
        let Some(members) = self.tags.get(tag) else {
            return 0;
        };
        let mut changed = 0;
        for member in members {
            if let Some(cfg) = self.targets.get_mut(member)
                && cfg.level != level
            {
                cfg.level = level;
                changed += 1;
            }
        }
        changed
    }
}

/// Parse a comma-separated list of tag=level items
fn parse_config(input: &str) -> Result<Vec<(String, LevelFilter)>, LogCtlError> {
    input
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            let (tag, level) = item
                .split_once('=')
                .ok_or_else(|| LogCtlError::Syntax(item.to_string()))?;
            let level = LevelFilter::from_str(level.trim())
                .map_err(|_| LogCtlError::BadLevel(level.trim().to_string()))?;
            Ok((tag.trim().to_string(), level))
        })
        .collect()
}

/// Handle to change log levels at runtime
pub struct LogControl {
    db: Mutex<TargetDb>,
    handle: reload::Handle<EnvFilter, Registry>,
}

static LOG_CTL: OnceLock<LogControl> = OnceLock::new();

/// Get the process-wide [`LogControl`], installing the subscriber on first use.
pub fn get_trace_ctl() -> &'static LogControl {
    LOG_CTL.get_or_init(LogControl::install)
}

impl LogControl {
    fn install() -> Self {
        let db = TargetDb::new(LevelFilter::INFO);
        let (filter, handle) = reload::Layer::new(db.filter());
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_line_number(true)
            .with_target(true)
            .with_thread_names(true)
            .with_level(true);
        if tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
            .is_err()
        {
            // tests may have installed their own subscriber already
            eprintln!("A global tracing subscriber is already installed");
        }
        Self {
            db: Mutex::new(db),
            handle,
        }
    }
    fn reload(&self, db: &TargetDb) {
        if let Err(e) = self.handle.reload(db.filter()) {
            error!("Failed to reload log filter: {e}");
        }
    }
    pub fn init() {
        get_trace_ctl();
    }
    pub fn set_default_level(&self, level: LevelFilter) {
        let mut db = self.db.lock();
        if db.default != level {
            db.default = level;
            self.reload(&db);
            info!("Default log level is now {level}");
        }
    }
    #[must_use]
    pub fn get_default_level(&self) -> LevelFilter {
        self.db.lock().default
    }
    pub fn set_level_all(&self, level: LevelFilter) {
        let mut db = self.db.lock();
        db.targets.values_mut().for_each(|t| t.level = level);
        self.reload(&db);
    }
    /// Set the level of all the targets with the given tag. Returns the number of targets changed.
    pub fn set_tag_level(&self, tag: &str, level: LevelFilter) -> usize {
        let mut db = self.db.lock();
        let changed = db.set_tag_level(tag, level);
        if changed > 0 {
            self.reload(&db);
        }
        debug!("Log level for tag '{tag}' set to {level} ({changed} targets changed)");
        changed
    }
    /// Apply a configuration string like `default=warn,all=info,mgmt=debug`.
    /// `default` sets the fallback level, `all` sets every known target; the rest are tags.
    pub fn setup_from_string(&self, input: &str) -> Result<(), LogCtlError> {
        let items = parse_config(input)?;
        {
            let db = self.db.lock();
            if let Some((tag, _)) = items
                .iter()
                .find(|(tag, _)| tag != "default" && tag != "all" && !db.tags.contains_key(tag.as_str()))
            {
                return Err(LogCtlError::UnknownTag(tag.clone()));
            }
        }
        for (tag, level) in &items {
            match tag.as_str() {
                "default" => self.set_default_level(*level),
                "all" => self.set_level_all(*level),
                _ => {}
            }
        }
        for (tag, level) in items.iter().filter(|(t, _)| t != "default" && t != "all") {
            self.set_tag_level(tag, *level);
        }
        Ok(())
    }
    #[must_use]
    pub fn get_target(&self, target: &str) -> Option<TargetCfg> {
        self.db.lock().targets.get(target).cloned()
    }
    #[must_use]
    pub fn get_targets_by_tag(&self, tag: &str) -> Vec<TargetCfg> {
        let db = self.db.lock();
        db.tags
            .get(tag)
            .map(|members| {
                members
                    .iter()
                    .filter_map(|m| db.targets.get(m).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }
    pub fn dump(&self) {
        let db = self.db.lock();
        info!("{db}");
    }
    pub fn dump_targets_by_tag(&self) {
        let db = self.db.lock();
        info!("{}", TargetsByTag(&db));
    }
}
