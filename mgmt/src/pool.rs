// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Parameter pools: reserved values handed out to config primitives without reuse.
//! Ranges are never expanded: only the values handed out are stored.

use config::ConfigError;
use config::records::{ParameterPoolDecl, PoolValues};
use std::collections::BTreeSet;
use tracing::{debug, warn};

#[derive(Clone, Debug, PartialEq)]
pub struct ParameterPool {
    name: String,
    values: PoolValues,
    used: BTreeSet<u64>,
}

impl ParameterPool {
    #[must_use]
    pub fn new(name: &str, values: PoolValues) -> Self {
        debug!("Creating parameter pool '{name}' with {} values", values.size());
        Self {
            name: name.to_owned(),
            values,
            used: BTreeSet::new(),
        }
    }
    #[must_use]
    pub fn from_decl(decl: &ParameterPoolDecl) -> Self {
        Self::new(&decl.name, decl.values.clone())
    }
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
    /// Number of values not used yet
    #[must_use]
    pub fn available(&self) -> u64 {
        let used = match &self.values {
            PoolValues::Range {
                start_value,
                end_value,
            } if start_value <= end_value => self.used.range(*start_value..=*end_value).count(),
            PoolValues::Range { .. } => 0,
            PoolValues::List(values) => {
                let distinct: BTreeSet<u64> = values.iter().copied().collect();
                distinct.intersection(&self.used).count()
            }
        };
        self.values
            .size()
            .saturating_sub(u64::try_from(used).unwrap_or(u64::MAX))
    }

    /// Mark a value as used. Marking a value twice is harmless.
    pub fn add_used_value(&mut self, value: u64) {
        if !self.values.contains(value) {
            warn!("Value {value} does not belong to pool '{}'", self.name);
        }
        self.used.insert(value);
    }

    /// The first value of a range not used yet: walks the used values of the range in
    /// order, so the cost depends on what was handed out, not on the range size.
    fn next_in_range(&self, start: u64, end: u64) -> Option<u64> {
        let mut candidate = start;
        for used in self.used.range(start..=end) {
            if *used != candidate {
                break;
            }
            candidate = candidate.checked_add(1)?;
        }
        (candidate <= end).then_some(candidate)
    }

    /// Get the first value not used yet, marking it as used
    pub fn get_next_unused_value(&mut self) -> Result<u64, ConfigError> {
        let next = match &self.values {
            PoolValues::Range {
                start_value,
                end_value,
            } if start_value <= end_value => self.next_in_range(*start_value, *end_value),
            PoolValues::Range { .. } => None,
            PoolValues::List(values) => values.iter().find(|v| !self.used.contains(*v)).copied(),
        };
        let value = next.ok_or_else(|| ConfigError::PoolExhausted(self.name.clone()))?;
        self.used.insert(value);
        debug!("Allocated value {value} from pool '{}'", self.name);
        Ok(value)
    }
}
