// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Planner configuration, injected by the embedder

use indexmap::IndexMap;

use crate::types::{PolyTypeFamily, TypeSystem};

/// Iteration cap applied when the embedder does not configure one
pub const DEFAULT_RULE_ITERATION_BOUND: usize = 256;

/// Cost multiplier applied to conventions without a configured override.
/// Push-down operators are biased toward native execution.
pub const DEFAULT_PUSH_DOWN_MULTIPLIER: f64 = 0.1;

/// All recognized configuration of the planning core. There is no file or
/// environment loading here; the embedder constructs one and hands it to the
/// orchestrator, which treats it as read-only for the life of the process.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Catalog id of the collation applied to character types by default
    pub default_collation: u32,
    /// Overrides of the per-family default precision table
    pub default_precision_table: IndexMap<PolyTypeFamily, i32>,
    /// Per-convention multiplier applied to rule cost, keyed by convention
    /// name; conventions without an entry use the built-in defaults
    pub cost_multipliers: IndexMap<String, f64>,
    /// Upper bound on planner iterations before it gives up saturating
    pub rule_iteration_bound: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            default_collation: 0,
            default_precision_table: IndexMap::new(),
            cost_multipliers: IndexMap::new(),
            rule_iteration_bound: DEFAULT_RULE_ITERATION_BOUND,
        }
    }
}

impl PlannerConfig {
    /// The type system derived from the configured precision overrides
    pub fn type_system(&self) -> TypeSystem {
        TypeSystem::new(self.default_precision_table.clone())
    }

    /// Configured cost multiplier for a convention, if any
    pub fn cost_multiplier(&self, convention: &str) -> Option<f64> {
        self.cost_multipliers.get(convention).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = PlannerConfig::default();
        assert_eq!(config.rule_iteration_bound, DEFAULT_RULE_ITERATION_BOUND);
        assert!(config.cost_multiplier("JDBC.store1").is_none());
    }
}
