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

//! Cost model: `(rows, cpu, io)` with lexicographic comparison and
//! per-convention multipliers

use std::cmp::Ordering;

use polyfusion_common::config::{PlannerConfig, DEFAULT_PUSH_DOWN_MULTIPLIER};
use polyfusion_expr::rel::{RelGraph, RelId, RelKind};
use polyfusion_expr::JoinType;

/// Estimated cost of a plan: output rows plus cumulative cpu and io.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelCost {
    pub rows: f64,
    pub cpu: f64,
    pub io: f64,
}

impl RelCost {
    pub const ZERO: RelCost = RelCost {
        rows: 0.0,
        cpu: 0.0,
        io: 0.0,
    };

    pub fn new(rows: f64, cpu: f64, io: f64) -> Self {
        Self { rows, cpu, io }
    }

    /// Lexicographic comparison: rows, then cpu, then io
    pub fn compare(&self, other: &RelCost) -> Ordering {
        self.rows
            .total_cmp(&other.rows)
            .then(self.cpu.total_cmp(&other.cpu))
            .then(self.io.total_cmp(&other.io))
    }

    pub fn is_cheaper_than(&self, other: &RelCost) -> bool {
        self.compare(other) == Ordering::Less
    }
}

/// Default cardinality assumed for base relations without statistics
const DEFAULT_SCAN_ROWS: f64 = 1000.0;
/// Selectivity assumed for predicates without statistics
const DEFAULT_SELECTIVITY: f64 = 0.5;

/// Multiplier applied to a node's own cpu and io contribution, biased
/// toward executing inside a backend
fn convention_multiplier(graph: &RelGraph, id: RelId, config: &PlannerConfig) -> f64 {
    let convention = graph.traits(id).convention();
    match config.cost_multiplier(&convention.name()) {
        Some(m) => m,
        None if convention.is_push_down() => DEFAULT_PUSH_DOWN_MULTIPLIER,
        None => 1.0,
    }
}

/// Computes the cumulative cost of the tree rooted at `id`.
///
/// Row estimates are the pure heuristics of a rule-driven planner: the model
/// only has to rank rewrites of the same query, not predict runtimes.
pub fn cost_of(graph: &RelGraph, id: RelId, config: &PlannerConfig) -> RelCost {
    let inputs: Vec<RelCost> = graph
        .inputs(id)
        .iter()
        .map(|&input| cost_of(graph, input, config))
        .collect();
    let child_cpu: f64 = inputs.iter().map(|c| c.cpu).sum();
    let child_io: f64 = inputs.iter().map(|c| c.io).sum();

    let (rows, own_cpu, own_io) = match graph.kind(id) {
        RelKind::Scan { .. } | RelKind::DocumentScan { .. } => {
            (DEFAULT_SCAN_ROWS, DEFAULT_SCAN_ROWS, DEFAULT_SCAN_ROWS)
        }
        RelKind::Values { tuples, .. } => {
            let rows = tuples.len() as f64;
            (rows, rows, 0.0)
        }
        RelKind::Filter { .. } => {
            let rows = inputs[0].rows;
            (rows * DEFAULT_SELECTIVITY, rows, 0.0)
        }
        RelKind::Project { exprs, .. } => {
            let rows = inputs[0].rows;
            (rows, rows * (1.0 + exprs.len() as f64 * 0.01), 0.0)
        }
        RelKind::Join { join_type, .. } | RelKind::Correlate { join_type, .. } => {
            let left = inputs[0].rows;
            let right = inputs.get(1).map_or(0.0, |c| c.rows);
            let rows = match join_type {
                JoinType::Semi | JoinType::Anti => left * DEFAULT_SELECTIVITY,
                _ => left.max(right),
            };
            (rows, left + right, 0.0)
        }
        RelKind::Aggregate { group_set, .. } => {
            let input_rows = inputs[0].rows;
            let rows = if group_set.is_empty() {
                1.0
            } else {
                input_rows * DEFAULT_SELECTIVITY
            };
            (rows, input_rows, 0.0)
        }
        RelKind::Sort { fetch, .. } => {
            let input_rows = inputs[0].rows;
            let rows = match fetch {
                Some(fetch) => input_rows.min(*fetch as f64),
                None => input_rows,
            };
            (rows, input_rows * input_rows.max(2.0).log2(), 0.0)
        }
        RelKind::SetOp { .. } => {
            let rows: f64 = inputs.iter().map(|c| c.rows).sum();
            (rows, rows, 0.0)
        }
        RelKind::Match { .. } => {
            let rows = inputs[0].rows;
            (rows, rows, 0.0)
        }
        RelKind::TableModify { .. } => {
            let rows = inputs[0].rows;
            (rows, rows, rows)
        }
        RelKind::ConditionalExecute { .. } => {
            let rows = inputs.get(1).map_or(0.0, |c| c.rows);
            (rows, inputs[0].rows, 0.0)
        }
    };

    let multiplier = convention_multiplier(graph, id, config);
    RelCost {
        rows,
        cpu: child_cpu + own_cpu * multiplier,
        io: child_io + own_io * multiplier,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyfusion_expr::rel::TableRef;
    use polyfusion_expr::traits::{Convention, RelTraitSet, StoreId};
    use polyfusion_expr::{standard_operator_table, OperatorKind, RexBuilder};
    use polyfusion_common::types::{PolyField, PolyType, TypeSystem};
    use polyfusion_common::value::PolyValue;
    use std::sync::Arc;

    fn table() -> TableRef {
        TableRef::new(
            1,
            vec!["t".to_string()],
            PolyType::row(vec![PolyField::new("a", PolyType::integer())]),
        )
    }

    #[test]
    fn lexicographic_comparison() {
        let a = RelCost::new(10.0, 100.0, 0.0);
        let b = RelCost::new(10.0, 50.0, 0.0);
        assert!(b.is_cheaper_than(&a));
        let c = RelCost::new(9.0, 1000.0, 0.0);
        // fewer rows wins regardless of cpu
        assert!(c.is_cheaper_than(&b));
    }

    #[test]
    fn push_down_convention_is_cheaper() {
        let config = PlannerConfig::default();
        let rex = RexBuilder::new(Arc::new(standard_operator_table()), TypeSystem::default());
        let mut graph = RelGraph::new();
        let scan = graph
            .add_logical(RelKind::Scan { table: table() }, vec![])
            .unwrap();
        let cond = rex
            .call(
                OperatorKind::GreaterThan,
                vec![
                    RexBuilder::input_ref(0, PolyType::integer()),
                    RexBuilder::literal_of(PolyValue::Integer(1)),
                ],
            )
            .unwrap();
        let logical = graph
            .add_logical(RelKind::Filter { condition: cond }, vec![scan])
            .unwrap();
        let jdbc = graph
            .with_traits(
                logical,
                RelTraitSet::of(Convention::Jdbc(StoreId(1))),
            )
            .unwrap();
        let logical_cost = cost_of(&graph, logical, &config);
        let jdbc_cost = cost_of(&graph, jdbc, &config);
        assert!(jdbc_cost.is_cheaper_than(&logical_cost));
    }
}
