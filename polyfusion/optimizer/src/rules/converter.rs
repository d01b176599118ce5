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

//! Convention conversion: re-tags logical nodes a backend can execute

use std::collections::BTreeSet;

use polyfusion_common::error::Result;
use polyfusion_expr::rel::{RelGraph, RelId, RelKind};
use polyfusion_expr::traits::{Convention, RelTrait, StoreId};

use crate::rule::{ChildPolicy, KindPredicate, OptRule, PlannerContext, RuleMatch, RulePattern};

/// Converts a logical node to a backend convention when the backend supports
/// the operator and every input already carries that convention.
///
/// Conversion runs bottom-up across planner iterations: scans of placed
/// tables convert first, then the operators above them. One instance is
/// registered per configured adapter.
#[derive(Debug)]
pub struct ConverterRule {
    name: String,
    convention: Convention,
    /// Catalog ids of the tables (or collections) placed on the store
    placed_tables: BTreeSet<u64>,
}

impl ConverterRule {
    pub fn jdbc(store: StoreId, placed_tables: BTreeSet<u64>) -> Self {
        Self {
            name: format!("jdbc_converter_{store}"),
            convention: Convention::Jdbc(store),
            placed_tables,
        }
    }

    pub fn document(store: StoreId, placed_tables: BTreeSet<u64>) -> Self {
        Self {
            name: format!("document_converter_{store}"),
            convention: Convention::Document(store),
            placed_tables,
        }
    }

    pub fn convention(&self) -> Convention {
        self.convention
    }

    /// Operators the convention's emitter can serialize
    fn supports(&self, kind: &RelKind) -> bool {
        match self.convention {
            Convention::Jdbc(_) => matches!(
                kind,
                RelKind::Scan { .. }
                    | RelKind::Filter { .. }
                    | RelKind::Project { .. }
                    | RelKind::Join { .. }
                    | RelKind::Aggregate { .. }
                    | RelKind::Sort { .. }
                    | RelKind::SetOp { .. }
                    | RelKind::Values { .. }
                    | RelKind::TableModify { .. }
            ),
            Convention::Document(_) => matches!(
                kind,
                RelKind::DocumentScan { .. }
                    | RelKind::Filter { .. }
                    | RelKind::Project { .. }
                    | RelKind::Aggregate { .. }
                    | RelKind::Sort { .. }
                    | RelKind::Values { .. }
                    | RelKind::TableModify { .. }
            ),
            Convention::None => false,
        }
    }
}

impl OptRule for ConverterRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn pattern(&self) -> RulePattern {
        RulePattern {
            predicate: KindPredicate::Any,
            children: ChildPolicy::Any,
        }
    }

    fn matches(&self, mat: &RuleMatch, graph: &RelGraph) -> bool {
        let id = mat.root();
        if graph.traits(id).convention() != Convention::None {
            return false;
        }
        let kind = graph.kind(id);
        if !self.supports(kind) {
            return false;
        }
        match kind {
            RelKind::Scan { table } | RelKind::TableModify { table, .. } => {
                if !self.placed_tables.contains(&table.id) {
                    return false;
                }
            }
            RelKind::DocumentScan { collection } => {
                if !self.placed_tables.contains(&collection.id) {
                    return false;
                }
            }
            _ => {}
        }
        graph
            .inputs(id)
            .iter()
            .all(|&input| graph.traits(input).convention() == self.convention)
    }

    fn apply(&self, mat: &RuleMatch, ctx: &mut PlannerContext) -> Result<Option<RelId>> {
        let id = mat.root();
        let traits = ctx
            .graph
            .traits(id)
            .replace(RelTrait::Convention(self.convention));
        Ok(Some(ctx.graph.with_traits(id, traits)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{emp, optimize_with, rex};
    use polyfusion_expr::{OperatorKind, RelBuilder, RexBuilder};
    use polyfusion_common::types::PolyType;
    use polyfusion_common::value::PolyValue;
    use std::sync::Arc;

    #[test]
    fn converts_bottom_up_for_placed_tables() {
        let mut graph = polyfusion_expr::RelGraph::new();
        let b = rex();
        let cond = b
            .call(
                OperatorKind::GreaterThan,
                vec![
                    RexBuilder::input_ref(0, PolyType::integer()),
                    RexBuilder::literal_of(PolyValue::Integer(10)),
                ],
            )
            .unwrap();
        let root = RelBuilder::new(&mut graph, b)
            .scan(emp())
            .unwrap()
            .filter(cond)
            .unwrap()
            .build()
            .unwrap();

        let rule = ConverterRule::jdbc(StoreId(1), BTreeSet::from([1]));
        let optimized = optimize_with(vec![Arc::new(rule)], &mut graph, root);
        let expected = "JdbcFilter: >($0, 10)\
        \n  JdbcScan: public.emp";
        assert_eq!(graph.explain(optimized), expected);
    }

    #[test]
    fn unplaced_table_is_not_converted() {
        let mut graph = polyfusion_expr::RelGraph::new();
        let root = RelBuilder::new(&mut graph, rex())
            .scan(emp())
            .unwrap()
            .build()
            .unwrap();
        let rule = ConverterRule::jdbc(StoreId(1), BTreeSet::from([99]));
        let optimized = optimize_with(vec![Arc::new(rule)], &mut graph, root);
        assert_eq!(optimized, root);
    }
}
