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

//! Rule that exchanges a filter on group keys with the aggregate below it

use polyfusion_common::error::Result;
use polyfusion_expr::rel::{RelId, RelKind};
use polyfusion_expr::rex::RexNode;
use polyfusion_expr::RexBuilder;

use crate::rule::{OptRule, PlannerContext, RelKindTag, RuleMatch, RulePattern};

/// Moves conjuncts of `Filter(Aggregate(x))` that only reference group keys
/// below the aggregate, rewriting output indexes to input indexes. Conjuncts
/// over aggregate results stay above.
#[derive(Debug, Default)]
pub struct AggregateFilterTranspose;

impl AggregateFilterTranspose {
    pub fn new() -> Self {
        Self {}
    }
}

impl OptRule for AggregateFilterTranspose {
    fn name(&self) -> &str {
        "aggregate_filter_transpose"
    }

    fn pattern(&self) -> RulePattern {
        RulePattern::with_children(
            RelKindTag::Filter,
            vec![RulePattern::with_children(
                RelKindTag::Aggregate,
                vec![RulePattern::any()],
            )],
        )
    }

    fn apply(&self, mat: &RuleMatch, ctx: &mut PlannerContext) -> Result<Option<RelId>> {
        let condition = match ctx.graph.kind(mat.root()) {
            RelKind::Filter { condition } => condition.clone(),
            _ => return Ok(None),
        };
        let (group_set, agg_calls) = match ctx.graph.kind(mat.node(1)) {
            RelKind::Aggregate {
                group_set,
                agg_calls,
            } => (group_set.clone(), agg_calls.clone()),
            _ => return Ok(None),
        };
        let input = mat.node(2);

        // output fields [0, group_set.len()) are the group keys
        let mut pushed = Vec::new();
        let mut kept = Vec::new();
        for conjunct in RexBuilder::conjunctions(&condition) {
            if conjunct
                .references()
                .iter()
                .all(|&i| i < group_set.len())
            {
                pushed.push(conjunct.rewrite(&|node| match node {
                    RexNode::InputRef { index, ty } => Some(RexNode::InputRef {
                        index: group_set[*index],
                        ty: ty.clone(),
                    }),
                    _ => None,
                }));
            } else {
                kept.push(conjunct);
            }
        }
        if pushed.is_empty() {
            return Ok(None);
        }

        let pushed = ctx.rex.and(pushed)?;
        let filtered = ctx
            .graph
            .add_logical(RelKind::Filter { condition: pushed }, vec![input])?;
        let aggregate = ctx.graph.add_logical(
            RelKind::Aggregate {
                group_set,
                agg_calls,
            },
            vec![filtered],
        )?;
        if kept.is_empty() {
            Ok(Some(aggregate))
        } else {
            let condition = ctx.rex.and(kept)?;
            Ok(Some(ctx.graph.add_logical(
                RelKind::Filter { condition },
                vec![aggregate],
            )?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{emp, optimize_with, rex};
    use polyfusion_expr::{OperatorKind, RelBuilder};
    use polyfusion_common::types::PolyType;
    use polyfusion_common::value::PolyValue;
    use std::sync::Arc;

    #[test]
    fn group_key_conjunct_moves_below_aggregate() {
        let mut graph = polyfusion_expr::RelGraph::new();
        let b = rex();
        // group by deptno; filter deptno = 7 AND cnt > 2
        let key_cond = b
            .call(
                OperatorKind::Equals,
                vec![
                    RexBuilder::input_ref(0, PolyType::integer()),
                    RexBuilder::literal_of(PolyValue::Integer(7)),
                ],
            )
            .unwrap();
        let agg_cond = b
            .call(
                OperatorKind::GreaterThan,
                vec![
                    RexBuilder::input_ref(1, PolyType::bigint()),
                    RexBuilder::literal_of(PolyValue::Integer(2)),
                ],
            )
            .unwrap();
        let both = b.and(vec![key_cond, agg_cond]).unwrap();
        let root = RelBuilder::new(&mut graph, b)
            .scan(emp())
            .unwrap()
            .aggregate(vec![2], vec![(OperatorKind::Count, vec![], false, "cnt")])
            .unwrap()
            .filter(both)
            .unwrap()
            .build()
            .unwrap();

        let optimized = optimize_with(
            vec![Arc::new(AggregateFilterTranspose::new())],
            &mut graph,
            root,
        );
        let expected = "Filter: >($1, 2)\
        \n  Aggregate: groupBy=[2], aggs=[Count() AS cnt]\
        \n    Filter: =($2, 7)\
        \n      Scan: public.emp";
        assert_eq!(graph.explain(optimized), expected);
    }
}
