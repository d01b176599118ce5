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

//! Rule that pushes a filter into every input of a union

use polyfusion_common::error::Result;
use polyfusion_expr::rel::{RelGraph, RelId, RelKind, SetOpKind};

use crate::rule::{OptRule, PlannerContext, RelKindTag, RuleMatch, RulePattern};

/// Rewrites `Filter(Union(a, b, ...))` to `Union(Filter(a), Filter(b), ...)`.
/// The inputs share the union's field layout, so the predicate applies to
/// each one unchanged.
#[derive(Debug, Default)]
pub struct FilterSetOpPushDown;

impl FilterSetOpPushDown {
    pub fn new() -> Self {
        Self {}
    }
}

impl OptRule for FilterSetOpPushDown {
    fn name(&self) -> &str {
        "filter_set_op_push_down"
    }

    fn pattern(&self) -> RulePattern {
        RulePattern::with_children(
            RelKindTag::Filter,
            vec![RulePattern::of(RelKindTag::SetOp)],
        )
    }

    fn matches(&self, mat: &RuleMatch, graph: &RelGraph) -> bool {
        matches!(
            graph.kind(mat.node(1)),
            RelKind::SetOp {
                kind: SetOpKind::Union,
                ..
            }
        )
    }

    fn apply(&self, mat: &RuleMatch, ctx: &mut PlannerContext) -> Result<Option<RelId>> {
        let condition = match ctx.graph.kind(mat.root()) {
            RelKind::Filter { condition } => condition.clone(),
            _ => return Ok(None),
        };
        let set_op = match ctx.graph.kind(mat.node(1)) {
            RelKind::SetOp { kind, all } => RelKind::SetOp {
                kind: *kind,
                all: *all,
            },
            _ => return Ok(None),
        };
        let inputs = ctx.graph.inputs(mat.node(1)).to_vec();
        let mut filtered = Vec::with_capacity(inputs.len());
        for input in inputs {
            filtered.push(ctx.graph.add_logical(
                RelKind::Filter {
                    condition: condition.clone(),
                },
                vec![input],
            )?);
        }
        Ok(Some(ctx.graph.add_logical(set_op, filtered)?))
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
    fn filter_distributes_over_union() {
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
            .scan(emp())
            .unwrap()
            .union(true)
            .unwrap()
            .filter(cond)
            .unwrap()
            .build()
            .unwrap();

        let optimized =
            optimize_with(vec![Arc::new(FilterSetOpPushDown::new())], &mut graph, root);
        let expected = "Union: all=true\
        \n  Filter: >($0, 10)\
        \n    Scan: public.emp\
        \n  Filter: >($0, 10)\
        \n    Scan: public.emp";
        assert_eq!(graph.explain(optimized), expected);
    }

    #[test]
    fn intersect_is_left_alone() {
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
            .scan(emp())
            .unwrap()
            .set_op(SetOpKind::Intersect, false)
            .unwrap()
            .filter(cond)
            .unwrap()
            .build()
            .unwrap();
        let optimized =
            optimize_with(vec![Arc::new(FilterSetOpPushDown::new())], &mut graph, root);
        assert_eq!(optimized, root);
    }
}
