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

//! Rule that pushes a filter below the projection it reads through

use polyfusion_common::error::Result;
use polyfusion_expr::rel::{RelGraph, RelId, RelKind};
use polyfusion_expr::rex::RexNode;

use crate::rule::{OptRule, PlannerContext, RelKindTag, RuleMatch, RulePattern};

/// Rewrites `Filter(Project(x))` to `Project(Filter(x))`, substituting the
/// projected expressions into the predicate.
#[derive(Debug, Default)]
pub struct FilterProjectTranspose;

impl FilterProjectTranspose {
    pub fn new() -> Self {
        Self {}
    }
}

fn has_window(expr: &RexNode) -> bool {
    let mut found = false;
    expr.visit(&mut |n| {
        if matches!(n, RexNode::Over { .. }) {
            found = true;
        }
    });
    found
}

impl OptRule for FilterProjectTranspose {
    fn name(&self) -> &str {
        "filter_project_transpose"
    }

    fn pattern(&self) -> RulePattern {
        RulePattern::with_children(
            RelKindTag::Filter,
            vec![RulePattern::with_children(
                RelKindTag::Project,
                vec![RulePattern::any()],
            )],
        )
    }

    fn matches(&self, mat: &RuleMatch, graph: &RelGraph) -> bool {
        let RelKind::Project { exprs, .. } = graph.kind(mat.node(1)) else {
            return false;
        };
        // substituting a windowed expression under the filter changes the
        // rows the window sees
        exprs.iter().all(|e| !has_window(e))
    }

    fn apply(&self, mat: &RuleMatch, ctx: &mut PlannerContext) -> Result<Option<RelId>> {
        let condition = match ctx.graph.kind(mat.root()) {
            RelKind::Filter { condition } => condition.clone(),
            _ => return Ok(None),
        };
        let (exprs, field_names) = match ctx.graph.kind(mat.node(1)) {
            RelKind::Project { exprs, field_names } => (exprs.clone(), field_names.clone()),
            _ => return Ok(None),
        };
        let input = ctx.graph.inputs(mat.node(1))[0];
        let pushed = condition.substitute_inputs(&exprs);
        let project_traits = ctx.graph.traits(mat.node(1)).clone();
        let filter = ctx
            .graph
            .add_logical(RelKind::Filter { condition: pushed }, vec![input])?;
        let id = ctx.graph.add(
            RelKind::Project { exprs, field_names },
            vec![filter],
            project_traits,
        )?;
        Ok(Some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{emp, optimize_with, rex};
    use polyfusion_expr::{OperatorKind, RelBuilder, RexBuilder};
    use polyfusion_common::value::PolyValue;
    use std::sync::Arc;

    #[test]
    fn filter_moves_below_projection() {
        let mut graph = polyfusion_expr::RelGraph::new();
        let builder = RelBuilder::new(&mut graph, rex()).scan(emp()).unwrap();
        let name = builder.field(1).unwrap();
        let salary = builder.field(3).unwrap();
        let builder = builder
            .project(vec![name, salary], vec!["name", "salary"])
            .unwrap();
        let cond = builder
            .rex()
            .call(
                OperatorKind::GreaterThan,
                vec![
                    builder.field(1).unwrap(),
                    RexBuilder::literal_of(PolyValue::Integer(1000)),
                ],
            )
            .unwrap();
        let root = builder.filter(cond).unwrap().build().unwrap();

        let optimized =
            optimize_with(vec![Arc::new(FilterProjectTranspose::new())], &mut graph, root);
        let expected = "Project: $1 AS name, $3 AS salary\
        \n  Filter: >($3, 1000)\
        \n    Scan: public.emp";
        assert_eq!(graph.explain(optimized), expected);
    }
}
