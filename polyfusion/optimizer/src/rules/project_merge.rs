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

//! Rule that merges a projection into the projection below it

use polyfusion_common::error::Result;
use polyfusion_expr::rel::{RelGraph, RelId, RelKind};

use crate::rule::{OptRule, PlannerContext, RelKindTag, RuleMatch, RulePattern};

/// Collapses `Project(Project(x))` into a single projection by substituting
/// the inner expressions into the outer ones.
#[derive(Debug, Default)]
pub struct ProjectMerge;

impl ProjectMerge {
    pub fn new() -> Self {
        Self {}
    }
}

impl OptRule for ProjectMerge {
    fn name(&self) -> &str {
        "project_merge"
    }

    fn pattern(&self) -> RulePattern {
        RulePattern::with_children(
            RelKindTag::Project,
            vec![RulePattern::with_children(
                RelKindTag::Project,
                vec![RulePattern::any()],
            )],
        )
    }

    fn matches(&self, mat: &RuleMatch, graph: &RelGraph) -> bool {
        // windowed expressions in the inner projection must not be
        // duplicated or re-scoped by substitution
        let RelKind::Project { exprs, .. } = graph.kind(mat.node(1)) else {
            return false;
        };
        exprs.iter().all(|e| {
            let mut windowed = false;
            e.visit(&mut |n| {
                if matches!(n, polyfusion_expr::rex::RexNode::Over { .. }) {
                    windowed = true;
                }
            });
            !windowed
        })
    }

    fn apply(&self, mat: &RuleMatch, ctx: &mut PlannerContext) -> Result<Option<RelId>> {
        let (outer_exprs, outer_names) = match ctx.graph.kind(mat.root()) {
            RelKind::Project { exprs, field_names } => (exprs.clone(), field_names.clone()),
            _ => return Ok(None),
        };
        let inner_exprs = match ctx.graph.kind(mat.node(1)) {
            RelKind::Project { exprs, .. } => exprs.clone(),
            _ => return Ok(None),
        };
        let input = ctx.graph.inputs(mat.node(1))[0];
        let merged = outer_exprs
            .iter()
            .map(|e| e.substitute_inputs(&inner_exprs))
            .collect();
        let traits = ctx.graph.traits(mat.root()).clone();
        let id = ctx.graph.add(
            RelKind::Project {
                exprs: merged,
                field_names: outer_names,
            },
            vec![input],
            traits,
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
    fn stacked_projections_merge() {
        let mut graph = polyfusion_expr::RelGraph::new();
        let builder = RelBuilder::new(&mut graph, rex()).scan(emp()).unwrap();
        let empid = builder.field(0).unwrap();
        let salary = builder.field(3).unwrap();
        let builder = builder
            .project(vec![empid, salary], vec!["empid", "salary"])
            .unwrap();
        // outer projection computes over the inner one's outputs
        let bump = builder
            .rex()
            .call(
                OperatorKind::Plus,
                vec![
                    builder.field(1).unwrap(),
                    RexBuilder::literal_of(PolyValue::Integer(100)),
                ],
            )
            .unwrap();
        let root = builder
            .project(vec![bump], vec!["bumped"])
            .unwrap()
            .build()
            .unwrap();

        let optimized = optimize_with(vec![Arc::new(ProjectMerge::new())], &mut graph, root);
        let expected = "Project: +($3, 100) AS bumped\
        \n  Scan: public.emp";
        assert_eq!(graph.explain(optimized), expected);
    }
}
