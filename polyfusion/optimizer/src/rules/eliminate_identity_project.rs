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

//! Rule that eliminates projections that reproduce their input unchanged

use polyfusion_common::error::Result;
use polyfusion_expr::rel::{RelGraph, RelId, RelKind};
use polyfusion_expr::rex::is_identity;

use crate::rule::{OptRule, PlannerContext, RelKindTag, RuleMatch, RulePattern};

/// Removes a `Project` whose expressions are the identity `[$0, $1, ...]`
/// over the input and whose row type equals the input's.
#[derive(Debug, Default)]
pub struct EliminateIdentityProject;

impl EliminateIdentityProject {
    pub fn new() -> Self {
        Self {}
    }
}

impl OptRule for EliminateIdentityProject {
    fn name(&self) -> &str {
        "eliminate_identity_project"
    }

    fn pattern(&self) -> RulePattern {
        RulePattern::with_children(RelKindTag::Project, vec![RulePattern::any()])
    }

    fn matches(&self, mat: &RuleMatch, graph: &RelGraph) -> bool {
        let RelKind::Project { exprs, .. } = graph.kind(mat.root()) else {
            return false;
        };
        let input = mat.node(1);
        is_identity(exprs, graph.row_type(input).fields().len())
            && graph.row_type(mat.root()) == graph.row_type(input)
    }

    fn apply(&self, mat: &RuleMatch, _ctx: &mut PlannerContext) -> Result<Option<RelId>> {
        Ok(Some(mat.node(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{emp, optimize_with, rex};
    use polyfusion_expr::{RelBuilder, RelGraph};
    use std::sync::Arc;

    #[test]
    fn identity_projection_is_removed() {
        let mut graph = RelGraph::new();
        let root = RelBuilder::new(&mut graph, rex())
            .scan(emp())
            .unwrap()
            .project_identity()
            .unwrap()
            .build()
            .unwrap();

        let optimized = optimize_with(
            vec![Arc::new(EliminateIdentityProject::new())],
            &mut graph,
            root,
        );
        assert_eq!(graph.explain(optimized), "Scan: public.emp");
    }

    #[test]
    fn renaming_projection_is_kept() {
        let mut graph = RelGraph::new();
        let builder = RelBuilder::new(&mut graph, rex()).scan(emp()).unwrap();
        let f0 = builder.field(0).unwrap();
        let f1 = builder.field(1).unwrap();
        let f2 = builder.field(2).unwrap();
        let f3 = builder.field(3).unwrap();
        let root = builder
            .project(vec![f0, f1, f2, f3], vec!["id", "n", "d", "s"])
            .unwrap()
            .build()
            .unwrap();

        let optimized = optimize_with(
            vec![Arc::new(EliminateIdentityProject::new())],
            &mut graph,
            root,
        );
        // names differ, so the projection stays
        assert_eq!(optimized, root);
    }

    #[test]
    fn reordering_projection_is_kept() {
        let mut graph = RelGraph::new();
        let builder = RelBuilder::new(&mut graph, rex()).scan(emp()).unwrap();
        let a = builder.field(1).unwrap();
        let b = builder.field(0).unwrap();
        let root = builder
            .project(vec![a, b], vec!["name", "empid"])
            .unwrap()
            .build()
            .unwrap();
        let optimized = optimize_with(
            vec![Arc::new(EliminateIdentityProject::new())],
            &mut graph,
            root,
        );
        assert_eq!(optimized, root);
    }

}
