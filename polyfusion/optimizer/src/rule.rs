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

//! Rewrite rules: operand patterns, matches and the rule trait

use std::fmt::Debug;
use std::sync::Arc;

use polyfusion_common::config::PlannerConfig;
use polyfusion_common::error::Result;
use polyfusion_expr::rel::{RelGraph, RelId, RelKind};
use polyfusion_expr::RexBuilder;

/// Payload-free discriminant of [RelKind], used by operand patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelKindTag {
    Scan,
    DocumentScan,
    Filter,
    Project,
    Join,
    Correlate,
    Aggregate,
    Sort,
    SetOp,
    Values,
    Match,
    TableModify,
    ConditionalExecute,
}

pub fn tag_of(kind: &RelKind) -> RelKindTag {
    match kind {
        RelKind::Scan { .. } => RelKindTag::Scan,
        RelKind::DocumentScan { .. } => RelKindTag::DocumentScan,
        RelKind::Filter { .. } => RelKindTag::Filter,
        RelKind::Project { .. } => RelKindTag::Project,
        RelKind::Join { .. } => RelKindTag::Join,
        RelKind::Correlate { .. } => RelKindTag::Correlate,
        RelKind::Aggregate { .. } => RelKindTag::Aggregate,
        RelKind::Sort { .. } => RelKindTag::Sort,
        RelKind::SetOp { .. } => RelKindTag::SetOp,
        RelKind::Values { .. } => RelKindTag::Values,
        RelKind::Match { .. } => RelKindTag::Match,
        RelKind::TableModify { .. } => RelKindTag::TableModify,
        RelKind::ConditionalExecute { .. } => RelKindTag::ConditionalExecute,
    }
}

/// Predicate on the operator of a matched node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindPredicate {
    Any,
    Is(RelKindTag),
}

impl KindPredicate {
    fn accepts(&self, kind: &RelKind) -> bool {
        match self {
            KindPredicate::Any => true,
            KindPredicate::Is(tag) => tag_of(kind) == *tag,
        }
    }
}

/// Requirements on the children of a matched node
#[derive(Debug, Clone)]
pub enum ChildPolicy {
    /// Children are unconstrained and unbound
    Any,
    /// The node must be a leaf
    Leaf,
    /// Exactly these child patterns, in order
    Exact(Vec<RulePattern>),
}

/// A rooted operand pattern. A match is a rooted sub-DAG whose shape
/// satisfies the pattern.
#[derive(Debug, Clone)]
pub struct RulePattern {
    pub predicate: KindPredicate,
    pub children: ChildPolicy,
}

impl RulePattern {
    pub fn any() -> Self {
        Self {
            predicate: KindPredicate::Any,
            children: ChildPolicy::Any,
        }
    }

    pub fn of(tag: RelKindTag) -> Self {
        Self {
            predicate: KindPredicate::Is(tag),
            children: ChildPolicy::Any,
        }
    }

    pub fn with_children(tag: RelKindTag, children: Vec<RulePattern>) -> Self {
        Self {
            predicate: KindPredicate::Is(tag),
            children: ChildPolicy::Exact(children),
        }
    }

    /// Matches the pattern at `id`, returning the bound nodes in pre-order
    pub fn match_at(&self, graph: &RelGraph, id: RelId) -> Option<Vec<RelId>> {
        let mut bound = Vec::new();
        if self.match_rec(graph, id, &mut bound) {
            Some(bound)
        } else {
            None
        }
    }

    fn match_rec(&self, graph: &RelGraph, id: RelId, bound: &mut Vec<RelId>) -> bool {
        if !self.predicate.accepts(graph.kind(id)) {
            return false;
        }
        bound.push(id);
        match &self.children {
            ChildPolicy::Any => true,
            ChildPolicy::Leaf => graph.inputs(id).is_empty(),
            ChildPolicy::Exact(patterns) => {
                let inputs = graph.inputs(id);
                if inputs.len() != patterns.len() {
                    return false;
                }
                patterns
                    .iter()
                    .zip(inputs)
                    .all(|(p, &input)| p.match_rec(graph, input, bound))
            }
        }
    }
}

/// A successful pattern match: the bound nodes in pattern pre-order,
/// `nodes[0]` being the root
#[derive(Debug, Clone)]
pub struct RuleMatch {
    pub nodes: Vec<RelId>,
}

impl RuleMatch {
    pub fn root(&self) -> RelId {
        self.nodes[0]
    }

    pub fn node(&self, i: usize) -> RelId {
        self.nodes[i]
    }
}

/// Mutable state a rule may touch while rewriting
pub struct PlannerContext<'a> {
    pub graph: &'a mut RelGraph,
    pub rex: &'a RexBuilder,
    pub config: &'a PlannerConfig,
}

/// A pattern-matched rewrite rule.
///
/// `apply` returns the replacement for the matched root, or `None` to
/// decline. Rules must append new nodes, never mutate existing ones.
pub trait OptRule: Debug + Send + Sync {
    fn name(&self) -> &str;

    fn pattern(&self) -> RulePattern;

    /// Precondition checked after the structural match
    fn matches(&self, _mat: &RuleMatch, _graph: &RelGraph) -> bool {
        true
    }

    fn apply(&self, mat: &RuleMatch, ctx: &mut PlannerContext) -> Result<Option<RelId>>;
}

/// An ordered rule registry. Registration order is the stable rule-id order
/// used to break ties between competing rewrites of equal cost.
#[derive(Debug, Default, Clone)]
pub struct RuleSet {
    rules: Vec<Arc<dyn OptRule>>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, rule: Arc<dyn OptRule>) -> &mut Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[Arc<dyn OptRule>] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyfusion_common::types::{PolyField, PolyType};
    use polyfusion_expr::rel::TableRef;
    use polyfusion_expr::RexBuilder;

    fn scan_under_filter(graph: &mut RelGraph) -> RelId {
        let table = TableRef::new(
            1,
            vec!["t".to_string()],
            PolyType::row(vec![PolyField::new("a", PolyType::integer())]),
        );
        let scan = graph
            .add_logical(RelKind::Scan { table }, vec![])
            .unwrap();
        graph
            .add_logical(
                RelKind::Filter {
                    condition: RexBuilder::bool_literal(true),
                },
                vec![scan],
            )
            .unwrap()
    }

    #[test]
    fn pattern_binds_in_pre_order() {
        let mut graph = RelGraph::new();
        let filter = scan_under_filter(&mut graph);
        let pattern = RulePattern::with_children(
            RelKindTag::Filter,
            vec![RulePattern::of(RelKindTag::Scan)],
        );
        let bound = pattern.match_at(&graph, filter).unwrap();
        assert_eq!(bound.len(), 2);
        assert_eq!(bound[0], filter);

        let wrong = RulePattern::with_children(
            RelKindTag::Filter,
            vec![RulePattern::of(RelKindTag::Project)],
        );
        assert!(wrong.match_at(&graph, filter).is_none());
    }

    #[test]
    fn leaf_policy_requires_no_inputs() {
        let mut graph = RelGraph::new();
        let filter = scan_under_filter(&mut graph);
        let scan = graph.inputs(filter)[0];
        let leaf = RulePattern {
            predicate: KindPredicate::Any,
            children: ChildPolicy::Leaf,
        };
        assert!(leaf.match_at(&graph, scan).is_some());
        assert!(leaf.match_at(&graph, filter).is_none());
    }
}
