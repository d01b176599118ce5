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

//! Rule that pushes filter conjuncts below a join, onto the side whose
//! fields they reference

use polyfusion_common::error::Result;
use polyfusion_expr::rel::{JoinType, RelGraph, RelId, RelKind};

use crate::rule::{OptRule, PlannerContext, RelKindTag, RuleMatch, RulePattern};

/// Splits `Filter(Join(l, r))` into per-side filters for conjuncts that only
/// reference one side; the remainder stays above the join.
///
/// Pushing to the left is sound for inner and left joins; pushing to the
/// right only for inner joins, since a right-side filter under a left join
/// would turn preserved rows into nulls.
#[derive(Debug, Default)]
pub struct FilterJoinPushDown;

impl FilterJoinPushDown {
    pub fn new() -> Self {
        Self {}
    }
}

impl OptRule for FilterJoinPushDown {
    fn name(&self) -> &str {
        "filter_join_push_down"
    }

    fn pattern(&self) -> RulePattern {
        RulePattern::with_children(
            RelKindTag::Filter,
            vec![RulePattern::with_children(
                RelKindTag::Join,
                vec![RulePattern::any(), RulePattern::any()],
            )],
        )
    }

    fn matches(&self, mat: &RuleMatch, graph: &RelGraph) -> bool {
        let RelKind::Filter { condition } = graph.kind(mat.root()) else {
            return false;
        };
        let RelKind::Join { join_type, .. } = graph.kind(mat.node(1)) else {
            return false;
        };
        matches!(join_type, JoinType::Inner | JoinType::Left)
            && !condition.contains_correlation()
    }

    fn apply(&self, mat: &RuleMatch, ctx: &mut PlannerContext) -> Result<Option<RelId>> {
        let condition = match ctx.graph.kind(mat.root()) {
            RelKind::Filter { condition } => condition.clone(),
            _ => return Ok(None),
        };
        let (join_type, join_condition) = match ctx.graph.kind(mat.node(1)) {
            RelKind::Join {
                join_type,
                condition,
            } => (*join_type, condition.clone()),
            _ => return Ok(None),
        };
        let left = mat.node(2);
        let right = mat.node(3);
        let left_count = ctx.graph.row_type(left).fields().len();

        let mut left_pushed = Vec::new();
        let mut right_pushed = Vec::new();
        let mut kept = Vec::new();
        for conjunct in polyfusion_expr::RexBuilder::conjunctions(&condition) {
            let refs = conjunct.references();
            if refs.iter().all(|&i| i < left_count) {
                left_pushed.push(conjunct);
            } else if join_type == JoinType::Inner && refs.iter().all(|&i| i >= left_count)
            {
                right_pushed
                    .push(conjunct.shift_input_refs(left_count, -(left_count as isize)));
            } else {
                kept.push(conjunct);
            }
        }
        if left_pushed.is_empty() && right_pushed.is_empty() {
            return Ok(None);
        }

        let mut new_left = left;
        if !left_pushed.is_empty() {
            let condition = ctx.rex.and(left_pushed)?;
            new_left = ctx
                .graph
                .add_logical(RelKind::Filter { condition }, vec![left])?;
        }
        let mut new_right = right;
        if !right_pushed.is_empty() {
            let condition = ctx.rex.and(right_pushed)?;
            new_right = ctx
                .graph
                .add_logical(RelKind::Filter { condition }, vec![right])?;
        }
        let join = ctx.graph.add_logical(
            RelKind::Join {
                join_type,
                condition: join_condition,
            },
            vec![new_left, new_right],
        )?;
        if kept.is_empty() {
            Ok(Some(join))
        } else {
            let condition = ctx.rex.and(kept)?;
            Ok(Some(ctx.graph.add_logical(
                RelKind::Filter { condition },
                vec![join],
            )?))
        }
    }
}
