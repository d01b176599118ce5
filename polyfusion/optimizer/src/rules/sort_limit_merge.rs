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

//! Rule that merges a pure limit into the sort below it

use polyfusion_common::error::Result;
use polyfusion_expr::rel::{RelGraph, RelId, RelKind};

use crate::rule::{OptRule, PlannerContext, RelKindTag, RuleMatch, RulePattern};

/// Collapses `Limit(Sort(x))` (a collation-free sort over a sorting one)
/// into a single sort, composing offsets and taking the tighter fetch.
#[derive(Debug, Default)]
pub struct SortLimitMerge;

impl SortLimitMerge {
    pub fn new() -> Self {
        Self {}
    }
}

impl OptRule for SortLimitMerge {
    fn name(&self) -> &str {
        "sort_limit_merge"
    }

    fn pattern(&self) -> RulePattern {
        RulePattern::with_children(
            RelKindTag::Sort,
            vec![RulePattern::with_children(
                RelKindTag::Sort,
                vec![RulePattern::any()],
            )],
        )
    }

    fn matches(&self, mat: &RuleMatch, graph: &RelGraph) -> bool {
        // the outer node must be a pure limit, otherwise the orders conflict
        matches!(
            graph.kind(mat.root()),
            RelKind::Sort { collation, .. } if collation.0.is_empty()
        )
    }

    fn apply(&self, mat: &RuleMatch, ctx: &mut PlannerContext) -> Result<Option<RelId>> {
        let (outer_offset, outer_fetch) = match ctx.graph.kind(mat.root()) {
            RelKind::Sort { offset, fetch, .. } => (offset.unwrap_or(0), *fetch),
            _ => return Ok(None),
        };
        let (collation, inner_offset, inner_fetch) = match ctx.graph.kind(mat.node(1)) {
            RelKind::Sort {
                collation,
                offset,
                fetch,
            } => (collation.clone(), offset.unwrap_or(0), *fetch),
            _ => return Ok(None),
        };
        let input = mat.node(2);

        // the outer window is applied within the inner one
        let offset = inner_offset + outer_offset;
        let fetch = match (inner_fetch, outer_fetch) {
            (None, outer) => outer,
            (Some(inner), None) => Some(inner.saturating_sub(outer_offset)),
            (Some(inner), Some(outer)) => {
                Some(inner.saturating_sub(outer_offset).min(outer))
            }
        };
        let id = ctx.graph.add_logical(
            RelKind::Sort {
                collation,
                offset: if offset == 0 { None } else { Some(offset) },
                fetch,
            },
            vec![input],
        )?;
        Ok(Some(id))
    }
}
