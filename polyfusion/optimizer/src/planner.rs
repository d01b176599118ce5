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

//! The planner: fires rules over the IR until the root is sealed or the
//! iteration bound is reached, picking rewrites by cost

use std::cmp::Ordering;
use std::collections::HashSet;

use hashbrown::HashMap;
use log::{debug, warn};

use polyfusion_common::cancel::CancelFlag;
use polyfusion_common::config::PlannerConfig;
use polyfusion_common::error::Result;
use polyfusion_expr::rel::{RelGraph, RelId};
use polyfusion_expr::RexBuilder;

use crate::cost::{cost_of, RelCost};
use crate::rule::{PlannerContext, RuleMatch, RuleSet};

/// Union-find over node digests: the memo of sets of nodes proven
/// equivalent by rewrites.
#[derive(Debug, Default)]
pub struct EquivalenceSets {
    parent: HashMap<String, String>,
    merges: usize,
}

impl EquivalenceSets {
    /// Canonical representative of the digest's equivalence class
    pub fn find(&mut self, digest: &str) -> String {
        let parent = match self.parent.get(digest) {
            None => return digest.to_string(),
            Some(parent) => parent.clone(),
        };
        let root = self.find(&parent);
        if root != parent {
            self.parent.insert(digest.to_string(), root.clone());
        }
        root
    }

    /// Records that two digests denote equivalent relations
    pub fn union(&mut self, a: &str, b: &str) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            // smaller representative keeps classes stable across runs
            let (child, root) = if ra < rb { (rb, ra) } else { (ra, rb) };
            self.parent.insert(child, root);
            self.merges += 1;
        }
    }

    pub fn merges(&self) -> usize {
        self.merges
    }
}

/// Outcome of one planning pass
#[derive(Debug)]
pub struct PlannerResult {
    pub root: RelId,
    pub iterations: usize,
    /// True when the iteration bound stopped planning before the root was
    /// sealed; reported as a warning, not an error
    pub bound_hit: bool,
    /// Number of equivalence-set merges recorded during the pass
    pub equivalence_merges: usize,
}

/// Rule-driven planner. Holds only read-only state and is safe to share
/// across concurrent queries; all per-query state lives in the arguments.
#[derive(Debug)]
pub struct Planner {
    rules: RuleSet,
    config: PlannerConfig,
}

impl Planner {
    pub fn new(rules: RuleSet, config: PlannerConfig) -> Self {
        Self { rules, config }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Rewrites the tree rooted at `root` to a fixed point.
    ///
    /// Each iteration collects every applicable (node, rule) match in the
    /// current tree, applies them speculatively, and accepts the candidate
    /// with the lowest cost; equal costs fall back to the stable rule-id
    /// order. The pass ends when no acceptable candidate remains (the root
    /// is sealed) or the configured iteration bound is hit.
    pub fn plan(
        &self,
        graph: &mut RelGraph,
        rex: &RexBuilder,
        root: RelId,
        cancel: &CancelFlag,
    ) -> Result<PlannerResult> {
        let mut root = root;
        let mut equiv = EquivalenceSets::default();
        // (rule id, canonical digest) pairs that can never fire again
        let mut exhausted: HashSet<(usize, String)> = HashSet::new();
        let mut seen_roots: HashSet<String> = HashSet::new();
        seen_roots.insert(graph.digest(root).to_string());
        let mut iterations = 0;
        let mut bound_hit = false;

        loop {
            cancel.check()?;
            if iterations >= self.config.rule_iteration_bound {
                bound_hit = true;
                warn!(
                    "planner iteration bound {} reached before the root was sealed",
                    self.config.rule_iteration_bound
                );
                break;
            }
            iterations += 1;

            let current_cost = cost_of(graph, root, &self.config);
            let nodes = collect_nodes(graph, root);
            // (cost, rule id, candidate root, rewritten digest); best is the
            // lexicographic min over cost then rule id
            let mut best: Option<(RelCost, usize, RelId, String)> = None;

            for node in nodes {
                cancel.check()?;
                for (rule_id, rule) in self.rules.rules().iter().enumerate() {
                    let canonical = equiv.find(graph.digest(node));
                    let key = (rule_id, canonical);
                    if exhausted.contains(&key) {
                        continue;
                    }
                    let Some(bound) = rule.pattern().match_at(graph, node) else {
                        exhausted.insert(key);
                        continue;
                    };
                    let mat = RuleMatch { nodes: bound };
                    if !rule.matches(&mat, graph) {
                        exhausted.insert(key);
                        continue;
                    }
                    let mut ctx = PlannerContext {
                        graph: &mut *graph,
                        rex,
                        config: &self.config,
                    };
                    let applied = match rule.apply(&mat, &mut ctx) {
                        Ok(applied) => applied,
                        Err(e) => {
                            // recover locally: skip the failing rule
                            debug!("rule {} failed, skipping: {e}", rule.name());
                            exhausted.insert(key);
                            continue;
                        }
                    };
                    let Some(replacement) = applied else {
                        exhausted.insert(key);
                        continue;
                    };
                    if replacement == node {
                        exhausted.insert(key);
                        continue;
                    }
                    let old_digest = graph.digest(node).to_string();
                    let new_digest = graph.digest(replacement).to_string();
                    equiv.union(&old_digest, &new_digest);
                    let candidate = replace(graph, root, node, replacement)?;
                    if candidate == root {
                        exhausted.insert(key);
                        continue;
                    }
                    let cost = cost_of(graph, candidate, &self.config);
                    debug!(
                        "rule {} proposed {} (rows={}, cpu={})",
                        rule.name(),
                        graph.digest(candidate),
                        cost.rows,
                        cost.cpu
                    );
                    let better = match &best {
                        None => true,
                        Some((best_cost, best_rule, _, _)) => {
                            match cost.compare(best_cost) {
                                Ordering::Less => true,
                                Ordering::Equal => rule_id < *best_rule,
                                Ordering::Greater => false,
                            }
                        }
                    };
                    if better {
                        best = Some((cost, rule_id, candidate, old_digest));
                    }
                }
            }

            match best {
                Some((cost, rule_id, new_root, rewritten))
                    if cost.compare(&current_cost) != Ordering::Greater
                        && seen_roots.insert(graph.digest(new_root).to_string()) =>
                {
                    // the winning rewrite is settled for the rewritten node
                    let canonical = equiv.find(&rewritten);
                    exhausted.insert((rule_id, canonical));
                    root = new_root;
                }
                // no acceptable candidate: the root is sealed
                _ => break,
            }
        }

        Ok(PlannerResult {
            root,
            iterations,
            bound_hit,
            equivalence_merges: equiv.merges(),
        })
    }
}

/// All nodes reachable from `root`, children before parents
fn collect_nodes(graph: &RelGraph, root: RelId) -> Vec<RelId> {
    fn rec(graph: &RelGraph, id: RelId, seen: &mut HashSet<RelId>, out: &mut Vec<RelId>) {
        if !seen.insert(id) {
            return;
        }
        for &input in graph.inputs(id) {
            rec(graph, input, seen, out);
        }
        out.push(id);
    }
    let mut out = Vec::new();
    rec(graph, root, &mut HashSet::new(), &mut out);
    out
}

/// Rebuilds the tree rooted at `current` with `old` replaced by `new`.
/// Untouched sub-trees keep their ids; rebuilt parents intern as usual.
pub fn replace(
    graph: &mut RelGraph,
    current: RelId,
    old: RelId,
    new: RelId,
) -> Result<RelId> {
    if current == old {
        return Ok(new);
    }
    let inputs = graph.inputs(current).to_vec();
    let mut new_inputs = Vec::with_capacity(inputs.len());
    let mut changed = false;
    for input in inputs {
        let replaced = replace(graph, input, old, new)?;
        changed |= replaced != input;
        new_inputs.push(replaced);
    }
    if !changed {
        return Ok(current);
    }
    let data = graph.node(current).clone();
    graph.add(data.kind, new_inputs, data.traits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equivalence_sets_union_find() {
        let mut sets = EquivalenceSets::default();
        sets.union("a", "b");
        sets.union("b", "c");
        assert_eq!(sets.find("c"), "a");
        assert_eq!(sets.merges(), 2);
        sets.union("a", "c");
        assert_eq!(sets.merges(), 2);
    }
}
