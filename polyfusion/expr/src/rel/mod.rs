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

//! The relational algebra IR: an append-only arena of immutable nodes,
//! each carrying its inputs, trait set, derived row type and digest

pub mod builder;

use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::fmt::Write as _;
use std::sync::Arc;

use itertools::Itertools;

use polyfusion_common::error::Result;
use polyfusion_common::types::{PolyField, PolyType, PolyTypeFamily};
use polyfusion_common::{internal_err, plan_err};

use crate::operator::OperatorKind;
use crate::rex::{CorrelationId, RexNode};
use crate::traits::{Convention, RelCollation, RelTraitSet};
use crate::type_coercion::least_restrictive;

/// Index of a node in its [RelGraph] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelId(pub usize);

impl Display for RelId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A resolved table (or document collection) as seen by the planner
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    pub id: u64,
    pub qualified_name: Vec<String>,
    pub row_type: PolyType,
}

impl TableRef {
    pub fn new(id: u64, qualified_name: Vec<String>, row_type: PolyType) -> Self {
        Self {
            id,
            qualified_name,
            row_type,
        }
    }

    pub fn dotted_name(&self) -> String {
        self.qualified_name.join(".")
    }
}

/// Join semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
    Semi,
    Anti,
}

impl JoinType {
    /// Whether the output contains the right input's fields
    pub fn projects_right(&self) -> bool {
        matches!(self, JoinType::Inner | JoinType::Left | JoinType::Right | JoinType::Full)
    }

    pub fn generates_nulls_on_left(&self) -> bool {
        matches!(self, JoinType::Right | JoinType::Full)
    }

    pub fn generates_nulls_on_right(&self) -> bool {
        matches!(self, JoinType::Left | JoinType::Full)
    }

    pub fn name(&self) -> &'static str {
        match self {
            JoinType::Inner => "Inner",
            JoinType::Left => "Left",
            JoinType::Right => "Right",
            JoinType::Full => "Full",
            JoinType::Semi => "Semi",
            JoinType::Anti => "Anti",
        }
    }
}

/// Set operation semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetOpKind {
    Union,
    Intersect,
    Minus,
}

impl SetOpKind {
    pub fn name(&self) -> &'static str {
        match self {
            SetOpKind::Union => "Union",
            SetOpKind::Intersect => "Intersect",
            SetOpKind::Minus => "Minus",
        }
    }
}

/// One aggregate invocation of an [RelKind::Aggregate]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AggregateCall {
    pub kind: OperatorKind,
    pub args: Vec<usize>,
    pub distinct: bool,
    pub ty: PolyType,
    pub name: String,
}

impl Display for AggregateCall {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{:?}(", self.kind)?;
        if self.distinct {
            write!(f, "DISTINCT ")?;
        }
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "${arg}")?;
        }
        write!(f, ") AS {}", self.name)
    }
}

/// The DML operation of a [RelKind::TableModify]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModifyOperation {
    Insert,
    Update {
        columns: Vec<String>,
        sources: Vec<RexNode>,
    },
    Delete,
    Merge,
}

impl ModifyOperation {
    pub fn name(&self) -> &'static str {
        match self {
            ModifyOperation::Insert => "Insert",
            ModifyOperation::Update { .. } => "Update",
            ModifyOperation::Delete => "Delete",
            ModifyOperation::Merge => "Merge",
        }
    }
}

/// Condition evaluated against the left input of a conditional execute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionalCheck {
    True,
    False,
    EqualToZero,
    GreaterZero,
}

/// The operator of a relational node. Node parameters live here; inputs,
/// traits and the derived row type live on [RelData].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RelKind {
    Scan {
        table: TableRef,
    },
    DocumentScan {
        collection: TableRef,
    },
    Filter {
        condition: RexNode,
    },
    Project {
        exprs: Vec<RexNode>,
        field_names: Vec<String>,
    },
    Join {
        join_type: JoinType,
        condition: RexNode,
    },
    Correlate {
        id: CorrelationId,
        required_columns: Vec<usize>,
        join_type: JoinType,
    },
    Aggregate {
        group_set: Vec<usize>,
        agg_calls: Vec<AggregateCall>,
    },
    Sort {
        collation: RelCollation,
        offset: Option<usize>,
        fetch: Option<usize>,
    },
    SetOp {
        kind: SetOpKind,
        all: bool,
    },
    Values {
        tuples: Vec<Vec<RexNode>>,
        field_names: Vec<String>,
    },
    Match {
        pattern: String,
        measures: Vec<(String, RexNode)>,
    },
    TableModify {
        table: TableRef,
        operation: ModifyOperation,
        flattened: bool,
    },
    ConditionalExecute {
        check: ConditionalCheck,
        error_message: String,
    },
}

impl RelKind {
    /// Base name of the operator, without its convention prefix
    pub fn name(&self) -> &'static str {
        match self {
            RelKind::Scan { .. } => "Scan",
            RelKind::DocumentScan { .. } => "DocumentScan",
            RelKind::Filter { .. } => "Filter",
            RelKind::Project { .. } => "Project",
            RelKind::Join { .. } => "Join",
            RelKind::Correlate { .. } => "Correlate",
            RelKind::Aggregate { .. } => "Aggregate",
            RelKind::Sort { .. } => "Sort",
            RelKind::SetOp { kind, .. } => kind.name(),
            RelKind::Values { .. } => "Values",
            RelKind::Match { .. } => "Match",
            RelKind::TableModify { .. } => "TableModify",
            RelKind::ConditionalExecute { .. } => "ConditionalExecute",
        }
    }

    /// Number of inputs the kind requires, `None` for "two or more"
    fn input_arity(&self) -> Option<usize> {
        match self {
            RelKind::Scan { .. } | RelKind::DocumentScan { .. } | RelKind::Values { .. } => {
                Some(0)
            }
            RelKind::Filter { .. }
            | RelKind::Project { .. }
            | RelKind::Aggregate { .. }
            | RelKind::Sort { .. }
            | RelKind::Match { .. }
            | RelKind::TableModify { .. } => Some(1),
            RelKind::Join { .. }
            | RelKind::Correlate { .. }
            | RelKind::ConditionalExecute { .. } => Some(2),
            RelKind::SetOp { .. } => None,
        }
    }

    /// Row expressions carried by the node, used by rules that walk them
    pub fn expressions(&self) -> Vec<&RexNode> {
        match self {
            RelKind::Filter { condition } | RelKind::Join { condition, .. } => {
                vec![condition]
            }
            RelKind::Project { exprs, .. } => exprs.iter().collect(),
            RelKind::Values { tuples, .. } => tuples.iter().flatten().collect(),
            RelKind::Match { measures, .. } => measures.iter().map(|(_, e)| e).collect(),
            RelKind::TableModify {
                operation: ModifyOperation::Update { sources, .. },
                ..
            } => sources.iter().collect(),
            _ => vec![],
        }
    }

    fn params_digest(&self) -> String {
        match self {
            RelKind::Scan { table } => table.dotted_name(),
            RelKind::DocumentScan { collection } => collection.dotted_name(),
            RelKind::Filter { condition } => condition.digest(),
            RelKind::Project { exprs, field_names } => exprs
                .iter()
                .zip(field_names)
                .map(|(e, n)| format!("{e} AS {n}"))
                .join(", "),
            RelKind::Join {
                join_type,
                condition,
            } => format!("{}, {}", join_type.name(), condition.digest()),
            RelKind::Correlate {
                id,
                required_columns,
                join_type,
            } => format!("{id}, {required_columns:?}, {}", join_type.name()),
            RelKind::Aggregate {
                group_set,
                agg_calls,
            } => format!(
                "groupBy={group_set:?}, aggs=[{}]",
                agg_calls.iter().map(|c| c.to_string()).join(", ")
            ),
            RelKind::Sort {
                collation,
                offset,
                fetch,
            } => {
                let mut s = collation.to_string();
                if let Some(offset) = offset {
                    let _ = write!(s, ", offset={offset}");
                }
                if let Some(fetch) = fetch {
                    let _ = write!(s, ", fetch={fetch}");
                }
                s
            }
            RelKind::SetOp { all, .. } => format!("all={all}"),
            RelKind::Values { tuples, .. } => format!(
                "[{}]",
                tuples
                    .iter()
                    .map(|t| format!(
                        "({})",
                        t.iter().map(|e| e.digest()).collect::<Vec<_>>().join(", ")
                    ))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            RelKind::Match { pattern, measures } => format!(
                "pattern={pattern}, measures=[{}]",
                measures
                    .iter()
                    .map(|(n, e)| format!("{e} AS {n}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            RelKind::TableModify {
                table, operation, ..
            } => format!("{}, op={}", table.dotted_name(), operation.name()),
            RelKind::ConditionalExecute { check, .. } => format!("{check:?}"),
        }
    }
}

/// One relational node: operator, inputs, traits, and derived facts
#[derive(Debug, Clone)]
pub struct RelData {
    pub kind: RelKind,
    pub inputs: Vec<RelId>,
    pub traits: RelTraitSet,
    pub row_type: Arc<PolyType>,
    pub digest: String,
}

/// Arena owning the relational nodes of one planning pass.
///
/// Nodes are appended, never mutated; rewrites create new nodes. Adding a
/// node structurally identical to an existing one returns the existing id,
/// so equal digests imply the same arena slot.
#[derive(Debug, Default)]
pub struct RelGraph {
    nodes: Vec<RelData>,
    interned: HashMap<String, RelId>,
    next_correl: u32,
}

impl RelGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: RelId) -> &RelData {
        &self.nodes[id.0]
    }

    pub fn kind(&self, id: RelId) -> &RelKind {
        &self.nodes[id.0].kind
    }

    pub fn inputs(&self, id: RelId) -> &[RelId] {
        &self.nodes[id.0].inputs
    }

    pub fn traits(&self, id: RelId) -> &RelTraitSet {
        &self.nodes[id.0].traits
    }

    pub fn row_type(&self, id: RelId) -> &PolyType {
        &self.nodes[id.0].row_type
    }

    pub fn digest(&self, id: RelId) -> &str {
        &self.nodes[id.0].digest
    }

    pub fn ids(&self) -> impl Iterator<Item = RelId> {
        (0..self.nodes.len()).map(RelId)
    }

    /// Allocates a correlation id unique within this planning pass
    pub fn next_correlation_id(&mut self) -> CorrelationId {
        let id = CorrelationId(self.next_correl);
        self.next_correl += 1;
        id
    }

    /// Adds a node with logical traits
    pub fn add_logical(&mut self, kind: RelKind, inputs: Vec<RelId>) -> Result<RelId> {
        self.add(kind, inputs, RelTraitSet::logical())
    }

    /// Adds a node, deriving its row type and digest. Structurally identical
    /// nodes are interned to the same id.
    pub fn add(
        &mut self,
        kind: RelKind,
        inputs: Vec<RelId>,
        traits: RelTraitSet,
    ) -> Result<RelId> {
        match kind.input_arity() {
            Some(expected) if inputs.len() != expected => {
                return plan_err!(
                    "{} requires {expected} input(s), got {}",
                    kind.name(),
                    inputs.len()
                );
            }
            None if inputs.len() < 2 => {
                return plan_err!(
                    "{} requires at least two inputs, got {}",
                    kind.name(),
                    inputs.len()
                );
            }
            _ => {}
        }
        let row_type = self.derive_row_type(&kind, &inputs)?;
        let digest = format!(
            "{}({})[{}]{{{}}}",
            kind.name(),
            kind.params_digest(),
            inputs
                .iter()
                .map(|i| self.digest(*i))
                .collect::<Vec<_>>()
                .join(", "),
            traits
        );
        if let Some(existing) = self.interned.get(&digest) {
            return Ok(*existing);
        }
        let id = RelId(self.nodes.len());
        self.interned.insert(digest.clone(), id);
        self.nodes.push(RelData {
            kind,
            inputs,
            traits,
            row_type: Arc::new(row_type),
            digest,
        });
        Ok(id)
    }

    /// Re-adds a node with a different trait set, keeping kind and inputs
    pub fn with_traits(&mut self, id: RelId, traits: RelTraitSet) -> Result<RelId> {
        let data = self.node(id).clone();
        self.add(data.kind, data.inputs, traits)
    }

    fn check_boolean(&self, what: &str, condition: &RexNode) -> Result<()> {
        match condition.ty().family() {
            PolyTypeFamily::Boolean | PolyTypeFamily::Null => Ok(()),
            other => plan_err!("{what} condition must be BOOLEAN, got {}", other.name()),
        }
    }

    /// Row type as a pure function of the kind, the inputs' row types and
    /// the node parameters
    fn derive_row_type(&self, kind: &RelKind, inputs: &[RelId]) -> Result<PolyType> {
        match kind {
            RelKind::Scan { table } => {
                if !table.row_type.is_struct() {
                    return internal_err!(
                        "table {} has non-struct row type",
                        table.dotted_name()
                    );
                }
                Ok(table.row_type.clone())
            }
            RelKind::DocumentScan { collection } => Ok(collection.row_type.clone()),
            RelKind::Filter { condition } => {
                self.check_boolean("filter", condition)?;
                let input = self.row_type(inputs[0]);
                if let Some(max) = condition.references().into_iter().next_back() {
                    if max >= input.fields().len() {
                        return plan_err!(
                            "filter references field {max} of an input with {} fields",
                            input.fields().len()
                        );
                    }
                }
                Ok(input.clone())
            }
            RelKind::Project { exprs, field_names } => {
                if exprs.len() != field_names.len() {
                    return plan_err!(
                        "projection has {} expressions but {} names",
                        exprs.len(),
                        field_names.len()
                    );
                }
                let fields = exprs
                    .iter()
                    .zip(field_names)
                    .map(|(e, n)| PolyField::new(n.clone(), e.ty().clone()))
                    .collect();
                Ok(PolyType::row(fields))
            }
            RelKind::Join {
                join_type,
                condition,
            } => {
                self.check_boolean("join", condition)?;
                let left = self.row_type(inputs[0]);
                let right = self.row_type(inputs[1]);
                if !join_type.projects_right() {
                    return Ok(left.clone());
                }
                let mut fields: Vec<PolyField> = Vec::new();
                for field in left.fields() {
                    let ty = if join_type.generates_nulls_on_left() {
                        field.ty.with_nullability(true)
                    } else {
                        field.ty.clone()
                    };
                    fields.push(PolyField::new(field.name.clone(), ty));
                }
                for field in right.fields() {
                    let ty = if join_type.generates_nulls_on_right() {
                        field.ty.with_nullability(true)
                    } else {
                        field.ty.clone()
                    };
                    fields.push(PolyField::new(field.name.clone(), ty));
                }
                uniquify_names(&mut fields);
                Ok(PolyType::row(fields))
            }
            RelKind::Correlate { join_type, .. } => {
                let left = self.row_type(inputs[0]);
                if !join_type.projects_right() {
                    return Ok(left.clone());
                }
                let right = self.row_type(inputs[1]);
                let mut fields: Vec<PolyField> = left.fields().to_vec();
                for field in right.fields() {
                    let ty = if join_type.generates_nulls_on_right() {
                        field.ty.with_nullability(true)
                    } else {
                        field.ty.clone()
                    };
                    fields.push(PolyField::new(field.name.clone(), ty));
                }
                uniquify_names(&mut fields);
                Ok(PolyType::row(fields))
            }
            RelKind::Aggregate {
                group_set,
                agg_calls,
            } => {
                let input = self.row_type(inputs[0]);
                let mut fields = Vec::with_capacity(group_set.len() + agg_calls.len());
                for &g in group_set {
                    let field = input.fields().get(g).ok_or_else(|| {
                        polyfusion_common::PolyFusionError::Plan(format!(
                            "group key {g} out of range for input with {} fields",
                            input.fields().len()
                        ))
                    })?;
                    fields.push(field.clone());
                }
                for call in agg_calls {
                    fields.push(PolyField::new(call.name.clone(), call.ty.clone()));
                }
                uniquify_names(&mut fields);
                Ok(PolyType::row(fields))
            }
            RelKind::Sort { collation, .. } => {
                let input = self.row_type(inputs[0]);
                for field in &collation.0 {
                    if field.field >= input.fields().len() {
                        return plan_err!(
                            "sort key {} out of range for input with {} fields",
                            field.field,
                            input.fields().len()
                        );
                    }
                }
                Ok(input.clone())
            }
            RelKind::SetOp { kind, .. } => {
                let first = self.row_type(inputs[0]);
                let arity = first.fields().len();
                let mut fields: Vec<PolyField> = first.fields().to_vec();
                for &input in &inputs[1..] {
                    let other = self.row_type(input);
                    if other.fields().len() != arity {
                        return plan_err!(
                            "{} inputs must have equal field counts: {arity} vs {}",
                            kind.name(),
                            other.fields().len()
                        );
                    }
                    for (field, theirs) in fields.iter_mut().zip(other.fields()) {
                        let common =
                            least_restrictive(&[field.ty.clone(), theirs.ty.clone()])
                                .ok_or_else(|| {
                                    polyfusion_common::PolyFusionError::Type(format!(
                                        "no common type for {} column {}: {} vs {}",
                                        kind.name(),
                                        field.name,
                                        field.ty,
                                        theirs.ty
                                    ))
                                })?;
                        field.ty = common;
                    }
                }
                Ok(PolyType::row(fields))
            }
            RelKind::Values { tuples, field_names } => {
                let arity = field_names.len();
                let mut columns: Vec<Vec<PolyType>> = vec![Vec::new(); arity];
                for tuple in tuples {
                    if tuple.len() != arity {
                        return plan_err!(
                            "VALUES tuple has {} expressions, expected {arity}",
                            tuple.len()
                        );
                    }
                    for (i, expr) in tuple.iter().enumerate() {
                        if expr.as_literal().is_none() {
                            return plan_err!("VALUES accepts literals only, got {expr}");
                        }
                        columns[i].push(expr.ty().clone());
                    }
                }
                let fields = field_names
                    .iter()
                    .zip(columns)
                    .map(|(name, types)| {
                        let ty = least_restrictive(&types).ok_or_else(|| {
                            polyfusion_common::PolyFusionError::Type(format!(
                                "no common type for VALUES column {name}"
                            ))
                        })?;
                        Ok(PolyField::new(name.clone(), ty))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(PolyType::row(fields))
            }
            RelKind::Match { measures, .. } => {
                if measures.is_empty() {
                    Ok(self.row_type(inputs[0]).clone())
                } else {
                    let fields = measures
                        .iter()
                        .map(|(n, e)| PolyField::new(n.clone(), e.ty().clone()))
                        .collect();
                    Ok(PolyType::row(fields))
                }
            }
            RelKind::TableModify { .. } => Ok(PolyType::row(vec![PolyField::new(
                "ROWCOUNT",
                PolyType::bigint(),
            )])),
            RelKind::ConditionalExecute { .. } => Ok(self.row_type(inputs[1]).clone()),
        }
    }

    fn node_title(&self, id: RelId) -> String {
        let data = self.node(id);
        let prefix = match data.traits.convention() {
            Convention::None => "",
            Convention::Jdbc(_) => "Jdbc",
            Convention::Document(_) => "Document",
        };
        let params = data.kind.params_digest();
        if params.is_empty() {
            format!("{prefix}{}", data.kind.name())
        } else {
            format!("{prefix}{}: {params}", data.kind.name())
        }
    }

    /// Renders the tree rooted at `id` as an indented plan string
    pub fn explain(&self, id: RelId) -> String {
        let mut out = String::new();
        self.explain_rec(id, 0, &mut out);
        out
    }

    fn explain_rec(&self, id: RelId, indent: usize, out: &mut String) {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&"  ".repeat(indent));
        out.push_str(&self.node_title(id));
        for &input in self.inputs(id) {
            self.explain_rec(input, indent + 1, out);
        }
    }
}

/// Renames duplicate field names by appending a numeric suffix, so row types
/// always have addressable columns
fn uniquify_names(fields: &mut [PolyField]) {
    let mut seen: HashMap<String, usize> = HashMap::new();
    for field in fields.iter_mut() {
        match seen.get(&field.name) {
            None => {
                seen.insert(field.name.clone(), 0);
            }
            Some(_) => {
                let mut n = seen[&field.name];
                let mut candidate = format!("{}{n}", field.name);
                while seen.contains_key(&candidate) {
                    n += 1;
                    candidate = format!("{}{n}", field.name);
                }
                seen.insert(field.name.clone(), n + 1);
                seen.insert(candidate.clone(), 0);
                field.name = candidate;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::standard_operator_table;
    use crate::rex_builder::RexBuilder;
    use polyfusion_common::types::TypeSystem;
    use polyfusion_common::value::PolyValue;

    fn test_table() -> TableRef {
        TableRef::new(
            1,
            vec!["public".to_string(), "emp".to_string()],
            PolyType::row(vec![
                PolyField::new("empid", PolyType::integer()),
                PolyField::new("name", PolyType::varchar(50).with_nullability(true)),
                PolyField::new("deptno", PolyType::integer()),
            ]),
        )
    }

    fn rex() -> RexBuilder {
        RexBuilder::new(Arc::new(standard_operator_table()), TypeSystem::default())
    }

    #[test]
    fn repeated_construction_interns_to_one_node() {
        let mut graph = RelGraph::new();
        let b = rex();
        let scan1 = graph
            .add_logical(RelKind::Scan { table: test_table() }, vec![])
            .unwrap();
        let cond = b
            .call(
                OperatorKind::GreaterThan,
                vec![
                    RexBuilder::input_ref(0, PolyType::integer()),
                    RexBuilder::literal_of(PolyValue::Integer(10)),
                ],
            )
            .unwrap();
        let f1 = graph
            .add_logical(
                RelKind::Filter {
                    condition: cond.clone(),
                },
                vec![scan1],
            )
            .unwrap();
        let scan2 = graph
            .add_logical(RelKind::Scan { table: test_table() }, vec![])
            .unwrap();
        let f2 = graph
            .add_logical(RelKind::Filter { condition: cond }, vec![scan2])
            .unwrap();
        assert_eq!(scan1, scan2);
        assert_eq!(f1, f2);
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn filter_preserves_row_type() {
        let mut graph = RelGraph::new();
        let b = rex();
        let scan = graph
            .add_logical(RelKind::Scan { table: test_table() }, vec![])
            .unwrap();
        let cond = b
            .call(
                OperatorKind::Equals,
                vec![
                    RexBuilder::input_ref(2, PolyType::integer()),
                    RexBuilder::literal_of(PolyValue::Integer(7)),
                ],
            )
            .unwrap();
        let filter = graph
            .add_logical(RelKind::Filter { condition: cond }, vec![scan])
            .unwrap();
        assert_eq!(graph.row_type(filter), graph.row_type(scan));
    }

    #[test]
    fn left_join_nullifies_right_side() {
        let mut graph = RelGraph::new();
        let b = rex();
        let left = graph
            .add_logical(RelKind::Scan { table: test_table() }, vec![])
            .unwrap();
        let dept = TableRef::new(
            2,
            vec!["public".to_string(), "dept".to_string()],
            PolyType::row(vec![
                PolyField::new("deptno", PolyType::integer()),
                PolyField::new("dname", PolyType::varchar(20)),
            ]),
        );
        let right = graph
            .add_logical(RelKind::Scan { table: dept }, vec![])
            .unwrap();
        let cond = b
            .call(
                OperatorKind::Equals,
                vec![
                    RexBuilder::input_ref(2, PolyType::integer()),
                    RexBuilder::input_ref(3, PolyType::integer()),
                ],
            )
            .unwrap();
        let join = graph
            .add_logical(
                RelKind::Join {
                    join_type: JoinType::Left,
                    condition: cond,
                },
                vec![left, right],
            )
            .unwrap();
        let row = graph.row_type(join);
        assert_eq!(row.fields().len(), 5);
        // left side keeps nullability, right side becomes nullable
        assert!(!row.fields()[0].ty.is_nullable());
        assert!(row.fields()[3].ty.is_nullable());
        assert!(row.fields()[4].ty.is_nullable());
        // duplicate deptno is uniquified
        assert_eq!(row.fields()[3].name, "deptno0");
    }

    #[test]
    fn aggregate_row_type_is_groups_then_calls() {
        let mut graph = RelGraph::new();
        let scan = graph
            .add_logical(RelKind::Scan { table: test_table() }, vec![])
            .unwrap();
        let agg = graph
            .add_logical(
                RelKind::Aggregate {
                    group_set: vec![2],
                    agg_calls: vec![AggregateCall {
                        kind: OperatorKind::Count,
                        args: vec![],
                        distinct: false,
                        ty: PolyType::bigint(),
                        name: "cnt".to_string(),
                    }],
                },
                vec![scan],
            )
            .unwrap();
        let row = graph.row_type(agg);
        assert_eq!(row.fields().len(), 2);
        assert_eq!(row.fields()[0].name, "deptno");
        assert_eq!(row.fields()[1].name, "cnt");
        assert_eq!(row.fields()[1].ty, PolyType::bigint());
    }

    #[test]
    fn table_modify_returns_rowcount() {
        let mut graph = RelGraph::new();
        let scan = graph
            .add_logical(RelKind::Scan { table: test_table() }, vec![])
            .unwrap();
        let modify = graph
            .add_logical(
                RelKind::TableModify {
                    table: test_table(),
                    operation: ModifyOperation::Delete,
                    flattened: false,
                },
                vec![scan],
            )
            .unwrap();
        let row = graph.row_type(modify);
        assert_eq!(row.fields().len(), 1);
        assert_eq!(row.fields()[0].name, "ROWCOUNT");
    }

    #[test]
    fn explain_renders_indented_tree() {
        let mut graph = RelGraph::new();
        let b = rex();
        let scan = graph
            .add_logical(RelKind::Scan { table: test_table() }, vec![])
            .unwrap();
        let cond = b
            .call(
                OperatorKind::GreaterThan,
                vec![
                    RexBuilder::input_ref(0, PolyType::integer()),
                    RexBuilder::literal_of(PolyValue::Integer(10)),
                ],
            )
            .unwrap();
        let filter = graph
            .add_logical(RelKind::Filter { condition: cond }, vec![scan])
            .unwrap();
        let expected = "Filter: >($0, 10)\
        \n  Scan: public.emp";
        assert_eq!(graph.explain(filter), expected);
    }

    #[test]
    fn digests_are_stable_across_arenas() {
        let build = |graph: &mut RelGraph| {
            let b = rex();
            let scan = graph
                .add_logical(RelKind::Scan { table: test_table() }, vec![])
                .unwrap();
            let cond = b
                .call(
                    OperatorKind::LessThan,
                    vec![
                        RexBuilder::input_ref(2, PolyType::integer()),
                        RexBuilder::literal_of(PolyValue::Integer(5)),
                    ],
                )
                .unwrap();
            graph
                .add_logical(RelKind::Filter { condition: cond }, vec![scan])
                .unwrap()
        };
        let mut g1 = RelGraph::new();
        let r1 = build(&mut g1);
        let mut g2 = RelGraph::new();
        let r2 = build(&mut g2);
        assert_eq!(g1.digest(r1), g2.digest(r2));
    }

    #[test]
    fn values_requires_literals() {
        let mut graph = RelGraph::new();
        let result = graph.add_logical(
            RelKind::Values {
                tuples: vec![vec![RexBuilder::input_ref(0, PolyType::integer())]],
                field_names: vec!["a".to_string()],
            },
            vec![],
        );
        assert!(result.is_err());
    }
}
