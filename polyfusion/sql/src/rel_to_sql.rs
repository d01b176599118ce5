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

//! Bottom-up conversion of a relational sub-tree into the SQL AST.
//!
//! Each visited relation carries the ordered list of clauses already emitted
//! for it. The list is strictly monotonic; a relation that needs a clause at
//! or before the last emitted one is wrapped into a nested sub-select first.

use std::collections::HashMap;

use polyfusion_common::cancel::CancelFlag;
use polyfusion_common::error::Result;
use polyfusion_common::types::{PolyType, PRECISION_NOT_SPECIFIED};
use polyfusion_common::{not_impl_err, plan_err};
use polyfusion_expr::rel::{JoinType, ModifyOperation, RelGraph, RelId, RelKind, SetOpKind};
use polyfusion_expr::rex::{is_identity, CorrelationId, RexNode};
use polyfusion_expr::{OperatorKind, Syntax};

use crate::ast::{
    SqlExpr, SqlJoinKind, SqlOrderByExpr, SqlQuery, SqlRelation, SqlSelect, SqlSelectItem,
    SqlSetExpr, SqlSetOperator, SqlStatement,
};
use crate::dialect::Dialect;

/// Clauses a relation may have emitted, in evaluation order. Appending a
/// clause that is not strictly greater than the last one forces a nested
/// sub-select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Clause {
    From,
    Where,
    GroupBy,
    Having,
    Select,
    OrderBy,
    Fetch,
    Offset,
}

/// A relation in mid-conversion: the select under construction, the clauses
/// already emitted, and one SQL expression per output field
#[derive(Debug)]
struct Frame {
    select: SqlSelect,
    /// Set when the body is not a plain select (VALUES, set operations)
    body_override: Option<SqlSetExpr>,
    order_by: Vec<SqlOrderByExpr>,
    offset: Option<usize>,
    fetch: Option<usize>,
    clauses: Vec<Clause>,
    context: Vec<SqlExpr>,
    field_names: Vec<String>,
}

impl Frame {
    fn can_append(&self, clause: Clause) -> bool {
        self.clauses.last().map_or(true, |last| clause > *last)
    }

    fn into_query(self) -> SqlQuery {
        let body = self
            .body_override
            .unwrap_or_else(|| SqlSetExpr::Select(Box::new(self.select)));
        SqlQuery {
            body,
            order_by: self.order_by,
            offset: self.offset,
            fetch: self.fetch,
        }
    }
}

/// Converts sub-trees of the relational-SQL convention into statements.
pub struct RelToSqlConverter<'a> {
    graph: &'a RelGraph,
    dialect: &'a dyn Dialect,
    cancel: CancelFlag,
    alias_counter: u32,
    correlations: HashMap<CorrelationId, Vec<SqlExpr>>,
}

impl<'a> RelToSqlConverter<'a> {
    pub fn new(graph: &'a RelGraph, dialect: &'a dyn Dialect) -> Self {
        Self::with_cancel(graph, dialect, CancelFlag::new())
    }

    pub fn with_cancel(
        graph: &'a RelGraph,
        dialect: &'a dyn Dialect,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            graph,
            dialect,
            cancel,
            alias_counter: 0,
            correlations: HashMap::new(),
        }
    }

    /// Converts `root` into a complete statement. Table modifications become
    /// INSERT / UPDATE / DELETE; everything else becomes a query.
    pub fn convert(&mut self, root: RelId) -> Result<SqlStatement> {
        if let RelKind::TableModify {
            table, operation, ..
        } = self.graph.kind(root)
        {
            let input = self.graph.inputs(root)[0];
            let table_name = table.qualified_name.clone();
            return match operation {
                ModifyOperation::Insert => {
                    let columns: Vec<String> = self
                        .graph
                        .row_type(input)
                        .fields()
                        .iter()
                        .map(|f| f.name.clone())
                        .collect();
                    let source = match self.graph.kind(input) {
                        RelKind::Values { tuples, .. } => {
                            let rows = self.values_rows(tuples)?;
                            SqlQuery::of(SqlSetExpr::Values(rows))
                        }
                        _ => self.visit(input)?.into_query(),
                    };
                    Ok(SqlStatement::Insert {
                        table: table_name,
                        columns,
                        source,
                    })
                }
                ModifyOperation::Update { columns, sources } => {
                    let frame = self.visit(input)?;
                    let assignments = columns
                        .iter()
                        .zip(sources)
                        .map(|(column, source)| {
                            Ok((column.clone(), self.translate(source, &frame.context)?))
                        })
                        .collect::<Result<Vec<_>>>()?;
                    Ok(SqlStatement::Update {
                        table: table_name,
                        assignments,
                        selection: frame.select.selection,
                    })
                }
                ModifyOperation::Delete => {
                    let frame = self.visit(input)?;
                    Ok(SqlStatement::Delete {
                        table: table_name,
                        selection: frame.select.selection,
                    })
                }
                ModifyOperation::Merge => {
                    not_impl_err!("MERGE is not supported by the relational-SQL emitter")
                }
            };
        }
        Ok(SqlStatement::Query(self.convert_query(root)?))
    }

    pub fn convert_query(&mut self, root: RelId) -> Result<SqlQuery> {
        Ok(self.visit(root)?.into_query())
    }

    fn next_alias(&mut self) -> String {
        let alias = format!("t{}", self.alias_counter);
        self.alias_counter += 1;
        alias
    }

    /// Nests the frame into `(query) AS tN` and rebinds its fields
    fn wrap(&mut self, frame: Frame) -> Frame {
        let alias = self.next_alias();
        let field_names = frame.field_names.clone();
        let query = frame.into_query();
        let context = field_names
            .iter()
            .map(|name| SqlExpr::Ident(vec![alias.clone(), name.clone()]))
            .collect();
        Frame {
            select: SqlSelect {
                from: Some(SqlRelation::Subquery {
                    query: Box::new(query),
                    alias,
                }),
                ..SqlSelect::default()
            },
            body_override: None,
            order_by: Vec::new(),
            offset: None,
            fetch: None,
            clauses: vec![Clause::From],
            context,
            field_names,
        }
    }

    /// Renders the frame as a FROM-item, nesting only when it carries more
    /// than a bare source
    fn as_relation(&mut self, frame: Frame) -> (SqlRelation, Vec<SqlExpr>) {
        let bare = frame.body_override.is_none()
            && frame.clauses == [Clause::From]
            && frame.select.projection.is_empty()
            && frame.select.selection.is_none()
            && frame.select.group_by.is_empty()
            && frame.select.having.is_none()
            && frame.order_by.is_empty()
            && frame.offset.is_none()
            && frame.fetch.is_none();
        if bare {
            let context = frame.context;
            // clauses == [From] implies the source exists
            let from = frame.select.from.expect("bare frame has a source");
            (from, context)
        } else {
            let wrapped = self.wrap(frame);
            let context = wrapped.context;
            (wrapped.select.from.expect("wrapped frame has a source"), context)
        }
    }

    fn values_rows(&self, tuples: &[Vec<RexNode>]) -> Result<Vec<Vec<SqlExpr>>> {
        tuples
            .iter()
            .map(|tuple| {
                tuple
                    .iter()
                    .map(|e| self.translate(e, &[]))
                    .collect::<Result<Vec<_>>>()
            })
            .collect()
    }

    fn visit(&mut self, id: RelId) -> Result<Frame> {
        self.cancel.check()?;
        let field_names: Vec<String> = self
            .graph
            .row_type(id)
            .fields()
            .iter()
            .map(|f| f.name.clone())
            .collect();
        match self.graph.kind(id) {
            RelKind::Scan { table } => {
                let qualifier = table
                    .qualified_name
                    .last()
                    .cloned()
                    .unwrap_or_else(|| table.dotted_name());
                let context = field_names
                    .iter()
                    .map(|name| SqlExpr::Ident(vec![qualifier.clone(), name.clone()]))
                    .collect();
                Ok(Frame {
                    select: SqlSelect {
                        from: Some(SqlRelation::Table {
                            name: table.qualified_name.clone(),
                            alias: None,
                        }),
                        ..SqlSelect::default()
                    },
                    body_override: None,
                    order_by: Vec::new(),
                    offset: None,
                    fetch: None,
                    clauses: vec![Clause::From],
                    context,
                    field_names,
                })
            }
            RelKind::Filter { condition } => {
                let condition = condition.clone();
                let mut frame = self.visit(self.graph.inputs(id)[0])?;
                // a filter over grouped output becomes HAVING
                if !frame.select.group_by.is_empty()
                    && frame.select.having.is_none()
                    && frame.can_append(Clause::Having)
                {
                    let translated = self.translate(&condition, &frame.context)?;
                    frame.select.having = Some(translated);
                    frame.clauses.push(Clause::Having);
                    return Ok(frame);
                }
                if !frame.can_append(Clause::Where) {
                    frame = self.wrap(frame);
                }
                let translated = self.translate(&condition, &frame.context)?;
                frame.select.selection = Some(translated);
                frame.clauses.push(Clause::Where);
                Ok(frame)
            }
            RelKind::Project { exprs, field_names: names } => {
                let exprs = exprs.clone();
                let names = names.clone();
                let input = self.graph.inputs(id)[0];
                let frame = self.visit(input)?;
                // an identity projection adds nothing; reuse the child as-is
                if is_identity(&exprs, self.graph.row_type(input).fields().len())
                    && names == frame.field_names
                {
                    return Ok(frame);
                }
                let mut frame =
                    if frame.can_append(Clause::Select) && frame.select.projection.is_empty() {
                        frame
                    } else {
                        self.wrap(frame)
                    };
                let mut items = Vec::with_capacity(exprs.len());
                let mut context = Vec::with_capacity(exprs.len());
                for (expr, name) in exprs.iter().zip(&names) {
                    let translated = self.translate(expr, &frame.context)?;
                    let alias = match &translated {
                        SqlExpr::Ident(parts) if parts.last() == Some(name) => None,
                        _ => Some(name.clone()),
                    };
                    items.push(SqlSelectItem {
                        expr: translated.clone(),
                        alias,
                    });
                    context.push(translated);
                }
                frame.select.projection = items;
                frame.clauses.push(Clause::Select);
                frame.context = context;
                frame.field_names = names;
                Ok(frame)
            }
            RelKind::Join {
                join_type,
                condition,
            } => {
                let join_type = *join_type;
                let condition = condition.clone();
                let inputs = self.graph.inputs(id).to_vec();
                let left = self.visit(inputs[0])?;
                let right = self.visit(inputs[1])?;
                let (left_rel, left_ctx) = self.as_relation(left);
                let (right_rel, right_ctx) = self.as_relation(right);
                // right-side refs resolve through the concatenated context,
                // which encodes the left-field-count offset
                let mut context = left_ctx;
                let left_count = context.len();
                context.extend(right_ctx);
                let kind = match join_type {
                    JoinType::Inner if condition.is_always_true() => SqlJoinKind::Comma,
                    JoinType::Inner => SqlJoinKind::Inner,
                    JoinType::Left => SqlJoinKind::Left,
                    JoinType::Right => SqlJoinKind::Right,
                    JoinType::Full => SqlJoinKind::Full,
                    JoinType::Semi | JoinType::Anti => {
                        return not_impl_err!(
                            "{} join is not supported by the relational-SQL emitter",
                            join_type.name()
                        )
                    }
                };
                let on = if kind == SqlJoinKind::Comma {
                    None
                } else {
                    Some(self.translate(&condition, &context)?)
                };
                if !join_type.projects_right() {
                    context.truncate(left_count);
                }
                Ok(Frame {
                    select: SqlSelect {
                        from: Some(SqlRelation::Join {
                            left: Box::new(left_rel),
                            right: Box::new(right_rel),
                            kind,
                            on,
                        }),
                        ..SqlSelect::default()
                    },
                    body_override: None,
                    order_by: Vec::new(),
                    offset: None,
                    fetch: None,
                    clauses: vec![Clause::From],
                    context,
                    field_names,
                })
            }
            RelKind::Correlate { id: correl_id, join_type, .. } => {
                let correl_id = *correl_id;
                let join_type = *join_type;
                let inputs = self.graph.inputs(id).to_vec();
                let left = self.visit(inputs[0])?;
                let (left_rel, left_ctx) = self.as_relation(left);
                self.correlations.insert(correl_id, left_ctx.clone());
                let right = self.visit(inputs[1])?;
                self.correlations.remove(&correl_id);
                let (right_rel, right_ctx) = self.as_relation(right);
                let mut context = left_ctx;
                if join_type.projects_right() {
                    context.extend(right_ctx);
                }
                let kind = match join_type {
                    JoinType::Inner => SqlJoinKind::Comma,
                    JoinType::Left => SqlJoinKind::Left,
                    other => {
                        return not_impl_err!(
                            "correlate with {} join is not supported by the relational-SQL emitter",
                            other.name()
                        )
                    }
                };
                Ok(Frame {
                    select: SqlSelect {
                        from: Some(SqlRelation::Join {
                            left: Box::new(left_rel),
                            right: Box::new(right_rel),
                            kind,
                            on: None,
                        }),
                        ..SqlSelect::default()
                    },
                    body_override: None,
                    order_by: Vec::new(),
                    offset: None,
                    fetch: None,
                    clauses: vec![Clause::From],
                    context,
                    field_names,
                })
            }
            RelKind::Aggregate {
                group_set,
                agg_calls,
            } => {
                let group_set = group_set.clone();
                let agg_calls = agg_calls.clone();
                let frame = self.visit(self.graph.inputs(id)[0])?;
                let mut frame = if frame.can_append(Clause::GroupBy) {
                    frame
                } else if frame.clauses.last() == Some(&Clause::Select) {
                    // the child projection made every input addressable, so
                    // grouping folds into the same select
                    let mut frame = frame;
                    frame.clauses.pop();
                    frame
                } else {
                    self.wrap(frame)
                };
                let mut items = Vec::new();
                let mut context = Vec::new();
                let mut group_exprs = Vec::new();
                for (i, g) in group_set.iter().enumerate() {
                    let name = &field_names[i];
                    let expr = match frame.context.get(*g) {
                        Some(expr) => expr.clone(),
                        None => {
                            return plan_err!(
                                "group key {g} is not addressable in the child select"
                            )
                        }
                    };
                    let alias = match &expr {
                        SqlExpr::Ident(parts) if parts.last() == Some(name) => None,
                        _ => Some(name.clone()),
                    };
                    group_exprs.push(expr.clone());
                    context.push(expr.clone());
                    items.push(SqlSelectItem { expr, alias });
                }
                for call in &agg_calls {
                    let args = if call.args.is_empty() {
                        vec![SqlExpr::Star]
                    } else {
                        call.args
                            .iter()
                            .map(|&a| match frame.context.get(a) {
                                Some(expr) => Ok(expr.clone()),
                                None => plan_err!(
                                    "aggregate argument {a} is not addressable in the child select"
                                ),
                            })
                            .collect::<Result<Vec<_>>>()?
                    };
                    let expr = SqlExpr::Function {
                        name: aggregate_name(call.kind)?.to_string(),
                        args,
                        distinct: call.distinct,
                    };
                    context.push(expr.clone());
                    items.push(SqlSelectItem {
                        expr,
                        alias: Some(call.name.clone()),
                    });
                }
                frame.select.projection = items;
                // an empty group set with aggregates omits GROUP BY entirely
                frame.select.group_by = group_exprs;
                frame.clauses.push(Clause::GroupBy);
                frame.context = context;
                frame.field_names = field_names;
                Ok(frame)
            }
            RelKind::Sort {
                collation,
                offset,
                fetch,
            } => {
                let collation = collation.clone();
                let offset = *offset;
                let fetch = *fetch;
                let mut frame = self.visit(self.graph.inputs(id)[0])?;
                if !collation.0.is_empty() {
                    if !frame.can_append(Clause::OrderBy) {
                        frame = self.wrap(frame);
                    }
                    frame.order_by = collation
                        .0
                        .iter()
                        .map(|key| {
                            Ok(SqlOrderByExpr {
                                expr: match frame.context.get(key.field) {
                                    Some(expr) => expr.clone(),
                                    None => {
                                        return plan_err!(
                                            "sort key {} is not addressable",
                                            key.field
                                        )
                                    }
                                },
                                descending: key.descending,
                                nulls_first: key.nulls_first,
                            })
                        })
                        .collect::<Result<Vec<_>>>()?;
                    frame.clauses.push(Clause::OrderBy);
                }
                if let Some(fetch) = fetch {
                    if !frame.can_append(Clause::Fetch) {
                        frame = self.wrap(frame);
                    }
                    frame.fetch = Some(fetch);
                    frame.clauses.push(Clause::Fetch);
                }
                if let Some(offset) = offset {
                    if !frame.can_append(Clause::Offset) {
                        frame = self.wrap(frame);
                    }
                    frame.offset = Some(offset);
                    frame.clauses.push(Clause::Offset);
                }
                Ok(frame)
            }
            RelKind::SetOp { kind, all } => {
                let op = match kind {
                    SetOpKind::Union => SqlSetOperator::Union,
                    SetOpKind::Intersect => SqlSetOperator::Intersect,
                    SetOpKind::Minus => SqlSetOperator::Except,
                };
                let all = *all;
                let inputs = self.graph.inputs(id).to_vec();
                let mut bodies = Vec::with_capacity(inputs.len());
                for input in inputs {
                    let query = self.visit(input)?.into_query();
                    bodies.push(self.query_to_body(query));
                }
                let mut iter = bodies.into_iter();
                let first = iter.next().expect("set operations have inputs");
                let body = iter.fold(first, |left, right| SqlSetExpr::SetOp {
                    op,
                    all,
                    left: Box::new(left),
                    right: Box::new(right),
                });
                let context = field_names
                    .iter()
                    .map(|name| SqlExpr::Ident(vec![name.clone()]))
                    .collect();
                Ok(Frame {
                    select: SqlSelect::default(),
                    body_override: Some(body),
                    order_by: Vec::new(),
                    offset: None,
                    fetch: None,
                    clauses: vec![Clause::Select],
                    context,
                    field_names,
                })
            }
            RelKind::Values { tuples, field_names: names } => {
                let rows = self.values_rows(tuples)?;
                let names = names.clone();
                if self.dialect.supports_aliased_values() {
                    let alias = self.next_alias();
                    let context = names
                        .iter()
                        .map(|name| SqlExpr::Ident(vec![alias.clone(), name.clone()]))
                        .collect();
                    Ok(Frame {
                        select: SqlSelect {
                            from: Some(SqlRelation::AliasedValues {
                                rows,
                                alias,
                                columns: names.clone(),
                            }),
                            ..SqlSelect::default()
                        },
                        body_override: None,
                        order_by: Vec::new(),
                        offset: None,
                        fetch: None,
                        clauses: vec![Clause::From],
                        context,
                        field_names: names,
                    })
                } else {
                    // UNION ALL of single-row selects from the dialect's
                    // dummy source
                    let selects: Vec<SqlSetExpr> = rows
                        .into_iter()
                        .map(|row| {
                            SqlSetExpr::Select(Box::new(SqlSelect {
                                projection: row
                                    .into_iter()
                                    .zip(&names)
                                    .map(|(expr, name)| SqlSelectItem {
                                        expr,
                                        alias: Some(name.clone()),
                                    })
                                    .collect(),
                                ..SqlSelect::default()
                            }))
                        })
                        .collect();
                    let mut iter = selects.into_iter();
                    let first = iter.next().expect("VALUES has at least one tuple");
                    let body = iter.fold(first, |left, right| SqlSetExpr::SetOp {
                        op: SqlSetOperator::Union,
                        all: true,
                        left: Box::new(left),
                        right: Box::new(right),
                    });
                    let context = names
                        .iter()
                        .map(|name| SqlExpr::Ident(vec![name.clone()]))
                        .collect();
                    Ok(Frame {
                        select: SqlSelect::default(),
                        body_override: Some(body),
                        order_by: Vec::new(),
                        offset: None,
                        fetch: None,
                        clauses: vec![Clause::Select],
                        context,
                        field_names: names,
                    })
                }
            }
            other => plan_err!(
                "{} is not supported by the relational-SQL emitter",
                other.name()
            ),
        }
    }

    fn query_to_body(&mut self, query: SqlQuery) -> SqlSetExpr {
        if query.order_by.is_empty() && query.offset.is_none() && query.fetch.is_none() {
            query.body
        } else {
            let alias = self.next_alias();
            SqlSetExpr::Select(Box::new(SqlSelect {
                from: Some(SqlRelation::Subquery {
                    query: Box::new(query),
                    alias,
                }),
                ..SqlSelect::default()
            }))
        }
    }

    /// Lowers a row expression against the context of its input relation
    fn translate(&self, rex: &RexNode, context: &[SqlExpr]) -> Result<SqlExpr> {
        match rex {
            RexNode::InputRef { index, .. } => match context.get(*index) {
                Some(expr) => Ok(expr.clone()),
                None => plan_err!(
                    "input reference ${index} out of range for a context of {}",
                    context.len()
                ),
            },
            RexNode::Literal { value, .. } => Ok(SqlExpr::Literal(value.clone())),
            RexNode::LocalRef { .. } => {
                plan_err!("local references cannot be rendered as SQL")
            }
            RexNode::CorrelVariable { id, .. } => {
                plan_err!("correlation variable {id} used without a field access")
            }
            RexNode::FieldAccess { expr, field, .. } => match expr.as_ref() {
                RexNode::CorrelVariable { id, .. } => match self.correlations.get(id) {
                    Some(bound) => match bound.get(*field) {
                        Some(expr) => Ok(expr.clone()),
                        None => plan_err!("correlation field {field} out of range"),
                    },
                    None => plan_err!("correlation variable {id} is not in scope"),
                },
                _ => plan_err!("field access is only supported on correlation variables"),
            },
            RexNode::Over { .. } => {
                not_impl_err!("window aggregates in the relational-SQL emitter")
            }
            RexNode::Call { op, operands, ty } => {
                match op.kind {
                    OperatorKind::Cast => {
                        return Ok(SqlExpr::Cast {
                            expr: Box::new(self.translate(&operands[0], context)?),
                            type_name: sql_type_name(ty),
                        })
                    }
                    OperatorKind::Case => {
                        let mut branches = Vec::new();
                        let mut i = 0;
                        while i + 1 < operands.len() {
                            branches.push((
                                self.translate(&operands[i], context)?,
                                self.translate(&operands[i + 1], context)?,
                            ));
                            i += 2;
                        }
                        let else_expr = if operands.len() % 2 == 1 {
                            Some(Box::new(self.translate(
                                &operands[operands.len() - 1],
                                context,
                            )?))
                        } else {
                            None
                        };
                        return Ok(SqlExpr::Case {
                            branches,
                            else_expr,
                        });
                    }
                    OperatorKind::Item => {
                        return Ok(SqlExpr::ArrayIndex {
                            expr: Box::new(self.translate(&operands[0], context)?),
                            index: Box::new(self.translate(&operands[1], context)?),
                        })
                    }
                    OperatorKind::And | OperatorKind::Or => {
                        let parts = operands
                            .iter()
                            .map(|o| self.translate(o, context))
                            .collect::<Result<Vec<_>>>()?;
                        let mut iter = parts.into_iter();
                        let first = iter.next().expect("AND/OR have operands");
                        return Ok(iter.fold(first, |left, right| SqlExpr::Binary {
                            op: op.name.to_string(),
                            left: Box::new(left),
                            right: Box::new(right),
                        }));
                    }
                    _ => {}
                }
                let args = operands
                    .iter()
                    .map(|o| self.translate(o, context))
                    .collect::<Result<Vec<_>>>()?;
                match op.syntax {
                    Syntax::Binary => {
                        let mut iter = args.into_iter();
                        match (iter.next(), iter.next()) {
                            (Some(left), Some(right)) => Ok(SqlExpr::Binary {
                                op: op.name.to_string(),
                                left: Box::new(left),
                                right: Box::new(right),
                            }),
                            _ => plan_err!("binary operator {} needs two operands", op.name),
                        }
                    }
                    Syntax::Prefix => {
                        let mut iter = args.into_iter();
                        match iter.next() {
                            Some(expr) => Ok(SqlExpr::Unary {
                                op: op.name.to_string(),
                                expr: Box::new(expr),
                                postfix: false,
                            }),
                            None => plan_err!("prefix operator {} needs an operand", op.name),
                        }
                    }
                    Syntax::Postfix => {
                        let mut iter = args.into_iter();
                        match iter.next() {
                            Some(expr) => Ok(SqlExpr::Unary {
                                op: op.name.to_string(),
                                expr: Box::new(expr),
                                postfix: true,
                            }),
                            None => {
                                plan_err!("postfix operator {} needs an operand", op.name)
                            }
                        }
                    }
                    Syntax::Function => Ok(SqlExpr::Function {
                        name: op.name.to_string(),
                        args,
                        distinct: false,
                    }),
                    Syntax::Special => match op.kind {
                        OperatorKind::Like => {
                            let mut iter = args.into_iter();
                            match (iter.next(), iter.next()) {
                                (Some(left), Some(right)) => Ok(SqlExpr::Binary {
                                    op: "LIKE".to_string(),
                                    left: Box::new(left),
                                    right: Box::new(right),
                                }),
                                _ => plan_err!("LIKE needs two operands"),
                            }
                        }
                        other => plan_err!(
                            "operator {other:?} has no SQL rendering"
                        ),
                    },
                }
            }
        }
    }
}

/// SQL name of an aggregate function
fn aggregate_name(kind: OperatorKind) -> Result<&'static str> {
    match kind {
        OperatorKind::Min => Ok("MIN"),
        OperatorKind::Max => Ok("MAX"),
        OperatorKind::Sum => Ok("SUM"),
        OperatorKind::Count => Ok("COUNT"),
        OperatorKind::Avg => Ok("AVG"),
        other => plan_err!("{other:?} is not an aggregate function"),
    }
}

/// SQL type name used in CAST expressions
fn sql_type_name(ty: &PolyType) -> String {
    let mut out = ty.family().name().to_string();
    if ty.precision() != PRECISION_NOT_SPECIFIED {
        if ty.scale() != PRECISION_NOT_SPECIFIED {
            out.push_str(&format!("({}, {})", ty.precision(), ty.scale()));
        } else {
            out.push_str(&format!("({})", ty.precision()));
        }
    }
    out
}
