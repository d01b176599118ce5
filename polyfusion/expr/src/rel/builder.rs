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

//! Stacked builder for constructing relational trees

use polyfusion_common::error::Result;
use polyfusion_common::plan_err;
use polyfusion_common::types::PolyType;

use crate::operator::OperatorKind;
use crate::rel::{
    AggregateCall, ConditionalCheck, JoinType, ModifyOperation, RelGraph, RelId, RelKind,
    SetOpKind, TableRef,
};
use crate::rex::RexNode;
use crate::rex_builder::RexBuilder;
use crate::traits::RelCollation;

/// Builds a logical tree bottom-up against a [RelGraph], keeping a stack of
/// intermediate relations the way query planners assemble operator trees.
pub struct RelBuilder<'g> {
    graph: &'g mut RelGraph,
    rex: RexBuilder,
    stack: Vec<RelId>,
}

impl<'g> RelBuilder<'g> {
    pub fn new(graph: &'g mut RelGraph, rex: RexBuilder) -> Self {
        Self {
            graph,
            rex,
            stack: Vec::new(),
        }
    }

    pub fn rex(&self) -> &RexBuilder {
        &self.rex
    }

    fn pop(&mut self) -> Result<RelId> {
        match self.stack.pop() {
            Some(id) => Ok(id),
            None => plan_err!("builder stack is empty"),
        }
    }

    fn peek(&self) -> Result<RelId> {
        match self.stack.last() {
            Some(id) => Ok(*id),
            None => plan_err!("builder stack is empty"),
        }
    }

    /// Row type of the relation on top of the stack
    pub fn peek_row_type(&self) -> Result<&PolyType> {
        Ok(self.graph.row_type(self.peek()?))
    }

    /// Input reference to field `i` of the relation on top of the stack
    pub fn field(&self, i: usize) -> Result<RexNode> {
        let row = self.peek_row_type()?;
        let ty = row.field_type(i)?.clone();
        Ok(RexBuilder::input_ref(i, ty))
    }

    /// Input reference to the named field of the relation on top of the stack
    pub fn field_named(&self, name: &str) -> Result<RexNode> {
        let row = self.peek_row_type()?;
        match row.field_index(name) {
            Some(i) => self.field(i),
            None => plan_err!("no field '{name}' in {row}"),
        }
    }

    pub fn scan(mut self, table: TableRef) -> Result<Self> {
        let id = self.graph.add_logical(RelKind::Scan { table }, vec![])?;
        self.stack.push(id);
        Ok(self)
    }

    pub fn document_scan(mut self, collection: TableRef) -> Result<Self> {
        let id = self
            .graph
            .add_logical(RelKind::DocumentScan { collection }, vec![])?;
        self.stack.push(id);
        Ok(self)
    }

    pub fn values(
        mut self,
        tuples: Vec<Vec<RexNode>>,
        field_names: Vec<&str>,
    ) -> Result<Self> {
        let id = self.graph.add_logical(
            RelKind::Values {
                tuples,
                field_names: field_names.into_iter().map(String::from).collect(),
            },
            vec![],
        )?;
        self.stack.push(id);
        Ok(self)
    }

    pub fn filter(mut self, condition: RexNode) -> Result<Self> {
        let input = self.pop()?;
        let id = self
            .graph
            .add_logical(RelKind::Filter { condition }, vec![input])?;
        self.stack.push(id);
        Ok(self)
    }

    pub fn project(mut self, exprs: Vec<RexNode>, field_names: Vec<&str>) -> Result<Self> {
        let input = self.pop()?;
        let id = self.graph.add_logical(
            RelKind::Project {
                exprs,
                field_names: field_names.into_iter().map(String::from).collect(),
            },
            vec![input],
        )?;
        self.stack.push(id);
        Ok(self)
    }

    /// Projects every input field unchanged; useful to rename columns
    pub fn project_identity(self) -> Result<Self> {
        let row = self.peek_row_type()?.clone();
        let exprs = row
            .fields()
            .iter()
            .enumerate()
            .map(|(i, f)| RexBuilder::input_ref(i, f.ty.clone()))
            .collect();
        let names = row.fields().iter().map(|f| f.name.as_str()).collect();
        self.project(exprs, names)
    }

    /// Joins the two relations on top of the stack; the right operand is the
    /// one pushed last
    pub fn join(mut self, join_type: JoinType, condition: RexNode) -> Result<Self> {
        let right = self.pop()?;
        let left = self.pop()?;
        let id = self.graph.add_logical(
            RelKind::Join {
                join_type,
                condition,
            },
            vec![left, right],
        )?;
        self.stack.push(id);
        Ok(self)
    }

    /// Builds an aggregate over the relation on top of the stack. Each call
    /// is given as `(operator, argument fields, distinct, output name)`; the
    /// call's type comes from the operator's return-type inference.
    pub fn aggregate(
        mut self,
        group_set: Vec<usize>,
        calls: Vec<(OperatorKind, Vec<usize>, bool, &str)>,
    ) -> Result<Self> {
        let input = self.pop()?;
        let input_row = self.graph.row_type(input).clone();
        let mut agg_calls = Vec::with_capacity(calls.len());
        for (kind, args, distinct, name) in calls {
            let op = self.rex.operator_table().lookup(kind)?;
            if !kind.is_aggregate() {
                return plan_err!("{} is not an aggregate function", op.name);
            }
            if !op.arity.accepts(args.len()) {
                return plan_err!("invalid number of arguments to {}", op.name);
            }
            let arg_types: Vec<PolyType> = args
                .iter()
                .map(|&a| input_row.field_type(a).cloned())
                .collect::<Result<_>>()?;
            let ty = op.return_type.infer(op.name, &arg_types, None)?;
            agg_calls.push(AggregateCall {
                kind,
                args,
                distinct,
                ty,
                name: name.to_string(),
            });
        }
        let id = self.graph.add_logical(
            RelKind::Aggregate {
                group_set,
                agg_calls,
            },
            vec![input],
        )?;
        self.stack.push(id);
        Ok(self)
    }

    pub fn sort(mut self, collation: RelCollation) -> Result<Self> {
        let input = self.pop()?;
        let id = self.graph.add_logical(
            RelKind::Sort {
                collation,
                offset: None,
                fetch: None,
            },
            vec![input],
        )?;
        self.stack.push(id);
        Ok(self)
    }

    pub fn limit(mut self, offset: Option<usize>, fetch: Option<usize>) -> Result<Self> {
        let input = self.pop()?;
        let id = self.graph.add_logical(
            RelKind::Sort {
                collation: RelCollation::empty(),
                offset,
                fetch,
            },
            vec![input],
        )?;
        self.stack.push(id);
        Ok(self)
    }

    pub fn sort_limit(
        mut self,
        collation: RelCollation,
        offset: Option<usize>,
        fetch: Option<usize>,
    ) -> Result<Self> {
        let input = self.pop()?;
        let id = self.graph.add_logical(
            RelKind::Sort {
                collation,
                offset,
                fetch,
            },
            vec![input],
        )?;
        self.stack.push(id);
        Ok(self)
    }

    /// Combines the two relations on top of the stack with a set operation
    pub fn set_op(mut self, kind: SetOpKind, all: bool) -> Result<Self> {
        let right = self.pop()?;
        let left = self.pop()?;
        let id = self
            .graph
            .add_logical(RelKind::SetOp { kind, all }, vec![left, right])?;
        self.stack.push(id);
        Ok(self)
    }

    pub fn union(self, all: bool) -> Result<Self> {
        self.set_op(SetOpKind::Union, all)
    }

    pub fn modify(mut self, table: TableRef, operation: ModifyOperation) -> Result<Self> {
        let input = self.pop()?;
        let id = self.graph.add_logical(
            RelKind::TableModify {
                table,
                operation,
                flattened: false,
            },
            vec![input],
        )?;
        self.stack.push(id);
        Ok(self)
    }

    /// Emits a match-recognize over the relation on top of the stack
    pub fn match_recognize(
        mut self,
        pattern: &str,
        measures: Vec<(&str, RexNode)>,
    ) -> Result<Self> {
        let input = self.pop()?;
        let id = self.graph.add_logical(
            RelKind::Match {
                pattern: pattern.to_string(),
                measures: measures
                    .into_iter()
                    .map(|(name, expr)| (name.to_string(), expr))
                    .collect(),
            },
            vec![input],
        )?;
        self.stack.push(id);
        Ok(self)
    }

    /// Guards the relation on top of the stack with a check evaluated over
    /// the relation below it; used to enforce constraints around a modify
    pub fn conditional_execute(
        mut self,
        check: ConditionalCheck,
        error_message: &str,
    ) -> Result<Self> {
        let action = self.pop()?;
        let condition = self.pop()?;
        let id = self.graph.add_logical(
            RelKind::ConditionalExecute {
                check,
                error_message: error_message.to_string(),
            },
            vec![condition, action],
        )?;
        self.stack.push(id);
        Ok(self)
    }

    /// Finishes the build; exactly one relation must remain on the stack
    pub fn build(mut self) -> Result<RelId> {
        let root = self.pop()?;
        if !self.stack.is_empty() {
            return plan_err!(
                "builder finished with {} unconsumed relation(s)",
                self.stack.len()
            );
        }
        Ok(root)
    }
}
