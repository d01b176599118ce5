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

//! The row-expression (scalar) IR: immutable trees of literals, input
//! references and operator calls

use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};

use polyfusion_common::types::PolyType;
use polyfusion_common::value::PolyValue;

use crate::operator::{OperatorKind, OperatorRef};

/// Identifier of a correlation variable, scoped to one planning pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CorrelationId(pub u32);

impl Display for CorrelationId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "$cor{}", self.0)
    }
}

/// An aggregate invocation inside an OVER window
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WindowAggregate {
    pub kind: OperatorKind,
    pub args: Vec<RexNode>,
    pub distinct: bool,
}

/// A scalar expression. Nodes are immutable; rewrites build new trees.
/// Structural equality and hashing double as the digest identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RexNode {
    /// A typed literal value
    Literal { value: PolyValue, ty: PolyType },
    /// Reference to a field of the input row
    InputRef { index: usize, ty: PolyType },
    /// Reference to a slot of the enclosing program (common sub-expressions)
    LocalRef { index: usize, ty: PolyType },
    /// An operator applied to operands
    Call {
        op: OperatorRef,
        operands: Vec<RexNode>,
        ty: PolyType,
    },
    /// Reference to a variable bound by an enclosing Correlate
    CorrelVariable { id: CorrelationId, ty: PolyType },
    /// Access to a field of a struct-typed expression
    FieldAccess {
        expr: Box<RexNode>,
        field: usize,
        ty: PolyType,
    },
    /// A windowed aggregate
    Over {
        agg: WindowAggregate,
        partition_keys: Vec<usize>,
        order_keys: Vec<usize>,
        ty: PolyType,
    },
}

impl RexNode {
    pub fn ty(&self) -> &PolyType {
        match self {
            RexNode::Literal { ty, .. }
            | RexNode::InputRef { ty, .. }
            | RexNode::LocalRef { ty, .. }
            | RexNode::Call { ty, .. }
            | RexNode::CorrelVariable { ty, .. }
            | RexNode::FieldAccess { ty, .. }
            | RexNode::Over { ty, .. } => ty,
        }
    }

    /// Canonical textual identity; equal iff the nodes are structurally
    /// equivalent with equal types
    pub fn digest(&self) -> String {
        self.to_string()
    }

    pub fn as_literal(&self) -> Option<&PolyValue> {
        match self {
            RexNode::Literal { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn is_null_literal(&self) -> bool {
        matches!(
            self,
            RexNode::Literal {
                value: PolyValue::Null,
                ..
            }
        )
    }

    fn is_bool_literal(&self, expected: bool) -> bool {
        matches!(
            self,
            RexNode::Literal {
                value: PolyValue::Boolean(b),
                ..
            } if *b == expected
        )
    }

    /// Whether the expression evaluates to TRUE for every input row
    pub fn is_always_true(&self) -> bool {
        match self {
            RexNode::Literal { .. } => self.is_bool_literal(true),
            RexNode::Call { op, operands, .. } => match op.kind {
                OperatorKind::And => operands.iter().all(RexNode::is_always_true),
                OperatorKind::Or => operands.iter().any(RexNode::is_always_true),
                OperatorKind::Not => operands[0].is_always_false(),
                OperatorKind::IsNotNull => !operands[0].ty().is_nullable(),
                _ => false,
            },
            _ => false,
        }
    }

    /// Whether the expression evaluates to FALSE for every input row
    pub fn is_always_false(&self) -> bool {
        match self {
            RexNode::Literal { .. } => self.is_bool_literal(false),
            RexNode::Call { op, operands, .. } => match op.kind {
                OperatorKind::Or => operands.iter().all(RexNode::is_always_false),
                OperatorKind::And => operands.iter().any(RexNode::is_always_false),
                OperatorKind::Not => operands[0].is_always_true(),
                OperatorKind::IsNull => !operands[0].ty().is_nullable(),
                _ => false,
            },
            _ => false,
        }
    }

    /// The set of input fields the expression references
    pub fn references(&self) -> BTreeSet<usize> {
        let mut refs = BTreeSet::new();
        self.visit(&mut |node| {
            if let RexNode::InputRef { index, .. } = node {
                refs.insert(*index);
            }
        });
        refs
    }

    /// Whether any sub-expression is a correlation variable
    pub fn contains_correlation(&self) -> bool {
        let mut found = false;
        self.visit(&mut |node| {
            if matches!(node, RexNode::CorrelVariable { .. }) {
                found = true;
            }
        });
        found
    }

    /// Pre-order traversal over the expression and all sub-expressions
    pub fn visit(&self, f: &mut impl FnMut(&RexNode)) {
        f(self);
        match self {
            RexNode::Call { operands, .. } => {
                for operand in operands {
                    operand.visit(f);
                }
            }
            RexNode::FieldAccess { expr, .. } => expr.visit(f),
            RexNode::Over { agg, .. } => {
                for arg in &agg.args {
                    arg.visit(f);
                }
            }
            _ => {}
        }
    }

    /// Bottom-up rewrite: children are rewritten first, then `f` may replace
    /// the node itself. `f` returning `None` keeps the node.
    pub fn rewrite(&self, f: &impl Fn(&RexNode) -> Option<RexNode>) -> RexNode {
        let rebuilt = match self {
            RexNode::Call { op, operands, ty } => RexNode::Call {
                op: op.clone(),
                operands: operands.iter().map(|o| o.rewrite(f)).collect(),
                ty: ty.clone(),
            },
            RexNode::FieldAccess { expr, field, ty } => RexNode::FieldAccess {
                expr: Box::new(expr.rewrite(f)),
                field: *field,
                ty: ty.clone(),
            },
            RexNode::Over {
                agg,
                partition_keys,
                order_keys,
                ty,
            } => RexNode::Over {
                agg: WindowAggregate {
                    kind: agg.kind,
                    args: agg.args.iter().map(|a| a.rewrite(f)).collect(),
                    distinct: agg.distinct,
                },
                partition_keys: partition_keys.clone(),
                order_keys: order_keys.clone(),
                ty: ty.clone(),
            },
            other => other.clone(),
        };
        f(&rebuilt).unwrap_or(rebuilt)
    }

    /// Replaces every input reference `$i` with `exprs[i]`. Used when a
    /// predicate is pushed through a projection.
    pub fn substitute_inputs(&self, exprs: &[RexNode]) -> RexNode {
        self.rewrite(&|node| match node {
            RexNode::InputRef { index, .. } => exprs.get(*index).cloned(),
            _ => None,
        })
    }

    /// Shifts every input reference at or above `start` by `delta`. Used
    /// when a predicate moves across a join boundary.
    pub fn shift_input_refs(&self, start: usize, delta: isize) -> RexNode {
        self.rewrite(&|node| match node {
            RexNode::InputRef { index, ty } if *index >= start => Some(RexNode::InputRef {
                index: (*index as isize + delta) as usize,
                ty: ty.clone(),
            }),
            _ => None,
        })
    }
}

/// Whether `exprs` is exactly the identity `[$0, $1, ..., $(n-1)]` over an
/// input with `input_field_count` fields
pub fn is_identity(exprs: &[RexNode], input_field_count: usize) -> bool {
    exprs.len() == input_field_count
        && exprs
            .iter()
            .enumerate()
            .all(|(i, e)| matches!(e, RexNode::InputRef { index, .. } if *index == i))
}

impl Display for RexNode {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            RexNode::Literal { value, .. } => write!(f, "{value}"),
            RexNode::InputRef { index, .. } => write!(f, "${index}"),
            RexNode::LocalRef { index, .. } => write!(f, "@{index}"),
            RexNode::Call { op, operands, ty } => {
                write!(f, "{}(", op.name)?;
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{operand}")?;
                }
                write!(f, ")")?;
                if op.kind == OperatorKind::Cast {
                    write!(f, ":{ty}")?;
                }
                Ok(())
            }
            RexNode::CorrelVariable { id, .. } => write!(f, "{id}"),
            RexNode::FieldAccess { expr, field, .. } => write!(f, "{expr}.${field}"),
            RexNode::Over {
                agg,
                partition_keys,
                order_keys,
                ..
            } => {
                write!(f, "{:?}(", agg.kind)?;
                for (i, arg) in agg.args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(
                    f,
                    ") OVER (partition={partition_keys:?}, order={order_keys:?})"
                )
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
    use std::sync::Arc;

    fn builder() -> RexBuilder {
        RexBuilder::new(Arc::new(standard_operator_table()), TypeSystem::default())
    }

    #[test]
    fn digest_is_structural() {
        let b = builder();
        let x = b
            .call(
                OperatorKind::GreaterThan,
                vec![
                    RexBuilder::input_ref(0, PolyType::integer()),
                    RexBuilder::literal_of(PolyValue::Integer(10)),
                ],
            )
            .unwrap();
        let y = b
            .call(
                OperatorKind::GreaterThan,
                vec![
                    RexBuilder::input_ref(0, PolyType::integer()),
                    RexBuilder::literal_of(PolyValue::Integer(10)),
                ],
            )
            .unwrap();
        assert_eq!(x, y);
        assert_eq!(x.digest(), ">($0, 10)");
    }

    #[test]
    fn always_true_analysis() {
        let b = builder();
        let t = RexBuilder::bool_literal(true);
        let f = RexBuilder::bool_literal(false);
        let and = b.call(OperatorKind::And, vec![t.clone(), t.clone()]).unwrap();
        assert!(and.is_always_true());
        let and = b.call(OperatorKind::And, vec![t.clone(), f.clone()]).unwrap();
        assert!(and.is_always_false());
        let not = b.call(OperatorKind::Not, vec![f]).unwrap();
        assert!(not.is_always_true());
        assert!(!t.is_always_false());
    }

    #[test]
    fn references_collects_input_refs() {
        let b = builder();
        let expr = b
            .call(
                OperatorKind::Plus,
                vec![
                    RexBuilder::input_ref(2, PolyType::integer()),
                    RexBuilder::input_ref(5, PolyType::integer()),
                ],
            )
            .unwrap();
        assert_eq!(expr.references().into_iter().collect::<Vec<_>>(), vec![2, 5]);
    }

    #[test]
    fn shift_input_refs_moves_join_predicates() {
        let b = builder();
        let expr = b
            .call(
                OperatorKind::Equals,
                vec![
                    RexBuilder::input_ref(1, PolyType::integer()),
                    RexBuilder::input_ref(4, PolyType::integer()),
                ],
            )
            .unwrap();
        let shifted = expr.shift_input_refs(3, -3);
        assert_eq!(shifted.digest(), "=($1, $1)");
    }
}
