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

//! Rule that folds constant row expressions at plan time

use polyfusion_common::error::Result;
use polyfusion_common::value::PolyValue;
use polyfusion_expr::rel::{RelId, RelKind};
use polyfusion_expr::rex::RexNode;
use polyfusion_expr::OperatorKind;

use crate::rule::{KindPredicate, ChildPolicy, OptRule, PlannerContext, RuleMatch, RulePattern};

/// Evaluates calls whose operands are all literals and replaces them with
/// the literal result. Three-valued logic applies to AND, OR and NOT; strict
/// operators fold a null operand to null.
#[derive(Debug, Default)]
pub struct ConstantFolding;

impl ConstantFolding {
    pub fn new() -> Self {
        Self {}
    }
}

/// Three-valued conjunction over optional booleans
fn and3(values: &[Option<bool>]) -> Option<bool> {
    if values.iter().any(|v| *v == Some(false)) {
        Some(false)
    } else if values.iter().any(|v| v.is_none()) {
        None
    } else {
        Some(true)
    }
}

fn or3(values: &[Option<bool>]) -> Option<bool> {
    if values.iter().any(|v| *v == Some(true)) {
        Some(true)
    } else if values.iter().any(|v| v.is_none()) {
        None
    } else {
        Some(false)
    }
}

fn to_bool3(value: &PolyValue) -> Option<Option<bool>> {
    match value {
        PolyValue::Null => Some(None),
        PolyValue::Boolean(b) => Some(Some(*b)),
        _ => None,
    }
}

fn bool_value(b: Option<bool>) -> PolyValue {
    match b {
        Some(b) => PolyValue::Boolean(b),
        None => PolyValue::Null,
    }
}

/// Evaluates a call over literal operand values; `None` means "cannot fold"
fn eval_call(kind: OperatorKind, args: &[&PolyValue]) -> Option<PolyValue> {
    use OperatorKind::*;
    match kind {
        And => {
            let bools: Vec<Option<bool>> =
                args.iter().map(|v| to_bool3(v)).collect::<Option<_>>()?;
            Some(bool_value(and3(&bools)))
        }
        Or => {
            let bools: Vec<Option<bool>> =
                args.iter().map(|v| to_bool3(v)).collect::<Option<_>>()?;
            Some(bool_value(or3(&bools)))
        }
        Not => {
            let b = to_bool3(args[0])?;
            Some(bool_value(b.map(|b| !b)))
        }
        IsNull => Some(PolyValue::Boolean(args[0].is_null())),
        IsNotNull => Some(PolyValue::Boolean(!args[0].is_null())),
        IsTrue => Some(PolyValue::Boolean(args[0].as_bool() == Some(true))),
        IsNotTrue => Some(PolyValue::Boolean(args[0].as_bool() != Some(true))),
        IsFalse => Some(PolyValue::Boolean(args[0].as_bool() == Some(false))),
        IsNotFalse => Some(PolyValue::Boolean(args[0].as_bool() != Some(false))),
        Equals | NotEquals | LessThan | LessThanOrEqual | GreaterThan
        | GreaterThanOrEqual => {
            if args.iter().any(|v| v.is_null()) {
                return Some(PolyValue::Null);
            }
            let ordering = match (args[0], args[1]) {
                (PolyValue::Integer(a), PolyValue::Integer(b)) => a.cmp(b),
                (PolyValue::Utf8(a), PolyValue::Utf8(b)) => a.cmp(b),
                (PolyValue::Boolean(a), PolyValue::Boolean(b)) => a.cmp(b),
                (PolyValue::Float(a), PolyValue::Float(b)) => a.cmp(b),
                (PolyValue::Date(a), PolyValue::Date(b)) => a.cmp(b),
                (PolyValue::Timestamp(a), PolyValue::Timestamp(b)) => a.cmp(b),
                _ => return None,
            };
            let result = match kind {
                Equals => ordering.is_eq(),
                NotEquals => !ordering.is_eq(),
                LessThan => ordering.is_lt(),
                LessThanOrEqual => ordering.is_le(),
                GreaterThan => ordering.is_gt(),
                GreaterThanOrEqual => ordering.is_ge(),
                _ => unreachable!(),
            };
            Some(PolyValue::Boolean(result))
        }
        Plus | Minus | Times => {
            if args.iter().any(|v| v.is_null()) {
                return Some(PolyValue::Null);
            }
            match (args[0], args[1]) {
                (PolyValue::Integer(a), PolyValue::Integer(b)) => {
                    let result = match kind {
                        Plus => a.checked_add(*b),
                        Minus => a.checked_sub(*b),
                        Times => a.checked_mul(*b),
                        _ => unreachable!(),
                    };
                    result.map(PolyValue::Integer)
                }
                (PolyValue::Float(a), PolyValue::Float(b)) => {
                    let result = match kind {
                        Plus => a.0 + b.0,
                        Minus => a.0 - b.0,
                        Times => a.0 * b.0,
                        _ => unreachable!(),
                    };
                    Some(PolyValue::float(result))
                }
                _ => None,
            }
        }
        Divide => {
            if args.iter().any(|v| v.is_null()) {
                return Some(PolyValue::Null);
            }
            match (args[0], args[1]) {
                // integer division by zero stays in the plan and fails at
                // run time, matching backend behavior
                (PolyValue::Integer(_), PolyValue::Integer(0)) => None,
                (PolyValue::Integer(a), PolyValue::Integer(b)) => {
                    Some(PolyValue::Integer(a / b))
                }
                (PolyValue::Float(a), PolyValue::Float(b)) => {
                    Some(PolyValue::float(a.0 / b.0))
                }
                _ => None,
            }
        }
        UnaryMinus => match args[0] {
            PolyValue::Null => Some(PolyValue::Null),
            PolyValue::Integer(a) => a.checked_neg().map(PolyValue::Integer),
            PolyValue::Float(a) => Some(PolyValue::float(-a.0)),
            _ => None,
        },
        Concat => {
            if args.iter().any(|v| v.is_null()) {
                return Some(PolyValue::Null);
            }
            match (args[0], args[1]) {
                (PolyValue::Utf8(a), PolyValue::Utf8(b)) => {
                    Some(PolyValue::Utf8(format!("{a}{b}")))
                }
                _ => None,
            }
        }
        _ => None,
    }
}

/// Folds constant sub-expressions bottom-up; `None` when nothing changed
pub fn fold(expr: &RexNode) -> Option<RexNode> {
    let folded = expr.rewrite(&|node| {
        let RexNode::Call { op, operands, ty } = node else {
            return None;
        };
        // absorption first: AND with a FALSE operand is FALSE, OR with a
        // TRUE operand is TRUE; neutral literals drop out
        if matches!(op.kind, OperatorKind::And | OperatorKind::Or) {
            let neutral = op.kind == OperatorKind::And;
            let absorbing = operands.iter().any(|o| {
                o.as_literal().map_or(false, |v| v.as_bool() == Some(!neutral))
            });
            if absorbing {
                return Some(RexNode::Literal {
                    value: PolyValue::Boolean(!neutral),
                    ty: ty.clone(),
                });
            }
            let kept: Vec<RexNode> = operands
                .iter()
                .filter(|o| {
                    o.as_literal().map_or(true, |v| v.as_bool() != Some(neutral))
                })
                .cloned()
                .collect();
            if kept.len() < operands.len() {
                return Some(match kept.len() {
                    0 => RexNode::Literal {
                        value: PolyValue::Boolean(neutral),
                        ty: ty.clone(),
                    },
                    1 => kept.into_iter().next().expect("one operand"),
                    _ => RexNode::Call {
                        op: op.clone(),
                        operands: kept,
                        ty: ty.clone(),
                    },
                });
            }
        }
        let values: Vec<&PolyValue> =
            operands.iter().filter_map(|o| o.as_literal()).collect();
        if values.len() != operands.len() {
            return None;
        }
        eval_call(op.kind, &values).map(|value| RexNode::Literal {
            value,
            ty: ty.clone(),
        })
    });
    if folded == *expr {
        None
    } else {
        Some(folded)
    }
}

impl OptRule for ConstantFolding {
    fn name(&self) -> &str {
        "constant_folding"
    }

    fn pattern(&self) -> RulePattern {
        RulePattern {
            predicate: KindPredicate::Any,
            children: ChildPolicy::Any,
        }
    }

    fn apply(&self, mat: &RuleMatch, ctx: &mut PlannerContext) -> Result<Option<RelId>> {
        let id = mat.root();
        let folded_kind = match ctx.graph.kind(id) {
            RelKind::Filter { condition } => fold(condition)
                .map(|condition| RelKind::Filter { condition }),
            RelKind::Join {
                join_type,
                condition,
            } => fold(condition).map(|condition| RelKind::Join {
                join_type: *join_type,
                condition,
            }),
            RelKind::Project { exprs, field_names } => {
                let folded: Vec<Option<RexNode>> = exprs.iter().map(fold).collect();
                if folded.iter().all(|f| f.is_none()) {
                    None
                } else {
                    Some(RelKind::Project {
                        exprs: exprs
                            .iter()
                            .zip(folded)
                            .map(|(orig, f)| f.unwrap_or_else(|| orig.clone()))
                            .collect(),
                        field_names: field_names.clone(),
                    })
                }
            }
            _ => None,
        };
        let Some(kind) = folded_kind else {
            return Ok(None);
        };
        let inputs = ctx.graph.inputs(id).to_vec();
        let traits = ctx.graph.traits(id).clone();
        Ok(Some(ctx.graph.add(kind, inputs, traits)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{emp, optimize_with, rex};
    use polyfusion_expr::{RelBuilder, RexBuilder};
    use polyfusion_common::types::PolyType;
    use std::sync::Arc;

    #[test]
    fn tri_valued_and() {
        let b = rex();
        let null = RexBuilder::null_literal(PolyType::boolean());
        let and = b
            .call(
                OperatorKind::And,
                vec![RexBuilder::bool_literal(true), null.clone()],
            )
            .unwrap();
        assert_eq!(
            fold(&and).unwrap().as_literal(),
            Some(&PolyValue::Null)
        );
        let and = b
            .call(OperatorKind::And, vec![RexBuilder::bool_literal(false), null])
            .unwrap();
        assert_eq!(
            fold(&and).unwrap().as_literal(),
            Some(&PolyValue::Boolean(false))
        );
    }

    #[test]
    fn arithmetic_folds_bottom_up() {
        let b = rex();
        let two_plus_three = b
            .call(
                OperatorKind::Plus,
                vec![
                    RexBuilder::literal_of(PolyValue::Integer(2)),
                    RexBuilder::literal_of(PolyValue::Integer(3)),
                ],
            )
            .unwrap();
        let cmp = b
            .call(
                OperatorKind::LessThan,
                vec![two_plus_three, RexBuilder::literal_of(PolyValue::Integer(10))],
            )
            .unwrap();
        assert_eq!(
            fold(&cmp).unwrap().as_literal(),
            Some(&PolyValue::Boolean(true))
        );
    }

    #[test]
    fn non_constant_operands_stay() {
        let b = rex();
        let cmp = b
            .call(
                OperatorKind::Equals,
                vec![
                    RexBuilder::input_ref(0, PolyType::integer()),
                    RexBuilder::literal_of(PolyValue::Integer(1)),
                ],
            )
            .unwrap();
        assert!(fold(&cmp).is_none());
    }

    #[test]
    fn filter_condition_folds_in_plan() {
        let mut graph = polyfusion_expr::RelGraph::new();
        let b = rex();
        let cond = b
            .call(
                OperatorKind::GreaterThan,
                vec![
                    RexBuilder::literal_of(PolyValue::Integer(5)),
                    RexBuilder::literal_of(PolyValue::Integer(3)),
                ],
            )
            .unwrap();
        let root = RelBuilder::new(&mut graph, b)
            .scan(emp())
            .unwrap()
            .filter(cond)
            .unwrap()
            .build()
            .unwrap();
        let optimized =
            optimize_with(vec![Arc::new(ConstantFolding::new())], &mut graph, root);
        let expected = "Filter: TRUE\
        \n  Scan: public.emp";
        assert_eq!(graph.explain(optimized), expected);
    }

    #[test]
    fn division_by_zero_is_not_folded() {
        let b = rex();
        let div = b
            .call(
                OperatorKind::Divide,
                vec![
                    RexBuilder::literal_of(PolyValue::Integer(1)),
                    RexBuilder::literal_of(PolyValue::Integer(0)),
                ],
            )
            .unwrap();
        assert!(fold(&div).is_none());
    }
}
