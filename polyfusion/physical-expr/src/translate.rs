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

//! The row-expression translator: lowers scalar trees into [PhysExpr] under
//! an explicit null-as policy, honoring each operator's null semantics

use std::collections::HashMap;

use log::trace;

use polyfusion_common::error::Result;
use polyfusion_common::types::PolyType;
use polyfusion_common::value::PolyValue;
use polyfusion_common::{plan_err, type_err};
use polyfusion_expr::rex::RexNode;
use polyfusion_expr::type_coercion::least_restrictive;
use polyfusion_expr::{NullPolicy, OperatorKind, OperatorTable};

use crate::phys::PhysExpr;

/// The caller's declared interpretation of null while translating an
/// expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NullAs {
    /// Nulls flow through unchanged
    Null,
    /// Null is impossible; no guards are needed
    NotPossible,
    /// A null result is coerced to FALSE
    False,
    /// A null result is coerced to TRUE
    True,
    /// The caller wants "is the result null"
    IsNull,
    /// The caller wants "is the result not null"
    IsNotNull,
}

/// Registry mapping each operator to its implementation's null policy.
/// Built once from the operator table; adapters may override entries.
#[derive(Debug, Default)]
pub struct RexImpTable {
    policies: HashMap<OperatorKind, NullPolicy>,
}

impl RexImpTable {
    pub fn from_operator_table(table: &OperatorTable) -> Self {
        let mut policies = HashMap::new();
        for op in table.operators() {
            policies.insert(op.kind, op.null_policy);
        }
        Self { policies }
    }

    pub fn register(&mut self, kind: OperatorKind, policy: NullPolicy) {
        self.policies.insert(kind, policy);
    }

    pub fn policy(&self, kind: OperatorKind) -> Result<NullPolicy> {
        match self.policies.get(&kind) {
            Some(policy) => Ok(*policy),
            None => plan_err!("no implementor registered for operator {kind:?}"),
        }
    }
}

/// Conjunction of already-coerced booleans, with constant absorption
pub fn fold_and(exprs: Vec<PhysExpr>) -> PhysExpr {
    if exprs.iter().any(PhysExpr::is_false_constant) {
        return PhysExpr::FALSE;
    }
    let mut kept: Vec<PhysExpr> = exprs
        .into_iter()
        .filter(|e| !e.is_true_constant())
        .collect();
    match kept.len() {
        0 => PhysExpr::TRUE,
        1 => kept.pop().expect("non-empty"),
        _ => PhysExpr::AndAlso(kept),
    }
}

/// Disjunction of already-coerced booleans, with constant absorption
pub fn fold_or(exprs: Vec<PhysExpr>) -> PhysExpr {
    if exprs.iter().any(PhysExpr::is_true_constant) {
        return PhysExpr::TRUE;
    }
    let mut kept: Vec<PhysExpr> = exprs
        .into_iter()
        .filter(|e| !e.is_false_constant())
        .collect();
    match kept.len() {
        0 => PhysExpr::FALSE,
        1 => kept.pop().expect("non-empty"),
        _ => PhysExpr::OrElse(kept),
    }
}

fn conditional(cond: PhysExpr, then: PhysExpr, otherwise: PhysExpr) -> PhysExpr {
    if cond.is_true_constant() {
        then
    } else if cond.is_false_constant() {
        otherwise
    } else {
        PhysExpr::Conditional {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }
}

fn negate(expr: PhysExpr) -> PhysExpr {
    if expr.is_true_constant() {
        PhysExpr::FALSE
    } else if expr.is_false_constant() {
        PhysExpr::TRUE
    } else {
        PhysExpr::Not(Box::new(expr))
    }
}

/// Applies the null-as coercion table to a produced value. `never_null`
/// marks primitive-flavored results, which skip runtime checks.
fn coerce(expr: PhysExpr, never_null: bool, null_as: NullAs) -> PhysExpr {
    let never_null = never_null || expr.is_never_null();
    match null_as {
        NullAs::Null | NullAs::NotPossible => expr,
        NullAs::False => {
            if never_null {
                expr
            } else {
                PhysExpr::IsTrue(Box::new(expr))
            }
        }
        NullAs::True => {
            if never_null {
                expr
            } else {
                PhysExpr::IsNotFalse(Box::new(expr))
            }
        }
        NullAs::IsNull => {
            if never_null {
                PhysExpr::FALSE
            } else {
                PhysExpr::IsNullTest(Box::new(expr))
            }
        }
        NullAs::IsNotNull => {
            if never_null {
                PhysExpr::TRUE
            } else {
                PhysExpr::IsNotNullTest(Box::new(expr))
            }
        }
    }
}

/// Operators whose implementation requires identical operand types
fn needs_harmonization(kind: OperatorKind) -> bool {
    kind.is_comparison()
        || matches!(
            kind,
            OperatorKind::Plus
                | OperatorKind::Minus
                | OperatorKind::Times
                | OperatorKind::Divide
                | OperatorKind::Mod
                | OperatorKind::Concat
                | OperatorKind::IsDistinctFrom
                | OperatorKind::IsNotDistinctFrom
        )
}

/// Translates row expressions against an implementor registry.
pub struct RexTranslator<'a> {
    imp_table: &'a RexImpTable,
}

impl<'a> RexTranslator<'a> {
    pub fn new(imp_table: &'a RexImpTable) -> Self {
        Self { imp_table }
    }

    /// Lowers `rex` under the ambient `null_as` policy.
    pub fn translate(&self, rex: &RexNode, null_as: NullAs) -> Result<PhysExpr> {
        trace!("translate {rex} as {null_as:?}");
        match rex {
            RexNode::Literal { value, .. } => Ok(self.translate_literal(value, null_as)),
            RexNode::InputRef { index, ty } | RexNode::LocalRef { index, ty } => {
                Ok(coerce(PhysExpr::Input(*index), !ty.is_nullable(), null_as))
            }
            RexNode::CorrelVariable { id, .. } => {
                plan_err!("correlation variable {id} must be rebound before lowering")
            }
            RexNode::FieldAccess { .. } => {
                plan_err!("field access must be flattened before lowering: {rex}")
            }
            RexNode::Over { .. } => {
                plan_err!("windowed aggregate {rex} is not a scalar expression")
            }
            RexNode::Call { op, operands, ty } => {
                self.translate_call(op.kind, operands, ty, null_as)
            }
        }
    }

    fn translate_literal(&self, value: &PolyValue, null_as: NullAs) -> PhysExpr {
        if value.is_null() {
            return match null_as {
                NullAs::Null | NullAs::NotPossible => PhysExpr::NULL,
                NullAs::False | NullAs::IsNotNull => PhysExpr::FALSE,
                NullAs::True | NullAs::IsNull => PhysExpr::TRUE,
            };
        }
        coerce(PhysExpr::Constant(value.clone()), true, null_as)
    }

    fn translate_call(
        &self,
        kind: OperatorKind,
        operands: &[RexNode],
        ty: &PolyType,
        null_as: NullAs,
    ) -> Result<PhysExpr> {
        match kind {
            OperatorKind::And => return self.translate_and(operands, null_as),
            OperatorKind::Or => return self.translate_or(operands, null_as),
            OperatorKind::Not => return self.translate_not(&operands[0], null_as),
            OperatorKind::IsNull => {
                let expr = if operands[0].ty().is_nullable() {
                    PhysExpr::IsNullTest(Box::new(self.translate(&operands[0], NullAs::Null)?))
                } else {
                    PhysExpr::FALSE
                };
                return Ok(coerce(expr, true, null_as));
            }
            OperatorKind::IsNotNull => {
                let expr = if operands[0].ty().is_nullable() {
                    PhysExpr::IsNotNullTest(Box::new(
                        self.translate(&operands[0], NullAs::Null)?,
                    ))
                } else {
                    PhysExpr::TRUE
                };
                return Ok(coerce(expr, true, null_as));
            }
            OperatorKind::IsTrue => {
                let expr = self.translate(&operands[0], NullAs::False)?;
                return Ok(coerce(expr, true, null_as));
            }
            OperatorKind::IsNotFalse => {
                let expr = self.translate(&operands[0], NullAs::True)?;
                return Ok(coerce(expr, true, null_as));
            }
            OperatorKind::IsFalse => {
                let expr = negate(self.translate(&operands[0], NullAs::True)?);
                return Ok(coerce(expr, true, null_as));
            }
            OperatorKind::IsNotTrue => {
                let expr = negate(self.translate(&operands[0], NullAs::False)?);
                return Ok(coerce(expr, true, null_as));
            }
            OperatorKind::Cast => {
                let inner = self.translate(&operands[0], NullAs::Null)?;
                let expr = PhysExpr::Cast {
                    to: ty.clone(),
                    expr: Box::new(inner),
                };
                return Ok(coerce(expr, !ty.is_nullable(), null_as));
            }
            _ => {}
        }

        match self.imp_table.policy(kind)? {
            NullPolicy::Strict | NullPolicy::Any | NullPolicy::SemiStrict => {
                self.translate_strict(kind, operands, ty, null_as)
            }
            NullPolicy::None => self.translate_none(kind, operands, ty, null_as),
            // the logical operators were dispatched above; a policy override
            // pointing another operator here is a registration bug
            NullPolicy::And | NullPolicy::Or | NullPolicy::Not => {
                plan_err!("operator {kind:?} cannot use a logical null policy")
            }
        }
    }

    /// STRICT (and ANY / SEMI_STRICT): null in, null out. Under the IS_NULL
    /// family the call itself is never evaluated; nullness is a pure
    /// function of the operands.
    fn translate_strict(
        &self,
        kind: OperatorKind,
        operands: &[RexNode],
        ty: &PolyType,
        null_as: NullAs,
    ) -> Result<PhysExpr> {
        match null_as {
            NullAs::IsNotNull => {
                let parts = operands
                    .iter()
                    .map(|o| self.translate(o, NullAs::IsNotNull))
                    .collect::<Result<Vec<_>>>()?;
                Ok(fold_and(parts))
            }
            NullAs::IsNull => {
                let parts = operands
                    .iter()
                    .map(|o| self.translate(o, NullAs::IsNull))
                    .collect::<Result<Vec<_>>>()?;
                Ok(fold_or(parts))
            }
            other => {
                let args = self.harmonized_args(kind, operands)?;
                let call = PhysExpr::CallPrimitive { kind, args };
                Ok(coerce(call, !ty.is_nullable(), other))
            }
        }
    }

    /// NONE: operands translate normally and the call handles its own nulls
    fn translate_none(
        &self,
        kind: OperatorKind,
        operands: &[RexNode],
        ty: &PolyType,
        null_as: NullAs,
    ) -> Result<PhysExpr> {
        let args = operands
            .iter()
            .map(|o| self.translate(o, NullAs::Null))
            .collect::<Result<Vec<_>>>()?;
        let call = PhysExpr::CallPrimitive { kind, args };
        Ok(coerce(call, !ty.is_nullable(), null_as))
    }

    /// Harmonizes operands to the least-restrictive common type when the
    /// operator requires identical operand types
    fn harmonized_args(
        &self,
        kind: OperatorKind,
        operands: &[RexNode],
    ) -> Result<Vec<PhysExpr>> {
        let translated = operands
            .iter()
            .map(|o| self.translate(o, NullAs::Null))
            .collect::<Result<Vec<_>>>()?;
        if !needs_harmonization(kind) || operands.len() < 2 {
            return Ok(translated);
        }
        let types: Vec<PolyType> = operands.iter().map(|o| o.ty().clone()).collect();
        let same_family = types
            .windows(2)
            .all(|w| w[0].family() == w[1].family());
        if same_family {
            return Ok(translated);
        }
        let common = match least_restrictive(&types) {
            Some(common) => common,
            None => {
                return type_err!(
                    "no common type harmonizing operands of {kind:?}: {}",
                    types
                        .iter()
                        .map(|t| t.to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            }
        };
        Ok(translated
            .into_iter()
            .zip(&types)
            .map(|(expr, ty)| {
                if ty.family() == common.family() {
                    expr
                } else {
                    PhysExpr::Cast {
                        to: common.with_nullability(ty.is_nullable()),
                        expr: Box::new(expr),
                    }
                }
            })
            .collect())
    }

    /// Three-valued conjunction, exactly per the policy table
    fn translate_and(&self, operands: &[RexNode], null_as: NullAs) -> Result<PhysExpr> {
        match null_as {
            NullAs::True | NullAs::False | NullAs::NotPossible => {
                let parts = operands
                    .iter()
                    .map(|o| self.translate(o, null_as))
                    .collect::<Result<Vec<_>>>()?;
                Ok(fold_and(parts))
            }
            NullAs::Null | NullAs::IsNull | NullAs::IsNotNull => {
                let not_false = operands
                    .iter()
                    .map(|o| self.translate(o, NullAs::True))
                    .collect::<Result<Vec<_>>>()?;
                let has_false = negate(fold_and(not_false));
                let nulls = operands
                    .iter()
                    .map(|o| self.translate(o, NullAs::IsNull))
                    .collect::<Result<Vec<_>>>()?;
                let has_null = fold_or(nulls);
                let value = conditional(
                    has_false,
                    PhysExpr::FALSE,
                    conditional(has_null, PhysExpr::NULL, PhysExpr::TRUE),
                );
                Ok(match null_as {
                    NullAs::Null => value,
                    NullAs::IsNull => coerce(value, false, NullAs::IsNull),
                    _ => coerce(value, false, NullAs::IsNotNull),
                })
            }
        }
    }

    /// Three-valued disjunction: symmetric to AND with TRUE and FALSE
    /// exchanged
    fn translate_or(&self, operands: &[RexNode], null_as: NullAs) -> Result<PhysExpr> {
        match null_as {
            NullAs::True | NullAs::False | NullAs::NotPossible => {
                let parts = operands
                    .iter()
                    .map(|o| self.translate(o, null_as))
                    .collect::<Result<Vec<_>>>()?;
                Ok(fold_or(parts))
            }
            NullAs::Null | NullAs::IsNull | NullAs::IsNotNull => {
                let trues = operands
                    .iter()
                    .map(|o| self.translate(o, NullAs::False))
                    .collect::<Result<Vec<_>>>()?;
                let has_true = fold_or(trues);
                let nulls = operands
                    .iter()
                    .map(|o| self.translate(o, NullAs::IsNull))
                    .collect::<Result<Vec<_>>>()?;
                let has_null = fold_or(nulls);
                let value = conditional(
                    has_true,
                    PhysExpr::TRUE,
                    conditional(has_null, PhysExpr::NULL, PhysExpr::FALSE),
                );
                Ok(match null_as {
                    NullAs::Null => value,
                    NullAs::IsNull => coerce(value, false, NullAs::IsNull),
                    _ => coerce(value, false, NullAs::IsNotNull),
                })
            }
        }
    }

    /// Negation flips the child's policy; under NULL the ternary negation
    /// helper carries nulls through
    fn translate_not(&self, operand: &RexNode, null_as: NullAs) -> Result<PhysExpr> {
        match null_as {
            NullAs::True => Ok(negate(self.translate(operand, NullAs::False)?)),
            NullAs::False => Ok(negate(self.translate(operand, NullAs::True)?)),
            NullAs::NotPossible => {
                Ok(negate(self.translate(operand, NullAs::NotPossible)?))
            }
            NullAs::Null => Ok(PhysExpr::Not(Box::new(
                self.translate(operand, NullAs::Null)?,
            ))),
            NullAs::IsNull => self.translate(operand, NullAs::IsNull),
            NullAs::IsNotNull => self.translate(operand, NullAs::IsNotNull),
        }
    }
}
