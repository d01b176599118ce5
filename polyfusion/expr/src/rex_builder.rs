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

//! Checked construction of row expressions with return-type inference

use std::sync::Arc;

use polyfusion_common::error::Result;
use polyfusion_common::interval::IntervalQualifier;
use polyfusion_common::plan_err;
use polyfusion_common::types::{PolyType, TypeSystem};
use polyfusion_common::value::PolyValue;

use crate::operator::{OperatorKind, OperatorTable, ReturnTypeInference};
use crate::rex::{CorrelationId, RexNode};

/// Builds row expressions against an operator table, enforcing arity
/// predicates and running return-type inference on every call.
#[derive(Debug, Clone)]
pub struct RexBuilder {
    table: Arc<OperatorTable>,
    type_system: TypeSystem,
}

impl RexBuilder {
    pub fn new(table: Arc<OperatorTable>, type_system: TypeSystem) -> Self {
        Self { table, type_system }
    }

    pub fn operator_table(&self) -> &Arc<OperatorTable> {
        &self.table
    }

    pub fn type_system(&self) -> &TypeSystem {
        &self.type_system
    }

    pub fn literal(value: PolyValue, ty: PolyType) -> RexNode {
        RexNode::Literal { value, ty }
    }

    /// A literal typed by its natural value type
    pub fn literal_of(value: PolyValue) -> RexNode {
        let ty = match &value {
            PolyValue::Null => PolyType::null(),
            PolyValue::Boolean(_) => PolyType::boolean(),
            PolyValue::Integer(_) => PolyType::integer(),
            PolyValue::Float(_) => PolyType::double(),
            PolyValue::Decimal { unscaled, scale } => {
                let digits = unscaled.unsigned_abs().to_string().len() as i32;
                PolyType::decimal(digits.max(*scale as i32 + 1), *scale as i32)
            }
            PolyValue::Utf8(s) => PolyType::char(s.chars().count().max(1) as i32),
            PolyValue::Binary(b) => PolyType::binary(b.len().max(1) as i32),
            PolyValue::Date(_) => PolyType::date(),
            PolyValue::Time(_) => PolyType::time(0),
            PolyValue::Timestamp(_) => PolyType::timestamp(0),
            PolyValue::Interval(v) => {
                use polyfusion_common::interval::IntervalUnit::*;
                use polyfusion_common::ParserPos;
                use polyfusion_common::PRECISION_NOT_SPECIFIED as NP;
                let qualifier = if v.fields.len() == 2 {
                    IntervalQualifier::new(Year, Some(Month), NP, NP, ParserPos::ZERO)
                } else {
                    IntervalQualifier::new(Day, Some(Second), NP, NP, ParserPos::ZERO)
                }
                .expect("YEAR TO MONTH and DAY TO SECOND are valid qualifiers");
                PolyType::interval(qualifier)
            }
            PolyValue::Array(items) => {
                let component = items
                    .first()
                    .map(|v| Self::literal_of(v.clone()).ty().clone())
                    .unwrap_or_else(PolyType::any);
                PolyType::array(component)
            }
            PolyValue::Document(_) => PolyType::document(),
        };
        RexNode::Literal { value, ty }
    }

    pub fn bool_literal(b: bool) -> RexNode {
        Self::literal_of(PolyValue::Boolean(b))
    }

    pub fn null_literal(ty: PolyType) -> RexNode {
        RexNode::Literal {
            value: PolyValue::Null,
            ty: ty.with_nullability(true),
        }
    }

    pub fn input_ref(index: usize, ty: PolyType) -> RexNode {
        RexNode::InputRef { index, ty }
    }

    pub fn local_ref(index: usize, ty: PolyType) -> RexNode {
        RexNode::LocalRef { index, ty }
    }

    pub fn correl_variable(id: CorrelationId, ty: PolyType) -> RexNode {
        RexNode::CorrelVariable { id, ty }
    }

    pub fn field_access(expr: RexNode, field: usize) -> Result<RexNode> {
        let ty = expr.ty().field_type(field)?.clone();
        Ok(RexNode::FieldAccess {
            expr: Box::new(expr),
            field,
            ty,
        })
    }

    /// Builds a call, enforcing the operator's arity predicate and running
    /// its return-type inference
    pub fn call(&self, kind: OperatorKind, operands: Vec<RexNode>) -> Result<RexNode> {
        let op = self.table.lookup(kind)?;
        if !op.arity.accepts(operands.len()) {
            return plan_err!(
                "invalid number of arguments to {}: got {}, accepts {}..{}",
                op.name,
                operands.len(),
                op.arity.min,
                op.arity
                    .max
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "*".to_string())
            );
        }
        if op.return_type == ReturnTypeInference::Explicit {
            return plan_err!("operator {} requires an explicit type, use cast()", op.name);
        }
        let operand_types: Vec<PolyType> = operands.iter().map(|o| o.ty().clone()).collect();
        let ty = op.return_type.infer(op.name, &operand_types, None)?;
        Ok(RexNode::Call { op, operands, ty })
    }

    /// Builds a CAST to `ty`; a no-op when the operand already has the type
    pub fn cast(&self, operand: RexNode, ty: PolyType) -> Result<RexNode> {
        if operand.ty() == &ty {
            return Ok(operand);
        }
        let op = self.table.lookup(OperatorKind::Cast)?;
        Ok(RexNode::Call {
            op,
            operands: vec![operand],
            ty,
        })
    }

    /// Conjunction with flattening and constant elimination
    pub fn and(&self, exprs: Vec<RexNode>) -> Result<RexNode> {
        let mut flat = Vec::new();
        for e in exprs {
            match e {
                RexNode::Call { ref op, ref operands, .. }
                    if op.kind == OperatorKind::And =>
                {
                    flat.extend(operands.iter().cloned());
                }
                other => flat.push(other),
            }
        }
        if flat.iter().any(RexNode::is_always_false) {
            return Ok(Self::bool_literal(false));
        }
        flat.retain(|e| !e.is_always_true());
        match flat.len() {
            0 => Ok(Self::bool_literal(true)),
            1 => Ok(flat.pop().expect("non-empty")),
            _ => self.call(OperatorKind::And, flat),
        }
    }

    /// Disjunction with flattening and constant elimination
    pub fn or(&self, exprs: Vec<RexNode>) -> Result<RexNode> {
        let mut flat = Vec::new();
        for e in exprs {
            match e {
                RexNode::Call { ref op, ref operands, .. }
                    if op.kind == OperatorKind::Or =>
                {
                    flat.extend(operands.iter().cloned());
                }
                other => flat.push(other),
            }
        }
        if flat.iter().any(RexNode::is_always_true) {
            return Ok(Self::bool_literal(true));
        }
        flat.retain(|e| !e.is_always_false());
        match flat.len() {
            0 => Ok(Self::bool_literal(false)),
            1 => Ok(flat.pop().expect("non-empty")),
            _ => self.call(OperatorKind::Or, flat),
        }
    }

    pub fn not(&self, expr: RexNode) -> Result<RexNode> {
        self.call(OperatorKind::Not, vec![expr])
    }

    /// Validates an interval literal against its qualifier and builds the
    /// typed literal node
    pub fn interval_literal(
        &self,
        text: &str,
        qualifier: IntervalQualifier,
    ) -> Result<RexNode> {
        let value = qualifier.validate_literal(text, &self.type_system)?;
        Ok(RexNode::Literal {
            value: PolyValue::Interval(value),
            ty: PolyType::interval(qualifier),
        })
    }

    /// Splits a conjunction into its flat list of conjuncts
    pub fn conjunctions(expr: &RexNode) -> Vec<RexNode> {
        match expr {
            RexNode::Call { op, operands, .. } if op.kind == OperatorKind::And => operands
                .iter()
                .flat_map(Self::conjunctions)
                .collect(),
            other => vec![other.clone()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::standard_operator_table;
    use polyfusion_common::error::PolyFusionError;
    use polyfusion_common::interval::IntervalUnit;
    use polyfusion_common::ParserPos;
    use polyfusion_common::PRECISION_NOT_SPECIFIED;

    fn builder() -> RexBuilder {
        RexBuilder::new(Arc::new(standard_operator_table()), TypeSystem::default())
    }

    #[test]
    fn arity_violation_is_rejected() {
        let b = builder();
        let err = b
            .call(
                OperatorKind::Not,
                vec![
                    RexBuilder::bool_literal(true),
                    RexBuilder::bool_literal(false),
                ],
            )
            .unwrap_err();
        assert!(matches!(err, PolyFusionError::Plan(_)));
    }

    #[test]
    fn and_flattens_and_folds() {
        let b = builder();
        let cmp = b
            .call(
                OperatorKind::Equals,
                vec![
                    RexBuilder::input_ref(0, PolyType::integer()),
                    RexBuilder::literal_of(PolyValue::Integer(1)),
                ],
            )
            .unwrap();
        let inner = b
            .call(OperatorKind::And, vec![cmp.clone(), RexBuilder::bool_literal(true)])
            .unwrap();
        let and = b.and(vec![inner, RexBuilder::bool_literal(true)]).unwrap();
        assert_eq!(and, cmp);
        let and = b
            .and(vec![cmp, RexBuilder::bool_literal(false)])
            .unwrap();
        assert!(and.is_always_false());
    }

    #[test]
    fn interval_literal_is_validated() {
        let b = builder();
        let q = IntervalQualifier::new(
            IntervalUnit::Year,
            None,
            2,
            PRECISION_NOT_SPECIFIED,
            ParserPos::ZERO,
        )
        .unwrap();
        assert!(b.interval_literal("99", q.clone()).is_ok());
        let err = b.interval_literal("100", q).unwrap_err();
        assert!(matches!(err, PolyFusionError::Interval(_)));
    }

    #[test]
    fn cast_is_identity_on_same_type() {
        let b = builder();
        let expr = RexBuilder::input_ref(0, PolyType::integer());
        let cast = b.cast(expr.clone(), PolyType::integer()).unwrap();
        assert_eq!(cast, expr);
        let cast = b.cast(expr, PolyType::bigint()).unwrap();
        assert_eq!(cast.ty(), &PolyType::bigint());
    }
}
