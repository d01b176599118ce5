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

//! The backend-agnostic expression tree produced by the row-expression
//! translator and consumed by the executor or a push-down emitter

use std::fmt::{self, Display, Formatter};

use polyfusion_common::types::PolyType;
use polyfusion_common::value::PolyValue;
use polyfusion_expr::OperatorKind;

/// A lowered scalar expression with explicit null handling.
///
/// `CallPrimitive` is strict: a null argument yields a null result. All
/// explicit null semantics are expressed through the surrounding test,
/// fold and conditional nodes the translator emits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PhysExpr {
    Constant(PolyValue),
    Input(usize),
    CallPrimitive {
        kind: OperatorKind,
        args: Vec<PhysExpr>,
    },
    /// `x IS TRUE`: boxed bool to unboxed, null becomes false
    IsTrue(Box<PhysExpr>),
    /// `x IS NOT FALSE`: boxed bool to unboxed, null becomes true
    IsNotFalse(Box<PhysExpr>),
    /// `x == null`
    IsNullTest(Box<PhysExpr>),
    /// `x != null`
    IsNotNullTest(Box<PhysExpr>),
    /// Ternary negation
    Not(Box<PhysExpr>),
    /// Conjunction of already-coerced booleans
    AndAlso(Vec<PhysExpr>),
    /// Disjunction of already-coerced booleans
    OrElse(Vec<PhysExpr>),
    Conditional {
        cond: Box<PhysExpr>,
        then: Box<PhysExpr>,
        otherwise: Box<PhysExpr>,
    },
    Cast {
        to: PolyType,
        expr: Box<PhysExpr>,
    },
}

impl PhysExpr {
    pub const TRUE: PhysExpr = PhysExpr::Constant(PolyValue::Boolean(true));
    pub const FALSE: PhysExpr = PhysExpr::Constant(PolyValue::Boolean(false));
    pub const NULL: PhysExpr = PhysExpr::Constant(PolyValue::Null);

    pub fn is_true_constant(&self) -> bool {
        matches!(self, PhysExpr::Constant(PolyValue::Boolean(true)))
    }

    pub fn is_false_constant(&self) -> bool {
        matches!(self, PhysExpr::Constant(PolyValue::Boolean(false)))
    }

    /// Whether the expression can never evaluate to null
    pub fn is_never_null(&self) -> bool {
        match self {
            PhysExpr::Constant(v) => !v.is_null(),
            PhysExpr::IsTrue(_)
            | PhysExpr::IsNotFalse(_)
            | PhysExpr::IsNullTest(_)
            | PhysExpr::IsNotNullTest(_)
            | PhysExpr::AndAlso(_)
            | PhysExpr::OrElse(_) => true,
            _ => false,
        }
    }
}

impl Display for PhysExpr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            PhysExpr::Constant(v) => write!(f, "{v}"),
            PhysExpr::Input(i) => write!(f, "${i}"),
            PhysExpr::CallPrimitive { kind, args } => {
                write!(f, "{kind:?}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            PhysExpr::IsTrue(e) => write!(f, "isTrue({e})"),
            PhysExpr::IsNotFalse(e) => write!(f, "isNotFalse({e})"),
            PhysExpr::IsNullTest(e) => write!(f, "isNull({e})"),
            PhysExpr::IsNotNullTest(e) => write!(f, "isNotNull({e})"),
            PhysExpr::Not(e) => write!(f, "not({e})"),
            PhysExpr::AndAlso(es) => {
                write!(f, "andAlso(")?;
                for (i, e) in es.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{e}")?;
                }
                write!(f, ")")
            }
            PhysExpr::OrElse(es) => {
                write!(f, "orElse(")?;
                for (i, e) in es.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{e}")?;
                }
                write!(f, ")")
            }
            PhysExpr::Conditional {
                cond,
                then,
                otherwise,
            } => write!(f, "if({cond}, {then}, {otherwise})"),
            PhysExpr::Cast { to, expr } => write!(f, "cast({expr} AS {to})"),
        }
    }
}
