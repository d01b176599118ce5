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

//! The operator table: every operator usable in row expressions, with its
//! syntax, arity, return-type inference and null semantics as data

use std::sync::Arc;

use indexmap::IndexMap;

use polyfusion_common::error::Result;
use polyfusion_common::types::PolyType;
use polyfusion_common::{internal_err, plan_err, type_err};

use crate::type_coercion::least_restrictive;

/// Discriminant of an operator. Per-kind behavior lives in the descriptor
/// tables, not in code attached to the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperatorKind {
    // comparison
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    IsDistinctFrom,
    IsNotDistinctFrom,
    // arithmetic
    Plus,
    Minus,
    Times,
    Divide,
    Mod,
    UnaryMinus,
    // logical
    And,
    Or,
    Not,
    // null and truth tests
    IsNull,
    IsNotNull,
    IsTrue,
    IsNotTrue,
    IsFalse,
    IsNotFalse,
    // other scalar operators
    Case,
    Cast,
    Like,
    Concat,
    Item,
    Coalesce,
    Distance,
    // aggregate functions
    Min,
    Max,
    Sum,
    Count,
    Avg,
}

impl OperatorKind {
    pub fn is_aggregate(&self) -> bool {
        matches!(
            self,
            OperatorKind::Min
                | OperatorKind::Max
                | OperatorKind::Sum
                | OperatorKind::Count
                | OperatorKind::Avg
        )
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            OperatorKind::Equals
                | OperatorKind::NotEquals
                | OperatorKind::LessThan
                | OperatorKind::LessThanOrEqual
                | OperatorKind::GreaterThan
                | OperatorKind::GreaterThanOrEqual
        )
    }
}

/// How the operator appears in query text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Syntax {
    Function,
    Binary,
    Prefix,
    Postfix,
    /// CASE, CAST and other operators with bespoke syntax
    Special,
}

/// Operand count predicate of an operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperandCountRange {
    pub min: usize,
    pub max: Option<usize>,
}

impl OperandCountRange {
    pub fn of(n: usize) -> Self {
        Self {
            min: n,
            max: Some(n),
        }
    }

    pub fn between(min: usize, max: usize) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    pub fn variadic(min: usize) -> Self {
        Self { min, max: None }
    }

    pub fn accepts(&self, n: usize) -> bool {
        n >= self.min && self.max.map_or(true, |max| n <= max)
    }
}

/// Null semantics an implementor declares for an operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NullPolicy {
    /// Null in, null out
    Strict,
    /// Strict, but skip null guards on operands already known non-null
    Any,
    /// Three-valued conjunction
    And,
    /// Three-valued disjunction
    Or,
    /// Ternary negation
    Not,
    /// No null handling; operands translate as-is
    None,
    /// Strict propagation, may short-circuit on statically non-null domains
    SemiStrict,
}

/// Declarative return-type inference evaluated against operand types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnTypeInference {
    /// BOOLEAN, nullable iff any operand is nullable
    Boolean,
    /// BOOLEAN NOT NULL regardless of operands
    BooleanNotNull,
    /// Type of the first operand
    FirstArg,
    /// Type of the first operand, nullable iff any operand is nullable
    FirstArgNullable,
    /// Least-restrictive common type of all operands
    LeastRestrictive,
    /// Least-restrictive common type of the CASE value operands
    CaseValue,
    /// BIGINT NOT NULL (COUNT)
    BigIntNotNull,
    /// DOUBLE, nullable iff any operand is nullable
    Double,
    /// Component type of the first (collection) operand, nullable
    Component,
    /// The call site supplies the type explicitly (CAST)
    Explicit,
}

impl ReturnTypeInference {
    /// Infers the type of a call from its operand types. `explicit` is
    /// consulted only by [ReturnTypeInference::Explicit].
    pub fn infer(
        &self,
        name: &str,
        operands: &[PolyType],
        explicit: Option<&PolyType>,
    ) -> Result<PolyType> {
        let any_nullable = operands.iter().any(|t| t.is_nullable());
        match self {
            ReturnTypeInference::Boolean => {
                Ok(PolyType::boolean().with_nullability(any_nullable))
            }
            ReturnTypeInference::BooleanNotNull => Ok(PolyType::boolean()),
            ReturnTypeInference::FirstArg => match operands.first() {
                Some(t) => Ok(t.clone()),
                None => internal_err!("operator {name} with no operands"),
            },
            ReturnTypeInference::FirstArgNullable => match operands.first() {
                Some(t) => Ok(t.with_nullability(any_nullable || t.is_nullable())),
                None => internal_err!("operator {name} with no operands"),
            },
            ReturnTypeInference::LeastRestrictive => {
                match least_restrictive(operands) {
                    Some(t) => Ok(t),
                    None => type_err!(
                        "no common type for operands of {name}: {}",
                        operands
                            .iter()
                            .map(|t| t.to_string())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                }
            }
            ReturnTypeInference::CaseValue => {
                // operands are [cond, value, cond, value, ..., else]
                let values: Vec<PolyType> = operands
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| i % 2 == 1 || *i + 1 == operands.len())
                    .map(|(_, t)| t.clone())
                    .collect();
                match least_restrictive(&values) {
                    Some(t) => Ok(t),
                    None => type_err!("no common type for CASE branches"),
                }
            }
            ReturnTypeInference::BigIntNotNull => Ok(PolyType::bigint()),
            ReturnTypeInference::Double => {
                Ok(PolyType::double().with_nullability(any_nullable))
            }
            ReturnTypeInference::Component => match operands.first() {
                Some(t) if t.family().is_collection() => match t.component() {
                    Some(c) => Ok(c.with_nullability(true)),
                    None => internal_err!("collection type {t} without component"),
                },
                Some(t) => type_err!("cannot index into non-collection type {t}"),
                None => internal_err!("operator {name} with no operands"),
            },
            ReturnTypeInference::Explicit => match explicit {
                Some(t) => Ok(t.clone()),
                None => internal_err!("operator {name} requires an explicit return type"),
            },
        }
    }
}

/// Descriptor of a single operator. All per-operator behavior the planner
/// needs is carried here as data.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Operator {
    pub name: &'static str,
    pub kind: OperatorKind,
    pub syntax: Syntax,
    pub arity: OperandCountRange,
    pub return_type: ReturnTypeInference,
    pub null_policy: NullPolicy,
}

pub type OperatorRef = Arc<Operator>;

/// Registry of every operator callable from a row expression, exposed to the
/// parser/AST layer by name and to the planner by kind. Immutable once
/// constructed; shared via `Arc` across concurrent queries.
#[derive(Debug, Default)]
pub struct OperatorTable {
    by_name: IndexMap<&'static str, OperatorRef>,
    by_kind: IndexMap<OperatorKind, OperatorRef>,
}

impl OperatorTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, op: Operator) -> Result<()> {
        if self.by_kind.contains_key(&op.kind) {
            return plan_err!("operator {:?} registered twice", op.kind);
        }
        let op = Arc::new(op);
        // several kinds may share a name (e.g. binary and unary minus),
        // the first registration wins the name lookup
        self.by_name.entry(op.name).or_insert_with(|| Arc::clone(&op));
        self.by_kind.insert(op.kind, op);
        Ok(())
    }

    pub fn lookup_name(&self, name: &str) -> Option<&OperatorRef> {
        self.by_name.get(name)
    }

    pub fn lookup(&self, kind: OperatorKind) -> Result<OperatorRef> {
        match self.by_kind.get(&kind) {
            Some(op) => Ok(Arc::clone(op)),
            None => plan_err!("operator {kind:?} is not registered"),
        }
    }

    pub fn operators(&self) -> impl Iterator<Item = &OperatorRef> {
        self.by_kind.values()
    }
}

/// Builds the standard operator table used by the core.
pub fn standard_operator_table() -> OperatorTable {
    use NullPolicy as P;
    use OperatorKind as K;
    use ReturnTypeInference as R;
    use Syntax as S;

    let mut table = OperatorTable::new();
    let mut def = |name, kind, syntax, arity, return_type, null_policy| {
        // kinds are unique by construction of this function
        table
            .register(Operator {
                name,
                kind,
                syntax,
                arity,
                return_type,
                null_policy,
            })
            .expect("standard operator registered twice");
    };

    let binary2 = OperandCountRange::of(2);
    def("=", K::Equals, S::Binary, binary2, R::Boolean, P::Strict);
    def("<>", K::NotEquals, S::Binary, binary2, R::Boolean, P::Strict);
    def("<", K::LessThan, S::Binary, binary2, R::Boolean, P::Strict);
    def("<=", K::LessThanOrEqual, S::Binary, binary2, R::Boolean, P::Strict);
    def(">", K::GreaterThan, S::Binary, binary2, R::Boolean, P::Strict);
    def(">=", K::GreaterThanOrEqual, S::Binary, binary2, R::Boolean, P::Strict);
    def("IS DISTINCT FROM", K::IsDistinctFrom, S::Binary, binary2, R::BooleanNotNull, P::None);
    def("IS NOT DISTINCT FROM", K::IsNotDistinctFrom, S::Binary, binary2, R::BooleanNotNull, P::None);

    def("+", K::Plus, S::Binary, binary2, R::LeastRestrictive, P::Strict);
    def("-", K::Minus, S::Binary, binary2, R::LeastRestrictive, P::Strict);
    def("*", K::Times, S::Binary, binary2, R::LeastRestrictive, P::Strict);
    def("/", K::Divide, S::Binary, binary2, R::LeastRestrictive, P::Strict);
    def("MOD", K::Mod, S::Function, binary2, R::LeastRestrictive, P::Strict);
    def("-", K::UnaryMinus, S::Prefix, OperandCountRange::of(1), R::FirstArg, P::Strict);

    def("AND", K::And, S::Binary, OperandCountRange::variadic(2), R::Boolean, P::And);
    def("OR", K::Or, S::Binary, OperandCountRange::variadic(2), R::Boolean, P::Or);
    def("NOT", K::Not, S::Prefix, OperandCountRange::of(1), R::Boolean, P::Not);

    let unary = OperandCountRange::of(1);
    def("IS NULL", K::IsNull, S::Postfix, unary, R::BooleanNotNull, P::None);
    def("IS NOT NULL", K::IsNotNull, S::Postfix, unary, R::BooleanNotNull, P::None);
    def("IS TRUE", K::IsTrue, S::Postfix, unary, R::BooleanNotNull, P::None);
    def("IS NOT TRUE", K::IsNotTrue, S::Postfix, unary, R::BooleanNotNull, P::None);
    def("IS FALSE", K::IsFalse, S::Postfix, unary, R::BooleanNotNull, P::None);
    def("IS NOT FALSE", K::IsNotFalse, S::Postfix, unary, R::BooleanNotNull, P::None);

    def("CASE", K::Case, S::Special, OperandCountRange::variadic(3), R::CaseValue, P::None);
    def("CAST", K::Cast, S::Special, unary, R::Explicit, P::Strict);
    def("LIKE", K::Like, S::Special, OperandCountRange::between(2, 3), R::Boolean, P::Strict);
    def("||", K::Concat, S::Binary, binary2, R::LeastRestrictive, P::Strict);
    def("ITEM", K::Item, S::Special, binary2, R::Component, P::Strict);
    def("COALESCE", K::Coalesce, S::Function, OperandCountRange::variadic(1), R::LeastRestrictive, P::None);
    def("DISTANCE", K::Distance, S::Function, OperandCountRange::between(3, 4), R::Double, P::Strict);

    def("MIN", K::Min, S::Function, unary, R::FirstArgNullable, P::Strict);
    def("MAX", K::Max, S::Function, unary, R::FirstArgNullable, P::Strict);
    def("SUM", K::Sum, S::Function, unary, R::FirstArgNullable, P::Strict);
    def("COUNT", K::Count, S::Function, OperandCountRange::variadic(0), R::BigIntNotNull, P::None);
    def("AVG", K::Avg, S::Function, unary, R::Double, P::Strict);

    table
}
