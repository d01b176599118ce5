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

//! Row-at-a-time evaluator for lowered expressions, with three-valued logic

use regex::Regex;

use polyfusion_common::error::Result;
use polyfusion_common::types::{PolyType, PolyTypeFamily};
use polyfusion_common::value::PolyValue;
use polyfusion_common::{internal_err, type_err};
use polyfusion_expr::OperatorKind;

use crate::phys::PhysExpr;

fn as_bool3(value: &PolyValue) -> Option<bool> {
    value.as_bool()
}

/// Evaluates `expr` against a row of input values.
pub fn evaluate(expr: &PhysExpr, row: &[PolyValue]) -> Result<PolyValue> {
    match expr {
        PhysExpr::Constant(v) => Ok(v.clone()),
        PhysExpr::Input(i) => match row.get(*i) {
            Some(v) => Ok(v.clone()),
            None => internal_err!("input {i} out of range for row of {}", row.len()),
        },
        PhysExpr::CallPrimitive { kind, args } => {
            let values = args
                .iter()
                .map(|a| evaluate(a, row))
                .collect::<Result<Vec<_>>>()?;
            eval_primitive(*kind, &values)
        }
        PhysExpr::IsTrue(e) => Ok(PolyValue::Boolean(
            evaluate(e, row)?.as_bool() == Some(true),
        )),
        PhysExpr::IsNotFalse(e) => Ok(PolyValue::Boolean(
            evaluate(e, row)?.as_bool() != Some(false),
        )),
        PhysExpr::IsNullTest(e) => Ok(PolyValue::Boolean(evaluate(e, row)?.is_null())),
        PhysExpr::IsNotNullTest(e) => Ok(PolyValue::Boolean(!evaluate(e, row)?.is_null())),
        PhysExpr::Not(e) => {
            let v = evaluate(e, row)?;
            Ok(match as_bool3(&v) {
                Some(b) => PolyValue::Boolean(!b),
                None => PolyValue::Null,
            })
        }
        PhysExpr::AndAlso(es) => {
            let mut saw_null = false;
            for e in es {
                match as_bool3(&evaluate(e, row)?) {
                    Some(false) => return Ok(PolyValue::Boolean(false)),
                    Some(true) => {}
                    None => saw_null = true,
                }
            }
            Ok(if saw_null {
                PolyValue::Null
            } else {
                PolyValue::Boolean(true)
            })
        }
        PhysExpr::OrElse(es) => {
            let mut saw_null = false;
            for e in es {
                match as_bool3(&evaluate(e, row)?) {
                    Some(true) => return Ok(PolyValue::Boolean(true)),
                    Some(false) => {}
                    None => saw_null = true,
                }
            }
            Ok(if saw_null {
                PolyValue::Null
            } else {
                PolyValue::Boolean(false)
            })
        }
        PhysExpr::Conditional {
            cond,
            then,
            otherwise,
        } => {
            if evaluate(cond, row)?.as_bool() == Some(true) {
                evaluate(then, row)
            } else {
                evaluate(otherwise, row)
            }
        }
        PhysExpr::Cast { to, expr } => cast_value(evaluate(expr, row)?, to),
    }
}

/// Casts a value to the target type's family. Unrepresentable conversions
/// are a type error.
pub fn cast_value(value: PolyValue, to: &PolyType) -> Result<PolyValue> {
    use PolyTypeFamily::*;
    if value.is_null() {
        return Ok(PolyValue::Null);
    }
    let family = to.family();
    match (&value, family) {
        (PolyValue::Integer(_), TinyInt | SmallInt | Integer | BigInt) => Ok(value),
        (PolyValue::Integer(i), Real | Double) => Ok(PolyValue::float(*i as f64)),
        (PolyValue::Integer(i), Decimal) => Ok(PolyValue::Decimal {
            unscaled: i128::from(*i) * 10i128.pow(to.scale().max(0) as u32),
            scale: to.scale().max(0) as u32,
        }),
        (PolyValue::Integer(i), Char | Varchar) => Ok(PolyValue::Utf8(i.to_string())),
        (PolyValue::Float(_), Real | Double) => Ok(value),
        (PolyValue::Float(v), TinyInt | SmallInt | Integer | BigInt) => {
            Ok(PolyValue::Integer(v.0 as i64))
        }
        (PolyValue::Float(v), Char | Varchar) => Ok(PolyValue::Utf8(v.0.to_string())),
        (PolyValue::Decimal { unscaled, scale }, Real | Double) => Ok(PolyValue::float(
            *unscaled as f64 / 10f64.powi(*scale as i32),
        )),
        (PolyValue::Decimal { .. }, Decimal) => Ok(value),
        (PolyValue::Utf8(_), Char | Varchar) => Ok(value),
        (PolyValue::Utf8(s), TinyInt | SmallInt | Integer | BigInt) => {
            match s.trim().parse::<i64>() {
                Ok(i) => Ok(PolyValue::Integer(i)),
                Err(_) => type_err!("cannot cast '{s}' to {}", family.name()),
            }
        }
        (PolyValue::Utf8(s), Real | Double) => match s.trim().parse::<f64>() {
            Ok(v) => Ok(PolyValue::float(v)),
            Err(_) => type_err!("cannot cast '{s}' to {}", family.name()),
        },
        (PolyValue::Boolean(_), Boolean) => Ok(value),
        (PolyValue::Boolean(b), Char | Varchar) => {
            Ok(PolyValue::Utf8(if *b { "TRUE" } else { "FALSE" }.to_string()))
        }
        (PolyValue::Date(_), Date) | (PolyValue::Time(_), Time) => Ok(value),
        (PolyValue::Timestamp(_), Timestamp) => Ok(value),
        (PolyValue::Date(d), Timestamp) => {
            Ok(PolyValue::Timestamp(i64::from(*d) * 86_400_000))
        }
        _ if family == Any => Ok(value),
        _ => type_err!("cast from {} to {} is not representable", value.family().name(), family.name()),
    }
}

fn numeric_pair(a: &PolyValue, b: &PolyValue) -> Option<(f64, f64)> {
    let to_f64 = |v: &PolyValue| match v {
        PolyValue::Integer(i) => Some(*i as f64),
        PolyValue::Float(f) => Some(f.0),
        PolyValue::Decimal { unscaled, scale } => {
            Some(*unscaled as f64 / 10f64.powi(*scale as i32))
        }
        _ => None,
    };
    Some((to_f64(a)?, to_f64(b)?))
}

fn compare_values(a: &PolyValue, b: &PolyValue) -> Result<std::cmp::Ordering> {
    let ordering = match (a, b) {
        (PolyValue::Integer(x), PolyValue::Integer(y)) => x.cmp(y),
        (PolyValue::Utf8(x), PolyValue::Utf8(y)) => x.cmp(y),
        (PolyValue::Boolean(x), PolyValue::Boolean(y)) => x.cmp(y),
        (PolyValue::Date(x), PolyValue::Date(y)) => x.cmp(y),
        (PolyValue::Time(x), PolyValue::Time(y)) => x.cmp(y),
        (PolyValue::Timestamp(x), PolyValue::Timestamp(y)) => x.cmp(y),
        (PolyValue::Binary(x), PolyValue::Binary(y)) => x.cmp(y),
        _ => match numeric_pair(a, b) {
            Some((x, y)) => x.total_cmp(&y),
            None => {
                return type_err!(
                    "cannot compare {} with {}",
                    a.family().name(),
                    b.family().name()
                )
            }
        },
    };
    Ok(ordering)
}

/// Converts a SQL LIKE pattern into an anchored regular expression
fn like_to_regex(pattern: &str, escape: Option<char>) -> Result<Regex> {
    let mut out = String::from("^");
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        if Some(c) == escape {
            match chars.next() {
                Some(escaped) => out.push_str(&regex::escape(&escaped.to_string())),
                None => return type_err!("LIKE pattern ends with escape character"),
            }
            continue;
        }
        match c {
            '%' => out.push_str(".*"),
            '_' => out.push('.'),
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    Regex::new(&out).map_err(|e| {
        polyfusion_common::PolyFusionError::Internal(format!("bad LIKE pattern: {e}"))
    })
}

/// Strict evaluation of a primitive call: null in, null out, except for the
/// operators that define their own null behavior (CASE, COALESCE, COUNT).
pub fn eval_primitive(kind: OperatorKind, args: &[PolyValue]) -> Result<PolyValue> {
    use OperatorKind::*;
    match kind {
        Case => {
            // [cond, value, cond, value, ..., else]
            let mut i = 0;
            while i + 1 < args.len() {
                if args[i].as_bool() == Some(true) {
                    return Ok(args[i + 1].clone());
                }
                i += 2;
            }
            match args.last() {
                Some(v) if args.len() % 2 == 1 => Ok(v.clone()),
                _ => Ok(PolyValue::Null),
            }
        }
        Coalesce => Ok(args
            .iter()
            .find(|v| !v.is_null())
            .cloned()
            .unwrap_or(PolyValue::Null)),
        IsDistinctFrom | IsNotDistinctFrom => {
            let distinct = match (args[0].is_null(), args[1].is_null()) {
                (true, true) => false,
                (true, false) | (false, true) => true,
                (false, false) => !compare_values(&args[0], &args[1])?.is_eq(),
            };
            Ok(PolyValue::Boolean(if kind == IsDistinctFrom {
                distinct
            } else {
                !distinct
            }))
        }
        _ => {
            if args.iter().any(|v| v.is_null()) {
                return Ok(PolyValue::Null);
            }
            eval_strict(kind, args)
        }
    }
}

fn eval_strict(kind: OperatorKind, args: &[PolyValue]) -> Result<PolyValue> {
    use OperatorKind::*;
    match kind {
        Equals => Ok(PolyValue::Boolean(compare_values(&args[0], &args[1])?.is_eq())),
        NotEquals => Ok(PolyValue::Boolean(!compare_values(&args[0], &args[1])?.is_eq())),
        LessThan => Ok(PolyValue::Boolean(compare_values(&args[0], &args[1])?.is_lt())),
        LessThanOrEqual => {
            Ok(PolyValue::Boolean(compare_values(&args[0], &args[1])?.is_le()))
        }
        GreaterThan => Ok(PolyValue::Boolean(compare_values(&args[0], &args[1])?.is_gt())),
        GreaterThanOrEqual => {
            Ok(PolyValue::Boolean(compare_values(&args[0], &args[1])?.is_ge()))
        }
        Plus | Minus | Times | Divide | Mod => match (&args[0], &args[1]) {
            (PolyValue::Integer(a), PolyValue::Integer(b)) => {
                let result = match kind {
                    Plus => a.checked_add(*b),
                    Minus => a.checked_sub(*b),
                    Times => a.checked_mul(*b),
                    Divide => a.checked_div(*b),
                    Mod => a.checked_rem(*b),
                    _ => unreachable!(),
                };
                match result {
                    Some(v) => Ok(PolyValue::Integer(v)),
                    None => type_err!("integer arithmetic overflow in {kind:?}"),
                }
            }
            (a, b) => match numeric_pair(a, b) {
                Some((x, y)) => {
                    let v = match kind {
                        Plus => x + y,
                        Minus => x - y,
                        Times => x * y,
                        Divide => x / y,
                        Mod => x % y,
                        _ => unreachable!(),
                    };
                    Ok(PolyValue::float(v))
                }
                None => type_err!(
                    "cannot apply {kind:?} to {} and {}",
                    a.family().name(),
                    b.family().name()
                ),
            },
        },
        UnaryMinus => match &args[0] {
            PolyValue::Integer(i) => Ok(PolyValue::Integer(-i)),
            PolyValue::Float(v) => Ok(PolyValue::float(-v.0)),
            v => type_err!("cannot negate {}", v.family().name()),
        },
        Concat => match (&args[0], &args[1]) {
            (PolyValue::Utf8(a), PolyValue::Utf8(b)) => {
                Ok(PolyValue::Utf8(format!("{a}{b}")))
            }
            (a, b) => type_err!(
                "cannot concatenate {} and {}",
                a.family().name(),
                b.family().name()
            ),
        },
        Like => match (&args[0], &args[1]) {
            (PolyValue::Utf8(s), PolyValue::Utf8(p)) => {
                let escape = match args.get(2) {
                    Some(PolyValue::Utf8(e)) => e.chars().next(),
                    _ => None,
                };
                Ok(PolyValue::Boolean(like_to_regex(p, escape)?.is_match(s)))
            }
            _ => type_err!("LIKE requires character operands"),
        },
        Item => match (&args[0], &args[1]) {
            (PolyValue::Array(items), PolyValue::Integer(i)) => {
                // SQL array access is 1-based
                let index = *i - 1;
                if index < 0 || index as usize >= items.len() {
                    Ok(PolyValue::Null)
                } else {
                    Ok(items[index as usize].clone())
                }
            }
            _ => type_err!("ITEM requires an array and an integer index"),
        },
        Distance => match (&args[0], &args[1]) {
            (PolyValue::Array(a), PolyValue::Array(b)) => {
                if a.len() != b.len() {
                    return type_err!("DISTANCE requires vectors of equal length");
                }
                let mut sum = 0.0;
                for (x, y) in a.iter().zip(b) {
                    match numeric_pair(x, y) {
                        Some((x, y)) => sum += (x - y) * (x - y),
                        None => return type_err!("DISTANCE requires numeric vectors"),
                    }
                }
                Ok(PolyValue::float(sum.sqrt()))
            }
            _ => type_err!("DISTANCE requires array operands"),
        },
        other => internal_err!("no primitive evaluation for operator {other:?}"),
    }
}
