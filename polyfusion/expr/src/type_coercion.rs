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

//! Coercion rules for matching operand types: the least-restrictive common
//! type used by return-type inference and by operand harmonization

use polyfusion_common::types::{
    PolyField, PolyType, PolyTypeFamily, PRECISION_NOT_SPECIFIED,
};

fn max_precision(a: i32, b: i32) -> i32 {
    if a == PRECISION_NOT_SPECIFIED || b == PRECISION_NOT_SPECIFIED {
        PRECISION_NOT_SPECIFIED
    } else {
        a.max(b)
    }
}

/// Least-restrictive common type of two numeric types
fn numeric_coercion(lhs: &PolyType, rhs: &PolyType) -> Option<PolyType> {
    let lr = lhs.family().numeric_rank()?;
    let rr = rhs.family().numeric_rank()?;
    let winner = if lr >= rr { lhs } else { rhs };
    match winner.family() {
        PolyTypeFamily::Decimal => {
            // widen to cover both scales and both integer-digit counts
            let scale = lhs.scale().max(rhs.scale()).max(0);
            let int_digits = (lhs.precision() - lhs.scale().max(0))
                .max(rhs.precision() - rhs.scale().max(0))
                .max(1);
            Some(PolyType::decimal((int_digits + scale).min(38), scale))
        }
        _ => Some(winner.with_nullability(false)),
    }
}

fn character_coercion(lhs: &PolyType, rhs: &PolyType) -> Option<PolyType> {
    if !lhs.family().is_character() || !rhs.family().is_character() {
        return None;
    }
    if lhs.family() == PolyTypeFamily::Char
        && rhs.family() == PolyTypeFamily::Char
        && lhs.precision() == rhs.precision()
    {
        return Some(PolyType::char(lhs.precision()));
    }
    Some(PolyType::varchar(max_precision(lhs.precision(), rhs.precision())))
}

fn binary_coercion(lhs: &PolyType, rhs: &PolyType) -> Option<PolyType> {
    if !lhs.family().is_binary() || !rhs.family().is_binary() {
        return None;
    }
    if lhs.family() == rhs.family() && lhs.precision() == rhs.precision() {
        return Some(lhs.with_nullability(false));
    }
    Some(PolyType::varbinary(max_precision(lhs.precision(), rhs.precision())))
}

fn datetime_coercion(lhs: &PolyType, rhs: &PolyType) -> Option<PolyType> {
    use PolyTypeFamily::*;
    match (lhs.family(), rhs.family()) {
        (Date, Date) | (Time, Time) | (Timestamp, Timestamp) => {
            Some(lhs.with_nullability(false))
        }
        // a date is a timestamp at midnight
        (Date, Timestamp) => Some(rhs.with_nullability(false)),
        (Timestamp, Date) => Some(lhs.with_nullability(false)),
        _ => None,
    }
}

/// Least-restrictive common type of two types, ignoring nullability.
/// Returns `None` when the families cannot be reconciled.
fn common_type(lhs: &PolyType, rhs: &PolyType) -> Option<PolyType> {
    use PolyTypeFamily::*;
    if lhs.family() == Null {
        return Some(rhs.with_nullability(false));
    }
    if rhs.family() == Null {
        return Some(lhs.with_nullability(false));
    }
    if lhs.family() == Any || rhs.family() == Any {
        return Some(PolyType::any());
    }
    if lhs.family() == rhs.family()
        && lhs.with_nullability(false) == rhs.with_nullability(false)
    {
        return Some(lhs.with_nullability(false));
    }
    match (lhs.family(), rhs.family()) {
        (Boolean, Boolean) => Some(PolyType::boolean()),
        (Document, Document) => Some(PolyType::document()),
        (f, g) if f.is_numeric() && g.is_numeric() => numeric_coercion(lhs, rhs),
        (f, g) if f.is_character() && g.is_character() => character_coercion(lhs, rhs),
        (f, g) if f.is_binary() && g.is_binary() => binary_coercion(lhs, rhs),
        (f, g) if f.is_datetime() && g.is_datetime() => datetime_coercion(lhs, rhs),
        (f, g) if f.is_interval() && g.is_interval() && f == g => {
            Some(lhs.with_nullability(false))
        }
        (Array, Array) | (Multiset, Multiset) => {
            let component = common_type(lhs.component()?, rhs.component()?)?;
            let nullable_component = component
                .with_nullability(lhs.component()?.is_nullable() || rhs.component()?.is_nullable());
            Some(if lhs.family() == Array {
                PolyType::array(nullable_component)
            } else {
                PolyType::multiset(nullable_component)
            })
        }
        (Row, Row) if lhs.fields().len() == rhs.fields().len() => {
            let fields = lhs
                .fields()
                .iter()
                .zip(rhs.fields())
                .map(|(l, r)| {
                    let ty = common_type(&l.ty, &r.ty)?;
                    let ty = ty.with_nullability(l.ty.is_nullable() || r.ty.is_nullable());
                    Some(PolyField::new(l.name.clone(), ty))
                })
                .collect::<Option<Vec<_>>>()?;
            Some(PolyType::row(fields))
        }
        _ => None,
    }
}

/// Computes the least-restrictive common type of all `types`, preserving
/// overall nullability as "nullable iff any operand was nullable". Returns
/// `None` when no common type exists.
pub fn least_restrictive(types: &[PolyType]) -> Option<PolyType> {
    let mut iter = types.iter();
    let first = iter.next()?;
    let mut result = first.with_nullability(false);
    let mut nullable = first.is_nullable();
    for t in iter {
        result = common_type(&result, t)?;
        nullable |= t.is_nullable();
    }
    Some(result.with_nullability(nullable))
}

/// Whether a value of `from` can be assigned to a slot of type `to` without
/// an explicit cast
pub fn is_assignable(from: &PolyType, to: &PolyType) -> bool {
    if from.family() == PolyTypeFamily::Null {
        return to.is_nullable();
    }
    match least_restrictive(&[from.clone(), to.clone()]) {
        Some(common) => common.family() == to.family(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_ladder() {
        let t = least_restrictive(&[PolyType::integer(), PolyType::bigint()]).unwrap();
        assert_eq!(t.family(), PolyTypeFamily::BigInt);
        let t = least_restrictive(&[PolyType::bigint(), PolyType::double()]).unwrap();
        assert_eq!(t.family(), PolyTypeFamily::Double);
    }

    #[test]
    fn decimal_widening_covers_both_sides() {
        let t = least_restrictive(&[PolyType::decimal(10, 2), PolyType::decimal(8, 4)]).unwrap();
        assert_eq!(t.family(), PolyTypeFamily::Decimal);
        assert_eq!(t.scale(), 4);
        assert_eq!(t.precision(), 12);
    }

    #[test]
    fn nullability_is_any_of_operands() {
        let t = least_restrictive(&[
            PolyType::integer(),
            PolyType::integer().with_nullability(true),
        ])
        .unwrap();
        assert!(t.is_nullable());
        let t = least_restrictive(&[PolyType::integer(), PolyType::integer()]).unwrap();
        assert!(!t.is_nullable());
    }

    #[test]
    fn null_takes_the_other_type() {
        let t = least_restrictive(&[PolyType::null(), PolyType::varchar(10)]).unwrap();
        assert_eq!(t.family(), PolyTypeFamily::Varchar);
        assert!(t.is_nullable());
    }

    #[test]
    fn character_types_widen_to_varchar() {
        let t = least_restrictive(&[PolyType::char(3), PolyType::varchar(10)]).unwrap();
        assert_eq!(t.family(), PolyTypeFamily::Varchar);
        assert_eq!(t.precision(), 10);
    }

    #[test]
    fn date_widens_to_timestamp() {
        let t = least_restrictive(&[PolyType::date(), PolyType::timestamp(0)]).unwrap();
        assert_eq!(t.family(), PolyTypeFamily::Timestamp);
    }

    #[test]
    fn incompatible_families_have_no_common_type() {
        assert!(least_restrictive(&[PolyType::boolean(), PolyType::integer()]).is_none());
        assert!(least_restrictive(&[PolyType::date(), PolyType::time(0)]).is_none());
    }
}
