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

//! Literal values carried by row expressions

use std::fmt::{self, Display, Formatter};

use ordered_float::OrderedFloat;

use crate::interval::IntervalValue;
use crate::types::PolyTypeFamily;

/// A single literal value. `Eq` and `Hash` are structural so values can key
/// digest maps; floats go through [OrderedFloat] for that reason.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PolyValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(OrderedFloat<f64>),
    Decimal { unscaled: i128, scale: u32 },
    Utf8(String),
    Binary(Vec<u8>),
    /// Days since the epoch
    Date(i32),
    /// Milliseconds since midnight
    Time(i64),
    /// Milliseconds since the epoch
    Timestamp(i64),
    Interval(IntervalValue),
    Array(Vec<PolyValue>),
    /// A document, stored in serialized form so values stay hashable
    Document(String),
}

impl PolyValue {
    pub fn float(v: f64) -> Self {
        PolyValue::Float(OrderedFloat(v))
    }

    pub fn utf8(v: impl Into<String>) -> Self {
        PolyValue::Utf8(v.into())
    }

    pub fn document(value: &serde_json::Value) -> Self {
        PolyValue::Document(value.to_string())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, PolyValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PolyValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PolyValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PolyValue::Utf8(s) => Some(s),
            _ => None,
        }
    }

    /// The natural type family of the literal before any coercion
    pub fn family(&self) -> PolyTypeFamily {
        match self {
            PolyValue::Null => PolyTypeFamily::Null,
            PolyValue::Boolean(_) => PolyTypeFamily::Boolean,
            PolyValue::Integer(_) => PolyTypeFamily::Integer,
            PolyValue::Float(_) => PolyTypeFamily::Double,
            PolyValue::Decimal { .. } => PolyTypeFamily::Decimal,
            PolyValue::Utf8(_) => PolyTypeFamily::Char,
            PolyValue::Binary(_) => PolyTypeFamily::Binary,
            PolyValue::Date(_) => PolyTypeFamily::Date,
            PolyValue::Time(_) => PolyTypeFamily::Time,
            PolyValue::Timestamp(_) => PolyTypeFamily::Timestamp,
            PolyValue::Interval(v) => {
                if v.fields.len() == 2 {
                    PolyTypeFamily::IntervalYearMonth
                } else {
                    PolyTypeFamily::IntervalDayTime
                }
            }
            PolyValue::Array(_) => PolyTypeFamily::Array,
            PolyValue::Document(_) => PolyTypeFamily::Document,
        }
    }
}

fn fmt_decimal(f: &mut Formatter, unscaled: i128, scale: u32) -> fmt::Result {
    if scale == 0 {
        return write!(f, "{unscaled}");
    }
    let sign = if unscaled < 0 { "-" } else { "" };
    let abs = unscaled.unsigned_abs();
    let pow = 10u128.pow(scale);
    write!(
        f,
        "{sign}{}.{:0width$}",
        abs / pow,
        abs % pow,
        width = scale as usize
    )
}

impl Display for PolyValue {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            PolyValue::Null => write!(f, "NULL"),
            PolyValue::Boolean(true) => write!(f, "TRUE"),
            PolyValue::Boolean(false) => write!(f, "FALSE"),
            PolyValue::Integer(i) => write!(f, "{i}"),
            PolyValue::Float(v) => write!(f, "{}", v.0),
            PolyValue::Decimal { unscaled, scale } => fmt_decimal(f, *unscaled, *scale),
            PolyValue::Utf8(s) => write!(f, "'{}'", s.replace('\'', "''")),
            PolyValue::Binary(bytes) => {
                write!(f, "X'")?;
                for b in bytes {
                    write!(f, "{b:02X}")?;
                }
                write!(f, "'")
            }
            PolyValue::Date(d) => write!(f, "DATE {d}"),
            PolyValue::Time(t) => write!(f, "TIME {t}"),
            PolyValue::Timestamp(t) => write!(f, "TIMESTAMP {t}"),
            PolyValue::Interval(v) => write!(f, "INTERVAL {v}"),
            PolyValue::Array(items) => {
                write!(f, "ARRAY[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            PolyValue::Document(doc) => write!(f, "{doc}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_rendering() {
        let v = PolyValue::Decimal {
            unscaled: 12345,
            scale: 2,
        };
        assert_eq!(v.to_string(), "123.45");
        let v = PolyValue::Decimal {
            unscaled: -105,
            scale: 3,
        };
        assert_eq!(v.to_string(), "-0.105");
    }

    #[test]
    fn string_escaping() {
        assert_eq!(PolyValue::utf8("it's").to_string(), "'it''s'");
    }

    #[test]
    fn float_values_are_hashable() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(PolyValue::float(1.5));
        assert!(set.contains(&PolyValue::float(1.5)));
    }
}
