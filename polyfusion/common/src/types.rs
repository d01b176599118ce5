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

//! Polymorphic SQL type descriptors and the per-family type-system table

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::Result;
use crate::interval::IntervalQualifier;
use crate::type_err;

/// Precision or scale value meaning "unspecified, use the system default".
pub const PRECISION_NOT_SPECIFIED: i32 = -1;

/// SQL type families. A family groups the types that share literal syntax,
/// comparison semantics and coercion behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PolyTypeFamily {
    Boolean,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Decimal,
    Real,
    Double,
    Char,
    Varchar,
    Binary,
    Varbinary,
    Date,
    Time,
    Timestamp,
    IntervalYearMonth,
    IntervalDayTime,
    Array,
    Multiset,
    Map,
    Row,
    Document,
    Null,
    Any,
}

impl PolyTypeFamily {
    /// SQL name of the family as it appears in digests and error messages
    pub fn name(&self) -> &'static str {
        match self {
            PolyTypeFamily::Boolean => "BOOLEAN",
            PolyTypeFamily::TinyInt => "TINYINT",
            PolyTypeFamily::SmallInt => "SMALLINT",
            PolyTypeFamily::Integer => "INTEGER",
            PolyTypeFamily::BigInt => "BIGINT",
            PolyTypeFamily::Decimal => "DECIMAL",
            PolyTypeFamily::Real => "REAL",
            PolyTypeFamily::Double => "DOUBLE",
            PolyTypeFamily::Char => "CHAR",
            PolyTypeFamily::Varchar => "VARCHAR",
            PolyTypeFamily::Binary => "BINARY",
            PolyTypeFamily::Varbinary => "VARBINARY",
            PolyTypeFamily::Date => "DATE",
            PolyTypeFamily::Time => "TIME",
            PolyTypeFamily::Timestamp => "TIMESTAMP",
            PolyTypeFamily::IntervalYearMonth => "INTERVAL_YEAR_MONTH",
            PolyTypeFamily::IntervalDayTime => "INTERVAL_DAY_TIME",
            PolyTypeFamily::Array => "ARRAY",
            PolyTypeFamily::Multiset => "MULTISET",
            PolyTypeFamily::Map => "MAP",
            PolyTypeFamily::Row => "ROW",
            PolyTypeFamily::Document => "DOCUMENT",
            PolyTypeFamily::Null => "NULL",
            PolyTypeFamily::Any => "ANY",
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.is_exact_numeric() || self.is_approximate_numeric()
    }

    pub fn is_exact_numeric(&self) -> bool {
        matches!(
            self,
            PolyTypeFamily::TinyInt
                | PolyTypeFamily::SmallInt
                | PolyTypeFamily::Integer
                | PolyTypeFamily::BigInt
                | PolyTypeFamily::Decimal
        )
    }

    pub fn is_approximate_numeric(&self) -> bool {
        matches!(self, PolyTypeFamily::Real | PolyTypeFamily::Double)
    }

    pub fn is_character(&self) -> bool {
        matches!(self, PolyTypeFamily::Char | PolyTypeFamily::Varchar)
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, PolyTypeFamily::Binary | PolyTypeFamily::Varbinary)
    }

    pub fn is_datetime(&self) -> bool {
        matches!(
            self,
            PolyTypeFamily::Date | PolyTypeFamily::Time | PolyTypeFamily::Timestamp
        )
    }

    pub fn is_interval(&self) -> bool {
        matches!(
            self,
            PolyTypeFamily::IntervalYearMonth | PolyTypeFamily::IntervalDayTime
        )
    }

    /// Families whose values carry a component type
    pub fn is_collection(&self) -> bool {
        matches!(self, PolyTypeFamily::Array | PolyTypeFamily::Multiset)
    }

    /// Rank used to pick the least-restrictive numeric family: coercing to a
    /// higher rank never loses the integer part of a lower-ranked value.
    pub fn numeric_rank(&self) -> Option<u8> {
        match self {
            PolyTypeFamily::TinyInt => Some(0),
            PolyTypeFamily::SmallInt => Some(1),
            PolyTypeFamily::Integer => Some(2),
            PolyTypeFamily::BigInt => Some(3),
            PolyTypeFamily::Decimal => Some(4),
            PolyTypeFamily::Real => Some(5),
            PolyTypeFamily::Double => Some(6),
            _ => None,
        }
    }
}

/// A collation, identified by the catalog-assigned id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Collation {
    pub id: u32,
    pub name: String,
    pub case_sensitive: bool,
}

impl Collation {
    pub fn new(id: u32, name: impl Into<String>, case_sensitive: bool) -> Self {
        Self {
            id,
            name: name.into(),
            case_sensitive,
        }
    }
}

/// How the fields of a struct type were resolved against the query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum StructKind {
    /// Every field access must be fully qualified
    FullyQualified,
    /// Fields may be peeked at without qualification
    Peek,
    /// Not a struct
    #[default]
    None,
}

/// A named field of a [PolyType] with family [PolyTypeFamily::Row]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PolyField {
    pub name: String,
    pub ty: PolyType,
}

impl PolyField {
    pub fn new(name: impl Into<String>, ty: PolyType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A polymorphic SQL type descriptor.
///
/// Component types exist iff the family is a collection; interval families
/// carry a qualifier; `Row` carries an ordered field list. The descriptor is
/// immutable; `with_nullability` returns a modified copy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PolyType {
    family: PolyTypeFamily,
    precision: i32,
    scale: i32,
    nullable: bool,
    collation: Option<Collation>,
    component: Option<Box<PolyType>>,
    key_type: Option<Box<PolyType>>,
    value_type: Option<Box<PolyType>>,
    fields: Vec<PolyField>,
    struct_kind: StructKind,
    interval_qualifier: Option<IntervalQualifier>,
}

pub type PolyTypeRef = Arc<PolyType>;

impl PolyType {
    fn base(family: PolyTypeFamily) -> Self {
        Self {
            family,
            precision: PRECISION_NOT_SPECIFIED,
            scale: PRECISION_NOT_SPECIFIED,
            nullable: false,
            collation: None,
            component: None,
            key_type: None,
            value_type: None,
            fields: vec![],
            struct_kind: StructKind::None,
            interval_qualifier: None,
        }
    }

    pub fn boolean() -> Self {
        Self::base(PolyTypeFamily::Boolean)
    }

    pub fn tinyint() -> Self {
        Self::base(PolyTypeFamily::TinyInt)
    }

    pub fn smallint() -> Self {
        Self::base(PolyTypeFamily::SmallInt)
    }

    pub fn integer() -> Self {
        Self::base(PolyTypeFamily::Integer)
    }

    pub fn bigint() -> Self {
        Self::base(PolyTypeFamily::BigInt)
    }

    pub fn decimal(precision: i32, scale: i32) -> Self {
        let mut t = Self::base(PolyTypeFamily::Decimal);
        t.precision = precision;
        t.scale = scale;
        t
    }

    pub fn real() -> Self {
        Self::base(PolyTypeFamily::Real)
    }

    pub fn double() -> Self {
        Self::base(PolyTypeFamily::Double)
    }

    pub fn char(precision: i32) -> Self {
        let mut t = Self::base(PolyTypeFamily::Char);
        t.precision = precision;
        t
    }

    pub fn varchar(precision: i32) -> Self {
        let mut t = Self::base(PolyTypeFamily::Varchar);
        t.precision = precision;
        t
    }

    pub fn binary(precision: i32) -> Self {
        let mut t = Self::base(PolyTypeFamily::Binary);
        t.precision = precision;
        t
    }

    pub fn varbinary(precision: i32) -> Self {
        let mut t = Self::base(PolyTypeFamily::Varbinary);
        t.precision = precision;
        t
    }

    pub fn date() -> Self {
        Self::base(PolyTypeFamily::Date)
    }

    pub fn time(precision: i32) -> Self {
        let mut t = Self::base(PolyTypeFamily::Time);
        t.precision = precision;
        t
    }

    pub fn timestamp(precision: i32) -> Self {
        let mut t = Self::base(PolyTypeFamily::Timestamp);
        t.precision = precision;
        t
    }

    pub fn interval(qualifier: IntervalQualifier) -> Self {
        let family = if qualifier.is_year_month() {
            PolyTypeFamily::IntervalYearMonth
        } else {
            PolyTypeFamily::IntervalDayTime
        };
        let mut t = Self::base(family);
        t.interval_qualifier = Some(qualifier);
        t
    }

    pub fn array(component: PolyType) -> Self {
        let mut t = Self::base(PolyTypeFamily::Array);
        t.component = Some(Box::new(component));
        t
    }

    pub fn multiset(component: PolyType) -> Self {
        let mut t = Self::base(PolyTypeFamily::Multiset);
        t.component = Some(Box::new(component));
        t
    }

    pub fn map(key: PolyType, value: PolyType) -> Self {
        let mut t = Self::base(PolyTypeFamily::Map);
        t.key_type = Some(Box::new(key));
        t.value_type = Some(Box::new(value));
        t
    }

    pub fn row(fields: Vec<PolyField>) -> Self {
        let mut t = Self::base(PolyTypeFamily::Row);
        t.fields = fields;
        t.struct_kind = StructKind::FullyQualified;
        t
    }

    pub fn row_with_kind(fields: Vec<PolyField>, struct_kind: StructKind) -> Self {
        let mut t = Self::row(fields);
        t.struct_kind = struct_kind;
        t
    }

    pub fn document() -> Self {
        Self::base(PolyTypeFamily::Document)
    }

    /// The type of the NULL literal before it is given a context type
    pub fn null() -> Self {
        let mut t = Self::base(PolyTypeFamily::Null);
        t.nullable = true;
        t
    }

    pub fn any() -> Self {
        let mut t = Self::base(PolyTypeFamily::Any);
        t.nullable = true;
        t
    }

    pub fn family(&self) -> PolyTypeFamily {
        self.family
    }

    pub fn precision(&self) -> i32 {
        self.precision
    }

    pub fn scale(&self) -> i32 {
        self.scale
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn collation(&self) -> Option<&Collation> {
        self.collation.as_ref()
    }

    pub fn component(&self) -> Option<&PolyType> {
        self.component.as_deref()
    }

    pub fn key_type(&self) -> Option<&PolyType> {
        self.key_type.as_deref()
    }

    pub fn value_type(&self) -> Option<&PolyType> {
        self.value_type.as_deref()
    }

    pub fn fields(&self) -> &[PolyField] {
        &self.fields
    }

    pub fn struct_kind(&self) -> StructKind {
        self.struct_kind
    }

    pub fn interval_qualifier(&self) -> Option<&IntervalQualifier> {
        self.interval_qualifier.as_ref()
    }

    pub fn is_struct(&self) -> bool {
        self.family == PolyTypeFamily::Row
    }

    pub fn with_nullability(&self, nullable: bool) -> Self {
        let mut t = self.clone();
        t.nullable = nullable;
        t
    }

    pub fn with_collation(&self, collation: Collation) -> Self {
        let mut t = self.clone();
        t.collation = Some(collation);
        t
    }

    /// Index of the field with the given name, if the type is a struct
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// The type of field `i`. Errors on non-struct types and bad indexes so
    /// callers can use `?` while constructing expressions.
    pub fn field_type(&self, i: usize) -> Result<&PolyType> {
        match self.fields.get(i) {
            Some(f) => Ok(&f.ty),
            None => type_err!(
                "no field {i} in type {self} with {} fields",
                self.fields.len()
            ),
        }
    }
}

impl Display for PolyType {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self.family {
            PolyTypeFamily::Array | PolyTypeFamily::Multiset => {
                // component is always present for collections
                if let Some(component) = &self.component {
                    write!(f, "{} {}", component, self.family.name())?;
                } else {
                    write!(f, "{}", self.family.name())?;
                }
            }
            PolyTypeFamily::Map => {
                match (&self.key_type, &self.value_type) {
                    (Some(k), Some(v)) => write!(f, "MAP({k}, {v})")?,
                    _ => write!(f, "MAP")?,
                }
            }
            PolyTypeFamily::Row => {
                write!(f, "ROW(")?;
                for (i, field) in self.fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} {}", field.name, field.ty)?;
                }
                write!(f, ")")?;
            }
            PolyTypeFamily::IntervalYearMonth | PolyTypeFamily::IntervalDayTime => {
                match &self.interval_qualifier {
                    Some(q) => write!(f, "INTERVAL {q}")?,
                    None => write!(f, "{}", self.family.name())?,
                }
            }
            _ => {
                write!(f, "{}", self.family.name())?;
                if self.precision != PRECISION_NOT_SPECIFIED {
                    if self.scale != PRECISION_NOT_SPECIFIED {
                        write!(f, "({}, {})", self.precision, self.scale)?;
                    } else {
                        write!(f, "({})", self.precision)?;
                    }
                }
            }
        }
        if !self.nullable {
            write!(f, " NOT NULL")?;
        }
        Ok(())
    }
}

/// Per-family limits and defaults, built once from the planner configuration
/// and shared read-only across concurrent queries.
#[derive(Debug, Clone)]
pub struct TypeSystem {
    default_precisions: IndexMap<PolyTypeFamily, i32>,
}

/// Default leading-field precision of interval types (SQL standard)
pub const DEFAULT_INTERVAL_START_PRECISION: i32 = 2;
/// Default fractional-second precision of interval types (SQL standard)
pub const DEFAULT_INTERVAL_FRACTIONAL_PRECISION: i32 = 6;

impl Default for TypeSystem {
    fn default() -> Self {
        Self::new(IndexMap::new())
    }
}

impl TypeSystem {
    pub fn new(overrides: IndexMap<PolyTypeFamily, i32>) -> Self {
        Self {
            default_precisions: overrides,
        }
    }

    /// Default precision applied when a type is written without one
    pub fn default_precision(&self, family: PolyTypeFamily) -> i32 {
        if let Some(p) = self.default_precisions.get(&family) {
            return *p;
        }
        match family {
            PolyTypeFamily::Char | PolyTypeFamily::Binary => 1,
            PolyTypeFamily::Varchar | PolyTypeFamily::Varbinary => PRECISION_NOT_SPECIFIED,
            PolyTypeFamily::Decimal => 19,
            PolyTypeFamily::Time => 0,
            PolyTypeFamily::Timestamp => 0,
            PolyTypeFamily::IntervalYearMonth | PolyTypeFamily::IntervalDayTime => {
                DEFAULT_INTERVAL_START_PRECISION
            }
            _ => PRECISION_NOT_SPECIFIED,
        }
    }

    pub fn max_precision(&self, family: PolyTypeFamily) -> i32 {
        match family {
            PolyTypeFamily::Decimal => 38,
            PolyTypeFamily::Varchar | PolyTypeFamily::Char => 65536,
            PolyTypeFamily::Timestamp | PolyTypeFamily::Time => 3,
            PolyTypeFamily::IntervalYearMonth | PolyTypeFamily::IntervalDayTime => 10,
            _ => PRECISION_NOT_SPECIFIED,
        }
    }

    pub fn max_scale(&self, family: PolyTypeFamily) -> i32 {
        match family {
            PolyTypeFamily::Decimal => 19,
            _ => PRECISION_NOT_SPECIFIED,
        }
    }

    /// Prefix of a literal of the family in SQL text, e.g. `X'` for binary
    pub fn literal_prefix(&self, family: PolyTypeFamily) -> Option<&'static str> {
        match family {
            PolyTypeFamily::Char | PolyTypeFamily::Varchar => Some("'"),
            PolyTypeFamily::Binary | PolyTypeFamily::Varbinary => Some("X'"),
            PolyTypeFamily::Date => Some("DATE '"),
            PolyTypeFamily::Time => Some("TIME '"),
            PolyTypeFamily::Timestamp => Some("TIMESTAMP '"),
            _ => None,
        }
    }

    pub fn literal_suffix(&self, family: PolyTypeFamily) -> Option<&'static str> {
        match family {
            PolyTypeFamily::Char
            | PolyTypeFamily::Varchar
            | PolyTypeFamily::Binary
            | PolyTypeFamily::Varbinary
            | PolyTypeFamily::Date
            | PolyTypeFamily::Time
            | PolyTypeFamily::Timestamp => Some("'"),
            _ => None,
        }
    }

    pub fn is_case_sensitive(&self, family: PolyTypeFamily) -> bool {
        family.is_character()
    }

    pub fn is_autoincrement(&self, family: PolyTypeFamily) -> bool {
        family.is_exact_numeric() && family != PolyTypeFamily::Decimal
    }

    /// JDBC type ordinal of the family, as reported to JDBC-class adapters
    pub fn jdbc_ordinal(&self, family: PolyTypeFamily) -> i32 {
        match family {
            PolyTypeFamily::Boolean => 16,
            PolyTypeFamily::TinyInt => -6,
            PolyTypeFamily::SmallInt => 5,
            PolyTypeFamily::Integer => 4,
            PolyTypeFamily::BigInt => -5,
            PolyTypeFamily::Decimal => 3,
            PolyTypeFamily::Real => 7,
            PolyTypeFamily::Double => 8,
            PolyTypeFamily::Char => 1,
            PolyTypeFamily::Varchar => 12,
            PolyTypeFamily::Binary => -2,
            PolyTypeFamily::Varbinary => -3,
            PolyTypeFamily::Date => 91,
            PolyTypeFamily::Time => 92,
            PolyTypeFamily::Timestamp => 93,
            PolyTypeFamily::Array => 2003,
            PolyTypeFamily::Row => 2002,
            // families with no JDBC counterpart map to OTHER
            _ => 1111,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interval::{IntervalQualifier, IntervalUnit};
    use crate::error::ParserPos;

    #[test]
    fn display_includes_nullability() {
        assert_eq!(PolyType::integer().to_string(), "INTEGER NOT NULL");
        assert_eq!(
            PolyType::varchar(20).with_nullability(true).to_string(),
            "VARCHAR(20)"
        );
        assert_eq!(
            PolyType::decimal(10, 2).to_string(),
            "DECIMAL(10, 2) NOT NULL"
        );
    }

    #[test]
    fn collection_component_invariant() {
        let t = PolyType::array(PolyType::integer());
        assert!(t.component().is_some());
        assert_eq!(t.to_string(), "INTEGER NOT NULL ARRAY NOT NULL");
        assert!(PolyType::integer().component().is_none());
    }

    #[test]
    fn row_field_lookup() {
        let t = PolyType::row(vec![
            PolyField::new("id", PolyType::integer()),
            PolyField::new("name", PolyType::varchar(50).with_nullability(true)),
        ]);
        assert_eq!(t.field_index("name"), Some(1));
        assert!(t.field_type(2).is_err());
    }

    #[test]
    fn interval_type_carries_qualifier() {
        let q = IntervalQualifier::new(
            IntervalUnit::Year,
            Some(IntervalUnit::Month),
            PRECISION_NOT_SPECIFIED,
            PRECISION_NOT_SPECIFIED,
            ParserPos::ZERO,
        )
        .unwrap();
        let t = PolyType::interval(q);
        assert_eq!(t.family(), PolyTypeFamily::IntervalYearMonth);
        assert!(t.interval_qualifier().is_some());
    }

    #[test]
    fn type_system_defaults() {
        let ts = TypeSystem::default();
        assert_eq!(
            ts.default_precision(PolyTypeFamily::IntervalDayTime),
            DEFAULT_INTERVAL_START_PRECISION
        );
        let mut overrides = IndexMap::new();
        overrides.insert(PolyTypeFamily::Decimal, 31);
        let ts = TypeSystem::new(overrides);
        assert_eq!(ts.default_precision(PolyTypeFamily::Decimal), 31);
    }
}
