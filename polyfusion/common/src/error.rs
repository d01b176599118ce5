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

//! Error types shared by all polyfusion crates

use std::error::Error;
use std::fmt::{self, Display, Formatter};

/// Result type for operations that could result in a [PolyFusionError]
pub type Result<T, E = PolyFusionError> = std::result::Result<T, E>;

/// Position of a token in the original query text, carried through the IR so
/// errors can point back at the offending input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ParserPos {
    pub line: u32,
    pub column: u32,
}

impl ParserPos {
    /// The zero position, used for nodes synthesized by the planner.
    pub const ZERO: ParserPos = ParserPos { line: 0, column: 0 };

    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl Display for ParserPos {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Error type for the planning and translation core.
///
/// Variants map to the error kinds a caller can meaningfully distinguish:
/// user-facing planning and typing problems, structured interval and
/// placement failures, cooperative cancellation, and internal invariant
/// violations that must never surface for valid input.
#[derive(Debug)]
pub enum PolyFusionError {
    /// Error during planning or plan rewriting
    Plan(String),
    /// Type inference or coercion failure
    Type(String),
    /// The feature is representable but not implemented
    NotImplemented(String),
    /// Invalid interval literal or qualifier
    Interval(IntervalError),
    /// Column placement invariant violation
    Placement(PlacementError),
    /// The per-query cancel flag was observed
    Cancelled,
    /// Invariant violation; raising this for user input is itself a bug
    Internal(String),
}

impl Display for PolyFusionError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            PolyFusionError::Plan(desc) => {
                write!(f, "Error during planning: {desc}")
            }
            PolyFusionError::Type(desc) => write!(f, "Type error: {desc}"),
            PolyFusionError::NotImplemented(desc) => {
                write!(f, "This feature is not implemented: {desc}")
            }
            PolyFusionError::Interval(e) => write!(f, "Interval error: {e}"),
            PolyFusionError::Placement(e) => write!(f, "Placement error: {e}"),
            PolyFusionError::Cancelled => write!(f, "Query was cancelled"),
            PolyFusionError::Internal(desc) => write!(
                f,
                "Internal error: {desc}. This was likely caused by a bug in \
                 polyfusion's code and we would welcome that you file an bug report \
                 in our issue tracker"
            ),
        }
    }
}

impl Error for PolyFusionError {}

impl From<IntervalError> for PolyFusionError {
    fn from(e: IntervalError) -> Self {
        PolyFusionError::Interval(e)
    }
}

impl From<PlacementError> for PolyFusionError {
    fn from(e: PlacementError) -> Self {
        PolyFusionError::Placement(e)
    }
}

/// Failures of the interval-literal validator.
///
/// Both variants carry the original literal text and the qualifier it was
/// checked against, rendered with its effective precisions (e.g. `YEAR(2)`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntervalError {
    /// The literal does not match the pattern selected by the qualifier
    UnsupportedLiteral {
        literal: String,
        qualifier: String,
        pos: ParserPos,
    },
    /// A field lies outside the range allowed by the qualifier's precision
    FieldExceedsPrecision {
        literal: String,
        qualifier: String,
        pos: ParserPos,
    },
}

impl Display for IntervalError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            IntervalError::UnsupportedLiteral {
                literal,
                qualifier,
                pos,
            } => write!(
                f,
                "Illegal interval literal format '{literal}' for INTERVAL {qualifier} at {pos}"
            ),
            IntervalError::FieldExceedsPrecision {
                literal,
                qualifier,
                pos,
            } => write!(
                f,
                "Interval field value '{literal}' exceeds precision of INTERVAL {qualifier} at {pos}"
            ),
        }
    }
}

impl Error for IntervalError {}

/// Failures of the placement-aware modify planner. Each variant carries the
/// name of the object that blocks the operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementError {
    /// Dropping this placement would leave a column with no placement at all
    LastPlacement { table: String, column: String },
    /// A table must keep at least one column
    SoleColumn { table: String, column: String },
    /// The column is part of a primary key and cannot be dropped
    PrimaryKeyColumn { column: String },
    /// The column is referenced by a foreign key, index or constraint
    ReferencedColumn { column: String, referenced_by: String },
    /// DDL was attempted on a table that is not of type TABLE
    SourceTable { table: String },
    /// The referenced store holds no placement of the table
    UnknownPlacement { table: String, store: String },
}

impl Display for PlacementError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            PlacementError::LastPlacement { table, column } => write!(
                f,
                "cannot drop the last placement of column '{column}' of table '{table}'"
            ),
            PlacementError::SoleColumn { table, column } => write!(
                f,
                "cannot drop column '{column}', the only column of table '{table}'"
            ),
            PlacementError::PrimaryKeyColumn { column } => {
                write!(f, "column '{column}' is part of the primary key")
            }
            PlacementError::ReferencedColumn {
                column,
                referenced_by,
            } => write!(
                f,
                "column '{column}' is referenced by '{referenced_by}'"
            ),
            PlacementError::SourceTable { table } => {
                write!(f, "table '{table}' is not of type TABLE")
            }
            PlacementError::UnknownPlacement { table, store } => write!(
                f,
                "store '{store}' holds no placement of table '{table}'"
            ),
        }
    }
}

impl Error for PlacementError {}

/// Macro wraps `Err(PolyFusionError::Plan)` with a formatted message
#[macro_export]
macro_rules! plan_err {
    ($($args:expr),*) => {
        Err($crate::error::PolyFusionError::Plan(format!($($args),*)))
    };
}

/// Macro wraps `Err(PolyFusionError::Type)` with a formatted message
#[macro_export]
macro_rules! type_err {
    ($($args:expr),*) => {
        Err($crate::error::PolyFusionError::Type(format!($($args),*)))
    };
}

/// Macro wraps `Err(PolyFusionError::NotImplemented)` with a formatted message
#[macro_export]
macro_rules! not_impl_err {
    ($($args:expr),*) => {
        Err($crate::error::PolyFusionError::NotImplemented(format!($($args),*)))
    };
}

/// Macro wraps `Err(PolyFusionError::Internal)` with a formatted message
#[macro_export]
macro_rules! internal_err {
    ($($args:expr),*) => {
        Err($crate::error::PolyFusionError::Internal(format!($($args),*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let e = PolyFusionError::Plan("no convention reachable".to_string());
        assert_eq!(
            e.to_string(),
            "Error during planning: no convention reachable"
        );
    }

    #[test]
    fn interval_error_carries_literal_and_qualifier() {
        let e = IntervalError::FieldExceedsPrecision {
            literal: "100".to_string(),
            qualifier: "YEAR(2)".to_string(),
            pos: ParserPos::new(1, 8),
        };
        assert_eq!(
            e.to_string(),
            "Interval field value '100' exceeds precision of INTERVAL YEAR(2) at line 1, column 8"
        );
    }

    #[test]
    fn macros_produce_err() {
        fn fails() -> Result<()> {
            plan_err!("rule {} not applicable", "project_merge")
        }
        let err = fails().unwrap_err();
        assert!(matches!(err, PolyFusionError::Plan(_)));
        assert_eq!(
            err.to_string(),
            "Error during planning: rule project_merge not applicable"
        );
    }
}
