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

//! Interval qualifiers and the interval-literal validator

use std::fmt::{self, Display, Formatter};
use std::hash::{Hash, Hasher};

use regex::Regex;

use crate::error::{IntervalError, ParserPos, PolyFusionError, Result};
use crate::types::{TypeSystem, PRECISION_NOT_SPECIFIED};

/// Positional time unit of an interval qualifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IntervalUnit {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

impl IntervalUnit {
    pub fn name(&self) -> &'static str {
        match self {
            IntervalUnit::Year => "YEAR",
            IntervalUnit::Month => "MONTH",
            IntervalUnit::Day => "DAY",
            IntervalUnit::Hour => "HOUR",
            IntervalUnit::Minute => "MINUTE",
            IntervalUnit::Second => "SECOND",
        }
    }

    /// Upper bound of the unit when it appears as a secondary field.
    /// YEAR and DAY are never secondary.
    fn secondary_max(&self) -> Option<i64> {
        match self {
            IntervalUnit::Month => Some(11),
            IntervalUnit::Hour => Some(23),
            IntervalUnit::Minute | IntervalUnit::Second => Some(59),
            IntervalUnit::Year | IntervalUnit::Day => None,
        }
    }
}

impl Display for IntervalUnit {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The unit range of an interval type, e.g. `DAY(2) TO SECOND(3)`.
///
/// Created by the parser and immutable afterwards. The canonical form clears
/// `end_unit` when it equals `start_unit`, so `YEAR TO YEAR` and `YEAR`
/// construct equal qualifiers. The parser position is carried for error
/// reporting only and does not participate in equality or hashing.
#[derive(Debug, Clone)]
pub struct IntervalQualifier {
    start_unit: IntervalUnit,
    end_unit: Option<IntervalUnit>,
    start_precision: i32,
    fractional_second_precision: i32,
    pos: ParserPos,
}

impl PartialEq for IntervalQualifier {
    fn eq(&self, other: &Self) -> bool {
        self.start_unit == other.start_unit
            && self.end_unit == other.end_unit
            && self.start_precision == other.start_precision
            && self.fractional_second_precision == other.fractional_second_precision
    }
}

impl Eq for IntervalQualifier {}

impl Hash for IntervalQualifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.start_unit.hash(state);
        self.end_unit.hash(state);
        self.start_precision.hash(state);
        self.fractional_second_precision.hash(state);
    }
}

impl IntervalQualifier {
    /// Creates a qualifier, normalizing `end_unit == start_unit` to `None`
    /// and rejecting unit pairs outside the enumerated SQL set.
    pub fn new(
        start_unit: IntervalUnit,
        end_unit: Option<IntervalUnit>,
        start_precision: i32,
        fractional_second_precision: i32,
        pos: ParserPos,
    ) -> Result<Self> {
        let end_unit = end_unit.filter(|e| *e != start_unit);
        use IntervalUnit::*;
        let valid = match (start_unit, end_unit) {
            (Year, None)
            | (Year, Some(Month))
            | (Month, None)
            | (Day, None)
            | (Day, Some(Hour))
            | (Day, Some(Minute))
            | (Day, Some(Second))
            | (Hour, None)
            | (Hour, Some(Minute))
            | (Hour, Some(Second))
            | (Minute, None)
            | (Minute, Some(Second))
            | (Second, None) => true,
            _ => false,
        };
        if !valid {
            let end = end_unit.map(|e| format!(" TO {e}")).unwrap_or_default();
            return Err(PolyFusionError::Plan(format!(
                "invalid interval qualifier {start_unit}{end} at {pos}"
            )));
        }
        Ok(Self {
            start_unit,
            end_unit,
            start_precision,
            fractional_second_precision,
            pos,
        })
    }

    pub fn start_unit(&self) -> IntervalUnit {
        self.start_unit
    }

    pub fn end_unit(&self) -> Option<IntervalUnit> {
        self.end_unit
    }

    pub fn pos(&self) -> ParserPos {
        self.pos
    }

    /// Whether the qualifier denotes the year-month interval family
    pub fn is_year_month(&self) -> bool {
        matches!(self.start_unit, IntervalUnit::Year | IntervalUnit::Month)
    }

    /// Declared start precision, or the system default if unspecified
    pub fn effective_start_precision(&self, type_system: &TypeSystem) -> i32 {
        if self.start_precision != PRECISION_NOT_SPECIFIED {
            self.start_precision
        } else {
            type_system.default_precision(if self.is_year_month() {
                crate::types::PolyTypeFamily::IntervalYearMonth
            } else {
                crate::types::PolyTypeFamily::IntervalDayTime
            })
        }
    }

    /// Declared fractional-second precision, or the SQL-standard default
    pub fn effective_fractional_precision(&self) -> i32 {
        if self.fractional_second_precision != PRECISION_NOT_SPECIFIED {
            self.fractional_second_precision
        } else {
            crate::types::DEFAULT_INTERVAL_FRACTIONAL_PRECISION
        }
    }

    fn unsupported(&self, literal: &str) -> IntervalError {
        IntervalError::UnsupportedLiteral {
            literal: literal.to_string(),
            qualifier: self.to_string(),
            pos: self.pos,
        }
    }

    fn exceeds(&self, literal: &str) -> IntervalError {
        IntervalError::FieldExceedsPrecision {
            literal: literal.to_string(),
            qualifier: self.to_string(),
            pos: self.pos,
        }
    }

    /// Parses a signed decimal field captured by the qualifier's pattern,
    /// checking it against the declared lead-field precision: at most
    /// `10^p - 1` for a declared precision `p < 10`, otherwise `2^31 - 1`.
    fn parse_lead(
        &self,
        digits: &str,
        literal: &str,
        start_precision: i32,
    ) -> Result<i64, IntervalError> {
        let significant = digits.trim_start_matches('0');
        if significant.len() > 10 {
            return Err(self.exceeds(literal));
        }
        let value: i64 = if significant.is_empty() {
            0
        } else {
            significant.parse().map_err(|_| self.exceeds(literal))?
        };
        let max = if (0..10).contains(&start_precision) {
            10i64.pow(start_precision as u32)
        } else {
            1i64 << 31
        };
        if value >= max {
            return Err(self.exceeds(literal));
        }
        Ok(value)
    }

    fn parse_secondary(
        &self,
        digits: &str,
        literal: &str,
        unit: IntervalUnit,
    ) -> Result<i64, IntervalError> {
        let significant = digits.trim_start_matches('0');
        if significant.len() > 10 {
            return Err(self.exceeds(literal));
        }
        let value: i64 = if significant.is_empty() {
            0
        } else {
            significant.parse().map_err(|_| self.exceeds(literal))?
        };
        // secondary_max is present for every unit this is called with
        match unit.secondary_max() {
            Some(max) if value > max => Err(self.exceeds(literal)),
            _ => Ok(value),
        }
    }

    /// Scales captured fractional-second digits into whole milliseconds.
    /// The digit count is already bounded by the pattern.
    fn fractional_millis(digits: Option<&str>) -> i64 {
        match digits {
            Some(d) if !d.is_empty() => {
                let fraction: f64 = format!("0.{d}").parse().unwrap_or(0.0);
                (fraction * 1000.0) as i64
            }
            _ => 0,
        }
    }

    /// Validates an interval literal against this qualifier and normalizes it
    /// into a signed field vector: `[years, months]` for the year-month
    /// family, `[days, hours, minutes, seconds, millis]` for day-time.
    pub fn validate_literal(
        &self,
        literal: &str,
        type_system: &TypeSystem,
    ) -> Result<IntervalValue, IntervalError> {
        let trimmed = literal.trim();
        let (sign, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (-1i8, rest),
            None => match trimmed.strip_prefix('+') {
                Some(rest) => (1i8, rest),
                None => (1i8, trimmed),
            },
        };
        if body.is_empty() {
            return Err(self.unsupported(literal));
        }

        let p = self.effective_start_precision(type_system);
        let fsp = self.effective_fractional_precision();
        let frac = if fsp > 0 {
            format!(r"(?:\.(\d{{1,{fsp}}}))?")
        } else {
            String::new()
        };

        use IntervalUnit::*;
        let pattern = match (self.start_unit, self.end_unit) {
            (Year, None) | (Month, None) | (Day, None) | (Hour, None) | (Minute, None) => {
                r"^(\d+)$".to_string()
            }
            (Year, Some(Month)) => r"^(\d+)-(\d+)$".to_string(),
            (Day, Some(Hour)) => r"^(\d+) (\d{1,2})$".to_string(),
            (Day, Some(Minute)) => r"^(\d+) (\d{1,2}):(\d{1,2})$".to_string(),
            (Day, Some(Second)) => format!(r"^(\d+) (\d{{1,2}}):(\d{{1,2}}):(\d{{1,2}}){frac}$"),
            (Hour, Some(Minute)) => r"^(\d+):(\d{1,2})$".to_string(),
            (Hour, Some(Second)) => format!(r"^(\d+):(\d{{1,2}}):(\d{{1,2}}){frac}$"),
            (Minute, Some(Second)) => format!(r"^(\d+):(\d{{1,2}}){frac}$"),
            (Second, None) => format!(r"^(\d+){frac}$"),
            // the constructor rejects every other combination
            _ => return Err(self.unsupported(literal)),
        };

        let re = Regex::new(&pattern).expect("interval literal pattern is well formed");
        let caps = match re.captures(body) {
            Some(caps) => caps,
            None => return Err(self.unsupported(literal)),
        };
        let group = |i: usize| caps.get(i).map(|m| m.as_str());
        let lead = self.parse_lead(group(1).unwrap_or(""), literal, p)?;

        let fields = match (self.start_unit, self.end_unit) {
            (Year, None) => vec![lead, 0],
            (Year, Some(Month)) => {
                let m = self.parse_secondary(group(2).unwrap_or(""), literal, Month)?;
                vec![lead, m]
            }
            (Month, None) => vec![0, lead],
            (Day, None) => vec![lead, 0, 0, 0, 0],
            (Day, Some(Hour)) => {
                let h = self.parse_secondary(group(2).unwrap_or(""), literal, Hour)?;
                vec![lead, h, 0, 0, 0]
            }
            (Day, Some(Minute)) => {
                let h = self.parse_secondary(group(2).unwrap_or(""), literal, Hour)?;
                let mi = self.parse_secondary(group(3).unwrap_or(""), literal, Minute)?;
                vec![lead, h, mi, 0, 0]
            }
            (Day, Some(Second)) => {
                let h = self.parse_secondary(group(2).unwrap_or(""), literal, Hour)?;
                let mi = self.parse_secondary(group(3).unwrap_or(""), literal, Minute)?;
                let s = self.parse_secondary(group(4).unwrap_or(""), literal, Second)?;
                vec![lead, h, mi, s, Self::fractional_millis(group(5))]
            }
            (Hour, None) => vec![0, lead, 0, 0, 0],
            (Hour, Some(Minute)) => {
                let mi = self.parse_secondary(group(2).unwrap_or(""), literal, Minute)?;
                vec![0, lead, mi, 0, 0]
            }
            (Hour, Some(Second)) => {
                let mi = self.parse_secondary(group(2).unwrap_or(""), literal, Minute)?;
                let s = self.parse_secondary(group(3).unwrap_or(""), literal, Second)?;
                vec![0, lead, mi, s, Self::fractional_millis(group(4))]
            }
            (Minute, None) => vec![0, 0, lead, 0, 0],
            (Minute, Some(Second)) => {
                let s = self.parse_secondary(group(2).unwrap_or(""), literal, Second)?;
                vec![0, 0, lead, s, Self::fractional_millis(group(3))]
            }
            (Second, None) => vec![0, 0, 0, lead, Self::fractional_millis(group(2))],
            _ => return Err(self.unsupported(literal)),
        };

        Ok(IntervalValue { sign, fields })
    }
}

impl Display for IntervalQualifier {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.start_unit)?;
        let single_second =
            self.start_unit == IntervalUnit::Second && self.end_unit.is_none();
        if self.start_precision != PRECISION_NOT_SPECIFIED {
            if single_second && self.fractional_second_precision != PRECISION_NOT_SPECIFIED {
                write!(
                    f,
                    "({}, {})",
                    self.start_precision, self.fractional_second_precision
                )?;
            } else {
                write!(f, "({})", self.start_precision)?;
            }
        }
        if let Some(end) = self.end_unit {
            write!(f, " TO {end}")?;
            if end == IntervalUnit::Second
                && self.fractional_second_precision != PRECISION_NOT_SPECIFIED
            {
                write!(f, "({})", self.fractional_second_precision)?;
            }
        }
        Ok(())
    }
}

/// A validated interval literal: a sign and one slot per positional field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IntervalValue {
    pub sign: i8,
    pub fields: Vec<i64>,
}

impl IntervalValue {
    /// Total signed months; only meaningful for the year-month family
    pub fn months(&self) -> i64 {
        i64::from(self.sign) * (self.fields[0] * 12 + self.fields[1])
    }

    /// Total signed milliseconds; only meaningful for the day-time family
    pub fn millis(&self) -> i64 {
        let [d, h, m, s, ms] = [
            self.fields[0],
            self.fields[1],
            self.fields[2],
            self.fields[3],
            self.fields[4],
        ];
        i64::from(self.sign) * ((((d * 24 + h) * 60 + m) * 60 + s) * 1000 + ms)
    }
}

impl Display for IntervalValue {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        if self.sign < 0 {
            write!(f, "-")?;
        }
        match self.fields.len() {
            2 => write!(f, "{}-{}", self.fields[0], self.fields[1]),
            _ => write!(
                f,
                "{} {}:{}:{}.{:03}",
                self.fields[0], self.fields[1], self.fields[2], self.fields[3], self.fields[4]
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn qualifier(
        start: IntervalUnit,
        end: Option<IntervalUnit>,
        p: i32,
        fsp: i32,
    ) -> IntervalQualifier {
        IntervalQualifier::new(start, end, p, fsp, ParserPos::new(1, 8)).unwrap()
    }

    #[test]
    fn day_to_second_with_fraction() {
        let q = qualifier(IntervalUnit::Day, Some(IntervalUnit::Second), PRECISION_NOT_SPECIFIED, 3);
        let v = q.validate_literal("1 2:3:4.567", &TypeSystem::default()).unwrap();
        assert_eq!(v.sign, 1);
        assert_eq!(v.fields, vec![1, 2, 3, 4, 567]);
    }

    #[test]
    fn negative_year() {
        let q = qualifier(IntervalUnit::Year, None, 2, PRECISION_NOT_SPECIFIED);
        let v = q.validate_literal("-10", &TypeSystem::default()).unwrap();
        assert_eq!(v.sign, -1);
        assert_eq!(v.fields, vec![10, 0]);
    }

    #[test]
    fn year_exceeds_declared_precision() {
        let q = qualifier(IntervalUnit::Year, None, 2, PRECISION_NOT_SPECIFIED);
        let err = q.validate_literal("100", &TypeSystem::default()).unwrap_err();
        assert_eq!(
            err,
            IntervalError::FieldExceedsPrecision {
                literal: "100".to_string(),
                qualifier: "YEAR(2)".to_string(),
                pos: ParserPos::new(1, 8),
            }
        );
    }

    #[test]
    fn lead_field_default_bound_is_2_pow_31() {
        // precision 10 and above falls back to the 2^31 bound
        let q = qualifier(IntervalUnit::Day, None, 10, PRECISION_NOT_SPECIFIED);
        assert!(q.validate_literal("2147483648", &TypeSystem::default()).is_err());
        let v = q.validate_literal("2147483647", &TypeSystem::default()).unwrap();
        assert_eq!(v.fields[0], 2147483647);
    }

    #[test]
    fn secondary_field_ranges() {
        let q = qualifier(
            IntervalUnit::Year,
            Some(IntervalUnit::Month),
            4,
            PRECISION_NOT_SPECIFIED,
        );
        assert!(q.validate_literal("1-11", &TypeSystem::default()).is_ok());
        assert!(matches!(
            q.validate_literal("1-12", &TypeSystem::default()),
            Err(IntervalError::FieldExceedsPrecision { .. })
        ));

        let q = qualifier(
            IntervalUnit::Hour,
            Some(IntervalUnit::Minute),
            4,
            PRECISION_NOT_SPECIFIED,
        );
        assert!(q.validate_literal("25:59", &TypeSystem::default()).is_ok());
        assert!(q.validate_literal("25:60", &TypeSystem::default()).is_err());
    }

    #[rstest]
    #[case("")]
    #[case("  ")]
    #[case("1 2:3")]
    #[case("1:2:3:4")]
    #[case("abc")]
    #[case("1 2:3:4.5678")]
    fn pattern_mismatch_is_unsupported(#[case] literal: &str) {
        let q = qualifier(
            IntervalUnit::Day,
            Some(IntervalUnit::Second),
            PRECISION_NOT_SPECIFIED,
            3,
        );
        assert!(matches!(
            q.validate_literal(literal, &TypeSystem::default()),
            Err(IntervalError::UnsupportedLiteral { .. })
        ));
    }

    #[test]
    fn plus_sign_and_whitespace() {
        let q = qualifier(IntervalUnit::Month, None, 3, PRECISION_NOT_SPECIFIED);
        let v = q.validate_literal("  +7 ", &TypeSystem::default()).unwrap();
        assert_eq!(v.sign, 1);
        assert_eq!(v.fields, vec![0, 7]);
        assert_eq!(v.months(), 7);
    }

    #[test]
    fn second_lead_with_fraction() {
        let q = qualifier(IntervalUnit::Second, None, 2, 3);
        let v = q.validate_literal("59.25", &TypeSystem::default()).unwrap();
        assert_eq!(v.fields, vec![0, 0, 0, 59, 250]);
        assert_eq!(v.millis(), 59_250);
    }

    #[test]
    fn qualifier_canonical_form() {
        let single = qualifier(IntervalUnit::Year, None, 2, PRECISION_NOT_SPECIFIED);
        let redundant = qualifier(
            IntervalUnit::Year,
            Some(IntervalUnit::Year),
            2,
            PRECISION_NOT_SPECIFIED,
        );
        assert_eq!(single, redundant);
        assert!(redundant.end_unit().is_none());
    }

    #[test]
    fn invalid_unit_pair_rejected() {
        assert!(IntervalQualifier::new(
            IntervalUnit::Second,
            Some(IntervalUnit::Year),
            PRECISION_NOT_SPECIFIED,
            PRECISION_NOT_SPECIFIED,
            ParserPos::ZERO,
        )
        .is_err());
        assert!(IntervalQualifier::new(
            IntervalUnit::Month,
            Some(IntervalUnit::Day),
            PRECISION_NOT_SPECIFIED,
            PRECISION_NOT_SPECIFIED,
            ParserPos::ZERO,
        )
        .is_err());
    }
}
