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

//! SQL dialects: the per-backend rendering knobs of the emitter

use std::fmt::Debug;

/// Rendering behavior that differs between JDBC-class backends.
pub trait Dialect: Debug + Send + Sync {
    fn name(&self) -> &str;

    /// Quotes an identifier, doubling embedded quote characters
    fn quote_identifier(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    /// Whether `(VALUES ...) AS t (c1, ...)` is accepted in FROM position.
    /// Dialects without it get a UNION ALL of single-row SELECTs.
    fn supports_aliased_values(&self) -> bool {
        true
    }

    /// Single-row dummy source for dialects that cannot SELECT without FROM
    fn dummy_from(&self) -> Option<&str> {
        None
    }

    /// Renders the row-window tail
    fn format_limit(&self, offset: Option<usize>, fetch: Option<usize>) -> String {
        let mut out = String::new();
        if let Some(fetch) = fetch {
            out.push_str(&format!(" LIMIT {fetch}"));
        }
        if let Some(offset) = offset {
            out.push_str(&format!(" OFFSET {offset}"));
        }
        out
    }
}

/// Standard-conforming dialect used when a backend declares nothing special
#[derive(Debug, Default)]
pub struct AnsiDialect;

impl Dialect for AnsiDialect {
    fn name(&self) -> &str {
        "ansi"
    }
}

#[derive(Debug, Default)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn name(&self) -> &str {
        "postgres"
    }
}

#[derive(Debug, Default)]
pub struct MysqlDialect;

impl Dialect for MysqlDialect {
    fn name(&self) -> &str {
        "mysql"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }

    fn supports_aliased_values(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_quoting() {
        assert_eq!(AnsiDialect.quote_identifier("a\"b"), "\"a\"\"b\"");
        assert_eq!(MysqlDialect.quote_identifier("emp"), "`emp`");
    }

    #[test]
    fn limit_rendering() {
        assert_eq!(AnsiDialect.format_limit(Some(5), Some(10)), " LIMIT 10 OFFSET 5");
        assert_eq!(AnsiDialect.format_limit(None, None), "");
    }
}
