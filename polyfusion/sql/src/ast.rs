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

//! A minimal SQL AST, shaped after the statements the push-down emitter
//! produces. Rendering is dialect-aware and lives in the unparser.

use polyfusion_common::value::PolyValue;

/// A scalar SQL expression
#[derive(Debug, Clone, PartialEq)]
pub enum SqlExpr {
    /// A possibly-qualified identifier
    Ident(Vec<String>),
    Literal(PolyValue),
    Binary {
        op: String,
        left: Box<SqlExpr>,
        right: Box<SqlExpr>,
    },
    Unary {
        op: String,
        expr: Box<SqlExpr>,
        postfix: bool,
    },
    Function {
        name: String,
        args: Vec<SqlExpr>,
        distinct: bool,
    },
    Case {
        branches: Vec<(SqlExpr, SqlExpr)>,
        else_expr: Option<Box<SqlExpr>>,
    },
    Cast {
        expr: Box<SqlExpr>,
        type_name: String,
    },
    ArrayIndex {
        expr: Box<SqlExpr>,
        index: Box<SqlExpr>,
    },
    Subquery(Box<SqlQuery>),
    /// `*` in a select list
    Star,
}

impl SqlExpr {
    pub fn ident(parts: &[&str]) -> SqlExpr {
        SqlExpr::Ident(parts.iter().map(|p| p.to_string()).collect())
    }
}

/// One select-list item with its optional alias
#[derive(Debug, Clone, PartialEq)]
pub struct SqlSelectItem {
    pub expr: SqlExpr,
    pub alias: Option<String>,
}

/// Join operators the emitter produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlJoinKind {
    /// `FROM a, b` for inner joins with an always-true predicate
    Comma,
    Inner,
    Left,
    Right,
    Full,
}

/// A FROM-clause item
#[derive(Debug, Clone, PartialEq)]
pub enum SqlRelation {
    Table {
        name: Vec<String>,
        alias: Option<String>,
    },
    Subquery {
        query: Box<SqlQuery>,
        alias: String,
    },
    /// `(VALUES ...) AS alias (c1, c2, ...)`
    AliasedValues {
        rows: Vec<Vec<SqlExpr>>,
        alias: String,
        columns: Vec<String>,
    },
    Join {
        left: Box<SqlRelation>,
        right: Box<SqlRelation>,
        kind: SqlJoinKind,
        on: Option<SqlExpr>,
    },
}

/// A `SELECT` without the query-level tail. An empty projection renders
/// as `*`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SqlSelect {
    pub projection: Vec<SqlSelectItem>,
    pub from: Option<SqlRelation>,
    pub selection: Option<SqlExpr>,
    pub group_by: Vec<SqlExpr>,
    pub having: Option<SqlExpr>,
}

/// A query body: a select, literal rows or a set operation
#[derive(Debug, Clone, PartialEq)]
pub enum SqlSetExpr {
    Select(Box<SqlSelect>),
    Values(Vec<Vec<SqlExpr>>),
    SetOp {
        op: SqlSetOperator,
        all: bool,
        left: Box<SqlSetExpr>,
        right: Box<SqlSetExpr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlSetOperator {
    Union,
    Intersect,
    Except,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlOrderByExpr {
    pub expr: SqlExpr,
    pub descending: bool,
    pub nulls_first: bool,
}

/// A full query: body plus ordering and row-window tail
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    pub body: SqlSetExpr,
    pub order_by: Vec<SqlOrderByExpr>,
    pub offset: Option<usize>,
    pub fetch: Option<usize>,
}

impl SqlQuery {
    pub fn of(body: SqlSetExpr) -> Self {
        Self {
            body,
            order_by: Vec::new(),
            offset: None,
            fetch: None,
        }
    }
}

/// A complete statement the emitter can hand to a JDBC-class adapter
#[derive(Debug, Clone, PartialEq)]
pub enum SqlStatement {
    Query(SqlQuery),
    Insert {
        table: Vec<String>,
        columns: Vec<String>,
        source: SqlQuery,
    },
    Update {
        table: Vec<String>,
        assignments: Vec<(String, SqlExpr)>,
        selection: Option<SqlExpr>,
    },
    Delete {
        table: Vec<String>,
        selection: Option<SqlExpr>,
    },
}
