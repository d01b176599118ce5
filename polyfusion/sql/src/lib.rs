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

//! Relational-SQL push-down emitter: lowers algebra sub-trees of the JDBC
//! convention into dialect-rendered SQL statements

pub mod ast;
pub mod dialect;
pub mod rel_to_sql;
pub mod unparse;

pub use ast::{
    SqlExpr, SqlJoinKind, SqlOrderByExpr, SqlQuery, SqlRelation, SqlSelect, SqlSelectItem,
    SqlSetExpr, SqlSetOperator, SqlStatement,
};
pub use dialect::{AnsiDialect, Dialect, MysqlDialect, PostgresDialect};
pub use rel_to_sql::{Clause, RelToSqlConverter};
pub use unparse::{expr_to_sql, query_to_sql, statement_to_sql};
