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

//! Renders the SQL AST to text for a given dialect

use itertools::Itertools;

use polyfusion_common::value::PolyValue;

use crate::ast::{
    SqlExpr, SqlJoinKind, SqlQuery, SqlRelation, SqlSelect, SqlSetExpr, SqlSetOperator,
    SqlStatement,
};
use crate::dialect::Dialect;

pub fn statement_to_sql(stmt: &SqlStatement, dialect: &dyn Dialect) -> String {
    match stmt {
        SqlStatement::Query(query) => query_to_sql(query, dialect),
        SqlStatement::Insert {
            table,
            columns,
            source,
        } => {
            let cols = columns
                .iter()
                .map(|c| dialect.quote_identifier(c))
                .join(", ");
            format!(
                "INSERT INTO {} ({}) {}",
                ident_to_sql(table, dialect),
                cols,
                query_to_sql(source, dialect)
            )
        }
        SqlStatement::Update {
            table,
            assignments,
            selection,
        } => {
            let sets = assignments
                .iter()
                .map(|(col, value)| {
                    format!(
                        "{} = {}",
                        dialect.quote_identifier(col),
                        expr_to_sql(value, dialect)
                    )
                })
                .join(", ");
            let mut out = format!("UPDATE {} SET {sets}", ident_to_sql(table, dialect));
            if let Some(selection) = selection {
                out.push_str(&format!(" WHERE {}", expr_to_sql(selection, dialect)));
            }
            out
        }
        SqlStatement::Delete { table, selection } => {
            let mut out = format!("DELETE FROM {}", ident_to_sql(table, dialect));
            if let Some(selection) = selection {
                out.push_str(&format!(" WHERE {}", expr_to_sql(selection, dialect)));
            }
            out
        }
    }
}

pub fn query_to_sql(query: &SqlQuery, dialect: &dyn Dialect) -> String {
    let mut out = set_expr_to_sql(&query.body, dialect);
    if !query.order_by.is_empty() {
        let keys = query
            .order_by
            .iter()
            .map(|k| {
                let mut s = expr_to_sql(&k.expr, dialect);
                if k.descending {
                    s.push_str(" DESC");
                }
                if k.nulls_first {
                    s.push_str(" NULLS FIRST");
                }
                s
            })
            .join(", ");
        out.push_str(&format!(" ORDER BY {keys}"));
    }
    out.push_str(&dialect.format_limit(query.offset, query.fetch));
    out
}

fn set_expr_to_sql(body: &SqlSetExpr, dialect: &dyn Dialect) -> String {
    match body {
        SqlSetExpr::Select(select) => select_to_sql(select, dialect),
        SqlSetExpr::Values(rows) => {
            let rows = rows
                .iter()
                .map(|row| {
                    format!("({})", row.iter().map(|e| expr_to_sql(e, dialect)).join(", "))
                })
                .join(", ");
            format!("VALUES {rows}")
        }
        SqlSetExpr::SetOp {
            op,
            all,
            left,
            right,
        } => {
            let op = match op {
                SqlSetOperator::Union => "UNION",
                SqlSetOperator::Intersect => "INTERSECT",
                SqlSetOperator::Except => "EXCEPT",
            };
            let all = if *all { " ALL" } else { "" };
            format!(
                "{} {op}{all} {}",
                set_expr_to_sql(left, dialect),
                set_expr_to_sql(right, dialect)
            )
        }
    }
}

fn select_to_sql(select: &SqlSelect, dialect: &dyn Dialect) -> String {
    let projection = if select.projection.is_empty() {
        "*".to_string()
    } else {
        select
            .projection
            .iter()
            .map(|item| {
                let mut s = expr_to_sql(&item.expr, dialect);
                if let Some(alias) = &item.alias {
                    s.push_str(&format!(" AS {}", dialect.quote_identifier(alias)));
                }
                s
            })
            .join(", ")
    };
    let mut out = format!("SELECT {projection}");
    match &select.from {
        Some(from) => out.push_str(&format!(" FROM {}", relation_to_sql(from, dialect))),
        None => {
            if let Some(dummy) = dialect.dummy_from() {
                out.push_str(&format!(" FROM {dummy}"));
            }
        }
    }
    if let Some(selection) = &select.selection {
        out.push_str(&format!(" WHERE {}", expr_to_sql(selection, dialect)));
    }
    if !select.group_by.is_empty() {
        let keys = select
            .group_by
            .iter()
            .map(|e| expr_to_sql(e, dialect))
            .join(", ");
        out.push_str(&format!(" GROUP BY {keys}"));
    }
    if let Some(having) = &select.having {
        out.push_str(&format!(" HAVING {}", expr_to_sql(having, dialect)));
    }
    out
}

fn relation_to_sql(relation: &SqlRelation, dialect: &dyn Dialect) -> String {
    match relation {
        SqlRelation::Table { name, alias } => {
            let mut out = ident_to_sql(name, dialect);
            if let Some(alias) = alias {
                out.push_str(&format!(" AS {}", dialect.quote_identifier(alias)));
            }
            out
        }
        SqlRelation::Subquery { query, alias } => format!(
            "({}) AS {}",
            query_to_sql(query, dialect),
            dialect.quote_identifier(alias)
        ),
        SqlRelation::AliasedValues {
            rows,
            alias,
            columns,
        } => {
            let rows = rows
                .iter()
                .map(|row| {
                    format!("({})", row.iter().map(|e| expr_to_sql(e, dialect)).join(", "))
                })
                .join(", ");
            let columns = columns
                .iter()
                .map(|c| dialect.quote_identifier(c))
                .join(", ");
            format!(
                "(VALUES {rows}) AS {} ({columns})",
                dialect.quote_identifier(alias)
            )
        }
        SqlRelation::Join {
            left,
            right,
            kind,
            on,
        } => {
            let left = relation_to_sql(left, dialect);
            let right = relation_to_sql(right, dialect);
            match kind {
                SqlJoinKind::Comma => format!("{left}, {right}"),
                _ => {
                    let keyword = match kind {
                        SqlJoinKind::Inner => "INNER JOIN",
                        SqlJoinKind::Left => "LEFT JOIN",
                        SqlJoinKind::Right => "RIGHT JOIN",
                        SqlJoinKind::Full => "FULL JOIN",
                        SqlJoinKind::Comma => unreachable!(),
                    };
                    let on = on
                        .as_ref()
                        .map(|on| format!(" ON {}", expr_to_sql(on, dialect)))
                        .unwrap_or_else(|| " ON TRUE".to_string());
                    format!("{left} {keyword} {right}{on}")
                }
            }
        }
    }
}

fn ident_to_sql(parts: &[String], dialect: &dyn Dialect) -> String {
    parts
        .iter()
        .map(|p| dialect.quote_identifier(p))
        .join(".")
}

fn literal_to_sql(value: &PolyValue) -> String {
    match value {
        // epoch-based temporal values travel as numbers; adapters declare
        // the matching physical column types
        PolyValue::Date(d) => d.to_string(),
        PolyValue::Time(t) => t.to_string(),
        PolyValue::Timestamp(t) => t.to_string(),
        PolyValue::Interval(v) => {
            if v.fields.len() == 2 {
                v.months().to_string()
            } else {
                v.millis().to_string()
            }
        }
        PolyValue::Document(doc) => format!("'{}'", doc.replace('\'', "''")),
        other => other.to_string(),
    }
}

pub fn expr_to_sql(expr: &SqlExpr, dialect: &dyn Dialect) -> String {
    match expr {
        SqlExpr::Ident(parts) => ident_to_sql(parts, dialect),
        SqlExpr::Literal(value) => literal_to_sql(value),
        SqlExpr::Binary { op, left, right } => format!(
            "({} {op} {})",
            expr_to_sql(left, dialect),
            expr_to_sql(right, dialect)
        ),
        SqlExpr::Unary { op, expr, postfix } => {
            if *postfix {
                format!("({} {op})", expr_to_sql(expr, dialect))
            } else {
                format!("({op} {})", expr_to_sql(expr, dialect))
            }
        }
        SqlExpr::Function {
            name,
            args,
            distinct,
        } => {
            let distinct = if *distinct { "DISTINCT " } else { "" };
            format!(
                "{name}({distinct}{})",
                args.iter().map(|a| expr_to_sql(a, dialect)).join(", ")
            )
        }
        SqlExpr::Case {
            branches,
            else_expr,
        } => {
            let mut out = String::from("CASE");
            for (cond, value) in branches {
                out.push_str(&format!(
                    " WHEN {} THEN {}",
                    expr_to_sql(cond, dialect),
                    expr_to_sql(value, dialect)
                ));
            }
            if let Some(else_expr) = else_expr {
                out.push_str(&format!(" ELSE {}", expr_to_sql(else_expr, dialect)));
            }
            out.push_str(" END");
            out
        }
        SqlExpr::Cast { expr, type_name } => {
            format!("CAST({} AS {type_name})", expr_to_sql(expr, dialect))
        }
        SqlExpr::ArrayIndex { expr, index } => format!(
            "{}[{}]",
            expr_to_sql(expr, dialect),
            expr_to_sql(index, dialect)
        ),
        SqlExpr::Subquery(query) => format!("({})", query_to_sql(query, dialect)),
        SqlExpr::Star => "*".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::AnsiDialect;

    #[test]
    fn select_with_where_renders() {
        let select = SqlSelect {
            projection: vec![],
            from: Some(SqlRelation::Table {
                name: vec!["public".to_string(), "emp".to_string()],
                alias: None,
            }),
            selection: Some(SqlExpr::Binary {
                op: ">".to_string(),
                left: Box::new(SqlExpr::ident(&["empid"])),
                right: Box::new(SqlExpr::Literal(PolyValue::Integer(10))),
            }),
            group_by: vec![],
            having: None,
        };
        let query = SqlQuery::of(SqlSetExpr::Select(Box::new(select)));
        assert_eq!(
            query_to_sql(&query, &AnsiDialect),
            "SELECT * FROM \"public\".\"emp\" WHERE (\"empid\" > 10)"
        );
    }

    #[test]
    fn case_and_cast_render() {
        let expr = SqlExpr::Case {
            branches: vec![(
                SqlExpr::Binary {
                    op: "=".to_string(),
                    left: Box::new(SqlExpr::ident(&["a"])),
                    right: Box::new(SqlExpr::Literal(PolyValue::Integer(1))),
                },
                SqlExpr::Literal(PolyValue::utf8("one")),
            )],
            else_expr: Some(Box::new(SqlExpr::Literal(PolyValue::utf8("other")))),
        };
        assert_eq!(
            expr_to_sql(&expr, &AnsiDialect),
            "CASE WHEN (\"a\" = 1) THEN 'one' ELSE 'other' END"
        );
        let cast = SqlExpr::Cast {
            expr: Box::new(SqlExpr::ident(&["a"])),
            type_name: "BIGINT".to_string(),
        };
        assert_eq!(expr_to_sql(&cast, &AnsiDialect), "CAST(\"a\" AS BIGINT)");
    }
}
