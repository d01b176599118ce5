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

//! End-to-end emission tests: relational trees in, SQL text out

use std::sync::Arc;

use polyfusion_common::types::{PolyField, PolyType, TypeSystem};
use polyfusion_common::value::PolyValue;
use polyfusion_common::PolyFusionError;
use polyfusion_expr::rel::{JoinType, ModifyOperation, RelGraph, RelId, TableRef};
use polyfusion_expr::{
    standard_operator_table, OperatorKind, RelBuilder, RelCollation, RelFieldCollation,
    RexBuilder,
};
use polyfusion_sql::{statement_to_sql, AnsiDialect, MysqlDialect, RelToSqlConverter};

fn rex() -> RexBuilder {
    RexBuilder::new(Arc::new(standard_operator_table()), TypeSystem::default())
}

fn emp() -> TableRef {
    TableRef::new(
        1,
        vec!["public".to_string(), "emp".to_string()],
        PolyType::row(vec![
            PolyField::new("empid", PolyType::integer()),
            PolyField::new("name", PolyType::varchar(50).with_nullability(true)),
            PolyField::new("deptno", PolyType::integer()),
        ]),
    )
}

fn dept() -> TableRef {
    TableRef::new(
        2,
        vec!["public".to_string(), "dept".to_string()],
        PolyType::row(vec![
            PolyField::new("deptno", PolyType::integer()),
            PolyField::new("dname", PolyType::varchar(20)),
        ]),
    )
}

fn to_sql(graph: &RelGraph, root: RelId) -> String {
    let dialect = AnsiDialect;
    let mut converter = RelToSqlConverter::new(graph, &dialect);
    statement_to_sql(&converter.convert(root).unwrap(), &dialect)
}

#[test]
fn identity_projection_is_skipped() {
    let mut graph = RelGraph::new();
    let root = RelBuilder::new(&mut graph, rex())
        .scan(emp())
        .unwrap()
        .project_identity()
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(to_sql(&graph, root), "SELECT * FROM \"public\".\"emp\"");
}

#[test]
fn filter_becomes_where() {
    let mut graph = RelGraph::new();
    let builder = RelBuilder::new(&mut graph, rex()).scan(emp()).unwrap();
    let cond = builder
        .rex()
        .call(
            OperatorKind::GreaterThan,
            vec![
                builder.field(0).unwrap(),
                RexBuilder::literal_of(PolyValue::Integer(10)),
            ],
        )
        .unwrap();
    let root = builder.filter(cond).unwrap().build().unwrap();
    assert_eq!(
        to_sql(&graph, root),
        "SELECT * FROM \"public\".\"emp\" WHERE (\"emp\".\"empid\" > 10)"
    );
}

#[test]
fn filter_over_projection_wraps_into_subselect() {
    let mut graph = RelGraph::new();
    let builder = RelBuilder::new(&mut graph, rex()).scan(emp()).unwrap();
    let empid = builder.field(0).unwrap();
    let builder = builder.project(vec![empid], vec!["id"]).unwrap();
    let cond = builder
        .rex()
        .call(
            OperatorKind::GreaterThan,
            vec![
                builder.field(0).unwrap(),
                RexBuilder::literal_of(PolyValue::Integer(10)),
            ],
        )
        .unwrap();
    let root = builder.filter(cond).unwrap().build().unwrap();
    assert_eq!(
        to_sql(&graph, root),
        "SELECT * FROM (SELECT \"emp\".\"empid\" AS \"id\" FROM \"public\".\"emp\") AS \"t0\" \
         WHERE (\"t0\".\"id\" > 10)"
    );
}

#[test]
fn inner_join_with_true_predicate_is_a_comma_join() {
    let mut graph = RelGraph::new();
    let b = rex();
    let root = RelBuilder::new(&mut graph, b)
        .scan(emp())
        .unwrap()
        .scan(dept())
        .unwrap()
        .join(JoinType::Inner, RexBuilder::bool_literal(true))
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(
        to_sql(&graph, root),
        "SELECT * FROM \"public\".\"emp\", \"public\".\"dept\""
    );
}

#[test]
fn join_condition_resolves_right_side_with_offset() {
    let mut graph = RelGraph::new();
    let b = rex();
    let cond = b
        .call(
            OperatorKind::Equals,
            vec![
                RexBuilder::input_ref(2, PolyType::integer()),
                RexBuilder::input_ref(3, PolyType::integer()),
            ],
        )
        .unwrap();
    let root = RelBuilder::new(&mut graph, b)
        .scan(emp())
        .unwrap()
        .scan(dept())
        .unwrap()
        .join(JoinType::Left, cond)
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(
        to_sql(&graph, root),
        "SELECT * FROM \"public\".\"emp\" LEFT JOIN \"public\".\"dept\" \
         ON (\"emp\".\"deptno\" = \"dept\".\"deptno\")"
    );
}

#[test]
fn aggregate_appends_group_by() {
    let mut graph = RelGraph::new();
    let root = RelBuilder::new(&mut graph, rex())
        .scan(emp())
        .unwrap()
        .aggregate(vec![2], vec![(OperatorKind::Count, vec![], false, "cnt")])
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(
        to_sql(&graph, root),
        "SELECT \"emp\".\"deptno\", COUNT(*) AS \"cnt\" FROM \"public\".\"emp\" \
         GROUP BY \"emp\".\"deptno\""
    );
}

#[test]
fn global_aggregate_omits_group_by() {
    let mut graph = RelGraph::new();
    let root = RelBuilder::new(&mut graph, rex())
        .scan(emp())
        .unwrap()
        .aggregate(vec![], vec![(OperatorKind::Count, vec![], false, "cnt")])
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(
        to_sql(&graph, root),
        "SELECT COUNT(*) AS \"cnt\" FROM \"public\".\"emp\""
    );
}

#[test]
fn filter_over_aggregate_becomes_having() {
    let mut graph = RelGraph::new();
    let builder = RelBuilder::new(&mut graph, rex())
        .scan(emp())
        .unwrap()
        .aggregate(vec![2], vec![(OperatorKind::Count, vec![], false, "cnt")])
        .unwrap();
    let cond = builder
        .rex()
        .call(
            OperatorKind::GreaterThan,
            vec![
                builder.field(1).unwrap(),
                RexBuilder::literal_of(PolyValue::Integer(5)),
            ],
        )
        .unwrap();
    let root = builder.filter(cond).unwrap().build().unwrap();
    assert_eq!(
        to_sql(&graph, root),
        "SELECT \"emp\".\"deptno\", COUNT(*) AS \"cnt\" FROM \"public\".\"emp\" \
         GROUP BY \"emp\".\"deptno\" HAVING (COUNT(*) > 5)"
    );
}

#[test]
fn sort_with_fetch_and_offset() {
    let mut graph = RelGraph::new();
    let root = RelBuilder::new(&mut graph, rex())
        .scan(emp())
        .unwrap()
        .sort_limit(
            RelCollation::of(vec![RelFieldCollation::desc(0)]),
            Some(5),
            Some(10),
        )
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(
        to_sql(&graph, root),
        "SELECT * FROM \"public\".\"emp\" ORDER BY \"emp\".\"empid\" DESC \
         LIMIT 10 OFFSET 5"
    );
}

#[test]
fn values_render_aliased_or_as_union_fallback() {
    let mut graph = RelGraph::new();
    let tuples = vec![
        vec![
            RexBuilder::literal_of(PolyValue::Integer(1)),
            RexBuilder::literal_of(PolyValue::utf8("a")),
        ],
        vec![
            RexBuilder::literal_of(PolyValue::Integer(2)),
            RexBuilder::literal_of(PolyValue::utf8("b")),
        ],
    ];
    let root = RelBuilder::new(&mut graph, rex())
        .values(tuples, vec!["id", "tag"])
        .unwrap()
        .build()
        .unwrap();

    let ansi = AnsiDialect;
    let mut converter = RelToSqlConverter::new(&graph, &ansi);
    assert_eq!(
        statement_to_sql(&converter.convert(root).unwrap(), &ansi),
        "SELECT * FROM (VALUES (1, 'a'), (2, 'b')) AS \"t0\" (\"id\", \"tag\")"
    );

    let mysql = MysqlDialect;
    let mut converter = RelToSqlConverter::new(&graph, &mysql);
    assert_eq!(
        statement_to_sql(&converter.convert(root).unwrap(), &mysql),
        "SELECT 1 AS `id`, 'a' AS `tag` UNION ALL SELECT 2 AS `id`, 'b' AS `tag`"
    );
}

#[test]
fn insert_from_values() {
    let mut graph = RelGraph::new();
    let tuples = vec![vec![
        RexBuilder::literal_of(PolyValue::Integer(7)),
        RexBuilder::literal_of(PolyValue::utf8("Neo")),
        RexBuilder::literal_of(PolyValue::Integer(1)),
    ]];
    let root = RelBuilder::new(&mut graph, rex())
        .values(tuples, vec!["empid", "name", "deptno"])
        .unwrap()
        .modify(emp(), ModifyOperation::Insert)
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(
        to_sql(&graph, root),
        "INSERT INTO \"public\".\"emp\" (\"empid\", \"name\", \"deptno\") \
         VALUES (7, 'Neo', 1)"
    );
}

#[test]
fn update_carries_the_childs_where() {
    let mut graph = RelGraph::new();
    let builder = RelBuilder::new(&mut graph, rex()).scan(emp()).unwrap();
    let cond = builder
        .rex()
        .call(
            OperatorKind::Equals,
            vec![
                builder.field(0).unwrap(),
                RexBuilder::literal_of(PolyValue::Integer(7)),
            ],
        )
        .unwrap();
    let root = builder
        .filter(cond)
        .unwrap()
        .modify(
            emp(),
            ModifyOperation::Update {
                columns: vec!["name".to_string()],
                sources: vec![RexBuilder::literal_of(PolyValue::utf8("Trinity"))],
            },
        )
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(
        to_sql(&graph, root),
        "UPDATE \"public\".\"emp\" SET \"name\" = 'Trinity' WHERE (\"emp\".\"empid\" = 7)"
    );
}

#[test]
fn delete_carries_the_childs_where() {
    let mut graph = RelGraph::new();
    let builder = RelBuilder::new(&mut graph, rex()).scan(emp()).unwrap();
    let cond = builder
        .rex()
        .call(
            OperatorKind::LessThan,
            vec![
                builder.field(2).unwrap(),
                RexBuilder::literal_of(PolyValue::Integer(0)),
            ],
        )
        .unwrap();
    let root = builder
        .filter(cond)
        .unwrap()
        .modify(emp(), ModifyOperation::Delete)
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(
        to_sql(&graph, root),
        "DELETE FROM \"public\".\"emp\" WHERE (\"emp\".\"deptno\" < 0)"
    );
}

#[test]
fn merge_is_a_clear_error() {
    let mut graph = RelGraph::new();
    let root = RelBuilder::new(&mut graph, rex())
        .scan(emp())
        .unwrap()
        .modify(emp(), ModifyOperation::Merge)
        .unwrap()
        .build()
        .unwrap();
    let dialect = AnsiDialect;
    let mut converter = RelToSqlConverter::new(&graph, &dialect);
    let err = converter.convert(root).unwrap_err();
    assert!(matches!(err, PolyFusionError::NotImplemented(_)));
}

#[test]
fn union_renders_as_set_operation() {
    let mut graph = RelGraph::new();
    let root = RelBuilder::new(&mut graph, rex())
        .scan(emp())
        .unwrap()
        .scan(emp())
        .unwrap()
        .union(true)
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(
        to_sql(&graph, root),
        "SELECT * FROM \"public\".\"emp\" UNION ALL SELECT * FROM \"public\".\"emp\""
    );
}
