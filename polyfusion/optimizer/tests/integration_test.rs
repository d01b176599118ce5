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

//! End-to-end planner tests over the standard rule set

use std::collections::BTreeSet;
use std::sync::Arc;

use polyfusion_common::cancel::CancelFlag;
use polyfusion_common::config::PlannerConfig;
use polyfusion_common::types::{PolyField, PolyType, TypeSystem};
use polyfusion_common::value::PolyValue;
use polyfusion_common::PolyFusionError;
use polyfusion_expr::rel::TableRef;
use polyfusion_expr::{
    standard_operator_table, OperatorKind, RelBuilder, RelGraph, RexBuilder, StoreId,
};
use polyfusion_optimizer::rules::ConverterRule;
use polyfusion_optimizer::{standard_rules, Planner};

fn rex() -> RexBuilder {
    let _ = env_logger::builder().is_test(true).try_init();
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

#[test]
fn standard_rules_reach_a_fixed_point() {
    let mut graph = RelGraph::new();
    let b = rex();
    // SELECT name FROM emp WHERE deptno = 3 AND 1 < 2, via a projection
    let builder = RelBuilder::new(&mut graph, b.clone()).scan(emp()).unwrap();
    let name = builder.field(1).unwrap();
    let deptno = builder.field(2).unwrap();
    let builder = builder
        .project(vec![deptno, name], vec!["deptno", "name"])
        .unwrap();
    let key = b
        .call(
            OperatorKind::Equals,
            vec![
                builder.field(0).unwrap(),
                RexBuilder::literal_of(PolyValue::Integer(3)),
            ],
        )
        .unwrap();
    let trivial = b
        .call(
            OperatorKind::LessThan,
            vec![
                RexBuilder::literal_of(PolyValue::Integer(1)),
                RexBuilder::literal_of(PolyValue::Integer(2)),
            ],
        )
        .unwrap();
    let cond = b.and(vec![key, trivial]).unwrap();
    let root = builder.filter(cond).unwrap().build().unwrap();

    let planner = Planner::new(standard_rules(), PlannerConfig::default());
    let result = planner
        .plan(&mut graph, &b, root, &CancelFlag::new())
        .unwrap();
    assert!(!result.bound_hit);
    // the trivial conjunct folds away and the filter lands below the project
    let expected = "Project: $2 AS deptno, $1 AS name\
    \n  Filter: =($2, 3)\
    \n    Scan: public.emp";
    assert_eq!(graph.explain(result.root), expected);
}

#[test]
fn conversion_covers_the_whole_tree() {
    let mut graph = RelGraph::new();
    let b = rex();
    let cond = b
        .call(
            OperatorKind::GreaterThan,
            vec![
                RexBuilder::input_ref(0, PolyType::integer()),
                RexBuilder::literal_of(PolyValue::Integer(10)),
            ],
        )
        .unwrap();
    let root = RelBuilder::new(&mut graph, b.clone())
        .scan(emp())
        .unwrap()
        .filter(cond)
        .unwrap()
        .limit(None, Some(5))
        .unwrap()
        .build()
        .unwrap();

    let mut rules = standard_rules();
    rules.add(Arc::new(ConverterRule::jdbc(
        StoreId(1),
        BTreeSet::from([1]),
    )));
    let planner = Planner::new(rules, PlannerConfig::default());
    let result = planner
        .plan(&mut graph, &b, root, &CancelFlag::new())
        .unwrap();
    let expected = "JdbcSort: [], fetch=5\
    \n  JdbcFilter: >($0, 10)\
    \n    JdbcScan: public.emp";
    assert_eq!(graph.explain(result.root), expected);
}

#[test]
fn iteration_bound_is_reported_not_fatal() {
    let mut graph = RelGraph::new();
    let b = rex();
    let cond = b
        .call(
            OperatorKind::GreaterThan,
            vec![
                RexBuilder::input_ref(0, PolyType::integer()),
                RexBuilder::literal_of(PolyValue::Integer(10)),
            ],
        )
        .unwrap();
    let root = RelBuilder::new(&mut graph, b.clone())
        .scan(emp())
        .unwrap()
        .filter(cond)
        .unwrap()
        .build()
        .unwrap();

    let mut rules = standard_rules();
    rules.add(Arc::new(ConverterRule::jdbc(
        StoreId(1),
        BTreeSet::from([1]),
    )));
    let config = PlannerConfig {
        rule_iteration_bound: 1,
        ..PlannerConfig::default()
    };
    let planner = Planner::new(rules, config);
    let result = planner
        .plan(&mut graph, &b, root, &CancelFlag::new())
        .unwrap();
    assert!(result.bound_hit);
}

#[test]
fn cancellation_aborts_planning() {
    let mut graph = RelGraph::new();
    let b = rex();
    let root = RelBuilder::new(&mut graph, b.clone())
        .scan(emp())
        .unwrap()
        .build()
        .unwrap();
    let cancel = CancelFlag::new();
    cancel.cancel();
    let planner = Planner::new(standard_rules(), PlannerConfig::default());
    let err = planner.plan(&mut graph, &b, root, &cancel).unwrap_err();
    assert!(matches!(err, PolyFusionError::Cancelled));
}
