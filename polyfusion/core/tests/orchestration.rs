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

//! End-to-end orchestration: plan, convert, split and emit across stores

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;

use polyfusion_common::config::PlannerConfig;
use polyfusion_common::types::PolyType;
use polyfusion_common::value::PolyValue;
use polyfusion_common::PolyFusionError;
use polyfusion_core::{
    AdapterDescriptor, Backend, CatalogColumn, MemoryCatalog, ModifyPlanner, NoopMigrator,
    Orchestrator, PlacementRegistry, PlanFragment, QueryContext, TableDescriptor, TableKind,
    TransactionHandle,
};
use polyfusion_document::DocumentOperation;
use polyfusion_expr::rel::{RelGraph, RelId};
use polyfusion_expr::{OperatorKind, RelBuilder, RexBuilder, StoreId};
use polyfusion_sql::AnsiDialect;

fn emp_descriptor() -> TableDescriptor {
    TableDescriptor {
        id: 1,
        qualified_name: vec!["public".to_string(), "emp".to_string()],
        kind: TableKind::Table,
        columns: vec![
            CatalogColumn::new(10, "empid", PolyType::integer()),
            CatalogColumn::new(11, "name", PolyType::varchar(50).with_nullability(true)),
            CatalogColumn::new(12, "deptno", PolyType::integer()),
        ],
        primary_key: vec![10],
        foreign_keys: vec![],
        indexes: vec![],
    }
}

fn archive_descriptor() -> TableDescriptor {
    TableDescriptor {
        id: 3,
        qualified_name: vec!["public".to_string(), "archive".to_string()],
        ..emp_descriptor()
    }
}

fn users_descriptor() -> TableDescriptor {
    TableDescriptor {
        id: 20,
        qualified_name: vec!["db".to_string(), "users".to_string()],
        kind: TableKind::Table,
        columns: vec![
            CatalogColumn::new(30, "age", PolyType::integer()),
            CatalogColumn::new(31, "name", PolyType::varchar(50).with_nullability(true)),
        ],
        primary_key: vec![30],
        foreign_keys: vec![],
        indexes: vec![],
    }
}

fn orchestrator() -> Orchestrator {
    let _ = env_logger::builder().is_test(true).try_init();
    let catalog = Arc::new(MemoryCatalog::new());
    catalog.register(emp_descriptor());
    catalog.register(archive_descriptor());
    catalog.register(users_descriptor());

    let mut registry = PlacementRegistry::new();
    let migrator = NoopMigrator;
    {
        let mut planner = ModifyPlanner::new(&mut registry, &migrator);
        planner
            .place_table(&emp_descriptor(), StoreId(1), "s1")
            .unwrap();
        planner
            .place_table(&users_descriptor(), StoreId(2), "s2")
            .unwrap();
    }

    let adapters = vec![
        AdapterDescriptor {
            store: StoreId(1),
            backend: Backend::Jdbc {
                dialect: Arc::new(AnsiDialect),
            },
        },
        AdapterDescriptor {
            store: StoreId(2),
            backend: Backend::Document {
                physical_names: HashMap::new(),
            },
        },
    ];
    Orchestrator::new(PlannerConfig::default(), catalog, adapters, registry)
}

fn emp_filter_query(orchestrator: &Orchestrator, graph: &mut RelGraph) -> RelId {
    let table = orchestrator
        .resolve_table(&["public".to_string(), "emp".to_string()])
        .unwrap();
    let builder = RelBuilder::new(graph, orchestrator.rex_builder())
        .scan(table)
        .unwrap();
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
    builder.filter(cond).unwrap().build().unwrap()
}

#[test]
fn jdbc_sub_tree_is_emitted_as_sql() {
    let orchestrator = orchestrator();
    let mut graph = RelGraph::new();
    let root = emp_filter_query(&orchestrator, &mut graph);
    let ctx = QueryContext::new(TransactionHandle(1));
    let plan = orchestrator.process(&mut graph, root, &ctx).unwrap();
    assert_eq!(
        plan.fragments,
        vec![PlanFragment::Sql {
            store: StoreId(1),
            statement: "SELECT * FROM \"public\".\"emp\" WHERE (\"emp\".\"empid\" > 10)"
                .to_string(),
        }]
    );
    assert_eq!(plan.transaction, TransactionHandle(1));
}

#[test]
fn document_sub_tree_is_emitted_as_pipeline() {
    let orchestrator = orchestrator();
    let mut graph = RelGraph::new();
    let table = orchestrator
        .resolve_table(&["db".to_string(), "users".to_string()])
        .unwrap();
    let builder = RelBuilder::new(&mut graph, orchestrator.rex_builder())
        .document_scan(table)
        .unwrap();
    let cond = builder
        .rex()
        .call(
            OperatorKind::GreaterThanOrEqual,
            vec![
                builder.field(0).unwrap(),
                RexBuilder::literal_of(PolyValue::Integer(18)),
            ],
        )
        .unwrap();
    let root = builder.filter(cond).unwrap().build().unwrap();

    let ctx = QueryContext::new(TransactionHandle(2));
    let plan = orchestrator.process(&mut graph, root, &ctx).unwrap();
    assert_eq!(
        plan.fragments,
        vec![PlanFragment::Document {
            store: StoreId(2),
            operation: DocumentOperation::Pipeline {
                collection: "users".to_string(),
                stages: vec![json!({ "$match": { "age": { "$gte": 18 } } })],
            },
        }]
    );
}

#[test]
fn unplaced_sub_tree_stays_local() {
    let orchestrator = orchestrator();
    let mut graph = RelGraph::new();
    let emp = orchestrator
        .resolve_table(&["public".to_string(), "emp".to_string()])
        .unwrap();
    let archive = orchestrator
        .resolve_table(&["public".to_string(), "archive".to_string()])
        .unwrap();
    let root = RelBuilder::new(&mut graph, orchestrator.rex_builder())
        .scan(emp)
        .unwrap()
        .scan(archive)
        .unwrap()
        .union(true)
        .unwrap()
        .build()
        .unwrap();

    let ctx = QueryContext::new(TransactionHandle(3));
    let plan = orchestrator.process(&mut graph, root, &ctx).unwrap();
    // emp pushes down, archive has no placement, the union stays local
    assert_eq!(plan.fragments.len(), 2);
    assert!(matches!(
        plan.fragments[0],
        PlanFragment::Sql {
            store: StoreId(1),
            ..
        }
    ));
    assert!(matches!(plan.fragments[1], PlanFragment::Local { .. }));
}

#[test]
fn plans_are_cached_until_placements_change() {
    let orchestrator = orchestrator();
    let ctx = QueryContext::new(TransactionHandle(4));

    let mut graph = RelGraph::new();
    let root = emp_filter_query(&orchestrator, &mut graph);
    let first = orchestrator.process(&mut graph, root, &ctx).unwrap();

    // an equal query in a fresh arena hits the cache
    let mut graph = RelGraph::new();
    let root = emp_filter_query(&orchestrator, &mut graph);
    let second = orchestrator.process(&mut graph, root, &ctx).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    // placement-changing DDL bumps the version and discards the plan
    let migrator = NoopMigrator;
    orchestrator
        .ddl(&migrator, |planner| {
            planner.add_column(
                &emp_descriptor(),
                &CatalogColumn::new(13, "bonus", PolyType::integer().with_nullability(true)),
            )
        })
        .unwrap();
    let mut graph = RelGraph::new();
    let root = emp_filter_query(&orchestrator, &mut graph);
    let third = orchestrator.process(&mut graph, root, &ctx).unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
}

#[test]
fn cancellation_surfaces_before_planning() {
    let orchestrator = orchestrator();
    let mut graph = RelGraph::new();
    let root = emp_filter_query(&orchestrator, &mut graph);
    let ctx = QueryContext::new(TransactionHandle(5));
    ctx.cancel.cancel();
    let err = orchestrator.process(&mut graph, root, &ctx).unwrap_err();
    assert!(matches!(err, PolyFusionError::Cancelled));
}
