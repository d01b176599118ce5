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

//! Shared fixtures for rule tests

use std::sync::Arc;

use polyfusion_common::cancel::CancelFlag;
use polyfusion_common::config::PlannerConfig;
use polyfusion_common::types::{PolyField, PolyType, TypeSystem};
use polyfusion_expr::rel::{RelGraph, RelId, TableRef};
use polyfusion_expr::{standard_operator_table, RexBuilder};

use crate::planner::Planner;
use crate::rule::{OptRule, RuleSet};

pub fn rex() -> RexBuilder {
    RexBuilder::new(Arc::new(standard_operator_table()), TypeSystem::default())
}

/// `public.emp(empid, name, deptno, salary)`
pub fn emp() -> TableRef {
    TableRef::new(
        1,
        vec!["public".to_string(), "emp".to_string()],
        PolyType::row(vec![
            PolyField::new("empid", PolyType::integer()),
            PolyField::new("name", PolyType::varchar(50).with_nullability(true)),
            PolyField::new("deptno", PolyType::integer()),
            PolyField::new("salary", PolyType::integer()),
        ]),
    )
}

/// `public.dept(deptno, dname)`
pub fn dept() -> TableRef {
    TableRef::new(
        2,
        vec!["public".to_string(), "dept".to_string()],
        PolyType::row(vec![
            PolyField::new("deptno", PolyType::integer()),
            PolyField::new("dname", PolyType::varchar(20)),
        ]),
    )
}

/// Runs a planner over `root` with exactly the given rules
pub fn optimize_with(
    rules: Vec<Arc<dyn OptRule>>,
    graph: &mut RelGraph,
    root: RelId,
) -> RelId {
    let mut set = RuleSet::new();
    for rule in rules {
        set.add(rule);
    }
    Planner::new(set, PlannerConfig::default())
        .plan(graph, &rex(), root, &CancelFlag::new())
        .unwrap()
        .root
}
