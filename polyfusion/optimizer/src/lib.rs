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

//! Rule-driven query optimizer of the polyfusion planning core

pub mod cost;
pub mod planner;
pub mod rule;
pub mod rules;
#[cfg(test)]
pub mod test_util;

pub use cost::{cost_of, RelCost};
pub use planner::{EquivalenceSets, Planner, PlannerResult};
pub use rule::{
    tag_of, ChildPolicy, KindPredicate, OptRule, PlannerContext, RelKindTag, RuleMatch,
    RulePattern, RuleSet,
};
pub use rules::standard_rules;
