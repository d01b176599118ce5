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

//! The rule library

pub mod aggregate_filter_transpose;
pub mod constant_folding;
pub mod converter;
pub mod eliminate_identity_project;
pub mod filter_join_push_down;
pub mod filter_project_transpose;
pub mod filter_set_op_push_down;
pub mod project_merge;
pub mod sort_limit_merge;

use std::sync::Arc;

use crate::rule::RuleSet;

pub use aggregate_filter_transpose::AggregateFilterTranspose;
pub use constant_folding::ConstantFolding;
pub use converter::ConverterRule;
pub use eliminate_identity_project::EliminateIdentityProject;
pub use filter_join_push_down::FilterJoinPushDown;
pub use filter_project_transpose::FilterProjectTranspose;
pub use filter_set_op_push_down::FilterSetOpPushDown;
pub use project_merge::ProjectMerge;
pub use sort_limit_merge::SortLimitMerge;

/// The logical rule set, in the stable order used to break cost ties.
/// Converter rules are appended per configured adapter.
pub fn standard_rules() -> RuleSet {
    let mut rules = RuleSet::new();
    rules
        .add(Arc::new(ConstantFolding::new()))
        .add(Arc::new(EliminateIdentityProject::new()))
        .add(Arc::new(ProjectMerge::new()))
        .add(Arc::new(FilterProjectTranspose::new()))
        .add(Arc::new(FilterJoinPushDown::new()))
        .add(Arc::new(FilterSetOpPushDown::new()))
        .add(Arc::new(AggregateFilterTranspose::new()))
        .add(Arc::new(SortLimitMerge::new()));
    rules
}
