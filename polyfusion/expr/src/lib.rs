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

//! Row-expression and relational algebra IR of the polyfusion planning core

pub mod operator;
pub mod rel;
pub mod rex;
pub mod rex_builder;
pub mod traits;
pub mod type_coercion;

pub use operator::{
    standard_operator_table, NullPolicy, OperandCountRange, Operator, OperatorKind,
    OperatorRef, OperatorTable, ReturnTypeInference, Syntax,
};
pub use rel::builder::RelBuilder;
pub use rel::{
    AggregateCall, ConditionalCheck, JoinType, ModifyOperation, RelData, RelGraph, RelId,
    RelKind, SetOpKind, TableRef,
};
pub use rex::{CorrelationId, RexNode, WindowAggregate};
pub use rex_builder::RexBuilder;
pub use traits::{
    Convention, RelCollation, RelDistribution, RelFieldCollation, RelTrait, RelTraitSet,
    StoreId, TraitDef,
};
