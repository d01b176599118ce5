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

//! Read-only view of the external catalog

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use polyfusion_common::types::{PolyField, PolyType};
use polyfusion_expr::rel::TableRef;

pub type TableId = u64;
pub type ColumnId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Table,
    Source,
    View,
}

/// Monotonicity hint for a column, used by sort-related rewrites
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Monotonicity {
    Increasing,
    Decreasing,
    NotMonotonic,
}

#[derive(Debug, Clone)]
pub struct CatalogColumn {
    pub id: ColumnId,
    pub name: String,
    pub ty: PolyType,
    pub monotonicity: Monotonicity,
}

impl CatalogColumn {
    pub fn new(id: ColumnId, name: impl Into<String>, ty: PolyType) -> Self {
        Self {
            id,
            name: name.into(),
            ty,
            monotonicity: Monotonicity::NotMonotonic,
        }
    }
}

/// A named constraint over a set of columns (foreign key or index)
#[derive(Debug, Clone)]
pub struct TableConstraint {
    pub name: String,
    pub columns: Vec<ColumnId>,
}

/// A resolved table as the planner sees it
#[derive(Debug, Clone)]
pub struct TableDescriptor {
    pub id: TableId,
    pub qualified_name: Vec<String>,
    pub kind: TableKind,
    pub columns: Vec<CatalogColumn>,
    pub primary_key: Vec<ColumnId>,
    pub foreign_keys: Vec<TableConstraint>,
    pub indexes: Vec<TableConstraint>,
}

impl TableDescriptor {
    pub fn row_type(&self) -> PolyType {
        PolyType::row(
            self.columns
                .iter()
                .map(|c| PolyField::new(c.name.clone(), c.ty.clone()))
                .collect(),
        )
    }

    pub fn table_ref(&self) -> TableRef {
        TableRef::new(self.id, self.qualified_name.clone(), self.row_type())
    }

    pub fn column(&self, id: ColumnId) -> Option<&CatalogColumn> {
        self.columns.iter().find(|c| c.id == id)
    }

    pub fn column_by_name(&self, name: &str) -> Option<&CatalogColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn is_primary_key(&self, column: ColumnId) -> bool {
        self.primary_key.contains(&column)
    }
}

/// Read-only catalog interface consumed by the planning core. The core
/// never mutates catalog state through this trait.
pub trait CatalogReader: Send + Sync {
    /// Resolves a qualified name to a table descriptor
    fn resolve(&self, qualified_name: &[String]) -> Option<TableDescriptor>;

    fn table(&self, id: TableId) -> Option<TableDescriptor>;

    fn tables(&self) -> Vec<TableDescriptor>;
}

/// In-memory catalog used by tests and embedders without a real catalog
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    tables: RwLock<IndexMap<TableId, Arc<TableDescriptor>>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, table: TableDescriptor) {
        self.tables.write().insert(table.id, Arc::new(table));
    }
}

impl CatalogReader for MemoryCatalog {
    fn resolve(&self, qualified_name: &[String]) -> Option<TableDescriptor> {
        self.tables
            .read()
            .values()
            .find(|t| t.qualified_name == qualified_name)
            .map(|t| t.as_ref().clone())
    }

    fn table(&self, id: TableId) -> Option<TableDescriptor> {
        self.tables.read().get(&id).map(|t| t.as_ref().clone())
    }

    fn tables(&self) -> Vec<TableDescriptor> {
        self.tables
            .read()
            .values()
            .map(|t| t.as_ref().clone())
            .collect()
    }
}
