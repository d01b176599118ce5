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

//! Column placements and the placement-aware modify planner.
//!
//! A placement assigns one column's data to one store under a physical
//! name. The planner routes DDL and DML to the stores holding the affected
//! columns and enforces the placement invariants; every violation surfaces
//! the offending object's name.

use std::collections::BTreeSet;

use log::debug;

use polyfusion_common::error::Result;
use polyfusion_common::PlacementError;
use polyfusion_expr::StoreId;

use crate::catalog::{CatalogColumn, ColumnId, TableDescriptor, TableId, TableKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementKind {
    /// Created with the table
    Static,
    /// Explicitly requested by the user
    Manual,
    /// Derived by the planner (e.g. new primary-key columns)
    Automatic,
}

/// Assignment of one column to one store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPlacement {
    pub store: StoreId,
    pub table: TableId,
    pub column: ColumnId,
    pub kind: PlacementKind,
    pub physical_schema: String,
    pub physical_table: String,
    pub physical_column: String,
    pub physical_position: u32,
}

/// Copies data when a placement is added; the real implementation lives in
/// the adapter layer
pub trait DataMigrator: Send + Sync {
    fn copy_columns(
        &self,
        store: StoreId,
        table: &TableDescriptor,
        columns: &[ColumnId],
    ) -> Result<()>;
}

/// Migrator used when no data movement is needed (tests, empty tables)
#[derive(Debug, Default)]
pub struct NoopMigrator;

impl DataMigrator for NoopMigrator {
    fn copy_columns(
        &self,
        _store: StoreId,
        _table: &TableDescriptor,
        _columns: &[ColumnId],
    ) -> Result<()> {
        Ok(())
    }
}

/// One store's share of a data modification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreModify {
    pub store: StoreId,
    pub columns: Vec<ColumnId>,
}

/// All placements of all tables, with a version that readers use to detect
/// stale compiled plans. Mutations go through [ModifyPlanner].
#[derive(Debug, Default)]
pub struct PlacementRegistry {
    placements: Vec<ColumnPlacement>,
    version: u64,
}

impl PlacementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Version observed by plan-cache readers; bumped by every mutation
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn placements_of(&self, table: TableId) -> Vec<&ColumnPlacement> {
        self.placements
            .iter()
            .filter(|p| p.table == table)
            .collect()
    }

    pub fn column_placements(&self, table: TableId, column: ColumnId) -> Vec<&ColumnPlacement> {
        self.placements
            .iter()
            .filter(|p| p.table == table && p.column == column)
            .collect()
    }

    /// Stores holding at least one placement of the table
    pub fn stores_of(&self, table: TableId) -> BTreeSet<StoreId> {
        self.placements
            .iter()
            .filter(|p| p.table == table)
            .map(|p| p.store)
            .collect()
    }

    /// Tables with at least one placement on the store
    pub fn tables_on(&self, store: StoreId) -> BTreeSet<TableId> {
        self.placements
            .iter()
            .filter(|p| p.store == store)
            .map(|p| p.table)
            .collect()
    }

    /// Physical column name of a placement, if the store holds the column
    pub fn physical_column(
        &self,
        store: StoreId,
        table: TableId,
        column: ColumnId,
    ) -> Option<&str> {
        self.placements
            .iter()
            .find(|p| p.store == store && p.table == table && p.column == column)
            .map(|p| p.physical_column.as_str())
    }

    fn insert(&mut self, placement: ColumnPlacement) {
        let exists = self.placements.iter().any(|p| {
            p.store == placement.store
                && p.table == placement.table
                && p.column == placement.column
        });
        if !exists {
            self.placements.push(placement);
        }
        self.version += 1;
    }

    fn remove(&mut self, store: StoreId, table: TableId, column: ColumnId) {
        self.placements
            .retain(|p| !(p.store == store && p.table == table && p.column == column));
        self.version += 1;
    }

    /// Checks the standing invariants for one table: every column placed
    /// somewhere, and every primary-key column placed on every store that
    /// holds any placement of the table.
    pub fn validate(&self, table: &TableDescriptor) -> Result<(), PlacementError> {
        let stores = self.stores_of(table.id);
        if stores.is_empty() {
            return Ok(());
        }
        for column in &table.columns {
            if self.column_placements(table.id, column.id).is_empty() {
                return Err(PlacementError::LastPlacement {
                    table: table.qualified_name.join("."),
                    column: column.name.clone(),
                });
            }
        }
        for &pk in &table.primary_key {
            for &store in &stores {
                if self.physical_column(store, table.id, pk).is_none() {
                    let column = table
                        .column(pk)
                        .map(|c| c.name.clone())
                        .unwrap_or_else(|| pk.to_string());
                    return Err(PlacementError::LastPlacement {
                        table: table.qualified_name.join("."),
                        column,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Routes DDL and DML to the stores holding the affected columns while
/// keeping the placement invariants intact.
pub struct ModifyPlanner<'a> {
    registry: &'a mut PlacementRegistry,
    migrator: &'a dyn DataMigrator,
}

impl<'a> ModifyPlanner<'a> {
    pub fn new(registry: &'a mut PlacementRegistry, migrator: &'a dyn DataMigrator) -> Self {
        Self { registry, migrator }
    }

    fn check_modifiable(table: &TableDescriptor) -> Result<(), PlacementError> {
        if table.kind != TableKind::Table {
            return Err(PlacementError::SourceTable {
                table: table.qualified_name.join("."),
            });
        }
        Ok(())
    }

    /// Places all columns of a new table on one store
    pub fn place_table(
        &mut self,
        table: &TableDescriptor,
        store: StoreId,
        physical_schema: &str,
    ) -> Result<()> {
        for (position, column) in table.columns.iter().enumerate() {
            self.registry.insert(ColumnPlacement {
                store,
                table: table.id,
                column: column.id,
                kind: PlacementKind::Static,
                physical_schema: physical_schema.to_string(),
                physical_table: table.qualified_name.join("_"),
                physical_column: format!("col{}", column.id),
                physical_position: position as u32,
            });
        }
        Ok(())
    }

    /// Routes a column addition to every store holding a placement of the
    /// table, creating automatic placements there
    pub fn add_column(
        &mut self,
        table: &TableDescriptor,
        column: &CatalogColumn,
    ) -> Result<Vec<StoreId>> {
        Self::check_modifiable(table)?;
        let stores: Vec<StoreId> = self.registry.stores_of(table.id).into_iter().collect();
        let position = table.columns.len() as u32;
        for &store in &stores {
            self.registry.insert(ColumnPlacement {
                store,
                table: table.id,
                column: column.id,
                kind: PlacementKind::Automatic,
                physical_schema: String::new(),
                physical_table: table.qualified_name.join("_"),
                physical_column: format!("col{}", column.id),
                physical_position: position,
            });
        }
        debug!(
            "added column {} of table {} on {} store(s)",
            column.name,
            table.qualified_name.join("."),
            stores.len()
        );
        Ok(stores)
    }

    /// Routes a column drop to the stores holding it. Refuses to drop the
    /// sole column of a table or a column a key, index or constraint needs.
    pub fn drop_column(
        &mut self,
        table: &TableDescriptor,
        column: ColumnId,
    ) -> Result<Vec<StoreId>> {
        Self::check_modifiable(table)?;
        let name = table
            .column(column)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| column.to_string());
        if table.columns.len() == 1 {
            return Err(PlacementError::SoleColumn {
                table: table.qualified_name.join("."),
                column: name,
            }
            .into());
        }
        if table.is_primary_key(column) {
            return Err(PlacementError::PrimaryKeyColumn { column: name }.into());
        }
        for constraint in table.foreign_keys.iter().chain(&table.indexes) {
            if constraint.columns.contains(&column) {
                return Err(PlacementError::ReferencedColumn {
                    column: name,
                    referenced_by: constraint.name.clone(),
                }
                .into());
            }
        }
        let stores: Vec<StoreId> = self
            .registry
            .column_placements(table.id, column)
            .iter()
            .map(|p| p.store)
            .collect();
        for &store in &stores {
            self.registry.remove(store, table.id, column);
        }
        Ok(stores)
    }

    /// Adds a placement of the given columns on a store, copying data in
    /// through the migrator. Primary-key columns are always included.
    pub fn add_placement(
        &mut self,
        table: &TableDescriptor,
        store: StoreId,
        columns: &[ColumnId],
        kind: PlacementKind,
    ) -> Result<()> {
        Self::check_modifiable(table)?;
        let mut placed: Vec<ColumnId> = columns.to_vec();
        for &pk in &table.primary_key {
            if !placed.contains(&pk) {
                placed.push(pk);
            }
        }
        self.migrator.copy_columns(store, table, &placed)?;
        for (position, column) in placed.iter().enumerate() {
            self.registry.insert(ColumnPlacement {
                store,
                table: table.id,
                column: *column,
                kind,
                physical_schema: String::new(),
                physical_table: table.qualified_name.join("_"),
                physical_column: format!("col{column}"),
                physical_position: position as u32,
            });
        }
        Ok(())
    }

    /// Drops every placement of the table on a store. Every column must
    /// keep at least one placement elsewhere.
    pub fn drop_placement(&mut self, table: &TableDescriptor, store: StoreId) -> Result<()> {
        Self::check_modifiable(table)?;
        if !self.registry.stores_of(table.id).contains(&store) {
            return Err(PlacementError::UnknownPlacement {
                table: table.qualified_name.join("."),
                store: store.to_string(),
            }
            .into());
        }
        for column in &table.columns {
            let elsewhere = self
                .registry
                .column_placements(table.id, column.id)
                .iter()
                .any(|p| p.store != store);
            let here = self
                .registry
                .physical_column(store, table.id, column.id)
                .is_some();
            if here && !elsewhere {
                return Err(PlacementError::LastPlacement {
                    table: table.qualified_name.join("."),
                    column: column.name.clone(),
                }
                .into());
            }
        }
        for column in &table.columns {
            self.registry.remove(store, table.id, column.id);
        }
        Ok(())
    }

    /// Installs a new primary key: the new key columns gain automatic
    /// placements on every store that held the previous key.
    pub fn add_primary_key(
        &mut self,
        table: &TableDescriptor,
        old_primary_key: &[ColumnId],
        new_primary_key: &[ColumnId],
    ) -> Result<()> {
        Self::check_modifiable(table)?;
        let stores: BTreeSet<StoreId> = match old_primary_key.first() {
            Some(&old) => self
                .registry
                .column_placements(table.id, old)
                .iter()
                .map(|p| p.store)
                .collect(),
            None => self.registry.stores_of(table.id),
        };
        for &store in &stores {
            let missing: Vec<ColumnId> = new_primary_key
                .iter()
                .filter(|&&c| self.registry.physical_column(store, table.id, c).is_none())
                .copied()
                .collect();
            if missing.is_empty() {
                continue;
            }
            self.migrator.copy_columns(store, table, &missing)?;
            for column in missing {
                self.registry.insert(ColumnPlacement {
                    store,
                    table: table.id,
                    column,
                    kind: PlacementKind::Automatic,
                    physical_schema: String::new(),
                    physical_table: table.qualified_name.join("_"),
                    physical_column: format!("col{column}"),
                    physical_position: 0,
                });
            }
        }
        Ok(())
    }

    /// Compiles a data modification into per-store shares: every store that
    /// holds any of the touched columns receives the columns it holds.
    pub fn route_modify(
        &self,
        table: &TableDescriptor,
        touched: &[ColumnId],
    ) -> Result<Vec<StoreModify>> {
        Self::check_modifiable(table)?;
        let mut result = Vec::new();
        for store in self.registry.stores_of(table.id) {
            let columns: Vec<ColumnId> = touched
                .iter()
                .filter(|&&c| self.registry.physical_column(store, table.id, c).is_some())
                .copied()
                .collect();
            if !columns.is_empty() {
                result.push(StoreModify { store, columns });
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyfusion_common::types::PolyType;
    use polyfusion_common::PolyFusionError;
    use crate::catalog::TableConstraint;

    fn emp() -> TableDescriptor {
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
            foreign_keys: vec![TableConstraint {
                name: "fk_dept".to_string(),
                columns: vec![12],
            }],
            indexes: vec![],
        }
    }

    #[test]
    fn invariants_hold_after_accepted_operations() {
        let mut registry = PlacementRegistry::new();
        let migrator = NoopMigrator;
        let table = emp();
        let mut planner = ModifyPlanner::new(&mut registry, &migrator);
        planner.place_table(&table, StoreId(1), "s1").unwrap();
        planner
            .add_placement(&table, StoreId(2), &[11], PlacementKind::Manual)
            .unwrap();
        registry.validate(&table).unwrap();
        // the manual placement was extended with the primary key
        assert!(registry.physical_column(StoreId(2), 1, 10).is_some());
    }

    #[test]
    fn dropping_the_sole_column_is_rejected() {
        let mut registry = PlacementRegistry::new();
        let migrator = NoopMigrator;
        let table = TableDescriptor {
            columns: vec![CatalogColumn::new(10, "only", PolyType::integer())],
            primary_key: vec![],
            foreign_keys: vec![],
            ..emp()
        };
        let mut planner = ModifyPlanner::new(&mut registry, &migrator);
        planner.place_table(&table, StoreId(1), "s1").unwrap();
        let err = planner.drop_column(&table, 10).unwrap_err();
        assert!(matches!(
            err,
            PolyFusionError::Placement(PlacementError::SoleColumn { .. })
        ));
    }

    #[test]
    fn dropping_a_key_or_referenced_column_names_the_offender() {
        let mut registry = PlacementRegistry::new();
        let migrator = NoopMigrator;
        let table = emp();
        let mut planner = ModifyPlanner::new(&mut registry, &migrator);
        planner.place_table(&table, StoreId(1), "s1").unwrap();

        let err = planner.drop_column(&table, 10).unwrap_err();
        assert!(matches!(
            err,
            PolyFusionError::Placement(PlacementError::PrimaryKeyColumn { ref column })
                if column == "empid"
        ));

        let err = planner.drop_column(&table, 12).unwrap_err();
        assert!(matches!(
            err,
            PolyFusionError::Placement(PlacementError::ReferencedColumn {
                ref referenced_by, ..
            }) if referenced_by == "fk_dept"
        ));
    }

    #[test]
    fn dropping_the_last_placement_is_rejected() {
        let mut registry = PlacementRegistry::new();
        let migrator = NoopMigrator;
        let table = emp();
        let mut planner = ModifyPlanner::new(&mut registry, &migrator);
        planner.place_table(&table, StoreId(1), "s1").unwrap();
        let err = planner.drop_placement(&table, StoreId(1)).unwrap_err();
        assert!(matches!(
            err,
            PolyFusionError::Placement(PlacementError::LastPlacement { .. })
        ));

        // with a full second placement the drop goes through
        planner
            .add_placement(&table, StoreId(2), &[10, 11, 12], PlacementKind::Manual)
            .unwrap();
        planner.drop_placement(&table, StoreId(1)).unwrap();
        registry.validate(&table).unwrap();
    }

    #[test]
    fn source_tables_reject_ddl() {
        let mut registry = PlacementRegistry::new();
        let migrator = NoopMigrator;
        let table = TableDescriptor {
            kind: TableKind::Source,
            ..emp()
        };
        let mut planner = ModifyPlanner::new(&mut registry, &migrator);
        let err = planner
            .add_column(&table, &CatalogColumn::new(13, "extra", PolyType::integer()))
            .unwrap_err();
        assert!(matches!(
            err,
            PolyFusionError::Placement(PlacementError::SourceTable { .. })
        ));
    }

    #[test]
    fn new_primary_key_columns_are_placed_with_the_old_key() {
        let mut registry = PlacementRegistry::new();
        let migrator = NoopMigrator;
        let table = emp();
        let mut planner = ModifyPlanner::new(&mut registry, &migrator);
        planner.place_table(&table, StoreId(1), "s1").unwrap();
        // store 2 holds the primary key and the name column only
        planner
            .add_placement(&table, StoreId(2), &[11], PlacementKind::Manual)
            .unwrap();

        planner.add_primary_key(&table, &[10], &[10, 12]).unwrap();
        // deptno was auto-placed on store 2, which held the old key
        assert!(registry.physical_column(StoreId(2), 1, 12).is_some());
        let table = TableDescriptor {
            primary_key: vec![10, 12],
            ..emp()
        };
        registry.validate(&table).unwrap();
    }

    #[test]
    fn modify_routing_targets_stores_holding_the_columns() {
        let mut registry = PlacementRegistry::new();
        let migrator = NoopMigrator;
        let table = emp();
        let mut planner = ModifyPlanner::new(&mut registry, &migrator);
        planner.place_table(&table, StoreId(1), "s1").unwrap();
        planner
            .add_placement(&table, StoreId(2), &[11], PlacementKind::Manual)
            .unwrap();

        let routed = planner.route_modify(&table, &[11]).unwrap();
        assert_eq!(routed.len(), 2);
        let routed = planner.route_modify(&table, &[12]).unwrap();
        assert_eq!(
            routed,
            vec![StoreModify {
                store: StoreId(1),
                columns: vec![12],
            }]
        );
    }

    #[test]
    fn version_bumps_on_every_mutation() {
        let mut registry = PlacementRegistry::new();
        let migrator = NoopMigrator;
        let table = emp();
        let before = registry.version();
        let mut planner = ModifyPlanner::new(&mut registry, &migrator);
        planner.place_table(&table, StoreId(1), "s1").unwrap();
        assert!(registry.version() > before);
    }
}
