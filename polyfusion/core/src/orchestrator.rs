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

//! The orchestrator: drives plan, convention split and emission, and owns
//! the process-wide registries and the implementation cache

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;

use polyfusion_common::cancel::CancelFlag;
use polyfusion_common::config::PlannerConfig;
use polyfusion_common::error::Result;
use polyfusion_common::plan_err;
use polyfusion_document::{DocumentOperation, RelToDocumentConverter};
use polyfusion_expr::rel::{RelGraph, RelId, TableRef};
use polyfusion_expr::traits::Convention;
use polyfusion_expr::{standard_operator_table, OperatorTable, RexBuilder, StoreId};
use polyfusion_optimizer::rules::{standard_rules, ConverterRule};
use polyfusion_optimizer::Planner;
use polyfusion_physical_expr::{NullAs, RexImpTable, RexTranslator};
use polyfusion_sql::{statement_to_sql, Dialect, RelToSqlConverter};

use crate::cache::ImplementationCache;
use crate::catalog::CatalogReader;
use crate::placement::{DataMigrator, ModifyPlanner, PlacementRegistry};

/// Opaque transaction handle a plan carries for the executor; the core
/// never touches it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionHandle(pub u64);

/// The backend flavor of one adapter, with the state its emitter needs
pub enum Backend {
    Jdbc { dialect: Arc<dyn Dialect> },
    Document { physical_names: HashMap<String, String> },
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Jdbc { dialect } => {
                f.debug_struct("Jdbc").field("dialect", &dialect.name()).finish()
            }
            Backend::Document { physical_names } => f
                .debug_struct("Document")
                .field("physical_names", physical_names)
                .finish(),
        }
    }
}

/// One configured backend store
#[derive(Debug)]
pub struct AdapterDescriptor {
    pub store: StoreId,
    pub backend: Backend,
}

/// One emitted unit of a compiled plan
#[derive(Debug, Clone, PartialEq)]
pub enum PlanFragment {
    /// A statement for a JDBC-class store
    Sql { store: StoreId, statement: String },
    /// A pipeline or collection modification for a document store
    Document {
        store: StoreId,
        operation: DocumentOperation,
    },
    /// A residual sub-tree executed locally, identified by its digest
    Local { digest: String },
}

/// A fully compiled query: per-store fragments plus the transaction the
/// executor runs them under
#[derive(Debug)]
pub struct CompiledPlan {
    pub root_digest: String,
    pub fragments: Vec<PlanFragment>,
    pub transaction: TransactionHandle,
}

/// Per-query mutable state. Each concurrent query owns one; the shared
/// registries stay read-only during a pass.
#[derive(Debug, Clone)]
pub struct QueryContext {
    pub cancel: CancelFlag,
    pub transaction: TransactionHandle,
}

impl QueryContext {
    pub fn new(transaction: TransactionHandle) -> Self {
        Self {
            cancel: CancelFlag::new(),
            transaction,
        }
    }
}

/// Drives parse (external) → plan → translate → emit for every query and
/// owns the rule set, operator table, placement registry and plan cache.
pub struct Orchestrator {
    operator_table: Arc<OperatorTable>,
    imp_table: RexImpTable,
    config: PlannerConfig,
    planner: Planner,
    adapters: Vec<AdapterDescriptor>,
    catalog: Arc<dyn CatalogReader>,
    registry: RwLock<PlacementRegistry>,
    cache: ImplementationCache<CompiledPlan>,
}

impl Orchestrator {
    /// Builds the process-wide state: the standard rules plus one converter
    /// rule per adapter, seeded with the tables placed on it.
    pub fn new(
        config: PlannerConfig,
        catalog: Arc<dyn CatalogReader>,
        adapters: Vec<AdapterDescriptor>,
        registry: PlacementRegistry,
    ) -> Self {
        let mut rules = standard_rules();
        for adapter in &adapters {
            let placed = registry.tables_on(adapter.store);
            let rule = match &adapter.backend {
                Backend::Jdbc { .. } => ConverterRule::jdbc(adapter.store, placed),
                Backend::Document { .. } => ConverterRule::document(adapter.store, placed),
            };
            rules.add(Arc::new(rule));
        }
        let planner = Planner::new(rules, config.clone());
        let operator_table = Arc::new(standard_operator_table());
        let imp_table = RexImpTable::from_operator_table(&operator_table);
        Self {
            operator_table,
            imp_table,
            config,
            planner,
            adapters,
            catalog,
            registry: RwLock::new(registry),
            cache: ImplementationCache::new(),
        }
    }

    pub fn rex_builder(&self) -> RexBuilder {
        RexBuilder::new(Arc::clone(&self.operator_table), self.config.type_system())
    }

    pub fn operator_table(&self) -> &Arc<OperatorTable> {
        &self.operator_table
    }

    pub fn catalog(&self) -> &Arc<dyn CatalogReader> {
        &self.catalog
    }

    pub fn cache(&self) -> &ImplementationCache<CompiledPlan> {
        &self.cache
    }

    /// Resolves a qualified name through the catalog reader
    pub fn resolve_table(&self, qualified_name: &[String]) -> Result<TableRef> {
        match self.catalog.resolve(qualified_name) {
            Some(table) => Ok(table.table_ref()),
            None => plan_err!("table {} not found", qualified_name.join(".")),
        }
    }

    /// Runs a DDL operation against the placement registry. Any change
    /// invalidates the implementation cache atomically.
    pub fn ddl<R>(
        &self,
        migrator: &dyn DataMigrator,
        f: impl FnOnce(&mut ModifyPlanner) -> Result<R>,
    ) -> Result<R> {
        let mut registry = self.registry.write();
        let before = registry.version();
        let mut planner = ModifyPlanner::new(&mut registry, migrator);
        let result = f(&mut planner)?;
        let changed = registry.version() != before;
        drop(registry);
        if changed {
            self.cache.invalidate();
        }
        Ok(result)
    }

    pub fn placements(&self) -> &RwLock<PlacementRegistry> {
        &self.registry
    }

    /// Plans and emits one query. The caller owns the arena; the compiled
    /// plan is cached under the query digest and the placement version.
    pub fn process(
        &self,
        graph: &mut RelGraph,
        root: RelId,
        ctx: &QueryContext,
    ) -> Result<Arc<CompiledPlan>> {
        ctx.cancel.check()?;
        let digest = graph.digest(root).to_string();
        if let Some(plan) = self.cache.get(&digest) {
            debug!("implementation cache hit for {digest}");
            return Ok(plan);
        }
        let version = self.cache.version();

        let rex = self.rex_builder();
        let result = self.planner.plan(graph, &rex, root, &ctx.cancel)?;
        let mut fragments = Vec::new();
        self.split(graph, result.root, ctx, &mut fragments)?;
        if graph.traits(result.root).convention() == Convention::None {
            self.check_local_lowering(graph, result.root)?;
            fragments.push(PlanFragment::Local {
                digest: graph.digest(result.root).to_string(),
            });
        }
        let plan = Arc::new(CompiledPlan {
            root_digest: graph.digest(result.root).to_string(),
            fragments,
            transaction: ctx.transaction,
        });
        self.cache.put(&digest, version, Arc::clone(&plan));
        Ok(plan)
    }

    /// Lowers the residual logical sub-tree's row expressions so that
    /// harmonization failures surface at compile time, not at execution.
    /// Constructs that only the executor can resolve (correlations,
    /// windows) are left for it.
    fn check_local_lowering(&self, graph: &RelGraph, id: RelId) -> Result<()> {
        if graph.traits(id).convention() != Convention::None {
            return Ok(());
        }
        let translator = RexTranslator::new(&self.imp_table);
        for expr in graph.kind(id).expressions() {
            if let Err(e @ polyfusion_common::PolyFusionError::Type(_)) =
                translator.translate(expr, NullAs::Null)
            {
                return Err(e);
            }
        }
        for &input in graph.inputs(id) {
            self.check_local_lowering(graph, input)?;
        }
        Ok(())
    }

    fn adapter(&self, store: StoreId) -> Result<&AdapterDescriptor> {
        match self.adapters.iter().find(|a| a.store == store) {
            Some(adapter) => Ok(adapter),
            None => plan_err!("no adapter registered for store {store}"),
        }
    }

    /// Splits the physical tree into maximal same-convention sub-trees and
    /// emits each through its convention's emitter
    fn split(
        &self,
        graph: &RelGraph,
        id: RelId,
        ctx: &QueryContext,
        fragments: &mut Vec<PlanFragment>,
    ) -> Result<()> {
        ctx.cancel.check()?;
        match graph.traits(id).convention() {
            // interior logical nodes are implied by the residual root the
            // caller records; only converted sub-trees emit here
            Convention::None => {
                for &input in graph.inputs(id) {
                    self.split(graph, input, ctx, fragments)?;
                }
                Ok(())
            }
            Convention::Jdbc(store) => {
                let adapter = self.adapter(store)?;
                let Backend::Jdbc { dialect } = &adapter.backend else {
                    return plan_err!("store {store} is not a JDBC adapter");
                };
                let mut converter =
                    RelToSqlConverter::with_cancel(graph, dialect.as_ref(), ctx.cancel.clone());
                let statement = converter.convert(id)?;
                fragments.push(PlanFragment::Sql {
                    store,
                    statement: statement_to_sql(&statement, dialect.as_ref()),
                });
                Ok(())
            }
            Convention::Document(store) => {
                let adapter = self.adapter(store)?;
                let Backend::Document { physical_names } = &adapter.backend else {
                    return plan_err!("store {store} is not a document adapter");
                };
                let mut converter = RelToDocumentConverter::with_cancel(
                    graph,
                    physical_names.clone(),
                    ctx.cancel.clone(),
                );
                let operation = converter.convert(id)?;
                fragments.push(PlanFragment::Document { store, operation });
                Ok(())
            }
        }
    }
}
