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

//! Relational traits: convention, collation and distribution, combined into
//! the trait set attached to every relational node

use std::fmt::{self, Display, Formatter};

/// Identifier of a backend data store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreId(pub u32);

impl Display for StoreId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The trait that determines which emitter owns a sub-tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Convention {
    /// Logical nodes not yet assigned to a backend
    None,
    /// A relational store reached through a SQL-emitting adapter
    Jdbc(StoreId),
    /// A document store reached through the pipeline emitter
    Document(StoreId),
}

impl Convention {
    /// Stable name used in digests and in the cost-multiplier configuration
    pub fn name(&self) -> String {
        match self {
            Convention::None => "NONE".to_string(),
            Convention::Jdbc(store) => format!("JDBC.{store}"),
            Convention::Document(store) => format!("DOCUMENT.{store}"),
        }
    }

    /// Whether sub-trees of this convention execute inside a backend
    pub fn is_push_down(&self) -> bool {
        !matches!(self, Convention::None)
    }
}

impl Display for Convention {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Sort direction of one field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RelFieldCollation {
    pub field: usize,
    pub descending: bool,
    pub nulls_first: bool,
}

impl RelFieldCollation {
    pub fn asc(field: usize) -> Self {
        Self {
            field,
            descending: false,
            nulls_first: false,
        }
    }

    pub fn desc(field: usize) -> Self {
        Self {
            field,
            descending: true,
            nulls_first: false,
        }
    }
}

impl Display for RelFieldCollation {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "{} {}",
            self.field,
            if self.descending { "DESC" } else { "ASC" }
        )
    }
}

/// Ordering trait: the output is sorted by these fields, in order
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RelCollation(pub Vec<RelFieldCollation>);

impl RelCollation {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn of(fields: Vec<RelFieldCollation>) -> Self {
        Self(fields)
    }

    /// A collation satisfies a required one iff the requirement is a prefix
    pub fn satisfies(&self, required: &RelCollation) -> bool {
        required.0.len() <= self.0.len()
            && self.0.iter().zip(&required.0).all(|(a, b)| a == b)
    }

    /// Lattice join: the longest common prefix
    pub fn join(&self, other: &RelCollation) -> RelCollation {
        let common = self
            .0
            .iter()
            .zip(&other.0)
            .take_while(|(a, b)| a == b)
            .map(|(a, _)| *a)
            .collect();
        RelCollation(common)
    }
}

impl Display for RelCollation {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "[")?;
        for (i, field) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{field}")?;
        }
        write!(f, "]")
    }
}

/// Physical distribution of rows across workers
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum RelDistribution {
    /// No constraint; top of the distribution lattice
    #[default]
    Any,
    /// All rows on a single worker
    Singleton,
    /// Partitioned by hash of the given keys
    Hash(Vec<usize>),
}

impl RelDistribution {
    pub fn satisfies(&self, required: &RelDistribution) -> bool {
        matches!(required, RelDistribution::Any) || self == required
    }

    pub fn join(&self, other: &RelDistribution) -> RelDistribution {
        if self == other {
            self.clone()
        } else {
            RelDistribution::Any
        }
    }
}

impl Display for RelDistribution {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            RelDistribution::Any => write!(f, "any"),
            RelDistribution::Singleton => write!(f, "single"),
            RelDistribution::Hash(keys) => write!(f, "hash{keys:?}"),
        }
    }
}

/// One trait value. Every trait belongs to exactly one [TraitDef].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RelTrait {
    Convention(Convention),
    Collation(RelCollation),
    Distribution(RelDistribution),
}

impl RelTrait {
    pub fn def(&self) -> TraitDef {
        match self {
            RelTrait::Convention(_) => TraitDef::Convention,
            RelTrait::Collation(_) => TraitDef::Collation,
            RelTrait::Distribution(_) => TraitDef::Distribution,
        }
    }
}

/// The registered trait definitions, in the fixed order trait sets use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TraitDef {
    Convention,
    Collation,
    Distribution,
}

impl TraitDef {
    pub const ALL: [TraitDef; 3] = [
        TraitDef::Convention,
        TraitDef::Collation,
        TraitDef::Distribution,
    ];
}

/// An ordered vector with exactly one trait per registered trait-def.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelTraitSet {
    convention: Convention,
    collation: RelCollation,
    distribution: RelDistribution,
}

impl Default for RelTraitSet {
    fn default() -> Self {
        Self::logical()
    }
}

impl RelTraitSet {
    /// The trait set of freshly-built logical nodes
    pub fn logical() -> Self {
        Self {
            convention: Convention::None,
            collation: RelCollation::empty(),
            distribution: RelDistribution::Any,
        }
    }

    pub fn of(convention: Convention) -> Self {
        Self {
            convention,
            ..Self::logical()
        }
    }

    pub fn convention(&self) -> Convention {
        self.convention
    }

    pub fn collation(&self) -> &RelCollation {
        &self.collation
    }

    pub fn distribution(&self) -> &RelDistribution {
        &self.distribution
    }

    pub fn get(&self, def: TraitDef) -> RelTrait {
        match def {
            TraitDef::Convention => RelTrait::Convention(self.convention),
            TraitDef::Collation => RelTrait::Collation(self.collation.clone()),
            TraitDef::Distribution => RelTrait::Distribution(self.distribution.clone()),
        }
    }

    /// Returns a copy with one trait replaced
    pub fn replace(&self, t: RelTrait) -> Self {
        let mut set = self.clone();
        match t {
            RelTrait::Convention(c) => set.convention = c,
            RelTrait::Collation(c) => set.collation = c,
            RelTrait::Distribution(d) => set.distribution = d,
        }
        set
    }

    /// Whether every trait satisfies the corresponding required trait
    pub fn satisfies(&self, required: &RelTraitSet) -> bool {
        self.convention == required.convention
            && self.collation.satisfies(&required.collation)
            && self.distribution.satisfies(&required.distribution)
    }

    /// Per-def lattice join: the weakest trait set satisfied by both
    pub fn join(&self, other: &RelTraitSet) -> RelTraitSet {
        RelTraitSet {
            convention: if self.convention == other.convention {
                self.convention
            } else {
                Convention::None
            },
            collation: self.collation.join(&other.collation),
            distribution: self.distribution.join(&other.distribution),
        }
    }
}

impl Display for RelTraitSet {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}",
            self.convention, self.collation, self.distribution
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collation_prefix_satisfaction() {
        let full = RelCollation::of(vec![
            RelFieldCollation::asc(0),
            RelFieldCollation::desc(1),
        ]);
        let prefix = RelCollation::of(vec![RelFieldCollation::asc(0)]);
        assert!(full.satisfies(&prefix));
        assert!(!prefix.satisfies(&full));
        assert!(full.satisfies(&RelCollation::empty()));
    }

    #[test]
    fn trait_set_replace_and_satisfies() {
        let logical = RelTraitSet::logical();
        let jdbc = logical.replace(RelTrait::Convention(Convention::Jdbc(StoreId(1))));
        assert_eq!(jdbc.convention(), Convention::Jdbc(StoreId(1)));
        assert!(!jdbc.satisfies(&logical));
        assert!(jdbc.satisfies(&RelTraitSet::of(Convention::Jdbc(StoreId(1)))));
    }

    #[test]
    fn lattice_join_weakens() {
        let a = RelTraitSet::of(Convention::Jdbc(StoreId(1)))
            .replace(RelTrait::Collation(RelCollation::of(vec![
                RelFieldCollation::asc(0),
                RelFieldCollation::asc(1),
            ])));
        let b = RelTraitSet::of(Convention::Jdbc(StoreId(1)))
            .replace(RelTrait::Collation(RelCollation::of(vec![
                RelFieldCollation::asc(0),
            ])));
        let joined = a.join(&b);
        assert_eq!(joined.convention(), Convention::Jdbc(StoreId(1)));
        assert_eq!(joined.collation().0.len(), 1);

        let c = RelTraitSet::of(Convention::Document(StoreId(2)));
        assert_eq!(a.join(&c).convention(), Convention::None);
    }

    #[test]
    fn every_def_is_represented() {
        let set = RelTraitSet::logical();
        for def in TraitDef::ALL {
            assert_eq!(set.get(def).def(), def);
        }
    }
}
