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

//! The shared implementation cache, keyed by query digest and placement
//! version

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

/// Cache of compiled plans shared across queries.
///
/// Readers key their lookups by the current placement version; any DDL that
/// changes placements or schema bumps the version, so stale plans are never
/// returned and are dropped on the next bump.
#[derive(Debug, Default)]
pub struct ImplementationCache<P> {
    entries: DashMap<(String, u64), Arc<P>>,
    version: AtomicU64,
}

impl<P> ImplementationCache<P> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            version: AtomicU64::new(0),
        }
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Publishes a new placement version and discards every stale entry
    pub fn invalidate(&self) {
        let next = self.version.fetch_add(1, Ordering::AcqRel) + 1;
        self.entries.retain(|(_, version), _| *version == next);
    }

    pub fn get(&self, digest: &str) -> Option<Arc<P>> {
        let version = self.version();
        self.entries
            .get(&(digest.to_string(), version))
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Stores a plan compiled at `version`; plans built against an older
    /// version are silently dropped
    pub fn put(&self, digest: &str, version: u64, plan: Arc<P>) {
        if version == self.version() {
            self.entries.insert((digest.to_string(), version), plan);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
