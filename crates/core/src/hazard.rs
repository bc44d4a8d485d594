// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Per-worker hazard announcements.
//!
//! A worker about to read the next-link of the current top publishes that
//! node in its own slot first. Each slot sits on its own cache line so
//! concurrent publishers do not contend.

use crossbeam::utils::CachePadded;
use derive_more::{Debug, Display};

use crate::{
    node::{NIL, NodeId},
    sync::{AtomicU32, Ordering},
};

/// Default number of worker identities a stack accepts.
pub const MAX_WORKERS: usize = 32;

/// Small, externally assigned worker identity in `0..max_workers`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Display)]
#[debug("WorkerId({_0})")]
#[display("{_0}")]
pub struct WorkerId(usize);

impl WorkerId {
    #[must_use]
    pub const fn new(index: usize) -> Self { Self(index) }

    #[must_use]
    pub const fn index(self) -> usize { self.0 }
}

impl From<usize> for WorkerId {
    fn from(index: usize) -> Self { Self(index) }
}

/// Fixed array of hazard slots, one per worker identity.
///
/// Only worker `i` writes slot `i`; anyone may read any slot. A slot keeps
/// its last announcement until the owner publishes again.
#[derive(Debug)]
pub struct HazardTable {
    slots: Box<[CachePadded<AtomicU32>]>,
}

impl HazardTable {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let slots = (0..capacity)
            .map(|_| CachePadded::new(AtomicU32::new(NIL)))
            .collect();
        Self { slots }
    }

    #[must_use]
    pub fn capacity(&self) -> usize { self.slots.len() }

    /// Announces that `worker` is about to dereference `node`.
    ///
    /// # Panics
    ///
    /// Panics if `worker` has no slot in this table.
    pub fn publish(&self, worker: WorkerId, node: NodeId) {
        self.slot(worker)
            .store(NodeId::encode(Some(node)), Ordering::SeqCst);
    }

    /// The node last announced by `worker`, if any.
    ///
    /// # Panics
    ///
    /// Panics if `worker` has no slot in this table.
    #[must_use]
    pub fn published(&self, worker: WorkerId) -> Option<NodeId> {
        NodeId::from_raw(self.slot(worker).load(Ordering::SeqCst))
    }

    fn slot(&self, worker: WorkerId) -> &AtomicU32 {
        match self.slots.get(worker.index()) {
            Some(slot) => slot,
            None => panic!(
                "worker {worker} has no hazard slot, table holds {} workers",
                self.slots.len()
            ),
        }
    }
}
