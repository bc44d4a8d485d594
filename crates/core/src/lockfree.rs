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

//! # Lock-free stack
//!
//! A Treiber stack whose head is a version-tagged index into a slab the
//! caller owns. Push and pop read the head, prepare the new head, and try a
//! single compare-and-swap; a failed swap backs off and starts over.
//!
//! ## Ownership
//!
//! The stack borrows the slab and never allocates or frees elements. An id
//! belongs to the stack from the moment its push succeeds until a pop
//! returns it; at every other time it belongs to exactly one caller.
//! Pushing an id the stack already holds corrupts the list and is the
//! caller's bug.
//!
//! ## Hazard announcements
//!
//! Before reading the top's next-link, pop announces the top in the calling
//! worker's hazard slot and re-checks that it is still the top. This only
//! narrows the window in which another worker can pop that element and have
//! its owner recycle it; it is not a reclamation scheme. Elements must be
//! recycled by a single owner at a time. The version tag is what keeps a
//! stale next-link from ever being installed: any pop or push in between
//! bumps the version and fails the swap.

use snafu::ensure;

use crate::{
    backoff::BackoffPolicy,
    config::StackConfig,
    error::{NoWorkerSlotsSnafu, Result, SlabTooLargeSnafu},
    hazard::{HazardTable, WorkerId},
    node::{Link, MAX_NODES, Node, NodeId},
    tagged::TaggedHead,
};

enum Attempt<T> {
    Done(T),
    Retry,
}

pub struct LockFreeStack<'a, N> {
    slab:    &'a [N],
    head:    TaggedHead,
    hazards: HazardTable,
    backoff: BackoffPolicy,
}

impl<'a, N: Node> LockFreeStack<'a, N> {
    /// Creates an empty stack over `slab` with the default configuration.
    pub fn new(slab: &'a [N]) -> Result<Self> { Self::with_config(slab, &StackConfig::default()) }

    pub fn with_config(slab: &'a [N], config: &StackConfig) -> Result<Self> {
        ensure!(
            slab.len() <= MAX_NODES,
            SlabTooLargeSnafu {
                len: slab.len(),
                max: MAX_NODES,
            }
        );
        ensure!(config.max_workers > 0, NoWorkerSlotsSnafu);

        Ok(Self {
            slab,
            head: TaggedHead::new(),
            hazards: HazardTable::new(config.max_workers),
            backoff: config.backoff,
        })
    }

    /// Pushes `id`, retrying until it succeeds.
    ///
    /// # Panics
    ///
    /// Panics if `id` is outside the slab.
    pub fn push(&self, id: NodeId) {
        let mut backoff = self.backoff.start();
        while !self.try_push(id) {
            backoff.wait();
        }
    }

    /// Pops the top element, retrying until the stack is seen either empty or
    /// successfully popped.
    ///
    /// # Panics
    ///
    /// Panics if `worker` is outside `0..max_workers`.
    pub fn pop(&self, worker: WorkerId) -> Option<NodeId> {
        debug_assert!(
            worker.index() < self.hazards.capacity(),
            "worker {worker} exceeds max_workers {}",
            self.hazards.capacity()
        );
        let mut backoff = self.backoff.start();
        loop {
            match self.try_pop(worker) {
                Attempt::Done(popped) => return popped,
                Attempt::Retry => backoff.wait(),
            }
        }
    }

    fn try_push(&self, id: NodeId) -> bool {
        let snapshot = self.head.load();
        self.link(id).set_next(snapshot.top);
        self.head.compare_and_swap(snapshot, Some(id))
    }

    fn try_pop(&self, worker: WorkerId) -> Attempt<Option<NodeId>> {
        let snapshot = self.head.load();
        let Some(top) = snapshot.top else {
            return Attempt::Done(None);
        };

        self.hazards.publish(worker, top);
        if self.head.top() != Some(top) {
            return Attempt::Retry;
        }

        let next = self.link(top).next();
        if self.head.compare_and_swap(snapshot, next) {
            Attempt::Done(Some(top))
        } else {
            Attempt::Retry
        }
    }

    fn link(&self, id: NodeId) -> &'a Link {
        match self.slab.get(id.index()) {
            Some(node) => node.link(),
            None => panic!("{id:?} is outside a slab of {} elements", self.slab.len()),
        }
    }

    /// Whether the stack held no element at the instant of the read.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.head.top().is_none() }

    /// Number of successful head mutations so far, modulo 2^32.
    #[must_use]
    pub fn version(&self) -> u32 { self.head.load().version }

    #[must_use]
    pub const fn hazards(&self) -> &HazardTable { &self.hazards }

    #[must_use]
    pub const fn slab(&self) -> &'a [N] { self.slab }
}

impl<N> std::fmt::Debug for LockFreeStack<'_, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockFreeStack")
            .field("slab_len", &self.slab.len())
            .field("head", &self.head.load())
            .field("max_workers", &self.hazards.capacity())
            .field("backoff", &self.backoff)
            .finish()
    }
}
