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

//! # tagstack-core
//!
//! A lock-free LIFO stack for use as a shared pool under heavy contention,
//! plus a mutex-based and a spin-lock-based stack with the same interface
//! for throughput comparison.
//!
//! Stacks hold [`NodeId`]s: indexes into a slab of elements the caller owns
//! and keeps alive. No stack ever allocates or frees an element.
//!
//! ```
//! use tagstack_core::{Link, LockFreeStack, NodeId, WorkerId};
//!
//! let slab: Vec<Link> = (0..3).map(|_| Link::new()).collect();
//! let stack = LockFreeStack::new(&slab).unwrap();
//! let worker = WorkerId::new(0);
//!
//! stack.push(NodeId::new(0).unwrap());
//! stack.push(NodeId::new(2).unwrap());
//! assert_eq!(stack.pop(worker), NodeId::new(2));
//! assert_eq!(stack.pop(worker), NodeId::new(0));
//! assert_eq!(stack.pop(worker), None);
//! ```

pub mod backoff;
pub mod baseline;
pub mod config;
pub mod error;
pub mod hazard;
pub mod lockfree;
pub mod node;
mod sync;
pub mod tagged;

use serde::{Deserialize, Serialize};

pub use backoff::{Backoff, BackoffPolicy, DEFAULT_DELAY};
pub use baseline::{MutexStack, SpinLockStack};
pub use config::StackConfig;
pub use error::{Error, Result};
pub use hazard::{HazardTable, MAX_WORKERS, WorkerId};
pub use lockfree::LockFreeStack;
pub use node::{Link, MAX_NODES, Node, NodeId};
pub use tagged::{Snapshot, TaggedHead};

/// The operations every stack variant offers, so callers can swap one for
/// another.
pub trait SharedStack: Sync {
    fn kind(&self) -> StackKind;

    /// Hands `id` to the stack. Never fails.
    fn push(&self, id: NodeId);

    /// Takes the top id, or `None` if the stack was empty. Only the
    /// lock-free variant uses `worker`.
    fn pop(&self, worker: WorkerId) -> Option<NodeId>;
}

impl<N: Node + Sync> SharedStack for LockFreeStack<'_, N> {
    fn kind(&self) -> StackKind { StackKind::LockFree }

    fn push(&self, id: NodeId) { Self::push(self, id); }

    fn pop(&self, worker: WorkerId) -> Option<NodeId> { Self::pop(self, worker) }
}

impl SharedStack for MutexStack {
    fn kind(&self) -> StackKind { StackKind::Mutex }

    fn push(&self, id: NodeId) { Self::push(self, id); }

    fn pop(&self, worker: WorkerId) -> Option<NodeId> { Self::pop(self, worker) }
}

impl SharedStack for SpinLockStack {
    fn kind(&self) -> StackKind { StackKind::SpinLock }

    fn push(&self, id: NodeId) { Self::push(self, id); }

    fn pop(&self, worker: WorkerId) -> Option<NodeId> { Self::pop(self, worker) }
}

/// Names the stack variants.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum StackKind {
    LockFree,
    Mutex,
    SpinLock,
}

impl StackKind {
    /// Builds an empty stack of this kind over `slab`.
    ///
    /// The locking variants do not need the slab but reserve room for all of
    /// its elements. `config.backoff` applies to the lock-free and spin-lock
    /// variants; the mutex parks instead.
    pub fn build<'a, N>(
        self,
        slab: &'a [N],
        config: &StackConfig,
    ) -> Result<Box<dyn SharedStack + 'a>>
    where
        N: Node + Sync,
    {
        Ok(match self {
            Self::LockFree => Box::new(LockFreeStack::with_config(slab, config)?),
            Self::Mutex => Box::new(MutexStack::with_capacity(slab.len())),
            Self::SpinLock => Box::new(SpinLockStack::with_backoff(slab.len(), config.backoff)),
        })
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(StackKind::LockFree.to_string(), "lock-free");
        assert_eq!(StackKind::from_str("spin-lock").unwrap(), StackKind::SpinLock);
        assert!(StackKind::from_str("rwlock").is_err());
        assert_eq!(StackKind::iter().count(), 3);
    }

    #[test]
    fn test_built_stacks_report_their_kind() {
        let slab: Vec<Link> = (0..4).map(|_| Link::new()).collect();
        for kind in StackKind::iter() {
            let stack = kind.build(&slab, &StackConfig::default()).unwrap();
            assert_eq!(stack.kind(), kind);
            stack.push(NodeId::new(3).unwrap());
            assert_eq!(stack.pop(WorkerId::new(0)), NodeId::new(3));
            assert_eq!(stack.pop(WorkerId::new(0)), None);
        }
    }
}
