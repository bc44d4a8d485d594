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

//! Intrusive linkage for stackable elements.
//!
//! Elements live in a slab owned by the caller. The stack refers to them by
//! [`NodeId`] (their index in that slab) and only ever rewrites the [`Link`]
//! each element embeds. It never allocates, moves or drops an element.

use derive_more::{Debug, Display};

use crate::sync::{AtomicU32, Ordering};

/// Raw encoding of "no node" in links, hazard slots and the tagged head.
pub(crate) const NIL: u32 = u32::MAX;

/// Largest slab a stack can address. Index `u32::MAX` is reserved for
/// [`NIL`], so valid ids are `0..MAX_NODES`.
pub const MAX_NODES: usize = NIL as usize;

/// Index of an element inside the caller-owned slab.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Display)]
#[debug("NodeId({_0})")]
#[display("{_0}")]
pub struct NodeId(u32);

impl NodeId {
    /// Returns the id for slab position `index`, or `None` if the position
    /// cannot be addressed by a stack.
    #[must_use]
    pub fn new(index: usize) -> Option<Self> {
        u32::try_from(index)
            .ok()
            .filter(|&raw| raw != NIL)
            .map(Self)
    }

    /// Position of the element in its slab.
    #[must_use]
    pub const fn index(self) -> usize { self.0 as usize }

    pub(crate) const fn from_raw(raw: u32) -> Option<Self> {
        if raw == NIL { None } else { Some(Self(raw)) }
    }

    pub(crate) const fn encode(id: Option<Self>) -> u32 {
        match id {
            Some(Self(raw)) => raw,
            None => NIL,
        }
    }
}

/// The single next-link a stackable element embeds.
///
/// While the element sits in a stack the link holds the id of the element
/// below it. Outside a stack its content is meaningless.
#[derive(Debug)]
pub struct Link {
    next: AtomicU32,
}

impl Link {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next: AtomicU32::new(NIL),
        }
    }

    pub(crate) fn next(&self) -> Option<NodeId> {
        NodeId::from_raw(self.next.load(Ordering::Acquire))
    }

    pub(crate) fn set_next(&self, next: Option<NodeId>) {
        self.next.store(NodeId::encode(next), Ordering::Relaxed);
    }
}

impl Default for Link {
    fn default() -> Self { Self::new() }
}

/// Capability every stackable element must expose.
///
/// ```
/// use tagstack_core::{Link, Node};
///
/// struct Job {
///     link:    Link,
///     payload: u64,
/// }
///
/// impl Node for Job {
///     fn link(&self) -> &Link { &self.link }
/// }
/// # let _ = Job { link: Link::new(), payload: 0 }.payload;
/// ```
pub trait Node {
    fn link(&self) -> &Link;
}

impl Node for Link {
    fn link(&self) -> &Link { self }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_rejects_reserved_index() {
        assert_eq!(NodeId::new(0).map(NodeId::index), Some(0));
        assert_eq!(
            NodeId::new(MAX_NODES - 1).map(NodeId::index),
            Some(MAX_NODES - 1)
        );
        assert!(NodeId::new(MAX_NODES).is_none());
        assert!(NodeId::new(usize::MAX).is_none());
    }

    #[test]
    fn test_encode_roundtrips_none() {
        assert_eq!(NodeId::encode(None), NIL);
        assert_eq!(NodeId::from_raw(NIL), None);
        let id = NodeId::new(7).unwrap();
        assert_eq!(NodeId::from_raw(NodeId::encode(Some(id))), Some(id));
    }

    #[test]
    fn test_fresh_link_points_nowhere() {
        let link = Link::default();
        assert_eq!(link.next(), None);

        let below = NodeId::new(3).unwrap();
        link.set_next(Some(below));
        assert_eq!(link.next(), Some(below));
    }

    #[test]
    fn test_node_id_formatting() {
        let id = NodeId::new(42).unwrap();
        assert_eq!(id.to_string(), "42");
        assert_eq!(format!("{id:?}"), "NodeId(42)");
    }
}
