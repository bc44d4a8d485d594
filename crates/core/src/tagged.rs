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

//! Version-tagged stack head.
//!
//! The head packs the top element's index (low 32 bits) and a version
//! counter (high 32 bits) into one 64-bit word, so both halves move together
//! under a single compare-and-swap. Every successful swap bumps the version
//! by one, which makes a stale `(top, version)` pair fail even when the same
//! element has come back to the top in the meantime (the ABA case).

use crossbeam::utils::CachePadded;

use crate::{
    node::NodeId,
    sync::{AtomicU64, Ordering},
};

#[cfg(not(target_has_atomic = "64"))]
compile_error!("tagstack needs a native 64-bit compare-and-swap for its tagged head");

#[cfg(not(loom))]
const _: () = assert!(
    std::mem::align_of::<AtomicU64>() == std::mem::size_of::<AtomicU64>(),
    "tagged head word must be naturally aligned"
);

/// A consistent view of the head: both fields come from the same update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub top:     Option<NodeId>,
    pub version: u32,
}

impl Snapshot {
    const EMPTY: Self = Self {
        top:     None,
        version: 0,
    };

    const fn pack(self) -> u64 { ((self.version as u64) << 32) | NodeId::encode(self.top) as u64 }

    #[allow(clippy::cast_possible_truncation)]
    const fn unpack(word: u64) -> Self {
        Self {
            top:     NodeId::from_raw(word as u32),
            version: (word >> 32) as u32,
        }
    }
}

#[derive(Debug)]
pub struct TaggedHead {
    word: CachePadded<AtomicU64>,
}

impl TaggedHead {
    #[must_use]
    pub fn new() -> Self {
        Self {
            word: CachePadded::new(AtomicU64::new(Snapshot::EMPTY.pack())),
        }
    }

    #[must_use]
    pub fn load(&self) -> Snapshot { Snapshot::unpack(self.word.load(Ordering::SeqCst)) }

    #[must_use]
    pub fn top(&self) -> Option<NodeId> { self.load().top }

    /// Installs `new_top` with version `expected.version + 1` if the head
    /// still holds exactly `expected`.
    pub fn compare_and_swap(&self, expected: Snapshot, new_top: Option<NodeId>) -> bool {
        let desired = Snapshot {
            top:     new_top,
            version: expected.version.wrapping_add(1),
        };
        self.word
            .compare_exchange(
                expected.pack(),
                desired.pack(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }
}

impl Default for TaggedHead {
    fn default() -> Self { Self::new() }
}
