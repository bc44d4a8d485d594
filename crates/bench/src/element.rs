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

//! Pool elements carrying a two-state ownership tag, so a trial can detect
//! an element handed out twice or pushed while still in the stack.

use std::{
    ops::Range,
    sync::atomic::{AtomicU8, Ordering},
};

use tagstack_core::{Link, Node, NodeId};

/// Who holds an element right now.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display, strum_macros::FromRepr)]
#[repr(u8)]
pub enum Ownership {
    /// Held privately by one worker.
    Owned   = 0,
    /// Linked into the stack.
    InStack = 1,
}

/// A stackable element of the benchmark pool.
#[derive(Debug)]
pub struct Element {
    link:  Link,
    state: AtomicU8,
}

impl Node for Element {
    fn link(&self) -> &Link { &self.link }
}

impl Default for Element {
    fn default() -> Self { Self::new() }
}

impl Element {
    pub fn new() -> Self {
        Self {
            link:  Link::new(),
            state: AtomicU8::new(Ownership::Owned as u8),
        }
    }

    pub fn ownership(&self) -> Option<Ownership> {
        Ownership::from_repr(self.state.load(Ordering::SeqCst))
    }

    /// Moves the tag from `from` to `to`. On mismatch the tag is left alone
    /// and the observed state is returned.
    pub fn transition(&self, from: Ownership, to: Ownership) -> Result<(), Option<Ownership>> {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(Ownership::from_repr)
    }
}

/// A fixed set of elements allocated once per trial and split evenly between
/// workers.
#[derive(Debug)]
pub struct Pool {
    elements: Box<[Element]>,
}

impl Pool {
    pub fn new(size: usize) -> Self {
        Self {
            elements: (0..size).map(|_| Element::new()).collect(),
        }
    }

    pub fn elements(&self) -> &[Element] { &self.elements }

    pub fn len(&self) -> usize { self.elements.len() }

    pub fn is_empty(&self) -> bool { self.elements.is_empty() }

    pub fn get(&self, id: NodeId) -> &Element { &self.elements[id.index()] }

    /// Elements each worker receives; the remainder stays unused.
    pub fn per_worker(&self, workers: usize) -> usize { self.len() / workers }

    /// The slice worker `worker` privately owns when `workers` share the pool.
    pub fn share(&self, worker: usize, workers: usize) -> Range<usize> {
        let per = self.per_worker(workers);
        worker * per..(worker + 1) * per
    }
}
