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

use parking_lot::Mutex;

use crate::{hazard::WorkerId, node::NodeId};

/// Blocking baseline: a vector of ids behind a mutex.
#[derive(Debug, Default)]
pub struct MutexStack {
    items: Mutex<Vec<NodeId>>,
}

impl MutexStack {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Mutex::new(Vec::with_capacity(capacity)),
        }
    }

    pub fn push(&self, id: NodeId) { self.items.lock().push(id); }

    /// `worker` is accepted for interface parity and ignored.
    pub fn pop(&self, _worker: WorkerId) -> Option<NodeId> { self.items.lock().pop() }

    #[must_use]
    pub fn len(&self) -> usize { self.items.lock().len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.items.lock().is_empty() }
}
