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

//! The per-thread push/pop loop of a trial.

use std::{
    ops::Range,
    sync::atomic::{AtomicBool, Ordering},
    thread,
};

use rand::{Rng, SeedableRng, rngs::SmallRng};
use tagstack_core::{NodeId, SharedStack, WorkerId};

use crate::{
    element::{Ownership, Pool},
    error::{OwnershipViolatedSnafu, Result},
};

/// Start and stop flags shared by one trial's workers.
#[derive(Debug, Default)]
pub struct Signals {
    start: AtomicBool,
    stop:  AtomicBool,
}

impl Signals {
    pub fn new() -> Self { Self::default() }

    pub fn start(&self) { self.start.store(true, Ordering::Release); }

    pub fn stop(&self) { self.stop.store(true, Ordering::Release); }

    pub fn is_stopped(&self) -> bool { self.stop.load(Ordering::Acquire) }

    /// Spins until started. Returns `false` if the trial was stopped first.
    fn wait_for_start(&self) -> bool {
        while !self.start.load(Ordering::Acquire) {
            if self.is_stopped() {
                return false;
            }
            thread::yield_now();
        }
        true
    }
}

/// What one worker leaves behind after a trial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerOutcome {
    pub worker: WorkerId,
    /// Loop iterations, including pushes with nothing held and empty pops.
    pub ops:    u64,
    /// Elements the worker still owns.
    pub held:   Vec<NodeId>,
}

/// Seed for one worker's coin, distinct per worker and per trial.
pub fn worker_seed(seed: u64, iteration: usize, worker: WorkerId) -> u64 {
    seed ^ ((iteration as u64) << 32) ^ worker.index() as u64
}

/// One benchmark worker.
///
/// Owns the pool elements in `owned` and, between the start and stop
/// signals, flips a fair coin each iteration: heads pushes its most recently
/// acquired element, tails pops one into its private set. Every tag change
/// is checked, so an element handed out twice stops the worker with
/// [`Error::OwnershipViolated`](crate::Error::OwnershipViolated).
pub struct Worker<'a> {
    id:    WorkerId,
    stack: &'a dyn SharedStack,
    pool:  &'a Pool,
    rng:   SmallRng,
    held:  Vec<NodeId>,
}

impl<'a> Worker<'a> {
    pub fn new(
        id: WorkerId,
        stack: &'a dyn SharedStack,
        pool: &'a Pool,
        owned: Range<usize>,
        seed: u64,
    ) -> Self {
        Self {
            id,
            stack,
            pool,
            rng: SmallRng::seed_from_u64(seed),
            held: owned.filter_map(NodeId::new).collect(),
        }
    }

    /// Runs until `signals` stops the trial. On an ownership violation the
    /// whole trial is stopped.
    pub fn run(mut self, signals: &Signals) -> Result<WorkerOutcome> {
        let mut ops = 0;
        if signals.wait_for_start() {
            while !signals.is_stopped() {
                if let Err(e) = self.step() {
                    signals.stop();
                    return Err(e);
                }
                ops += 1;
            }
        }
        Ok(WorkerOutcome {
            worker: self.id,
            ops,
            held: self.held,
        })
    }

    fn step(&mut self) -> Result<()> {
        if self.rng.gen_bool(0.5) {
            if let Some(&id) = self.held.last() {
                self.mark(id, Ownership::Owned, Ownership::InStack)?;
                self.held.pop();
                self.stack.push(id);
            }
        } else if let Some(id) = self.stack.pop(self.id) {
            self.mark(id, Ownership::InStack, Ownership::Owned)?;
            self.held.push(id);
        }
        Ok(())
    }

    fn mark(&self, id: NodeId, from: Ownership, to: Ownership) -> Result<()> {
        self.pool
            .get(id)
            .transition(from, to)
            .map_err(|found| {
                OwnershipViolatedSnafu {
                    element: id.index(),
                    expected: from,
                    found,
                }
                .build()
            })
    }
}

#[cfg(test)]
mod tests {
    use tagstack_core::{MutexStack, StackConfig, StackKind};

    use super::*;
    use crate::Error;

    #[test]
    fn test_worker_stopped_before_start_does_nothing() {
        let pool = Pool::new(4);
        let stack = MutexStack::new();
        let signals = Signals::new();
        signals.stop();

        let outcome = Worker::new(WorkerId::new(0), &stack, &pool, 0..4, 1)
            .run(&signals)
            .unwrap();
        assert_eq!(outcome.ops, 0);
        assert_eq!(outcome.held.len(), 4);
    }

    #[test]
    fn test_worker_keeps_elements_it_pops() {
        let pool = Pool::new(8);
        let stack = StackKind::LockFree
            .build(pool.elements(), &StackConfig::default())
            .unwrap();
        let signals = Signals::new();

        let outcome = thread::scope(|s| {
            let handle = s.spawn(|| {
                Worker::new(WorkerId::new(0), stack.as_ref(), &pool, 0..8, 7).run(&signals)
            });
            signals.start();
            thread::sleep(std::time::Duration::from_millis(20));
            signals.stop();
            handle.join().unwrap().unwrap()
        });

        assert!(outcome.ops > 0);
        let mut in_stack = 0;
        while let Some(id) = stack.pop(WorkerId::new(0)) {
            assert_eq!(pool.get(id).ownership(), Some(Ownership::InStack));
            in_stack += 1;
        }
        assert_eq!(outcome.held.len() + in_stack, 8);
        for id in outcome.held {
            assert_eq!(pool.get(id).ownership(), Some(Ownership::Owned));
        }
    }

    #[test]
    fn test_double_handout_is_reported() {
        let pool = Pool::new(1);
        let stack = MutexStack::new();
        let id = NodeId::new(0).unwrap();
        // The element is still tagged Owned, yet the stack offers it.
        stack.push(id);

        let mut worker = Worker::new(WorkerId::new(0), &stack, &pool, 0..0, 0);
        let err = loop {
            if let Err(e) = worker.step() {
                break e;
            }
        };
        assert!(matches!(
            err,
            Error::OwnershipViolated {
                element: 0,
                expected: Ownership::InStack,
                found: Some(Ownership::Owned),
                ..
            }
        ));
    }

    #[test]
    fn test_seeds_differ_per_worker_and_iteration() {
        let a = worker_seed(1, 0, WorkerId::new(0));
        assert_ne!(a, worker_seed(1, 0, WorkerId::new(1)));
        assert_ne!(a, worker_seed(1, 1, WorkerId::new(0)));
    }
}
