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

//! A single timed run of one stack variant at one thread count, followed by
//! a conservation check over the whole pool.

use std::{
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::{Duration, Instant},
};

use snafu::{ResultExt, ensure};
use tagstack_core::{SharedStack, StackKind, WorkerId};
use tracing::{debug, warn};

use crate::{
    config::BenchConfig,
    element::{Ownership, Pool},
    error::{
        BuildStackSnafu, ConservationBrokenSnafu, DuplicateElementSnafu, OwnershipViolatedSnafu,
        Result, SpawnWorkerSnafu, StrayElementSnafu, ThreadCountOutOfRangeSnafu,
        WorkerPanickedSnafu,
    },
    metrics::{BENCH_OPERATIONS, BENCH_TRIAL_DURATION_SECONDS, BENCH_TRIALS},
    worker::{Signals, Worker, WorkerOutcome, worker_seed},
};

/// Granularity at which a sleeping trial notices cancellation.
const CANCEL_POLL: Duration = Duration::from_millis(10);

/// Totals of one trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialOutcome {
    pub ops:       u64,
    /// Time between the start and stop signals.
    pub elapsed:   Duration,
    /// Whether the trial was cut short by cancellation.
    pub cancelled: bool,
}

/// Runs trial `iteration` of `kind` with `threads` workers.
///
/// A fresh pool and stack are built for every trial. Workers run for
/// `config.duration`, or until `cancel` is set. Afterwards the stack is
/// drained and every element of the workers' shares must be accounted for
/// exactly once, with a tag matching where it was found.
///
/// # Errors
///
/// Fails with [`Error::ThreadCountOutOfRange`] unless `threads` is between 1
/// and `config.stack.max_workers`.
///
/// [`Error::ThreadCountOutOfRange`]: crate::Error::ThreadCountOutOfRange
pub fn run_trial(
    config: &BenchConfig,
    kind: StackKind,
    threads: usize,
    iteration: usize,
    cancel: &AtomicBool,
) -> Result<TrialOutcome> {
    let max = config.stack.max_workers;
    ensure!(
        (1..=max).contains(&threads),
        ThreadCountOutOfRangeSnafu { threads, max }
    );

    let pool = Pool::new(config.pool_size);
    let stack = kind
        .build(pool.elements(), &config.stack)
        .context(BuildStackSnafu { kind })?;
    let signals = Signals::new();

    debug!(%kind, threads, iteration, "trial starting");
    let (outcomes, elapsed, cancelled) = thread::scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|i| {
                let worker = WorkerId::new(i);
                let seed = worker_seed(config.seed, iteration, worker);
                let owned = pool.share(i, threads);
                let (stack, pool, signals) = (stack.as_ref(), &pool, &signals);
                thread::Builder::new()
                    .name(format!("{kind}-worker-{i}"))
                    .spawn_scoped(s, move || {
                        Worker::new(worker, stack, pool, owned, seed).run(signals)
                    })
            })
            .collect();

        let started = Instant::now();
        signals.start();
        let cancelled = sleep_unless_cancelled(config.duration, cancel, &signals);
        signals.stop();
        let elapsed = started.elapsed();

        let outcomes: Vec<Result<WorkerOutcome>> = handles
            .into_iter()
            .enumerate()
            .map(|(worker, handle)| {
                handle.context(SpawnWorkerSnafu { worker }).and_then(|h| {
                    h.join()
                        .unwrap_or_else(|_| WorkerPanickedSnafu { worker }.fail())
                })
            })
            .collect();
        (outcomes, elapsed, cancelled)
    });
    let outcomes = outcomes.into_iter().collect::<Result<Vec<_>>>()?;

    verify_conservation(kind, stack.as_ref(), &pool, threads, &outcomes)?;

    let ops = outcomes.iter().map(|o| o.ops).sum();
    let (kind_label, threads_label) = (kind.to_string(), threads.to_string());
    let labels = [kind_label.as_str(), threads_label.as_str()];
    BENCH_OPERATIONS.with_label_values(&labels).inc_by(ops);
    BENCH_TRIALS.with_label_values(&labels).inc();
    BENCH_TRIAL_DURATION_SECONDS
        .with_label_values(&labels)
        .observe(elapsed.as_secs_f64());
    debug!(%kind, threads, iteration, ops, ?elapsed, cancelled, "trial finished");

    Ok(TrialOutcome {
        ops,
        elapsed,
        cancelled,
    })
}

/// Sleeps for `duration` in short slices. Returns `true` if `cancel` ended
/// the wait early.
fn sleep_unless_cancelled(duration: Duration, cancel: &AtomicBool, signals: &Signals) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        if cancel.load(Ordering::Acquire) {
            return true;
        }
        // A worker that hit an ownership violation has already stopped the
        // trial.
        if signals.is_stopped() {
            return false;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return false;
        }
        thread::sleep(remaining.min(CANCEL_POLL));
    }
}

/// Drains `stack` and checks that every element of the workers' shares is
/// either held by exactly one worker and tagged `Owned`, or was in the stack
/// and tagged `InStack`.
fn verify_conservation(
    kind: StackKind,
    stack: &dyn SharedStack,
    pool: &Pool,
    threads: usize,
    outcomes: &[WorkerOutcome],
) -> Result<()> {
    let expected = pool.per_worker(threads) * threads;
    let mut seen = vec![false; expected];
    let mut claim = |index: usize, tag: Option<Ownership>, want: Ownership| -> Result<()> {
        ensure!(index < expected, StrayElementSnafu { kind, element: index });
        ensure!(!seen[index], DuplicateElementSnafu { kind, element: index });
        ensure!(
            tag == Some(want),
            OwnershipViolatedSnafu {
                element:  index,
                expected: want,
                found:    tag,
            }
        );
        seen[index] = true;
        Ok(())
    };

    for id in outcomes.iter().flat_map(|o| &o.held) {
        claim(id.index(), pool.get(*id).ownership(), Ownership::Owned)?;
    }
    let drain = WorkerId::new(0);
    while let Some(id) = stack.pop(drain) {
        claim(id.index(), pool.get(id).ownership(), Ownership::InStack)?;
    }

    let found = seen.iter().filter(|&&s| s).count();
    if found != expected {
        warn!(%kind, threads, expected, found, "elements lost");
    }
    ensure!(
        found == expected,
        ConservationBrokenSnafu {
            kind,
            threads,
            expected,
            found,
        }
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use tagstack_core::{MutexStack, NodeId};
    use test_case::test_case;

    use super::*;
    use crate::Error;

    fn quick_config(threads: usize) -> BenchConfig {
        BenchConfig::builder()
            .threads(vec![threads])
            .pool_size(64)
            .duration(Duration::from_millis(30))
            .iterations(1)
            .build()
    }

    #[test]
    fn test_trial_counts_operations() {
        let cancel = AtomicBool::new(false);
        for kind in [StackKind::LockFree, StackKind::Mutex, StackKind::SpinLock] {
            let outcome = run_trial(&quick_config(4), kind, 4, 0, &cancel).unwrap();
            assert!(outcome.ops > 0, "{kind} did no work");
            assert!(outcome.elapsed >= Duration::from_millis(30));
            assert!(!outcome.cancelled);
        }
    }

    #[test]
    fn test_cancelled_trial_ends_early() {
        let cancel = AtomicBool::new(true);
        let config = BenchConfig::builder()
            .pool_size(16)
            .duration(Duration::from_secs(30))
            .build();

        let outcome = run_trial(&config, StackKind::LockFree, 2, 0, &cancel).unwrap();
        assert!(outcome.cancelled);
        assert!(outcome.elapsed < Duration::from_secs(5));
    }

    #[test_case(StackKind::Mutex, 0 ; "no workers")]
    #[test_case(StackKind::LockFree, 33 ; "more workers than hazard slots")]
    #[test_case(StackKind::SpinLock, 33 ; "spin lock over the limit")]
    fn test_trial_rejects_thread_count(kind: StackKind, threads: usize) {
        let cancel = AtomicBool::new(false);
        let err = run_trial(&quick_config(1), kind, threads, 0, &cancel).unwrap_err();
        assert!(matches!(
            err,
            Error::ThreadCountOutOfRange { threads: t, max: 32, .. } if t == threads
        ));
    }

    #[test]
    fn test_trial_accepts_every_hazard_slot() {
        let cancel = AtomicBool::new(false);
        let config = BenchConfig::builder()
            .pool_size(64)
            .duration(Duration::from_millis(10))
            .build();
        let outcome = run_trial(&config, StackKind::LockFree, 32, 0, &cancel).unwrap();
        assert!(!outcome.cancelled);
    }

    fn outcome(worker: usize, held: &[usize]) -> WorkerOutcome {
        WorkerOutcome {
            worker: WorkerId::new(worker),
            ops:    0,
            held:   held.iter().map(|&i| NodeId::new(i).unwrap()).collect(),
        }
    }

    #[test]
    fn test_conservation_accepts_a_consistent_split() {
        let pool = Pool::new(5);
        let stack = MutexStack::new();
        for i in [1, 3] {
            pool.get(NodeId::new(i).unwrap())
                .transition(Ownership::Owned, Ownership::InStack)
                .unwrap();
            stack.push(NodeId::new(i).unwrap());
        }
        // Element 4 is the unused remainder of 5 / 2.
        let outcomes = [outcome(0, &[0]), outcome(1, &[2])];
        verify_conservation(StackKind::Mutex, &stack, &pool, 2, &outcomes).unwrap();
    }

    #[test]
    fn test_conservation_detects_loss() {
        let pool = Pool::new(4);
        let stack = MutexStack::new();
        let outcomes = [outcome(0, &[0, 1]), outcome(1, &[3])];
        let err = verify_conservation(StackKind::Mutex, &stack, &pool, 2, &outcomes).unwrap_err();
        assert!(matches!(
            err,
            Error::ConservationBroken {
                expected: 4,
                found: 3,
                ..
            }
        ));
    }

    #[test]
    fn test_conservation_detects_duplicate() {
        let pool = Pool::new(2);
        let stack = MutexStack::new();
        let outcomes = [outcome(0, &[0]), outcome(1, &[0, 1])];
        let err = verify_conservation(StackKind::Mutex, &stack, &pool, 2, &outcomes).unwrap_err();
        assert!(matches!(err, Error::DuplicateElement { element: 0, .. }));
    }

    #[test]
    fn test_conservation_detects_stray_and_mislabelled() {
        let pool = Pool::new(3);
        let stack = MutexStack::new();
        // Element 2 is outside both shares of 3 / 2.
        stack.push(NodeId::new(2).unwrap());
        let err = verify_conservation(StackKind::Mutex, &stack, &pool, 2, &[]).unwrap_err();
        assert!(matches!(err, Error::StrayElement { element: 2, .. }));

        // Element 0 sits in the stack but is still tagged Owned.
        stack.push(NodeId::new(0).unwrap());
        let err = verify_conservation(StackKind::Mutex, &stack, &pool, 2, &[]).unwrap_err();
        assert!(matches!(
            err,
            Error::OwnershipViolated {
                element: 0,
                found: Some(Ownership::Owned),
                ..
            }
        ));
    }
}
