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

use std::time::Duration;

use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;
use snafu::ensure;
use strum::IntoEnumIterator;
use tagstack_core::{MAX_NODES, MAX_WORKERS, StackConfig, StackKind};

use crate::error::{
    NoStackKindsSnafu, NoThreadCountsSnafu, PoolTooLargeSnafu, PoolTooSmallSnafu, Result,
    ThreadCountOutOfRangeSnafu, ZeroDurationSnafu, ZeroIterationsSnafu,
};

pub const DEFAULT_POOL_SIZE: usize = 20_000;
pub const DEFAULT_DURATION: Duration = Duration::from_secs(5);
pub const DEFAULT_ITERATIONS: usize = 5;
pub const DEFAULT_SEED: u64 = 0x7A65_7374_6163_6B00;

/// `1..=max` as a sweep of thread counts.
pub fn thread_counts_up_to(max: usize) -> Vec<usize> { (1..=max).collect() }

/// Parameters of a throughput sweep.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, SmartDefault, bon::Builder)]
#[serde(default)]
pub struct BenchConfig {
    /// Thread counts to measure, in order.
    #[default(_code = "thread_counts_up_to(MAX_WORKERS)")]
    #[builder(default = thread_counts_up_to(MAX_WORKERS))]
    pub threads: Vec<usize>,

    /// Elements allocated per trial, split evenly between workers.
    #[default(DEFAULT_POOL_SIZE)]
    #[builder(default = DEFAULT_POOL_SIZE)]
    pub pool_size: usize,

    /// How long each trial lets workers run.
    #[default(DEFAULT_DURATION)]
    #[builder(default = DEFAULT_DURATION)]
    pub duration: Duration,

    /// Trials per (kind, thread count) pair.
    #[default(DEFAULT_ITERATIONS)]
    #[builder(default = DEFAULT_ITERATIONS)]
    pub iterations: usize,

    /// Stack variants to compare.
    #[default(_code = "StackKind::iter().collect()")]
    #[builder(default = StackKind::iter().collect())]
    pub kinds: Vec<StackKind>,

    /// Base seed for the workers' coin flips.
    #[default(DEFAULT_SEED)]
    #[builder(default = DEFAULT_SEED)]
    pub seed: u64,

    #[builder(default)]
    pub stack: StackConfig,
}

impl BenchConfig {
    /// Checks the sweep can run as configured.
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.threads.is_empty(), NoThreadCountsSnafu);
        let max = self.stack.max_workers;
        for &threads in &self.threads {
            ensure!(
                (1..=max).contains(&threads),
                ThreadCountOutOfRangeSnafu { threads, max }
            );
        }

        let most = self.threads.iter().copied().max().unwrap_or(1);
        ensure!(
            self.pool_size >= most,
            PoolTooSmallSnafu {
                pool_size: self.pool_size,
                threads:   most,
            }
        );
        ensure!(
            self.pool_size <= MAX_NODES,
            PoolTooLargeSnafu {
                pool_size: self.pool_size,
                max:       MAX_NODES,
            }
        );
        ensure!(!self.duration.is_zero(), ZeroDurationSnafu);
        ensure!(self.iterations > 0, ZeroIterationsSnafu);
        ensure!(!self.kinds.is_empty(), NoStackKindsSnafu);
        Ok(())
    }
}
