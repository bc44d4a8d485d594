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

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use tagstack_core::StackKind;
use tracing::info;

use crate::{
    config::BenchConfig,
    error::Result,
    report::{Measurement, Report},
    trial::run_trial,
};

/// Shared flag that interrupts a running sweep once set.
pub type CancelHandle = Arc<AtomicBool>;

/// Runs throughput sweeps over the configured variants and thread counts.
#[derive(Debug)]
pub struct Harness {
    config: BenchConfig,
    cancel: CancelHandle,
}

impl Harness {
    /// Validates `config` and prepares a harness for it.
    pub fn new(config: BenchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn config(&self) -> &BenchConfig { &self.config }

    /// A handle that stops the sweep when set, e.g. from a signal handler.
    pub fn cancel_handle(&self) -> CancelHandle { Arc::clone(&self.cancel) }

    pub fn is_cancelled(&self) -> bool { self.cancel.load(Ordering::Acquire) }

    /// Measures every configured kind at every configured thread count.
    ///
    /// On cancellation the measurements completed so far are returned with
    /// [`Report::cancelled`] set; a partly measured pair is discarded.
    pub fn run(&self) -> Result<Report> {
        info!(
            threads = ?self.config.threads,
            kinds = ?self.config.kinds,
            pool_size = self.config.pool_size,
            duration = ?self.config.duration,
            iterations = self.config.iterations,
            "sweep starting"
        );

        let mut report = Report::default();
        for &threads in &self.config.threads {
            for &kind in &self.config.kinds {
                match self.measure(kind, threads)? {
                    Some(measurement) => report.push(measurement),
                    None => {
                        info!(%kind, threads, "sweep cancelled");
                        report.cancelled = true;
                        return Ok(report);
                    }
                }
            }
        }
        info!(measurements = report.len(), "sweep finished");
        Ok(report)
    }

    /// Runs `iterations` trials of `kind` with `threads` workers. Returns
    /// `None` if cancelled before all trials completed.
    pub fn measure(&self, kind: StackKind, threads: usize) -> Result<Option<Measurement>> {
        let mut ops = 0;
        let mut elapsed = Duration::ZERO;
        for iteration in 0..self.config.iterations {
            if self.is_cancelled() {
                return Ok(None);
            }
            let trial = run_trial(&self.config, kind, threads, iteration, &self.cancel)?;
            if trial.cancelled {
                return Ok(None);
            }
            ops += trial.ops;
            elapsed += trial.elapsed;
        }

        let measurement = Measurement::new(
            kind,
            threads,
            self.config.iterations,
            ops,
            elapsed.as_secs_f64(),
        );
        info!(
            %kind,
            threads,
            ops,
            ops_per_sec = measurement.ops_per_sec,
            "measured"
        );
        Ok(Some(measurement))
    }
}
