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

use std::sync::LazyLock;

use prometheus::{
    HistogramVec, IntCounterVec, TextEncoder, register_histogram_vec, register_int_counter_vec,
};

pub const KIND_LABEL: &str = "kind";
pub const THREADS_LABEL: &str = "threads";

pub static BENCH_OPERATIONS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "tagstack_bench_operations_total",
        "Total push/pop loop iterations across all trials",
        &[KIND_LABEL, THREADS_LABEL]
    )
    .unwrap()
});

pub static BENCH_TRIALS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "tagstack_bench_trials_total",
        "Total number of completed trials",
        &[KIND_LABEL, THREADS_LABEL]
    )
    .unwrap()
});

pub static BENCH_TRIAL_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram_vec!(
        "tagstack_bench_trial_duration_seconds",
        "Wall time workers ran during a trial, in seconds",
        &[KIND_LABEL, THREADS_LABEL]
    )
    .unwrap()
});

/// Renders every registered metric in the Prometheus text format.
pub fn render() -> String {
    TextEncoder::new()
        .encode_to_string(&prometheus::gather())
        .unwrap_or_default()
}
