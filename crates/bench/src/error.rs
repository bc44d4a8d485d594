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

use snafu::Snafu;
use tagstack_core::StackKind;

use crate::element::Ownership;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    // ---- configuration ----
    #[snafu(display("At least one thread count is required"))]
    NoThreadCounts {
        #[snafu(implicit)]
        loc: snafu::Location,
    },

    #[snafu(display("Thread count {threads} is outside 1..={max}"))]
    ThreadCountOutOfRange {
        threads: usize,
        max:     usize,
        #[snafu(implicit)]
        loc:     snafu::Location,
    },

    #[snafu(display("Pool of {pool_size} elements cannot give each of {threads} threads one"))]
    PoolTooSmall {
        pool_size: usize,
        threads:   usize,
        #[snafu(implicit)]
        loc:       snafu::Location,
    },

    #[snafu(display("Pool of {pool_size} elements exceeds the addressable maximum of {max}"))]
    PoolTooLarge {
        pool_size: usize,
        max:       usize,
        #[snafu(implicit)]
        loc:       snafu::Location,
    },

    #[snafu(display("Trial duration must be non-zero"))]
    ZeroDuration {
        #[snafu(implicit)]
        loc: snafu::Location,
    },

    #[snafu(display("At least one iteration is required"))]
    ZeroIterations {
        #[snafu(implicit)]
        loc: snafu::Location,
    },

    #[snafu(display("At least one stack kind is required"))]
    NoStackKinds {
        #[snafu(implicit)]
        loc: snafu::Location,
    },

    // ---- trial ----
    #[snafu(display("Failed to build {kind} stack"))]
    BuildStack {
        kind:   StackKind,
        source: tagstack_core::Error,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    #[snafu(display("Element {element} expected {expected} but was {found:?}"))]
    OwnershipViolated {
        element:  usize,
        expected: Ownership,
        found:    Option<Ownership>,
        #[snafu(implicit)]
        loc:      snafu::Location,
    },

    #[snafu(display(
        "{kind} with {threads} threads accounts for {found} of {expected} elements"
    ))]
    ConservationBroken {
        kind:     StackKind,
        threads:  usize,
        expected: usize,
        found:    usize,
        #[snafu(implicit)]
        loc:      snafu::Location,
    },

    #[snafu(display("{kind} produced element {element} more than once"))]
    DuplicateElement {
        kind:    StackKind,
        element: usize,
        #[snafu(implicit)]
        loc:     snafu::Location,
    },

    #[snafu(display("{kind} produced element {element}, which no worker owned"))]
    StrayElement {
        kind:    StackKind,
        element: usize,
        #[snafu(implicit)]
        loc:     snafu::Location,
    },

    #[snafu(display("Failed to spawn worker {worker}"))]
    SpawnWorker {
        worker: usize,
        source: std::io::Error,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    #[snafu(display("Worker {worker} panicked"))]
    WorkerPanicked {
        worker: usize,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    // ---- report ----
    #[snafu(display("Failed to encode report as JSON"))]
    EncodeReport {
        source: serde_json::Error,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },
}
