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

//! # tagstack-bench
//!
//! Measures push/pop throughput of the tagstack variants as the number of
//! contending threads grows.
//!
//! Each trial allocates a pool of elements, gives every worker a private
//! share, and lets the workers randomly push their elements and pop whatever
//! is on top for a fixed duration. Every element carries an ownership tag,
//! so a stack that hands the same element to two workers, or loses one, fails
//! the trial instead of producing a number.
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use tagstack_bench::{BenchConfig, Harness};
//!
//! let config = BenchConfig::builder()
//!     .threads(vec![1, 2, 4])
//!     .duration(Duration::from_secs(1))
//!     .build();
//! let report = Harness::new(config)?.run()?;
//! print!("{report}");
//! # Ok::<(), tagstack_bench::Error>(())
//! ```

pub mod config;
pub mod element;
pub mod error;
pub mod metrics;
pub mod report;
pub mod runner;
pub mod trial;
pub mod worker;

pub use config::{BenchConfig, thread_counts_up_to};
pub use element::{Element, Ownership, Pool};
pub use error::{Error, Result};
pub use report::{Measurement, Report, ReportFormat};
pub use runner::{CancelHandle, Harness};
pub use trial::{TrialOutcome, run_trial};
pub use worker::{Signals, Worker, WorkerOutcome};
