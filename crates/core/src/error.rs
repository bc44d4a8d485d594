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

/// Result type for stack construction.
pub type Result<T> = std::result::Result<T, Error>;

/// Reasons a stack refuses to be built.
///
/// Push and pop never fail; these are raised only at construction.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Slab of {len} elements exceeds the addressable maximum of {max}"))]
    SlabTooLarge {
        len: usize,
        max: usize,
        #[snafu(implicit)]
        loc: snafu::Location,
    },

    #[snafu(display("Hazard table needs at least one worker slot"))]
    NoWorkerSlots {
        #[snafu(implicit)]
        loc: snafu::Location,
    },
}
