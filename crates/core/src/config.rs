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

use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

use crate::{backoff::BackoffPolicy, hazard::MAX_WORKERS};

/// Tunables shared by every stack variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, SmartDefault, bon::Builder)]
#[serde(default)]
pub struct StackConfig {
    /// Number of hazard slots, i.e. the exclusive upper bound on the
    /// `WorkerId`s passed to `pop`.
    #[default(MAX_WORKERS)]
    #[builder(default = MAX_WORKERS)]
    pub max_workers: usize,

    /// Delay policy after a failed compare-and-swap, or after a spin-lock
    /// acquisition fails once snoozing is exhausted. The mutex baseline parks
    /// instead.
    #[builder(default)]
    pub backoff: BackoffPolicy,
}

#[cfg(all(test, not(loom)))]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = StackConfig::default();
        assert_eq!(config.max_workers, 32);
        assert_eq!(config.backoff, BackoffPolicy::default());
        assert_eq!(StackConfig::builder().build(), config);
    }

    #[test]
    fn test_builder_overrides() {
        let config = StackConfig::builder()
            .max_workers(4)
            .backoff(BackoffPolicy::Fixed(Duration::ZERO))
            .build();
        assert_eq!(config.max_workers, 4);
        assert_eq!(config.backoff, BackoffPolicy::Fixed(Duration::ZERO));
    }
}
