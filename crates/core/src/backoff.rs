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

/// Delay between failed attempts when no policy is configured.
pub const DEFAULT_DELAY: Duration = Duration::from_micros(250);

/// How long a contended operation waits before retrying.
///
/// Waiting always gives up the CPU: a zero delay yields, anything else
/// sleeps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffPolicy {
    /// The same delay after every failure.
    Fixed(Duration),
    /// Starts at `initial`, doubles after every failure, never exceeds `max`.
    Exponential { initial: Duration, max: Duration },
}

impl Default for BackoffPolicy {
    fn default() -> Self { Self::Fixed(DEFAULT_DELAY) }
}

impl BackoffPolicy {
    /// Fresh retry state for one operation.
    #[must_use]
    pub const fn start(self) -> Backoff {
        Backoff {
            policy: self,
            step:   0,
        }
    }
}

#[derive(Debug)]
pub struct Backoff {
    policy: BackoffPolicy,
    step:   u32,
}

impl Backoff {
    /// Delay the next call to [`Backoff::wait`] will observe.
    #[must_use]
    pub fn delay(&self) -> Duration {
        match self.policy {
            BackoffPolicy::Fixed(delay) => delay,
            BackoffPolicy::Exponential { initial, max } => {
                let factor = 1u32.checked_shl(self.step).unwrap_or(u32::MAX);
                initial.saturating_mul(factor).min(max)
            }
        }
    }

    pub fn wait(&mut self) {
        let delay = self.delay();
        self.step = self.step.saturating_add(1);
        pause(delay);
    }
}

#[cfg(not(loom))]
fn pause(delay: Duration) {
    if delay.is_zero() {
        std::thread::yield_now();
    } else {
        std::thread::sleep(delay);
    }
}

#[cfg(loom)]
fn pause(_delay: Duration) { loom::thread::yield_now(); }

#[cfg(all(test, not(loom)))]
mod tests {
    use std::time::Instant;

    use super::*;

    #[test]
    fn test_default_is_fixed_250us() {
        assert_eq!(
            BackoffPolicy::default(),
            BackoffPolicy::Fixed(Duration::from_micros(250))
        );
    }

    #[test]
    fn test_fixed_delay_never_changes() {
        let mut backoff = BackoffPolicy::Fixed(Duration::from_micros(1)).start();
        for _ in 0..5 {
            assert_eq!(backoff.delay(), Duration::from_micros(1));
            backoff.wait();
        }
    }

    #[test]
    fn test_exponential_doubles_up_to_cap() {
        let mut backoff = BackoffPolicy::Exponential {
            initial: Duration::from_nanos(100),
            max:     Duration::from_nanos(700),
        }
        .start();
        let mut seen = Vec::new();
        for _ in 0..6 {
            seen.push(backoff.delay().as_nanos());
            backoff.wait();
        }
        assert_eq!(seen, vec![100, 200, 400, 700, 700, 700]);
    }

    #[test]
    fn test_exponential_survives_many_steps() {
        let backoff = Backoff {
            policy: BackoffPolicy::Exponential {
                initial: Duration::from_secs(1),
                max:     Duration::from_secs(3),
            },
            step:   u32::MAX,
        };
        assert_eq!(backoff.delay(), Duration::from_secs(3));
    }

    #[test]
    fn test_wait_sleeps_at_least_delay() {
        let mut backoff = BackoffPolicy::Fixed(Duration::from_millis(5)).start();
        let start = Instant::now();
        backoff.wait();
        assert!(start.elapsed() >= Duration::from_millis(5));
    }
}
