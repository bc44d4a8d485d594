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

use std::fmt;

use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use tagstack_core::StackKind;

use crate::error::{EncodeReportSnafu, Result};

/// Throughput of one stack variant at one thread count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub kind:         StackKind,
    pub threads:      usize,
    pub iterations:   usize,
    /// Loop iterations summed over all workers and trials.
    pub ops:          u64,
    /// Wall time workers ran, summed over trials.
    pub elapsed_secs: f64,
    pub ops_per_sec:  f64,
}

impl Measurement {
    pub fn new(
        kind: StackKind,
        threads: usize,
        iterations: usize,
        ops: u64,
        elapsed_secs: f64,
    ) -> Self {
        let ops_per_sec = if elapsed_secs > 0.0 {
            ops as f64 / elapsed_secs
        } else {
            0.0
        };
        Self {
            kind,
            threads,
            iterations,
            ops,
            elapsed_secs,
            ops_per_sec,
        }
    }
}

/// How a [`Report`] is rendered.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReportFormat {
    /// One line per thread count.
    #[default]
    Text,
    Json,
}

/// Results of a sweep, in the order they were measured.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub measurements: Vec<Measurement>,
    /// The sweep was interrupted; later measurements are missing.
    pub cancelled:    bool,
}

impl Report {
    pub fn push(&mut self, measurement: Measurement) { self.measurements.push(measurement); }

    pub fn len(&self) -> usize { self.measurements.len() }

    pub fn is_empty(&self) -> bool { self.measurements.is_empty() }

    pub fn find(&self, kind: StackKind, threads: usize) -> Option<&Measurement> {
        self.measurements
            .iter()
            .find(|m| m.kind == kind && m.threads == threads)
    }

    /// Thread counts in first-measured order.
    pub fn thread_counts(&self) -> Vec<usize> {
        let mut counts: Vec<usize> = Vec::new();
        for m in &self.measurements {
            if !counts.contains(&m.threads) {
                counts.push(m.threads);
            }
        }
        counts
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context(EncodeReportSnafu)
    }

    pub fn render(&self, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Text => Ok(self.to_string()),
            ReportFormat::Json => self.to_json(),
        }
    }
}

/// `N threads, lock-free: X/sec, mutex: Y/sec, spin-lock: Z/sec`, one line
/// per thread count.
impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for threads in self.thread_counts() {
            write!(f, "{threads} threads")?;
            for m in self.measurements.iter().filter(|m| m.threads == threads) {
                write!(f, ", {}: {:.0}/sec", m.kind, m.ops_per_sec)?;
            }
            writeln!(f)?;
        }
        if self.cancelled {
            writeln!(f, "(cancelled)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn sample() -> Report {
        let mut report = Report::default();
        report.push(Measurement::new(StackKind::LockFree, 1, 2, 1_000, 2.0));
        report.push(Measurement::new(StackKind::Mutex, 1, 2, 3_000, 2.0));
        report.push(Measurement::new(StackKind::LockFree, 4, 2, 9_000, 3.0));
        report
    }

    #[test]
    fn test_throughput_uses_elapsed_time() {
        let m = Measurement::new(StackKind::SpinLock, 8, 5, 10_000, 4.0);
        assert!((m.ops_per_sec - 2_500.0).abs() < f64::EPSILON);
        let idle = Measurement::new(StackKind::SpinLock, 8, 5, 10, 0.0);
        assert!(idle.ops_per_sec.abs() < f64::EPSILON);
    }

    #[test]
    fn test_text_has_one_line_per_thread_count() {
        assert_eq!(
            sample().to_string(),
            "1 threads, lock-free: 500/sec, mutex: 1500/sec\n4 threads, lock-free: 3000/sec\n"
        );
    }

    #[test]
    fn test_cancelled_report_says_so() {
        let report = Report {
            cancelled: true,
            ..sample()
        };
        assert!(report.to_string().ends_with("(cancelled)\n"));
    }

    #[test]
    fn test_json_carries_every_measurement() {
        let report = sample();
        let json = report.render(ReportFormat::Json).unwrap();
        let decoded: Report = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, report);
        assert!(json.contains(r#""kind": "lock-free""#));
    }

    #[test]
    fn test_lookup_and_format_names() {
        let report = sample();
        assert_eq!(report.find(StackKind::Mutex, 1).map(|m| m.ops), Some(3_000));
        assert!(report.find(StackKind::Mutex, 4).is_none());
        assert_eq!(report.thread_counts(), vec![1, 4]);
        assert_eq!(ReportFormat::from_str("json").unwrap(), ReportFormat::Json);
        assert_eq!(ReportFormat::default().to_string(), "text");
    }
}
