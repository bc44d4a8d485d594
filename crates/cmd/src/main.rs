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

use std::{sync::atomic::Ordering, time::Duration};

use clap::{
    Args, Parser, Subcommand,
    builder::{PossibleValuesParser, TypedValueParser},
};
use snafu::{ResultExt, Whatever};
use tagstack_bench::{
    BenchConfig, Harness, ReportFormat,
    config::{DEFAULT_ITERATIONS, DEFAULT_POOL_SIZE, DEFAULT_SEED},
    thread_counts_up_to,
};
use tagstack_common_telemetry::{LogFormat, LoggingOptions, init_global_logging, set_panic_hook};
use tagstack_core::{BackoffPolicy, StackConfig, StackKind};

mod build_info;

#[derive(Debug, Parser)]
#[clap(
name = "tagstack",
about = "Throughput of a lock-free tagged stack against locking baselines",
author = build_info::AUTHOR,
version = build_info::FULL_VERSION)]
struct Cli {
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Run(RunArgs),
    Version(VersionArgs),
}

#[derive(Debug, Clone, Args)]
#[command(flatten_help = true)]
#[command(long_about = r"

Measures push/pop throughput of each stack variant at each thread count.
Ctrl-C stops the sweep and prints what was measured so far.
Examples:

tagstack run
tagstack run --threads 1,2,4,8 --duration-secs 2 --kind lock-free --kind mutex
tagstack run --max-threads 16 --format json

")]
struct RunArgs {
    /// Comma-separated thread counts to measure.
    #[arg(long, value_delimiter = ',', conflicts_with = "max_threads")]
    threads: Vec<usize>,

    /// Measure every thread count from 1 to N.
    #[arg(long)]
    max_threads: Option<usize>,

    /// Elements allocated per trial, split evenly between threads.
    #[arg(long, default_value_t = DEFAULT_POOL_SIZE)]
    pool_size: usize,

    /// Seconds each trial runs.
    #[arg(long, default_value_t = 5)]
    duration_secs: u64,

    /// Trials per variant and thread count.
    #[arg(long, default_value_t = DEFAULT_ITERATIONS)]
    iterations: usize,

    /// Stack variant to measure; repeat for several. Defaults to all.
    #[arg(long = "kind")]
    kinds: Vec<StackKind>,

    /// Fixed delay after a failed compare-and-swap or spin-lock attempt, in
    /// microseconds.
    #[arg(long)]
    backoff_us: Option<u64>,

    /// Base seed for the workers' coin flips.
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    #[arg(long, default_value_t = ReportFormat::Text)]
    format: ReportFormat,

    /// Log filter, e.g. `info` or `tagstack_bench=debug`.
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Format of log lines on stdout and in log files.
    #[arg(
        long,
        default_value = "text",
        value_parser = PossibleValuesParser::new(["text", "json"]).map(|s| parse_log_format(&s)),
    )]
    log_format: LogFormat,

    /// Also write rotated log files to this directory.
    #[arg(long, default_value = "")]
    log_dir: String,
}

impl RunArgs {
    fn bench_config(&self) -> BenchConfig {
        let threads = match (self.threads.is_empty(), self.max_threads) {
            (false, _) => self.threads.clone(),
            (true, Some(max)) => thread_counts_up_to(max),
            (true, None) => BenchConfig::default().threads,
        };
        let kinds = if self.kinds.is_empty() {
            BenchConfig::default().kinds
        } else {
            self.kinds.clone()
        };
        let backoff = self
            .backoff_us
            .map(|us| BackoffPolicy::Fixed(Duration::from_micros(us)))
            .unwrap_or_default();

        BenchConfig::builder()
            .threads(threads)
            .pool_size(self.pool_size)
            .duration(Duration::from_secs(self.duration_secs))
            .iterations(self.iterations)
            .kinds(kinds)
            .seed(self.seed)
            .stack(StackConfig::builder().backoff(backoff).build())
            .build()
    }

    fn run(&self) -> Result<(), Whatever> {
        let _guards = init_global_logging(
            "tagstack",
            &LoggingOptions::builder()
                .dir(self.log_dir.clone())
                .level(self.log_level.clone())
                .log_format(self.log_format)
                .build(),
        );
        set_panic_hook();

        let harness =
            Harness::new(self.bench_config()).whatever_context("invalid benchmark configuration")?;
        let cancel = harness.cancel_handle();
        ctrlc::set_handler(move || cancel.store(true, Ordering::Release))
            .whatever_context("failed to install Ctrl-C handler")?;

        let report = harness.run().whatever_context("benchmark failed")?;
        if report.cancelled {
            tracing::warn!(measurements = report.len(), "interrupted, report is partial");
        }
        let rendered = report
            .render(self.format)
            .whatever_context("failed to render report")?;
        print!("{rendered}");
        if self.format == ReportFormat::Json {
            println!();
        }
        Ok(())
    }
}

fn parse_log_format(name: &str) -> LogFormat {
    if name == "json" {
        LogFormat::Json
    } else {
        LogFormat::Text
    }
}

#[derive(Debug, Clone, Args)]
#[command(flatten_help = true)]
#[command(long_about = r"

Print version and build information.
Examples:

tagstack version

")]
struct VersionArgs {}

impl VersionArgs {
    #[allow(clippy::unused_self)]
    fn run(&self) -> Result<(), Whatever> {
        println!("{}", build_info::describe());
        Ok(())
    }
}

fn main() -> Result<(), Whatever> {
    let cli = Cli::parse();
    match cli.commands {
        Commands::Run(ra) => ra.run(),
        Commands::Version(va) => va.run(),
    }
}
