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
    env,
    io::IsTerminal,
    sync::{Arc, Mutex, Once},
};

use bon::Builder;
use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer, Serialize, de};
use smart_default::SmartDefault;
use tracing::Subscriber;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_log::LogTracer;
use tracing_subscriber::{
    EnvFilter, Layer, Registry, filter, layer::SubscriberExt, registry::LookupSpan,
};

/// Deserializes a string value, using `Default::default()` if the string is
/// empty.
///
/// # Errors
/// Returns an error if the non-empty string does not name a valid `T`.
pub fn empty_string_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    let s = String::deserialize(deserializer)?;
    if s.is_empty() {
        Ok(T::default())
    } else {
        T::deserialize(de::value::StrDeserializer::new(&s)).map_err(|e: de::value::Error| {
            de::Error::custom(format!("invalid value, expect empty string, err: {e}"))
        })
    }
}

/// Fallback filter when neither `LoggingOptions::level` nor `RUST_LOG` is set.
const DEFAULT_LOG_TARGETS: &str = "info";

/// Configuration options for the logging system.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, SmartDefault, Builder)]
#[serde(default)]
pub struct LoggingOptions {
    /// Directory for rotated log files. Empty disables file logging.
    #[default = ""]
    #[builder(default, into)]
    pub dir: String,

    /// Filter string such as `"info"` or `"info,tagstack_bench=debug"`.
    /// Falls back to `RUST_LOG`, then to `"info"`.
    #[builder(into)]
    pub level: Option<String>,

    /// Output format for log lines.
    #[serde(default, deserialize_with = "empty_string_as_default")]
    #[builder(default)]
    pub log_format: LogFormat,

    /// Maximum number of rotated files kept per log stream.
    #[default = 720]
    #[builder(default = 720)]
    pub max_log_files: usize,

    /// Whether to write to stdout in addition to files.
    #[default = true]
    #[builder(default = true)]
    pub append_stdout: bool,
}

/// Available log output formats.
#[derive(
    Clone, Debug, Copy, PartialEq, Eq, Serialize, Deserialize, Default, derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// One JSON object per event, for log aggregation.
    Json,

    /// Human-readable lines.
    #[default]
    Text,
}

/// Initialise logging for unit and integration tests.
///
/// Logs go to `UNITTEST_LOG_DIR` (default `/tmp/__unittest_logs`) filtered by
/// `UNITTEST_LOG_LEVEL` (default `debug`). Safe to call from every test; only
/// the first call has an effect.
pub fn init_default_ut_logging() {
    static START: Once = Once::new();

    START.call_once(|| {
        let mut g = GLOBAL_UT_LOG_GUARD.as_ref().lock().unwrap();

        let dir =
            env::var("UNITTEST_LOG_DIR").unwrap_or_else(|_| "/tmp/__unittest_logs".to_string());
        let level = env::var("UNITTEST_LOG_LEVEL").unwrap_or_else(|_| "debug".to_string());

        let opts = LoggingOptions {
            dir: dir.clone(),
            level: Some(level),
            ..Default::default()
        };
        *g = Some(init_global_logging("unittest", &opts));

        tracing::info!("logs dir = {}", dir);
    });
}

/// Keeps the unit-test writer guards alive for the whole test binary.
static GLOBAL_UT_LOG_GUARD: Lazy<Arc<Mutex<Option<Vec<WorkerGuard>>>>> =
    Lazy::new(|| Arc::new(Mutex::new(None)));

fn fmt_layer<S, W>(writer: W, format: LogFormat, ansi: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> tracing_subscriber::fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Json => tracing_subscriber::fmt::Layer::new()
            .json()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_current_span(true)
            .with_span_list(true)
            .boxed(),
        LogFormat::Text => tracing_subscriber::fmt::Layer::new()
            .with_writer(writer)
            .with_ansi(ansi)
            .boxed(),
    }
}

fn rolling_appender(opts: &LoggingOptions, prefix: &str) -> RollingFileAppender {
    RollingFileAppender::builder()
        .rotation(Rotation::HOURLY)
        .filename_prefix(prefix)
        .max_log_files(opts.max_log_files)
        .build(&opts.dir)
        .unwrap_or_else(|e| {
            panic!(
                "initializing rolling file appender at {} failed: {}",
                &opts.dir, e
            )
        })
}

/// Initialise the global tracing subscriber.
///
/// Layers installed, depending on `opts`:
/// - stdout, text or JSON (`append_stdout`)
/// - hourly rotated `{app_name}.*` files (`dir` non-empty)
/// - hourly rotated `{app_name}-err.*` files holding only errors (`dir`
///   non-empty)
///
/// `log` records are bridged into tracing. Only the first call has an effect;
/// later calls return no guards.
///
/// # Panics
///
/// Panics if the log directory cannot be created or the level string does
/// not parse. Both are start-up misconfigurations.
pub fn init_global_logging(app_name: &str, opts: &LoggingOptions) -> Vec<WorkerGuard> {
    static START: Once = Once::new();
    let mut guards = vec![];

    START.call_once(|| {
        LogTracer::init().expect("log tracer must be valid");

        let stdout_logging_layer = opts.append_stdout.then(|| {
            let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());
            guards.push(guard);
            fmt_layer(writer, opts.log_format, std::io::stdout().is_terminal())
        });

        let file_logging_layer = (!opts.dir.is_empty()).then(|| {
            let (writer, guard) = tracing_appender::non_blocking(rolling_appender(opts, app_name));
            guards.push(guard);
            fmt_layer(writer, opts.log_format, false)
        });

        let err_file_logging_layer = (!opts.dir.is_empty()).then(|| {
            let appender = rolling_appender(opts, &format!("{app_name}-err"));
            let (writer, guard) = tracing_appender::non_blocking(appender);
            guards.push(guard);
            fmt_layer(writer, opts.log_format, false)
                .with_filter(filter::LevelFilter::ERROR)
                .boxed()
        });

        let filter = opts
            .level
            .as_deref()
            .or(env::var(EnvFilter::DEFAULT_ENV).ok().as_deref())
            .unwrap_or(DEFAULT_LOG_TARGETS)
            .parse::<filter::Targets>()
            .expect("error parsing log level string");

        let subscriber = Registry::default()
            .with(filter)
            .with(stdout_logging_layer)
            .with(file_logging_layer)
            .with(err_file_logging_layer);

        tracing::subscriber::set_global_default(subscriber)
            .expect("error setting global tracing subscriber");
    });

    guards
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let opts = LoggingOptions::default();
        assert!(opts.dir.is_empty());
        assert_eq!(opts.level, None);
        assert_eq!(opts.log_format, LogFormat::Text);
        assert_eq!(opts.max_log_files, 720);
        assert!(opts.append_stdout);
        assert_eq!(LoggingOptions::builder().build(), opts);
    }

    #[test]
    fn test_empty_format_falls_back_to_text() {
        let opts: LoggingOptions =
            serde_json::from_str(r#"{"log_format": "", "level": "debug"}"#).unwrap();
        assert_eq!(opts.log_format, LogFormat::Text);
        assert_eq!(opts.level.as_deref(), Some("debug"));

        let opts: LoggingOptions = serde_json::from_str(r#"{"log_format": "json"}"#).unwrap();
        assert_eq!(opts.log_format, LogFormat::Json);

        assert!(serde_json::from_str::<LoggingOptions>(r#"{"log_format": "xml"}"#).is_err());
    }

    #[test]
    fn test_ut_logging_is_idempotent() {
        init_default_ut_logging();
        init_default_ut_logging();
        assert!(init_global_logging("again", &LoggingOptions::default()).is_empty());
        tracing::debug!("still logging after repeated init");
    }
}
