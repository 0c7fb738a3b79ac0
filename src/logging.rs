//! Structured logging for repo2cwl
//!
//! All logs go to stderr so stdout stays free for command output
//! (`inspect --script` is meant to be piped).
//!
//! # Field conventions
//!
//! - `notebook`: notebook path relative to the repository root
//! - `tool`: tool name or entry command of a generated tool
//! - `operation`: the step being performed (e.g., "image.build")
//! - `status`: the result ("success", "error")
//! - `inputs` / `outputs`: parameter counts of a descriptor
//!
//! # Examples
//!
//! ```rust,ignore
//! use tracing::{info, warn};
//!
//! info!(tool = "analysis_train", inputs = 2, outputs = 1, status = "success", "Wrote descriptor");
//! warn!(notebook = "broken.ipynb", status = "error", "Failed to convert notebook: {}", err);
//! ```

use std::{fmt as std_fmt, io};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{
    fmt::{self, format::Writer},
    prelude::*,
    EnvFilter,
};

/// Formatter that tags every line with "repo2cwl" instead of the module path
struct Repo2CwlFormatter {
    with_ansi: bool,
}

impl<S, N> FormatEvent<S, N> for Repo2CwlFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std_fmt::Result {
        let meta = event.metadata();

        write!(
            writer,
            "{} ",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.6fZ")
        )?;

        if self.with_ansi {
            let level_style = match *meta.level() {
                tracing::Level::ERROR => "\x1b[31m",
                tracing::Level::WARN => "\x1b[33m",
                tracing::Level::INFO => "\x1b[32m",
                tracing::Level::DEBUG => "\x1b[34m",
                tracing::Level::TRACE => "\x1b[35m",
            };
            write!(writer, "{}{:5}(repo2cwl)\x1b[0m: ", level_style, meta.level())?;
        } else {
            write!(writer, "{:5}(repo2cwl): ", meta.level())?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

/// Log format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format (default for development)
    Pretty,
    /// Compact format (for CI)
    Compact,
    /// JSON format (for log aggregation systems)
    Json,
}

impl LogFormat {
    /// Parse from environment variable (REPO2CWL_LOG_FORMAT)
    pub fn from_env() -> Self {
        Self::parse(
            std::env::var("REPO2CWL_LOG_FORMAT").ok().as_deref(),
            std::env::var("CI").is_ok(),
        )
    }

    fn parse(value: Option<&str>, ci: bool) -> Self {
        match value.unwrap_or_default().to_lowercase().as_str() {
            "json" => Self::Json,
            "compact" => Self::Compact,
            "pretty" => Self::Pretty,
            _ if ci => Self::Compact,
            _ => Self::Pretty,
        }
    }
}

/// Initialize the global tracing subscriber
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "debug", "info", "warn")
/// - `REPO2CWL_LOG_FORMAT`: Set format ("pretty", "compact", "json")
/// - `CI`: If set, defaults to compact format
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match LogFormat::from_env() {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .event_format(Repo2CwlFormatter { with_ansi: true })
                        .with_writer(io::stderr),
                )
                .init();
        }
        LogFormat::Compact => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .event_format(Repo2CwlFormatter { with_ansi: false })
                        .with_writer(io::stderr),
                )
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_file(false)
                        .with_line_number(false)
                        .with_ansi(false)
                        .with_writer(io::stderr)
                        .json(),
                )
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_format_wins() {
        assert_eq!(LogFormat::parse(Some("json"), true), LogFormat::Json);
        assert_eq!(LogFormat::parse(Some("PRETTY"), true), LogFormat::Pretty);
        assert_eq!(LogFormat::parse(Some("compact"), false), LogFormat::Compact);
    }

    #[test]
    fn test_ci_defaults_to_compact() {
        assert_eq!(LogFormat::parse(None, true), LogFormat::Compact);
        assert_eq!(LogFormat::parse(None, false), LogFormat::Pretty);
        assert_eq!(LogFormat::parse(Some("bogus"), false), LogFormat::Pretty);
    }
}
