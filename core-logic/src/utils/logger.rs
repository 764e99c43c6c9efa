use anyhow::{Context, Result};
use chrono::Local;
use nu_ansi_term::{Color, Style};
use std::fmt;
use tracing::{Event, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields},
    prelude::*,
    registry::LookupSpan,
    EnvFilter, Layer,
};

/// Target used for the account status lines an operator watches.
pub const BOT_TARGET: &str = "bot";

const LOG_DIR: &str = "logs";
const MAX_LOG_FILES: usize = 7;

/// Installs the global subscriber: a coloured console layer and a daily
/// rotated file layer under `logs/<prefix>.<date>.log`.
///
/// The returned guard flushes the file writer on drop and must be kept
/// alive for the life of the process.
pub fn setup_logger(prefix: &str) -> Result<WorkerGuard> {
    std::fs::create_dir_all(LOG_DIR).context("Failed to create logs directory")?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(LOG_DIR)
        .context("Failed to create rolling log file")?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // File layer: INFO for bot lines, RUST_LOG (default WARN) for others
    let file_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"))
        .add_directive(
            format!("{}=info", BOT_TARGET)
                .parse()
                .context("Invalid log directive")?,
        );

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .event_format(FileFormatter)
        .with_filter(file_filter);

    // Console layer: INFO for bot lines, WARN for others
    let console_filter = tracing_subscriber::filter::Targets::new()
        .with_target(BOT_TARGET, tracing::Level::INFO)
        .with_default(tracing::Level::WARN);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .event_format(TerminalFormatter)
        .with_filter(console_filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to set global subscriber")?;

    Ok(guard)
}

// --- Formatters ---

struct MessageVisitor {
    message: String,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        }
    }
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }
}

fn event_message(event: &Event<'_>) -> String {
    let mut visitor = MessageVisitor {
        message: String::new(),
    };
    event.record(&mut visitor);
    visitor.message
}

/// Paints the status keywords of a bot line.
pub(crate) fn colorize(msg: &str) -> String {
    const GOOD: [&str; 5] = [
        "Is Claimed",
        "Is Connected",
        "acknowledged",
        "successfully",
        "Renewed",
    ];
    const BAD: [&str; 4] = ["Failed", "Error", "Not Eligible", "Isn't Claimed"];

    let green = Style::new().fg(Color::LightGreen).bold();
    let red = Style::new().fg(Color::LightRed).bold();

    let mut out = msg.to_string();
    for word in GOOD {
        if out.contains(word) {
            out = out.replace(word, &green.paint(word).to_string());
        }
    }
    for word in BAD {
        if out.contains(word) {
            out = out.replace(word, &red.paint(word).to_string());
        }
    }
    out
}

pub struct TerminalFormatter;

impl<S, N> FormatEvent<S, N> for TerminalFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let cyan = Style::new().fg(Color::Cyan).bold();
        let white = Style::new().fg(Color::White).bold();

        write!(
            writer,
            "{}{}",
            cyan.paint(format!("[ {} ]", timestamp)),
            white.paint(" | ")
        )?;

        let msg = event_message(event);
        let level = *event.metadata().level();
        if level <= tracing::Level::WARN && event.metadata().target() != BOT_TARGET {
            write!(writer, "{} ", Color::Yellow.paint(level.as_str()))?;
        }

        writeln!(writer, "{}", colorize(&msg))
    }
}

pub struct FileFormatter;

impl<S, N> FormatEvent<S, N> for FileFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S %Z");
        let level = event.metadata().level();

        write!(writer, "[{}] [{}] ", timestamp, level)?;
        writeln!(writer, "{}", event_message(event))
    }
}
