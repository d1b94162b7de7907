//! Logging backends for the CLI and tests.
//!
//! [`init_with_level`] installs a small `log` backend printing
//! `[elapsed LEVEL] target: message` lines. With the `tracing` feature,
//! [`init_tracing`] installs a `tracing-subscriber` formatter instead. Both
//! write to stderr only: stdout carries command output such as replay
//! reports.

use std::fmt::Arguments;
use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{Level, LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{filter, fmt, EnvFilter};

struct StderrLogger {
    level: LevelFilter,
    started: Instant,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(
            self.started.elapsed().as_secs_f64(),
            record.level(),
            record.target(),
            record.args(),
        );
        let _ = writeln!(std::io::stderr().lock(), "{line}");
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn format_line(elapsed: f64, level: Level, target: &str, args: &Arguments) -> String {
    format!("[{elapsed:7.3}s {level:>5}] {target}: {args}")
}

static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

/// Install the stderr logger with the given level filter. Later calls keep
/// the first logger.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_none() {
        let logger = LOGGER.get_or_init(|| StderrLogger {
            level,
            started: Instant::now(),
        });
        log::set_logger(logger)?;
        log::set_max_level(level);
    }
    Ok(())
}

/// Install a `tracing` subscriber on stderr.
///
/// `RUST_LOG` directives take precedence; without them events at
/// `default_level` and above are shown. `log` records reach the subscriber
/// only through a bridge such as `tracing_log::LogTracer`.
#[cfg(feature = "tracing")]
pub fn init_tracing(default_level: LevelFilter, json: bool) {
    let filter = EnvFilter::builder()
        .with_default_directive(tracing_level(default_level).into())
        .from_env_lossy();
    let builder = fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE);
    if json {
        let _ = builder.json().flatten_event(true).finish().try_init();
    } else {
        let _ = builder
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init();
    }
}

#[cfg(feature = "tracing")]
fn tracing_level(level: LevelFilter) -> filter::LevelFilter {
    match level {
        LevelFilter::Off => filter::LevelFilter::OFF,
        LevelFilter::Error => filter::LevelFilter::ERROR,
        LevelFilter::Warn => filter::LevelFilter::WARN,
        LevelFilter::Info => filter::LevelFilter::INFO,
        LevelFilter::Debug => filter::LevelFilter::DEBUG,
        LevelFilter::Trace => filter::LevelFilter::TRACE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_carry_elapsed_level_and_target() {
        let line = format_line(
            0.15,
            Level::Info,
            "boardsight_calib::grid",
            &format_args!("grid extracted: {}x{} corners", 9, 9),
        );
        assert_eq!(
            line,
            "[  0.150s  INFO] boardsight_calib::grid: grid extracted: 9x9 corners"
        );
    }

    #[cfg(feature = "tracing")]
    #[test]
    fn cli_levels_map_onto_tracing_levels() {
        assert_eq!(tracing_level(LevelFilter::Off), filter::LevelFilter::OFF);
        assert_eq!(tracing_level(LevelFilter::Debug), filter::LevelFilter::DEBUG);
    }
}
