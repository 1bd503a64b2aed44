//! Stderr logger for the tracking loop.
//!
//! Records print as `[elapsed frame LEVEL crate] message`. `elapsed` runs
//! from installation; `frame` is whatever the loop last passed to
//! [`set_log_frame`], so every line emitted while a frame is processed is
//! tagged with it.

use std::fmt;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

use log::{Level, LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::EnvFilter;

const NO_FRAME: u64 = u64::MAX;

static FRAME: AtomicU64 = AtomicU64::new(NO_FRAME);

/// Tag subsequent log lines with `frame`; `None` clears the tag.
pub fn set_log_frame(frame: Option<u64>) {
    FRAME.store(frame.unwrap_or(NO_FRAME), Ordering::Relaxed);
}

fn current_frame() -> Option<u64> {
    match FRAME.load(Ordering::Relaxed) {
        NO_FRAME => None,
        f => Some(f),
    }
}

fn format_line(
    elapsed: f64,
    frame: Option<u64>,
    level: Level,
    target: &str,
    args: &fmt::Arguments<'_>,
) -> String {
    let krate = target.split("::").next().unwrap_or(target);
    let frame = match frame {
        Some(f) => format!("#{f:<6}"),
        None => "-      ".to_string(),
    };
    format!("[{elapsed:8.3}s {frame} {level:>5} {krate}] {args}")
}

struct FrameLogger {
    level: LevelFilter,
    started: Instant,
}

impl Log for FrameLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(
            self.started.elapsed().as_secs_f64(),
            current_frame(),
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

static LOGGER: OnceLock<FrameLogger> = OnceLock::new();

/// Install the frame-tagged stderr logger. Later calls are no-ops.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_none() {
        let logger = LOGGER.get_or_init(|| FrameLogger {
            level,
            started: Instant::now(),
        });
        log::set_logger(logger)?;
        log::set_max_level(level);
    }
    Ok(())
}

/// Install a `tracing` subscriber; spans on the hot paths close with timing.
///
/// `RUST_LOG` overrides the default `info` filter.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE);
    if json {
        let _ = builder.json().flatten_event(true).finish().try_init();
    } else {
        let _ = builder
            .with_timer(tracing_subscriber::fmt::time::Uptime::default())
            .finish()
            .try_init();
    }
}
