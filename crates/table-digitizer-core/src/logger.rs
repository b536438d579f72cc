//! Stderr logging for the `table-digitizer` binary and ad-hoc debugging.
//!
//! Records are printed as `[  0.412s  INFO lines] merged 5 vertical rules`,
//! where the middle field is the crate that emitted the record
//! (`table_digitizer_lines` is shortened to `lines`).

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

struct StderrLogger {
    level: LevelFilter,
    started: Instant,
}

/// `table_digitizer_lines::detector` -> `lines`.
fn stage_of(target: &str) -> &str {
    let krate = target.split("::").next().unwrap_or(target);
    krate.strip_prefix("table_digitizer_").unwrap_or(krate)
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!(
            "[{:7.3}s {:>5} {}] {}\n",
            self.started.elapsed().as_secs_f64(),
            record.level(),
            stage_of(record.target()),
            record.args()
        );
        // One write per record keeps lines from parallel stages intact.
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

/// Route `log` records to stderr at `level`.
///
/// Only the first call installs a logger; later calls return `Ok` and keep
/// the level that was set first.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_some() {
        return Ok(());
    }
    let logger = LOGGER.get_or_init(|| StderrLogger {
        level,
        started: Instant::now(),
    });
    log::set_logger(logger)?;
    log::set_max_level(level);
    Ok(())
}

/// Level for a counted `-v` flag: warnings by default, then info, debug and
/// trace.
pub fn level_from_verbosity(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Install a `tracing` subscriber that reports stage spans (`detect`,
/// `classify`, `calibrate`, ...) as they close. `RUST_LOG` overrides the
/// default `info` filter.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let base = fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr);
    let _ = if json {
        base.json().flatten_event(true).finish().try_init()
    } else {
        base.with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_increasing_levels() {
        assert_eq!(level_from_verbosity(0), LevelFilter::Warn);
        assert_eq!(level_from_verbosity(2), LevelFilter::Debug);
        assert_eq!(level_from_verbosity(9), LevelFilter::Trace);
    }

    #[test]
    fn stage_names_drop_the_crate_prefix() {
        assert_eq!(stage_of("table_digitizer_lines::detector"), "lines");
        assert_eq!(stage_of("table_digitizer"), "table_digitizer");
        assert_eq!(stage_of("kiddo::float"), "kiddo");
    }

    #[test]
    fn repeated_init_is_a_no_op() {
        assert!(init_with_level(LevelFilter::Info).is_ok());
        assert!(init_with_level(LevelFilter::Debug).is_ok());
    }
}
