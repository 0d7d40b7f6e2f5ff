//! Diagnostics on stderr.
//!
//! Messages go through the `log` facade to `env_logger`. Reports, manifests
//! and dedup prompts are written to stdout by the commands themselves, so
//! the log level never changes what a script reads from stdout.
//!
//! The level comes from `RUST_LOG` when it is set, otherwise from the flags:
//! `-q` keeps errors only, no flag shows warnings (skipped manifest lines,
//! unreadable files), `-v` adds debug output and `-vv` per-comparison traces.
//!
//! ```rust,no_run
//! rustsums::logging::init_logging(1, false);
//! log::debug!("visible with -v");
//! ```

use std::io::Write;

use env_logger::{Builder, Env};
use log::{Level, LevelFilter};

const PROGRAM: &str = "rustsums";

/// Install the stderr logger for the given `-v` count and `-q` flag.
///
/// Only the first call installs a logger; later calls are no-ops, so
/// `run_app` can be driven repeatedly from one test process.
pub fn init_logging(verbose: u8, quiet: bool) {
    let fallback = level_for(verbose, quiet);
    let mut builder = Builder::from_env(Env::default().default_filter_or(fallback.as_str()));

    if verbose == 0 {
        builder.format(|buf, record| {
            writeln!(buf, "{}: {}{}", PROGRAM, prefix(record.level()), record.args())
        });
    } else {
        builder.format(|buf, record| {
            let style = buf.default_level_style(record.level());
            writeln!(
                buf,
                "{} {style}{:<5}{style:#} {}: {}",
                buf.timestamp_millis(),
                record.level(),
                record.target().strip_prefix("rustsums::").unwrap_or(record.target()),
                record.args()
            )
        });
    }

    if builder.try_init().is_ok() {
        log::debug!("Logging at {} (RUST_LOG overrides)", log::max_level());
    }
}

fn level_for(verbose: u8, quiet: bool) -> LevelFilter {
    match (quiet, verbose) {
        (true, _) => LevelFilter::Error,
        (false, 0) => LevelFilter::Warn,
        (false, 1) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    }
}

/// Short tag in front of terse messages; warnings and errors only.
fn prefix(level: Level) -> &'static str {
    match level {
        Level::Error => "error: ",
        Level::Warn => "warning: ",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_for_flags() {
        assert_eq!(level_for(0, false), LevelFilter::Warn);
        assert_eq!(level_for(1, false), LevelFilter::Debug);
        assert_eq!(level_for(2, false), LevelFilter::Trace);
        assert_eq!(level_for(7, false), LevelFilter::Trace);
    }

    #[test]
    fn test_quiet_wins_over_verbose() {
        assert_eq!(level_for(0, true), LevelFilter::Error);
        assert_eq!(level_for(3, true), LevelFilter::Error);
    }

    #[test]
    fn test_prefix() {
        assert_eq!(prefix(Level::Warn), "warning: ");
        assert_eq!(prefix(Level::Error), "error: ");
        assert_eq!(prefix(Level::Info), "");
    }

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging(0, true);
        init_logging(2, false);
    }
}
