//! Logging setup for the filesift binary.
//!
//! Uses the `log` facade with an `env_logger` backend. The level comes from,
//! in priority order:
//!
//! 1. `RUST_LOG`, when set
//! 2. `--quiet` (errors only) or `-v` / `-vv` (debug / trace)
//! 3. info
//!
//! Debug builds prefix each line with a timestamp, and with the module path
//! once `-v` is given. Release builds print level and message only.
//!
//! ```rust,no_run
//! use filesift::logging::{init_logging, LogOptions};
//!
//! init_logging(LogOptions { verbose: 1, quiet: false, no_color: false });
//! log::debug!("walker configured");
//! ```

use std::env;
use std::io::Write;

use env_logger::{Builder, WriteStyle};
use log::LevelFilter;

/// Logging switches taken from the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogOptions {
    /// `-v` count: 1 = debug, 2+ = trace
    pub verbose: u8,
    /// Errors only
    pub quiet: bool,
    /// Never emit ANSI colors
    pub no_color: bool,
}

/// Initialize the global logger.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging(options: LogOptions) {
    let mut builder = Builder::new();
    let from_env = env::var("RUST_LOG").is_ok();

    if from_env {
        builder.parse_default_env();
    } else {
        builder.filter_level(determine_level(options.verbose, options.quiet));
    }
    if options.no_color {
        builder.write_style(WriteStyle::Never);
    }
    configure_format(&mut builder, options.verbose);

    if builder.try_init().is_err() {
        return;
    }
    if from_env {
        log::debug!("Logging configured from RUST_LOG={:?}", env::var("RUST_LOG").ok());
    } else {
        log::debug!("Logging initialized at level {}", current_level_name());
    }
}

/// Map the CLI flags to a level. `quiet` wins over `verbose`.
fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn configure_format(builder: &mut Builder, verbose: u8) {
    #[cfg(debug_assertions)]
    {
        builder.format(move |buf, record| {
            let timestamp = buf.timestamp_seconds();
            let level = record.level();
            let style = buf.default_level_style(level);
            if verbose >= 1 {
                writeln!(
                    buf,
                    "{} {style}{:<5}{style:#} [{}] {}",
                    timestamp,
                    level,
                    record.module_path().unwrap_or("unknown"),
                    record.args()
                )
            } else {
                writeln!(buf, "{} {style}{:<5}{style:#} {}", timestamp, level, record.args())
            }
        });
    }

    #[cfg(not(debug_assertions))]
    {
        let _ = verbose;
        builder.format(|buf, record| {
            let level = record.level();
            let style = buf.default_level_style(level);
            writeln!(buf, "{style}{:<5}{style:#} {}", level, record.args())
        });
    }
}

/// The active maximum level, lower-cased.
#[must_use]
pub fn current_level_name() -> &'static str {
    match log::max_level() {
        LevelFilter::Off => "off",
        LevelFilter::Error => "error",
        LevelFilter::Warn => "warn",
        LevelFilter::Info => "info",
        LevelFilter::Debug => "debug",
        LevelFilter::Trace => "trace",
    }
}
