// src/utils/logger.rs

use log::{Level, LevelFilter, Metadata, Record, SetLoggerError};
use std::io::{IsTerminal, Write};
use std::sync::OnceLock;

static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

struct StderrLogger {
  level: LevelFilter,
  color: bool,
}

/// Maps `-v` / `-q` counts to a level: warn by default, info at `-v`,
/// debug at `-vv`, trace beyond.
pub fn level_from_verbosity(verbose: u8, quiet: bool) -> LevelFilter {
  if quiet {
    return LevelFilter::Error;
  }
  match verbose {
    0 => LevelFilter::Warn,
    1 => LevelFilter::Info,
    2 => LevelFilter::Debug,
    _ => LevelFilter::Trace,
  }
}

pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
  let logger = LOGGER.get_or_init(|| StderrLogger {
    level,
    color: std::io::stderr().is_terminal(),
  });
  log::set_logger(logger).map(|()| log::set_max_level(level))
}

fn tag(level: Level) -> (&'static str, &'static str) {
  match level {
    Level::Error => ("error", "\x1b[1;31m"), // Red & Bold
    Level::Warn => ("warn", "\x1b[33m"),     // Orange-ish
    Level::Info => ("info", "\x1b[34m"),     // Blue
    Level::Debug => ("debug", "\x1b[90m"),   // Gray
    Level::Trace => ("trace", "\x1b[90m"),
  }
}

impl log::Log for StderrLogger {
  fn enabled(&self, metadata: &Metadata) -> bool {
    metadata.level() <= self.level
  }

  fn log(&self, record: &Record) {
    if !self.enabled(record.metadata()) {
      return;
    }
    let (name, ansi) = tag(record.level());
    let mut err = std::io::stderr().lock();
    // Nothing sensible to do if stderr is gone.
    let _ = if self.color {
      writeln!(err, "{}{:<5}\x1b[0m {}", ansi, name, record.args())
    } else {
      writeln!(err, "{:<5} {}", name, record.args())
    };
  }

  fn flush(&self) {
    let _ = std::io::stderr().flush();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn verbosity_maps_to_levels() {
    assert_eq!(level_from_verbosity(0, false), LevelFilter::Warn);
    assert_eq!(level_from_verbosity(1, false), LevelFilter::Info);
    assert_eq!(level_from_verbosity(2, false), LevelFilter::Debug);
    assert_eq!(level_from_verbosity(7, false), LevelFilter::Trace);
    assert_eq!(level_from_verbosity(3, true), LevelFilter::Error);
  }

  #[test]
  fn tags_are_distinct_per_level() {
    assert_eq!(tag(Level::Error).0, "error");
    assert_eq!(tag(Level::Warn).0, "warn");
    assert_eq!(tag(Level::Debug).0, "debug");
  }
}
