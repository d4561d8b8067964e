//! Minimal stderr logger behind the `log` facade.

use std::io::Write;

/// Writes one line per record to stderr.
pub struct StderrLogger;

/// Renders a record as `[LEVEL target] message`.
pub fn format_record(level: log::Level, target: &str, args: &std::fmt::Arguments<'_>) -> String {
    format!("[{level:<5} {target}] {args}")
}

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record<'_>) {
        if self.enabled(record.metadata()) {
            let line = format_record(record.level(), record.target(), record.args());
            let _ = writeln!(std::io::stderr().lock(), "{line}");
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: StderrLogger = StderrLogger;

/// Installs the logger with `level` as the maximum.
pub fn init(level: log::LevelFilter) -> Result<(), log::SetLoggerError> {
    log::set_logger(&LOGGER).map(|()| log::set_max_level(level))
}
