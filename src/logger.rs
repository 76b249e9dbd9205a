//! Logging capability used for state-change notices.

use std::fmt;

/// Receives human-readable notices when the followed path appears, is
/// replaced or becomes inaccessible.
///
/// The engine calls this with fixed message templates; it never logs
/// delivered data. Notices are best-effort and not ordered with respect
/// to pulled bytes.
pub trait Logger {
    /// Prints a single formatted notice.
    fn print(&self, args: fmt::Arguments<'_>);
}

/// Any `Fn(fmt::Arguments)` closure is a logger, so tests and embedders
/// can capture notices without a dedicated type.
impl<F> Logger for F
where
    F: Fn(fmt::Arguments<'_>),
{
    fn print(&self, args: fmt::Arguments<'_>) {
        self(args)
    }
}

/// Logger printing notices to standard error.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrLogger;

impl Logger for StderrLogger {
    fn print(&self, args: fmt::Arguments<'_>) {
        eprintln!("{args}");
    }
}

/// Logger routing notices through `tracing` at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn print(&self, args: fmt::Arguments<'_>) {
        tracing::info!("{}", args);
    }
}
