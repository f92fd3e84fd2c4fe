use std::sync::Arc;
use std::time::Duration;

use crate::error::CheckError;
use crate::http::Exchange;

use super::formatter::{PlainFormatter, ReportFormatter, StyledFormatter};
use super::sink::{ConsoleSink, ReportSink};

/// Emits one line per completed exchange and prints diagnostics.
#[derive(Clone)]
pub struct Reporter {
    formatter: Arc<dyn ReportFormatter>,
    sink: Arc<dyn ReportSink>,
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter").finish_non_exhaustive()
    }
}

impl Reporter {
    #[must_use]
    pub const fn new(formatter: Arc<dyn ReportFormatter>, sink: Arc<dyn ReportSink>) -> Self {
        Self { formatter, sink }
    }

    #[must_use]
    pub fn console(color: bool) -> Self {
        let formatter: Arc<dyn ReportFormatter> = if color {
            Arc::new(StyledFormatter)
        } else {
            Arc::new(PlainFormatter)
        };
        Self::new(formatter, Arc::new(ConsoleSink))
    }

    /// Prints the exchange and hands it back for further chaining.
    #[must_use]
    pub fn report(&self, exchange: Exchange) -> Exchange {
        self.report_with(exchange, "")
    }

    #[must_use]
    pub fn report_with(&self, exchange: Exchange, extras: &str) -> Exchange {
        self.sink.emit(&self.format_exchange(&exchange, extras));
        exchange
    }

    #[must_use]
    pub fn format_exchange(&self, exchange: &Exchange, extras: &str) -> String {
        self.format_line(
            exchange.method().as_str(),
            exchange.url().as_str(),
            exchange.elapsed(),
            extras,
        )
    }

    #[must_use]
    pub fn format_line(&self, method: &str, url: &str, elapsed: Duration, extras: &str) -> String {
        let line = format!(
            "{} {} took {}ms {}",
            self.formatter.method(method),
            self.formatter.url(url, false),
            elapsed.as_millis(),
            extras
        );
        line.trim_end().to_owned()
    }

    /// Propagates `err` when `should_throw` is set; otherwise prints it and
    /// carries on. `None` is a no-op either way.
    ///
    /// # Errors
    ///
    /// Returns the error unchanged when `err` is `Some` and `should_throw`
    /// is true.
    pub fn report_errors<E>(&self, err: Option<E>, should_throw: bool) -> Result<(), CheckError>
    where
        E: Into<CheckError>,
    {
        match err {
            Some(err) if should_throw => Err(err.into()),
            Some(err) => {
                self.emit_failure(&err.into());
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Prints a non-fatal diagnostic.
    pub fn log_errors<E>(&self, err: E)
    where
        E: Into<CheckError>,
    {
        self.emit_failure(&err.into());
    }

    fn emit_failure(&self, err: &CheckError) {
        self.sink.emit_error(&self.formatter.failure(&err.to_string()));
    }

    pub fn preview(&self, method: &str, url: &str, client: &str) {
        self.sink.emit(&format!(
            "{} {} for {}",
            self.formatter.method(method),
            self.formatter.url(url, true),
            client
        ));
    }

    pub fn suite(&self, title: &str) {
        self.sink.emit(&format!("{}\n", self.formatter.heading(title)));
    }

    pub fn notice(&self, text: &str) {
        self.sink.emit(&self.formatter.notice(text));
    }

    pub fn banner(&self, text: &str) {
        self.sink.emit(&self.formatter.banner(text));
    }

    pub fn line(&self, text: &str) {
        self.sink.emit(text);
    }

    pub fn menu_entry(&self, index: usize, name: &str) {
        self.sink
            .emit(&format!("{}: {}", self.formatter.menu_index(index), name));
    }

    pub fn prompt(&self, text: &str) {
        self.sink.emit_inline(&self.formatter.prompt(text));
    }
}
