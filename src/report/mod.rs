//! Console reporting: exchange summaries, diagnostics, and the runner menu.
mod formatter;
mod reporter;
mod sink;


pub use formatter::{PlainFormatter, ReportFormatter, StyledFormatter, URL_WIDTH};
pub use reporter::Reporter;
pub use sink::{ConsoleSink, MemorySink, ReportSink};
