use std::io::Write;
use std::sync::Mutex;

/// Destination for rendered report lines.
pub trait ReportSink: Send + Sync {
    fn emit(&self, line: &str);
    fn emit_error(&self, line: &str);
    /// Writes without a trailing newline (used for the selection prompt).
    fn emit_inline(&self, text: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl ReportSink for ConsoleSink {
    fn emit(&self, line: &str) {
        println!("{}", line);
    }

    fn emit_error(&self, line: &str) {
        eprintln!("{}", line);
    }

    fn emit_inline(&self, text: &str) {
        let mut stdout = std::io::stdout();
        if let Err(err) = write!(stdout, "{}", text).and_then(|()| stdout.flush()) {
            tracing::debug!("Failed to write prompt: {}", err);
        }
    }
}

/// Collects lines in memory; stdout and stderr lines share one ordered list.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn push(&self, line: &str) {
        match self.lines.lock() {
            Ok(mut lines) => lines.push(line.to_owned()),
            Err(poisoned) => poisoned.into_inner().push(line.to_owned()),
        }
    }
}

impl ReportSink for MemorySink {
    fn emit(&self, line: &str) {
        self.push(line);
    }

    fn emit_error(&self, line: &str) {
        self.push(line);
    }

    fn emit_inline(&self, text: &str) {
        self.push(text);
    }
}
