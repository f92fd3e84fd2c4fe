use crossterm::style::Stylize;

/// Visible width of the URL column in report lines.
pub const URL_WIDTH: usize = 120;
/// Width of a suite heading bar.
const HEADING_WIDTH: usize = 133;
const METHOD_WIDTH: usize = 10;

/// Renders the individual fields of a report line.
///
/// The reporter decides *what* is printed; implementations only decide how
/// each field looks.
pub trait ReportFormatter: Send + Sync {
    fn method(&self, method: &str) -> String;
    /// `pending` is true for pre-send previews and false for completed calls.
    fn url(&self, url: &str, pending: bool) -> String;
    fn failure(&self, message: &str) -> String;
    fn heading(&self, title: &str) -> String;
    fn banner(&self, text: &str) -> String;
    fn notice(&self, text: &str) -> String;
    fn menu_index(&self, index: usize) -> String;
    fn prompt(&self, text: &str) -> String;
}

#[must_use]
pub(crate) fn truncate_chars(value: &str, max: usize) -> &str {
    match value.char_indices().nth(max) {
        Some((end, _)) => value.get(..end).unwrap_or(value),
        None => value,
    }
}

/// Uncoloured output, used when stdout is not a terminal or `--no-color`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainFormatter;

impl ReportFormatter for PlainFormatter {
    fn method(&self, method: &str) -> String {
        format!("{:>width$}", method, width = METHOD_WIDTH)
    }

    fn url(&self, url: &str, _pending: bool) -> String {
        truncate_chars(url, URL_WIDTH).to_owned()
    }

    fn failure(&self, message: &str) -> String {
        format!("FAIL {}", message)
    }

    fn heading(&self, title: &str) -> String {
        format!("== Test Suite {} ==", title)
    }

    fn banner(&self, text: &str) -> String {
        text.trim().to_owned()
    }

    fn notice(&self, text: &str) -> String {
        text.trim().to_owned()
    }

    fn menu_index(&self, index: usize) -> String {
        format!("{:>3}", index)
    }

    fn prompt(&self, text: &str) -> String {
        format!("{} ", text.trim())
    }
}

/// Terminal styling via `crossterm`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StyledFormatter;

impl ReportFormatter for StyledFormatter {
    fn method(&self, method: &str) -> String {
        let padded = format!("{:>width$}", format!(" {} ", method), width = METHOD_WIDTH);
        match method {
            "GET" => padded.stylize().on_green().white().to_string(),
            _ => padded.stylize().on_green().yellow().to_string(),
        }
    }

    fn url(&self, url: &str, pending: bool) -> String {
        let padded = format!(
            " {:>width$} ",
            truncate_chars(url, URL_WIDTH),
            width = URL_WIDTH
        );
        if pending {
            padded.stylize().on_yellow().white().bold().to_string()
        } else {
            padded.stylize().on_dark_grey().white().bold().to_string()
        }
    }

    fn failure(&self, message: &str) -> String {
        message.to_owned().stylize().on_red().white().to_string()
    }

    fn heading(&self, title: &str) -> String {
        format!("{:<width$}", format!(" Test Suite {}", title), width = HEADING_WIDTH)
            .stylize()
            .on_blue()
            .white()
            .bold()
            .to_string()
    }

    fn banner(&self, text: &str) -> String {
        format!(" {} ", text.trim())
            .stylize()
            .on_black()
            .white()
            .bold()
            .to_string()
    }

    fn notice(&self, text: &str) -> String {
        format!("{:<width$}", format!(" {} ", text.trim()), width = URL_WIDTH)
            .stylize()
            .on_blue()
            .white()
            .to_string()
    }

    fn menu_index(&self, index: usize) -> String {
        format!("{:>3}", index).stylize().blue().to_string()
    }

    fn prompt(&self, text: &str) -> String {
        format!(" {} ", text.trim())
            .stylize()
            .on_green()
            .white()
            .bold()
            .to_string()
    }
}
