//! Pretty error reporting for Prosa
//! Shows source context with line numbers and error highlighting

use crate::error::ProsaError;
use crate::span::Span;

/// Diagnostic renderer for pretty error messages
pub struct Diagnostics<'a> {
    source: &'a str,
    filename: &'a str,
}

impl<'a> Diagnostics<'a> {
    pub fn new(source: &'a str, filename: &'a str) -> Self {
        Self { source, filename }
    }

    /// Format an error, with source context when it carries a span.
    pub fn format_error(&self, error: &ProsaError) -> String {
        match error {
            ProsaError::Lexical { message, span } => {
                self.format_with_context("Lexical Error", message, *span)
            }
            ProsaError::Syntax { message, span } => {
                self.format_with_context("Syntax Error", message, *span)
            }
            ProsaError::Name { message } => self.format_plain("Name Error", message),
            ProsaError::Type { message } => self.format_plain("Type Error", message),
            ProsaError::Arithmetic { message } => self.format_plain("Arithmetic Error", message),
            ProsaError::Generation { message } => self.format_plain("Generation Error", message),
            ProsaError::Io(e) => self.format_plain("IO Error", &e.to_string()),
        }
    }

    fn format_plain(&self, error_type: &str, message: &str) -> String {
        format!("\n\x1b[1;31merror[{}]\x1b[0m: {}\n", error_type, message)
    }

    fn format_with_context(&self, error_type: &str, message: &str, span: Span) -> String {
        let (line_num, col, line_content) = self.get_line_info(span);

        let mut output = String::new();

        output.push_str(&format!(
            "\n\x1b[1;31merror[{}]\x1b[0m: {}\n",
            error_type, message
        ));

        output.push_str(&format!(
            "  \x1b[1;34m-->\x1b[0m {}:{}:{}\n",
            self.filename, line_num, col
        ));

        output.push_str("   \x1b[1;34m|\x1b[0m\n");

        output.push_str(&format!(
            "\x1b[1;34m{:>3} |\x1b[0m {}\n",
            line_num, line_content
        ));

        let pointer_offset = col.saturating_sub(1);
        let content_len = line_content.len();
        let remaining_len = content_len.saturating_sub(pointer_offset);
        let pointer_len = span.len().min(remaining_len).max(1);

        output.push_str(&format!(
            "   \x1b[1;34m|\x1b[0m {}\x1b[1;31m{}\x1b[0m\n",
            " ".repeat(pointer_offset),
            "^".repeat(pointer_len)
        ));

        output.push_str("   \x1b[1;34m|\x1b[0m\n");

        output
    }

    /// 1-based line and column plus the line's text for a byte span.
    fn get_line_info(&self, span: Span) -> (usize, usize, &str) {
        let mut line_start = 0;
        let mut last: (usize, usize, &str) = (1, 1, "");
        for (index, line) in self.source.lines().enumerate() {
            let line_end = line_start + line.len();
            if span.start <= line_end {
                return (index + 1, span.start - line_start + 1, line);
            }
            last = (index + 1, line.len() + 1, line);
            line_start = line_end + 1;
        }
        last
    }
}
