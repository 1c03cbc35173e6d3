use std::fmt;
use std::fmt::{Debug, Display, Formatter};

/// A contiguous range of columns on a single line of the input.
///
/// The query stream is a flat sequence of integer tokens, so a span never covers more than one
/// line.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct Span {
    /// The zero-indexed line of this span.
    line: usize,
    /// The (included) zero-indexed column this span starts on.
    start_column: usize,
    /// The (included) zero-indexed column this span ends on.
    ///
    /// Always `>= start_column`.
    end_column: usize,
}

impl Span {
    /// Creates a new span that starts at a specific position and covers a single column.
    pub fn new_at(line: usize, column: usize) -> Self {
        Self {
            line,
            start_column: column,
            end_column: column,
        }
    }

    /// Creates a new span that starts at the start of this span, but covers `width + 1` columns.
    pub fn with_length(self, width: usize) -> Self {
        Self {
            end_column: self.start_column + width,
            ..self
        }
    }

    /// Prints the line this span is on to standard error, with the span underlined.
    pub fn highlight(&self, input: &str) {
        let Some(line) = input.lines().nth(self.line) else {
            return;
        };
        eprintln!("{}", line);
        let padding = " ".repeat(self.start_column);
        let underline = "^".repeat(self.end_column - self.start_column + 1);
        eprintln!("{}{}", padding, underline);
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.start_column + 1)
    }
}

impl Debug for Span {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Display::fmt(self, f)
    }
}
