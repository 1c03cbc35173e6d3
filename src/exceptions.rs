use std::fmt;
use std::fmt::{Display, Formatter};

use crate::location::Span;

#[derive(Debug)]
enum ExceptionType {
    Syntax,
    Value,
}

impl Display for ExceptionType {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Syntax => write!(f, "Syntax error"),
            Self::Value => write!(f, "Value error"),
        }
    }
}


/// An exception that corresponds to an error in the query stream.
#[derive(Debug)]
pub struct InputException {
    span: Span,
    r#type: ExceptionType,
    message: String,
    hint: Option<String>,
}

impl InputException {
    fn new_syntax_error(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            r#type: ExceptionType::Syntax,
            message: message.into(),
            hint: None,
        }
    }

    fn new_value_error(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            r#type: ExceptionType::Value,
            message: message.into(),
            hint: None,
        }
    }

    fn with_hint(mut self, hint: impl Into<String>) -> Self {
        let hint_string = hint.into();
        debug_assert!(hint_string.ends_with('.') || hint_string.ends_with('?'), "Hint should be a full sentence");
        self.hint = Some(hint_string);
        self
    }

    pub fn end_of_input(span: Span, expected: impl Display) -> Self {
        Self::new_syntax_error(span, format!("Expected {} but reached the end of the input", expected))
    }

    pub fn expected_integer(span: Span, found: &str) -> Self {
        Self::new_syntax_error(span, format!("Expected an integer but found `{}`", found))
    }

    pub fn integer_out_of_range(span: Span, found: &str) -> Self {
        Self::new_value_error(span, format!("Integer `{}` is out of range", found))
    }

    pub fn invalid_memory_size(span: Span, size: i64) -> Self {
        Self::new_value_error(span, format!("Invalid memory size {}", size))
            .with_hint("The memory size must be a positive integer.")
    }

    pub fn invalid_query_count(span: Span, count: i64) -> Self {
        Self::new_value_error(span, format!("Invalid query count {}", count))
            .with_hint("The query count must be a non-negative integer.")
    }

    /// Prints a formatted error message to standard error, highlighting the relevant part of the
    /// input.
    pub fn print_with_input(&self, input: &str) {
        eprintln!("{}", self);
        self.span.highlight(input);
        if let Some(hint) = &self.hint {
            eprintln!("Hint: {}", hint)
        }
    }
}

impl Display for InputException {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}: {}: {}", self.span, self.r#type, self.message)
    }
}


/// The result of an operation on the query stream.
///
/// This is a [`Result`] whose error type is an [`InputException`].
pub type InputResult<T> = Result<T, InputException>;
