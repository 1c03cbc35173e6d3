use crate::exceptions::{InputException, InputResult};
use crate::location::Span;

/// A reader can be used to scan whitespace-separated integer tokens from the query stream.
#[derive(Debug)]
pub struct Reader {
    chars: Vec<char>,
    cursor: usize,
    line: usize,
    column: usize,
}

impl Reader {
    /// Creates a new reader from the content of the query stream.
    pub fn new(content: &str) -> Self {
        Self {
            chars: content.chars().collect(),
            cursor: 0,
            line: 0,
            column: 0,
        }
    }

    /// Returns a copy of the next character.
    fn peek(&self) -> Option<char> {
        self.chars.get(self.cursor).copied()
    }

    /// Skips the next character. This operation has the side effect of advancing the reader and
    /// updating its position.
    fn advance(&mut self) {
        match self.peek() {
            Some('\n') => {
                self.line += 1;
                self.column = 0;
            }
            Some(_) => self.column += 1,
            None => (),
        }
        self.cursor += 1;
    }

    /// Skips all characters until the next non-whitespace character, according to
    /// [`char::is_whitespace`].
    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance()
        }
    }

    /// Reads the next whitespace-delimited token and the span it covers. Returns [`None`] at the
    /// end of the input.
    fn next_token(&mut self) -> Option<(String, Span)> {
        self.skip_whitespace();
        self.peek()?;
        let start = Span::new_at(self.line, self.column);
        let mut token = String::new();
        while let Some(character) = self.peek() {
            if character.is_whitespace() {
                break;
            }
            token.push(character);
            self.advance();
        }
        let span = start.with_length(token.chars().count() - 1);
        Some((token, span))
    }

    /// Reads the next token as an integer. `description` names the value being read, and is used
    /// in the exception raised when the input ends early.
    pub fn read_integer(&mut self, description: &str) -> InputResult<(i64, Span)> {
        self.skip_whitespace();
        let Some((token, span)) = self.next_token() else {
            let position = Span::new_at(self.line, self.column);
            return Err(InputException::end_of_input(position, description));
        };
        match token.parse::<i64>() {
            Ok(value) => Ok((value, span)),
            // A token made of digits that overflows `i64` is a value error, not a syntax error.
            Err(_) if token.parse::<i128>().is_ok() => {
                Err(InputException::integer_out_of_range(span, &token))
            }
            Err(_) => Err(InputException::expected_integer(span, &token)),
        }
    }
}
