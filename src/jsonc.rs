//! Comment handling for JSON documents that allow `//` and `/* */` comments.

use crate::error::{Error, Result};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Code,
    Text,
    TextEscape,
    LineComment,
    BlockComment,
}

/// Removes comments outside of string literals.
///
/// Line comments keep their terminating newline and block comments are
/// replaced by a single space, so tokens on either side never merge.
///
/// # Errors
/// * `Error::FeatureFormat` if a block comment is not closed
pub fn strip_comments(input: &str, location: &str) -> Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut mode = Mode::Code;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match mode {
            Mode::Code => match (c, chars.peek()) {
                ('/', Some('/')) => {
                    chars.next();
                    mode = Mode::LineComment;
                }
                ('/', Some('*')) => {
                    chars.next();
                    mode = Mode::BlockComment;
                }
                ('"', _) => {
                    out.push(c);
                    mode = Mode::Text;
                }
                _ => out.push(c),
            },
            Mode::Text => {
                out.push(c);
                match c {
                    '\\' => mode = Mode::TextEscape,
                    '"' => mode = Mode::Code,
                    _ => {}
                }
            }
            Mode::TextEscape => {
                out.push(c);
                mode = Mode::Text;
            }
            Mode::LineComment => {
                if c == '\n' {
                    out.push(c);
                    mode = Mode::Code;
                }
            }
            Mode::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    out.push(' ');
                    mode = Mode::Code;
                }
            }
        }
    }

    if mode == Mode::BlockComment {
        return Err(Error::FeatureFormat {
            path: location.to_string(),
            reason: "Unterminated comment".to_string(),
        });
    }
    Ok(out)
}
