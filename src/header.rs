//! Structured header parsing for directory configuration strings.
//!
//! A header is a comma separated list of clauses. Each clause starts with one
//! or more `;` separated paths followed by parameters:
//!
//! ```text
//! features1;model=quickstart;runmodes:List<String>="author,publish";mode:=strict
//! ```
//!
//! * `key=value` is a plain attribute
//! * `key:Type=value` is a typed attribute, the type is kept in [`Clause::types`]
//! * `key:=value` is a directive
//!
//! Values may be double quoted, in which case `,` and `;` are literal. A
//! backslash escapes the following character; it is kept in the value.

use std::fmt;

use indexmap::IndexMap;

use crate::error::{Error, Result};

/// One comma separated unit of a header.
///
/// Equality ignores the order of attributes and directives but not of paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Clause {
    pub paths: Vec<String>,
    pub directives: IndexMap<String, String>,
    pub attributes: IndexMap<String, String>,
    /// Declared type of typed attributes, keyed like `attributes`
    pub types: IndexMap<String, String>,
}

impl Clause {
    /// The first path of the clause, which names a directory for feature configs.
    pub fn path(&self) -> Option<&str> {
        self.paths.first().map(String::as_str)
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn directive(&self, key: &str) -> Option<&str> {
        self.directives.get(key).map(String::as_str)
    }

    /// Looks the key up as an attribute first, then as a directive.
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.attribute(key).or_else(|| self.directive(key))
    }
}

impl fmt::Display for Clause {
    /// Renders the clause back into header syntax. Values are always quoted.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.paths.join(";"))?;
        for (key, value) in &self.directives {
            write!(f, ";{key}:=\"{value}\"")?;
        }
        for (key, value) in &self.attributes {
            match self.types.get(key) {
                Some(kind) => write!(f, ";{key}:{kind}=\"{value}\"")?,
                None => write!(f, ";{key}=\"{value}\"")?,
            }
        }
        Ok(())
    }
}

/// Parses a header into its clauses.
///
/// An empty or blank header yields no clauses.
///
/// # Errors
/// * `Error::HeaderSyntax` if the input ends inside a key or a value
/// * `Error::DuplicateAttribute` if a key repeats within one clause
pub fn parse_header(header: &str) -> Result<Vec<Clause>> {
    if header.trim().is_empty() {
        return Ok(Vec::new());
    }
    Tokenizer::new(header).run()
}

/// Renders clauses back into a header string.
pub fn render_header(clauses: &[Clause]) -> String {
    clauses.iter().map(Clause::to_string).collect::<Vec<_>>().join(",")
}

/// Tokenizer states. The order matters: input may only end in a state up to
/// and including `ParameterStart`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum State {
    ClauseStart,
    ParameterStart,
    Key,
    DirectiveOrTypedAttribute,
    Argument,
    Value,
}

#[derive(Debug, Clone, Copy)]
enum Target {
    Attributes,
    Directives,
}

/// Byte level state machine. Every delimiter is ASCII, so slicing at delimiter
/// positions always lands on a char boundary.
struct Tokenizer<'a> {
    header: &'a str,
    bytes: &'a [u8],
    state: State,
    /// Position of the byte being looked at
    pos: usize,
    /// Start of the token under construction
    start: usize,
    key: String,
    target: Target,
    quoted: bool,
    escaped: bool,
    clauses: Vec<Clause>,
}

impl<'a> Tokenizer<'a> {
    fn new(header: &'a str) -> Self {
        Self {
            header,
            bytes: header.as_bytes(),
            state: State::ClauseStart,
            pos: 0,
            start: 0,
            key: String::new(),
            target: Target::Attributes,
            quoted: false,
            escaped: false,
            clauses: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Clause>> {
        loop {
            // `None` marks the end of input and is dispatched exactly once.
            let current = self.bytes.get(self.pos).copied();
            match self.state {
                State::ClauseStart => self.clause_start(current),
                State::ParameterStart => self.parameter_start(current),
                State::Key => self.key(current),
                State::DirectiveOrTypedAttribute => self.directive_or_typed_attribute(current),
                State::Argument => self.argument(current),
                State::Value => self.value(current)?,
            }
            if current.is_none() {
                break;
            }
        }

        if self.state > State::ParameterStart {
            return Err(Error::HeaderSyntax {
                header: self.header.to_string(),
            });
        }
        Ok(self.clauses)
    }

    fn token(&self) -> &'a str {
        self.header[self.start..self.pos].trim()
    }

    fn clause(&mut self) -> &mut Clause {
        if self.clauses.is_empty() {
            self.clauses.push(Clause::default());
        }
        let last = self.clauses.len() - 1;
        &mut self.clauses[last]
    }

    fn clause_start(&mut self, current: Option<u8>) {
        self.clauses.push(Clause::default());
        self.state = State::ParameterStart;
        self.parameter_start(current);
    }

    fn parameter_start(&mut self, current: Option<u8>) {
        self.start = self.pos;
        self.state = State::Key;
        self.key(current);
    }

    fn key(&mut self, current: Option<u8>) {
        match current {
            Some(c @ (b':' | b'=')) => {
                self.key = self.token().to_string();
                self.start = self.pos + 1;
                self.target = Target::Attributes;
                self.state = if c == b':' {
                    State::DirectiveOrTypedAttribute
                } else {
                    State::Argument
                };
            }
            None | Some(b',' | b';') => {
                let path = self.token().to_string();
                self.clause().paths.push(path);
                self.state = if current == Some(b',') {
                    State::ClauseStart
                } else {
                    State::ParameterStart
                };
            }
            Some(_) => {}
        }
        self.pos += 1;
    }

    fn directive_or_typed_attribute(&mut self, current: Option<u8>) {
        if current == Some(b'=') {
            if self.start != self.pos {
                let kind = self.token().to_string();
                let key = self.key.clone();
                self.clause().types.insert(key, kind);
            } else {
                self.target = Target::Directives;
            }
            self.state = State::Argument;
            self.start = self.pos + 1;
        }
        self.pos += 1;
    }

    fn argument(&mut self, current: Option<u8>) {
        self.quoted = current == Some(b'"');
        if self.quoted {
            self.pos += 1;
        }
        match current {
            Some(c) if c.is_ascii_whitespace() => self.pos += 1,
            _ => self.state = State::Value,
        }
    }

    fn value(&mut self, current: Option<u8>) -> Result<()> {
        if self.escaped {
            self.escaped = false;
        } else if current == Some(b'\\') {
            self.escaped = true;
        } else if self.quoted && current == Some(b'"') {
            self.quoted = false;
        } else if !self.quoted && matches!(current, None | Some(b';' | b',')) {
            self.store_value()?;
            self.state = if current == Some(b';') {
                State::ParameterStart
            } else {
                State::ClauseStart
            };
        }
        self.pos += 1;
        Ok(())
    }

    fn store_value(&mut self) -> Result<()> {
        let mut value = self.token();
        if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
            value = &value[1..value.len() - 1];
        }
        let value = value.to_string();
        let key = std::mem::take(&mut self.key);
        let target = self.target;
        let clause = self.clause();
        let map = match target {
            Target::Attributes => &mut clause.attributes,
            Target::Directives => &mut clause.directives,
        };
        if map.insert(key.clone(), value).is_some() {
            return Err(Error::DuplicateAttribute {
                key,
                header: self.header.to_string(),
            });
        }
        Ok(())
    }
}
