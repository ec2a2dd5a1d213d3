//! Memcached Request Parser
//!
//! This module extracts the verb and keys from memcached text protocol
//! requests captured off the wire.
//!
//! ## Design Philosophy
//!
//! 1. **Stateless**: Every call is a pure function of the buffer it is given.
//!    Captured payloads are parsed independently; a command split across two
//!    segments is reported as [`ParseError::Truncated`].
//! 2. **Pipelining**: Each call parses exactly one command and hands back the
//!    unconsumed remainder so the caller can keep draining the same payload.
//! 3. **Classified failures**: Malformed input maps to one of a closed set of
//!    error kinds, each with a stable stat label.
//!
//! ## How the Parser Works
//!
//! [`parse_command`] returns a [`ParsedCommand`] holding:
//! - `outcome: Ok(command)` - a complete request and the bytes after it
//! - `outcome: Err(ParseError::Truncated)` - the buffer ends mid-command,
//!   the remainder is empty
//! - `outcome: Err(other)` - malformed input, the remainder is the data after
//!   the offending line when it can be located, empty otherwise
//!
//! On success the remainder is always strictly shorter than the input.

use crate::protocol::types::{Command, Shape, Verb, CRLF, MAX_KEY_LENGTH};
use memchr::memchr;
use thiserror::Error;

/// Errors that can occur while parsing a request.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseError {
    /// The command line is empty
    #[error("empty command line")]
    NoCommand,

    /// The first token is not a known verb
    #[error("unknown command")]
    UnknownCommand,

    /// The verb is missing required arguments
    #[error("command is missing arguments")]
    IncompleteCommand,

    /// A key is too long or contains control characters
    #[error("invalid key")]
    InvalidKey,

    /// The data block length is not a non-negative integer
    #[error("invalid data block length")]
    InvalidLength,

    /// The data block is not terminated by CRLF
    #[error("bad data chunk")]
    BadDataChunk,

    /// The buffer ends before the command does
    #[error("truncated command")]
    Truncated,
}

impl ParseError {
    /// Every error kind, in declaration order.
    pub const ALL: [ParseError; 7] = [
        ParseError::NoCommand,
        ParseError::UnknownCommand,
        ParseError::IncompleteCommand,
        ParseError::InvalidKey,
        ParseError::InvalidLength,
        ParseError::BadDataChunk,
        ParseError::Truncated,
    ];

    /// The stable name this error is reported under.
    pub fn label(&self) -> &'static str {
        match self {
            ParseError::NoCommand => "no_cmd",
            ParseError::UnknownCommand => "invalid_cmd",
            ParseError::IncompleteCommand => "incomplete_cmd",
            ParseError::InvalidKey => "invalid_key",
            ParseError::InvalidLength => "invalid_length",
            ParseError::BadDataChunk => "bad_data_chunk",
            ParseError::Truncated => "truncated",
        }
    }
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// The result of one parse step over a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand<'a> {
    /// The parsed command, or why it could not be parsed
    pub outcome: ParseResult<Command>,
    /// Bytes left over after this command
    pub remainder: &'a [u8],
}

impl<'a> ParsedCommand<'a> {
    fn parsed(command: Command, remainder: &'a [u8]) -> Self {
        Self {
            outcome: Ok(command),
            remainder,
        }
    }

    fn failed(error: ParseError, remainder: &'a [u8]) -> Self {
        Self {
            outcome: Err(error),
            remainder,
        }
    }
}

/// Parses the first request in `buf`.
///
/// # Example
///
/// ```
/// use keyheat::protocol::{parse_command, Verb};
///
/// let parsed = parse_command(b"get a b\r\ndelete c\r\n");
/// let command = parsed.outcome.unwrap();
/// assert_eq!(command.verb, Verb::Get);
/// assert_eq!(command.keys, vec!["a", "b"]);
/// assert_eq!(parsed.remainder, b"delete c\r\n");
/// ```
pub fn parse_command(buf: &[u8]) -> ParsedCommand<'_> {
    let line_end = match memchr(b'\n', buf) {
        Some(pos) => pos,
        None => return ParsedCommand::failed(ParseError::Truncated, &[]),
    };

    let line = strip_cr(&buf[..line_end]);
    let rest = &buf[line_end + 1..];

    let mut tokens = line.split(|b| *b == b' ').filter(|t| !t.is_empty());

    let verb = match tokens.next() {
        Some(token) => match Verb::from_token(token) {
            Some(verb) => verb,
            None => return ParsedCommand::failed(ParseError::UnknownCommand, rest),
        },
        None => return ParsedCommand::failed(ParseError::NoCommand, rest),
    };

    let args: Vec<&[u8]> = tokens.collect();

    match verb.shape() {
        Shape::Keyless => ParsedCommand::parsed(Command::new(verb, Vec::new()), rest),

        Shape::MultiKey { skip } => {
            if args.len() <= skip {
                return ParsedCommand::failed(ParseError::IncompleteCommand, rest);
            }
            match collect_keys(&args[skip..]) {
                Ok(keys) => ParsedCommand::parsed(Command::new(verb, keys), rest),
                Err(e) => ParsedCommand::failed(e, rest),
            }
        }

        Shape::SingleKey { min_args } => {
            if args.len() < min_args {
                return ParsedCommand::failed(ParseError::IncompleteCommand, rest);
            }
            match collect_keys(&args[..1]) {
                Ok(keys) => ParsedCommand::parsed(Command::new(verb, keys), rest),
                Err(e) => ParsedCommand::failed(e, rest),
            }
        }

        Shape::Storage {
            min_args,
            length_at,
        } => {
            if args.len() < min_args {
                return ParsedCommand::failed(ParseError::IncompleteCommand, rest);
            }

            // Without a usable length the data block cannot be skipped
            let length = match parse_length(args[length_at]) {
                Some(n) => n,
                None => return ParsedCommand::failed(ParseError::InvalidLength, &[]),
            };

            let remainder = match skip_data_block(rest, length) {
                Ok(remainder) => remainder,
                Err(e) => return ParsedCommand::failed(e, &[]),
            };

            match collect_keys(&args[..1]) {
                Ok(keys) => ParsedCommand::parsed(Command::new(verb, keys), remainder),
                Err(e) => ParsedCommand::failed(e, remainder),
            }
        }
    }
}

/// Iterates over every command in a payload.
///
/// Draining stops when the buffer is exhausted, after a
/// [`ParseError::Truncated`], or if a step fails to consume any input.
pub fn commands(buf: &[u8]) -> Commands<'_> {
    Commands { buf }
}

/// Iterator returned by [`commands`].
#[derive(Debug, Clone)]
pub struct Commands<'a> {
    buf: &'a [u8],
}

impl Iterator for Commands<'_> {
    type Item = ParseResult<Command>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buf.is_empty() {
            return None;
        }

        let ParsedCommand { outcome, remainder } = parse_command(self.buf);

        if remainder.len() >= self.buf.len() {
            self.buf = &[];
        } else {
            self.buf = remainder;
        }

        Some(outcome)
    }
}

#[inline]
fn strip_cr(line: &[u8]) -> &[u8] {
    match line.split_last() {
        Some((b'\r', head)) => head,
        _ => line,
    }
}

fn collect_keys(tokens: &[&[u8]]) -> ParseResult<Vec<String>> {
    tokens
        .iter()
        .map(|token| {
            if token.len() > MAX_KEY_LENGTH || token.iter().any(u8::is_ascii_control) {
                Err(ParseError::InvalidKey)
            } else {
                Ok(key_name(token))
            }
        })
        .collect()
}

/// Reported form of a raw key.
///
/// UTF-8 keys are kept as they are. Keys that are not UTF-8, or that contain
/// a backslash, are byte-escaped (`\xfe`, `\\`), so distinct keys never
/// share a name.
fn key_name(token: &[u8]) -> String {
    match std::str::from_utf8(token) {
        Ok(key) if !key.contains('\\') => key.to_owned(),
        _ => token.escape_ascii().to_string(),
    }
}

fn parse_length(token: &[u8]) -> Option<usize> {
    std::str::from_utf8(token).ok()?.parse().ok()
}

/// Skips `<length>` bytes of data plus the trailing CRLF.
fn skip_data_block(buf: &[u8], length: usize) -> ParseResult<&[u8]> {
    let end = length.checked_add(CRLF.len()).ok_or(ParseError::InvalidLength)?;
    if buf.len() < end {
        return Err(ParseError::Truncated);
    }
    if &buf[length..end] != CRLF {
        return Err(ParseError::BadDataChunk);
    }
    Ok(&buf[end..])
}
