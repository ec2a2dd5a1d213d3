//! Memcached Text Protocol Types
//!
//! This module defines the request-side vocabulary of the memcached text
//! protocol: the verbs a client may send and the parsed form of one command.
//!
//! ## Protocol Format
//!
//! Every request starts with a command line terminated by CRLF. Storage
//! commands are followed by a data block of exactly `<bytes>` bytes, itself
//! terminated by CRLF.
//!
//! ## Examples
//!
//! Retrieval: `get user:1 user:2\r\n`
//! Storage: `set user:1 0 60 5\r\nhello\r\n`
//! Arithmetic: `incr counter 1\r\n`
//! Meta: `mg user:1 v t\r\n`

use std::fmt;

/// The CRLF terminator used by the text protocol
pub const CRLF: &[u8] = b"\r\n";

/// Longest key memcached accepts
pub const MAX_KEY_LENGTH: usize = 250;

/// How the arguments following a verb are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Shape {
    /// One or more keys, after `skip` leading arguments (`gat` carries an exptime first)
    MultiKey { skip: usize },
    /// A single key followed by at least `min_args - 1` further arguments
    SingleKey { min_args: usize },
    /// A key, then arguments, the one at `length_at` giving the data block size
    Storage { min_args: usize, length_at: usize },
    /// No key at all
    Keyless,
}

/// A request verb of the memcached text protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Gets,
    Gat,
    Gats,
    Set,
    Add,
    Replace,
    Append,
    Prepend,
    Cas,
    Delete,
    Incr,
    Decr,
    Touch,
    MetaGet,
    MetaSet,
    MetaDelete,
    MetaArithmetic,
    MetaNoop,
    Version,
    Stats,
    FlushAll,
    Verbosity,
    Quit,
}

impl Verb {
    /// Looks up a verb by its wire token. Verbs are case-sensitive.
    pub fn from_token(token: &[u8]) -> Option<Self> {
        let verb = match token {
            b"get" => Verb::Get,
            b"gets" => Verb::Gets,
            b"gat" => Verb::Gat,
            b"gats" => Verb::Gats,
            b"set" => Verb::Set,
            b"add" => Verb::Add,
            b"replace" => Verb::Replace,
            b"append" => Verb::Append,
            b"prepend" => Verb::Prepend,
            b"cas" => Verb::Cas,
            b"delete" => Verb::Delete,
            b"incr" => Verb::Incr,
            b"decr" => Verb::Decr,
            b"touch" => Verb::Touch,
            b"mg" => Verb::MetaGet,
            b"ms" => Verb::MetaSet,
            b"md" => Verb::MetaDelete,
            b"ma" => Verb::MetaArithmetic,
            b"mn" => Verb::MetaNoop,
            b"version" => Verb::Version,
            b"stats" => Verb::Stats,
            b"flush_all" => Verb::FlushAll,
            b"verbosity" => Verb::Verbosity,
            b"quit" => Verb::Quit,
            _ => return None,
        };
        Some(verb)
    }

    /// The verb as it appears on the wire and in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "get",
            Verb::Gets => "gets",
            Verb::Gat => "gat",
            Verb::Gats => "gats",
            Verb::Set => "set",
            Verb::Add => "add",
            Verb::Replace => "replace",
            Verb::Append => "append",
            Verb::Prepend => "prepend",
            Verb::Cas => "cas",
            Verb::Delete => "delete",
            Verb::Incr => "incr",
            Verb::Decr => "decr",
            Verb::Touch => "touch",
            Verb::MetaGet => "mg",
            Verb::MetaSet => "ms",
            Verb::MetaDelete => "md",
            Verb::MetaArithmetic => "ma",
            Verb::MetaNoop => "mn",
            Verb::Version => "version",
            Verb::Stats => "stats",
            Verb::FlushAll => "flush_all",
            Verb::Verbosity => "verbosity",
            Verb::Quit => "quit",
        }
    }

    pub(crate) fn shape(&self) -> Shape {
        match self {
            Verb::Get | Verb::Gets => Shape::MultiKey { skip: 0 },
            Verb::Gat | Verb::Gats => Shape::MultiKey { skip: 1 },
            Verb::Set | Verb::Add | Verb::Replace | Verb::Append | Verb::Prepend => {
                Shape::Storage {
                    min_args: 4,
                    length_at: 3,
                }
            }
            Verb::Cas => Shape::Storage {
                min_args: 5,
                length_at: 3,
            },
            Verb::MetaSet => Shape::Storage {
                min_args: 2,
                length_at: 1,
            },
            Verb::Delete | Verb::MetaGet | Verb::MetaDelete | Verb::MetaArithmetic => {
                Shape::SingleKey { min_args: 1 }
            }
            Verb::Incr | Verb::Decr | Verb::Touch => Shape::SingleKey { min_args: 2 },
            Verb::MetaNoop
            | Verb::Version
            | Verb::Stats
            | Verb::FlushAll
            | Verb::Verbosity
            | Verb::Quit => Shape::Keyless,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One complete request overheard on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// The request verb
    pub verb: Verb,
    /// Keys referenced by the request, in wire order (empty for keyless verbs)
    pub keys: Vec<String>,
}

impl Command {
    pub fn new(verb: Verb, keys: Vec<String>) -> Self {
        Self { verb, keys }
    }
}
