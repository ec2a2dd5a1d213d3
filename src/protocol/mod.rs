//! Memcached Text Protocol
//!
//! This module understands the request side of the memcached text protocol,
//! just enough to tell which keys a client is touching.
//!
//! ## Modules
//!
//! - `types`: Request verbs and the parsed `Command`
//! - `parser`: Stateless, pipelining-aware request parser
//!
//! ## Example
//!
//! ```
//! use keyheat::protocol::{commands, Verb};
//!
//! let payload = b"get a b\r\nset c 0 0 1\r\nx\r\n";
//! let verbs: Vec<Verb> = commands(payload)
//!     .filter_map(Result::ok)
//!     .map(|c| c.verb)
//!     .collect();
//! assert_eq!(verbs, vec![Verb::Get, Verb::Set]);
//! ```

pub mod parser;
pub mod types;

// Re-export commonly used types for convenience
pub use parser::{commands, parse_command, Commands, ParseError, ParseResult, ParsedCommand};
pub use types::{Command, Verb};
