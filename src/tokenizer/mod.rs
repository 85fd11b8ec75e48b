//! Streaming tokenizer: character stream in, raw records out.
//!
//! The tokenizer is a byte-level state machine over any [`std::io::Read`]
//! source. It handles quoting, escaping, embedded delimiters and newlines,
//! comment and blank lines, and input delivered in arbitrarily sized chunks.
//! Its inverse, quoting on the way out, lives with the
//! [writer](crate::writer).

pub mod parser;
pub mod record;

pub use parser::Tokenizer;
pub use record::Record;
