//! IMAP protocol parser.
//!
//! A sans-I/O parser for the server responses this client deals with.
//! The lexer turns bytes into tokens (atoms, strings, literals, numbers)
//! and the response parser builds [`Response`] values from them.
//!
//! # Example
//!
//! ```
//! use mailsort_imap::parser::{Response, ResponseParser, UntaggedResponse};
//!
//! let response = ResponseParser::parse(b"* OK Gimap ready\r\n").unwrap();
//!
//! match response {
//!     Response::Untagged(UntaggedResponse::Ok { text, .. }) => assert_eq!(text, "Gimap ready"),
//!     _ => panic!("Expected untagged OK"),
//! }
//! ```

pub mod lexer;
pub mod response;

pub use lexer::{Lexer, Token};
pub use response::{FetchItem, Response, ResponseParser, UntaggedResponse};
