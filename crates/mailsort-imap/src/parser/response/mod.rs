//! IMAP response parser.
//!
//! Parses one complete response (a line plus any literals it announced)
//! into a [`Response`].

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::match_same_arms)]

mod fetch;
mod helpers;
mod types;

pub use types::{FetchItem, UntaggedResponse};

use crate::parser::lexer::{Lexer, Token};
use crate::types::{ResponseCode, SeqNum, Status, Tag};
use crate::{Error, Result};

use helpers::{
    parse_capability_data, parse_flag_list, parse_response_code, parse_search_response,
    read_text_until_crlf,
};

/// A parsed IMAP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Tagged response (command completion).
    Tagged {
        /// The command tag.
        tag: Tag,
        /// Response status.
        status: Status,
        /// Optional response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// Untagged response (server data).
    Untagged(UntaggedResponse),
    /// Continuation request.
    Continuation {
        /// Optional text/data.
        text: Option<String>,
    },
}

/// Response parser.
pub struct ResponseParser;

impl ResponseParser {
    /// Parses a complete response.
    pub fn parse(input: &[u8]) -> Result<Response> {
        let mut lexer = Lexer::new(input);

        match lexer.next_token()? {
            Token::Asterisk => Self::parse_untagged(&mut lexer),
            Token::Plus => Ok(Self::parse_continuation(&mut lexer)),
            Token::Atom(tag) => Self::parse_tagged(&mut lexer, Tag::new(tag)),
            Token::Number(n) => Self::parse_tagged(&mut lexer, Tag::new(n.to_string())),
            token => Err(Error::Parse {
                position: 0,
                message: format!("expected *, + or tag, got {token:?}"),
            }),
        }
    }

    fn parse_tagged(lexer: &mut Lexer<'_>, tag: Tag) -> Result<Response> {
        lexer.expect_space()?;
        let status = Self::parse_status(lexer)?;
        let (code, text) = Self::parse_resp_text(lexer)?;

        Ok(Response::Tagged {
            tag,
            status,
            code,
            text,
        })
    }

    fn parse_untagged(lexer: &mut Lexer<'_>) -> Result<Response> {
        lexer.expect_space()?;

        let untagged = match lexer.next_token()? {
            Token::Atom(s) => match s.to_ascii_uppercase().as_str() {
                "OK" => {
                    let (code, text) = Self::parse_resp_text(lexer)?;
                    UntaggedResponse::Ok { code, text }
                }
                "NO" => {
                    let (code, text) = Self::parse_resp_text(lexer)?;
                    UntaggedResponse::No { code, text }
                }
                "BAD" => {
                    let (code, text) = Self::parse_resp_text(lexer)?;
                    UntaggedResponse::Bad { code, text }
                }
                "PREAUTH" => {
                    let (code, text) = Self::parse_resp_text(lexer)?;
                    UntaggedResponse::PreAuth { code, text }
                }
                "BYE" => {
                    let (code, text) = Self::parse_resp_text(lexer)?;
                    UntaggedResponse::Bye { code, text }
                }
                "CAPABILITY" => UntaggedResponse::Capability(parse_capability_data(lexer)?),
                "FLAGS" => {
                    lexer.expect_space()?;
                    UntaggedResponse::Flags(parse_flag_list(lexer)?)
                }
                "SEARCH" => UntaggedResponse::Search(parse_search_response(lexer)?),
                _ => {
                    read_text_until_crlf(lexer);
                    UntaggedResponse::Other(s.to_ascii_uppercase())
                }
            },
            Token::Number(n) => {
                lexer.expect_space()?;
                let keyword = lexer.read_atom_string()?;

                match keyword.to_ascii_uppercase().as_str() {
                    "EXISTS" => UntaggedResponse::Exists(n),
                    "RECENT" => UntaggedResponse::Recent(n),
                    "EXPUNGE" => UntaggedResponse::Expunge(Self::seq(lexer, n)?),
                    "FETCH" => {
                        let seq = Self::seq(lexer, n)?;
                        lexer.expect_space()?;
                        let items = fetch::parse_fetch_response(lexer)?;
                        UntaggedResponse::Fetch { seq, items }
                    }
                    other => {
                        read_text_until_crlf(lexer);
                        UntaggedResponse::Other(other.to_string())
                    }
                }
            }
            token => {
                return Err(Error::Parse {
                    position: lexer.position(),
                    message: format!("unexpected token in untagged response: {token:?}"),
                });
            }
        };

        Ok(Response::Untagged(untagged))
    }

    fn parse_continuation(lexer: &mut Lexer<'_>) -> Response {
        lexer.eat(b' ');
        let text = read_text_until_crlf(lexer);

        Response::Continuation {
            text: (!text.is_empty()).then_some(text),
        }
    }

    fn parse_status(lexer: &mut Lexer<'_>) -> Result<Status> {
        let s = lexer.read_atom_string()?;
        match s.to_ascii_uppercase().as_str() {
            "OK" => Ok(Status::Ok),
            "NO" => Ok(Status::No),
            "BAD" => Ok(Status::Bad),
            "PREAUTH" => Ok(Status::PreAuth),
            "BYE" => Ok(Status::Bye),
            _ => Err(Error::Parse {
                position: lexer.position(),
                message: format!("invalid status: {s}"),
            }),
        }
    }

    /// Parses `[SP [code] SP] text CRLF` after a status keyword.
    ///
    /// The space and text are optional; some servers send a bare `* OK`.
    fn parse_resp_text(lexer: &mut Lexer<'_>) -> Result<(Option<ResponseCode>, String)> {
        lexer.eat(b' ');

        let code = if lexer.peek() == Some(b'[') {
            Some(parse_response_code(lexer)?)
        } else {
            None
        };
        lexer.eat(b' ');

        Ok((code, read_text_until_crlf(lexer)))
    }

    fn seq(lexer: &Lexer<'_>, n: u32) -> Result<SeqNum> {
        SeqNum::new(n).ok_or_else(|| Error::Parse {
            position: lexer.position(),
            message: "invalid sequence number 0".to_string(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use crate::types::{Capability, Flag};

    use super::*;

    #[test]
    fn test_parse_greeting() {
        let response = ResponseParser::parse(b"* OK Gimap ready for requests\r\n").unwrap();

        match response {
            Response::Untagged(UntaggedResponse::Ok { code, text }) => {
                assert!(code.is_none());
                assert_eq!(text, "Gimap ready for requests");
            }
            _ => panic!("Expected untagged OK"),
        }
    }

    #[test]
    fn test_parse_bare_ok() {
        let response = ResponseParser::parse(b"* OK\r\n").unwrap();
        assert_eq!(
            response,
            Response::Untagged(UntaggedResponse::Ok {
                code: None,
                text: String::new(),
            })
        );
    }

    #[test]
    fn test_parse_tagged_no_with_code() {
        let input = b"A0001 NO [AUTHENTICATIONFAILED] Invalid credentials (Failure)\r\n";
        let response = ResponseParser::parse(input).unwrap();

        match response {
            Response::Tagged {
                tag,
                status,
                code,
                text,
            } => {
                assert_eq!(tag.as_str(), "A0001");
                assert_eq!(status, Status::No);
                assert_eq!(code, Some(ResponseCode::AuthenticationFailed));
                assert_eq!(text, "Invalid credentials (Failure)");
            }
            _ => panic!("Expected tagged response"),
        }
    }

    #[test]
    fn test_parse_capability() {
        let input = b"* CAPABILITY IMAP4rev1 UNSELECT IDLE X-GM-EXT-1 SASL-IR AUTH=XOAUTH2\r\n";
        let response = ResponseParser::parse(input).unwrap();

        match response {
            Response::Untagged(UntaggedResponse::Capability(caps)) => {
                assert!(caps.contains(&Capability::Imap4Rev1));
                assert!(caps.contains(&Capability::GmailExt1));
                assert!(caps.contains(&Capability::SaslIr));
                assert!(caps.contains(&Capability::Auth("XOAUTH2".into())));
            }
            _ => panic!("Expected capability response"),
        }
    }

    #[test]
    fn test_parse_exists() {
        let response = ResponseParser::parse(b"* 23 EXISTS\r\n").unwrap();
        assert_eq!(response, Response::Untagged(UntaggedResponse::Exists(23)));
    }

    #[test]
    fn test_parse_flags() {
        let input = b"* FLAGS (\\Answered \\Flagged \\Draft \\Deleted \\Seen $Phishing)\r\n";
        let response = ResponseParser::parse(input).unwrap();

        match response {
            Response::Untagged(UntaggedResponse::Flags(flags)) => {
                assert!(flags.contains(&Flag::Seen));
                assert!(flags.contains(&Flag::Keyword("$Phishing".into())));
                assert_eq!(flags.len(), 6);
            }
            _ => panic!("Expected FLAGS"),
        }
    }

    #[test]
    fn test_unknown_untagged_is_tolerated() {
        let response = ResponseParser::parse(b"* LIST (\\HasNoChildren) \"/\" \"INBOX\"\r\n").unwrap();
        assert_eq!(response, Response::Untagged(UntaggedResponse::Other("LIST".into())));
    }

    #[test]
    fn test_parse_continuation() {
        let response = ResponseParser::parse(b"+ eyJzdGF0dXMiOiI0MDAifQ==\r\n").unwrap();
        assert_eq!(
            response,
            Response::Continuation {
                text: Some("eyJzdGF0dXMiOiI0MDAifQ==".to_string()),
            }
        );

        let empty = ResponseParser::parse(b"+\r\n").unwrap();
        assert_eq!(empty, Response::Continuation { text: None });
    }

    #[test]
    fn test_parse_response_code() {
        let input = b"* OK [UIDVALIDITY 3857529045] UIDs valid\r\n";
        let response = ResponseParser::parse(input).unwrap();

        match response {
            Response::Untagged(UntaggedResponse::Ok { code, text }) => {
                assert_eq!(code, Some(ResponseCode::UidValidity(3_857_529_045)));
                assert_eq!(text, "UIDs valid");
            }
            _ => panic!("Expected untagged OK"),
        }
    }

    #[test]
    fn test_parse_fetch_with_body() {
        let input = b"* 2 FETCH (UID 41 BODY[] {5}\r\nHi!\r\n)\r\n";
        let response = ResponseParser::parse(input).unwrap();

        match response {
            Response::Untagged(UntaggedResponse::Fetch { seq, items }) => {
                assert_eq!(seq.get(), 2);
                assert_eq!(items[0], FetchItem::Uid(41));
                assert_eq!(
                    items[1],
                    FetchItem::Body {
                        section: None,
                        data: Some(b"Hi!\r\n".to_vec()),
                    }
                );
            }
            _ => panic!("Expected FETCH"),
        }
    }

    #[test]
    fn test_parse_search() {
        let response = ResponseParser::parse(b"* SEARCH 1 2 3 5 8 13\r\n").unwrap();

        match response {
            Response::Untagged(UntaggedResponse::Search(nums)) => {
                let values: Vec<u32> = nums.iter().map(|s| s.get()).collect();
                assert_eq!(values, vec![1, 2, 3, 5, 8, 13]);
            }
            _ => panic!("Expected SEARCH"),
        }
    }

    #[test]
    fn test_zero_sequence_rejected() {
        assert!(ResponseParser::parse(b"* 0 FETCH (UID 1)\r\n").is_err());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn parse_never_panics(input in proptest::collection::vec(any::<u8>(), 0..256)) {
            let _ = ResponseParser::parse(&input);
        }

        #[test]
        fn search_numbers_survive(nums in proptest::collection::vec(1u32..=u32::MAX, 0..32)) {
            let mut line = b"* SEARCH".to_vec();
            for n in &nums {
                line.extend_from_slice(format!(" {n}").as_bytes());
            }
            line.extend_from_slice(b"\r\n");

            let Ok(Response::Untagged(UntaggedResponse::Search(ids))) = ResponseParser::parse(&line) else {
                return Err(TestCaseError::fail("expected SEARCH"));
            };
            let got: Vec<u32> = ids.iter().map(|s| s.get()).collect();
            prop_assert_eq!(got, nums);
        }
    }
}
