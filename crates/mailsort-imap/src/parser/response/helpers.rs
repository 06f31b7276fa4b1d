//! Parser helper functions.

use crate::parser::lexer::{Lexer, Token};
use crate::types::{Capability, Flag, Flags, ResponseCode, SeqNum};
use crate::{Error, Result};

/// Parses a bracketed response code, leaving the lexer after `]`.
pub fn parse_response_code(lexer: &mut Lexer<'_>) -> Result<ResponseCode> {
    lexer.expect(Token::LBracket)?;

    let atom = lexer.read_atom_string()?;
    let code = match atom.to_ascii_uppercase().as_str() {
        "ALERT" => ResponseCode::Alert,
        "PARSE" => ResponseCode::Parse,
        "READ-ONLY" => ResponseCode::ReadOnly,
        "READ-WRITE" => ResponseCode::ReadWrite,
        "TRYCREATE" => ResponseCode::TryCreate,
        "AUTHENTICATIONFAILED" => ResponseCode::AuthenticationFailed,
        "NONEXISTENT" => ResponseCode::Nonexistent,
        "UIDNEXT" => {
            lexer.expect_space()?;
            ResponseCode::UidNext(lexer.read_number()?)
        }
        "UIDVALIDITY" => {
            lexer.expect_space()?;
            ResponseCode::UidValidity(lexer.read_number()?)
        }
        "UNSEEN" => {
            lexer.expect_space()?;
            ResponseCode::Unseen(read_seq_num(lexer)?)
        }
        "CAPABILITY" => ResponseCode::Capability(parse_capability_data(lexer)?),
        "PERMANENTFLAGS" => {
            lexer.expect_space()?;
            ResponseCode::PermanentFlags(parse_flag_list(lexer)?.iter().cloned().collect())
        }
        _ => ResponseCode::Unknown(atom.to_string()),
    };

    // Unknown codes may carry arguments we do not model
    while lexer.peek().is_some_and(|b| b != b']' && b != b'\r') {
        lexer.advance();
    }
    lexer.expect(Token::RBracket)?;

    Ok(code)
}

/// Parses space-separated capability atoms up to the end of the list.
pub fn parse_capability_data(lexer: &mut Lexer<'_>) -> Result<Vec<Capability>> {
    let mut caps = Vec::new();

    while lexer.eat(b' ') {
        match lexer.next_token()? {
            Token::Atom(s) => caps.push(Capability::parse(s)),
            Token::Number(n) => caps.push(Capability::Unknown(n.to_string())),
            token => {
                return Err(Error::Parse {
                    position: lexer.position(),
                    message: format!("unexpected token in capability list: {token:?}"),
                });
            }
        }
    }

    Ok(caps)
}

/// Parses a parenthesized flag list.
pub fn parse_flag_list(lexer: &mut Lexer<'_>) -> Result<Flags> {
    lexer.expect(Token::LParen)?;

    let mut flags = Flags::new();
    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Space => {}
            // `\*` lexes as a lone backslash atom followed by an asterisk
            Token::Atom("\\") if lexer.eat(b'*') => flags.insert(Flag::MayCreate),
            Token::Atom(s) => flags.insert(Flag::parse(s)),
            token => {
                return Err(Error::Parse {
                    position: lexer.position(),
                    message: format!("unexpected token in flag list: {token:?}"),
                });
            }
        }
    }

    Ok(flags)
}

/// Parses the numbers of a SEARCH response.
pub fn parse_search_response(lexer: &mut Lexer<'_>) -> Result<Vec<SeqNum>> {
    let mut nums = Vec::new();

    while lexer.eat(b' ') {
        match lexer.next_token()? {
            Token::Number(n) => {
                if let Some(seq) = SeqNum::new(n) {
                    nums.push(seq);
                }
            }
            // Trailing CRLF after a space from lenient servers
            Token::Crlf | Token::Eof => break,
            token => {
                return Err(Error::Parse {
                    position: lexer.position(),
                    message: format!("unexpected token in SEARCH response: {token:?}"),
                });
            }
        }
    }

    Ok(nums)
}

/// Reads a non-zero number as a sequence number.
pub fn read_seq_num(lexer: &mut Lexer<'_>) -> Result<SeqNum> {
    let n = lexer.read_number()?;
    SeqNum::new(n).ok_or_else(|| Error::Parse {
        position: lexer.position(),
        message: "invalid sequence number 0".to_string(),
    })
}

/// Reads the rest of the line as text and consumes the CRLF.
pub fn read_text_until_crlf(lexer: &mut Lexer<'_>) -> String {
    let remaining = lexer.remaining();
    let end = remaining
        .windows(2)
        .position(|w| w == b"\r\n")
        .unwrap_or(remaining.len());

    lexer.skip(end + 2);
    String::from_utf8_lossy(&remaining[..end]).into_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn permanent_flags_with_wildcard() {
        let mut lexer = Lexer::new(b"[PERMANENTFLAGS (\\Seen \\Deleted \\*)]");
        let code = parse_response_code(&mut lexer).unwrap();
        assert_eq!(
            code,
            ResponseCode::PermanentFlags(vec![Flag::Seen, Flag::Deleted, Flag::MayCreate])
        );
    }

    #[test]
    fn unknown_code_with_arguments() {
        let mut lexer = Lexer::new(b"[APPENDUID 38505 3955] done");
        let code = parse_response_code(&mut lexer).unwrap();
        assert_eq!(code, ResponseCode::Unknown("APPENDUID".into()));
        assert_eq!(lexer.remaining(), b" done");
    }

    #[test]
    fn authentication_failed_code() {
        let mut lexer = Lexer::new(b"[AUTHENTICATIONFAILED]");
        assert!(parse_response_code(&mut lexer).unwrap().is_auth_failure());
    }

    #[test]
    fn empty_search() {
        let mut lexer = Lexer::new(b"\r\n");
        assert!(parse_search_response(&mut lexer).unwrap().is_empty());
    }

    #[test]
    fn text_consumes_crlf() {
        let mut lexer = Lexer::new(b"hello world\r\n");
        assert_eq!(read_text_until_crlf(&mut lexer), "hello world");
        assert!(lexer.is_eof());
    }
}
