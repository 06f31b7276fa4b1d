//! FETCH response parsing.

use crate::parser::lexer::{Lexer, Token};
use crate::{Error, Result};

use super::helpers::parse_flag_list;
use super::types::FetchItem;

/// Parses the parenthesized item list of a FETCH response.
pub fn parse_fetch_response(lexer: &mut Lexer<'_>) -> Result<Vec<FetchItem>> {
    lexer.expect(Token::LParen)?;

    let mut items = Vec::new();

    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Space => {}
            Token::Atom(name) => {
                let upper = name.to_ascii_uppercase();
                match upper.as_str() {
                    "FLAGS" => {
                        lexer.expect_space()?;
                        items.push(FetchItem::Flags(parse_flag_list(lexer)?));
                    }
                    "UID" => {
                        lexer.expect_space()?;
                        items.push(FetchItem::Uid(lexer.read_number()?));
                    }
                    "RFC822.SIZE" => {
                        lexer.expect_space()?;
                        items.push(FetchItem::Rfc822Size(lexer.read_number()?));
                    }
                    "X-GM-LABELS" => {
                        lexer.expect_space()?;
                        items.push(FetchItem::GmailLabels(parse_label_list(lexer)?));
                    }
                    "BODY" | "BODY.PEEK" | "RFC822" => {
                        let section = parse_section(lexer)?;
                        lexer.expect_space()?;
                        let data = lexer.read_nstring_bytes()?;
                        items.push(FetchItem::Body { section, data });
                    }
                    _ => {
                        // X-GM-MSGID, INTERNALDATE, ENVELOPE and friends
                        lexer.expect_space()?;
                        skip_value(lexer)?;
                    }
                }
            }
            token => {
                return Err(Error::Parse {
                    position: lexer.position(),
                    message: format!("unexpected token in FETCH response: {token:?}"),
                });
            }
        }
    }

    Ok(items)
}

/// Parses an optional `[section]` and `<origin>` after a BODY item name.
///
/// Returns `None` for the whole message (`BODY[]` or `RFC822`).
fn parse_section(lexer: &mut Lexer<'_>) -> Result<Option<String>> {
    if !lexer.eat(b'[') {
        return Ok(None);
    }

    let remaining = lexer.remaining();
    let end = remaining
        .iter()
        .position(|&b| b == b']')
        .ok_or_else(|| Error::Parse {
            position: lexer.position(),
            message: "unterminated body section".to_string(),
        })?;
    let section = String::from_utf8_lossy(&remaining[..end]).into_owned();
    lexer.skip(end + 1);

    // Partial fetch origin: <n>
    if lexer.eat(b'<') {
        while lexer.peek().is_some_and(|b| b.is_ascii_digit()) {
            lexer.advance();
        }
        if !lexer.eat(b'>') {
            return Err(Error::Parse {
                position: lexer.position(),
                message: "malformed body origin".to_string(),
            });
        }
    }

    Ok((!section.is_empty()).then_some(section))
}

/// Parses the X-GM-LABELS list.
fn parse_label_list(lexer: &mut Lexer<'_>) -> Result<Vec<String>> {
    lexer.expect(Token::LParen)?;

    let mut labels = Vec::new();
    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Space => {}
            Token::Atom(s) => labels.push(s.to_string()),
            Token::Number(n) => labels.push(n.to_string()),
            Token::QuotedString(s) => labels.push(s),
            Token::Literal(data) => labels.push(String::from_utf8_lossy(data).into_owned()),
            token => {
                return Err(Error::Parse {
                    position: lexer.position(),
                    message: format!("unexpected token in label list: {token:?}"),
                });
            }
        }
    }

    Ok(labels)
}

/// Consumes one value of an item we do not model, including nested lists.
fn skip_value(lexer: &mut Lexer<'_>) -> Result<()> {
    let mut depth = 0usize;

    loop {
        match lexer.next_token()? {
            Token::LParen | Token::LBracket => depth += 1,
            Token::RParen | Token::RBracket => {
                depth = depth.checked_sub(1).ok_or_else(|| Error::Parse {
                    position: lexer.position(),
                    message: "unbalanced list in FETCH response".to_string(),
                })?;
            }
            Token::Crlf | Token::Eof => {
                return Err(Error::Parse {
                    position: lexer.position(),
                    message: "unterminated FETCH item".to_string(),
                });
            }
            _ => {}
        }

        if depth == 0 {
            return Ok(());
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use crate::types::Flag;

    fn parse(input: &[u8]) -> Vec<FetchItem> {
        parse_fetch_response(&mut Lexer::new(input)).unwrap()
    }

    #[test]
    fn whole_body_literal() {
        let items = parse(b"(BODY[] {11}\r\nHello World)");
        assert_eq!(
            items,
            vec![FetchItem::Body {
                section: None,
                data: Some(b"Hello World".to_vec()),
            }]
        );
    }

    #[test]
    fn body_literal_with_parens_inside() {
        let items = parse(b"(UID 9 BODY[] {7}\r\n(a) )b RFC822.SIZE 7)");
        assert_eq!(items.len(), 3);
        assert_eq!(items[0], FetchItem::Uid(9));
        assert_eq!(
            items[1],
            FetchItem::Body {
                section: None,
                data: Some(b"(a) )b ".to_vec()),
            }
        );
        assert_eq!(items[2], FetchItem::Rfc822Size(7));
    }

    #[test]
    fn nil_body() {
        let items = parse(b"(BODY[] NIL)");
        assert_eq!(
            items,
            vec![FetchItem::Body {
                section: None,
                data: None,
            }]
        );
    }

    #[test]
    fn section_and_origin() {
        let items = parse(b"(BODY[HEADER]<0> \"Subject: x\")");
        assert_eq!(
            items,
            vec![FetchItem::Body {
                section: Some("HEADER".into()),
                data: Some(b"Subject: x".to_vec()),
            }]
        );
    }

    #[test]
    fn gmail_labels() {
        let items = parse(b"(X-GM-LABELS (\\Inbox \"Work Stuff\" travel) FLAGS (\\Seen))");
        assert_eq!(
            items[0],
            FetchItem::GmailLabels(vec!["\\Inbox".into(), "Work Stuff".into(), "travel".into()])
        );
        let FetchItem::Flags(flags) = &items[1] else {
            panic!("expected flags");
        };
        assert!(flags.contains(&Flag::Seen));
    }

    #[test]
    fn unknown_items_are_skipped() {
        let items = parse(
            b"(X-GM-MSGID 1278455344230334865 INTERNALDATE \"17-Jul-1996 02:44:25 -0700\" ENVELOPE (NIL \"s\" ((NIL NIL \"a\" \"b\")) NIL) UID 4)",
        );
        assert_eq!(items, vec![FetchItem::Uid(4)]);
    }

    #[test]
    fn unbalanced_is_error() {
        assert!(parse_fetch_response(&mut Lexer::new(b"(UID 1")).is_err());
    }
}
