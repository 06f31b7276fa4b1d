//! Framed I/O for the IMAP wire format.
//!
//! A server response is one CRLF-terminated line, except that a line ending
//! in a literal prefix `{n}` is followed by exactly n raw bytes and then the
//! rest of the response. [`FramedStream::read_response`] returns the whole
//! thing as one buffer so the parser sees literals inline.

#![allow(clippy::missing_errors_doc)]

use std::io;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::{Error, Result};

const READ_BUFFER_SIZE: usize = 16 * 1024;

/// Longest line accepted outside of literals.
const MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Largest literal accepted. Gmail caps messages at 50 MB before encoding.
pub const MAX_LITERAL_SIZE: usize = 100 * 1024 * 1024;

/// Buffered reader/writer over an IMAP stream.
pub struct FramedStream<S> {
    reader: BufReader<S>,
}

impl<S> FramedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps a connected stream.
    pub fn new(stream: S) -> Self {
        Self {
            reader: BufReader::with_capacity(READ_BUFFER_SIZE, stream),
        }
    }

    /// Reads one complete response including any literals.
    pub async fn read_response(&mut self) -> Result<Bytes> {
        let mut response = BytesMut::new();

        loop {
            self.read_line_into(&mut response).await?;

            let Some(len) = literal_length(&response) else {
                break;
            };
            if len > MAX_LITERAL_SIZE {
                return Err(Error::Protocol(format!(
                    "literal too large: {len} bytes (max {MAX_LITERAL_SIZE})"
                )));
            }

            let start = response.len();
            response.resize(start + len, 0);
            self.reader.read_exact(&mut response[start..]).await?;
        }

        Ok(response.freeze())
    }

    /// Appends bytes up to and including the next CRLF.
    async fn read_line_into(&mut self, out: &mut BytesMut) -> Result<()> {
        let line_start = out.len();

        loop {
            let buf = self.reader.fill_buf().await?;
            if buf.is_empty() {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "server closed the connection",
                )));
            }

            // A CR may have ended the previous chunk
            let scan_from = (out.len() - line_start).saturating_sub(1);
            out.extend_from_slice(buf);
            let len = buf.len();

            if let Some(pos) = find_crlf(&out[line_start + scan_from..]) {
                let end = line_start + scan_from + pos + 2;
                let unused = out.len() - end;
                out.truncate(end);
                self.reader.consume(len - unused);
                return Ok(());
            }

            self.reader.consume(len);
            if out.len() - line_start > MAX_LINE_LENGTH {
                return Err(Error::Protocol("line too long".to_string()));
            }
        }
    }

    /// Writes a serialized command and flushes.
    pub async fn write_command(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.reader.get_mut();
        stream.write_all(data).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Shuts down the write half.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.reader.get_mut().shutdown().await?;
        Ok(())
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

/// Returns n if the response so far ends with `{n}\r\n` or `{n+}\r\n`.
fn literal_length(response: &[u8]) -> Option<usize> {
    let line = response.strip_suffix(b"\r\n")?;
    let line = line.strip_suffix(b"}")?;
    let line = line.strip_suffix(b"+").unwrap_or(line);

    let open = line.iter().rposition(|&b| b == b'{')?;
    let digits = &line[open + 1..];
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(digits).ok()?.parse().ok()
}

/// True if `response` is the completion for `tag`.
#[must_use]
pub fn is_tagged_for(response: &[u8], tag: &str) -> bool {
    response
        .strip_prefix(tag.as_bytes())
        .is_some_and(|rest| rest.first() == Some(&b' '))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    #[test]
    fn test_literal_length() {
        assert_eq!(literal_length(b"* 1 FETCH (BODY[] {123}\r\n"), Some(123));
        assert_eq!(literal_length(b"{42+}\r\n"), Some(42));
        assert_eq!(literal_length(b"{0}\r\n"), Some(0));
        assert_eq!(literal_length(b"* OK done\r\n"), None);
        assert_eq!(literal_length(b"{12"), None);
        assert_eq!(literal_length(b"{}\r\n"), None);
        assert_eq!(literal_length(b"{1a}\r\n"), None);
    }

    #[test]
    fn test_is_tagged_for() {
        assert!(is_tagged_for(b"A0003 OK done\r\n", "A0003"));
        assert!(!is_tagged_for(b"A00031 OK done\r\n", "A0003"));
        assert!(!is_tagged_for(b"* OK\r\n", "A0003"));
    }

    #[tokio::test]
    async fn test_reads_lines_one_at_a_time() {
        let mock = Builder::new()
            .read(b"* OK Gimap ready\r\n* CAPA")
            .read(b"BILITY IMAP4rev1\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        assert_eq!(&framed.read_response().await.unwrap()[..], b"* OK Gimap ready\r\n");
        assert_eq!(
            &framed.read_response().await.unwrap()[..],
            b"* CAPABILITY IMAP4rev1\r\n"
        );
    }

    #[tokio::test]
    async fn test_crlf_split_across_reads() {
        let mock = Builder::new().read(b"* OK ready\r").read(b"\n").build();
        let mut framed = FramedStream::new(mock);

        assert_eq!(&framed.read_response().await.unwrap()[..], b"* OK ready\r\n");
    }

    #[tokio::test]
    async fn test_literal_is_read_inline() {
        let mock = Builder::new()
            .read(b"* 1 FETCH (BODY[] {9}\r\n")
            .read(b"a\r\n")
            .read(b"{3}\r\n)\r\n")
            .build();
        let mut framed = FramedStream::new(mock);

        // The literal content looks like another literal prefix but is data
        let response = framed.read_response().await.unwrap();
        assert_eq!(&response[..], b"* 1 FETCH (BODY[] {9}\r\na\r\n{3}\r\n)\r\n");
    }

    #[tokio::test]
    async fn test_oversized_literal_rejected() {
        let header = format!("* 1 FETCH (BODY[] {{{}}}\r\n", MAX_LITERAL_SIZE + 1);
        let mock = Builder::new().read(header.as_bytes()).build();
        let mut framed = FramedStream::new(mock);

        let err = framed.read_response().await.unwrap_err();
        assert!(err.to_string().contains("literal too large"));
    }

    #[tokio::test]
    async fn test_eof_is_error() {
        let mock = Builder::new().read(b"* OK partial").build();
        let mut framed = FramedStream::new(mock);

        assert!(matches!(framed.read_response().await, Err(Error::Io(_))));
    }

    #[tokio::test]
    async fn test_write_command() {
        let mock = Builder::new().write(b"A0001 NOOP\r\n").build();
        let mut framed = FramedStream::new(mock);

        framed.write_command(b"A0001 NOOP\r\n").await.unwrap();
    }
}
