//! Content-Type and Content-Disposition handling.

use crate::charset;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fmt;

/// MIME content type with parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Main type (e.g., "text", "image", "multipart"), lowercased.
    pub main_type: String,
    /// Subtype (e.g., "plain", "html", "jpeg"), lowercased.
    pub sub_type: String,
    /// Parameters keyed by lowercased name (e.g., charset, boundary).
    pub parameters: HashMap<String, String>,
}

impl ContentType {
    /// Creates a new content type.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into(),
            sub_type: sub_type.into(),
            parameters: HashMap::new(),
        }
    }

    /// The RFC 2045 default for parts without a usable Content-Type.
    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text", "plain")
    }

    /// The default for parts inside `multipart/digest`.
    #[must_use]
    pub fn message_rfc822() -> Self {
        Self::new("message", "rfc822")
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Returns a parameter by name.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Returns the charset parameter if present.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameter("charset")
    }

    /// Returns the boundary parameter if present and non-empty.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameter("boundary").filter(|b| !b.is_empty())
    }

    /// Returns `type/subtype` without parameters.
    #[must_use]
    pub fn mime_type(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type)
    }

    /// Checks if this is a multipart content type.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.main_type == "multipart"
    }

    /// Checks if this is exactly `text/plain`.
    #[must_use]
    pub fn is_text_plain(&self) -> bool {
        self.main_type == "text" && self.sub_type == "plain"
    }

    /// Parses a content type string.
    ///
    /// Format: `type/subtype; param1=value1; param2="quoted; value"`
    ///
    /// # Errors
    ///
    /// Returns an error if `type/subtype` is missing or malformed.
    pub fn parse(s: &str) -> Result<Self> {
        let (type_str, params) = s.split_once(';').unwrap_or((s, ""));

        let (main_type, sub_type) = type_str
            .trim()
            .split_once('/')
            .map(|(main, sub)| (main.trim().to_ascii_lowercase(), sub.trim().to_ascii_lowercase()))
            .filter(|(main, sub)| is_token(main) && is_token(sub))
            .ok_or_else(|| Error::InvalidContentType(s.trim().to_string()))?;

        Ok(Self {
            main_type,
            sub_type,
            parameters: parse_parameters(params),
        })
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.main_type, self.sub_type)
    }
}

/// Parsed Content-Disposition header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDisposition {
    /// Disposition type (e.g., "attachment", "inline"), lowercased.
    /// Empty when the header carries no type.
    pub kind: String,
    /// Parameters keyed by lowercased name.
    pub parameters: HashMap<String, String>,
}

impl ContentDisposition {
    /// Parses a Content-Disposition value. Never fails; missing pieces are
    /// left empty.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let (kind, params) = s.split_once(';').unwrap_or((s, ""));
        Self {
            kind: kind.trim().to_ascii_lowercase(),
            parameters: parse_parameters(params),
        }
    }

    /// Returns true for `attachment`.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        self.kind == "attachment"
    }

    /// Returns the `filename` parameter if present.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.parameters.get("filename").map(String::as_str)
    }
}

fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes()
            .all(|b| b.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?=".contains(&b))
}

/// Parses `; name=value` pairs, honoring quoted strings and RFC 2231
/// extended parameters (`name*=charset'lang'%XX` and `name*0=` sections).
fn parse_parameters(s: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    let mut extended: HashMap<String, Vec<Section>> = HashMap::new();

    for (name, value) in split_parameters(s) {
        let Some((base, rest)) = name.split_once('*') else {
            params.insert(name, value);
            continue;
        };

        // `name*` alone is one encoded section; `name*N` and `name*N*`
        // are numbered sections, the latter encoded.
        let encoded = rest.is_empty() || rest.ends_with('*');
        let index = if rest.is_empty() {
            Some(0)
        } else {
            rest.trim_end_matches('*').parse::<u32>().ok()
        };
        if let Some(index) = index {
            extended.entry(base.to_string()).or_default().push(Section {
                index,
                encoded,
                value,
            });
        }
    }

    for (name, sections) in extended {
        params.insert(name, join_sections(sections));
    }
    params
}

struct Section {
    index: u32,
    encoded: bool,
    value: String,
}

fn join_sections(mut sections: Vec<Section>) -> String {
    sections.sort_by_key(|s| s.index);

    let mut charset_label: Option<String> = None;
    let mut bytes = Vec::new();

    for (i, section) in sections.iter().enumerate() {
        if !section.encoded {
            bytes.extend_from_slice(section.value.as_bytes());
            continue;
        }
        let mut value = section.value.as_str();
        if i == 0 {
            // charset'language'value
            let mut pieces = value.splitn(3, '\'');
            if let (Some(cs), Some(_lang), Some(rest)) = (pieces.next(), pieces.next(), pieces.next()) {
                charset_label = Some(cs.to_string()).filter(|c| !c.is_empty());
                value = rest;
            }
        }
        bytes.extend(percent_decode(value));
    }

    charset::decode_lossy(&bytes, charset_label.as_deref().unwrap_or("utf-8"))
}

fn percent_decode(s: &str) -> Vec<u8> {
    let raw = s.as_bytes();
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'%'
            && let Some(hex) = s.get(i + 1..i + 3)
            && let Ok(byte) = u8::from_str_radix(hex, 16)
        {
            out.push(byte);
            i += 3;
        } else {
            out.push(raw[i]);
            i += 1;
        }
    }
    out
}

/// Splits a parameter list into `(lowercased name, value)` pairs.
fn split_parameters(s: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut chars = s.chars().peekable();

    loop {
        // Skip separators and whitespace.
        while chars.next_if(|c| *c == ';' || c.is_whitespace()).is_some() {}
        if chars.peek().is_none() {
            return out;
        }

        let mut name = String::new();
        while let Some(c) = chars.next_if(|c| *c != '=' && *c != ';') {
            name.push(c);
        }
        let name = name.trim().to_ascii_lowercase();

        if chars.next_if_eq(&'=').is_none() {
            // A bare word with no value; nothing to record.
            continue;
        }
        while chars.next_if(|c| *c == ' ' || *c == '\t').is_some() {}

        let mut value = String::new();
        let quoted = chars.next_if_eq(&'"').is_some();
        if quoted {
            while let Some(c) = chars.next() {
                match c {
                    '"' => break,
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            value.push(escaped);
                        }
                    }
                    _ => value.push(c),
                }
            }
            // Anything between the closing quote and the next `;` is junk.
            while chars.next_if(|c| *c != ';').is_some() {}
        } else {
            while let Some(c) = chars.next_if(|c| *c != ';') {
                value.push(c);
            }
            value.truncate(value.trim_end().len());
        }

        if !name.is_empty() {
            out.push((name, value));
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple() {
        let ct = ContentType::parse("text/plain; charset=utf-8").unwrap();
        assert_eq!(ct.mime_type(), "text/plain");
        assert_eq!(ct.charset(), Some("utf-8"));
        assert!(ct.is_text_plain());
    }

    #[test]
    fn parse_lowercases_type_and_names() {
        let ct = ContentType::parse("Multipart/Mixed; BOUNDARY=\"AbC\"").unwrap();
        assert!(ct.is_multipart());
        assert_eq!(ct.sub_type, "mixed");
        assert_eq!(ct.boundary(), Some("AbC"));
    }

    #[test]
    fn quoted_value_with_semicolon() {
        let ct = ContentType::parse("multipart/mixed; boundary=\"a;b c\"; charset=x").unwrap();
        assert_eq!(ct.boundary(), Some("a;b c"));
        assert_eq!(ct.charset(), Some("x"));
    }

    #[test]
    fn quoted_value_escapes() {
        let ct = ContentType::parse(r#"application/pdf; name="say \"hi\".pdf""#).unwrap();
        assert_eq!(ct.parameter("name"), Some("say \"hi\".pdf"));
    }

    #[test]
    fn invalid_types_rejected() {
        assert!(ContentType::parse("text").is_err());
        assert!(ContentType::parse("").is_err());
        assert!(ContentType::parse("/plain").is_err());
        assert!(ContentType::parse("te xt/plain").is_err());
    }

    #[test]
    fn empty_boundary_is_none() {
        let ct = ContentType::parse("multipart/mixed; boundary=\"\"").unwrap();
        assert_eq!(ct.boundary(), None);
    }

    #[test]
    fn disposition_with_filename() {
        let cd = ContentDisposition::parse("attachment; filename=\"report 2024.pdf\"");
        assert!(cd.is_attachment());
        assert_eq!(cd.filename(), Some("report 2024.pdf"));
    }

    #[test]
    fn disposition_empty() {
        let cd = ContentDisposition::parse("");
        assert_eq!(cd.kind, "");
        assert_eq!(cd.filename(), None);
    }

    #[test]
    fn rfc2231_extended_filename() {
        let cd = ContentDisposition::parse("attachment; filename*=UTF-8''caf%C3%A9.txt");
        assert_eq!(cd.filename(), Some("café.txt"));
    }

    #[test]
    fn rfc2231_continuations() {
        let cd = ContentDisposition::parse(
            "attachment; filename*1=\"part2.txt\"; filename*0*=iso-8859-1'fr'%E9t%E9_",
        );
        assert_eq!(cd.filename(), Some("été_part2.txt"));
    }

    #[test]
    fn bare_words_ignored() {
        let ct = ContentType::parse("text/plain; format; charset=us-ascii").unwrap();
        assert_eq!(ct.charset(), Some("us-ascii"));
        assert_eq!(ct.parameters.len(), 1);
    }
}
