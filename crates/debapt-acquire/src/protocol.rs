//! The method-worker wire protocol (`spec.md` §6): blank-line-delimited
//! RFC822-ish stanzas over a worker's stdin/stdout, each starting with a
//! three-digit code line.
//!
//! `StanzaCodec` is a [`tokio_util::codec`] `Decoder`/`Encoder` pair, the
//! concrete realization of `spec.md` §9's "owned async task with two
//! framed byte streams" redesign of the original's line-buffered
//! `read()`/`write()` over raw fds.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::AcquireError;

/// One message: a numeric code, a short human tag, and an ordered set of
/// `Key: value` fields. Order is preserved on encode but not meaningful on
/// decode -- callers look fields up by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stanza {
    pub code: u16,
    pub tag: String,
    fields: Vec<(String, String)>,
}

impl Stanza {
    #[must_use]
    pub fn new(code: u16, tag: impl Into<String>) -> Self {
        Self { code, tag: tag.into(), fields: Vec::new() }
    }

    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.iter().find(|(k, _)| k.eq_ignore_ascii_case(key)).map(|(_, v)| v.as_str())
    }

    /// Every field matching `key`, in declaration order (hash lines like
    /// `SHA256-Hash`/`MD5-Hash` can repeat).
    pub fn fields(&self, key: &str) -> impl Iterator<Item = &str> {
        self.fields.iter().filter(move |(k, _)| k.eq_ignore_ascii_case(key)).map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn fields_map(&self) -> BTreeMap<&str, &str> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
    }
}

/// Message codes, `spec.md` §6's table.
pub mod code {
    pub const CAPABILITIES: u16 = 100;
    pub const LOG: u16 = 101;
    pub const STATUS: u16 = 102;
    pub const URI_START: u16 = 200;
    pub const URI_DONE: u16 = 201;
    pub const AUTH_REQUIRED: u16 = 351;
    pub const URI_FAILURE: u16 = 400;
    pub const GENERAL_FAILURE: u16 = 401;
    pub const MEDIA_CHANGE: u16 = 403;
    pub const URI_ACQUIRE: u16 = 600;
    pub const CONFIGURATION: u16 = 601;
    pub const MEDIA_CHANGED: u16 = 603;
}

/// A codec decoding/encoding `Stanza`s over a worker's framed stdio.
#[derive(Debug, Default)]
pub struct StanzaCodec;

impl Decoder for StanzaCodec {
    type Item = Stanza;
    type Error = AcquireError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Stanza>, AcquireError> {
        let Some(blank_at) = find_blank_line(src) else {
            return Ok(None);
        };

        let raw = src.split_to(blank_at);
        src.advance(blank_line_len(src));

        let text = std::str::from_utf8(&raw)
            .map_err(|e| AcquireError::Protocol { method: "worker".to_owned(), message: e.to_string() })?;
        parse_stanza(text).map(Some)
    }
}

impl Encoder<Stanza> for StanzaCodec {
    type Error = AcquireError;

    fn encode(&mut self, item: Stanza, dst: &mut BytesMut) -> Result<(), AcquireError> {
        let mut out = String::new();
        let _ = writeln!(out, "{} {}", item.code, item.tag);
        for (key, value) in &item.fields {
            let _ = writeln!(out, "{key}: {value}");
        }
        out.push('\n');
        dst.extend_from_slice(out.as_bytes());
        Ok(())
    }
}

/// Find the offset of a `\n\n` (or `\r\n\r\n`) terminator, if the buffer
/// has a full stanza yet.
fn find_blank_line(src: &BytesMut) -> Option<usize> {
    let bytes = &src[..];
    bytes.windows(2).position(|w| w == b"\n\n").map(|pos| pos + 1)
}

fn blank_line_len(src: &BytesMut) -> usize {
    if src.first() == Some(&b'\n') {
        1
    } else {
        0
    }
}

fn parse_stanza(text: &str) -> Result<Stanza, AcquireError> {
    let mut lines = text.lines();
    let header = lines.next().unwrap_or_default();
    let (code_str, tag) = header.split_once(' ').unwrap_or((header, ""));
    let code: u16 = code_str
        .trim()
        .parse()
        .map_err(|_| AcquireError::Protocol { method: "worker".to_owned(), message: format!("bad status line {header:?}") })?;

    let mut stanza = Stanza::new(code, tag.trim());
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            return Err(AcquireError::Protocol {
                method: "worker".to_owned(),
                message: format!("field without ':' separator: {line:?}"),
            });
        };
        stanza = stanza.with_field(key.trim(), value.trim());
    }
    Ok(stanza)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_600_acquire_stanza() {
        let mut codec = StanzaCodec;
        let stanza = Stanza::new(code::URI_ACQUIRE, "URI Acquire")
            .with_field("URI", "http://example.test/Packages.gz")
            .with_field("Filename", "/var/lib/apt/lists/partial/Packages.gz");

        let mut buf = BytesMut::new();
        codec.encode(stanza.clone(), &mut buf).unwrap();
        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.code, code::URI_ACQUIRE);
        assert_eq!(decoded.field("URI"), Some("http://example.test/Packages.gz"));
    }

    #[test]
    fn decode_returns_none_on_partial_stanza() {
        let mut codec = StanzaCodec;
        let mut buf = BytesMut::from(&b"200 URI Start\nURI: http://x\n"[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn repeated_hash_fields_are_all_visible() {
        let stanza = Stanza::new(code::URI_DONE, "URI Done")
            .with_field("MD5-Hash", "abc")
            .with_field("SHA256-Hash", "def");
        let hashes: Vec<&str> = stanza.fields("SHA256-Hash").collect();
        assert_eq!(hashes, vec!["def"]);
    }

    #[test]
    fn rejects_field_without_colon() {
        let text = "400 URI Failure\nnonsense line without colon\n";
        assert!(parse_stanza(text).is_err());
    }
}
