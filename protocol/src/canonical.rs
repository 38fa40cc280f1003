//! # Canonical Serialization
//!
//! The exact bytes a proof signs. A signing client and the ledger must
//! produce byte-identical payloads from the same logical JSON, whatever
//! order the fields happened to arrive in, or every signature fails.
//!
//! [`CanonicalBytes`] is the only way to get those bytes. Its constructor
//! runs the whole pipeline:
//!
//! 1. Convert the input to a generic JSON tree.
//! 2. Recursively sort every object's keys ascending by byte value.
//! 3. Serialize compactly (no whitespace).
//!
//! ## String escaping
//!
//! The reference signing clients escape `<`, `>`, `&`, U+2028 and U+2029 as
//! `\u003c`-style sequences when they marshal JSON. `serde_json` leaves them
//! raw. A `certVcRef` URL with a query string contains `&`, so the writer
//! here escapes those five characters the same way; everything else follows
//! `serde_json`'s rules.
//!
//! Arrays keep their order. Scalars pass through untouched.

use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::{Map, Value};
use std::io;
use thiserror::Error;

/// Errors from canonicalization.
#[derive(Debug, Error)]
pub enum CanonicalError {
    #[error("value is not representable as JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to write canonical bytes: {0}")]
    Io(#[from] io::Error),
}

/// Bytes produced exclusively by the canonicalization pipeline.
///
/// The inner buffer is private. Anything that needs signable bytes takes a
/// `&CanonicalBytes`, and the only way to make one is through
/// [`CanonicalBytes::new`] or [`CanonicalBytes::from_json_slice`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Canonicalize any serializable value.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalError> {
        let value = serde_json::to_value(obj)?;
        Self::from_value(value)
    }

    /// Canonicalize an already-parsed JSON tree.
    pub fn from_value(value: Value) -> Result<Self, CanonicalError> {
        let sorted = sort_keys(value);
        Ok(Self(write_compact(&sorted)?))
    }

    /// Parse raw JSON bytes and canonicalize them.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, CanonicalError> {
        let value: Value = serde_json::from_slice(bytes)?;
        Self::from_value(value)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Canonicalize raw JSON bytes. Convenience over
/// [`CanonicalBytes::from_json_slice`] for callers that want a `Vec`.
pub fn canonicalize(bytes: &[u8]) -> Result<Vec<u8>, CanonicalError> {
    CanonicalBytes::from_json_slice(bytes).map(CanonicalBytes::into_bytes)
}

/// Rebuild every object with its keys in ascending byte order.
///
/// `Map` may or may not preserve insertion order depending on
/// `serde_json`'s feature flags; inserting pre-sorted keys gives the same
/// result either way.
pub fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.as_bytes().cmp(b.as_bytes()));

            let mut sorted = Map::with_capacity(entries.len());
            for (key, child) in entries {
                sorted.insert(key, sort_keys(child));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        scalar => scalar,
    }
}

fn write_compact(value: &Value) -> Result<Vec<u8>, CanonicalError> {
    let mut buf = Vec::with_capacity(256);
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, HtmlSafeFormatter);
    value.serialize(&mut serializer)?;
    Ok(buf)
}

// ---------------------------------------------------------------------------
// Formatter
// ---------------------------------------------------------------------------

/// Compact formatter that additionally escapes HTML-significant characters
/// and the two Unicode line terminators.
struct HtmlSafeFormatter;

impl Formatter for HtmlSafeFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (index, ch) in fragment.char_indices() {
            let escape = match ch {
                '<' => "\\u003c",
                '>' => "\\u003e",
                '&' => "\\u0026",
                '\u{2028}' => "\\u2028",
                '\u{2029}' => "\\u2029",
                _ => continue,
            };
            writer.write_all(fragment[start..index].as_bytes())?;
            writer.write_all(escape.as_bytes())?;
            start = index + ch.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}
