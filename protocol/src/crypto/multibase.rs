//! # Multibase Encoding
//!
//! Public keys, proof values and whole DID documents travel as multibase
//! strings: one prefix character naming the base, followed by the encoded
//! bytes. `z6Mk...` is base58btc, `f0a1b...` is hex, and so on.
//!
//! Signing clients in the wild do not agree on which base to use, so the
//! decoder accepts every base listed in [`MultibaseEncoding`]. The encoder
//! is only ever asked for base58btc by SIGIL itself, but the others are
//! exposed for tooling.
//!
//! Padding is tolerated on decode for the base32/base64 families. Some
//! encoders pad, some don't, and a trailing `=` carries no information.

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use std::fmt;
use thiserror::Error;

use crate::config::{
    MULTIBASE_BASE16_LOWER, MULTIBASE_BASE16_UPPER, MULTIBASE_BASE32, MULTIBASE_BASE58BTC,
    MULTIBASE_BASE64, MULTIBASE_BASE64_URL,
};

/// Errors from multibase decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MultibaseError {
    #[error("multibase string is empty")]
    Empty,

    #[error("unsupported multibase prefix '{0}'")]
    UnsupportedPrefix(char),

    #[error("invalid {encoding} payload: {reason}")]
    InvalidPayload {
        encoding: MultibaseEncoding,
        reason: String,
    },
}

/// The bases SIGIL understands, each identified by its multibase prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MultibaseEncoding {
    /// `z`: Bitcoin base58 alphabet.
    Base58Btc,
    /// `f`: lowercase hexadecimal.
    Base16Lower,
    /// `F`: uppercase hexadecimal.
    Base16Upper,
    /// `b`: RFC 4648 base32, emitted lowercase and unpadded.
    Base32,
    /// `m`: standard base64 without padding.
    Base64,
    /// `u`: URL-safe base64 without padding.
    Base64Url,
}

impl MultibaseEncoding {
    /// The prefix character for this base.
    pub fn prefix(self) -> char {
        match self {
            Self::Base58Btc => MULTIBASE_BASE58BTC,
            Self::Base16Lower => MULTIBASE_BASE16_LOWER,
            Self::Base16Upper => MULTIBASE_BASE16_UPPER,
            Self::Base32 => MULTIBASE_BASE32,
            Self::Base64 => MULTIBASE_BASE64,
            Self::Base64Url => MULTIBASE_BASE64_URL,
        }
    }

    /// Look up a base by its prefix character.
    pub fn from_prefix(prefix: char) -> Result<Self, MultibaseError> {
        match prefix {
            MULTIBASE_BASE58BTC => Ok(Self::Base58Btc),
            MULTIBASE_BASE16_LOWER => Ok(Self::Base16Lower),
            MULTIBASE_BASE16_UPPER => Ok(Self::Base16Upper),
            MULTIBASE_BASE32 => Ok(Self::Base32),
            MULTIBASE_BASE64 => Ok(Self::Base64),
            MULTIBASE_BASE64_URL => Ok(Self::Base64Url),
            other => Err(MultibaseError::UnsupportedPrefix(other)),
        }
    }
}

impl fmt::Display for MultibaseEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Base58Btc => "base58btc",
            Self::Base16Lower => "base16",
            Self::Base16Upper => "base16upper",
            Self::Base32 => "base32",
            Self::Base64 => "base64",
            Self::Base64Url => "base64url",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Encode / decode
// ---------------------------------------------------------------------------

/// Encode bytes with the given base, prefix included.
pub fn encode(encoding: MultibaseEncoding, data: &[u8]) -> String {
    let body = match encoding {
        MultibaseEncoding::Base58Btc => bs58::encode(data).into_string(),
        MultibaseEncoding::Base16Lower => hex::encode(data),
        MultibaseEncoding::Base16Upper => hex::encode_upper(data),
        MultibaseEncoding::Base32 => {
            base32::encode(base32::Alphabet::Rfc4648Lower { padding: false }, data)
        }
        MultibaseEncoding::Base64 => STANDARD_NO_PAD.encode(data),
        MultibaseEncoding::Base64Url => URL_SAFE_NO_PAD.encode(data),
    };

    let mut out = String::with_capacity(body.len() + 1);
    out.push(encoding.prefix());
    out.push_str(&body);
    out
}

/// Shorthand for base58btc, the encoding SIGIL emits everywhere.
pub fn encode_base58btc(data: &[u8]) -> String {
    encode(MultibaseEncoding::Base58Btc, data)
}

/// Decode a multibase string, returning the bytes only.
pub fn decode(input: &str) -> Result<Vec<u8>, MultibaseError> {
    decode_with_encoding(input).map(|(_, bytes)| bytes)
}

/// Decode a multibase string, also reporting which base it used.
pub fn decode_with_encoding(input: &str) -> Result<(MultibaseEncoding, Vec<u8>), MultibaseError> {
    let mut chars = input.chars();
    let prefix = chars.next().ok_or(MultibaseError::Empty)?;
    let encoding = MultibaseEncoding::from_prefix(prefix)?;
    let body = chars.as_str();

    let invalid = |reason: String| MultibaseError::InvalidPayload { encoding, reason };

    let bytes = match encoding {
        MultibaseEncoding::Base58Btc => bs58::decode(body)
            .into_vec()
            .map_err(|e| invalid(e.to_string()))?,
        MultibaseEncoding::Base16Lower | MultibaseEncoding::Base16Upper => {
            hex::decode(body).map_err(|e| invalid(e.to_string()))?
        }
        MultibaseEncoding::Base32 => {
            let normalized = body.trim_end_matches('=').to_ascii_uppercase();
            base32::decode(base32::Alphabet::Rfc4648 { padding: false }, &normalized)
                .ok_or_else(|| invalid("not valid RFC 4648 base32".to_string()))?
        }
        MultibaseEncoding::Base64 => STANDARD_NO_PAD
            .decode(body.trim_end_matches('='))
            .map_err(|e| invalid(e.to_string()))?,
        MultibaseEncoding::Base64Url => URL_SAFE_NO_PAD
            .decode(body.trim_end_matches('='))
            .map_err(|e| invalid(e.to_string()))?,
    };

    Ok((encoding, bytes))
}
