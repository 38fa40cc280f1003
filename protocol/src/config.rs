//! # Protocol Configuration & Constants
//!
//! Every magic number in SIGIL lives here. Ledger key namespaces, curve
//! widths, multibase prefixes: if it is baked into a stored byte or a
//! signature, it belongs in this file and nowhere else.
//!
//! Changing the ledger namespaces after the first document has been written
//! orphans every record under the old prefix. Don't.

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// Crate-level protocol version, reported by the node's status endpoint.
pub const PROTOCOL_VERSION: &str = "0.1.0";

/// Contract identifier recorded in the ledger metadata tree on first open.
/// A node refuses nothing based on it today, but operators can see which
/// contract generation wrote a database.
pub const CONTRACT_NAME: &str = "sigil-did-contract";

// ---------------------------------------------------------------------------
// Ledger Key Namespaces
// ---------------------------------------------------------------------------

/// Namespace for DID documents. Followed by the DID and either
/// [`LATEST_DOCUMENT_SUFFIX`] or [`VERSIONED_DOCUMENT_SEGMENT`] + version.
pub const DOCUMENT_KEY_PREFIX: &str = "open:did:doc:";

/// Suffix of the key holding the authoritative latest document.
pub const LATEST_DOCUMENT_SUFFIX: &str = ":latest";

/// Segment preceding the version number in archived document keys.
pub const VERSIONED_DOCUMENT_SEGMENT: &str = ":versionId:";

/// Namespace for the one-per-DID status record.
pub const STATUS_KEY_PREFIX: &str = "open:did:status:";

/// Namespace for verifiable-credential metadata records.
pub const VC_META_KEY_PREFIX: &str = "open:vcmeta:";

/// Separator between composite key parts. A DID can legally contain `:`,
/// so the parts are joined with a byte no DID or namespace ever contains.
pub const KEY_PART_SEPARATOR: u8 = 0x00;

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// The only signature suite the lifecycle engine verifies.
pub const SIGNING_ALGORITHM: &str = "ECDSA-P256-SHA256";

/// Width of a P-256 field element and of the group order, in bytes.
pub const P256_COORDINATE_BYTES: usize = 32;

/// SEC1 compressed point: one prefix byte plus the X coordinate.
pub const COMPRESSED_KEY_LENGTH: usize = 1 + P256_COORDINATE_BYTES;

/// SEC1 uncompressed point: `0x04` plus X and Y.
pub const UNCOMPRESSED_KEY_LENGTH: usize = 1 + 2 * P256_COORDINATE_BYTES;

/// Compressed-key prefix when Y is even.
pub const COMPRESSED_PREFIX_EVEN: u8 = 0x02;

/// Compressed-key prefix when Y is odd.
pub const COMPRESSED_PREFIX_ODD: u8 = 0x03;

/// Raw `r || s` signature length. No ASN.1, no length prefix.
pub const SIGNATURE_LENGTH: usize = 2 * P256_COORDINATE_BYTES;

/// Wire signature length when a recovery header byte leads the `r || s`
/// pair, as the mobile signing SDKs emit it.
pub const RECOVERABLE_SIGNATURE_LENGTH: usize = 1 + SIGNATURE_LENGTH;

/// Recovery header base for signatures over compressed keys
/// (`27 + 4`). The header is `base + recovery_id`.
pub const RECOVERY_HEADER_BASE: u8 = 31;

/// SHA-256 digest length.
pub const HASH_OUTPUT_LENGTH: usize = 32;

// ---------------------------------------------------------------------------
// Multibase
// ---------------------------------------------------------------------------

/// Multibase prefix for base58btc. The default for keys and proofs.
pub const MULTIBASE_BASE58BTC: char = 'z';

/// Multibase prefix for lowercase hexadecimal.
pub const MULTIBASE_BASE16_LOWER: char = 'f';

/// Multibase prefix for uppercase hexadecimal.
pub const MULTIBASE_BASE16_UPPER: char = 'F';

/// Multibase prefix for RFC 4648 base32.
pub const MULTIBASE_BASE32: char = 'b';

/// Multibase prefix for unpadded standard base64.
pub const MULTIBASE_BASE64: char = 'm';

/// Multibase prefix for URL-safe base64.
pub const MULTIBASE_BASE64_URL: char = 'u';

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// The W3C DID core context. Operators can require its presence in every
/// registered document through the schema validator.
pub const DID_CORE_CONTEXT: &str = "https://www.w3.org/ns/did/v1";

/// Default ceiling on verification methods per document.
pub const DEFAULT_MAX_VERIFICATION_METHODS: usize = 64;

/// Default ceiling on services per document.
pub const DEFAULT_MAX_SERVICES: usize = 32;

/// Default RPC API port.
pub const DEFAULT_RPC_PORT: u16 = 9841;

/// Default metrics (Prometheus) port.
pub const DEFAULT_METRICS_PORT: u16 = 9842;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_namespaces_are_distinct() {
        assert_ne!(DOCUMENT_KEY_PREFIX, STATUS_KEY_PREFIX);
        assert_ne!(DOCUMENT_KEY_PREFIX, VC_META_KEY_PREFIX);
        assert_ne!(STATUS_KEY_PREFIX, VC_META_KEY_PREFIX);
    }

    #[test]
    fn test_separator_never_appears_in_namespaces() {
        for ns in [
            DOCUMENT_KEY_PREFIX,
            LATEST_DOCUMENT_SUFFIX,
            VERSIONED_DOCUMENT_SEGMENT,
            STATUS_KEY_PREFIX,
            VC_META_KEY_PREFIX,
        ] {
            assert!(!ns.as_bytes().contains(&KEY_PART_SEPARATOR));
        }
    }

    #[test]
    fn test_crypto_parameter_sizes() {
        assert_eq!(COMPRESSED_KEY_LENGTH, 33);
        assert_eq!(UNCOMPRESSED_KEY_LENGTH, 65);
        assert_eq!(SIGNATURE_LENGTH, 64);
        assert_eq!(RECOVERABLE_SIGNATURE_LENGTH, 65);
        assert_eq!(HASH_OUTPUT_LENGTH, 32);
    }

    #[test]
    fn test_ports_do_not_collide() {
        assert_ne!(DEFAULT_RPC_PORT, DEFAULT_METRICS_PORT);
    }
}
