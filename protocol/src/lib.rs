// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # SIGIL Protocol: Core Library
//!
//! This is the core of SIGIL: a registry of W3C-style DID documents whose
//! every change is authorized by a signature from a key the registry
//! already knows about.
//!
//! SIGIL takes a pragmatic stance: NIST P-256 for signatures (because that
//! is what the secure elements in phones actually ship), SHA-256 for
//! digests, and canonical JSON for the signed bytes (because clients
//! build their payloads with whatever JSON library they have).
//!
//! ## Architecture
//!
//! - **crypto**: P-256 keys, point compression, recoverable signatures,
//!   multibase encodings. Don't roll your own.
//! - **canonical**: The byte-exact JSON form every proof signs.
//! - **identity**: DID documents, statuses, signed envelopes, schema rules
//!   and credential metadata.
//! - **storage**: The ledger contract, a transactional overlay, and a
//!   sled-backed implementation.
//! - **config**: Protocol constants and ledger namespaces.
//!
//! The lifecycle operations that tie these together live in the
//! `sigil-contracts` crate.
//!
//! ## Design Philosophy
//!
//! 1. Correctness over cleverness. One signature scheme, one digest.
//! 2. No unsafe code in crypto paths.
//! 3. Closed types at the edges: an unknown key type or status fails to
//!    parse instead of flowing through as a string.
//! 4. This crate never logs and never touches a clock on the verification
//!    path. The caller decides what gets recorded.

pub mod canonical;
pub mod config;
pub mod crypto;
pub mod identity;
pub mod storage;
