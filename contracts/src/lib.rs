//! # SIGIL Registry Contracts
//!
//! The operations a SIGIL registry exposes, written against the
//! [`Ledger`](sigil_protocol::storage::Ledger) trait so the same code runs
//! over sled, an in-memory map, or anything else that can store bytes:
//!
//! - **Document**: register and update DID documents from signed
//!   envelopes, read them back by version, and drive the DID status
//!   lifecycle (ACTIVATED ⇄ DEACTIVATED → REVOKED → TERMINATED).
//! - **VC Meta**: register credential metadata and move its status
//!   (ACTIVE, INACTIVE, REVOKED).
//! - **Error**: one closed error type with stable `SSRVFCC` codes.
//!
//! ## Design Principles
//!
//! 1. A rejected operation writes nothing. Multi-record updates are staged
//!    and committed as one batch.
//! 2. State transitions are explicit: enum variants, not boolean flags.
//! 3. Signature verification gates every mutation except the trust-anchor
//!    bootstrap.
//! 4. Operations log outcomes with `tracing`; the caller installs the
//!    subscriber.

pub mod document;
pub mod error;
pub mod vc_meta;

pub use document::{DocumentAndStatus, DocumentContract, RegistrationOutcome};
pub use error::{ContractError, ErrorKind, ERROR_CODE_PREFIX};
pub use vc_meta::VcMetaContract;
