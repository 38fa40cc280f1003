//! # Identity Module
//!
//! The DID data model and everything that decides whether a change to it is
//! allowed.
//!
//! The identity stack is layered:
//!
//! 1. **DID**: documents, verification methods, purpose lists, and the
//!    key-URL form (`<did>?versionId=<n>#<keyId>`) proofs use to name a key.
//! 2. **Status**: the per-DID lifecycle record and its two transition
//!    families (in-service toggles, revocation).
//! 3. **Invoked**: the signed envelope clients submit, the bytes its proof
//!    covers, and a builder that signs envelopes.
//! 4. **Schema**: structural checks serde can't express.
//! 5. **Credential**: verifiable-credential metadata records.
//!
//! ## Design Decisions
//!
//! - Every enumerated field (key types, purposes, roles, statuses, service
//!   types) is a closed Rust enum. Unknown strings fail at deserialization
//!   rather than flowing through as data.
//! - Versions are numbers. `"10"` sorts after `"9"`.
//! - Only `capabilityInvocation` keys can authorize a mutation. There is
//!   no policy hook to change that.

pub mod credential;
pub mod did;
pub mod invoked;
pub mod schema;
pub mod status;

pub use credential::{CredentialSchema, CredentialSchemaType, VcMeta, VcStatus, VcStatusError};
pub use did::{
    AuthType, DidDocument, DidError, DidKeyUrl, KeyType, ProofPurpose, Service, ServiceType,
    VerificationMethod, VersionId,
};
pub use invoked::{
    sign_envelope, InvokeProof, InvokedDocument, InvokedDocumentBuilder, ProofError, Provider,
};
pub use schema::{SchemaError, SchemaValidator};
pub use status::{
    in_service_transition, revocation_transition, DidStatus, DocumentStatus, RoleType, StatusError,
};
