//! End-to-end integration tests for the SIGIL protocol crate.
//!
//! These tests exercise the proof pipeline as a client and a registry see
//! it: key generation, document publication, envelope signing, storage in
//! a sled ledger, and verification of a later envelope against the stored
//! document. They prove the crate's pieces compose through the public API
//! alone.
//!
//! Each test stands alone with its own temporary database.

use sigil_protocol::canonical::CanonicalBytes;
use sigil_protocol::crypto::keys::{recover_candidates, select_authorized, EcKeypair, EcPublicKey};
use sigil_protocol::crypto::multibase;
use sigil_protocol::crypto::sha256;
use sigil_protocol::crypto::signatures::{verify_raw, EcSignature};
use sigil_protocol::identity::{
    AuthType, DidDocument, DidKeyUrl, DidStatus, DocumentStatus, InvokedDocument,
    InvokedDocumentBuilder, KeyType, ProofError, RoleType, SchemaValidator, VerificationMethod,
    VersionId,
};
use sigil_protocol::storage::{Ledger, LedgerDb, LedgerKey, LedgerTransaction};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

fn document(did: &str, version: u64, keys: &[(&str, &EcKeypair)]) -> DidDocument {
    DidDocument {
        context: vec!["https://www.w3.org/ns/did/v1".to_string()],
        id: did.to_string(),
        controller: did.to_string(),
        created: "2024-05-19T04:32:03Z".to_string(),
        updated: "2024-05-19T04:32:03Z".to_string(),
        version_id: VersionId::new(version).unwrap(),
        deactivated: false,
        verification_method: keys
            .iter()
            .map(|(id, kp)| VerificationMethod {
                id: id.to_string(),
                key_type: KeyType::Secp256r1VerificationKey2018,
                controller: did.to_string(),
                public_key_multibase: kp.public_key().to_multibase(),
                auth_type: AuthType::PIN,
            })
            .collect(),
        assertion_method: vec![],
        authentication: keys.iter().map(|(id, _)| id.to_string()).collect(),
        key_agreement: vec![],
        capability_invocation: vec![keys[0].0.to_string()],
        capability_delegation: vec![],
        service: vec![],
    }
}

fn envelope(doc: DidDocument, signer_did: &str, version: u64, key_id: &str, kp: &EcKeypair) -> InvokedDocument {
    InvokedDocumentBuilder::new(doc)
        .controller(signer_did, "https://example.org/vc/cert")
        .verification_method(DidKeyUrl::new(signer_did, VersionId::new(version).unwrap(), key_id))
        .created("2024-05-19T04:32:03Z")
        .nonce("5f2a")
        .sign(kp)
        .unwrap()
}

// ---------------------------------------------------------------------------
// 1. Publish, store, then authorize an update against the stored document
// ---------------------------------------------------------------------------

#[test]
fn update_is_verified_against_stored_previous_version() {
    let mut db = LedgerDb::open_temporary().expect("temp db");
    let pin = EcKeypair::generate();
    let did = "did:example:wallet";

    // v1 is published.
    let v1 = document(did, 1, &[("pin", &pin)]);
    SchemaValidator::default().validate_document(&v1).unwrap();
    {
        let mut tx = LedgerTransaction::new(&mut db);
        tx.insert(&LedgerKey::latest_document(did), &v1).unwrap();
        tx.insert(
            &LedgerKey::document_status(did),
            &DocumentStatus::new(did, v1.version_id, RoleType::Wallet),
        )
        .unwrap();
        tx.commit().unwrap();
    }

    // v2 is signed with the key published in v1 and arrives as JSON.
    let next_key = EcKeypair::generate();
    let v2 = document(did, 2, &[("pin", &next_key)]);
    let wire = serde_json::to_vec(&envelope(v2.clone(), did, 1, "pin", &pin)).unwrap();

    let received = InvokedDocument::from_json(&wire).unwrap();
    let key_url = received.key_url().unwrap();
    let signer: DidDocument = db.get(&LedgerKey::latest_document(&key_url.did)).unwrap();
    assert_eq!(signer.version_id, key_url.version_id);

    received.verify_with(&signer, &key_url.key_id).unwrap();
    assert_eq!(received.document().unwrap(), v2);

    // The v2 key cannot sign for v1.
    let forged = envelope(v2, did, 1, "pin", &next_key);
    assert!(matches!(
        forged.verify_with(&signer, "pin"),
        Err(ProofError::Signature(_))
    ));
}

// ---------------------------------------------------------------------------
// 2. Recovery picks the authorized signer
// ---------------------------------------------------------------------------

#[test]
fn recovered_candidates_resolve_to_the_published_key() {
    let signer = EcKeypair::generate();
    let bystander = EcKeypair::generate();
    let env = envelope(
        document("did:example:tas", 1, &[("pin", &signer)]),
        "did:example:tas",
        1,
        "pin",
        &signer,
    );

    let payload = env.signing_payload().unwrap();
    let signature = env.proof_signature().unwrap();
    let candidates = recover_candidates(&sha256(payload.as_bytes()), &signature).unwrap();

    let authorized = [bystander.public_key(), signer.public_key()];
    assert_eq!(select_authorized(&candidates, &authorized), Some(signer.public_key()));
    assert_eq!(select_authorized(&candidates, &[bystander.public_key()]), None);
}

// ---------------------------------------------------------------------------
// 3. Reference-client vector through the public API
// ---------------------------------------------------------------------------

#[test]
fn reference_client_signature_verifies_from_multibase() {
    let key = EcPublicKey::decompress(
        &hex::decode("035406dba5e8a29dc2d05b42c08f925b95d972786d95f91e86e7d2c0f51c6cef9b").unwrap(),
    )
    .unwrap();
    let wire = hex::decode(
        "1f8578bd7f8535d3a7cccade7670ee0947e7fc778e82690928c56ff4c8ddfbf0ab739563c6f01c6a1e752c1a824e621bcab94e62a708fe0e88dab20c6646919706",
    )
    .unwrap();

    assert!(verify_raw(&key, b"Test", &wire));

    let proof_value = multibase::encode_base58btc(&wire);
    let signature = EcSignature::from_multibase(&proof_value).unwrap();
    assert_eq!(&signature.as_bytes()[..], &wire[1..]);

    assert!(!verify_raw(&key, b"test", &wire));
}

// ---------------------------------------------------------------------------
// 4. Canonical bytes survive storage
// ---------------------------------------------------------------------------

#[test]
fn stored_document_canonicalizes_identically() {
    let mut db = LedgerDb::open_temporary().unwrap();
    let kp = EcKeypair::generate();
    let doc = document("did:example:issuer", 3, &[("pin", &kp), ("bio", &kp)]);
    let key = LedgerKey::versioned_document(&doc.id, doc.version_id);

    db.put(&key, &doc).unwrap();
    let back: DidDocument = db.get(&key).unwrap();

    assert_eq!(
        CanonicalBytes::new(&doc).unwrap(),
        CanonicalBytes::new(&back).unwrap()
    );
}

// ---------------------------------------------------------------------------
// 5. Status record lifecycle through storage
// ---------------------------------------------------------------------------

#[test]
fn status_record_lifecycle_persists() {
    let dir = tempfile::tempdir().unwrap();
    let did = "did:example:kyc";
    let key = LedgerKey::document_status(did);

    {
        let mut db = LedgerDb::open(dir.path()).unwrap();
        let mut status = DocumentStatus::new(did, VersionId::FIRST, RoleType::KycProvider);
        status.apply_in_service(DidStatus::Deactivated).unwrap();
        status.apply_revocation(DidStatus::Revoked, None).unwrap();
        db.put(&key, &status).unwrap();
    }

    let mut db = LedgerDb::open(dir.path()).unwrap();
    let mut status: DocumentStatus = db.get(&key).unwrap();
    assert_eq!(status.status, DidStatus::Revoked);
    assert!(status.apply_in_service(DidStatus::Activated).is_err());

    status
        .apply_revocation(DidStatus::Terminated, Some("2025-01-01T00:00:00Z"))
        .unwrap();
    db.put(&key, &status).unwrap();

    let stored: DocumentStatus = db.get(&key).unwrap();
    assert_eq!(stored.status, DidStatus::Terminated);
    assert_eq!(stored.terminated_time.as_deref(), Some("2025-01-01T00:00:00Z"));
}
