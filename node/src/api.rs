//! # REST + JSON-RPC API
//!
//! Builds the axum router that exposes the registry's HTTP interface.
//! All endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                | Description                          |
//! |--------|---------------------|--------------------------------------|
//! | GET    | `/health`           | Liveness check                       |
//! | GET    | `/status`           | Node and ledger summary              |
//! | POST   | `/rpc`              | JSON-RPC 2.0 gateway                 |
//! | GET    | `/documents/:did`   | Document and status (`?versionId=n`) |
//! | GET    | `/vc-meta/:id`      | Credential metadata                  |
//!
//! ## JSON-RPC methods
//!
//! | Method                      | Params                                     |
//! |-----------------------------|--------------------------------------------|
//! | `did_registerDocument`      | `{invokedDocument, role}`                  |
//! | `did_getDocumentAndStatus`  | `{did, versionId?}`                        |
//! | `did_setInServiceStatus`    | `{did, status, versionId?}`                |
//! | `did_setRevocationStatus`   | `{did, status, terminatedTime?}`           |
//! | `vc_registerMetadata`       | `{vcMeta}`                                 |
//! | `vc_getMetadata`            | `{vcId}`                                   |
//! | `vc_updateStatus`           | `{vcId, status}`                           |
//! | `sigil_version`             | none                                       |
//!
//! Contract failures come back as error `-32000`. The message is the
//! client string (`SSRVFCC01008: ...`) and `data` carries the code and the
//! error kind. A read that finds nothing returns `null`.
//!
//! Every contract call takes the ledger lock, so mutations are serialized.

use axum::{
    extract::{Path, Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use sigil_contracts::{ContractError, DocumentContract, RegistrationOutcome, VcMetaContract};
use sigil_protocol::identity::{
    DidStatus, InvokedDocument, RoleType, SchemaValidator, VcMeta, VcStatus, VersionId,
};
use sigil_protocol::storage::LedgerDb;

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone: the ledger and metrics sit behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// The ledger every contract operation runs against.
    pub ledger: Arc<Mutex<LedgerDb>>,
    pub documents: DocumentContract,
    pub vc_meta: VcMetaContract,
    /// Reference to Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
}

impl AppState {
    pub fn new(
        version: String,
        ledger: LedgerDb,
        validator: SchemaValidator,
        metrics: SharedMetrics,
    ) -> Self {
        Self {
            version,
            ledger: Arc::new(Mutex::new(ledger)),
            documents: DocumentContract::new(validator.clone()),
            vc_meta: VcMetaContract::new(validator),
            metrics,
        }
    }
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/rpc", post(rpc_handler))
        .route("/documents/:did", get(document_handler))
        .route("/vc-meta/:id", get(vc_meta_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// JSON-RPC Types
// ---------------------------------------------------------------------------

/// Methods served at `POST /rpc`.
pub const RPC_METHODS: [&str; 8] = [
    "did_registerDocument",
    "did_getDocumentAndStatus",
    "did_setInServiceStatus",
    "did_setRevocationStatus",
    "vc_registerMetadata",
    "vc_getMetadata",
    "vc_updateStatus",
    "sigil_version",
];

/// Server error code for a rejected contract operation.
pub const CONTRACT_ERROR_CODE: i32 = -32000;

/// A JSON-RPC 2.0 request envelope.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version. Must be "2.0".
    pub jsonrpc: String,
    pub method: String,
    pub params: Option<Value>,
    /// Request identifier. Echoed back in the response.
    pub id: Value,
}

/// A JSON-RPC 2.0 response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Protocol version. Always "2.0".
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Value,
}

impl JsonRpcResponse {
    fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            result: Some(result),
            error: None,
            id,
        }
    }

    fn failure(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            result: None,
            error: Some(error),
            id,
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterDocumentParams {
    invoked_document: InvokedDocument,
    role: RoleType,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetDocumentParams {
    did: String,
    #[serde(default)]
    version_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InServiceParams {
    did: String,
    status: DidStatus,
    #[serde(default)]
    version_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RevocationParams {
    did: String,
    status: DidStatus,
    #[serde(default)]
    terminated_time: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterVcMetaParams {
    vc_meta: VcMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VcIdParams {
    vc_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VcStatusParams {
    vc_id: String,
    status: VcStatus,
}

/// Why an RPC call failed, before it becomes a wire error.
#[derive(Debug)]
enum RpcFailure {
    MethodNotFound(String),
    InvalidParams(String),
    Contract(ContractError),
    Internal(String),
}

impl From<ContractError> for RpcFailure {
    fn from(e: ContractError) -> Self {
        Self::Contract(e)
    }
}

impl RpcFailure {
    fn into_error(self) -> JsonRpcError {
        match self {
            Self::MethodNotFound(method) => JsonRpcError {
                code: -32601,
                message: format!("Method not found: {method}"),
                data: None,
            },
            Self::InvalidParams(reason) => JsonRpcError {
                code: -32602,
                message: format!("Invalid params: {reason}"),
                data: None,
            },
            Self::Contract(e) => JsonRpcError {
                code: CONTRACT_ERROR_CODE,
                message: e.to_client_string(),
                data: Some(json!({ "code": e.code(), "kind": e.kind().as_str() })),
            },
            Self::Internal(reason) => JsonRpcError {
                code: -32603,
                message: format!("Internal error: {reason}"),
                data: None,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub version: String,
    pub protocol_version: String,
    /// Contract name recorded in the ledger on creation.
    pub contract: Option<String>,
    /// Number of records in the ledger.
    pub records: usize,
    /// RFC 3339 timestamp of the response.
    pub timestamp: String,
}

/// Generic error body returned by REST endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Deserialize)]
struct VersionQuery {
    #[serde(rename = "versionId")]
    version_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`: returns 200 if the node is alive.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

/// `GET /status`: node version and ledger summary.
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let ledger = state.ledger.lock();
    let contract = ledger.contract_name().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to read ledger metadata");
        None
    });

    Json(StatusResponse {
        version: state.version.clone(),
        protocol_version: sigil_protocol::config::PROTOCOL_VERSION.to_string(),
        contract,
        records: ledger.record_count(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// `POST /rpc`: JSON-RPC 2.0 gateway.
async fn rpc_handler(
    State(state): State<AppState>,
    Json(req): Json<JsonRpcRequest>,
) -> Json<JsonRpcResponse> {
    if req.jsonrpc != "2.0" {
        return Json(JsonRpcResponse::failure(
            req.id,
            JsonRpcError {
                code: -32600,
                message: "Invalid Request: jsonrpc must be \"2.0\"".into(),
                data: None,
            },
        ));
    }

    let started = Instant::now();
    let outcome = dispatch(&state, &req.method, req.params);

    if RPC_METHODS.contains(&req.method.as_str()) {
        state
            .metrics
            .request_latency_seconds
            .with_label_values(&[req.method.as_str()])
            .observe(started.elapsed().as_secs_f64());
    }

    let response = match outcome {
        Ok(result) => JsonRpcResponse::success(req.id, result),
        Err(failure) => {
            if let RpcFailure::Contract(e) = &failure {
                state.metrics.record_rejection(e.kind());
                tracing::warn!(method = %req.method, code = %e.code(), error = %e, "rpc rejected");
            }
            JsonRpcResponse::failure(req.id, failure.into_error())
        }
    };
    Json(response)
}

/// Route one RPC call to its contract operation.
fn dispatch(state: &AppState, method: &str, params: Option<Value>) -> Result<Value, RpcFailure> {
    match method {
        "did_registerDocument" => {
            let p: RegisterDocumentParams = parse_params(params)?;
            let outcome = state.documents.register_document(
                &mut *state.ledger.lock(),
                &p.invoked_document,
                p.role,
            )?;
            match outcome {
                RegistrationOutcome::Created { .. } => state.metrics.documents_registered_total.inc(),
                RegistrationOutcome::Updated { .. } => state.metrics.documents_updated_total.inc(),
            }
            to_value(&outcome)
        }
        "did_getDocumentAndStatus" => {
            let p: GetDocumentParams = parse_params(params)?;
            let version = optional_version(p.version_id.as_deref())?;
            let found = state
                .documents
                .get_document_and_status(&*state.ledger.lock(), &p.did, version)?;
            to_value(&found)
        }
        "did_setInServiceStatus" => {
            let p: InServiceParams = parse_params(params)?;
            let version = optional_version(p.version_id.as_deref())?;
            let document = state.documents.set_in_service_status(
                &mut *state.ledger.lock(),
                &p.did,
                p.status,
                version,
            )?;
            state
                .metrics
                .status_changes_total
                .with_label_values(&[p.status.as_str()])
                .inc();
            to_value(&document)
        }
        "did_setRevocationStatus" => {
            let p: RevocationParams = parse_params(params)?;
            let status = state.documents.set_revocation_status(
                &mut *state.ledger.lock(),
                &p.did,
                p.status,
                p.terminated_time.as_deref(),
            )?;
            state
                .metrics
                .status_changes_total
                .with_label_values(&[p.status.as_str()])
                .inc();
            to_value(&status)
        }
        "vc_registerMetadata" => {
            let p: RegisterVcMetaParams = parse_params(params)?;
            state
                .vc_meta
                .register_vc_meta(&mut *state.ledger.lock(), &p.vc_meta)?;
            state.metrics.vc_meta_registered_total.inc();
            Ok(json!({ "id": p.vc_meta.id }))
        }
        "vc_getMetadata" => {
            let p: VcIdParams = parse_params(params)?;
            let found = state.vc_meta.get_vc_meta(&*state.ledger.lock(), &p.vc_id)?;
            to_value(&found)
        }
        "vc_updateStatus" => {
            let p: VcStatusParams = parse_params(params)?;
            let meta = state
                .vc_meta
                .update_vc_status(&mut *state.ledger.lock(), &p.vc_id, p.status)?;
            state
                .metrics
                .vc_status_changes_total
                .with_label_values(&[&p.status.to_string()])
                .inc();
            to_value(&meta)
        }
        "sigil_version" => Ok(json!(state.version)),
        other => Err(RpcFailure::MethodNotFound(other.to_string())),
    }
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T, RpcFailure> {
    serde_json::from_value(params.unwrap_or(Value::Null))
        .map_err(|e| RpcFailure::InvalidParams(e.to_string()))
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, RpcFailure> {
    serde_json::to_value(value).map_err(|e| RpcFailure::Internal(e.to_string()))
}

/// An absent or empty `versionId` means the latest version.
fn optional_version(raw: Option<&str>) -> Result<Option<VersionId>, RpcFailure> {
    match raw {
        None | Some("") => Ok(None),
        Some(s) => s
            .parse()
            .map(Some)
            .map_err(|e| RpcFailure::InvalidParams(format!("versionId: {e}"))),
    }
}

fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorResponse { error })).into_response()
}

/// `GET /documents/:did`: a document and its DID's status.
async fn document_handler(
    State(state): State<AppState>,
    Path(did): Path<String>,
    Query(query): Query<VersionQuery>,
) -> Response {
    let version = match optional_version(query.version_id.as_deref()) {
        Ok(v) => v,
        Err(failure) => return error_response(StatusCode::BAD_REQUEST, failure.into_error().message),
    };

    let found = state
        .documents
        .get_document_and_status(&*state.ledger.lock(), &did, version);
    match found {
        Ok(Some(record)) => (StatusCode::OK, Json(record)).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, format!("no document for {did}")),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_client_string()),
    }
}

/// `GET /vc-meta/:id`: credential metadata.
async fn vc_meta_handler(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let found = state.vc_meta.get_vc_meta(&*state.ledger.lock(), &id);
    match found {
        Ok(Some(meta)) => (StatusCode::OK, Json(meta)).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, format!("no vc meta for {id}")),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_client_string()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use sigil_protocol::crypto::EcKeypair;
    use sigil_protocol::identity::{
        AuthType, DidDocument, DidKeyUrl, InvokedDocumentBuilder, KeyType, VerificationMethod,
    };
    use tower::ServiceExt;

    const TAS: &str = "did:sigil:tas";

    /// Creates a test AppState backed by a temporary database.
    fn test_app_state() -> AppState {
        let ledger = LedgerDb::open_temporary().expect("temp db");
        let metrics = Arc::new(crate::metrics::NodeMetrics::new().expect("metrics"));
        AppState::new("0.1.0-test".into(), ledger, SchemaValidator::default(), metrics)
    }

    fn document(version: u64, key: &EcKeypair) -> DidDocument {
        DidDocument {
            context: vec!["https://www.w3.org/ns/did/v1".into()],
            id: TAS.into(),
            controller: TAS.into(),
            created: "2024-05-19T04:32:03Z".into(),
            updated: "2024-05-19T04:32:03Z".into(),
            version_id: VersionId::new(version).unwrap(),
            deactivated: false,
            verification_method: vec![VerificationMethod {
                id: "pin".into(),
                key_type: KeyType::Secp256r1VerificationKey2018,
                controller: TAS.into(),
                public_key_multibase: key.public_key().to_multibase(),
                auth_type: AuthType::PIN,
            }],
            assertion_method: vec![],
            authentication: vec!["pin".into()],
            key_agreement: vec![],
            capability_invocation: vec!["pin".into()],
            capability_delegation: vec![],
            service: vec![],
        }
    }

    fn register_params(version: u64, key: &EcKeypair) -> Value {
        let envelope = InvokedDocumentBuilder::new(document(version, key))
            .controller(TAS, "https://example.org/vc/tas")
            .verification_method(DidKeyUrl::new(TAS, VersionId::FIRST, "pin"))
            .created("2024-05-19T04:32:03Z")
            .nonce("01")
            .sign(key)
            .unwrap();
        json!({ "invokedDocument": envelope, "role": "Tas" })
    }

    fn vc_meta() -> Value {
        json!({
            "id": "vc:sigil:0001",
            "issuer": { "did": "did:sigil:issuer", "certVcRef": "https://example.org/cert/issuer" },
            "subject": "did:sigil:holder",
            "credentialSchema": { "id": "https://example.org/schema/mdl", "type": "OsdSchemaCredential" },
            "status": "ACTIVE",
            "issuanceDate": "2024-05-19T04:32:03Z",
            "validFrom": "2024-05-19T04:32:03Z",
            "validUntil": "2029-05-19T04:32:03Z",
            "formatVersion": "1.0",
            "language": "en"
        })
    }

    /// Sends a GET request and returns the (status, body_bytes).
    async fn get(router: &Router, path: &str) -> (StatusCode, Vec<u8>) {
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec();
        (status, body)
    }

    /// Sends a POST request with JSON body and returns (status, body_bytes).
    async fn post_json(router: &Router, path: &str, body: Value) -> (StatusCode, Vec<u8>) {
        let req = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec();
        (status, body)
    }

    /// Sends a JSON-RPC call and returns the raw response object, so an
    /// explicit `"result": null` stays distinguishable from a missing one.
    async fn rpc_json(router: &Router, method: &str, params: Value) -> Value {
        let (status, body) = post_json(
            router,
            "/rpc",
            json!({ "jsonrpc": "2.0", "method": method, "params": params, "id": 1 }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        serde_json::from_slice(&body).unwrap()
    }

    async fn rpc(router: &Router, method: &str, params: Value) -> JsonRpcResponse {
        serde_json::from_value(rpc_json(router, method, params).await).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let router = create_router(test_app_state());
        let (status, body) = get(&router, "/health").await;
        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn status_reports_ledger_contents() {
        let router = create_router(test_app_state());
        let key = EcKeypair::generate();
        rpc(&router, "did_registerDocument", register_params(1, &key)).await;

        let (status, body) = get(&router, "/status").await;
        assert_eq!(status, StatusCode::OK);
        let resp: StatusResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.records, 2);
        assert_eq!(resp.contract.as_deref(), Some(sigil_protocol::config::CONTRACT_NAME));
    }

    #[tokio::test]
    async fn register_then_read_over_rest() {
        let router = create_router(test_app_state());
        let key = EcKeypair::generate();

        let resp = rpc(&router, "did_registerDocument", register_params(1, &key)).await;
        let result = resp.result.unwrap();
        assert_eq!(result["outcome"], "created");
        assert_eq!(result["version"], "1");

        let (status, body) = get(&router, "/documents/did:sigil:tas").await;
        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ACTIVATED");
        assert_eq!(json["document"]["versionId"], "1");

        let (status, _) = get(&router, "/documents/did:sigil:tas?versionId=1").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_document_is_404() {
        let router = create_router(test_app_state());
        let (status, _) = get(&router, "/documents/did:sigil:nobody").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_version_query_is_400() {
        let router = create_router(test_app_state());
        let (status, _) = get(&router, "/documents/did:sigil:tas?versionId=01").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn rpc_read_of_unknown_did_is_null() {
        let router = create_router(test_app_state());
        let resp = rpc_json(&router, "did_getDocumentAndStatus", json!({ "did": TAS, "versionId": "" })).await;
        assert!(resp.get("error").is_none());
        assert_eq!(resp.get("result"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn stale_version_surfaces_contract_code() {
        let state = test_app_state();
        let metrics = Arc::clone(&state.metrics);
        let router = create_router(state);
        let key = EcKeypair::generate();

        rpc(&router, "did_registerDocument", register_params(1, &key)).await;
        let resp = rpc(&router, "did_registerDocument", register_params(1, &key)).await;

        let error = resp.error.unwrap();
        assert_eq!(error.code, CONTRACT_ERROR_CODE);
        assert!(error.message.starts_with("SSRVFCC01008: "));
        let data = error.data.unwrap();
        assert_eq!(data["code"], "SSRVFCC01008");
        assert_eq!(data["kind"], "version_conflict");

        let text = metrics.encode().unwrap();
        assert!(text.contains("sigil_rejections_total{kind=\"version_conflict\"} 1"));
        assert!(text.contains("sigil_documents_registered_total 1"));
    }

    #[tokio::test]
    async fn revocation_over_rpc() {
        let router = create_router(test_app_state());
        let key = EcKeypair::generate();
        rpc(&router, "did_registerDocument", register_params(1, &key)).await;

        let resp = rpc(&router, "did_setRevocationStatus", json!({ "did": TAS, "status": "REVOKED" })).await;
        assert_eq!(resp.result.unwrap()["status"], "REVOKED");

        let resp = rpc(&router, "did_setRevocationStatus", json!({ "did": TAS, "status": "REVOKED" })).await;
        assert_eq!(resp.error.unwrap().data.unwrap()["kind"], "status_transition_invalid");

        let resp = rpc(
            &router,
            "did_setRevocationStatus",
            json!({ "did": TAS, "status": "TERMINATED", "terminatedTime": "2025-01-01T00:00:00Z" }),
        )
        .await;
        assert_eq!(resp.result.unwrap()["cancelled_time"], "2025-01-01T00:00:00Z");
    }

    #[tokio::test]
    async fn deactivate_over_rpc() {
        let router = create_router(test_app_state());
        let key = EcKeypair::generate();
        rpc(&router, "did_registerDocument", register_params(1, &key)).await;

        let resp = rpc(&router, "did_setInServiceStatus", json!({ "did": TAS, "status": "DEACTIVATED" })).await;
        assert_eq!(resp.result.unwrap()["deactivated"], true);

        let resp = rpc(&router, "did_getDocumentAndStatus", json!({ "did": TAS })).await;
        assert_eq!(resp.result.unwrap()["status"], "DEACTIVATED");
    }

    #[tokio::test]
    async fn vc_meta_over_rpc_and_rest() {
        let router = create_router(test_app_state());

        let resp = rpc(&router, "vc_registerMetadata", json!({ "vcMeta": vc_meta() })).await;
        assert_eq!(resp.result.unwrap()["id"], "vc:sigil:0001");

        let resp = rpc(&router, "vc_updateStatus", json!({ "vcId": "vc:sigil:0001", "status": "INACTIVE" })).await;
        assert_eq!(resp.result.unwrap()["status"], "INACTIVE");

        let (status, body) = get(&router, "/vc-meta/vc:sigil:0001").await;
        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "INACTIVE");

        let resp = rpc_json(&router, "vc_getMetadata", json!({ "vcId": "vc:sigil:0002" })).await;
        assert_eq!(resp.get("result"), Some(&Value::Null));

        let resp = rpc(&router, "vc_registerMetadata", json!({ "vcMeta": vc_meta() })).await;
        assert_eq!(resp.error.unwrap().data.unwrap()["code"], "SSRVFCC03001");
    }

    #[tokio::test]
    async fn missing_params_are_invalid() {
        let router = create_router(test_app_state());
        let resp = rpc(&router, "did_getDocumentAndStatus", Value::Null).await;
        assert_eq!(resp.error.unwrap().code, -32602);

        let resp = rpc(&router, "did_setInServiceStatus", json!({ "did": TAS, "status": "UNKNOWN" })).await;
        assert_eq!(resp.error.unwrap().code, -32602);
    }

    #[tokio::test]
    async fn rpc_version_and_unknown_method() {
        let router = create_router(test_app_state());

        let resp = rpc(&router, "sigil_version", Value::Null).await;
        assert_eq!(resp.result, Some(json!("0.1.0-test")));

        let resp = rpc(&router, "eth_blockNumber", Value::Null).await;
        assert_eq!(resp.error.unwrap().code, -32601);
    }

    #[tokio::test]
    async fn rpc_invalid_version_returns_error() {
        let router = create_router(test_app_state());
        let (status, body) = post_json(
            &router,
            "/rpc",
            json!({ "jsonrpc": "1.0", "method": "sigil_version", "id": 7 }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let resp: JsonRpcResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.error.unwrap().code, -32600);
        assert_eq!(resp.id, json!(7));
    }
}
