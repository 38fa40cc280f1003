//! # Prometheus Metrics
//!
//! Exposes operational metrics for the registry node. Scraped by Prometheus
//! at the `/metrics` HTTP endpoint on the configured metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so they
//! do not collide with any default global registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

use sigil_contracts::ErrorKind;

/// Holds all Prometheus metric handles for the node.
///
/// Clone-friendly (prometheus handles are `Arc`s internally) so it can be
/// shared across request handlers.
#[derive(Clone)]
pub struct NodeMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// First registrations of a DID.
    pub documents_registered_total: IntCounter,
    /// Accepted document updates.
    pub documents_updated_total: IntCounter,
    /// DID status changes, by target status.
    pub status_changes_total: IntCounterVec,
    /// Credential metadata records registered.
    pub vc_meta_registered_total: IntCounter,
    /// Credential status changes, by target status.
    pub vc_status_changes_total: IntCounterVec,
    /// Rejected contract operations, by error kind.
    pub rejections_total: IntCounterVec,
    /// RPC handling latency in seconds, by method.
    pub request_latency_seconds: HistogramVec,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("sigil".into()), None)?;

        let documents_registered_total = IntCounter::new(
            "documents_registered_total",
            "Total number of DIDs registered for the first time",
        )?;
        registry.register(Box::new(documents_registered_total.clone()))?;

        let documents_updated_total = IntCounter::new(
            "documents_updated_total",
            "Total number of accepted DID document updates",
        )?;
        registry.register(Box::new(documents_updated_total.clone()))?;

        let status_changes_total = IntCounterVec::new(
            Opts::new("status_changes_total", "DID status changes by target status"),
            &["status"],
        )?;
        registry.register(Box::new(status_changes_total.clone()))?;

        let vc_meta_registered_total = IntCounter::new(
            "vc_meta_registered_total",
            "Total number of credential metadata records registered",
        )?;
        registry.register(Box::new(vc_meta_registered_total.clone()))?;

        let vc_status_changes_total = IntCounterVec::new(
            Opts::new("vc_status_changes_total", "Credential status changes by target status"),
            &["status"],
        )?;
        registry.register(Box::new(vc_status_changes_total.clone()))?;

        let rejections_total = IntCounterVec::new(
            Opts::new("rejections_total", "Rejected contract operations by error kind"),
            &["kind"],
        )?;
        registry.register(Box::new(rejections_total.clone()))?;

        let request_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "request_latency_seconds",
                "JSON-RPC request handling latency in seconds",
            )
            .buckets(vec![
                0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
            ]),
            &["method"],
        )?;
        registry.register(Box::new(request_latency_seconds.clone()))?;

        Ok(Self {
            registry,
            documents_registered_total,
            documents_updated_total,
            status_changes_total,
            vc_meta_registered_total,
            vc_status_changes_total,
            rejections_total,
            request_latency_seconds,
        })
    }

    pub fn record_rejection(&self, kind: ErrorKind) {
        self.rejections_total.with_label_values(&[kind.as_str()]).inc();
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<NodeMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
