//! Tender service HTTP application wiring.
//!
//! # Purpose
//! Builds the Axum router, configures middleware, and defines the shared
//! application state injected into handlers.
//!
//! # Notes
//! This module centralizes route composition to keep `main` small and testable.
use crate::api;
use crate::api::openapi::ApiDoc;
use crate::directory::Directory;
use crate::observability;
use crate::store::TenderStore;
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use utoipa::OpenApi;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TenderStore>,
    pub directory: Arc<dyn Directory>,
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            let parent = observability::trace_context_from_headers(request.headers());
            let span = tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version()
            );
            span.set_parent(parent);
            span
        });

    Router::new()
        .route("/api/ping", axum::routing::get(api::system::ping))
        .route("/api/health", axum::routing::get(api::system::health))
        .route(
            "/api/tenders",
            axum::routing::get(api::tenders::list_tenders),
        )
        .route(
            "/api/tenders/new",
            axum::routing::post(api::tenders::create_tender),
        )
        .route(
            "/api/tenders/my",
            axum::routing::get(api::tenders::my_tenders),
        )
        .route(
            "/api/tenders/:tender_id/status",
            axum::routing::get(api::tenders::tender_status).put(api::tenders::update_tender_status),
        )
        .route(
            "/api/tenders/:tender_id/edit",
            axum::routing::patch(api::tenders::edit_tender),
        )
        .route(
            "/api/tenders/:tender_id/rollback/:version",
            axum::routing::put(api::tenders::rollback_tender),
        )
        .merge(
            utoipa_swagger_ui::SwaggerUi::new("/docs").url("/v1/openapi.json", ApiDoc::openapi()),
        )
        .layer(trace_layer)
        .with_state(state)
}
