//! OpenAPI schema aggregation for the tender API.
//!
//! # Purpose
//! Collects all routes and schema types into a single OpenAPI document for docs
//! and client generation.
use crate::api::{
    system, tenders,
    types::{ErrorResponse, HealthStatus, TenderCreateRequest, TenderEditRequest, TenderResponse},
};
use crate::model::{ServiceType, TenderStatus};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "tenders",
        version = "v1",
        description = "Tender procurement HTTP API"
    ),
    paths(
        system::ping,
        system::health,
        tenders::list_tenders,
        tenders::create_tender,
        tenders::my_tenders,
        tenders::tender_status,
        tenders::update_tender_status,
        tenders::edit_tender,
        tenders::rollback_tender
    ),
    components(schemas(
        ErrorResponse,
        HealthStatus,
        TenderResponse,
        TenderCreateRequest,
        TenderEditRequest,
        ServiceType,
        TenderStatus
    )),
    tags(
        (name = "system", description = "Liveness and readiness"),
        (name = "tenders", description = "Versioned tender management")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();
        for expected in [
            "/api/ping",
            "/api/health",
            "/api/tenders",
            "/api/tenders/new",
            "/api/tenders/my",
            "/api/tenders/{tender_id}/status",
            "/api/tenders/{tender_id}/edit",
            "/api/tenders/{tender_id}/rollback/{version}",
        ] {
            assert!(paths.contains(&expected), "missing {expected}");
        }
    }
}
