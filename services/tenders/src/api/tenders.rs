//! Tender API handlers.
//!
//! # Purpose
//! Validates request shape, resolves the acting employee through the
//! directory, applies the policy, then calls the version-chain store.
//!
//! # Check order
//! Tender id, then username, then the remaining parameters, then existence of
//! the tender, then authorization. Body decoding for edits happens only after
//! the caller is known to be allowed to edit.
use crate::api::authorize_action;
use crate::api::error::{
    ApiError, api_directory_unavailable, api_denied, api_store_error, api_validation_error,
};
use crate::api::types::{TenderCreateRequest, TenderEditRequest, TenderResponse};
use crate::api::validate::{
    QueryParams, parse_organization_id, parse_page, parse_service_type, parse_service_types,
    parse_status, parse_tender_id, parse_version, resolve_employee, validate_description,
    validate_name,
};
use crate::app::AppState;
use crate::model::{TenderDraft, TenderStatus};
use crate::policy::{self, TenderAction};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};

#[utoipa::path(
    get,
    path = "/api/tenders",
    tag = "tenders",
    params(
        ("limit" = Option<u32>, Query, description = "Page size, default 5"),
        ("offset" = Option<u32>, Query, description = "Items to skip, default 0"),
        ("service_type" = Option<Vec<String>>, Query, description = "Repeatable service type filter")
    ),
    responses(
        (status = 200, description = "Current tender versions", body = [TenderResponse]),
        (status = 400, description = "Invalid pagination or service type", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_tenders(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<TenderResponse>>, ApiError> {
    let params = QueryParams::new(pairs);
    let page = parse_page(&params)?;
    let service_types = parse_service_types(&params)?;
    let items = state
        .store
        .list_tenders(page, &service_types)
        .await
        .map_err(api_store_error)?;
    Ok(Json(items.into_iter().map(TenderResponse::from).collect()))
}

#[utoipa::path(
    post,
    path = "/api/tenders/new",
    tag = "tenders",
    request_body = TenderCreateRequest,
    responses(
        (status = 200, description = "Tender created", body = TenderResponse),
        (status = 400, description = "Invalid body", body = crate::api::types::ErrorResponse),
        (status = 401, description = "Unknown creator", body = crate::api::types::ErrorResponse),
        (status = 403, description = "Creator is not responsible for the organization", body = crate::api::types::ErrorResponse),
        (status = 409, description = "Tender already exists", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_tender(
    State(state): State<AppState>,
    body: Result<Json<TenderCreateRequest>, JsonRejection>,
) -> Result<Json<TenderResponse>, ApiError> {
    let Json(body) = body.map_err(|_| api_validation_error("error decoding body"))?;
    let creator =
        resolve_employee(state.directory.as_ref(), Some(body.creator_username.as_str())).await?;
    let service_type = parse_service_type(&body.service_type)?;
    validate_name(&body.name)?;
    validate_description(&body.description)?;
    let organization_id = parse_organization_id(&body.organization_id)?;

    match state.directory.organization(organization_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return Err(api_validation_error("organization not found")),
        Err(err) => return Err(api_directory_unavailable(&err)),
    }
    let responsible = state
        .directory
        .is_responsible(&creator.username, organization_id)
        .await
        .map_err(|err| api_directory_unavailable(&err))?;
    policy::authorize_create(responsible).map_err(api_denied)?;

    let created = state
        .store
        .create_tender(TenderDraft {
            id: None,
            name: body.name,
            description: body.description,
            service_type,
            organization_id,
            creator_id: creator.id,
        })
        .await
        .map_err(api_store_error)?;
    tracing::info!(
        tender_id = %created.id,
        organization_id = %organization_id,
        creator = %creator.username,
        "tender created"
    );
    Ok(Json(created.into()))
}

#[utoipa::path(
    get,
    path = "/api/tenders/my",
    tag = "tenders",
    params(
        ("username" = String, Query, description = "Acting employee"),
        ("limit" = Option<u32>, Query, description = "Page size, default 5"),
        ("offset" = Option<u32>, Query, description = "Items to skip, default 0")
    ),
    responses(
        (status = 200, description = "Tenders created by the caller", body = [TenderResponse]),
        (status = 400, description = "Invalid pagination or username", body = crate::api::types::ErrorResponse),
        (status = 401, description = "Unknown or empty username", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn my_tenders(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<TenderResponse>>, ApiError> {
    let params = QueryParams::new(pairs);
    let page = parse_page(&params)?;
    let employee = resolve_employee(state.directory.as_ref(), params.get("username")).await?;
    let items = state
        .store
        .list_tenders_by_creator(page, employee.id)
        .await
        .map_err(api_store_error)?;
    Ok(Json(items.into_iter().map(TenderResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/tenders/{tender_id}/status",
    tag = "tenders",
    params(
        ("tender_id" = String, Path, description = "Tender identifier"),
        ("username" = String, Query, description = "Acting employee")
    ),
    responses(
        (status = 200, description = "Current status", body = TenderStatus),
        (status = 400, description = "Invalid tender id", body = crate::api::types::ErrorResponse),
        (status = 401, description = "Unknown or empty username", body = crate::api::types::ErrorResponse),
        (status = 403, description = "Tender is not visible", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Tender not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn tender_status(
    Path(tender_id): Path<String>,
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<TenderStatus>, ApiError> {
    let params = QueryParams::new(pairs);
    let id = parse_tender_id(&tender_id)?;
    let employee = resolve_employee(state.directory.as_ref(), params.get("username")).await?;
    let tender = state.store.current_tender(id).await.map_err(api_store_error)?;
    authorize_action(&state, TenderAction::ViewStatus, &tender, &employee).await?;
    Ok(Json(tender.status))
}

#[utoipa::path(
    put,
    path = "/api/tenders/{tender_id}/status",
    tag = "tenders",
    params(
        ("tender_id" = String, Path, description = "Tender identifier"),
        ("username" = String, Query, description = "Acting employee"),
        ("status" = String, Query, description = "New status")
    ),
    responses(
        (status = 200, description = "Tender with the new status", body = TenderResponse),
        (status = 400, description = "Invalid tender id or status", body = crate::api::types::ErrorResponse),
        (status = 401, description = "Unknown or empty username", body = crate::api::types::ErrorResponse),
        (status = 403, description = "Tender is not visible or caller is not responsible", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Tender not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn update_tender_status(
    Path(tender_id): Path<String>,
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<TenderResponse>, ApiError> {
    let params = QueryParams::new(pairs);
    let id = parse_tender_id(&tender_id)?;
    let employee = resolve_employee(state.directory.as_ref(), params.get("username")).await?;
    let status = parse_status(params.get("status"))?;
    let mut tender = state.store.current_tender(id).await.map_err(api_store_error)?;
    authorize_action(&state, TenderAction::ChangeStatus, &tender, &employee).await?;

    let previous = tender.status;
    tender.status = status;
    let updated = state.store.update_tender(tender).await.map_err(api_store_error)?;
    tracing::info!(
        tender_id = %id,
        version = updated.version,
        from = %previous,
        to = %status,
        "tender status changed"
    );
    Ok(Json(updated.into()))
}

#[utoipa::path(
    patch,
    path = "/api/tenders/{tender_id}/edit",
    tag = "tenders",
    params(
        ("tender_id" = String, Path, description = "Tender identifier"),
        ("username" = String, Query, description = "Acting employee")
    ),
    request_body = TenderEditRequest,
    responses(
        (status = 200, description = "Edited tender", body = TenderResponse),
        (status = 400, description = "Invalid tender id or body", body = crate::api::types::ErrorResponse),
        (status = 401, description = "Unknown or empty username", body = crate::api::types::ErrorResponse),
        (status = 403, description = "Caller is not responsible for the organization", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Tender not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn edit_tender(
    Path(tender_id): Path<String>,
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
    body: Result<Json<TenderEditRequest>, JsonRejection>,
) -> Result<Json<TenderResponse>, ApiError> {
    let params = QueryParams::new(pairs);
    let id = parse_tender_id(&tender_id)?;
    let employee = resolve_employee(state.directory.as_ref(), params.get("username")).await?;
    let mut tender = state.store.current_tender(id).await.map_err(api_store_error)?;
    authorize_action(&state, TenderAction::Edit, &tender, &employee).await?;

    let Json(edit) = body.map_err(|_| api_validation_error("error decoding body"))?;
    if let Some(raw) = edit.service_type.as_deref().filter(|v| !v.is_empty()) {
        tender.service_type = parse_service_type(raw)?;
    }
    if let Some(name) = edit.name.filter(|v| !v.is_empty()) {
        validate_name(&name)?;
        tender.name = name;
    }
    if let Some(description) = edit.description.filter(|v| !v.is_empty()) {
        validate_description(&description)?;
        tender.description = description;
    }

    let updated = state.store.update_tender(tender).await.map_err(api_store_error)?;
    tracing::info!(tender_id = %id, version = updated.version, "tender edited");
    Ok(Json(updated.into()))
}

#[utoipa::path(
    put,
    path = "/api/tenders/{tender_id}/rollback/{version}",
    tag = "tenders",
    params(
        ("tender_id" = String, Path, description = "Tender identifier"),
        ("version" = u32, Path, description = "Version to restore"),
        ("username" = String, Query, description = "Acting employee")
    ),
    responses(
        (status = 200, description = "New current version restored from the target", body = TenderResponse),
        (status = 400, description = "Invalid tender id or version", body = crate::api::types::ErrorResponse),
        (status = 401, description = "Unknown or empty username", body = crate::api::types::ErrorResponse),
        (status = 403, description = "Caller is not responsible for the organization", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Tender or version not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn rollback_tender(
    Path((tender_id, version)): Path<(String, String)>,
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<TenderResponse>, ApiError> {
    let params = QueryParams::new(pairs);
    let id = parse_tender_id(&tender_id)?;
    let employee = resolve_employee(state.directory.as_ref(), params.get("username")).await?;
    let tender = state.store.current_tender(id).await.map_err(api_store_error)?;
    authorize_action(&state, TenderAction::Rollback, &tender, &employee).await?;
    let version = parse_version(&version)?;

    let restored = state
        .store
        .rollback_tender(id, version)
        .await
        .map_err(api_store_error)?;
    tracing::info!(
        tender_id = %id,
        from_version = version,
        version = restored.version,
        "tender rolled back"
    );
    Ok(Json(restored.into()))
}
