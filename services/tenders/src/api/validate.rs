//! Request validation helpers.
//!
//! Every helper turns malformed input into an [`ApiError`] with a specific
//! reason, so handlers can chain them with `?` before touching the store.
use crate::api::error::{
    ApiError, api_directory_unavailable, api_unauthorized, api_validation_error,
};
use crate::directory::Directory;
use crate::model::{Employee, ServiceType, TenderStatus};
use std::str::FromStr;
use tender_common::Page;
use tender_common::ids::{OrganizationId, TenderId};

pub const MAX_USERNAME_LENGTH: usize = 50;
pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_DESCRIPTION_LENGTH: usize = 500;

/// Raw query string pairs, keeping repeated keys such as `service_type`.
#[derive(Debug, Default, Clone)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }

    /// First value for `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn all(&self, key: &str) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter(move |(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }
}

fn parse_window_bound(raw: Option<&str>, name: &str, default: usize) -> Result<usize, ApiError> {
    let Some(raw) = raw.filter(|value| !value.is_empty()) else {
        return Ok(default);
    };
    let value: i64 = raw
        .parse()
        .map_err(|_| api_validation_error(&format!("{name} is not integer")))?;
    usize::try_from(value)
        .map_err(|_| api_validation_error(&format!("{name} must not be negative")))
}

/// `limit` defaults to 5 and `offset` to 0; both must be non-negative integers.
pub fn parse_page(params: &QueryParams) -> Result<Page, ApiError> {
    let limit = parse_window_bound(params.get("limit"), "limit", Page::DEFAULT_LIMIT)?;
    let offset = parse_window_bound(params.get("offset"), "offset", 0)?;
    Ok(Page::new(limit, offset))
}

/// Collect every `service_type` value; none at all means "no filter".
pub fn parse_service_types(params: &QueryParams) -> Result<Vec<ServiceType>, ApiError> {
    params.all("service_type").map(parse_service_type).collect()
}

pub fn parse_service_type(raw: &str) -> Result<ServiceType, ApiError> {
    ServiceType::from_str(raw).map_err(|_| api_validation_error("service type is not available"))
}

pub fn parse_status(raw: Option<&str>) -> Result<TenderStatus, ApiError> {
    raw.and_then(|value| TenderStatus::from_str(value).ok())
        .ok_or_else(|| api_validation_error("status is not valid"))
}

pub fn parse_tender_id(raw: &str) -> Result<TenderId, ApiError> {
    TenderId::from_str(raw).map_err(|_| api_validation_error("tender id is not valid"))
}

pub fn parse_organization_id(raw: &str) -> Result<OrganizationId, ApiError> {
    OrganizationId::from_str(raw).map_err(|_| api_validation_error("organization id is not valid"))
}

pub fn parse_version(raw: &str) -> Result<u32, ApiError> {
    let version: i64 = raw
        .parse()
        .map_err(|_| api_validation_error("version is not integer"))?;
    u32::try_from(version)
        .ok()
        .filter(|version| *version > 0)
        .ok_or_else(|| api_validation_error("version must be a positive integer"))
}

pub fn validate_name(name: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(api_validation_error("name is required"));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(api_validation_error(&format!(
            "name is too long. Max length is {MAX_NAME_LENGTH}"
        )));
    }
    Ok(())
}

pub fn validate_description(description: &str) -> Result<(), ApiError> {
    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(api_validation_error(&format!(
            "description is too long. Max length is {MAX_DESCRIPTION_LENGTH}"
        )));
    }
    Ok(())
}

/// Shape check only: empty is 401, oversized is 400.
pub fn check_username(raw: Option<&str>) -> Result<&str, ApiError> {
    let username = raw.unwrap_or_default();
    if username.is_empty() {
        return Err(api_unauthorized("username is empty"));
    }
    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(api_validation_error(&format!(
            "username is too long. Max length is {MAX_USERNAME_LENGTH}"
        )));
    }
    Ok(username)
}

/// Validate `raw` and resolve it to an existing employee.
///
/// A directory failure is a 500, never an unknown employee.
pub async fn resolve_employee(
    directory: &dyn Directory,
    raw: Option<&str>,
) -> Result<Employee, ApiError> {
    let username = check_username(raw)?;
    match directory.employee_by_username(username).await {
        Ok(Some(employee)) => Ok(employee),
        Ok(None) => Err(api_unauthorized("employee does not exist")),
        Err(err) => Err(api_directory_unavailable(&err)),
    }
}
