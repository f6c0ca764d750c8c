//! Tender service HTTP API module.
//!
//! # Purpose
//! Exposes route handler modules and the shared helper that combines the
//! directory membership lookup with the policy decision.
pub mod error;
pub mod openapi;
pub mod system;
pub mod tenders;
pub mod types;
pub mod validate;

use crate::api::error::{ApiError, api_denied, api_directory_unavailable};
use crate::app::AppState;
use crate::model::{Employee, Tender};
use crate::policy::{self, Actor, TenderAction};

/// Authorize `action` for `employee`, consulting the directory only when the
/// action needs organization membership.
pub(crate) async fn authorize_action(
    state: &AppState,
    action: TenderAction,
    tender: &Tender,
    employee: &Employee,
) -> Result<(), ApiError> {
    let responsible = if action.requires_responsibility() {
        state
            .directory
            .is_responsible(&employee.username, tender.organization_id)
            .await
            .map_err(|err| api_directory_unavailable(&err))?
    } else {
        false
    };
    let actor = Actor {
        employee,
        responsible,
    };
    policy::authorize(action, tender, actor).map_err(|denial| {
        tracing::debug!(
            tender_id = %tender.id,
            username = %employee.username,
            ?action,
            ?denial,
            "tender action denied"
        );
        api_denied(denial)
    })
}
