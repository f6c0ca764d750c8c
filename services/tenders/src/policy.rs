//! Visibility and mutability rules for tenders.
//!
//! Pure decisions over a tender snapshot and the acting employee. Whether the
//! employee is a responsible member of the owning organization is looked up by
//! the caller and passed in through [`Actor`].
use crate::model::{Employee, Tender, TenderStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenderAction {
    ViewStatus,
    ChangeStatus,
    Edit,
    Rollback,
}

impl TenderAction {
    pub fn requires_visibility(self) -> bool {
        matches!(self, TenderAction::ViewStatus | TenderAction::ChangeStatus)
    }

    pub fn requires_responsibility(self) -> bool {
        !matches!(self, TenderAction::ViewStatus)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// Unpublished and not created by the caller.
    Hidden,
    /// Not a responsible member of the owning organization.
    NotResponsible,
}

/// The employee attempting an action, with their membership already resolved.
#[derive(Debug, Clone, Copy)]
pub struct Actor<'a> {
    pub employee: &'a Employee,
    pub responsible: bool,
}

pub fn is_visible(tender: &Tender, employee: &Employee) -> bool {
    tender.status == TenderStatus::Published || tender.creator_id == employee.id
}

/// Decide whether `actor` may perform `action` on `tender`.
///
/// Visibility is checked first so a hidden tender reports [`Denial::Hidden`]
/// even when the caller also lacks membership.
pub fn authorize(action: TenderAction, tender: &Tender, actor: Actor<'_>) -> Result<(), Denial> {
    if action.requires_visibility() && !is_visible(tender, actor.employee) {
        return Err(Denial::Hidden);
    }
    if action.requires_responsibility() && !actor.responsible {
        return Err(Denial::NotResponsible);
    }
    Ok(())
}

/// Creating a tender needs membership in the target organization only.
pub fn authorize_create(responsible: bool) -> Result<(), Denial> {
    if responsible {
        Ok(())
    } else {
        Err(Denial::NotResponsible)
    }
}
