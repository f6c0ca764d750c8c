//! Organization directory record.
use super::UnknownVariant;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tender_common::ids::OrganizationId;

#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum OrganizationType {
    IE,
    LLC,
    JSC,
}

impl FromStr for OrganizationType {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "IE" => Ok(OrganizationType::IE),
            "LLC" => Ok(OrganizationType::LLC),
            "JSC" => Ok(OrganizationType::JSC),
            _ => Err(UnknownVariant::new("organization type", value)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub organization_type: OrganizationType,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn organization_type_parses() {
        assert_eq!("LLC".parse::<OrganizationType>().unwrap(), OrganizationType::LLC);
        assert!("GmbH".parse::<OrganizationType>().is_err());
    }
}
