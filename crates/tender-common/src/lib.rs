// Shared identifier types used by the tender service and its tests.
use serde::{Deserialize, Serialize};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("invalid id: {0}")]
    InvalidId(String),
}

pub mod ids {
    // Strongly typed IDs so a tender id can never be passed where an employee id is expected.
    use super::{Error, Result};
    use serde::{Deserialize, Serialize};
    use std::fmt;
    use std::str::FromStr;
    use uuid::Uuid;

    macro_rules! id_type {
        ($name:ident) => {
            #[derive(
                Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
            )]
            #[serde(transparent)]
            pub struct $name(Uuid);

            impl $name {
                // Generate a new random ID.
                pub fn new() -> Self {
                    Self(Uuid::new_v4())
                }

                // Wrap an existing UUID when decoding from storage.
                pub fn from_uuid(uuid: Uuid) -> Self {
                    Self(uuid)
                }

                pub fn as_uuid(&self) -> Uuid {
                    self.0
                }
            }

            impl Default for $name {
                fn default() -> Self {
                    Self::new()
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }

            impl FromStr for $name {
                type Err = Error;

                fn from_str(input: &str) -> Result<Self> {
                    // Keep the raw input in the error so callers can echo it back.
                    let uuid =
                        Uuid::parse_str(input).map_err(|_| Error::InvalidId(input.into()))?;
                    Ok(Self(uuid))
                }
            }

            impl From<Uuid> for $name {
                fn from(uuid: Uuid) -> Self {
                    Self(uuid)
                }
            }
        };
    }

    id_type!(TenderId);
    id_type!(EmployeeId);
    id_type!(OrganizationId);
    id_type!(BidId);
}

/// Pagination window applied to list results.
///
/// ```
/// use tender_common::Page;
///
/// let page = Page::default();
/// assert_eq!(page.limit, 5);
/// assert_eq!(page.offset, 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Page {
    pub const DEFAULT_LIMIT: usize = 5;

    pub fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }

    /// Slice `items` to `[offset, offset + limit)`.
    ///
    /// An offset past the end yields an empty vector, never a panic.
    pub fn window<I: IntoIterator>(&self, items: I) -> Vec<I::Item> {
        items
            .into_iter()
            .skip(self.offset)
            .take(self.limit)
            .collect()
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: Self::DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, Page, ids::TenderId};
    use std::str::FromStr;

    #[test]
    fn tender_id_round_trip() {
        let id = TenderId::new();
        let parsed = TenderId::from_str(&id.to_string()).expect("parse");
        assert_eq!(id, parsed);
    }

    #[test]
    fn tender_id_rejects_invalid_input() {
        let err = TenderId::from_str("not-a-uuid").expect_err("invalid");
        assert!(matches!(err, Error::InvalidId(s) if s == "not-a-uuid"));
    }

    #[test]
    fn tender_id_serializes_as_plain_string() {
        let id = TenderId::new();
        let json = serde_json::to_string(&id).expect("json");
        assert_eq!(json, format!("\"{id}\""));
    }

    #[test]
    fn page_window_slices_and_clamps() {
        let items: Vec<u32> = (0..10).collect();
        assert_eq!(Page::new(3, 2).window(items.clone()), vec![2, 3, 4]);
        assert_eq!(Page::new(5, 8).window(items.clone()), vec![8, 9]);
        assert!(Page::new(5, 10).window(items.clone()).is_empty());
        assert!(Page::new(5, 42).window(items.clone()).is_empty());
        assert!(Page::new(0, 0).window(items).is_empty());
    }
}
