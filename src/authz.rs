use uuid::Uuid;

use crate::error::ApiError;

/// Outcome of an ownership check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(&'static str),
}

pub const NOT_OWNER: &str = "NOT_OWNER";

/// Decides whether `requester_id` may mutate a resource owned by
/// `resource_owner_id`. Exact identifier equality only: there is no role
/// hierarchy and no admin override in this design.
pub fn authorize(requester_id: Uuid, resource_owner_id: Uuid) -> Decision {
    if requester_id == resource_owner_id {
        Decision::Allow
    } else {
        Decision::Deny(NOT_OWNER)
    }
}

impl Decision {
    /// Turns a denial into the 401 the caller shows the user.
    pub fn require(self, message: &str) -> Result<(), ApiError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(_) => Err(ApiError::unauthorized(message)),
        }
    }
}
