use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// User Read Model
// ============================================================================
//
// The order core only needs enough of a user to address notifications.
// Account management lives elsewhere.
//
// ============================================================================

pub type UserId = Uuid;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Option<String>,
}

impl User {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: Some(email.into()),
        }
    }
}
