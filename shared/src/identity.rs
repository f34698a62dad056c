use serde::{Serialize, Deserialize};
use uuid::Uuid;
use crate::models::User;

/// The principal resolved from a bearer token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: Uuid,
    pub username: String,
    pub is_admin: bool,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.is_admin
    }
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            is_admin: user.is_admin,
        }
    }
}
