//! User and login models.

use serde::{Deserialize, Serialize};

/// The authenticated user's profile as the backend returns it. The id is
/// backend-assigned and absent from older stored profiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub email: String,
    pub milestone: String,
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Payload of a successful `POST /login`, already unwrapped from the
/// `{ "data": … }` envelope.
#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    pub access_token: String,
    pub user: User,
}
