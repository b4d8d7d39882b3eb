//! Session record persisted in durable client storage.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{RecordId, Role, User};

/// Storage key holding the [`Session`] record.
pub const USER_SESSION_KEY: &str = "userSession";
/// Storage key holding the logged-in [`User`].
pub const USER_DATA_KEY: &str = "userData";
/// Storage key holding the opaque session token.
pub const AUTH_TOKEN_KEY: &str = "authToken";

/// The durable record identifying who is logged in and since when.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: RecordId,
    pub email: String,
    pub role: Role,
    pub login_time: DateTime<Utc>,
}

impl Session {
    pub fn for_user(user: &User, login_time: DateTime<Utc>) -> Self {
        Self {
            user_id: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
            login_time,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.login_time >= ttl
    }
}
