//! Session store.
//!
//! Keeps the logged-in user in durable client storage under fixed keys and answers
//! "who is logged in" queries for the router and the views. Expiry is checked lazily on
//! read; there is no timer.

pub mod password;

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::de::DeserializeOwned;

use crate::api::validation::{validate_login, validate_password};
use crate::api::UserService;
use crate::errors::{AppError, AppResult};
use crate::models::{
    NewUser, Role, Session, UpdateUserRequest, User, AUTH_TOKEN_KEY, USER_DATA_KEY,
    USER_SESSION_KEY,
};
use crate::storage::Storage;
use password::verify_password;

/// Session store plus the account operations that create or change a session.
#[derive(Clone)]
pub struct AuthService {
    storage: Arc<dyn Storage>,
    users: UserService,
    session_ttl: Duration,
}

impl AuthService {
    pub fn new(storage: Arc<dyn Storage>, users: UserService, session_ttl_hours: i64) -> Self {
        Self {
            storage,
            users,
            session_ttl: Duration::hours(session_ttl_hours),
        }
    }

    /// The stored session record, if present and not expired.
    ///
    /// An expired session is cleared as a side effect. Unreadable records count as
    /// absent.
    pub fn session(&self) -> Option<Session> {
        let session: Session = self.read_json(USER_SESSION_KEY)?;
        if session.is_expired(Utc::now(), self.session_ttl) {
            tracing::info!("Session of user {} expired", session.user_id);
            self.logout();
            return None;
        }
        Some(session)
    }

    /// The logged-in user, or `None` when there is no valid session.
    pub fn current_user(&self) -> Option<User> {
        let session = self.session()?;
        let user: User = self.read_json(USER_DATA_KEY)?;
        if user.id != session.user_id {
            tracing::warn!("Session and user data disagree, ignoring session");
            return None;
        }
        Some(user)
    }

    pub fn token(&self) -> Option<String> {
        self.session()?;
        self.storage.get(AUTH_TOKEN_KEY)
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.current_user().is_some_and(|u| u.role == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    pub fn is_visitor(&self) -> bool {
        self.has_role(Role::Visitor)
    }

    /// Look the user up by email and start a session on a password match.
    ///
    /// Unknown email and wrong password are both reported as `InvalidCredentials`.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<User> {
        validate_login(email, password)?;

        let user = self
            .users
            .find_by_email(email)
            .await?
            .filter(|u| u.email == email && verify_password(password, &u.password))
            .ok_or_else(|| {
                tracing::info!("Failed login attempt for {}", email);
                AppError::InvalidCredentials("Invalid email or password".to_string())
            })?;

        self.create_session(&user)?;
        tracing::info!("User {} logged in as {}", user.id, user.role);
        Ok(user)
    }

    /// Clear every session key. Safe to call when nobody is logged in.
    pub fn logout(&self) {
        for key in [USER_SESSION_KEY, USER_DATA_KEY, AUTH_TOKEN_KEY] {
            if let Err(e) = self.storage.remove(key) {
                tracing::error!("Failed to clear {}: {}", key, e);
            }
        }
    }

    /// Register a new visitor account. Does not log the user in.
    pub async fn register(&self, new_user: &NewUser) -> AppResult<User> {
        let mut body = new_user.clone();
        body.role = Role::Visitor;
        body.date_of_admission = Some(Utc::now().date_naive().format("%Y-%m-%d").to_string());

        let user = self.users.create(&body).await?;
        tracing::info!("Registered user {} <{}>", user.id, user.email);
        Ok(user)
    }

    /// Patch the logged-in user and refresh the stored session and copy.
    ///
    /// Roles are not self-service; they change only through `UserService::change_role`.
    pub async fn update_current_user(&self, request: &UpdateUserRequest) -> AppResult<User> {
        if request.role.is_some() {
            return Err(AppError::Validation(
                "Role cannot be changed from the profile".to_string(),
            ));
        }
        let session = self
            .session()
            .ok_or_else(|| AppError::InvalidCredentials("No user is logged in".to_string()))?;
        let current = self.require_user()?;

        let updated = self.users.update(&current.id, request).await?;

        self.write_json(
            USER_SESSION_KEY,
            &Session::for_user(&updated, session.login_time),
        )?;
        self.write_json(USER_DATA_KEY, &stored_copy(&updated))?;
        Ok(updated)
    }

    /// Change the logged-in user's password after checking the current one.
    pub async fn change_password(&self, current_password: &str, new_password: &str) -> AppResult<()> {
        let current = self.require_user()?;
        // The stored copy carries no password; check against the store.
        let fresh = self.users.get(&current.id).await?;
        if !verify_password(current_password, &fresh.password) {
            return Err(AppError::InvalidCredentials(
                "Current password is incorrect".to_string(),
            ));
        }
        validate_password(new_password)?;

        let request = UpdateUserRequest {
            password: Some(new_password.to_string()),
            ..Default::default()
        };
        self.update_current_user(&request).await?;
        tracing::info!("Password changed for user {}", current.id);
        Ok(())
    }

    fn require_user(&self) -> AppResult<User> {
        self.current_user()
            .ok_or_else(|| AppError::InvalidCredentials("No user is logged in".to_string()))
    }

    fn create_session(&self, user: &User) -> AppResult<()> {
        let session = Session::for_user(user, Utc::now());
        self.write_json(USER_SESSION_KEY, &session)?;
        self.write_json(USER_DATA_KEY, &stored_copy(user))?;
        self.storage
            .set(AUTH_TOKEN_KEY, &uuid::Uuid::new_v4().to_string())?;
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.storage.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Ignoring unreadable {}: {}", key, e);
                None
            }
        }
    }

    fn write_json<T: serde::Serialize>(&self, key: &str, value: &T) -> AppResult<()> {
        self.storage.set(key, &serde_json::to_string(value)?)
    }
}

/// The user as kept in client storage: everything but the password.
fn stored_copy(user: &User) -> User {
    User {
        password: String::new(),
        ..user.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiClient;
    use crate::models::RecordId;
    use crate::storage::MemoryStorage;

    fn service(storage: Arc<MemoryStorage>) -> AuthService {
        // Nothing listens here; these tests never reach the network.
        let client = ApiClient::new("http://127.0.0.1:9", std::time::Duration::from_secs(1)).unwrap();
        AuthService::new(storage, UserService::new(client), 24)
    }

    fn admin() -> User {
        User {
            id: RecordId::Int(1),
            name: "Admin".to_string(),
            email: "a@x.com".to_string(),
            password: "p".to_string(),
            role: Role::Admin,
            phone: None,
            enroll_number: None,
            date_of_admission: None,
        }
    }

    #[test]
    fn test_session_roundtrip() {
        let storage = Arc::new(MemoryStorage::new());
        let auth = service(storage.clone());

        assert!(auth.current_user().is_none());
        auth.create_session(&admin()).unwrap();

        let user = auth.current_user().unwrap();
        assert_eq!(user.id, RecordId::Int(1));
        assert!(user.password.is_empty());
        assert!(auth.is_authenticated());
        assert!(auth.is_admin());
        assert!(!auth.is_visitor());
        assert!(auth.token().is_some());
    }

    #[test]
    fn test_expired_session_is_cleared() {
        let storage = Arc::new(MemoryStorage::new());
        let auth = service(storage.clone());
        auth.create_session(&admin()).unwrap();

        let stale = Session::for_user(&admin(), Utc::now() - Duration::hours(25));
        storage
            .set(USER_SESSION_KEY, &serde_json::to_string(&stale).unwrap())
            .unwrap();

        assert!(auth.current_user().is_none());
        assert!(storage.get(USER_SESSION_KEY).is_none());
        assert!(storage.get(USER_DATA_KEY).is_none());
        assert!(storage.get(AUTH_TOKEN_KEY).is_none());
    }

    #[test]
    fn test_corrupt_session_fails_open() {
        let storage = Arc::new(MemoryStorage::new());
        let auth = service(storage.clone());
        auth.create_session(&admin()).unwrap();
        storage.set(USER_SESSION_KEY, "{not json").unwrap();

        assert!(auth.current_user().is_none());
        assert!(!auth.is_authenticated());
        assert!(!auth.has_role(Role::Admin));
    }

    #[test]
    fn test_logout_is_idempotent() {
        let storage = Arc::new(MemoryStorage::new());
        let auth = service(storage.clone());

        auth.logout();
        auth.create_session(&admin()).unwrap();
        auth.logout();
        auth.logout();

        assert!(auth.current_user().is_none());
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_login_rejects_malformed_input_before_network() {
        let auth = service(Arc::new(MemoryStorage::new()));
        let err = auth.login("not-an-email", "p").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
