//! User collection service.

use chrono::{Duration, Utc};

use super::validation::{is_valid_email, parse_date, validate_new_user, validate_password};
use super::{ApiClient, Resource, ResourceService};
use crate::auth::password::hash_password;
use crate::errors::{AppError, AppResult};
use crate::models::{Enrollment, NewUser, RecordId, Role, UpdateUserRequest, User, UserStats};

impl Resource for User {
    const COLLECTION: &'static str = "users";

    fn id(&self) -> &RecordId {
        &self.id
    }
}

/// CRUD and derived queries over `users`.
#[derive(Debug, Clone)]
pub struct UserService {
    users: ResourceService<User>,
    enrollments: ResourceService<Enrollment>,
}

impl UserService {
    pub fn new(client: ApiClient) -> Self {
        Self {
            users: ResourceService::new(client.clone()),
            enrollments: ResourceService::new(client),
        }
    }

    pub async fn all(&self) -> AppResult<Vec<User>> {
        self.users.list(&[]).await
    }

    pub async fn get(&self, id: &RecordId) -> AppResult<User> {
        self.users.get_by_id(id).await
    }

    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        self.users.find_one(&[("email", email)]).await
    }

    /// Create a user after validating fields and checking the email is unused.
    ///
    /// The duplicate check is a list-then-create sequence and is not atomic.
    pub async fn create(&self, new_user: &NewUser) -> AppResult<User> {
        validate_new_user(new_user)?;

        if !self.is_email_available(&new_user.email, None).await? {
            return Err(AppError::Conflict(
                "Email is already registered".to_string(),
            ));
        }

        let mut body = new_user.clone();
        body.password = hash_password(&new_user.password)?;

        self.users.create(&body).await
    }

    pub async fn update(&self, id: &RecordId, request: &UpdateUserRequest) -> AppResult<User> {
        let mut body = request.clone();

        if let Some(email) = &request.email {
            if !is_valid_email(email) {
                return Err(AppError::Validation("Email format is not valid".to_string()));
            }
            if !self.is_email_available(email, Some(id)).await? {
                return Err(AppError::Conflict(
                    "Email is already registered".to_string(),
                ));
            }
        }

        if let Some(password) = &request.password {
            validate_password(password)?;
            body.password = Some(hash_password(password)?);
        }

        self.users.patch(id, &body).await
    }

    /// Delete a user. Refused while the user still has enrollments.
    pub async fn delete(&self, id: &RecordId) -> AppResult<bool> {
        let user_id = id.as_string();
        let enrollments = self.enrollments.list(&[("userId", &user_id)]).await?;
        if !enrollments.is_empty() {
            return Err(AppError::Conflict(
                "Cannot delete a user with active enrollments".to_string(),
            ));
        }
        self.users.delete(id).await
    }

    pub async fn by_role(&self, role: Role) -> AppResult<Vec<User>> {
        let users = self.users.list(&[("role", role.as_str())]).await?;
        Ok(users.into_iter().filter(|u| u.role == role).collect())
    }

    pub async fn admins(&self) -> AppResult<Vec<User>> {
        self.by_role(Role::Admin).await
    }

    pub async fn visitors(&self) -> AppResult<Vec<User>> {
        self.by_role(Role::Visitor).await
    }

    pub async fn change_role(&self, id: &RecordId, role: Role) -> AppResult<User> {
        let request = UpdateUserRequest {
            role: Some(role),
            ..Default::default()
        };
        let user = self.users.patch(id, &request).await?;
        tracing::info!("Role of user {} changed to {}", id, role);
        Ok(user)
    }

    /// True when no other user holds `email`. `exclude` skips the user being edited.
    pub async fn is_email_available(
        &self,
        email: &str,
        exclude: Option<&RecordId>,
    ) -> AppResult<bool> {
        let users = self.users.list(&[("email", email)]).await?;
        Ok(users
            .iter()
            .filter(|u| u.email == email)
            .all(|u| Some(&u.id) == exclude))
    }

    pub async fn stats(&self) -> AppResult<UserStats> {
        let users = self.all().await?;
        let cutoff = Utc::now().date_naive() - Duration::days(30);

        Ok(UserStats {
            total: users.len(),
            admins: users.iter().filter(|u| u.role == Role::Admin).count(),
            visitors: users.iter().filter(|u| u.role == Role::Visitor).count(),
            recent_users: users
                .iter()
                .filter_map(|u| u.date_of_admission.as_deref().and_then(parse_date))
                .filter(|date| *date >= cutoff)
                .count(),
        })
    }
}
