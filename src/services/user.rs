//! User service
//!
//! Registration (the first account becomes admin), login/logout against
//! database-backed sessions, and profile edits.

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{ProfileInput, RegisterInput, Session, User, UserRole};
use crate::services::error::FieldErrors;
use crate::services::password::{hash_password, verify_password};
use anyhow::Context;
use chrono::{Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

/// Default session lifetime in days
pub const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 14;

const USERNAME_MAX_LEN: usize = 150;
const PASSWORD_MIN_LEN: usize = 8;

static USERNAME_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[\w.@+-]+$").ok());

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Wrong username or password
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// Form input rejected
    #[error("Validation error: {0}")]
    ValidationError(FieldErrors),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Login form input
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

/// User service for managing users and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_expiration_days: i64,
}

impl UserService {
    pub fn new(user_repo: Arc<dyn UserRepository>, session_repo: Arc<dyn SessionRepository>) -> Self {
        Self::with_session_expiration(user_repo, session_repo, DEFAULT_SESSION_EXPIRATION_DAYS)
    }

    pub fn with_session_expiration(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        session_expiration_days: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_expiration_days,
        }
    }

    /// Session lifetime, also used as the cookie max-age
    pub fn session_lifetime(&self) -> Duration {
        Duration::days(self.session_expiration_days)
    }

    /// Register a new user.
    ///
    /// The first account ever created gets [`UserRole::Admin`].
    pub async fn register(&self, input: RegisterInput) -> Result<User, UserServiceError> {
        let username = input.username.trim().to_string();
        let mut errors = FieldErrors::new();
        validate_username(&username, &mut errors);
        validate_email(&input.email, &mut errors);
        validate_password(&input.password, &input.password_confirm, &mut errors);

        if !errors.contains("username") && self.username_taken(&username, None).await? {
            errors.add("username", "A user with that username already exists.");
        }
        if !errors.is_empty() {
            return Err(UserServiceError::ValidationError(errors));
        }

        let role = if self.is_first_user().await? {
            UserRole::Admin
        } else {
            UserRole::Author
        };
        let password_hash = hash_password(&input.password)?;
        let user = User::new(username, input.email.trim().to_string(), password_hash, role);

        let created = self
            .user_repo
            .create(&user)
            .await
            .context("Failed to create user")?;

        tracing::info!(user_id = created.id, username = %created.username, role = %created.role, "User registered");
        Ok(created)
    }

    /// Check credentials and open a session
    pub async fn login(&self, input: LoginInput) -> Result<Session, UserServiceError> {
        let invalid = || {
            UserServiceError::AuthenticationError(
                "Please enter a correct username and password.".to_string(),
            )
        };

        let user = self
            .user_repo
            .get_by_username(input.username.trim())
            .await
            .context("Failed to look up user")?
            .ok_or_else(invalid)?;

        if !verify_password(&input.password, &user.password_hash)
            .context("Failed to verify password")?
        {
            tracing::debug!(username = %user.username, "Rejected login");
            return Err(invalid());
        }

        self.start_session(user.id).await
    }

    /// Open a session for an already authenticated user
    pub async fn start_session(&self, user_id: i64) -> Result<Session, UserServiceError> {
        let session = Session::start(user_id, self.session_lifetime());
        let session = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;
        Ok(session)
    }

    /// Delete the session behind `token`
    pub async fn logout(&self, token: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(token)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Resolve a session token to its user.
    ///
    /// Unknown and expired tokens yield `None`; expired ones are deleted.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let Some(session) = self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        else {
            return Ok(None);
        };

        if session.is_expired() {
            self.session_repo
                .delete(token)
                .await
                .context("Failed to delete expired session")?;
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;
        Ok(user)
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, UserServiceError> {
        let user = self
            .user_repo
            .get_by_username(username)
            .await
            .context("Failed to get user by username")?;
        Ok(user)
    }

    /// Edit the viewer's own username, names and email
    pub async fn update_profile(
        &self,
        viewer: &User,
        input: ProfileInput,
    ) -> Result<User, UserServiceError> {
        let username = input.username.trim().to_string();
        let mut errors = FieldErrors::new();
        validate_username(&username, &mut errors);
        validate_email(&input.email, &mut errors);
        if input.first_name.chars().count() > USERNAME_MAX_LEN {
            errors.add("first_name", "Ensure this value has at most 150 characters.");
        }
        if input.last_name.chars().count() > USERNAME_MAX_LEN {
            errors.add("last_name", "Ensure this value has at most 150 characters.");
        }
        if !errors.contains("username") && self.username_taken(&username, Some(viewer.id)).await? {
            errors.add("username", "A user with that username already exists.");
        }
        if !errors.is_empty() {
            return Err(UserServiceError::ValidationError(errors));
        }

        let user = User {
            username,
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            email: input.email.trim().to_string(),
            updated_at: Utc::now(),
            ..viewer.clone()
        };
        let updated = self
            .user_repo
            .update_profile(&user)
            .await
            .context("Failed to update profile")?;
        Ok(updated)
    }

    /// True while no account exists
    pub async fn is_first_user(&self) -> Result<bool, UserServiceError> {
        let count = self
            .user_repo
            .count()
            .await
            .context("Failed to count users")?;
        Ok(count == 0)
    }

    /// Delete all expired sessions, returning how many were removed
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        let count = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;
        Ok(count)
    }

    // ========================================================================
    // Private helper methods
    // ========================================================================

    async fn username_taken(
        &self,
        username: &str,
        except_id: Option<i64>,
    ) -> Result<bool, UserServiceError> {
        let existing = self
            .user_repo
            .get_by_username(username)
            .await
            .context("Failed to check username")?;
        Ok(existing.is_some_and(|user| Some(user.id) != except_id))
    }
}

fn validate_username(username: &str, errors: &mut FieldErrors) {
    if username.is_empty() {
        errors.add("username", "This field is required.");
    } else if username.chars().count() > USERNAME_MAX_LEN {
        errors.add("username", "Ensure this value has at most 150 characters.");
    } else if !USERNAME_RE.as_ref().is_some_and(|re| re.is_match(username)) {
        errors.add(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }
}

fn validate_email(email: &str, errors: &mut FieldErrors) {
    let email = email.trim();
    if email.is_empty() {
        return;
    }
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.starts_with('.'));
    if !valid {
        errors.add("email", "Enter a valid email address.");
    }
}

fn validate_password(password: &str, confirm: &str, errors: &mut FieldErrors) {
    if password.is_empty() {
        errors.add("password", "This field is required.");
        return;
    }
    if password.chars().count() < PASSWORD_MIN_LEN {
        errors.add(
            "password",
            "This password is too short. It must contain at least 8 characters.",
        );
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        errors.add("password", "This password is entirely numeric.");
    }
    if password != confirm {
        errors.add("password_confirm", "The two password fields didn't match.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::migrated_pool;
    use crate::db::repositories::{SqlxSessionRepository, SqlxUserRepository};

    async fn setup() -> UserService {
        let pool = migrated_pool().await;
        UserService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool),
        )
    }

    fn register_input(username: &str) -> RegisterInput {
        RegisterInput {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password: "long-enough-pw".to_string(),
            password_confirm: "long-enough-pw".to_string(),
        }
    }

    #[tokio::test]
    async fn test_first_user_becomes_admin() {
        let service = setup().await;
        assert!(service.is_first_user().await.unwrap());

        let first = service.register(register_input("alice")).await.unwrap();
        let second = service.register(register_input("bob")).await.unwrap();

        assert_eq!(first.role, UserRole::Admin);
        assert_eq!(second.role, UserRole::Author);
        assert!(!service.is_first_user().await.unwrap());
    }

    #[tokio::test]
    async fn test_register_validation() {
        let service = setup().await;
        service.register(register_input("alice")).await.unwrap();

        let input = RegisterInput {
            username: "alice".into(),
            email: "not-an-email".into(),
            password: "1234".into(),
            password_confirm: "4321".into(),
        };
        let Err(UserServiceError::ValidationError(errors)) = service.register(input).await else {
            panic!("expected validation error");
        };
        assert!(errors.contains("username"));
        assert!(errors.contains("email"));
        assert!(errors.contains("password"));
        assert!(errors.contains("password_confirm"));

        let mut bad_name = register_input("has space");
        bad_name.email = String::new();
        assert!(matches!(
            service.register(bad_name).await,
            Err(UserServiceError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_login_validate_logout() {
        let service = setup().await;
        let user = service.register(register_input("alice")).await.unwrap();

        let wrong = service
            .login(LoginInput {
                username: "alice".into(),
                password: "nope".into(),
            })
            .await;
        assert!(matches!(wrong, Err(UserServiceError::AuthenticationError(_))));

        let unknown = service
            .login(LoginInput {
                username: "nobody".into(),
                password: "long-enough-pw".into(),
            })
            .await;
        assert!(matches!(unknown, Err(UserServiceError::AuthenticationError(_))));

        let session = service
            .login(LoginInput {
                username: "alice".into(),
                password: "long-enough-pw".into(),
            })
            .await
            .unwrap();
        let resolved = service.validate_session(&session.id).await.unwrap().unwrap();
        assert_eq!(resolved.id, user.id);

        service.logout(&session.id).await.unwrap();
        assert!(service.validate_session(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_session_is_anonymous() {
        let pool = migrated_pool().await;
        let service = UserService::with_session_expiration(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool),
            -1,
        );
        let user = service.register(register_input("alice")).await.unwrap();
        let session = service.start_session(user.id).await.unwrap();

        assert!(service.validate_session(&session.id).await.unwrap().is_none());
        assert_eq!(service.cleanup_expired_sessions().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_profile() {
        let service = setup().await;
        let alice = service.register(register_input("alice")).await.unwrap();
        service.register(register_input("bob")).await.unwrap();

        let taken = ProfileInput {
            username: "bob".into(),
            ..ProfileInput::from(&alice)
        };
        assert!(matches!(
            service.update_profile(&alice, taken).await,
            Err(UserServiceError::ValidationError(_))
        ));

        let input = ProfileInput {
            username: "alice.w".into(),
            first_name: "Alice".into(),
            last_name: "Wonder".into(),
            email: "alice@wonder.land".into(),
        };
        let updated = service.update_profile(&alice, input).await.unwrap();
        assert_eq!(updated.username, "alice.w");
        assert_eq!(updated.display_name(), "Alice Wonder");

        // Keeping one's own username is not a conflict
        let same = ProfileInput::from(&updated);
        assert!(service.update_profile(&updated, same).await.is_ok());
    }

    #[test]
    fn test_username_pattern() {
        for ok in ["alice", "a.b", "x@y", "p+q", "under_score", "dash-ed", "Юзер"] {
            let mut errors = FieldErrors::new();
            validate_username(ok, &mut errors);
            assert!(errors.is_empty(), "{} should be valid", ok);
        }
        for bad in ["", "sp ace", "semi;colon", &"a".repeat(151)] {
            let mut errors = FieldErrors::new();
            validate_username(bad, &mut errors);
            assert!(errors.contains("username"), "{:?} should be invalid", bad);
        }
    }
}
