//! Authentication Service
//!
//! Account registration and login over the journal repository. Credentials
//! are compared verbatim; this journal deliberately keeps no sessions,
//! tokens, or password hashing.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::domain::journal::{JournalRepository, StorageError, User};

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The email is already registered.
    #[error("email already exists")]
    EmailTaken,

    /// No user matches the supplied email and password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The user store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Registration and login over the user store.
pub struct AuthService {
    repository: Arc<dyn JournalRepository>,
}

impl AuthService {
    /// Create the service over a repository.
    pub fn new(repository: Arc<dyn JournalRepository>) -> Self {
        Self { repository }
    }

    /// Register a new account and return it.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::EmailTaken`] if a user with the email already
    /// exists, or a storage error if the user store fails.
    pub async fn register(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let users = self.repository.users().await?;
        if users.iter().any(|u| u.email == email) {
            return Err(AuthError::EmailTaken);
        }

        let user = User::new(email.to_string(), password.to_string());
        self.repository.save_user(&user).await?;
        info!(user_id = %user.id, "registered new user");
        Ok(user)
    }

    /// Look up the user matching the supplied credentials.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] when no user matches, or a
    /// storage error if the user store fails.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let users = self.repository.users().await?;
        users
            .into_iter()
            .find(|u| u.email == email && u.password == password)
            .ok_or(AuthError::InvalidCredentials)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::infrastructure::storage::{InMemoryKeyValueStore, KvJournalStore};

    fn service() -> AuthService {
        let store = Arc::new(InMemoryKeyValueStore::new());
        AuthService::new(Arc::new(KvJournalStore::new(store)))
    }

    #[tokio::test]
    async fn register_then_login() {
        let auth = service();

        let registered = auth.register("trader@example.com", "secret").await.unwrap();
        let logged_in = auth.login("trader@example.com", "secret").await.unwrap();
        assert_eq!(registered.id, logged_in.id);
    }

    #[tokio::test]
    async fn register_rejects_duplicate_email() {
        let auth = service();
        auth.register("trader@example.com", "secret").await.unwrap();

        let err = auth
            .register("trader@example.com", "other")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailTaken));
    }

    #[tokio::test]
    async fn login_rejects_wrong_password() {
        let auth = service();
        auth.register("trader@example.com", "secret").await.unwrap();

        let err = auth.login("trader@example.com", "wrong").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn login_rejects_unknown_email() {
        let auth = service();
        let err = auth.login("nobody@example.com", "secret").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }
}
