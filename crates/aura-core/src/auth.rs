//! Authentication collaborator.
//!
//! The dashboard has no real identity provider; [`MockAuthProvider`] stands in
//! for one, with simulated latency and a sentinel account that always fails.

use std::time::Duration;

use thiserror::Error;

use crate::config::AuthConfig;
use crate::model::{Credentials, UserProfile};

/// Email that the stub provider always rejects.
pub const FAILING_EMAIL: &str = "fail@test.com";

/// Message shown verbatim when credentials are rejected.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid email or password.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Rejected by the provider. The message is shown to the user as-is.
    #[error("{0}")]
    InvalidCredentials(String),

    #[error("Email and password are required.")]
    MissingCredentials,

    #[error("Authentication service unavailable: {0}")]
    Unavailable(String),
}

/// External authentication service.
pub trait AuthProvider: Send + Sync {
    fn login(
        &self,
        credentials: &Credentials,
    ) -> impl std::future::Future<Output = Result<UserProfile, AuthError>> + Send;

    fn register(
        &self,
        credentials: &Credentials,
    ) -> impl std::future::Future<Output = Result<UserProfile, AuthError>> + Send;

    /// End the remote session.
    fn logout(&self) -> impl std::future::Future<Output = Result<(), AuthError>> + Send;
}

/// Stub provider with fixed profiles.
#[derive(Debug, Clone)]
pub struct MockAuthProvider {
    login_latency: Duration,
    register_latency: Duration,
    logout_latency: Duration,
    /// When set, the remote end-session call fails with this reason.
    logout_failure: Option<String>,
}

impl MockAuthProvider {
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            login_latency: Duration::from_millis(config.login_latency_ms),
            register_latency: Duration::from_millis(config.register_latency_ms),
            logout_latency: Duration::from_millis(config.logout_latency_ms),
            logout_failure: None,
        }
    }

    /// Simulate an unreachable end-session endpoint.
    pub fn with_failing_logout(mut self, reason: impl Into<String>) -> Self {
        self.logout_failure = Some(reason.into());
        self
    }

    /// Provider without simulated latency.
    pub fn instant() -> Self {
        Self::from_config(&AuthConfig::instant())
    }
}

async fn simulate_latency(latency: Duration) {
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }
}

impl AuthProvider for MockAuthProvider {
    async fn login(&self, credentials: &Credentials) -> Result<UserProfile, AuthError> {
        simulate_latency(self.login_latency).await;

        if credentials.email == FAILING_EMAIL {
            return Err(AuthError::InvalidCredentials(
                INVALID_CREDENTIALS_MESSAGE.to_string(),
            ));
        }

        Ok(UserProfile {
            uid: "user_12345".to_string(),
            email: credentials.email.clone(),
            display_name: Some("Alex Doe".to_string()),
            photo_url: Some("https://picsum.photos/200".to_string()),
        })
    }

    async fn register(&self, credentials: &Credentials) -> Result<UserProfile, AuthError> {
        simulate_latency(self.register_latency).await;
        Ok(UserProfile {
            uid: "user_new_67890".to_string(),
            email: credentials.email.clone(),
            display_name: Some("New User".to_string()),
            photo_url: None,
        })
    }

    async fn logout(&self) -> Result<(), AuthError> {
        simulate_latency(self.logout_latency).await;
        match &self.logout_failure {
            Some(reason) => Err(AuthError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }
}
