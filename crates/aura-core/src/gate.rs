//! Session gate: authentication state and the views it unlocks.
//!
//! Route resolution is a pure function of [`SessionState`]; [`SessionGate`]
//! owns that state, keeps it in sync with the persisted flag, and performs
//! the login/logout transitions through an [`AuthProvider`].

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;

use crate::auth::{AuthError, AuthProvider};
use crate::model::{Credentials, SessionState, UserProfile};
use crate::store::{KeyValueStore, AUTH_FLAG_KEY};

/// The fixed set of views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Login,
    Dashboard,
    Assistant,
    Vitals,
}

/// Where unknown paths and signed-in visits to the login page land.
pub const DEFAULT_ROUTE: Route = Route::Dashboard;

impl Route {
    pub const ALL: [Route; 4] = [
        Route::Login,
        Route::Dashboard,
        Route::Assistant,
        Route::Vitals,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::Dashboard => "/",
            Self::Assistant => "/assistant",
            Self::Vitals => "/vitals",
        }
    }

    /// Map a request path to a route. Trailing slashes are ignored.
    pub fn from_path(path: &str) -> Option<Self> {
        let trimmed = path.trim_end_matches('/');
        let normalized = if trimmed.is_empty() { "/" } else { trimmed };
        Self::ALL.into_iter().find(|r| r.path() == normalized)
    }

    /// Every view except the login page requires a session.
    pub fn is_protected(&self) -> bool {
        !matches!(self, Self::Login)
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Login => "Sign in",
            Self::Dashboard => "Summary",
            Self::Assistant => "Assistant",
            Self::Vitals => "Vitals",
        }
    }
}

/// Outcome of resolving a request against the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Render(Route),
    Redirect(Route),
}

pub fn can_access(state: &SessionState, route: Route) -> bool {
    match route {
        Route::Login => !state.authenticated,
        _ => state.authenticated,
    }
}

pub fn resolve_route(state: &SessionState, route: Route) -> Navigation {
    if can_access(state, route) {
        Navigation::Render(route)
    } else if route.is_protected() {
        Navigation::Redirect(Route::Login)
    } else {
        Navigation::Redirect(DEFAULT_ROUTE)
    }
}

/// Resolve a raw request path. Unknown paths redirect to the default route.
pub fn resolve_path(state: &SessionState, path: &str) -> Navigation {
    match Route::from_path(path) {
        Some(route) => resolve_route(state, route),
        None => Navigation::Redirect(DEFAULT_ROUTE),
    }
}

/// Follow redirects until a route renders.
pub fn destination(state: &SessionState, path: &str) -> Route {
    let mut nav = resolve_path(state, path);
    // Login and the default route never redirect to each other for the
    // same state, so this settles within two hops.
    for _ in 0..Route::ALL.len() {
        match nav {
            Navigation::Render(route) => return route,
            Navigation::Redirect(route) => nav = resolve_route(state, route),
        }
    }
    Route::Login
}

/// Result of [`SessionGate::logout`]. Local state is cleared in both cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogoutOutcome {
    Clean,
    /// The remote end-session call failed; only the local session was cleared.
    LocalOnly { reason: String },
}

/// Owns the session state for the lifetime of the process.
pub struct SessionGate<S, A> {
    store: S,
    auth: A,
    state: RwLock<SessionState>,
}

impl<S: KeyValueStore, A: AuthProvider> SessionGate<S, A> {
    /// Read the persisted flag and build the gate.
    ///
    /// The gate only exists once this completes, so no route can be resolved
    /// against an indeterminate state. An unreadable store counts as
    /// signed out.
    pub async fn initialize(store: S, auth: A) -> Self {
        let authenticated = match store.get(AUTH_FLAG_KEY).await {
            Ok(value) => value.as_deref() == Some("true"),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read persisted auth flag, starting signed out");
                false
            }
        };
        tracing::info!(authenticated, "session gate initialized");

        let state = if authenticated {
            SessionState::signed_in(None)
        } else {
            SessionState::signed_out()
        };

        Self {
            store,
            auth,
            state: RwLock::new(state),
        }
    }

    pub fn state(&self) -> SessionState {
        self.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().authenticated
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.read().user.clone()
    }

    pub fn can_access(&self, route: Route) -> bool {
        can_access(&self.read(), route)
    }

    pub fn resolve(&self, path: &str) -> Navigation {
        resolve_path(&self.read(), path)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Sign in through the provider. On failure the state is untouched and
    /// the provider's message is returned for display.
    pub async fn login(&self, credentials: &Credentials) -> Result<UserProfile, AuthError> {
        if !credentials.is_complete() {
            return Err(AuthError::MissingCredentials);
        }
        match self.auth.login(credentials).await {
            Ok(user) => {
                self.sign_in(user.clone()).await;
                Ok(user)
            }
            Err(e) => {
                tracing::info!(email = %credentials.email, error = %e, "login rejected");
                Err(e)
            }
        }
    }

    /// Create an account and sign in with it.
    pub async fn register(&self, credentials: &Credentials) -> Result<UserProfile, AuthError> {
        if !credentials.is_complete() {
            return Err(AuthError::MissingCredentials);
        }
        let user = self.auth.register(credentials).await?;
        self.sign_in(user.clone()).await;
        Ok(user)
    }

    /// End the session. The persisted flag and in-memory state are cleared
    /// even when the provider's end-session call fails.
    pub async fn logout(&self) -> LogoutOutcome {
        let outcome = match self.auth.logout().await {
            Ok(()) => LogoutOutcome::Clean,
            Err(e) => {
                tracing::warn!(error = %e, "remote logout failed, clearing local session anyway");
                LogoutOutcome::LocalOnly {
                    reason: e.to_string(),
                }
            }
        };

        if let Err(e) = self.store.remove(AUTH_FLAG_KEY).await {
            tracing::warn!(error = %e, "failed to clear persisted auth flag");
        }
        *self.write() = SessionState::signed_out();
        tracing::info!("signed out");
        outcome
    }

    async fn sign_in(&self, user: UserProfile) {
        if let Err(e) = self.store.set(AUTH_FLAG_KEY, "true").await {
            tracing::warn!(error = %e, "failed to persist auth flag, session will not survive a restart");
        }
        tracing::info!(uid = %user.uid, "signed in");
        *self.write() = SessionState::signed_in(Some(user));
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MockAuthProvider;
    use crate::error::{AuraError, Result};
    use crate::store::MemoryStore;

    fn signed_in() -> SessionState {
        SessionState::signed_in(None)
    }

    #[test]
    fn test_route_paths_roundtrip() {
        for route in Route::ALL {
            assert_eq!(Route::from_path(route.path()), Some(route));
        }
        assert_eq!(Route::from_path("/assistant/"), Some(Route::Assistant));
        assert_eq!(Route::from_path(""), Some(Route::Dashboard));
        assert_eq!(Route::from_path("/settings"), None);
    }

    #[test]
    fn test_signed_out_protected_routes_redirect_to_login() {
        let state = SessionState::signed_out();
        for route in Route::ALL.into_iter().filter(Route::is_protected) {
            assert_eq!(resolve_route(&state, route), Navigation::Redirect(Route::Login));
            assert!(!can_access(&state, route));
        }
        assert_eq!(
            resolve_route(&state, Route::Login),
            Navigation::Render(Route::Login)
        );
    }

    #[test]
    fn test_signed_in_login_redirects_to_default() {
        let state = signed_in();
        assert_eq!(
            resolve_route(&state, Route::Login),
            Navigation::Redirect(DEFAULT_ROUTE)
        );
        for route in Route::ALL.into_iter().filter(Route::is_protected) {
            assert_eq!(resolve_route(&state, route), Navigation::Render(route));
        }
    }

    #[test]
    fn test_unknown_path_redirects_to_default() {
        assert_eq!(
            resolve_path(&SessionState::signed_out(), "/nope"),
            Navigation::Redirect(Route::Dashboard)
        );
        assert_eq!(
            resolve_path(&signed_in(), "/nope"),
            Navigation::Redirect(Route::Dashboard)
        );
    }

    #[test]
    fn test_destination_follows_redirects() {
        let out = SessionState::signed_out();
        assert_eq!(destination(&out, "/nope"), Route::Login);
        assert_eq!(destination(&out, "/vitals"), Route::Login);
        assert_eq!(destination(&signed_in(), "/login"), Route::Dashboard);
        assert_eq!(destination(&signed_in(), "/nope"), Route::Dashboard);
    }

    #[test]
    fn test_resolution_ignores_user_profile() {
        let anonymous = signed_in();
        let named = SessionState::signed_in(Some(UserProfile {
            uid: "u".into(),
            email: "e@x.com".into(),
            display_name: None,
            photo_url: None,
        }));
        for route in Route::ALL {
            assert_eq!(resolve_route(&anonymous, route), resolve_route(&named, route));
        }
    }

    #[tokio::test]
    async fn test_fresh_start_is_signed_out() {
        let gate = SessionGate::initialize(MemoryStore::new(), MockAuthProvider::instant()).await;
        assert!(!gate.is_authenticated());
        assert_eq!(gate.resolve("/"), Navigation::Redirect(Route::Login));
    }

    #[tokio::test]
    async fn test_persisted_flag_restores_session() {
        let store = MemoryStore::new();
        store.set(AUTH_FLAG_KEY, "true").await.unwrap();

        let gate = SessionGate::initialize(store, MockAuthProvider::instant()).await;
        assert!(gate.is_authenticated());
        assert!(gate.current_user().is_none());
        assert_eq!(gate.resolve("/"), Navigation::Render(Route::Dashboard));
    }

    #[tokio::test]
    async fn test_non_true_flag_is_signed_out() {
        let store = MemoryStore::new();
        store.set(AUTH_FLAG_KEY, "yes").await.unwrap();
        let gate = SessionGate::initialize(store, MockAuthProvider::instant()).await;
        assert!(!gate.is_authenticated());
    }

    #[tokio::test]
    async fn test_login_failure_leaves_state_unchanged() {
        let store = MemoryStore::new();
        let gate = SessionGate::initialize(store.clone(), MockAuthProvider::instant()).await;

        let err = gate
            .login(&Credentials::new("fail@test.com", "x"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid email or password.");
        assert!(!gate.is_authenticated());
        assert!(store.get(AUTH_FLAG_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_success_persists_flag() {
        let store = MemoryStore::new();
        let gate = SessionGate::initialize(store.clone(), MockAuthProvider::instant()).await;

        let user = gate.login(&Credentials::new("a@b.com", "x")).await.unwrap();
        assert_eq!(user.email, "a@b.com");
        assert!(gate.is_authenticated());
        assert_eq!(gate.current_user(), Some(user));
        assert_eq!(store.get(AUTH_FLAG_KEY).await.unwrap().as_deref(), Some("true"));
        assert_eq!(gate.resolve("/"), Navigation::Render(Route::Dashboard));
    }

    #[tokio::test]
    async fn test_missing_credentials_skip_provider() {
        let gate = SessionGate::initialize(MemoryStore::new(), MockAuthProvider::instant()).await;
        let err = gate.login(&Credentials::new("", "x")).await.unwrap_err();
        assert_eq!(err, AuthError::MissingCredentials);
        let err = gate.register(&Credentials::new("a@b.com", "")).await.unwrap_err();
        assert_eq!(err, AuthError::MissingCredentials);
        assert!(!gate.is_authenticated());
    }

    #[tokio::test]
    async fn test_register_signs_in() {
        let gate = SessionGate::initialize(MemoryStore::new(), MockAuthProvider::instant()).await;
        let user = gate
            .register(&Credentials::new("new@b.com", "x"))
            .await
            .unwrap();
        assert_eq!(user.uid, "user_new_67890");
        assert!(gate.is_authenticated());
    }

    #[tokio::test]
    async fn test_logout_clears_flag_and_state() {
        let store = MemoryStore::new();
        let gate = SessionGate::initialize(store.clone(), MockAuthProvider::instant()).await;
        gate.login(&Credentials::new("a@b.com", "x")).await.unwrap();

        assert_eq!(gate.logout().await, LogoutOutcome::Clean);
        assert!(!gate.is_authenticated());
        assert!(gate.current_user().is_none());
        assert!(store.get(AUTH_FLAG_KEY).await.unwrap().is_none());
        assert_eq!(gate.resolve("/assistant"), Navigation::Redirect(Route::Login));
    }

    struct FailingLogout;

    impl AuthProvider for FailingLogout {
        async fn login(&self, credentials: &Credentials) -> std::result::Result<UserProfile, AuthError> {
            MockAuthProvider::instant().login(credentials).await
        }

        async fn register(
            &self,
            credentials: &Credentials,
        ) -> std::result::Result<UserProfile, AuthError> {
            MockAuthProvider::instant().register(credentials).await
        }

        async fn logout(&self) -> std::result::Result<(), AuthError> {
            Err(AuthError::Unavailable("end-session endpoint down".into()))
        }
    }

    #[tokio::test]
    async fn test_logout_provider_failure_still_clears_local_session() {
        let store = MemoryStore::new();
        let gate = SessionGate::initialize(store.clone(), FailingLogout).await;
        gate.login(&Credentials::new("a@b.com", "x")).await.unwrap();

        let outcome = gate.logout().await;
        assert!(matches!(outcome, LogoutOutcome::LocalOnly { ref reason } if reason.contains("end-session")));
        assert!(!gate.is_authenticated());
        assert!(store.get(AUTH_FLAG_KEY).await.unwrap().is_none());
    }

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(AuraError::Storage("disk unavailable".into()))
        }

        async fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(AuraError::Storage("disk unavailable".into()))
        }

        async fn remove(&self, _key: &str) -> Result<()> {
            Err(AuraError::Storage("disk unavailable".into()))
        }
    }

    #[tokio::test]
    async fn test_unavailable_store_degrades_to_in_memory_session() {
        let gate = SessionGate::initialize(BrokenStore, MockAuthProvider::instant()).await;
        assert!(!gate.is_authenticated());

        gate.login(&Credentials::new("a@b.com", "x")).await.unwrap();
        assert!(gate.is_authenticated());

        gate.logout().await;
        assert!(!gate.is_authenticated());
    }
}
