//! Session handling and the explicitly constructed dashboard context.
//!
//! Login, logout and token refresh belong to an external provider. The
//! dashboard only cares whether a session exists, and hands that session to
//! every API client it builds from a [`DashboardContext`].
use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use voicebench_core::TrackedEntity;
use voicebench_logging::{vb_info, vb_warn};

use crate::{ApiError, ApiSettings, FailureKind, HttpResourceApi};

#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub user_email: Option<String>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field("user_email", &self.user_email)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    SignedOut,
    SignedIn(Session),
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::SignedIn(_))
    }
}

#[async_trait::async_trait]
pub trait SessionProvider: Send + Sync {
    async fn get_session(&self) -> Result<Option<Session>, ApiError>;
    /// Receives every auth state change.
    fn subscribe(&self) -> watch::Receiver<AuthState>;
    async fn sign_out(&self) -> Result<(), ApiError>;
}

/// Provider backed by a pre-issued access token.
pub struct StaticSessionProvider {
    state: watch::Sender<AuthState>,
}

impl StaticSessionProvider {
    pub fn new(session: Option<Session>) -> Self {
        let initial = match session {
            Some(session) => AuthState::SignedIn(session),
            None => AuthState::SignedOut,
        };
        let (state, _) = watch::channel(initial);
        Self { state }
    }

    pub fn from_token(access_token: impl Into<String>) -> Self {
        Self::new(Some(Session {
            access_token: access_token.into(),
            user_email: None,
        }))
    }
}

#[async_trait::async_trait]
impl SessionProvider for StaticSessionProvider {
    async fn get_session(&self) -> Result<Option<Session>, ApiError> {
        Ok(match &*self.state.borrow() {
            AuthState::SignedIn(session) => Some(session.clone()),
            AuthState::SignedOut => None,
        })
    }

    fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    async fn sign_out(&self) -> Result<(), ApiError> {
        self.state.send_replace(AuthState::SignedOut);
        Ok(())
    }
}

/// Everything a mounted view needs to talk to the backend.
///
/// Built once by `init` when the dashboard starts and released by
/// `teardown`; nothing here is global.
pub struct DashboardContext {
    provider: Arc<dyn SessionProvider>,
    settings: ApiSettings,
    session: Session,
    client: reqwest::Client,
    auth: watch::Receiver<AuthState>,
}

impl DashboardContext {
    pub async fn init(
        provider: Arc<dyn SessionProvider>,
        settings: ApiSettings,
    ) -> Result<Self, ApiError> {
        let session = provider.get_session().await?.ok_or_else(|| {
            ApiError::new(FailureKind::NotAuthenticated, "no active session")
        })?;
        let client = settings.build_client()?;
        let auth = provider.subscribe();
        vb_info!(
            "dashboard context ready org={} user={:?}",
            settings.organization_id,
            session.user_email
        );
        Ok(Self {
            provider,
            settings,
            session,
            client,
            auth,
        })
    }

    pub fn settings(&self) -> &ApiSettings {
        &self.settings
    }

    pub fn organization_id(&self) -> &str {
        &self.settings.organization_id
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.borrow().is_authenticated()
    }

    /// Fires whenever the provider signs in or out.
    pub fn auth_changes(&self) -> watch::Receiver<AuthState> {
        self.auth.clone()
    }

    pub fn api<E: TrackedEntity>(&self) -> HttpResourceApi<E> {
        HttpResourceApi::new(self.client.clone(), self.settings.clone(), self.session.clone())
    }

    /// Releases the context, optionally ending the session too.
    pub async fn teardown(self, sign_out: bool) -> Result<(), ApiError> {
        if sign_out {
            if let Err(err) = self.provider.sign_out().await {
                vb_warn!("sign out failed: {}", err);
                return Err(err);
            }
        }
        vb_info!("dashboard context released org={}", self.settings.organization_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn settings() -> ApiSettings {
        ApiSettings::new(Url::parse("http://localhost:8000").unwrap(), "org-1")
    }

    #[tokio::test]
    async fn init_requires_a_session() {
        let provider = Arc::new(StaticSessionProvider::new(None));
        let err = DashboardContext::init(provider, settings())
            .await
            .err()
            .expect("should refuse");
        assert_eq!(err.kind, FailureKind::NotAuthenticated);
    }

    #[tokio::test]
    async fn sign_out_is_observed_by_the_context() {
        let provider = Arc::new(StaticSessionProvider::from_token("tok"));
        let context = DashboardContext::init(provider.clone(), settings())
            .await
            .unwrap();
        let mut changes = context.auth_changes();
        assert!(context.is_authenticated());

        provider.sign_out().await.unwrap();
        changes.changed().await.unwrap();
        assert!(!changes.borrow().is_authenticated());
        assert!(!context.is_authenticated());
        context.teardown(false).await.unwrap();
    }

    #[test]
    fn session_debug_hides_token() {
        let session = Session {
            access_token: "secret".into(),
            user_email: Some("qa@example.com".into()),
        };
        assert!(!format!("{session:?}").contains("secret"));
    }
}
