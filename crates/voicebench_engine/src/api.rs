use std::marker::PhantomData;
use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;
use voicebench_core::{EntityId, StatusReport, TrackedEntity};
use voicebench_logging::vb_debug;

use crate::auth::Session;
use crate::types::map_reqwest_error;
use crate::{ApiError, FailureKind};

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: Url,
    pub organization_id: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl ApiSettings {
    pub fn new(base_url: Url, organization_id: impl Into<String>) -> Self {
        Self {
            base_url,
            organization_id: organization_id.into(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }

    /// `{base}/organizations/{org}/{segments...}`, with each segment escaped.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|()| {
                ApiError::new(FailureKind::InvalidUrl, "base url cannot have a path")
            })?;
            path.pop_if_empty()
                .push("organizations")
                .push(&self.organization_id)
                .extend(segments);
        }
        Ok(url)
    }

    pub(crate) fn build_client(&self) -> Result<reqwest::Client, ApiError> {
        reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))
    }
}

/// The backend's REST contract for one entity kind.
#[async_trait::async_trait]
pub trait ResourceApi<E: TrackedEntity>: Send + Sync {
    async fn list(&self) -> Result<Vec<E>, ApiError>;
    async fn get(&self, id: &EntityId) -> Result<E, ApiError>;
    async fn create(&self, draft: &E::Draft) -> Result<E, ApiError>;
    async fn update(&self, id: &EntityId, patch: &E::Patch) -> Result<E, ApiError>;
    async fn delete(&self, id: &EntityId) -> Result<(), ApiError>;
    async fn status(&self, id: &EntityId) -> Result<StatusReport<E::Status>, ApiError>;
    /// Re-runs the kind's background job.
    async fn trigger(&self, id: &EntityId) -> Result<(), ApiError>;
}

/// Org-scoped reqwest client for one entity kind.
#[derive(Debug, Clone)]
pub struct HttpResourceApi<E> {
    client: reqwest::Client,
    settings: ApiSettings,
    session: Session,
    _kind: PhantomData<fn() -> E>,
}

impl<E: TrackedEntity> HttpResourceApi<E> {
    pub fn new(client: reqwest::Client, settings: ApiSettings, session: Session) -> Self {
        Self {
            client,
            settings,
            session,
            _kind: PhantomData,
        }
    }

    fn collection_url(&self) -> Result<Url, ApiError> {
        self.settings.endpoint(&[E::KIND.collection()])
    }

    fn entity_url(&self, id: &EntityId, tail: Option<&str>) -> Result<Url, ApiError> {
        match tail {
            Some(tail) => self
                .settings
                .endpoint(&[E::KIND.collection(), id.as_str(), tail]),
            None => self.settings.endpoint(&[E::KIND.collection(), id.as_str()]),
        }
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        vb_debug!("{} {}", method, url);
        self.client
            .request(method, url)
            .bearer_auth(&self.session.access_token)
    }
}

async fn send(request: RequestBuilder) -> Result<Response, ApiError> {
    let response = request.send().await.map_err(map_reqwest_error)?;
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::new(FailureKind::Unauthorized, status.to_string()));
    }
    if !status.is_success() {
        let detail = error_detail(response).await;
        return Err(ApiError::new(
            FailureKind::HttpStatus(status.as_u16()),
            detail.unwrap_or_else(|| status.to_string()),
        ));
    }
    Ok(response)
}

async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ApiError> {
    send(request)
        .await?
        .json::<T>()
        .await
        .map_err(map_reqwest_error)
}

/// Pulls a human-readable reason out of an error body (`{"detail": ...}` or
/// `{"error": ...}`), which is what the dashboard shows in failure toasts.
async fn error_detail(response: Response) -> Option<String> {
    let body: serde_json::Value = response.json().await.ok()?;
    ["detail", "error", "message"]
        .iter()
        .find_map(|key| body.get(*key)?.as_str().map(str::to_owned))
}

#[async_trait::async_trait]
impl<E: TrackedEntity> ResourceApi<E> for HttpResourceApi<E> {
    async fn list(&self) -> Result<Vec<E>, ApiError> {
        let url = self.collection_url()?;
        send_json(self.request(Method::GET, url)).await
    }

    async fn get(&self, id: &EntityId) -> Result<E, ApiError> {
        let url = self.entity_url(id, None)?;
        send_json(self.request(Method::GET, url)).await
    }

    async fn create(&self, draft: &E::Draft) -> Result<E, ApiError> {
        let url = self.collection_url()?;
        send_json(self.request(Method::POST, url).json(draft)).await
    }

    async fn update(&self, id: &EntityId, patch: &E::Patch) -> Result<E, ApiError> {
        let url = self.entity_url(id, None)?;
        send_json(self.request(Method::PATCH, url).json(patch)).await
    }

    async fn delete(&self, id: &EntityId) -> Result<(), ApiError> {
        let url = self.entity_url(id, None)?;
        send(self.request(Method::DELETE, url)).await.map(|_| ())
    }

    async fn status(&self, id: &EntityId) -> Result<StatusReport<E::Status>, ApiError> {
        let url = self.entity_url(id, Some(E::KIND.status_segment()))?;
        send_json(self.request(Method::GET, url)).await
    }

    async fn trigger(&self, id: &EntityId) -> Result<(), ApiError> {
        let url = self.entity_url(id, Some(E::KIND.trigger_segment()))?;
        send(self.request(Method::POST, url)).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::ApiSettings;
    use url::Url;

    #[test]
    fn endpoint_is_org_scoped_and_escaped() {
        let base = Url::parse("https://api.example.com/v1/").unwrap();
        let settings = ApiSettings::new(base, "org 1");
        let url = settings
            .endpoint(&["test-suites", "a/b", "generation-status"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/v1/organizations/org%201/test-suites/a%2Fb/generation-status"
        );
    }

    #[test]
    fn endpoint_without_trailing_slash() {
        let settings = ApiSettings::new(Url::parse("http://localhost:8000").unwrap(), "o");
        let url = settings.endpoint(&["agents"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/organizations/o/agents");
    }
}
