//! Permission backend: where role grants, user overrides and page
//! permissions come from.

use crate::error::BackendError;
use crate::record::{PagePermissions, UserOverridesResponse, UserPermissionsResponse};
use async_trait::async_trait;
use atlas_common_config::ApiConfig;
use atlas_common_http::{headers, HttpClient, HttpConfig, RequestBuilder};
use atlas_common_log::spans::fetch_span;
use tracing::{debug, Instrument};
use url::form_urlencoded;

/// Role-derived modules, permissions and role features.
pub const USER_PERMISSIONS_PATH: &str = "/admin/user-permissions";

/// Page permissions for one base path, passed as `?path=`.
pub const PAGE_PERMISSIONS_PATH: &str = "/admin/page-permissions";

/// Per-user feature permission overrides. The id is percent-encoded so it
/// stays a single path segment.
pub fn user_overrides_path(user_id: &str) -> String {
    let segment = form_urlencoded::byte_serialize(user_id.as_bytes())
        .collect::<String>()
        .replace('+', "%20");
    format!("/admin/users/{}/feature-permissions", segment)
}

/// Source of permission data for the store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PermissionBackend: Send + Sync {
    /// Role grants for the authenticated user.
    async fn fetch_user_permissions(&self) -> Result<UserPermissionsResponse, BackendError>;

    /// Per-user overrides for `user_id`.
    async fn fetch_user_overrides(&self, user_id: &str) -> Result<UserOverridesResponse, BackendError>;

    /// Page permissions for a canonical base path.
    async fn fetch_page_permissions(&self, base_path: &str) -> Result<PagePermissions, BackendError>;
}

/// [`PermissionBackend`] over the Atlas REST API.
#[derive(Debug, Clone)]
pub struct RestBackend {
    client: HttpClient,
}

impl RestBackend {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Build a client from API configuration, with bearer auth when a
    /// token is configured.
    pub fn from_config(config: &ApiConfig) -> Result<Self, BackendError> {
        let base_url = config.base_url.trim();
        if base_url.is_empty() {
            return Err(BackendError::NotConfigured("api.base_url".into()));
        }

        let mut http = HttpConfig {
            connect_timeout: config.connect_timeout(),
            request_timeout: config.request_timeout(),
            ..HttpConfig::default()
        };
        if let Some(agent) = &config.user_agent {
            http.user_agent = agent.clone();
        }

        let mut request = RequestBuilder::new()
            .base_url(base_url)
            .accept_json()
            .header(headers::X_REQUEST_SOURCE, "atlas-rbac");
        if let Some(token) = config.token.as_deref().filter(|t| !t.is_empty()) {
            request = request.bearer_auth(token);
        }

        let client = HttpClient::with_config(http)
            .map_err(|e| BackendError::http(base_url, e))?
            .with_request(request);
        Ok(Self::new(client))
    }

    pub fn client(&self) -> &HttpClient {
        &self.client
    }
}

#[async_trait]
impl PermissionBackend for RestBackend {
    async fn fetch_user_permissions(&self) -> Result<UserPermissionsResponse, BackendError> {
        let response: UserPermissionsResponse = self
            .client
            .get_json(USER_PERMISSIONS_PATH, &[])
            .instrument(fetch_span(USER_PERMISSIONS_PATH))
            .await
            .map_err(|e| BackendError::http(USER_PERMISSIONS_PATH, e))?;
        debug!(
            modules = response.modules.len(),
            permissions = response.permissions.len(),
            role_features = response.role_features.len(),
            "user permissions fetched"
        );
        Ok(response)
    }

    async fn fetch_user_overrides(&self, user_id: &str) -> Result<UserOverridesResponse, BackendError> {
        let path = user_overrides_path(user_id);
        let response: UserOverridesResponse = self
            .client
            .get_json(&path, &[])
            .instrument(fetch_span(&path))
            .await
            .map_err(|e| BackendError::http(&path, e))?;
        debug!(user = %user_id, overrides = response.items.len(), "user overrides fetched");
        Ok(response)
    }

    async fn fetch_page_permissions(&self, base_path: &str) -> Result<PagePermissions, BackendError> {
        self.client
            .get_json(PAGE_PERMISSIONS_PATH, &[("path", base_path)])
            .instrument(fetch_span(PAGE_PERMISSIONS_PATH))
            .await
            .map_err(|e| BackendError::http(PAGE_PERMISSIONS_PATH, e))
    }
}
