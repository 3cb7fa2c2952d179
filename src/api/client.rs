use reqwest::Url;

use super::model::CreateUserResponse;
use super::ApiError;

/// Client for the user-management endpoints under `API_ROOT`.
#[derive(Clone)]
pub struct UserApiClient {
    http: reqwest::Client,
    root: Url,
}

impl UserApiClient {
    pub fn new(api_root: &str) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("user-api-harness/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ApiError::Transport)?;
        Self::with_client(api_root, http)
    }

    pub fn with_client(api_root: &str, http: reqwest::Client) -> Result<Self, ApiError> {
        let root = Url::parse(api_root)
            .map_err(|e| ApiError::InvalidRoot(format!("{}: {}", api_root, e)))?;
        if root.cannot_be_a_base() {
            return Err(ApiError::InvalidRoot(api_root.to_string()));
        }
        Ok(Self { http, root })
    }

    pub fn root(&self) -> &Url {
        &self.root
    }

    /// `<root>/create/<username>`, with the username as one encoded segment.
    pub fn create_url(&self, username: &str) -> Result<Url, ApiError> {
        let mut url = self.root.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidRoot(self.root.to_string()))?
            .pop_if_empty()
            .push("create")
            .push(username);
        Ok(url)
    }

    /// Ask the service to create `username`.
    ///
    /// Any non-2xx answer, including the rejection of a duplicate name,
    /// comes back as [`ApiError::Status`].
    pub async fn create_user(&self, username: &str) -> Result<CreateUserResponse, ApiError> {
        let url = self.create_url(username)?;
        log::debug!("GET {}", url);

        let response = self.http.get(url).send().await.map_err(ApiError::Transport)?;
        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<body unreadable: {}>", e));
            log::debug!("create {} answered {}: {}", username, status, body);
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(ApiError::Transport)?;
        let body = serde_json::from_slice(&bytes).map_err(ApiError::Json)?;

        Ok(CreateUserResponse { status, body })
    }
}
