use async_trait::async_trait;
use geoproof_types::StorageUser;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Google OAuth2 userinfo endpoint used by the default deployment.
pub const DEFAULT_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v1/userinfo";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("userinfo transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("userinfo endpoint rejected the token: HTTP {0}")]
    Rejected(u16),
}

/// Resolves a storage-account OAuth token to a verified user identity.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<StorageUser, IdentityError>;
}

/// HTTP client for the OAuth userinfo endpoint.
pub struct OAuthIdentityClient {
    http: Client,
    userinfo_url: String,
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    id: String,
    email: Option<String>,
    #[serde(default)]
    verified_email: bool,
}

impl OAuthIdentityClient {
    pub fn new(userinfo_url: impl Into<String>) -> Result<Self, IdentityError> {
        let http = Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self {
            http,
            userinfo_url: userinfo_url.into(),
        })
    }
}

#[async_trait]
impl IdentityProvider for OAuthIdentityClient {
    async fn resolve(&self, token: &str) -> Result<StorageUser, IdentityError> {
        let response = self
            .http
            .get(&self.userinfo_url)
            .query(&[("alt", "json")])
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(IdentityError::Rejected(status.as_u16()));
        }

        let info: UserInfoResponse = response.json().await?;
        debug!(verified = info.verified_email, "Storage user resolved");

        Ok(StorageUser {
            id: info.id,
            email: info.email,
            verified_email: info.verified_email,
        })
    }
}
