//! GitHub OAuth client
//!
//! Implements the OAuth2 web-app flow used for sign-in and identity
//! linking: building the authorize URL, exchanging the callback code for an
//! access token, and fetching the authenticated user's profile.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::AppConfig;

const USER_AGENT: &str = concat!("Personas/", env!("CARGO_PKG_VERSION"));

/// OAuth client errors
#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("OAuth authentication failed: {0}")]
    ExchangeFailed(String),

    #[error("API request failed with status {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Provider is not configured: {0}")]
    NotConfigured(String),
}

/// Token response from GitHub's access token endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub scope: Option<String>,
}

/// Authenticated user profile returned by the provider API
#[derive(Debug, Serialize, Deserialize)]
pub struct ProviderUser {
    pub id: u64,
    pub login: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// GitHub OAuth client configuration
#[derive(Debug, Clone)]
pub struct GitHubOAuthClient {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    oauth_base: String,
    api_base: String,
}

impl GitHubOAuthClient {
    /// Build a client from application configuration
    pub fn from_config(config: &AppConfig) -> Result<Self, OAuthError> {
        let client_id = config
            .github_client_id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| OAuthError::NotConfigured("github".to_string()))?;
        let client_secret = config
            .github_client_secret
            .clone()
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| OAuthError::NotConfigured("github".to_string()))?;

        Ok(Self {
            client_id,
            client_secret,
            redirect_uri: format!("{}/api/auth/callback", config.app_url),
            oauth_base: config
                .github_oauth_base
                .clone()
                .unwrap_or_else(|| "https://github.com".to_string()),
            api_base: config
                .github_api_base
                .clone()
                .unwrap_or_else(|| "https://api.github.com".to_string()),
        })
    }

    /// Build the GitHub authorize URL for the given state token
    pub fn build_authorize_url(&self, state: &str) -> Result<Url, OAuthError> {
        let mut url = Url::parse(&format!("{}/login/oauth/authorize", self.oauth_base))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("state", state)
            .append_pair("scope", "read:user user:email")
            .append_pair("response_type", "code");

        debug!("Generated GitHub OAuth authorize URL");
        Ok(url)
    }

    /// Exchange an authorization code for an access token
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, OAuthError> {
        let client = reqwest::Client::new();

        let mut params = std::collections::HashMap::new();
        params.insert("client_id", self.client_id.clone());
        params.insert("client_secret", self.client_secret.clone());
        params.insert("code", code.to_string());
        params.insert("redirect_uri", self.redirect_uri.clone());

        let response = client
            .post(format!("{}/login/oauth/access_token", self.oauth_base))
            .header("Accept", "application/json")
            .form(&params)
            .send()
            .await?;

        if response.status().is_success() {
            let token_response: TokenResponse = response.json().await?;
            Ok(token_response)
        } else {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            Err(OAuthError::ExchangeFailed(format!(
                "Token exchange failed: {} - {}",
                status, body
            )))
        }
    }

    /// Fetch the authenticated user's profile
    pub async fn fetch_user(&self, access_token: &str) -> Result<ProviderUser, OAuthError> {
        let client = reqwest::Client::new();
        let response = client
            .get(format!("{}/user", self.api_base))
            .header("Authorization", format!("Bearer {}", access_token))
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/vnd.github.v3+json")
            .send()
            .await?;

        if response.status().is_success() {
            let user: ProviderUser = response.json().await?;
            Ok(user)
        } else {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            Err(OAuthError::ApiError {
                status,
                message: format!("Failed to get user info: {}", body),
            })
        }
    }
}

/// Generate a random OAuth state token
pub fn generate_state_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> GitHubOAuthClient {
        let mut config = AppConfig::default();
        config.github_client_id = Some("test_client_id".to_string());
        config.github_client_secret = Some("test_client_secret".to_string());
        config.app_url = "https://personas.test".to_string();
        GitHubOAuthClient::from_config(&config).expect("client builds")
    }

    #[test]
    fn authorize_url_shape() {
        let client = test_client();
        let url = client.build_authorize_url("state-abc").unwrap();

        assert_eq!(url.path(), "/login/oauth/authorize");

        let query_pairs: std::collections::HashMap<_, _> = url.query_pairs().collect();
        assert_eq!(query_pairs.get("client_id").unwrap(), "test_client_id");
        assert_eq!(query_pairs.get("state").unwrap(), "state-abc");
        assert_eq!(
            query_pairs.get("redirect_uri").unwrap(),
            "https://personas.test/api/auth/callback"
        );
        assert_eq!(query_pairs.get("scope").unwrap(), "read:user user:email");
    }

    #[test]
    fn missing_credentials_rejected() {
        let mut config = AppConfig::default();
        config.github_client_id = None;
        config.github_client_secret = Some("secret".to_string());

        let result = GitHubOAuthClient::from_config(&config);
        assert!(matches!(result, Err(OAuthError::NotConfigured(_))));
    }

    #[test]
    fn state_tokens_are_unique() {
        let s1 = generate_state_token();
        let s2 = generate_state_token();

        assert_ne!(s1, s2);
        assert_eq!(s1.len(), 64);
    }
}
