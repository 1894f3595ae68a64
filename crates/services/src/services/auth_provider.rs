//! Client for the external auth platform, plus local verification of the access
//! tokens it issues. Accounts, passwords and token issuance live on the platform;
//! this service only forwards requests and checks signatures.

use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;
use uuid::Uuid;

#[derive(Debug, Clone, Error)]
pub enum AuthProviderError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("invalid auth url: {0}")]
    InvalidUrl(String),
    #[error("auth platform rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("json error: {0}")]
    Serde(String),
}

#[derive(Debug, Clone, Error)]
pub enum TokenError {
    #[error("invalid access token: {0}")]
    Invalid(String),
}

/// User record as returned by the auth platform.
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformUser {
    pub id: Uuid,
    pub email: Option<String>,
}

/// Tokens returned by a successful password sign-in.
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformSession {
    pub access_token: String,
    pub refresh_token: String,
    pub user: PlatformUser,
}

#[derive(Debug, Serialize)]
struct CreateUserRequest<'a> {
    email: &'a str,
    password: &'a str,
    email_confirm: bool,
    user_metadata: UserMetadata<'a>,
}

#[derive(Debug, Serialize)]
struct UserMetadata<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    full_name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct PasswordGrantRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Error bodies use different keys depending on the endpoint.
#[derive(Debug, Default, Deserialize)]
struct PlatformErrorBody {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

impl PlatformErrorBody {
    fn into_message(self) -> Option<String> {
        self.msg
            .or(self.message)
            .or(self.error_description)
            .or(self.error)
    }
}

#[derive(Debug, Clone)]
pub struct AuthProviderClient {
    http: Client,
    base_url: Url,
    service_key: SecretString,
}

impl AuthProviderClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(base_url: &str, service_key: SecretString) -> Result<Self, AuthProviderError> {
        let mut base_url =
            Url::parse(base_url).map_err(|e| AuthProviderError::InvalidUrl(e.to_string()))?;
        // `Url::join` replaces the last path segment unless the base ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AuthProviderError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            service_key,
        })
    }

    fn url(&self, path: &str) -> Result<Url, AuthProviderError> {
        self.base_url
            .join(path)
            .map_err(|e| AuthProviderError::InvalidUrl(e.to_string()))
    }

    /// Create an already-confirmed account through the admin API.
    pub async fn create_user(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<PlatformUser, AuthProviderError> {
        let key = self.service_key.expose_secret();
        let res = self
            .http
            .post(self.url("auth/v1/admin/users")?)
            .header("apikey", key)
            .bearer_auth(key)
            .json(&CreateUserRequest {
                email,
                password,
                email_confirm: true,
                user_metadata: UserMetadata { full_name },
            })
            .send()
            .await
            .map_err(|e| AuthProviderError::Transport(e.to_string()))?;

        if !res.status().is_success() {
            return Err(rejected(res).await);
        }
        res.json::<PlatformUser>()
            .await
            .map_err(|e| AuthProviderError::Serde(e.to_string()))
    }

    /// Exchange email and password for access and refresh tokens.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<PlatformSession, AuthProviderError> {
        let mut url = self.url("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");

        let res = self
            .http
            .post(url)
            .header("apikey", self.service_key.expose_secret())
            .json(&PasswordGrantRequest { email, password })
            .send()
            .await
            .map_err(|e| AuthProviderError::Transport(e.to_string()))?;

        match res.status() {
            s if s.is_success() => res
                .json::<PlatformSession>()
                .await
                .map_err(|e| AuthProviderError::Serde(e.to_string())),
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                Err(AuthProviderError::InvalidCredentials)
            }
            _ => Err(rejected(res).await),
        }
    }
}

async fn rejected(res: reqwest::Response) -> AuthProviderError {
    let status = res.status().as_u16();
    let body = res.text().await.unwrap_or_default();
    let message = serde_json::from_str::<PlatformErrorBody>(&body)
        .ok()
        .and_then(PlatformErrorBody::into_message)
        .unwrap_or(body);
    AuthProviderError::Rejected { status, message }
}

/// Claims read from a platform access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: Uuid,
    pub email: Option<String>,
    pub exp: u64,
}

/// Verifies HS256 access tokens signed with the platform's JWT secret.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &SecretString) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Platform tokens carry an audience we do not pin.
        validation.validate_aud = false;
        Self {
            key: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<AccessClaims, TokenError> {
        decode::<AccessClaims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| TokenError::Invalid(e.to_string()))
    }
}
