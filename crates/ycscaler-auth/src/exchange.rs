//! Assertion → bearer token exchange.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AuthError;

/// A bearer token as issued by the credential endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    /// Server-declared expiry.
    pub expires_at: DateTime<Utc>,
}

/// Trades a signed assertion for a bearer token.
///
/// The production implementation is [`IamExchange`]; tests substitute a
/// fake to count or fail exchanges.
#[async_trait]
pub trait TokenExchange: Send + Sync {
    /// Audience the assertion must be addressed to.
    fn audience(&self) -> &str;

    /// Perform one exchange. Called at most once per staleness episode.
    async fn exchange(&self, assertion: &str) -> Result<IssuedToken, AuthError>;
}

#[derive(Serialize)]
struct ExchangeRequest<'a> {
    jwt: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeResponse {
    iam_token: String,
    expires_at: DateTime<Utc>,
}

/// Token exchange against the IAM `tokens` endpoint.
#[derive(Clone)]
pub struct IamExchange {
    client: reqwest::Client,
    url: String,
}

impl IamExchange {
    /// Create an exchange posting to `url`.
    ///
    /// The request timeout is whatever `client` was built with.
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl TokenExchange for IamExchange {
    fn audience(&self) -> &str {
        &self.url
    }

    async fn exchange(&self, assertion: &str) -> Result<IssuedToken, AuthError> {
        let resp = self
            .client
            .post(&self.url)
            .json(&ExchangeRequest { jwt: assertion })
            .send()
            .await
            .map_err(AuthError::from_reqwest)?;

        let status = resp.status();
        let body = resp.bytes().await.map_err(AuthError::from_reqwest)?;

        if !status.is_success() {
            return Err(AuthError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        let parsed: ExchangeResponse =
            serde_json::from_slice(&body).map_err(|e| AuthError::Decode(e.to_string()))?;

        debug!(url = %self.url, expires_at = %parsed.expires_at, "IAM token issued");

        Ok(IssuedToken {
            token: parsed.iam_token,
            expires_at: parsed.expires_at,
        })
    }
}
