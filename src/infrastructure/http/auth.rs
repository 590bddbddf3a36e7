use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::info;

use crate::domain::ports::TokenProvider;
use crate::infrastructure::config::ApiConfig;

/// A fixed token. Refreshing is impossible, so a rejected token ends the
/// request with an auth error.
pub struct StaticToken(pub String);

#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self) -> Result<String> {
        Ok(self.0.clone())
    }

    async fn refresh(&self) -> Result<String> {
        bail!("token rejected and no refresh endpoint is configured")
    }
}

#[derive(Deserialize)]
struct RefreshResponse {
    token: String,
}

/// Holds the current token and swaps it for a new one by POSTing to the
/// configured refresh endpoint.
pub struct RefreshingToken {
    http: Client,
    refresh_url: String,
    current: RwLock<String>,
}

impl RefreshingToken {
    pub fn new(initial: String, refresh_url: String, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build token refresh client")?;
        Ok(Self {
            http,
            refresh_url,
            current: RwLock::new(initial),
        })
    }
}

#[async_trait]
impl TokenProvider for RefreshingToken {
    async fn token(&self) -> Result<String> {
        Ok(self.current.read().await.clone())
    }

    async fn refresh(&self) -> Result<String> {
        let mut current = self.current.write().await;
        let res = self
            .http
            .post(&self.refresh_url)
            .bearer_auth(current.as_str())
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", self.refresh_url))?
            .error_for_status()
            .context("Token refresh rejected")?;

        let body: RefreshResponse = res.json().await.context("Malformed token refresh response")?;
        *current = body.token.clone();
        info!("API token refreshed");
        Ok(body.token)
    }
}

/// Pick the token provider matching the API configuration.
pub fn token_provider(cfg: &ApiConfig) -> Result<Box<dyn TokenProvider>> {
    Ok(match &cfg.refresh_url {
        Some(url) => Box::new(RefreshingToken::new(
            cfg.token.clone(),
            url.clone(),
            Duration::from_secs(cfg.timeout_secs),
        )?),
        None => Box::new(StaticToken(cfg.token.clone())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_token_cannot_refresh() {
        let tokens = StaticToken("t0".into());
        assert_eq!(tokens.token().await.unwrap(), "t0");
        assert!(tokens.refresh().await.is_err());
    }

    #[tokio::test]
    async fn refreshing_token_starts_with_initial_value() {
        let tokens = RefreshingToken::new(
            "t0".into(),
            "http://localhost/refresh".into(),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(tokens.token().await.unwrap(), "t0");
    }
}
