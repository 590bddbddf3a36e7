use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::domain::ports::TokenProvider;
use crate::infrastructure::config::ApiConfig;

#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("could not obtain a token: {0}")]
    Auth(String),
    #[error("json error: {0}")]
    Decode(String),
    #[error("request cancelled")]
    Cancelled,
}

/// Authenticated JSON client for the listings API.
///
/// Every request carries `Authorization: Bearer <token>`. A 401 answer makes
/// the client refresh the token once and replay the request; a second 401 is
/// returned as [`ApiError::Unauthorized`].
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    config: ApiConfig,
    tokens: Arc<dyn TokenProvider>,
}

impl ApiClient {
    pub fn new(config: ApiConfig, tokens: Arc<dyn TokenProvider>) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("paddock/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            config,
            tokens,
        })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Send a request to `path` (relative to the base URL) and decode the
    /// JSON answer. Dropped as soon as `cancel` fires.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        cancel: &CancellationToken,
    ) -> Result<T, ApiError> {
        let url = self.config.endpoint(path);
        let client = self;
        let url_ref = url.as_str();
        let request = with_auth_retry(self.tokens.as_ref(), move |token| {
            client.send_once::<T>(method.clone(), url_ref, body, token)
        });

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ApiError::Cancelled),
            result = request => result,
        }
    }

    async fn send_once<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        token: String,
    ) -> Result<T, ApiError> {
        debug!(%method, url, "sending request");

        let mut request = self.http.request(method, url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }
        let res = request.send().await.map_err(map_reqwest_error)?;

        match res.status() {
            s if s.is_success() => res
                .json::<T>()
                .await
                .map_err(|e| ApiError::Decode(e.to_string())),
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
            StatusCode::NOT_FOUND => Err(ApiError::NotFound(url.to_string())),
            s => {
                let status = s.as_u16();
                let body = res.text().await.unwrap_or_default();
                Err(ApiError::Http { status, body })
            }
        }
    }
}

/// Run `send` with the current token; on [`ApiError::Unauthorized`] refresh
/// the token and run it exactly once more.
pub async fn with_auth_retry<T, F, Fut>(tokens: &dyn TokenProvider, mut send: F) -> Result<T, ApiError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let token = tokens
        .token()
        .await
        .map_err(|e| ApiError::Auth(format!("{e:#}")))?;

    match send(token).await {
        Err(ApiError::Unauthorized) => {
            warn!("token rejected, refreshing and retrying once");
            let token = tokens
                .refresh()
                .await
                .map_err(|e| ApiError::Auth(format!("{e:#}")))?;
            send(token).await
        }
        other => other,
    }
}

fn map_reqwest_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::Transport(e.to_string())
    }
}

/// Scripted HTTP/1.1 server for exercising the client end to end.
#[cfg(test)]
pub(crate) mod test_server {
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    #[derive(Debug, Clone)]
    pub struct Recorded {
        /// e.g. `PUT /agistments/a1`
        pub target: String,
        pub authorization: Option<String>,
        pub body: String,
    }

    /// Answer one request per scripted `(status, body)`, in order, and
    /// return the base URL with the log of requests received.
    pub async fn serve(replies: Vec<(u16, String)>) -> (String, Arc<Mutex<Vec<Recorded>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let log = Arc::new(Mutex::new(Vec::new()));

        let seen = Arc::clone(&log);
        tokio::spawn(async move {
            for (status, body) in replies {
                let (mut stream, _) = listener.accept().await.unwrap();
                let request = read_request(&mut stream).await;
                seen.lock().unwrap().push(request);

                let response = format!(
                    "HTTP/1.1 {status} Scripted\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(response.as_bytes()).await.unwrap();
                stream.shutdown().await.ok();
            }
        });

        (base_url, log)
    }

    async fn read_request(stream: &mut TcpStream) -> Recorded {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let header_end = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed mid-request");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let mut lines = head.lines();
        let target = lines
            .next()
            .unwrap_or_default()
            .rsplit_once(' ')
            .map(|(target, _)| target.to_string())
            .unwrap_or_default();

        let mut content_length = 0;
        let mut authorization = None;
        for line in lines {
            if let Some((name, value)) = line.split_once(':') {
                match name.trim().to_ascii_lowercase().as_str() {
                    "content-length" => content_length = value.trim().parse().unwrap_or(0),
                    "authorization" => authorization = Some(value.trim().to_string()),
                    _ => {}
                }
            }
        }

        while buf.len() < header_end + content_length {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        let body = String::from_utf8_lossy(&buf[header_end..]).to_string();

        Recorded {
            target,
            authorization,
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct CountingTokens {
        refreshes: AtomicUsize,
        refresh_fails: bool,
    }

    impl CountingTokens {
        fn new(refresh_fails: bool) -> Self {
            Self {
                refreshes: AtomicUsize::new(0),
                refresh_fails,
            }
        }
    }

    #[async_trait]
    impl TokenProvider for CountingTokens {
        async fn token(&self) -> Result<String> {
            Ok("stale".into())
        }

        async fn refresh(&self) -> Result<String> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            if self.refresh_fails {
                bail!("refresh endpoint down");
            }
            Ok("fresh".into())
        }
    }

    #[tokio::test]
    async fn first_401_is_retried_with_fresh_token() {
        let tokens = CountingTokens::new(false);
        let seen = Mutex::new(Vec::new());

        let result = with_auth_retry(&tokens, |token| {
            seen.lock().unwrap().push(token.clone());
            async move {
                if token == "stale" {
                    Err(ApiError::Unauthorized)
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(*seen.lock().unwrap(), vec!["stale", "fresh"]);
        assert_eq!(tokens.refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn second_401_is_unauthorized() {
        let tokens = CountingTokens::new(false);
        let calls = AtomicUsize::new(0);

        let result: Result<(), ApiError> = with_auth_retry(&tokens, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ApiError::Unauthorized) }
        })
        .await;

        assert!(matches!(result, Err(ApiError::Unauthorized)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(tokens.refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let tokens = CountingTokens::new(false);
        let calls = AtomicUsize::new(0);

        let result: Result<(), ApiError> = with_auth_retry(&tokens, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(ApiError::Http {
                    status: 500,
                    body: "boom".into(),
                })
            }
        })
        .await;

        assert!(matches!(result, Err(ApiError::Http { status: 500, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(tokens.refreshes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_refresh_surfaces_as_auth_error() {
        let tokens = CountingTokens::new(true);

        let result: Result<(), ApiError> =
            with_auth_retry(&tokens, |_| async { Err(ApiError::Unauthorized) }).await;

        assert!(matches!(result, Err(ApiError::Auth(msg)) if msg.contains("refresh endpoint down")));
    }

    #[tokio::test]
    async fn cancelled_request_returns_immediately() {
        let client = ApiClient::new(
            ApiConfig {
                // Reserved TEST-NET address: the connection never completes.
                base_url: "http://192.0.2.1:9".into(),
                token: String::new(),
                refresh_url: None,
                timeout_secs: 30,
            },
            Arc::new(CountingTokens::new(false)),
        )
        .unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result: Result<Value, ApiError> = client
            .send_json(Method::GET, "agistments/a1", None, &cancel)
            .await;

        assert!(matches!(result, Err(ApiError::Cancelled)));
    }

    fn client_for(base_url: String, tokens: Arc<CountingTokens>) -> ApiClient {
        ApiClient::new(
            ApiConfig {
                base_url,
                token: String::new(),
                refresh_url: None,
                timeout_secs: 5,
            },
            tokens,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn server_401_is_retried_once_with_refreshed_token() {
        let (base_url, log) =
            test_server::serve(vec![(401, String::new()), (200, r#"{"n":7}"#.into())]).await;
        let tokens = Arc::new(CountingTokens::new(false));
        let client = client_for(base_url, Arc::clone(&tokens));

        let result: Value = client
            .send_json(Method::GET, "agistments/a1", None, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result["n"], 7);
        assert_eq!(tokens.refreshes.load(Ordering::SeqCst), 1);
        let log = log.lock().unwrap();
        let auth: Vec<_> = log.iter().map(|r| r.authorization.clone()).collect();
        assert_eq!(
            auth,
            [Some("Bearer stale".to_string()), Some("Bearer fresh".to_string())]
        );
        assert!(log.iter().all(|r| r.target == "GET /agistments/a1"));
    }

    #[tokio::test]
    async fn server_repeating_401_is_unauthorized() {
        let (base_url, log) =
            test_server::serve(vec![(401, String::new()), (401, String::new())]).await;
        let client = client_for(base_url, Arc::new(CountingTokens::new(false)));

        let result: Result<Value, ApiError> = client
            .send_json(Method::GET, "agistments/a1", None, &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(ApiError::Unauthorized)));
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn status_codes_map_to_errors() {
        let (base_url, _) =
            test_server::serve(vec![(404, String::new()), (500, "boom".into())]).await;
        let client = client_for(base_url, Arc::new(CountingTokens::new(false)));
        let cancel = CancellationToken::new();

        let missing: Result<Value, ApiError> = client
            .send_json(Method::GET, "agistments/nope", None, &cancel)
            .await;
        assert!(matches!(missing, Err(ApiError::NotFound(url)) if url.ends_with("/agistments/nope")));

        let broken: Result<Value, ApiError> = client
            .send_json(Method::GET, "agistments/a1", None, &cancel)
            .await;
        assert!(matches!(
            broken,
            Err(ApiError::Http { status: 500, ref body }) if body == "boom"
        ));
    }
}
