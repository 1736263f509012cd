//! HTTP transport for the client.
//!
//! Provides [`HttpTransport`], a [`Transport`] over `reqwest`. Queries and
//! submissions are plain requests carrying the session token as the `userid`
//! cookie; the push channel is a Server-Sent Events stream decoded by a
//! spawned task. Protocol logic stays in the sans-IO [`crate::Client`].

use std::time::Duration;

use futures::StreamExt;
use gallows_proto::{GameId, PushEvent, SessionToken, SseDecoder};
use reqwest::header::{COOKIE, SET_COOKIE};
use thiserror::Error;
use tokio::sync::mpsc;
use url::Url;

use crate::transport::{ChannelItem, Endpoint, Method, Subscription, Transport, channel_path};

/// Cookie the server keys sessions by.
const SESSION_COOKIE: &str = "userid";

/// Buffered push items before the reader task waits for the consumer.
const CHANNEL_CAPACITY: usize = 32;

/// HTTP transport errors.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Building the HTTP client failed.
    #[error("http client setup failed: {0}")]
    Client(#[source] reqwest::Error),

    /// Endpoint path could not be joined onto the base URL.
    #[error("invalid url for {path}: {source}")]
    Url {
        /// Relative path.
        path: String,
        /// Parse failure.
        #[source]
        source: url::ParseError,
    },

    /// Request failed before a response arrived.
    #[error("request to {path} failed: {source}")]
    Request {
        /// Relative path.
        path: String,
        /// Underlying failure.
        #[source]
        source: reqwest::Error,
    },

    /// Server answered with a non-success status.
    #[error("{path} answered HTTP {status}")]
    Status {
        /// Relative path.
        path: String,
        /// HTTP status code.
        status: u16,
    },
}

/// HTTP transport configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    /// Server root, e.g. `http://127.0.0.1:8000/`.
    pub base_url: Url,
    /// Timeout for queries and submissions. The push channel has none.
    pub request_timeout: Duration,
    /// `User-Agent` header.
    pub user_agent: String,
}

impl HttpConfig {
    /// Configuration with default timeout and user agent.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            request_timeout: Duration::from_secs(10),
            user_agent: concat!("gallows/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// [`Transport`] over HTTP and Server-Sent Events.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    config: HttpConfig,
    client: reqwest::Client,
    /// No overall timeout: the push stream stays open for the whole game.
    stream_client: reqwest::Client,
}

impl HttpTransport {
    /// Build the HTTP clients.
    pub fn new(config: HttpConfig) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(HttpError::Client)?;
        let stream_client = reqwest::Client::builder()
            .connect_timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(HttpError::Client)?;
        Ok(Self { config, client, stream_client })
    }

    /// Active configuration.
    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Request for `endpoint`, carrying `body` only where the server reads one.
    fn request(
        &self,
        endpoint: Endpoint,
        body: &serde_json::Value,
    ) -> Result<reqwest::RequestBuilder, HttpError> {
        let url = self.url(endpoint.path())?;
        Ok(match endpoint.method() {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url).json(body),
        })
    }

    fn url(&self, path: &str) -> Result<Url, HttpError> {
        self.config
            .base_url
            .join(path)
            .map_err(|source| HttpError::Url { path: path.to_string(), source })
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        path: &str,
    ) -> Result<reqwest::Response, HttpError> {
        let response = request
            .send()
            .await
            .map_err(|source| HttpError::Request { path: path.to_string(), source })?;
        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::Status { path: path.to_string(), status: status.as_u16() });
        }
        Ok(response)
    }

    async fn body(response: reqwest::Response, path: &str) -> Result<String, HttpError> {
        response
            .text()
            .await
            .map_err(|source| HttpError::Request { path: path.to_string(), source })
    }
}

fn with_token(
    request: reqwest::RequestBuilder,
    token: Option<&SessionToken>,
) -> reqwest::RequestBuilder {
    match token {
        Some(token) => request.header(COOKIE, format!("{SESSION_COOKIE}={}", token.as_str())),
        None => request,
    }
}

/// Session token set by the server through `Set-Cookie`, if any.
fn cookie_token(response: &reqwest::Response) -> Option<String> {
    response.headers().get_all(SET_COOKIE).iter().find_map(|value| {
        let value = value.to_str().ok()?;
        let pair = value.split(';').next()?;
        let (name, token) = pair.split_once('=')?;
        let token = token.trim();
        (name.trim() == SESSION_COOKIE && !token.is_empty()).then(|| token.to_string())
    })
}

/// Fill a missing `token` field of a registration body from the cookie.
fn merge_cookie_token(body: String, token: Option<String>) -> String {
    let Some(token) = token else {
        return body;
    };
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(serde_json::Value::Object(mut map)) if !map.contains_key("token") => {
            map.insert("token".to_string(), serde_json::Value::String(token));
            serde_json::Value::Object(map).to_string()
        },
        _ => body,
    }
}

impl Transport for HttpTransport {
    type Error = HttpError;

    async fn query(
        &self,
        endpoint: Endpoint,
        token: Option<&SessionToken>,
    ) -> Result<String, HttpError> {
        let path = endpoint.path();
        let request = with_token(self.client.get(self.url(path)?), token);
        let response = self.send(request, path).await?;
        Self::body(response, path).await
    }

    async fn submit(
        &self,
        endpoint: Endpoint,
        token: Option<&SessionToken>,
        body: serde_json::Value,
    ) -> Result<String, HttpError> {
        let path = endpoint.path();
        let request = with_token(self.request(endpoint, &body)?, token);
        let response = self.send(request, path).await?;

        if endpoint == Endpoint::Register {
            let token = cookie_token(&response);
            let text = Self::body(response, path).await?;
            return Ok(merge_cookie_token(text, token));
        }
        Self::body(response, path).await
    }

    async fn subscribe(&self, game_id: GameId) -> Result<Subscription, HttpError> {
        let path = channel_path(game_id);
        let request =
            self.stream_client.get(self.url(&path)?).header("Accept", "text/event-stream");
        let response = self.send(request, &path).await?;

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let handle = tokio::spawn(read_events(response, tx));
        tracing::info!(game_id, "push channel open");
        Ok(Subscription::with_task(rx, handle.abort_handle()))
    }
}

/// Decode the event stream into the subscription channel until either side
/// goes away.
async fn read_events(response: reqwest::Response, tx: mpsc::Sender<ChannelItem>) {
    let mut decoder = SseDecoder::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::warn!(error = %e, "push channel failed");
                let _ = tx.send(ChannelItem::Lost(e.to_string())).await;
                return;
            },
        };

        for payload in decoder.push(&chunk) {
            match PushEvent::from_json(&payload) {
                Ok(event) => {
                    if tx.send(ChannelItem::Event(event)).await.is_err() {
                        return;
                    }
                },
                Err(e) => tracing::warn!(error = %e, %payload, "dropping undecodable push event"),
            }
        }
    }

    let _ = tx.send(ChannelItem::Lost("server closed the push channel".to_string())).await;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_join_onto_base_path() {
        let base = Url::parse("http://localhost:8000/game/").unwrap();
        let transport = HttpTransport::new(HttpConfig::new(base)).unwrap();
        assert_eq!(
            transport.url(Endpoint::Guess.path()).unwrap().as_str(),
            "http://localhost:8000/game/api/submit_char"
        );
        assert_eq!(
            transport.url(&channel_path(3)).unwrap().as_str(),
            "http://localhost:8000/game/sse/3"
        );
    }

    #[test]
    fn delete_game_is_a_bodiless_get() {
        let base = Url::parse("http://localhost:8000/").unwrap();
        let transport = HttpTransport::new(HttpConfig::new(base)).unwrap();
        let body = serde_json::json!({ "ignored": true });

        let delete = transport.request(Endpoint::DeleteGame, &body).unwrap().build().unwrap();
        assert_eq!(delete.method(), reqwest::Method::GET);
        assert_eq!(delete.url().path(), "/api/delete_game");
        assert!(delete.body().is_none());

        let guess = transport.request(Endpoint::Guess, &body).unwrap().build().unwrap();
        assert_eq!(guess.method(), reqwest::Method::POST);
        assert!(guess.body().is_some());
    }

    #[test]
    fn cookie_token_fills_missing_field() {
        let body = r#"{"result":2,"game_id":1}"#.to_string();
        let merged = merge_cookie_token(body, Some("42".into()));
        let value: serde_json::Value = serde_json::from_str(&merged).unwrap();
        assert_eq!(value["token"], "42");
    }

    #[test]
    fn body_token_wins_over_cookie() {
        let body = r#"{"result":2,"game_id":1,"token":"body"}"#.to_string();
        assert_eq!(merge_cookie_token(body.clone(), Some("cookie".into())), body);
    }
}
