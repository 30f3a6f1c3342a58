//! HTTP transport and the network stage of the pipeline

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::{Client, Proxy, StatusCode};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, warn};

use super::error::{FetchError, FetchResult};
use super::payload::decode;
use super::pipeline::Stage;
use super::request::{BasicAuth, FetchRequest};
use crate::config::FetchSettings;
use crate::observability::FetchMetrics;

/// A validated GET, ready for the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    pub url: String,
    /// Absent means no `User-Agent` header at all
    pub user_agent: Option<String>,
    /// `http://host:port`, applied to plain-http targets only
    pub proxy: Option<String>,
    pub auth: Option<BasicAuth>,
}

/// Raw response as the transport saw it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub reason: String,
    pub body: String,
}

impl TransportResponse {
    /// Error statuses fail, and so does 204: some sites answer errors with it
    pub fn is_failure(&self) -> bool {
        self.status >= 400 || self.status == StatusCode::NO_CONTENT.as_u16()
    }
}

/// Something that can perform a single GET
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, request: &TransportRequest) -> Result<TransportResponse, FetchError>;
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_redirects: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            max_redirects: 10,
        }
    }
}

impl From<&FetchSettings> for HttpConfig {
    fn from(settings: &FetchSettings) -> Self {
        Self {
            connect_timeout: settings.connect_timeout.as_duration(),
            request_timeout: settings.request_timeout.as_duration(),
            ..Self::default()
        }
    }
}

/// reqwest-backed transport
///
/// reqwest fixes proxies per client, so one client is kept per proxy URL.
pub struct ReqwestTransport {
    config: HttpConfig,
    direct: Client,
    proxied: Mutex<HashMap<String, Client>>,
}

impl ReqwestTransport {
    pub fn new(config: HttpConfig) -> Result<Self, FetchError> {
        let direct = Self::build_client(&config, None)?;
        Ok(Self {
            config,
            direct,
            proxied: Mutex::new(HashMap::new()),
        })
    }

    fn build_client(config: &HttpConfig, proxy_url: Option<&str>) -> Result<Client, FetchError> {
        let mut builder = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects));

        if let Some(url) = proxy_url {
            let proxy = Proxy::http(url)
                .map_err(|e| FetchError::Client(format!("Invalid proxy: {}", e)))?;
            builder = builder.proxy(proxy);
        }

        builder
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))
    }

    /// Client for a proxy URL; a proxy reqwest rejects falls back to the direct client
    fn client_for(&self, proxy_url: Option<&str>) -> Result<Client, FetchError> {
        let Some(url) = proxy_url else {
            return Ok(self.direct.clone());
        };

        let mut proxied = self
            .proxied
            .lock()
            .map_err(|_| {
                FetchError::Client("proxy client table poisoned".to_string())
            })?;

        if let Some(client) = proxied.get(url) {
            return Ok(client.clone());
        }

        match Self::build_client(&self.config, Some(url)) {
            Ok(client) => {
                proxied.insert(url.to_string(), client.clone());
                Ok(client)
            }
            Err(e) => {
                warn!(proxy = %url, error = %e, "Proxy rejected, sending directly");
                Ok(self.direct.clone())
            }
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, request: &TransportRequest) -> Result<TransportResponse, FetchError> {
        let client = self.client_for(request.proxy.as_deref())?;

        let mut builder = client.get(&request.url);
        if let Some(agent) = &request.user_agent {
            builder = builder.header(USER_AGENT, agent);
        }
        if let Some(auth) = &request.auth {
            builder = builder.basic_auth(&auth.username, Some(&auth.password));
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Transport("Connection timeout".to_string())
            } else if e.is_redirect() {
                FetchError::Transport("Too many redirects".to_string())
            } else {
                FetchError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        let reason = status.canonical_reason().unwrap_or("Unknown").to_string();
        let body = response
            .text()
            .await
            .map_err(|e| {
                FetchError::Transport(format!("Failed to read body: {}", e))
            })?;

        Ok(TransportResponse {
            status: status.as_u16(),
            reason,
            body,
        })
    }
}

/// Innermost stage: validate, send, check status, decode
pub struct TransportStage {
    transport: Arc<dyn Transport>,
    metrics: Arc<FetchMetrics>,
}

impl TransportStage {
    pub fn new(transport: Arc<dyn Transport>, metrics: Arc<FetchMetrics>) -> Self {
        Self { transport, metrics }
    }

    /// Malformed proxies are dropped, never fatal
    fn prepare(request: &FetchRequest) -> TransportRequest {
        let proxy = request.proxy.as_ref().and_then(|proxy| match proxy.to_url() {
            Some(url) => {
                debug!(proxy = %url, "Using proxy");
                Some(url)
            }
            None => {
                warn!(
                    parts = ?proxy.parts(),
                    "Invalid proxy, need an address and a numeric port"
                );
                None
            }
        });

        TransportRequest {
            url: request.url.clone(),
            user_agent: request.user_agent.clone(),
            proxy,
            auth: request.auth.clone(),
        }
    }

    async fn send(&self, request: &FetchRequest) -> FetchResult {
        let outgoing = Self::prepare(request);

        debug!(
            url = %outgoing.url,
            user_agent = ?outgoing.user_agent,
            "Sending request"
        );
        self.metrics.network_request();

        let started = std::time::Instant::now();
        let response = self.transport.get(&outgoing).await?;
        debug!(
            status = response.status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Response received"
        );

        if response.is_failure() {
            return Err(FetchError::Status {
                status: response.status,
                reason: response.reason,
            });
        }

        decode(request.mode, response.body)
    }
}

#[async_trait]
impl Stage for TransportStage {
    async fn process(&self, request: &FetchRequest) -> FetchResult {
        let result = self.send(request).await;

        if let Err(e) = &result {
            self.metrics.failure();
            error!(url = %request.url, error = %e, "Fetch failed");
        }

        result
    }
}
