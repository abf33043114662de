use super::dispatch::DeliveryError;
use super::serialization::BatchSerializer;
use crate::app::Settings;
use reqwest::header::{CONTENT_ENCODING, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, ClientBuilder, Proxy};
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },
    #[error("Failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Result of a completed POST that the collector accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostOutcome {
    pub status: u16,
    pub bytes_sent: usize,
}

/// Connection factory and request builder for the collector endpoint.
#[derive(Debug, Clone)]
pub struct CollectorClient {
    client: Client,
    endpoint: Url,
    headers: HeaderMap,
    gzip: bool,
    serializer: BatchSerializer,
}

impl CollectorClient {
    pub fn new(settings: &Settings) -> Result<Self, ClientError> {
        let mut builder = ClientBuilder::new()
            .connect_timeout(settings.connect_timeout)
            .user_agent(format!("rask-log-shipper/{}", env!("CARGO_PKG_VERSION")));

        builder = match &settings.proxy {
            Some(proxy_url) => {
                let proxy = Proxy::all(proxy_url.as_str()).map_err(|e| {
                    ClientError::InvalidConfiguration(format!("Invalid proxy URL {proxy_url}: {e}"))
                })?;
                debug!(proxy = %proxy_url, "routing deliveries through proxy, TLS verification relaxed");
                builder.proxy(proxy).danger_accept_invalid_certs(true)
            }
            None => builder.no_proxy(),
        };

        let client = builder.build()?;
        let headers = static_headers(settings)?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            headers,
            gzip: settings.gzip,
            serializer: BatchSerializer::new(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn uses_gzip(&self) -> bool {
        self.gzip
    }

    /// POSTs `payload`, compressing it first when gzip is enabled.
    ///
    /// The response body is always read to the end before returning so the
    /// pooled connection can be reused.
    pub async fn post(&self, payload: String) -> Result<PostOutcome, DeliveryError> {
        let mut request = self.client.post(self.endpoint.clone()).headers(self.headers.clone());

        let body: Vec<u8> = if self.gzip {
            request = request.header(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
            self.serializer.compress(payload.as_bytes())?
        } else {
            payload.into_bytes()
        };
        let bytes_sent = body.len();

        let response = request
            .body(body)
            .send()
            .await
            .map_err(DeliveryError::Transport)?;

        let status = response.status();
        if let Err(e) = response.bytes().await {
            debug!(error = %e, "failed to drain response body");
        }

        if status.is_success() {
            Ok(PostOutcome {
                status: status.as_u16(),
                bytes_sent,
            })
        } else {
            Err(DeliveryError::Status {
                status: status.as_u16(),
            })
        }
    }
}

fn static_headers(settings: &Settings) -> Result<HeaderMap, ClientError> {
    let mut headers = HeaderMap::with_capacity(settings.headers.len());
    for (name, value) in &settings.headers {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| ClientError::InvalidHeader {
                name: name.clone(),
                reason: e.to_string(),
            })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| ClientError::InvalidHeader {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}
