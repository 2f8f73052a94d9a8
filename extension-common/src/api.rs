use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header;
use tracing::debug;
use url::Url;

use crate::error::ApiError;
use crate::event::{LifecycleEvent, RegisterRequest};

pub const EXTENSION_NAME_HEADER: &str = "Lifecycle-Extension-Name";
pub const EXTENSION_IDENTIFIER_HEADER: &str = "Lifecycle-Extension-Identifier";

pub const REGISTER_PATH: &str = "/2020-01-01/extension/register";
pub const NEXT_EVENT_PATH: &str = "/2020-01-01/extension/event/next";

/// Opaque identifier issued by the host when an extension registers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtensionId(String);

impl ExtensionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExtensionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two calls an extension makes against the host lifecycle API.
#[async_trait]
pub trait LifecycleApi: Send + Sync {
    /// Register `name` for the event kinds in `request`, returning the host-issued identifier.
    async fn register(
        &self,
        name: &str,
        request: &RegisterRequest,
    ) -> Result<ExtensionId, ApiError>;

    /// Block until the host delivers the next event for the extension identified by `id`.
    async fn next_event(&self, id: &ExtensionId) -> Result<LifecycleEvent, ApiError>;
}

#[async_trait]
impl<T: LifecycleApi + ?Sized> LifecycleApi for Arc<T> {
    async fn register(
        &self,
        name: &str,
        request: &RegisterRequest,
    ) -> Result<ExtensionId, ApiError> {
        (**self).register(name, request).await
    }

    async fn next_event(&self, id: &ExtensionId) -> Result<LifecycleEvent, ApiError> {
        (**self).next_event(id).await
    }
}

/// `LifecycleApi` over HTTP.
pub struct HttpLifecycleApi {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpLifecycleApi {
    /// Build a client for the API at `address`, either `host:port` or a full URL.
    ///
    /// The underlying client has no request timeout: waiting for the next event may take
    /// as long as the host wants, and giving up early would leave us out of step with it.
    pub fn new(address: &str) -> Result<Self, ApiError> {
        let base_url = parse_address(address)?;

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent("lifecycle-extension-agent")
            .build()
            .map_err(ApiError::ClientBuild)?;

        Ok(Self { base_url, client })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|source| ApiError::InvalidAddress {
                address: self.base_url.to_string(),
                source,
            })
    }
}

#[async_trait]
impl LifecycleApi for HttpLifecycleApi {
    async fn register(
        &self,
        name: &str,
        request: &RegisterRequest,
    ) -> Result<ExtensionId, ApiError> {
        let url = self.endpoint(REGISTER_PATH)?;
        debug!(%url, name, "sending registration request");

        let response = self
            .client
            .post(url)
            .header(EXTENSION_NAME_HEADER, name)
            .json(request)
            .send()
            .await
            .map_err(ApiError::RegistrationRequest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::RegistrationRejected { status, body });
        }

        response
            .headers()
            .get(EXTENSION_IDENTIFIER_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(ExtensionId::new)
            .ok_or(ApiError::MissingIdentifier)
    }

    async fn next_event(&self, id: &ExtensionId) -> Result<LifecycleEvent, ApiError> {
        let url = self.endpoint(NEXT_EVENT_PATH)?;

        let response = self
            .client
            .get(url)
            .header(EXTENSION_IDENTIFIER_HEADER, id.as_str())
            .send()
            .await
            .map_err(ApiError::PollRequest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::PollRejected { status, body });
        }

        let body = response.bytes().await.map_err(ApiError::PollRequest)?;

        Ok(LifecycleEvent::from_slice(&body)?)
    }
}

/// The host hands out its address without a scheme, e.g. `127.0.0.1:9001`.
fn parse_address(address: &str) -> Result<Url, ApiError> {
    let with_scheme = if address.contains("://") {
        address.to_owned()
    } else {
        format!("http://{address}")
    };

    let url = Url::parse(&with_scheme).map_err(|source| ApiError::InvalidAddress {
        address: address.to_owned(),
        source,
    })?;

    if url.cannot_be_a_base() {
        return Err(ApiError::InvalidAddress {
            address: address.to_owned(),
            source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
        });
    }

    Ok(url)
}
