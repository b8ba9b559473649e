//! JSON-RPC transport seam and the chain-tagged dispatch wrapper over it.

use std::{fmt, time::Duration};

use alloy_rpc_types_engine::JwtSecret;
use async_trait::async_trait;
use jsonrpsee::{
    core::{
        client::{ClientT, Error as ClientError},
        params::ArrayParams,
    },
    http_client::HttpClientBuilder,
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{auth::JwtAuthLayer, errors::ConfigError, errors::TransportError};

/// Request timeout applied when the caller sets no deadline.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on a call's deadline.
///
/// The HTTP client's own timeout is set to this bound, so the per-call deadline enforced by
/// [`RpcWrapper::call`] always fires first or at the same instant.
pub const MAX_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Undecoded answer of a JSON-RPC exchange.
///
/// Both fields may be set: an error object can carry a result in its `data` member.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawResponse {
    pub result: Option<Value>,
    pub error: Option<TransportError>,
}

impl RawResponse {
    pub fn ok(result: Value) -> Self {
        Self {
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(error: TransportError) -> Self {
        Self {
            result: None,
            error: Some(error),
        }
    }

    pub fn with_error(mut self, error: TransportError) -> Self {
        self.error = Some(error);
        self
    }
}

/// Issues one JSON-RPC request with positional params.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait RpcTransport: fmt::Debug + Send + Sync {
    async fn request(&self, method: &'static str, params: Vec<Value>) -> RawResponse;
}

#[async_trait]
impl<T: RpcTransport + ?Sized> RpcTransport for Box<T> {
    async fn request(&self, method: &'static str, params: Vec<Value>) -> RawResponse {
        (**self).request(method, params).await
    }
}

/// [`RpcTransport`] over a `jsonrpsee` HTTP client.
pub struct HttpTransport<C> {
    client: C,
    request_timeout: Duration,
}

impl<C> fmt::Debug for HttpTransport<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl<C> HttpTransport<C> {
    pub fn new(client: C, request_timeout: Duration) -> Self {
        Self {
            client,
            request_timeout,
        }
    }
}

/// Builds an HTTP transport that authenticates every request with `secret`, if any.
///
/// Its timeout is [`MAX_REQUEST_TIMEOUT`]; per-call deadlines are enforced by [`RpcWrapper`].
pub fn http_transport(
    url: &str,
    secret: Option<JwtSecret>,
) -> Result<HttpTransport<impl ClientT + Send + Sync + 'static>, ConfigError> {
    let middleware = tower::ServiceBuilder::new().layer(JwtAuthLayer::new(secret));

    let client = HttpClientBuilder::default()
        .request_timeout(MAX_REQUEST_TIMEOUT)
        .set_http_middleware(middleware)
        .build(url)
        .map_err(|err| ConfigError::Client {
            url: url.to_owned(),
            reason: err.to_string(),
        })?;

    Ok(HttpTransport::new(client, MAX_REQUEST_TIMEOUT))
}

#[async_trait]
impl<C> RpcTransport for HttpTransport<C>
where
    C: ClientT + Send + Sync,
{
    async fn request(&self, method: &'static str, params: Vec<Value>) -> RawResponse {
        let mut rpc_params = ArrayParams::new();
        for param in params {
            if let Err(err) = rpc_params.insert(param) {
                return RawResponse::failed(TransportError::Encode(err.to_string()));
            }
        }

        match self.client.request::<Value, _>(method, rpc_params).await {
            Ok(result) => RawResponse::ok(result),
            Err(ClientError::Call(obj)) => {
                // Some peers attach the well-formed result to the error object.
                let result = obj
                    .data()
                    .and_then(|data| serde_json::from_str::<Value>(data.get()).ok());
                RawResponse {
                    result,
                    error: Some(TransportError::Rpc {
                        code: obj.code(),
                        message: obj.message().to_owned(),
                    }),
                }
            }
            Err(ClientError::RequestTimeout) => {
                RawResponse::failed(TransportError::Timeout(self.request_timeout))
            }
            Err(err) => RawResponse::failed(TransportError::Http(err.to_string())),
        }
    }
}

/// Per-call deadline and cancellation.
#[derive(Clone, Debug)]
pub struct CallOptions {
    pub deadline: Duration,
    pub cancel: Option<CancellationToken>,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            deadline: DEFAULT_REQUEST_TIMEOUT,
            cancel: None,
        }
    }
}

impl CallOptions {
    /// Sets the deadline, capped at [`MAX_REQUEST_TIMEOUT`].
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline.min(MAX_REQUEST_TIMEOUT);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Decoded answer of a call, before any status interpretation.
#[derive(Debug)]
pub struct RpcOutcome<R> {
    pub decoded: Option<R>,
    /// Result that came back but did not decode as `R`.
    pub undecoded: Option<Value>,
    pub error: Option<TransportError>,
}

/// Chain-tagged handle issuing engine calls over a transport.
#[derive(Debug)]
pub struct RpcWrapper<T> {
    chain: String,
    transport: T,
}

impl<T: RpcTransport> RpcWrapper<T> {
    pub fn new(chain: impl Into<String>, transport: T) -> Self {
        Self {
            chain: chain.into(),
            transport,
        }
    }

    pub fn chain(&self) -> &str {
        &self.chain
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Issues `method` and best-effort decodes its result as `R`.
    ///
    /// The in-flight exchange is dropped when the deadline passes or the token fires.
    pub async fn call<R: DeserializeOwned>(
        &self,
        options: &CallOptions,
        endpoint: &'static str,
        method: &'static str,
        params: Vec<Value>,
    ) -> RpcOutcome<R> {
        debug!(chain = %self.chain, %endpoint, %method, "engine call");

        let exchange = time::timeout(options.deadline, self.transport.request(method, params));
        let raw = match &options.cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => RawResponse::failed(TransportError::Cancelled),
                res = exchange => res.unwrap_or_else(|_| {
                    RawResponse::failed(TransportError::Timeout(options.deadline))
                }),
            },
            None => exchange
                .await
                .unwrap_or_else(|_| RawResponse::failed(TransportError::Timeout(options.deadline))),
        };

        let (decoded, undecoded) = match raw.result {
            Some(value) => match R::deserialize(&value) {
                Ok(decoded) => (Some(decoded), None),
                Err(err) => {
                    debug!(chain = %self.chain, %endpoint, %err, "failed to decode engine result");
                    (None, Some(value))
                }
            },
            None => (None, None),
        };

        RpcOutcome {
            decoded,
            undecoded,
            error: raw.error,
        }
    }
}
