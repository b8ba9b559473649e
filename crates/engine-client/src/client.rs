//! Engine API capabilities on top of the dispatch wrapper.

use std::{sync::Arc, time::Duration};

use alloy_primitives::B256;
use alloy_rpc_types_engine::{ForkchoiceState, PayloadAttributes, PayloadId};
use async_trait::async_trait;
use interop_common::metrics::{engine_call_timer, inc_engine_error};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    auth::load_jwt_secret,
    config::EngineClientConfig,
    errors::{EngineClientError, TransportError},
    methods::EngineMethod,
    payload::{ExecutionPayload, WirePayloadV2, WirePayloadV3},
    rpc::{http_transport, CallOptions, RpcTransport, RpcWrapper},
    status::{
        reconcile, require_decoded, CallSite, ObservedStatus, PayloadStatus, StatusBearing,
        StatusDomain, FORKCHOICE_DOMAIN, NEW_PAYLOAD_DOMAIN,
    },
    types::{ExecutionPayloadEnvelope, ForkchoiceUpdated},
};

/// Serializes each argument into a positional JSON-RPC param.
macro_rules! params {
    ($($param:expr),* $(,)?) => {
        (|| -> Result<Vec<Value>, serde_json::Error> {
            Ok(vec![$(serde_json::to_value($param)?),*])
        })()
    };
}

type EngineResult<T> = Result<T, EngineClientError>;

/// Consensus-layer view of an execution node.
#[cfg_attr(feature = "test-utils", mockall::automock)]
#[async_trait]
pub trait EngineApi: Send + Sync {
    /// Submits a payload over `engine_newPayloadV2`.
    async fn new_payload_v2(&self, payload: &ExecutionPayload) -> EngineResult<PayloadStatus>;

    /// Submits a payload over `engine_newPayloadV3`.
    ///
    /// An error returned alongside an in-domain status is logged, not surfaced.
    async fn new_payload_v3(
        &self,
        payload: &ExecutionPayload,
        versioned_hashes: Vec<B256>,
        parent_beacon_block_root: Option<B256>,
    ) -> EngineResult<PayloadStatus>;

    /// Updates the head over `engine_forkchoiceUpdatedV2`.
    ///
    /// A parent beacon block root in `attributes` is dropped, it is not part of the V2 schema.
    async fn forkchoice_updated_v2(
        &self,
        state: ForkchoiceState,
        attributes: Option<PayloadAttributes>,
    ) -> EngineResult<ForkchoiceUpdated>;

    /// Updates the head over `engine_forkchoiceUpdatedV3`. `ACCEPTED` is a protocol violation.
    async fn forkchoice_updated_v3(
        &self,
        state: ForkchoiceState,
        attributes: Option<PayloadAttributes>,
    ) -> EngineResult<ForkchoiceUpdated>;

    async fn get_payload_v2(&self, payload_id: PayloadId) -> EngineResult<ExecutionPayloadEnvelope>;

    /// Retrieves a built payload. Any transport error fails the call.
    async fn get_payload_v3(&self, payload_id: PayloadId) -> EngineResult<ExecutionPayloadEnvelope>;
}

/// [`EngineApi`] implementation over an [`RpcTransport`].
///
/// Cheap to clone; clones share the underlying connection.
#[derive(Debug)]
pub struct EngineClient<T = Box<dyn RpcTransport>> {
    options: CallOptions,
    rpc: Arc<RpcWrapper<T>>,
}

impl<T> Clone for EngineClient<T> {
    fn clone(&self) -> Self {
        Self {
            options: self.options.clone(),
            rpc: self.rpc.clone(),
        }
    }
}

impl EngineClient {
    /// Connects over HTTP as described by `config`, loading the JWT secret if one is set.
    pub fn from_config(config: &EngineClientConfig) -> EngineResult<Self> {
        let secret = config
            .jwt_secret
            .as_deref()
            .map(load_jwt_secret)
            .transpose()?;
        let transport: Box<dyn RpcTransport> = Box::new(http_transport(&config.rpc_url, secret)?);

        Ok(EngineClient::new(config.chain.clone(), transport)
            .with_deadline(config.request_timeout()))
    }
}

impl<T: RpcTransport> EngineClient<T> {
    pub fn new(chain: impl Into<String>, transport: T) -> Self {
        Self {
            options: CallOptions::default(),
            rpc: Arc::new(RpcWrapper::new(chain, transport)),
        }
    }

    pub fn chain(&self) -> &str {
        self.rpc.chain()
    }

    pub fn options(&self) -> &CallOptions {
        &self.options
    }

    /// Returns a handle whose calls give up after `deadline`.
    pub fn with_deadline(&self, deadline: Duration) -> Self {
        let mut scoped = self.clone();
        scoped.options = scoped.options.with_deadline(deadline);
        scoped
    }

    /// Returns a handle whose calls are aborted when `cancel` fires.
    pub fn with_cancellation(&self, cancel: CancellationToken) -> Self {
        let mut scoped = self.clone();
        scoped.options = scoped.options.with_cancellation(cancel);
        scoped
    }

    fn site(&self, method: EngineMethod) -> CallSite<'_> {
        CallSite::new(self.rpc.chain(), method.endpoint())
    }

    fn encode_failed(&self, method: EngineMethod, err: serde_json::Error) -> EngineClientError {
        EngineClientError::Transport {
            chain: self.chain().to_owned(),
            endpoint: method.endpoint(),
            status: ObservedStatus::NONE,
            source: TransportError::Encode(err.to_string()),
        }
    }

    /// Runs a status-bearing method and reconciles it against `domain`.
    async fn status_call<R>(
        &self,
        method: EngineMethod,
        domain: StatusDomain,
        params: Result<Vec<Value>, serde_json::Error>,
    ) -> EngineResult<R>
    where
        R: StatusBearing + DeserializeOwned,
    {
        let site = self.site(method);
        let _timer = engine_call_timer(site.chain, site.endpoint);

        let res = match params {
            Ok(params) => {
                let outcome = self
                    .rpc
                    .call::<R>(&self.options, method.endpoint(), method.name(), params)
                    .await;
                let raw_status = outcome.undecoded.as_ref().and_then(R::raw_status);
                reconcile(&site, domain, outcome.decoded, raw_status, outcome.error)
            }
            Err(err) => Err(self.encode_failed(method, err)),
        };

        self.record(&site, res)
    }

    /// Runs a method without a status domain.
    async fn plain_call<R: DeserializeOwned>(
        &self,
        method: EngineMethod,
        params: Result<Vec<Value>, serde_json::Error>,
    ) -> EngineResult<R> {
        let site = self.site(method);
        let _timer = engine_call_timer(site.chain, site.endpoint);

        let res = match params {
            Ok(params) => {
                let outcome = self
                    .rpc
                    .call::<R>(&self.options, method.endpoint(), method.name(), params)
                    .await;
                require_decoded(&site, outcome.decoded, outcome.error)
            }
            Err(err) => Err(self.encode_failed(method, err)),
        };

        self.record(&site, res)
    }

    fn record<R>(&self, site: &CallSite<'_>, res: EngineResult<R>) -> EngineResult<R> {
        if let Err(err) = &res {
            inc_engine_error(site.chain, site.endpoint);
            debug!(chain = site.chain, endpoint = site.endpoint, %err, "engine call failed");
        }
        res
    }
}

#[async_trait]
impl<T: RpcTransport> EngineApi for EngineClient<T> {
    async fn new_payload_v2(&self, payload: &ExecutionPayload) -> EngineResult<PayloadStatus> {
        let wire = WirePayloadV2::from(payload);
        self.status_call(EngineMethod::NewPayloadV2, NEW_PAYLOAD_DOMAIN, params!(&wire))
            .await
    }

    async fn new_payload_v3(
        &self,
        payload: &ExecutionPayload,
        versioned_hashes: Vec<B256>,
        parent_beacon_block_root: Option<B256>,
    ) -> EngineResult<PayloadStatus> {
        let wire = WirePayloadV3::from(payload);
        self.status_call(
            EngineMethod::NewPayloadV3,
            NEW_PAYLOAD_DOMAIN,
            params!(&wire, &versioned_hashes, &parent_beacon_block_root),
        )
        .await
    }

    async fn forkchoice_updated_v2(
        &self,
        state: ForkchoiceState,
        attributes: Option<PayloadAttributes>,
    ) -> EngineResult<ForkchoiceUpdated> {
        let attributes = attributes.map(|mut attrs| {
            attrs.parent_beacon_block_root = None;
            attrs
        });
        self.status_call(
            EngineMethod::ForkchoiceUpdatedV2,
            FORKCHOICE_DOMAIN,
            params!(&state, &attributes),
        )
        .await
    }

    async fn forkchoice_updated_v3(
        &self,
        state: ForkchoiceState,
        attributes: Option<PayloadAttributes>,
    ) -> EngineResult<ForkchoiceUpdated> {
        self.status_call(
            EngineMethod::ForkchoiceUpdatedV3,
            FORKCHOICE_DOMAIN,
            params!(&state, &attributes),
        )
        .await
    }

    async fn get_payload_v2(&self, payload_id: PayloadId) -> EngineResult<ExecutionPayloadEnvelope> {
        self.plain_call(EngineMethod::GetPayloadV2, params!(&payload_id))
            .await
    }

    async fn get_payload_v3(&self, payload_id: PayloadId) -> EngineResult<ExecutionPayloadEnvelope> {
        self.plain_call(EngineMethod::GetPayloadV3, params!(&payload_id))
            .await
    }
}
