//! Engine API client used by the consensus layer to drive an execution node.
//!
//! Calls go out over JSON-RPC with a freshly minted JWT per request. Each result is reconciled
//! against the status domain of its capability, so a well-formed status that arrives together
//! with an error is still treated as an answer.

mod auth;
mod client;
mod config;
mod errors;
mod methods;
mod payload;
mod rpc;
mod status;
mod types;

pub use auth::{load_jwt_secret, mint_token, JwtAuthLayer, JwtAuthService};
#[cfg(feature = "test-utils")]
pub use client::MockEngineApi;
pub use client::{EngineApi, EngineClient};
pub use config::EngineClientConfig;
pub use errors::{AuthError, ConfigError, EngineClientError, TransportError};
pub use methods::{Capability, EngineMethod, EngineVersion};
pub use payload::{ExecutionPayload, ExecutionWitness, WirePayloadV2, WirePayloadV3};
#[cfg(feature = "test-utils")]
pub use rpc::MockRpcTransport;
pub use rpc::{
    http_transport, CallOptions, HttpTransport, RawResponse, RpcOutcome, RpcTransport, RpcWrapper,
    DEFAULT_REQUEST_TIMEOUT, MAX_REQUEST_TIMEOUT,
};
pub use status::{
    reconcile, require_decoded, CallSite, ObservedStatus, PayloadStatus, PayloadStatusKind,
    StatusBearing, StatusDomain, FORKCHOICE_DOMAIN, NEW_PAYLOAD_DOMAIN,
};
pub use types::{ExecutionPayloadEnvelope, ForkchoiceUpdated};
