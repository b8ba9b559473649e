//! Error types for the engine client.

use std::{io, path::PathBuf, time::Duration};

use thiserror::Error;

use crate::status::ObservedStatus;

/// Errors raised while building a client from its configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The JSON-RPC client could not be built for the given endpoint.
    #[error("failed to build rpc client for {url}: {reason}")]
    Client { url: String, reason: String },

    /// The JWT secret file could not be read.
    #[error("failed to read jwt secret from {path:?}: {source}")]
    JwtRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The JWT secret file exists but holds nothing.
    #[error("jwt secret file {0:?} is empty")]
    EmptyJwtSecret(PathBuf),

    /// The JWT secret is not 32 bytes of hex.
    #[error("malformed jwt secret in {path:?}: {reason}")]
    MalformedJwtSecret { path: PathBuf, reason: String },

    /// The TOML document could not be parsed.
    #[error("invalid engine client config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Failures of the underlying JSON-RPC exchange.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The peer answered with a JSON-RPC error object.
    #[error("rpc error {code}: {message}")]
    Rpc { code: i32, message: String },

    /// Connection, HTTP or framing failure.
    #[error("http transport: {0}")]
    Http(String),

    /// The exchange did not complete within the call's deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The caller's cancellation token fired before the exchange completed.
    #[error("request cancelled")]
    Cancelled,

    /// Parameters could not be serialized.
    #[error("failed to encode params: {0}")]
    Encode(String),
}

/// Failures while minting a bearer credential.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The system clock is before the unix epoch.
    #[error("system clock before unix epoch")]
    Clock,

    /// HS256 signing failed.
    #[error("failed to sign jwt: {0}")]
    Signing(String),

    /// The signed token is not a valid header value.
    #[error("invalid authorization header: {0}")]
    Header(String),
}

/// Outcome of a failed engine call.
#[derive(Debug, Error)]
pub enum EngineClientError {
    #[error("engine client config: {0}")]
    Config(#[from] ConfigError),

    /// The exchange failed and no in-domain status came back with it.
    #[error("{chain} {endpoint} failed (status {status}): {source}")]
    Transport {
        chain: String,
        endpoint: &'static str,
        status: ObservedStatus,
        #[source]
        source: TransportError,
    },

    /// The peer returned no error but a status outside the capability's domain.
    #[error("{chain} {endpoint}: nil error and unexpected status {status}")]
    ProtocolViolation {
        chain: String,
        endpoint: &'static str,
        status: ObservedStatus,
    },

    /// The peer returned no error and no decodable result.
    #[error("{chain} {endpoint}: nil error and undecodable result")]
    MalformedResult {
        chain: String,
        endpoint: &'static str,
    },
}

impl EngineClientError {
    /// Returns the transport failure behind this error, if any.
    pub fn transport_error(&self) -> Option<&TransportError> {
        match self {
            EngineClientError::Transport { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.transport_error(), Some(TransportError::Timeout(_)))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.transport_error(), Some(TransportError::Cancelled))
    }

    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            EngineClientError::ProtocolViolation { .. } | EngineClientError::MalformedResult { .. }
        )
    }
}
