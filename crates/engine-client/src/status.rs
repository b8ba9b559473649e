//! Payload statuses and the reconciliation of (result, error) pairs into one outcome.
//!
//! An execution node may answer an engine call with a well-formed status *and* an error. Whether
//! that is a success depends on the capability: each one names the statuses it accepts as a
//! [`StatusDomain`], and [`reconcile`] applies the same rule to every call site.

use std::fmt;

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::errors::{EngineClientError, TransportError};

/// Status reported by the execution layer for a payload or forkchoice update.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayloadStatusKind {
    Valid,
    Invalid,
    Syncing,
    Accepted,
}

impl PayloadStatusKind {
    pub const ALL: [PayloadStatusKind; 4] = [
        PayloadStatusKind::Valid,
        PayloadStatusKind::Invalid,
        PayloadStatusKind::Syncing,
        PayloadStatusKind::Accepted,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PayloadStatusKind::Valid => "VALID",
            PayloadStatusKind::Invalid => "INVALID",
            PayloadStatusKind::Syncing => "SYNCING",
            PayloadStatusKind::Accepted => "ACCEPTED",
        }
    }

    /// Looks up a status by its wire name.
    pub fn from_wire(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == raw)
    }
}

impl fmt::Display for PayloadStatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full payload status object as returned by `engine_newPayload*`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadStatus {
    pub status: PayloadStatusKind,
    #[serde(default)]
    pub latest_valid_hash: Option<B256>,
    #[serde(default)]
    pub validation_error: Option<String>,
}

impl PayloadStatus {
    pub fn new(status: PayloadStatusKind) -> Self {
        Self {
            status,
            latest_valid_hash: None,
            validation_error: None,
        }
    }

    pub fn with_latest_valid_hash(mut self, hash: B256) -> Self {
        self.latest_valid_hash = Some(hash);
        self
    }
}

/// Responses that carry a [`PayloadStatus`].
pub trait StatusBearing {
    fn payload_status(&self) -> &PayloadStatus;

    fn status_kind(&self) -> PayloadStatusKind {
        self.payload_status().status
    }

    /// Reads the status string out of a result that did not decode.
    fn raw_status(result: &Value) -> Option<&str> {
        result.get("status")?.as_str()
    }
}

impl StatusBearing for PayloadStatus {
    fn payload_status(&self) -> &PayloadStatus {
        self
    }
}

/// Named set of statuses a capability treats as success.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusDomain {
    name: &'static str,
    members: &'static [PayloadStatusKind],
}

/// Submitting a payload may be answered with any of the four statuses.
pub const NEW_PAYLOAD_DOMAIN: StatusDomain = StatusDomain {
    name: "new_payload",
    members: &[
        PayloadStatusKind::Valid,
        PayloadStatusKind::Invalid,
        PayloadStatusKind::Syncing,
        PayloadStatusKind::Accepted,
    ],
};

/// A forkchoice update never legitimately returns `ACCEPTED`.
pub const FORKCHOICE_DOMAIN: StatusDomain = StatusDomain {
    name: "forkchoice_updated",
    members: &[
        PayloadStatusKind::Valid,
        PayloadStatusKind::Invalid,
        PayloadStatusKind::Syncing,
    ],
};

impl StatusDomain {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn members(&self) -> &'static [PayloadStatusKind] {
        self.members
    }

    pub fn contains(&self, status: PayloadStatusKind) -> bool {
        self.members.contains(&status)
    }
}

/// Status observed in a response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ObservedStatus {
    /// No status could be read from the response.
    #[default]
    Missing,
    Known(PayloadStatusKind),
    /// A status string outside [`PayloadStatusKind`], e.g. `INVALID_BLOCK_HASH`.
    Unrecognized(String),
}

impl ObservedStatus {
    pub const NONE: ObservedStatus = ObservedStatus::Missing;

    /// Classifies a raw wire status.
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw {
            Some(raw) => PayloadStatusKind::from_wire(raw)
                .map(ObservedStatus::Known)
                .unwrap_or_else(|| ObservedStatus::Unrecognized(raw.to_owned())),
            None => ObservedStatus::Missing,
        }
    }

    pub fn kind(&self) -> Option<PayloadStatusKind> {
        match self {
            ObservedStatus::Known(kind) => Some(*kind),
            _ => None,
        }
    }
}

impl fmt::Display for ObservedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObservedStatus::Known(kind) => kind.fmt(f),
            ObservedStatus::Unrecognized(raw) => f.write_str(raw),
            ObservedStatus::Missing => f.write_str("none"),
        }
    }
}

/// Identifies a call for diagnostics.
#[derive(Clone, Copy, Debug)]
pub struct CallSite<'a> {
    pub chain: &'a str,
    pub endpoint: &'static str,
}

impl<'a> CallSite<'a> {
    pub fn new(chain: &'a str, endpoint: &'static str) -> Self {
        Self { chain, endpoint }
    }
}

/// Decides the outcome of a status-bearing call.
///
/// 1. Decoded status in `domain`: success. A transport error alongside it is logged and dropped.
/// 2. Otherwise, a transport error: [`EngineClientError::Transport`] with the observed status.
/// 3. Otherwise: [`EngineClientError::ProtocolViolation`].
///
/// `raw_status` is the status string of a result that failed to decode. It only feeds the
/// observed status of the error.
pub fn reconcile<S: StatusBearing>(
    site: &CallSite<'_>,
    domain: StatusDomain,
    decoded: Option<S>,
    raw_status: Option<&str>,
    transport_err: Option<TransportError>,
) -> Result<S, EngineClientError> {
    match decoded {
        Some(response) if domain.contains(response.status_kind()) => {
            if let Some(err) = transport_err {
                warn!(
                    chain = site.chain,
                    endpoint = site.endpoint,
                    status = %response.status_kind(),
                    %err,
                    "ignoring engine error with proper response"
                );
            }
            Ok(response)
        }
        decoded => {
            let status = match decoded {
                Some(response) => ObservedStatus::Known(response.status_kind()),
                None => ObservedStatus::from_raw(raw_status),
            };
            match transport_err {
                Some(source) => Err(EngineClientError::Transport {
                    chain: site.chain.to_owned(),
                    endpoint: site.endpoint,
                    status,
                    source,
                }),
                None => Err(EngineClientError::ProtocolViolation {
                    chain: site.chain.to_owned(),
                    endpoint: site.endpoint,
                    status,
                }),
            }
        }
    }
}

/// Decides the outcome of a call without a status domain.
///
/// Any transport error fails the call, even if a partial result decoded.
pub fn require_decoded<R>(
    site: &CallSite<'_>,
    decoded: Option<R>,
    transport_err: Option<TransportError>,
) -> Result<R, EngineClientError> {
    if let Some(source) = transport_err {
        return Err(EngineClientError::Transport {
            chain: site.chain.to_owned(),
            endpoint: site.endpoint,
            status: ObservedStatus::NONE,
            source,
        });
    }

    decoded.ok_or_else(|| EngineClientError::MalformedResult {
        chain: site.chain.to_owned(),
        endpoint: site.endpoint,
    })
}
