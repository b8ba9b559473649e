//! Catalog of the Engine API methods this client speaks.

use std::fmt;

use crate::status::{StatusDomain, FORKCHOICE_DOMAIN, NEW_PAYLOAD_DOMAIN};

/// What the caller wants the execution layer to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Submit a block for validation and import.
    NewPayload,
    /// Move the canonical head and optionally start a payload build.
    ForkchoiceUpdated,
    /// Retrieve a payload built after a forkchoice update.
    GetPayload,
}

impl Capability {
    /// Statuses accepted as success for this capability.
    ///
    /// Payload retrieval carries no status, so it has no domain.
    pub fn status_domain(self) -> Option<StatusDomain> {
        match self {
            Capability::NewPayload => Some(NEW_PAYLOAD_DOMAIN),
            Capability::ForkchoiceUpdated => Some(FORKCHOICE_DOMAIN),
            Capability::GetPayload => None,
        }
    }
}

/// Engine API schema version.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EngineVersion {
    V2,
    V3,
}

/// A concrete remote method.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EngineMethod {
    NewPayloadV2,
    NewPayloadV3,
    ForkchoiceUpdatedV2,
    ForkchoiceUpdatedV3,
    GetPayloadV2,
    GetPayloadV3,
}

impl EngineMethod {
    pub const ALL: [EngineMethod; 6] = [
        EngineMethod::NewPayloadV2,
        EngineMethod::NewPayloadV3,
        EngineMethod::ForkchoiceUpdatedV2,
        EngineMethod::ForkchoiceUpdatedV3,
        EngineMethod::GetPayloadV2,
        EngineMethod::GetPayloadV3,
    ];

    pub fn new(capability: Capability, version: EngineVersion) -> Self {
        match (capability, version) {
            (Capability::NewPayload, EngineVersion::V2) => EngineMethod::NewPayloadV2,
            (Capability::NewPayload, EngineVersion::V3) => EngineMethod::NewPayloadV3,
            (Capability::ForkchoiceUpdated, EngineVersion::V2) => EngineMethod::ForkchoiceUpdatedV2,
            (Capability::ForkchoiceUpdated, EngineVersion::V3) => EngineMethod::ForkchoiceUpdatedV3,
            (Capability::GetPayload, EngineVersion::V2) => EngineMethod::GetPayloadV2,
            (Capability::GetPayload, EngineVersion::V3) => EngineMethod::GetPayloadV3,
        }
    }

    /// JSON-RPC method name.
    pub fn name(self) -> &'static str {
        match self {
            EngineMethod::NewPayloadV2 => "engine_newPayloadV2",
            EngineMethod::NewPayloadV3 => "engine_newPayloadV3",
            EngineMethod::ForkchoiceUpdatedV2 => "engine_forkchoiceUpdatedV2",
            EngineMethod::ForkchoiceUpdatedV3 => "engine_forkchoiceUpdatedV3",
            EngineMethod::GetPayloadV2 => "engine_getPayloadV2",
            EngineMethod::GetPayloadV3 => "engine_getPayloadV3",
        }
    }

    /// Label used for metrics and logs.
    pub fn endpoint(self) -> &'static str {
        match self {
            EngineMethod::NewPayloadV2 => "new_payload_v2",
            EngineMethod::NewPayloadV3 => "new_payload_v3",
            EngineMethod::ForkchoiceUpdatedV2 => "forkchoice_updated_v2",
            EngineMethod::ForkchoiceUpdatedV3 => "forkchoice_updated_v3",
            EngineMethod::GetPayloadV2 => "get_payload_v2",
            EngineMethod::GetPayloadV3 => "get_payload_v3",
        }
    }

    pub fn capability(self) -> Capability {
        match self {
            EngineMethod::NewPayloadV2 | EngineMethod::NewPayloadV3 => Capability::NewPayload,
            EngineMethod::ForkchoiceUpdatedV2 | EngineMethod::ForkchoiceUpdatedV3 => {
                Capability::ForkchoiceUpdated
            }
            EngineMethod::GetPayloadV2 | EngineMethod::GetPayloadV3 => Capability::GetPayload,
        }
    }

    pub fn version(self) -> EngineVersion {
        match self {
            EngineMethod::NewPayloadV2
            | EngineMethod::ForkchoiceUpdatedV2
            | EngineMethod::GetPayloadV2 => EngineVersion::V2,
            EngineMethod::NewPayloadV3
            | EngineMethod::ForkchoiceUpdatedV3
            | EngineMethod::GetPayloadV3 => EngineVersion::V3,
        }
    }
}

impl fmt::Display for EngineMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
