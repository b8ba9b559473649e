//! Response types of the forkchoice and payload retrieval methods.

use alloy_primitives::U256;
use alloy_rpc_types_engine::{BlobsBundleV1, PayloadId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    payload::{ExecutionPayload, WirePayloadV3},
    status::{PayloadStatus, StatusBearing},
};

/// Result of `engine_forkchoiceUpdated*`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForkchoiceUpdated {
    pub payload_status: PayloadStatus,
    /// Present when payload attributes were supplied and a build started.
    #[serde(default)]
    pub payload_id: Option<PayloadId>,
}

impl ForkchoiceUpdated {
    pub fn new(payload_status: PayloadStatus) -> Self {
        Self {
            payload_status,
            payload_id: None,
        }
    }

    pub fn with_payload_id(mut self, payload_id: PayloadId) -> Self {
        self.payload_id = Some(payload_id);
        self
    }
}

impl StatusBearing for ForkchoiceUpdated {
    fn payload_status(&self) -> &PayloadStatus {
        &self.payload_status
    }

    fn raw_status(result: &Value) -> Option<&str> {
        result.get("payloadStatus")?.get("status")?.as_str()
    }
}

/// Result of `engine_getPayload*`.
///
/// The V2 response lacks the blob fields, which then decode to their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPayloadEnvelope {
    pub execution_payload: WirePayloadV3,
    pub block_value: U256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blobs_bundle: Option<BlobsBundleV1>,
    #[serde(default)]
    pub should_override_builder: bool,
}

impl ExecutionPayloadEnvelope {
    /// Converts the wire payload into the canonical form.
    pub fn into_payload(self) -> ExecutionPayload {
        self.execution_payload.into()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::status::PayloadStatusKind;

    #[test]
    fn test_forkchoice_updated_decodes_payload_id() {
        let res: ForkchoiceUpdated = serde_json::from_value(json!({
            "payloadStatus": { "status": "VALID", "latestValidHash": null },
            "payloadId": "0x0102030405060708",
        }))
        .unwrap();

        assert_eq!(res.status_kind(), PayloadStatusKind::Valid);
        assert_eq!(res.payload_id, Some(PayloadId::new([1, 2, 3, 4, 5, 6, 7, 8])));
    }

    #[test]
    fn test_forkchoice_updated_without_payload_id() {
        let res: ForkchoiceUpdated = serde_json::from_value(json!({
            "payloadStatus": { "status": "SYNCING" },
        }))
        .unwrap();
        assert_eq!(
            res,
            ForkchoiceUpdated::new(PayloadStatus::new(PayloadStatusKind::Syncing))
        );
    }

    #[test]
    fn test_raw_status_reads_nested_status() {
        let result = json!({ "payloadStatus": { "status": "INVALID_BLOCK_HASH" } });
        assert!(serde_json::from_value::<ForkchoiceUpdated>(result.clone()).is_err());
        assert_eq!(
            ForkchoiceUpdated::raw_status(&result),
            Some("INVALID_BLOCK_HASH")
        );
        assert_eq!(ForkchoiceUpdated::raw_status(&json!({ "status": "VALID" })), None);
    }

    #[test]
    fn test_v2_envelope_defaults_blob_fields() {
        let wire = WirePayloadV3::default();
        let mut payload_json = serde_json::to_value(&wire).unwrap();
        let object = payload_json.as_object_mut().unwrap();
        object.remove("blobGasUsed");
        object.remove("excessBlobGas");

        let envelope: ExecutionPayloadEnvelope = serde_json::from_value(json!({
            "executionPayload": payload_json,
            "blockValue": "0x10",
        }))
        .unwrap();

        assert_eq!(envelope.block_value, U256::from(16u64));
        assert!(envelope.blobs_bundle.is_none());
        assert!(!envelope.should_override_builder);
        let payload = envelope.into_payload();
        assert_eq!(payload.blob_gas_used, None);
        assert_eq!(payload.withdrawals, Some(vec![]));
    }
}
