//! Canonical execution payload and its per-version wire schemas.
//!
//! Conversions into the wire types are pure and never alias the caller's byte buffers: every
//! transaction and the extra data are re-allocated. Withdrawal records and the execution witness
//! are immutable behind [`Arc`] and are shared rather than copied.

use std::sync::Arc;

use alloy_eips::eip4895::Withdrawal;
use alloy_primitives::{Address, Bloom, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque execution witness carried alongside a V3 payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionWitness(pub Value);

/// Execution payload as held by the consensus-layer caller.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutionPayload {
    pub parent_hash: B256,
    pub fee_recipient: Address,
    pub state_root: B256,
    pub receipts_root: B256,
    pub logs_bloom: Bloom,
    pub prev_randao: B256,
    pub block_number: u64,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub timestamp: u64,
    pub extra_data: Bytes,
    pub base_fee_per_gas: U256,
    pub block_hash: B256,
    pub transactions: Vec<Bytes>,
    pub withdrawals: Option<Vec<Arc<Withdrawal>>>,
    pub blob_gas_used: Option<u64>,
    pub excess_blob_gas: Option<u64>,
    pub execution_witness: Option<Arc<ExecutionWitness>>,
}

/// `ExecutionPayloadV3` with the optional execution witness extension.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePayloadV3 {
    pub parent_hash: B256,
    pub fee_recipient: Address,
    pub state_root: B256,
    pub receipts_root: B256,
    pub logs_bloom: Bloom,
    pub prev_randao: B256,
    #[serde(with = "alloy_serde::quantity")]
    pub block_number: u64,
    #[serde(with = "alloy_serde::quantity")]
    pub gas_limit: u64,
    #[serde(with = "alloy_serde::quantity")]
    pub gas_used: u64,
    #[serde(with = "alloy_serde::quantity")]
    pub timestamp: u64,
    pub extra_data: Bytes,
    pub base_fee_per_gas: U256,
    pub block_hash: B256,
    pub transactions: Vec<Bytes>,
    #[serde(default)]
    pub withdrawals: Vec<Arc<Withdrawal>>,
    /// Serialized as `null` when absent, never as `0x0`.
    #[serde(default, with = "alloy_serde::quantity::opt")]
    pub blob_gas_used: Option<u64>,
    #[serde(default, with = "alloy_serde::quantity::opt")]
    pub excess_blob_gas: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_witness: Option<Arc<ExecutionWitness>>,
}

/// `ExecutionPayloadV2`: no blob gas accounting, no witness.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePayloadV2 {
    pub parent_hash: B256,
    pub fee_recipient: Address,
    pub state_root: B256,
    pub receipts_root: B256,
    pub logs_bloom: Bloom,
    pub prev_randao: B256,
    #[serde(with = "alloy_serde::quantity")]
    pub block_number: u64,
    #[serde(with = "alloy_serde::quantity")]
    pub gas_limit: u64,
    #[serde(with = "alloy_serde::quantity")]
    pub gas_used: u64,
    #[serde(with = "alloy_serde::quantity")]
    pub timestamp: u64,
    pub extra_data: Bytes,
    pub base_fee_per_gas: U256,
    pub block_hash: B256,
    pub transactions: Vec<Bytes>,
    #[serde(default)]
    pub withdrawals: Vec<Arc<Withdrawal>>,
}

fn copy_transactions(transactions: &[Bytes]) -> Vec<Bytes> {
    transactions
        .iter()
        .map(|tx| Bytes::copy_from_slice(tx))
        .collect()
}

fn share_withdrawals(withdrawals: Option<&Vec<Arc<Withdrawal>>>) -> Vec<Arc<Withdrawal>> {
    withdrawals.map(|ws| ws.to_vec()).unwrap_or_default()
}

impl From<&ExecutionPayload> for WirePayloadV3 {
    fn from(payload: &ExecutionPayload) -> Self {
        Self {
            parent_hash: payload.parent_hash,
            fee_recipient: payload.fee_recipient,
            state_root: payload.state_root,
            receipts_root: payload.receipts_root,
            logs_bloom: payload.logs_bloom,
            prev_randao: payload.prev_randao,
            block_number: payload.block_number,
            gas_limit: payload.gas_limit,
            gas_used: payload.gas_used,
            timestamp: payload.timestamp,
            extra_data: Bytes::copy_from_slice(&payload.extra_data),
            base_fee_per_gas: payload.base_fee_per_gas,
            block_hash: payload.block_hash,
            transactions: copy_transactions(&payload.transactions),
            withdrawals: share_withdrawals(payload.withdrawals.as_ref()),
            blob_gas_used: payload.blob_gas_used,
            excess_blob_gas: payload.excess_blob_gas,
            execution_witness: payload.execution_witness.clone(),
        }
    }
}

impl From<&ExecutionPayload> for WirePayloadV2 {
    fn from(payload: &ExecutionPayload) -> Self {
        Self {
            parent_hash: payload.parent_hash,
            fee_recipient: payload.fee_recipient,
            state_root: payload.state_root,
            receipts_root: payload.receipts_root,
            logs_bloom: payload.logs_bloom,
            prev_randao: payload.prev_randao,
            block_number: payload.block_number,
            gas_limit: payload.gas_limit,
            gas_used: payload.gas_used,
            timestamp: payload.timestamp,
            extra_data: Bytes::copy_from_slice(&payload.extra_data),
            base_fee_per_gas: payload.base_fee_per_gas,
            block_hash: payload.block_hash,
            transactions: copy_transactions(&payload.transactions),
            withdrawals: share_withdrawals(payload.withdrawals.as_ref()),
        }
    }
}

impl From<WirePayloadV3> for ExecutionPayload {
    fn from(wire: WirePayloadV3) -> Self {
        Self {
            parent_hash: wire.parent_hash,
            fee_recipient: wire.fee_recipient,
            state_root: wire.state_root,
            receipts_root: wire.receipts_root,
            logs_bloom: wire.logs_bloom,
            prev_randao: wire.prev_randao,
            block_number: wire.block_number,
            gas_limit: wire.gas_limit,
            gas_used: wire.gas_used,
            timestamp: wire.timestamp,
            extra_data: wire.extra_data,
            base_fee_per_gas: wire.base_fee_per_gas,
            block_hash: wire.block_hash,
            transactions: wire.transactions,
            withdrawals: Some(wire.withdrawals),
            blob_gas_used: wire.blob_gas_used,
            excess_blob_gas: wire.excess_blob_gas,
            execution_witness: wire.execution_witness,
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;

    fn sample_withdrawal(index: u64) -> Arc<Withdrawal> {
        Arc::new(Withdrawal {
            index,
            validator_index: 7,
            address: Address::repeat_byte(0x22),
            amount: 1_000,
        })
    }

    fn sample_payload() -> ExecutionPayload {
        ExecutionPayload {
            parent_hash: B256::repeat_byte(0x01),
            fee_recipient: Address::repeat_byte(0x02),
            block_number: 10,
            gas_limit: 30_000_000,
            gas_used: 21_000,
            timestamp: 1_700_000_000,
            extra_data: Bytes::from_static(b"interop"),
            base_fee_per_gas: U256::from(7u64),
            block_hash: B256::repeat_byte(0x03),
            transactions: vec![Bytes::from_static(&[0xaa]), Bytes::from_static(&[0xbb])],
            withdrawals: Some(vec![sample_withdrawal(0)]),
            ..Default::default()
        }
    }

    #[test]
    fn test_transactions_are_reallocated() {
        let payload = sample_payload();
        let wire = WirePayloadV3::from(&payload);

        assert_eq!(wire.transactions.len(), 2);
        for (src, dst) in payload.transactions.iter().zip(&wire.transactions) {
            assert_eq!(src, dst);
            assert_ne!(src.as_ptr(), dst.as_ptr());
        }
        assert_ne!(payload.extra_data.as_ptr(), wire.extra_data.as_ptr());
    }

    #[test]
    fn test_absent_collections_become_empty() {
        let payload = ExecutionPayload::default();
        let wire = WirePayloadV3::from(&payload);
        let json = serde_json::to_value(&wire).unwrap();

        assert_eq!(json["transactions"], json!([]));
        assert_eq!(json["withdrawals"], json!([]));
        assert!(json.get("executionWitness").is_none());
    }

    #[test]
    fn test_blob_gas_presence_is_preserved() {
        let mut payload = sample_payload();
        let json = serde_json::to_value(WirePayloadV3::from(&payload)).unwrap();
        assert_eq!(json["blobGasUsed"], Value::Null);
        assert_eq!(json["excessBlobGas"], Value::Null);

        payload.blob_gas_used = Some(0);
        payload.excess_blob_gas = Some(0x20000);
        let json = serde_json::to_value(WirePayloadV3::from(&payload)).unwrap();
        assert_eq!(json["blobGasUsed"], json!("0x0"));
        assert_eq!(json["excessBlobGas"], json!("0x20000"));
    }

    #[test]
    fn test_v3_wire_field_encoding() {
        let mut payload = sample_payload();
        payload.execution_witness = Some(Arc::new(ExecutionWitness(json!({"state": ["0x01"]}))));
        let json = serde_json::to_value(WirePayloadV3::from(&payload)).unwrap();

        assert_eq!(json["blockNumber"], json!("0xa"));
        assert_eq!(json["gasUsed"], json!("0x5208"));
        assert_eq!(json["baseFeePerGas"], json!("0x7"));
        assert_eq!(json["transactions"], json!(["0xaa", "0xbb"]));
        assert_eq!(json["withdrawals"][0]["validatorIndex"], json!("0x7"));
        assert_eq!(json["executionWitness"], json!({"state": ["0x01"]}));
    }

    #[test]
    fn test_v2_wire_omits_v3_fields() {
        let mut payload = sample_payload();
        payload.blob_gas_used = Some(1);
        payload.execution_witness = Some(Arc::new(ExecutionWitness::default()));
        let json = serde_json::to_value(WirePayloadV2::from(&payload)).unwrap();

        let object = json.as_object().unwrap();
        assert!(!object.contains_key("blobGasUsed"));
        assert!(!object.contains_key("excessBlobGas"));
        assert!(!object.contains_key("executionWitness"));
        assert_eq!(json["withdrawals"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_withdrawals_and_witness_are_shared() {
        let mut payload = sample_payload();
        payload.execution_witness = Some(Arc::new(ExecutionWitness(json!("0xdead"))));
        let wire = WirePayloadV3::from(&payload);

        let src = &payload.withdrawals.as_ref().unwrap()[0];
        assert!(Arc::ptr_eq(src, &wire.withdrawals[0]));
        assert!(Arc::ptr_eq(
            payload.execution_witness.as_ref().unwrap(),
            wire.execution_witness.as_ref().unwrap()
        ));
    }

    #[test]
    fn test_wire_v3_back_to_canonical() {
        let mut payload = sample_payload();
        payload.blob_gas_used = Some(131_072);
        payload.excess_blob_gas = Some(0);

        let wire = WirePayloadV3::from(&payload);
        let decoded: WirePayloadV3 =
            serde_json::from_value(serde_json::to_value(&wire).unwrap()).unwrap();
        assert_eq!(ExecutionPayload::from(decoded), payload);
    }

    fn arb_payload() -> impl Strategy<Value = ExecutionPayload> {
        (
            prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 0..8),
            prop::collection::vec(any::<u8>(), 0..32),
            prop::option::of(any::<u64>()),
            prop::option::of(any::<u64>()),
            prop::option::of(prop::collection::vec(any::<u64>(), 0..4)),
            any::<u64>(),
        )
            .prop_map(|(txs, extra, blob_gas, excess, withdrawals, number)| ExecutionPayload {
                block_number: number,
                extra_data: extra.into(),
                transactions: txs.into_iter().map(Bytes::from).collect(),
                withdrawals: withdrawals
                    .map(|indices| indices.into_iter().map(sample_withdrawal).collect()),
                blob_gas_used: blob_gas,
                excess_blob_gas: excess,
                ..Default::default()
            })
    }

    proptest! {
        #[test]
        fn prop_source_mutation_does_not_reach_wire(payload in arb_payload()) {
            let mut source = payload.clone();
            let wire = WirePayloadV3::from(&source);
            let snapshot = wire.clone();

            for tx in source.transactions.iter_mut() {
                *tx = Bytes::from_static(b"mutated");
            }
            source.transactions.push(Bytes::from_static(&[0xff]));
            source.extra_data = Bytes::new();
            source.withdrawals = None;
            source.blob_gas_used = source.blob_gas_used.map(|g| g.wrapping_add(1));

            prop_assert_eq!(&wire, &snapshot);
            prop_assert_eq!(wire, WirePayloadV3::from(&payload));
        }

        #[test]
        fn prop_wire_mutation_does_not_reach_source(payload in arb_payload()) {
            let source = payload.clone();
            let mut wire = WirePayloadV2::from(&source);

            wire.transactions.clear();
            wire.withdrawals.push(sample_withdrawal(99));
            wire.extra_data = Bytes::from_static(b"changed");

            prop_assert_eq!(source, payload);
        }

        #[test]
        fn prop_optional_scalars_keep_presence(payload in arb_payload()) {
            let wire = WirePayloadV3::from(&payload);
            prop_assert_eq!(wire.blob_gas_used, payload.blob_gas_used);
            prop_assert_eq!(wire.excess_blob_gas, payload.excess_blob_gas);
            prop_assert_eq!(wire.transactions.len(), payload.transactions.len());
            prop_assert_eq!(
                wire.withdrawals.len(),
                payload.withdrawals.as_ref().map_or(0, Vec::len)
            );
        }
    }
}
