//! Revert reason extraction for `Error(string)` payloads.

use alloy::dyn_abi::{DynSolType, DynSolValue};
use alloy::sol_types::{Revert, SolError};
use thiserror::Error;

/// `keccak256("Error(string)")[..4]`.
pub const REVERT_SELECTOR: [u8; 4] = Revert::SELECTOR;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RevertError {
    /// Payload is not an `Error(string)` revert.
    #[error("no revert reason")]
    NoRevertReason,

    #[error("failed to decode revert reason: {0}")]
    Decoding(String),
}

/// Decode the human-readable reason from revert data.
pub fn decode_revert(data: &[u8]) -> Result<String, RevertError> {
    if data.len() < 4 || data[..4] != REVERT_SELECTOR {
        return Err(RevertError::NoRevertReason);
    }

    let params = DynSolType::Tuple(vec![DynSolType::String])
        .abi_decode_params(&data[4..])
        .map_err(|e| RevertError::Decoding(e.to_string()))?;

    match params {
        DynSolValue::Tuple(mut values) if values.len() == 1 => match values.remove(0) {
            DynSolValue::String(reason) => Ok(reason),
            other => Err(RevertError::Decoding(format!("expected string, got {:?}", other))),
        },
        other => Err(RevertError::Decoding(format!("unexpected payload {:?}", other))),
    }
}
