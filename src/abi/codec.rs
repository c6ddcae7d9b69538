//! Call data packing, return data unpacking and event log decoding over a JSON ABI.
//!
//! Methods and events are addressed by bare name (first overload) or by full
//! signature such as `quote(uint256,uint256)`. Return data is always decoded
//! with the function whose selector prefixes the call, so overloads never mix.

use alloy::dyn_abi::{DecodedEvent, DynSolValue, EventExt, FunctionExt, JsonAbiExt};
use alloy::json_abi::{Event, Function, JsonAbi};
use alloy::primitives::{Address, Bytes, LogData, Selector, B256, U256};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("Invalid ABI: {0}")]
    InvalidAbi(String),

    #[error("Method '{0}' not found in ABI")]
    UnknownMethod(String),

    #[error("Event '{0}' not found in ABI")]
    UnknownEvent(String),

    /// Log without topics, so no signature to match against.
    #[error("Log has no event signature")]
    NoEventSignature,

    #[error("Failed to encode call: {0}")]
    Encoding(String),

    #[error("{0}")]
    Decoding(String),
}

/// ABI packing as consumed by the engines.
pub trait Codec: Send + Sync {
    /// Selector followed by the encoded arguments.
    fn encode_call(&self, method: &str, args: &[DynSolValue]) -> Result<Bytes, CodecError>;

    /// Decode `data` returned for `call`, using the function `call` was encoded for.
    fn decode_result(&self, call: &[u8], data: &[u8]) -> Result<Vec<DynSolValue>, CodecError>;

    /// Name of the method whose selector prefixes `payload`.
    fn method_for_selector(&self, payload: &[u8]) -> Option<&str>;

    /// Name of the event whose signature hash is `topic`.
    fn event_for_topic(&self, topic: &B256) -> Option<&str>;

    /// Decode a log by matching its first topic against the known events.
    fn decode_event(&self, log: &LogData) -> Result<DecodedEvent, CodecError>;
}

fn is_signature(name: &str) -> bool {
    name.contains('(')
}

/// [`Codec`] backed by an alloy [`JsonAbi`].
#[derive(Debug, Clone)]
pub struct AbiCodec {
    abi: JsonAbi,
    selectors: HashMap<Selector, Function>,
    events: HashMap<B256, Event>,
}

impl AbiCodec {
    pub fn new(abi: JsonAbi) -> Self {
        let selectors = abi.functions().map(|f| (f.selector(), f.clone())).collect();
        // Anonymous events carry no signature topic
        let events = abi
            .events()
            .filter(|e| !e.anonymous)
            .map(|e| (e.selector(), e.clone()))
            .collect();
        Self {
            abi,
            selectors,
            events,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, CodecError> {
        let abi: JsonAbi =
            serde_json::from_str(json).map_err(|e| CodecError::InvalidAbi(e.to_string()))?;
        Ok(Self::new(abi))
    }

    pub fn from_file(path: &Path) -> Result<Self, CodecError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| CodecError::InvalidAbi(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    /// Function by full signature, or the first overload of a bare name.
    pub fn function(&self, method: &str) -> Result<&Function, CodecError> {
        let found = if is_signature(method) {
            self.abi.functions().find(|f| f.signature() == method)
        } else {
            self.abi.function(method).and_then(|overloads| overloads.first())
        };
        found.ok_or_else(|| CodecError::UnknownMethod(method.to_string()))
    }

    /// Event by full signature, or the first overload of a bare name.
    pub fn event(&self, name: &str) -> Result<&Event, CodecError> {
        let found = if is_signature(name) {
            self.abi.events().find(|e| e.signature() == name)
        } else {
            self.abi.event(name).and_then(|overloads| overloads.first())
        };
        found.ok_or_else(|| CodecError::UnknownEvent(name.to_string()))
    }

    /// Function whose selector prefixes `payload`.
    pub fn function_for_selector(&self, payload: &[u8]) -> Option<&Function> {
        if payload.len() < 4 {
            return None;
        }
        self.selectors.get(&Selector::from_slice(&payload[..4]))
    }

    /// Overload whose arity matches the arguments, unless a full signature names one.
    fn function_for_args(&self, method: &str, arg_count: usize) -> Result<&Function, CodecError> {
        if is_signature(method) {
            return self.function(method);
        }
        let overloads = self
            .abi
            .function(method)
            .ok_or_else(|| CodecError::UnknownMethod(method.to_string()))?;
        overloads
            .iter()
            .find(|f| f.inputs.len() == arg_count)
            .ok_or_else(|| {
                CodecError::Encoding(format!(
                    "no overload of '{}' takes {} arguments",
                    method, arg_count
                ))
            })
    }

    pub fn abi(&self) -> &JsonAbi {
        &self.abi
    }
}

impl Codec for AbiCodec {
    fn encode_call(&self, method: &str, args: &[DynSolValue]) -> Result<Bytes, CodecError> {
        let function = self.function_for_args(method, args.len())?;
        function
            .abi_encode_input(args)
            .map(Bytes::from)
            .map_err(|e| CodecError::Encoding(format!("{}: {}", method, e)))
    }

    fn decode_result(&self, call: &[u8], data: &[u8]) -> Result<Vec<DynSolValue>, CodecError> {
        let function = self.function_for_selector(call).ok_or_else(|| {
            let prefix = &call[..call.len().min(4)];
            CodecError::UnknownMethod(format!("0x{}", alloy::primitives::hex::encode(prefix)))
        })?;
        function
            .abi_decode_output(data)
            .map_err(|e| CodecError::Decoding(format!("{} output: {}", function.name, e)))
    }

    fn method_for_selector(&self, payload: &[u8]) -> Option<&str> {
        self.function_for_selector(payload).map(|f| f.name.as_str())
    }

    fn event_for_topic(&self, topic: &B256) -> Option<&str> {
        self.events.get(topic).map(|e| e.name.as_str())
    }

    fn decode_event(&self, log: &LogData) -> Result<DecodedEvent, CodecError> {
        let topic = log.topics().first().ok_or(CodecError::NoEventSignature)?;
        let event = self
            .events
            .get(topic)
            .ok_or_else(|| CodecError::UnknownEvent(topic.to_string()))?;
        event
            .decode_log(log)
            .map_err(|e| CodecError::Decoding(format!("{} event: {}", event.name, e)))
    }
}

/// Conversion of one decoded ABI value.
pub trait FromDynValue: Sized {
    fn from_dyn(value: DynSolValue) -> Option<Self>;
}

impl FromDynValue for U256 {
    fn from_dyn(value: DynSolValue) -> Option<Self> {
        value.as_uint().map(|(v, _)| v)
    }
}

impl FromDynValue for u64 {
    fn from_dyn(value: DynSolValue) -> Option<Self> {
        value.as_uint().and_then(|(v, _)| u64::try_from(v).ok())
    }
}

impl FromDynValue for u128 {
    fn from_dyn(value: DynSolValue) -> Option<Self> {
        value.as_uint().and_then(|(v, _)| u128::try_from(v).ok())
    }
}

impl FromDynValue for bool {
    fn from_dyn(value: DynSolValue) -> Option<Self> {
        value.as_bool()
    }
}

impl FromDynValue for Address {
    fn from_dyn(value: DynSolValue) -> Option<Self> {
        value.as_address()
    }
}

impl FromDynValue for String {
    fn from_dyn(value: DynSolValue) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl FromDynValue for Bytes {
    fn from_dyn(value: DynSolValue) -> Option<Self> {
        value.as_bytes().map(|b| Bytes::copy_from_slice(b))
    }
}

impl FromDynValue for B256 {
    fn from_dyn(value: DynSolValue) -> Option<Self> {
        match value.as_fixed_bytes() {
            Some((bytes, 32)) => Some(B256::from_slice(bytes)),
            _ => None,
        }
    }
}

/// Typed view of a method's full output list.
pub trait ReturnValue: Sized {
    fn from_values(values: Vec<DynSolValue>) -> Result<Self, CodecError>;
}

fn convert<T: FromDynValue>(value: DynSolValue) -> Result<T, CodecError> {
    let shown = format!("{:?}", value);
    T::from_dyn(value).ok_or_else(|| {
        CodecError::Decoding(format!(
            "unexpected value {} for {}",
            shown,
            std::any::type_name::<T>()
        ))
    })
}

fn expect_len(values: &[DynSolValue], expected: usize) -> Result<(), CodecError> {
    if values.len() != expected {
        return Err(CodecError::Decoding(format!(
            "expected {} return values, got {}",
            expected,
            values.len()
        )));
    }
    Ok(())
}

macro_rules! single_return_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ReturnValue for $ty {
                fn from_values(values: Vec<DynSolValue>) -> Result<Self, CodecError> {
                    expect_len(&values, 1)?;
                    let mut values = values;
                    convert(values.remove(0))
                }
            }
        )*
    };
}

single_return_value!(U256, u64, u128, bool, Address, String, Bytes, B256);

impl<A: FromDynValue, B: FromDynValue> ReturnValue for (A, B) {
    fn from_values(values: Vec<DynSolValue>) -> Result<Self, CodecError> {
        expect_len(&values, 2)?;
        let mut iter = values.into_iter();
        match (iter.next(), iter.next()) {
            (Some(a), Some(b)) => Ok((convert(a)?, convert(b)?)),
            _ => Err(CodecError::Decoding("missing return values".to_string())),
        }
    }
}

/// Raw decoded values, unconverted.
impl ReturnValue for Vec<DynSolValue> {
    fn from_values(values: Vec<DynSolValue>) -> Result<Self, CodecError> {
        Ok(values)
    }
}
