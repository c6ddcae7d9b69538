//! Selector-keyed dispatch of protocol calls and events.
//!
//! Handlers are bound once at setup: calls to 4-byte selectors, events to
//! their signature topic. Recognizing and decoding a payload is then one map
//! lookup plus ABI decoding.

use alloy::dyn_abi::{DecodedEvent, DynSolValue, EventExt, JsonAbiExt};
use alloy::json_abi::{Event, Function};
use alloy::primitives::{Log, LogData, Selector, B256};
use std::collections::HashMap;

use crate::abi::codec::{AbiCodec, CodecError};
use crate::blockchain::fetcher::{ParseError, ProtocolParser};
use crate::blockchain::types::EventView;

type Handler<T> = Box<dyn Fn(Vec<DynSolValue>) -> Result<T, ParseError> + Send + Sync>;

struct Entry<T> {
    function: Function,
    handler: Handler<T>,
}

/// Maps selectors to handlers producing one protocol value type.
pub struct SelectorRegistry<T> {
    entries: HashMap<Selector, Entry<T>>,
}

impl<T> SelectorRegistry<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Bind `handler` to `method` as described by `codec`.
    ///
    /// `method` is a bare name (first overload) or a full signature such as
    /// `quote(uint256,uint256)`. Fails if the ABI has no such method.
    /// Registering a method twice keeps the later handler.
    pub fn register<F>(mut self, codec: &AbiCodec, method: &str, handler: F) -> Result<Self, CodecError>
    where
        F: Fn(Vec<DynSolValue>) -> Result<T, ParseError> + Send + Sync + 'static,
    {
        let function = codec.function(method)?.clone();

        tracing::debug!(method, selector = %function.selector(), "Registered protocol handler");
        self.entries.insert(
            function.selector(),
            Entry {
                function,
                handler: Box::new(handler),
            },
        );
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Name of the method registered for the payload's selector.
    pub fn method_name(&self, payload: &[u8]) -> Option<&str> {
        self.entry(payload).map(|e| e.function.name.as_str())
    }

    fn entry(&self, payload: &[u8]) -> Option<&Entry<T>> {
        if payload.len() < 4 {
            return None;
        }
        self.entries.get(&Selector::from_slice(&payload[..4]))
    }
}

impl<T> Default for SelectorRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ProtocolParser for SelectorRegistry<T> {
    type Output = T;

    fn check_format(&self, payload: &[u8]) -> Result<(), ParseError> {
        self.entry(payload).map(|_| ()).ok_or(ParseError::FormatMismatch)
    }

    fn parse(&self, payload: &[u8]) -> Result<T, ParseError> {
        let entry = self.entry(payload).ok_or(ParseError::FormatMismatch)?;
        let args = entry
            .function
            .abi_decode_input(&payload[4..])
            .map_err(|e| ParseError::Invalid(format!("{}: {}", entry.function.name, e)))?;
        (entry.handler)(args)
    }
}

impl<T> std::fmt::Debug for SelectorRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut methods: Vec<&str> = self.entries.values().map(|e| e.function.name.as_str()).collect();
        methods.sort_unstable();
        f.debug_struct("SelectorRegistry").field("methods", &methods).finish()
    }
}

type EventHandler<T> = Box<dyn Fn(DecodedEvent) -> Result<T, ParseError> + Send + Sync>;

struct EventEntry<T> {
    event: Event,
    handler: EventHandler<T>,
}

/// Maps event signature topics to handlers producing one protocol value type.
pub struct EventRegistry<T> {
    entries: HashMap<B256, EventEntry<T>>,
}

impl<T> EventRegistry<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Bind `handler` to the event `name` (bare name or full signature).
    ///
    /// Anonymous events have no signature topic and cannot be registered.
    pub fn register<F>(mut self, codec: &AbiCodec, name: &str, handler: F) -> Result<Self, CodecError>
    where
        F: Fn(DecodedEvent) -> Result<T, ParseError> + Send + Sync + 'static,
    {
        let event = codec.event(name)?.clone();
        if event.anonymous {
            return Err(CodecError::InvalidAbi(format!(
                "event '{}' is anonymous",
                event.name
            )));
        }

        tracing::debug!(event = %event.name, topic = %event.selector(), "Registered event handler");
        self.entries.insert(
            event.selector(),
            EventEntry {
                event,
                handler: Box::new(handler),
            },
        );
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Name of the event registered for the log's signature topic.
    pub fn event_name(&self, log: &LogData) -> Option<&str> {
        self.entry(log).map(|e| e.event.name.as_str())
    }

    fn entry(&self, log: &LogData) -> Option<&EventEntry<T>> {
        log.topics().first().and_then(|topic| self.entries.get(topic))
    }

    /// Decode one log. Unregistered or topic-less logs are `FormatMismatch`.
    pub fn parse_log(&self, log: &LogData) -> Result<T, ParseError> {
        let entry = self.entry(log).ok_or(ParseError::FormatMismatch)?;
        let decoded = entry
            .event
            .decode_log(log)
            .map_err(|e| ParseError::Invalid(format!("{}: {}", entry.event.name, e)))?;
        (entry.handler)(decoded)
    }

    /// Decode every registered event in `logs`, keeping each log's index.
    ///
    /// Unregistered logs and logs that fail to decode are skipped.
    pub fn parse_logs(&self, logs: &[Log]) -> Vec<EventView<T>> {
        logs.iter()
            .enumerate()
            .filter_map(|(log_index, log)| match self.parse_log(&log.data) {
                Ok(data) => Some(EventView {
                    data,
                    address: log.address,
                    log_index,
                }),
                Err(ParseError::FormatMismatch) => None,
                Err(e) => {
                    tracing::debug!(log_index, error = %e, "Dropping undecodable log");
                    None
                }
            })
            .collect()
    }
}

impl<T> Default for EventRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for EventRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut events: Vec<&str> = self.entries.values().map(|e| e.event.name.as_str()).collect();
        events.sort_unstable();
        f.debug_struct("EventRegistry").field("events", &events).finish()
    }
}
