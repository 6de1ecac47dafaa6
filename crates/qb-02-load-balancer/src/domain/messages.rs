//! # Ready-For-Work Signal
//!
//! Sent by a worker to declare how many more units it can take. Travels as a
//! regular [`BusMessage`] so it goes through the same serializer as all other
//! traffic.

use shared_bus::MessageSerializer;
use shared_types::{BusMessage, Endpoint, QueueMessage};

use crate::error::LoadBalancerError;

/// Message type of readiness signals.
pub const READY_FOR_WORK_MESSAGE_TYPE: &str = "QueueBus.LoadBalancer.ReadyForWork";

const ENDPOINT_FIELD: &str = "endpoint";
const CAPACITY_FIELD: &str = "capacity";

/// A worker's declaration of free capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyForWork {
    /// Queue the worker consumes work from.
    pub endpoint: Endpoint,
    pub capacity: u32,
}

impl ReadyForWork {
    #[must_use]
    pub fn new(endpoint: Endpoint, capacity: u32) -> Self {
        Self { endpoint, capacity }
    }

    #[must_use]
    pub fn to_bus_message(&self) -> BusMessage {
        BusMessage::new(READY_FOR_WORK_MESSAGE_TYPE)
            .with_field(ENDPOINT_FIELD, self.endpoint.as_str())
            .with_field(CAPACITY_FIELD, self.capacity)
    }

    /// Read a signal from its bus message.
    ///
    /// # Errors
    ///
    /// `MalformedSignal` if the type, endpoint or capacity is wrong.
    pub fn from_bus_message(message: &BusMessage) -> Result<Self, LoadBalancerError> {
        if message.message_type != READY_FOR_WORK_MESSAGE_TYPE {
            return Err(LoadBalancerError::MalformedSignal(format!(
                "unexpected message type {}",
                message.message_type
            )));
        }

        let endpoint = message
            .plain(ENDPOINT_FIELD)
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| LoadBalancerError::MalformedSignal("missing endpoint".into()))?;
        let endpoint = Endpoint::parse(endpoint)
            .map_err(|e| LoadBalancerError::MalformedSignal(e.to_string()))?;

        let capacity = message
            .plain(CAPACITY_FIELD)
            .and_then(serde_json::Value::as_u64)
            .and_then(|c| u32::try_from(c).ok())
            .ok_or_else(|| LoadBalancerError::MalformedSignal("missing capacity".into()))?;

        Ok(Self { endpoint, capacity })
    }

    /// Encode as a queue message sent from the worker's endpoint.
    ///
    /// # Errors
    ///
    /// Propagates serializer failures.
    pub fn to_queue_message(
        &self,
        serializer: &dyn MessageSerializer,
    ) -> Result<QueueMessage, LoadBalancerError> {
        let body = serializer.encode(&self.to_bus_message())?;
        Ok(QueueMessage::new(READY_FOR_WORK_MESSAGE_TYPE, body).with_source(self.endpoint.clone()))
    }

    /// Decode from a received queue message.
    ///
    /// # Errors
    ///
    /// `Serialization` if the body does not decode, `MalformedSignal` if the
    /// decoded message is not a valid signal.
    pub fn from_queue_message(
        message: &QueueMessage,
        serializer: &dyn MessageSerializer,
    ) -> Result<Self, LoadBalancerError> {
        let decoded = serializer.decode(&message.body)?;
        Self::from_bus_message(&decoded)
    }

    /// Whether a queue message is a readiness signal.
    #[must_use]
    pub fn is_signal(message: &QueueMessage) -> bool {
        message.message_type == READY_FOR_WORK_MESSAGE_TYPE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_bus::JsonMessageSerializer;

    #[test]
    fn test_queue_message_round_trip() {
        let serializer = JsonMessageSerializer::new();
        let signal = ReadyForWork::new(Endpoint::parse("memory://workers/a").unwrap(), 4);

        let message = signal.to_queue_message(&serializer).unwrap();
        assert!(ReadyForWork::is_signal(&message));
        assert_eq!(message.source.as_ref(), Some(&signal.endpoint));
        assert_eq!(
            ReadyForWork::from_queue_message(&message, &serializer).unwrap(),
            signal
        );
    }

    #[test]
    fn test_missing_capacity_is_malformed() {
        let message = BusMessage::new(READY_FOR_WORK_MESSAGE_TYPE)
            .with_field(ENDPOINT_FIELD, "memory://workers/a");
        assert!(matches!(
            ReadyForWork::from_bus_message(&message),
            Err(LoadBalancerError::MalformedSignal(_))
        ));
    }

    #[test]
    fn test_wrong_type_is_malformed() {
        let message = BusMessage::new("Orders.Place");
        assert!(ReadyForWork::from_bus_message(&message).is_err());
    }
}
