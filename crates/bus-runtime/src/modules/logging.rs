//! Copies bus traffic notifications to a log endpoint.

use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use shared_types::{BusMessage, Endpoint, QueueMessage};
use uuid::Uuid;

use crate::bus::EndpointRouter;
use crate::error::BusError;
use crate::modules::{MessageModule, ModuleContext};

pub const LOG_RECORD_MESSAGE_TYPE: &str = "QueueBus.Logging.MessageLogRecord";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogEvent {
    Arrived,
    Sent,
    Consumed,
    Failed,
}

impl LogEvent {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Arrived => "arrived",
            Self::Sent => "sent",
            Self::Consumed => "consumed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One traffic notification as written to the log endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageLogRecord {
    pub event: LogEvent,
    pub message_id: Uuid,
    pub message_type: String,
    /// The bus that observed the event.
    pub observer: Endpoint,
    pub source: Option<Endpoint>,
    pub destination: Option<Endpoint>,
    pub recorded_at: u64,
}

impl MessageLogRecord {
    fn new(event: LogEvent, observer: &Endpoint, message: &QueueMessage) -> Self {
        Self {
            event,
            message_id: message.id,
            message_type: message.message_type.clone(),
            observer: observer.clone(),
            source: message.source.clone(),
            destination: None,
            recorded_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        }
    }

    #[must_use]
    pub fn to_bus_message(&self) -> BusMessage {
        let mut message = BusMessage::new(LOG_RECORD_MESSAGE_TYPE)
            .with_field("event", self.event.name())
            .with_field("messageId", self.message_id.to_string())
            .with_field("messageType", self.message_type.as_str())
            .with_field("observer", self.observer.as_str())
            .with_field("recordedAt", self.recorded_at);
        if let Some(source) = &self.source {
            message = message.with_field("source", source.as_str());
        }
        if let Some(destination) = &self.destination {
            message = message.with_field("destination", destination.as_str());
        }
        message
    }
}

/// Writes a [`MessageLogRecord`] for every arrival, send and consumption.
pub struct MessageLoggingModule {
    log_endpoint: Endpoint,
    router: Arc<EndpointRouter>,
}

impl MessageLoggingModule {
    #[must_use]
    pub fn new(log_endpoint: Endpoint, router: Arc<EndpointRouter>) -> Self {
        Self {
            log_endpoint,
            router,
        }
    }

    #[must_use]
    pub fn log_endpoint(&self) -> &Endpoint {
        &self.log_endpoint
    }

    async fn write(&self, ctx: &ModuleContext, record: MessageLogRecord) -> Result<(), BusError> {
        let body = ctx.serializer.encode(&record.to_bus_message())?;
        let message =
            QueueMessage::new(LOG_RECORD_MESSAGE_TYPE, body).with_source(ctx.endpoint.clone());
        let destination = self.router.resolve(&self.log_endpoint);
        ctx.transport.send(&destination, message, None).await?;
        Ok(())
    }
}

#[async_trait]
impl MessageModule for MessageLoggingModule {
    fn name(&self) -> &str {
        "message-logging"
    }

    async fn on_message_arrived(
        &self,
        ctx: &ModuleContext,
        message: &QueueMessage,
    ) -> Result<(), BusError> {
        self.write(ctx, MessageLogRecord::new(LogEvent::Arrived, &ctx.endpoint, message))
            .await
    }

    async fn on_message_consumed(
        &self,
        ctx: &ModuleContext,
        message: &QueueMessage,
        succeeded: bool,
    ) -> Result<(), BusError> {
        let event = if succeeded {
            LogEvent::Consumed
        } else {
            LogEvent::Failed
        };
        self.write(ctx, MessageLogRecord::new(event, &ctx.endpoint, message))
            .await
    }

    async fn on_message_sent(
        &self,
        ctx: &ModuleContext,
        destination: &Endpoint,
        message: &QueueMessage,
    ) -> Result<(), BusError> {
        let mut record = MessageLogRecord::new(LogEvent::Sent, &ctx.endpoint, message);
        record.destination = Some(destination.clone());
        self.write(ctx, record).await
    }
}
