use async_trait::async_trait;

use crate::{error::TransportError, message::OutboundMessage};

/// Hands an encoded message to the device-messaging bridge.
///
/// `Ok` is the success channel, `Err` the failure channel; exactly one is
/// produced per call. Implementations do not retry.
#[async_trait]
pub trait DeviceBridge: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Failed(String),
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

impl From<Result<(), TransportError>> for DeliveryOutcome {
    fn from(result: Result<(), TransportError>) -> Self {
        match result {
            Ok(()) => Self::Delivered,
            Err(err) => Self::Failed(err.to_string()),
        }
    }
}
