use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};

use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use traveler_common::{
    build_schema, decode, encode, map_catalog, sort_catalog, ConfigSchema, DecodeError,
    DeliveryOutcome, DeviceBridge, EncodeError, KeyMap, OutboundMessage, TimezoneOption,
    TimezoneRecord,
};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// What the configurator receives when the form is requested.
#[derive(Debug, Clone, Serialize)]
pub struct FormPayload {
    pub schema: ConfigSchema,
    #[serde(rename = "messageKeys")]
    pub message_keys: KeyMap,
}

pub enum FormClosed {
    /// The user left without submitting.
    Dismissed,
    Dispatched {
        message: OutboundMessage,
        delivery: JoinHandle<DeliveryOutcome>,
    },
}

#[derive(Debug, Default)]
pub struct BridgeDiagnostics {
    sent: AtomicU64,
    failed: AtomicU64,
    last_error: Mutex<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgeDiagnosticsView {
    pub sent: u64,
    pub failed: u64,
    #[serde(rename = "lastError")]
    pub last_error: Option<String>,
}

impl BridgeDiagnostics {
    pub fn record(&self, outcome: &DeliveryOutcome) {
        match outcome {
            DeliveryOutcome::Delivered => {
                self.sent.fetch_add(1, Ordering::Relaxed);
            }
            DeliveryOutcome::Failed(err) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                if let Ok(mut last_error) = self.last_error.lock() {
                    *last_error = Some(err.clone());
                }
            }
        }
    }

    pub fn view(&self) -> BridgeDiagnosticsView {
        BridgeDiagnosticsView {
            sent: self.sent.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            last_error: self
                .last_error
                .lock()
                .ok()
                .and_then(|last_error| last_error.clone()),
        }
    }
}

/// Runs one configuration round trip: schema out, submitted values back,
/// encoded message to the watch.
#[derive(Clone)]
pub struct ConfigSession {
    bridge: Arc<dyn DeviceBridge>,
    keys: KeyMap,
    diagnostics: Arc<BridgeDiagnostics>,
}

impl ConfigSession {
    pub fn new(bridge: Arc<dyn DeviceBridge>, keys: KeyMap) -> Self {
        Self {
            bridge,
            keys,
            diagnostics: Arc::new(BridgeDiagnostics::default()),
        }
    }

    pub fn keys(&self) -> &KeyMap {
        &self.keys
    }

    pub fn diagnostics(&self) -> BridgeDiagnosticsView {
        self.diagnostics.view()
    }

    pub fn catalog(&self, records: &[TimezoneRecord], sorted: bool) -> Vec<TimezoneOption> {
        let mut options = map_catalog(records);
        if sorted {
            sort_catalog(&mut options);
        }
        options
    }

    pub fn form_requested(&self, records: &[TimezoneRecord], sorted: bool) -> FormPayload {
        FormPayload {
            schema: build_schema(&self.catalog(records, sorted)),
            message_keys: self.keys.clone(),
        }
    }

    /// Handles the "form closed" event. The returned delivery handle is
    /// informational; the session never waits on it.
    pub fn form_closed(&self, response: Option<&str>) -> Result<FormClosed, SessionError> {
        let Some(raw) = decode(response)? else {
            info!("configuration closed without changes");
            return Ok(FormClosed::Dismissed);
        };

        let message = encode(&raw, &self.keys)?;
        if message.is_empty() {
            info!("configuration submitted with nothing to change");
        }
        debug!(
            "encoded {} of {} submitted values: {message:?}",
            message.len(),
            raw.len()
        );

        let delivery = self.dispatch(message.clone());
        Ok(FormClosed::Dispatched { message, delivery })
    }

    fn dispatch(&self, message: OutboundMessage) -> JoinHandle<DeliveryOutcome> {
        let bridge = Arc::clone(&self.bridge);
        let diagnostics = Arc::clone(&self.diagnostics);

        tokio::spawn(async move {
            let outcome = DeliveryOutcome::from(bridge.send(&message).await);
            match &outcome {
                DeliveryOutcome::Delivered => info!("configuration sent to watch"),
                DeliveryOutcome::Failed(err) => warn!("failed to send configuration: {err}"),
            }
            diagnostics.record(&outcome);
            outcome
        })
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use traveler_common::{FieldName, TransportError};

    use super::*;

    #[derive(Default)]
    struct RecordingBridge {
        fail_with: Option<String>,
        sent: Mutex<Vec<OutboundMessage>>,
    }

    #[async_trait]
    impl DeviceBridge for RecordingBridge {
        async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError> {
            self.sent.lock().unwrap().push(message.clone());
            match &self.fail_with {
                Some(reason) => Err(TransportError::Rejected(reason.clone())),
                None => Ok(()),
            }
        }
    }

    fn session_with(bridge: Arc<RecordingBridge>) -> ConfigSession {
        ConfigSession::new(bridge, KeyMap::standard())
    }

    #[tokio::test]
    async fn dismissed_form_never_reaches_the_bridge() {
        let bridge = Arc::new(RecordingBridge::default());
        let session = session_with(Arc::clone(&bridge));

        assert!(matches!(session.form_closed(None).unwrap(), FormClosed::Dismissed));
        assert!(matches!(session.form_closed(Some("")).unwrap(), FormClosed::Dismissed));

        tokio::task::yield_now().await;
        assert!(bridge.sent.lock().unwrap().is_empty());
        assert_eq!(session.diagnostics().sent, 0);
    }

    #[tokio::test]
    async fn submission_is_encoded_and_sent() {
        let bridge = Arc::new(RecordingBridge::default());
        let session = session_with(Arc::clone(&bridge));

        let closed = session
            .form_closed(Some(r#"{"10000":"Europe/London","10005":false,"10006":0}"#))
            .unwrap();
        let FormClosed::Dispatched { message, delivery } = closed else {
            panic!("expected a dispatch");
        };

        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({"HOME": "Europe/London", "ALWAYS_SHOW_HOME": 0, "BACKGROUND_COLOR": 0})
        );
        assert_eq!(delivery.await.unwrap(), DeliveryOutcome::Delivered);

        let sent = bridge.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0], message);
        assert_eq!(session.diagnostics().sent, 1);
    }

    #[tokio::test]
    async fn empty_message_is_still_dispatched() {
        let bridge = Arc::new(RecordingBridge::default());
        let session = session_with(Arc::clone(&bridge));

        let FormClosed::Dispatched { message, delivery } =
            session.form_closed(Some(r#"{"10001":""}"#)).unwrap()
        else {
            panic!("expected a dispatch");
        };

        assert!(message.is_empty());
        delivery.await.unwrap();
        assert_eq!(bridge.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn transport_failure_is_recorded_not_retried() {
        let bridge = Arc::new(RecordingBridge {
            fail_with: Some("watch app not running".to_string()),
            ..RecordingBridge::default()
        });
        let session = session_with(Arc::clone(&bridge));

        let FormClosed::Dispatched { delivery, .. } =
            session.form_closed(Some(r#"{"10010":true}"#)).unwrap()
        else {
            panic!("expected a dispatch");
        };

        let outcome = delivery.await.unwrap();
        assert!(!outcome.is_delivered());
        assert_eq!(bridge.sent.lock().unwrap().len(), 1);
        assert_eq!(
            session.diagnostics(),
            BridgeDiagnosticsView {
                sent: 0,
                failed: 1,
                last_error: Some("device rejected message: watch app not running".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn malformed_response_is_rejected_before_dispatch() {
        let bridge = Arc::new(RecordingBridge::default());
        let session = session_with(Arc::clone(&bridge));

        assert!(matches!(
            session.form_closed(Some("[]")),
            Err(SessionError::Decode(DecodeError::NotAnObject))
        ));
        assert!(matches!(
            session.form_closed(Some(r#"{"10006":"not-a-color"}"#)),
            Err(SessionError::Encode(_))
        ));

        tokio::task::yield_now().await;
        assert!(bridge.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn form_request_rebuilds_schema_from_records() {
        let session = session_with(Arc::new(RecordingBridge::default()));
        let records = vec![
            TimezoneRecord::new("Pacific/Auckland", "+12:00"),
            TimezoneRecord::new("X", ""),
            TimezoneRecord::new("America/Toronto", "-05:00"),
        ];

        let payload = session.form_requested(&records, false);
        let home = payload.schema.field(FieldName::Home).unwrap();
        let values: Vec<&str> = home
            .options
            .as_ref()
            .unwrap()
            .iter()
            .map(|option| option.value.as_str())
            .collect();
        assert_eq!(values, vec!["", "Pacific/Auckland", "America/Toronto"]);

        let sorted = session.form_requested(&records, true);
        let first = &sorted.schema.field(FieldName::Home).unwrap().options.as_ref().unwrap()[1];
        assert_eq!(first.value, "America/Toronto");

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["messageKeys"]["HOME"], 10000);
        assert!(json["schema"].is_array());
    }
}
