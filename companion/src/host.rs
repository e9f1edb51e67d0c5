use std::{io::ErrorKind, net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use traveler_common::{
    canonical, from_tz_database, CompanionConfig, KeyMap, OutboundMessage, TimezoneRecord,
};

use crate::{
    bridge::{spawn_event_loop, MqttBridge},
    completion::render_completion_page,
    session::{ConfigSession, FormClosed},
};

#[derive(Clone)]
struct AppState {
    session: ConfigSession,
    records: Arc<Vec<TimezoneRecord>>,
    config: Arc<CompanionConfig>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Deserialize)]
struct FormClosedEvent {
    #[serde(default)]
    response: Option<String>,
}

#[derive(Debug, Serialize)]
struct FormClosedReply {
    dispatched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<OutboundMessage>,
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut config = load_config().await.unwrap_or_else(|err| {
        warn!("failed to load companion config: {err:#}");
        CompanionConfig::default()
    });
    apply_env_overrides(&mut config);
    config.sanitize();

    let records = load_records(&config).await?;
    info!("timezone dataset loaded with {} records", records.len());

    let keys = KeyMap::standard();
    let (bridge, eventloop) = MqttBridge::connect(&config.network, keys.clone());
    spawn_event_loop(eventloop, bridge.connection_state());
    bridge.announce().await?;
    info!(
        "key map v{} registered ({})",
        keys.version(),
        keys.fingerprint()
    );

    let app_state = AppState {
        session: ConfigSession::new(Arc::new(bridge), keys),
        records: Arc::new(records),
        config: Arc::new(config.clone()),
    };

    let app = router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind companion server at {addr}"))?;

    info!("companion listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/config", get(handle_get_config))
        .route("/api/config/closed", post(handle_form_closed))
        .route("/api/catalog", get(handle_get_catalog))
        .route("/api/message-keys", get(handle_get_message_keys))
        .route("/api/bridge/diagnostics", get(handle_get_diagnostics))
        .route("/config/complete", get(handle_get_completion_page))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn load_config() -> anyhow::Result<CompanionConfig> {
    let path = std::env::var("TRAVELER_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./traveler.json"));

    match tokio::fs::read(&path).await {
        Ok(raw) => serde_json::from_slice::<CompanionConfig>(&raw)
            .with_context(|| format!("invalid config at {}", path.display())),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(CompanionConfig::default()),
        Err(err) => Err(err.into()),
    }
}

fn apply_env_overrides(config: &mut CompanionConfig) {
    if let Ok(host) = std::env::var("MQTT_HOST") {
        config.network.mqtt_host = host;
    }
    if let Some(port) = std::env::var("MQTT_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
    {
        config.network.mqtt_port = port;
    }
    if let Ok(user) = std::env::var("MQTT_USER") {
        config.network.mqtt_user = user;
        config.network.mqtt_pass = std::env::var("MQTT_PASS").unwrap_or_default();
    }
    if let Some(port) = std::env::var("COMPANION_HTTP_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
    {
        config.http_port = port;
    }
    if let Ok(path) = std::env::var("TRAVELER_CATALOG") {
        config.catalog_path = Some(path);
    }
}

async fn load_records(config: &CompanionConfig) -> anyhow::Result<Vec<TimezoneRecord>> {
    let Some(path) = config.catalog_path.as_deref() else {
        return Ok(from_tz_database(Utc::now())
            .iter()
            .map(TimezoneRecord::from)
            .collect());
    };

    canonical::load_records(path).with_context(|| format!("failed to load timezone dataset {path}"))
}

async fn handle_get_config(State(state): State<AppState>) -> impl IntoResponse {
    Json(
        state
            .session
            .form_requested(&state.records, state.config.sort_catalog),
    )
}

async fn handle_form_closed(
    State(state): State<AppState>,
    Json(event): Json<FormClosedEvent>,
) -> impl IntoResponse {
    match state.session.form_closed(event.response.as_deref()) {
        Ok(FormClosed::Dismissed) => Json(FormClosedReply {
            dispatched: false,
            message: None,
        })
        .into_response(),
        Ok(FormClosed::Dispatched { message, .. }) => Json(FormClosedReply {
            dispatched: true,
            message: Some(message),
        })
        .into_response(),
        Err(err) => {
            warn!("rejected configuration response: {err}");
            error_response(StatusCode::BAD_REQUEST, &err.to_string())
        }
    }
}

async fn handle_get_catalog(State(state): State<AppState>) -> impl IntoResponse {
    Json(
        state
            .session
            .catalog(&state.records, state.config.sort_catalog),
    )
}

async fn handle_get_message_keys(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.session.keys().registration())
}

async fn handle_get_diagnostics(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.session.diagnostics())
}

async fn handle_get_completion_page(State(state): State<AppState>) -> impl IntoResponse {
    Html(render_completion_page(&state.config.app_version))
}

fn error_response(status: StatusCode, message: &str) -> axum::response::Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request},
    };
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use traveler_common::{DeviceBridge, TransportError};

    use super::*;

    struct AcceptingBridge;

    #[async_trait]
    impl DeviceBridge for AcceptingBridge {
        async fn send(&self, _message: &OutboundMessage) -> Result<(), TransportError> {
            Ok(())
        }
    }

    fn app() -> Router {
        router(AppState {
            session: ConfigSession::new(Arc::new(AcceptingBridge), KeyMap::standard()),
            records: Arc::new(vec![TimezoneRecord::new("Europe/London", "+00:00")]),
            config: Arc::new(CompanionConfig::default()),
        })
    }

    async fn close_form(body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/api/config/closed")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn null_or_missing_response_is_not_dispatched() {
        for body in [r#"{"response": null}"#, "{}", r#"{"response": ""}"#] {
            let (status, reply) = close_form(body).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(reply, json!({"dispatched": false}));
        }
    }

    #[tokio::test]
    async fn submitted_response_is_dispatched() {
        let (status, reply) =
            close_form(r#"{"response": "{\"10000\":\"Europe/London\",\"10005\":false}"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            reply,
            json!({"dispatched": true, "message": {"HOME": "Europe/London", "ALWAYS_SHOW_HOME": 0}})
        );
    }

    #[tokio::test]
    async fn malformed_response_is_rejected() {
        let (status, reply) = close_form(r#"{"response": "not json"}"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(reply["error"].as_str().is_some_and(|error| !error.is_empty()));
        assert!(reply.get("dispatched").is_none());
    }
}
