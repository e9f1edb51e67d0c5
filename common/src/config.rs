use serde::{Deserialize, Serialize};

pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_MQTT_PORT: u16 = 1883;
pub const DEFAULT_CLIENT_ID: &str = "traveler-companion";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BridgeNetworkConfig {
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_user: String,
    pub mqtt_pass: String,
    pub client_id: String,
}

impl Default for BridgeNetworkConfig {
    fn default() -> Self {
        Self {
            mqtt_host: "127.0.0.1".to_string(),
            mqtt_port: DEFAULT_MQTT_PORT,
            mqtt_user: String::new(),
            mqtt_pass: String::new(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CompanionConfig {
    pub http_port: u16,
    /// Canonical dataset on disk. Without one the IANA database is used.
    pub catalog_path: Option<String>,
    /// Alphabetical option order. Off keeps the dataset order.
    pub sort_catalog: bool,
    pub app_version: String,
    pub network: BridgeNetworkConfig,
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            catalog_path: None,
            sort_catalog: false,
            app_version: "2.0.0".to_string(),
            network: BridgeNetworkConfig::default(),
        }
    }
}

impl CompanionConfig {
    pub fn sanitize(&mut self) {
        if self.http_port == 0 {
            self.http_port = DEFAULT_HTTP_PORT;
        }
        if self.network.mqtt_port == 0 {
            self.network.mqtt_port = DEFAULT_MQTT_PORT;
        }
        if self.network.client_id.trim().is_empty() {
            self.network.client_id = DEFAULT_CLIENT_ID.to_string();
        }
        if self
            .catalog_path
            .as_deref()
            .is_some_and(|path| path.trim().is_empty())
        {
            self.catalog_path = None;
        }
    }
}
