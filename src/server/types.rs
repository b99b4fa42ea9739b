use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Liveness response for `GET /ping`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PingResponse {
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl PingResponse {
    pub fn now() -> Self {
        Self {
            message: "API is running".to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Response for `GET /health/model`
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelHealthResponse {
    pub loaded: bool,
    /// When the model finished loading; `null` until then
    #[serde(rename = "loadedAt")]
    pub loaded_at: Option<DateTime<Utc>>,
}
