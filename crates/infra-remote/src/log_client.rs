// Remote Log Client - fire-and-forget shipper for the external log sink

use serde_json::json;
use std::time::Duration;
use tracing::debug;

use resona_core::port::{LogLevel, LogSink};

const SHIP_TIMEOUT: Duration = Duration::from_secs(5);

/// Fire-and-forget log sink client
///
/// Ships `POST {endpoint}/log` with `{service, level, message}`. Each call
/// spawns a detached task; delivery failures are traced at debug level and
/// never reach the caller - an unreachable log sink must not affect job
/// processing. When disabled, every call is a silent no-op.
pub struct RemoteLogClient {
    client: reqwest::Client,
    endpoint: String,
    service: String,
    enabled: bool,
}

impl RemoteLogClient {
    pub fn new(service: impl Into<String>, endpoint: impl Into<String>, enabled: bool) -> Self {
        let client = reqwest::Client::builder()
            .timeout(SHIP_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            service: service.into(),
            enabled,
        }
    }
}

impl LogSink for RemoteLogClient {
    fn log(&self, level: LogLevel, message: &str) {
        if !self.enabled {
            return;
        }

        let client = self.client.clone();
        let url = format!("{}/log", self.endpoint);
        let body = json!({
            "service": self.service,
            "level": level.to_string(),
            "message": message,
        });

        tokio::spawn(async move {
            if let Err(e) = client.post(&url).json(&body).send().await {
                debug!(error = %e, "Log sink unreachable");
            }
        });
    }
}
