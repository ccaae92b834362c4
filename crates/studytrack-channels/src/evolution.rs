//! Evolution API channel: WhatsApp delivery through a self-hosted
//! Evolution gateway (Baileys integration).
//!
//! Outbound text goes to `POST /message/sendText/{instance}`. The instance
//! management calls are operator diagnostics used by the CLI.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use studytrack_core::config::EvolutionConfig;
use studytrack_core::error::{Result, StudyTrackError};
use studytrack_core::traits::MessagingChannel;

use crate::webhook::token_matches;

/// One instance as reported by `/instance/fetchInstances`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstanceInfo {
    pub name: String,
    /// Connection state; `open` means the phone is paired.
    pub status: Option<String>,
}

impl InstanceInfo {
    /// Field names moved between Evolution versions; accept all of them.
    fn from_value(value: &serde_json::Value) -> Option<Self> {
        let name = ["name", "instanceName", "instance"]
            .iter()
            .find_map(|k| value[*k].as_str())
            .or_else(|| value["instance"]["instanceName"].as_str())?;
        let status = ["status", "connectionStatus"]
            .iter()
            .find_map(|k| value[*k].as_str())
            .or_else(|| value["instance"]["status"].as_str())
            .map(String::from);
        Some(Self { name: name.to_string(), status })
    }

    pub fn is_open(&self) -> bool {
        self.status.as_deref() == Some("open")
    }
}

/// Result of asking the gateway to pair an instance.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectState {
    /// Base64 PNG of the pairing QR code.
    QrCode(String),
    AlreadyOpen,
    /// Anything else, passed through for display.
    Unknown(serde_json::Value),
}

/// WhatsApp channel backed by the Evolution API.
pub struct EvolutionChannel {
    config: EvolutionConfig,
    verify_token: Option<String>,
    client: reqwest::Client,
}

impl EvolutionChannel {
    /// Build the channel and its long-lived HTTP client.
    pub fn new(config: EvolutionConfig, verify_token: Option<String>) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| StudyTrackError::config("Evolution API key not configured"))?;

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "apikey",
            api_key
                .parse::<reqwest::header::HeaderValue>()
                .map_err(|_| StudyTrackError::config("Evolution API key is not a valid header value"))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StudyTrackError::config(format!("HTTP client: {e}")))?;

        Ok(Self { config, verify_token, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    pub fn instance_name(&self) -> &str {
        &self.config.instance_name
    }

    /// Send a plain text message to a WhatsApp number.
    pub async fn send_message(&self, number: &str, text: &str) -> Result<()> {
        let url = self.url(&format!("message/sendText/{}", self.config.instance_name));
        let body = serde_json::json!({ "number": number, "text": text });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| StudyTrackError::messaging(format!("Evolution send failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(StudyTrackError::messaging(format!("Evolution {status}: {text}")));
        }

        tracing::debug!("Evolution message accepted for {number}");
        Ok(())
    }

    /// List every instance the gateway knows about.
    pub async fn fetch_instances(&self) -> Result<Vec<InstanceInfo>> {
        let response = self
            .client
            .get(self.url("instance/fetchInstances"))
            .send()
            .await
            .map_err(|e| StudyTrackError::Http(format!("Evolution unreachable: {e}")))?;

        if response.status() == reqwest::StatusCode::FORBIDDEN {
            return Err(StudyTrackError::config("Evolution rejected the API key (403)"));
        }
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(StudyTrackError::Http(format!("Evolution {status}: {text}")));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| StudyTrackError::Http(format!("Invalid instances response: {e}")))?;

        let items = match &body {
            serde_json::Value::Array(items) => items.as_slice(),
            other => other["instances"].as_array().map(Vec::as_slice).unwrap_or_default(),
        };
        Ok(items.iter().filter_map(InstanceInfo::from_value).collect())
    }

    /// Create the configured instance. Succeeds when it already exists.
    pub async fn create_instance(&self) -> Result<()> {
        let body = serde_json::json!({
            "instanceName": self.config.instance_name,
            "qrcode": true,
            "integration": "WHATSAPP-BAILEYS",
        });

        let response = self
            .client
            .post(self.url("instance/create"))
            .json(&body)
            .send()
            .await
            .map_err(|e| StudyTrackError::Http(format!("Evolution unreachable: {e}")))?;

        match response.status() {
            s if s.is_success() => {
                tracing::info!("Instance '{}' created (or already present)", self.config.instance_name);
                Ok(())
            }
            reqwest::StatusCode::FORBIDDEN => {
                Err(StudyTrackError::config("Evolution rejected the API key (403)"))
            }
            status => {
                let text = response.text().await.unwrap_or_default();
                Err(StudyTrackError::Http(format!("Create instance {status}: {text}")))
            }
        }
    }

    /// Ask for a pairing QR code for the configured instance.
    pub async fn connect_instance(&self) -> Result<ConnectState> {
        let url = self.url(&format!("instance/connect/{}", self.config.instance_name));
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| StudyTrackError::Http(format!("Evolution unreachable: {e}")))?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| StudyTrackError::Http(format!("Invalid connect response: {e}")))?;

        if let Some(qr) = body["base64"].as_str() {
            return Ok(ConnectState::QrCode(qr.to_string()));
        }
        if body["instance"]["state"].as_str() == Some("open") {
            return Ok(ConnectState::AlreadyOpen);
        }
        Ok(ConnectState::Unknown(body))
    }
}

#[async_trait]
impl MessagingChannel for EvolutionChannel {
    fn name(&self) -> &str { "evolution" }

    async fn send_text(&self, address: &str, text: &str) -> Result<()> {
        self.send_message(address, text).await
    }

    fn verify_handshake_token(&self, candidate: &str) -> bool {
        token_matches(self.verify_token.as_deref(), candidate)
    }
}
