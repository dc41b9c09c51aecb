use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelsConfig {
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,
}

fn default_api_base_url() -> String {
    "https://graph.facebook.com/v21.0".to_string()
}

fn default_webhook_host() -> String {
    "0.0.0.0".to_string()
}

fn default_webhook_port() -> u16 {
    8082
}

fn default_webhook_path() -> String {
    "/whatsapp/webhook".to_string()
}

/// WhatsApp Cloud API transport.
#[derive(Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, rename = "accessToken")]
    pub access_token: String,
    #[serde(default, rename = "phoneNumberId")]
    pub phone_number_id: String,
    /// Meta app secret; when set, inbound webhooks must carry a valid
    /// `X-Hub-Signature-256`.
    #[serde(default, rename = "appSecret")]
    pub app_secret: String,
    /// Token echoed back during the webhook verification handshake.
    #[serde(default, rename = "verifyToken")]
    pub verify_token: String,
    #[serde(default = "default_api_base_url", rename = "apiBaseUrl")]
    pub api_base_url: String,
    #[serde(default = "default_webhook_host", rename = "webhookHost")]
    pub webhook_host: String,
    #[serde(default = "default_webhook_port", rename = "webhookPort")]
    pub webhook_port: u16,
    #[serde(default = "default_webhook_path", rename = "webhookPath")]
    pub webhook_path: String,
    /// Phone numbers allowed to reach the agent. Empty allows everyone.
    #[serde(default, rename = "allowFrom")]
    pub allow_from: Vec<String>,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            access_token: String::new(),
            phone_number_id: String::new(),
            app_secret: String::new(),
            verify_token: String::new(),
            api_base_url: default_api_base_url(),
            webhook_host: default_webhook_host(),
            webhook_port: default_webhook_port(),
            webhook_path: default_webhook_path(),
            allow_from: Vec::new(),
        }
    }
}

redact_debug!(
    WhatsAppConfig,
    enabled,
    redact(access_token),
    phone_number_id,
    redact(app_secret),
    redact(verify_token),
    api_base_url,
    webhook_host,
    webhook_port,
    webhook_path,
    allow_from,
);
