use serde::{Deserialize, Serialize};

use crate::errors::BridgeError;

/// Generates a `Debug` impl that redacts secret fields.
///
/// Field specifiers:
/// - `field_name`: printed normally via `&self.field_name`
/// - `redact(field_name)`: `String` field, shows `[empty]` or `[REDACTED]`
macro_rules! redact_debug {
    (@field $builder:ident, $self:ident, redact($field:ident)) => {
        $builder.field(
            stringify!($field),
            &if $self.$field.is_empty() {
                "[empty]"
            } else {
                "[REDACTED]"
            },
        );
    };
    (@field $builder:ident, $self:ident, $field:ident) => {
        $builder.field(stringify!($field), &$self.$field);
    };

    (@fields $builder:ident, $self:ident,) => {};
    (@fields $builder:ident, $self:ident, redact($field:ident), $($rest:tt)*) => {
        redact_debug!(@field $builder, $self, redact($field));
        redact_debug!(@fields $builder, $self, $($rest)*);
    };
    (@fields $builder:ident, $self:ident, $field:ident, $($rest:tt)*) => {
        redact_debug!(@field $builder, $self, $field);
        redact_debug!(@fields $builder, $self, $($rest)*);
    };

    ($struct_name:ident, $($fields:tt)*) => {
        impl std::fmt::Debug for $struct_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let mut builder = f.debug_struct(stringify!($struct_name));
                redact_debug!(@fields builder, self, $($fields)*);
                builder.finish()
            }
        }
    };
}

// Submodules are declared after the macro so they can use `redact_debug!`
mod channels;

pub use channels::*;

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Agent service
// ---------------------------------------------------------------------------

fn default_agent_url() -> String {
    "http://localhost:8080/whatsapp".to_string()
}

fn default_agent_timeout() -> u64 {
    120
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Endpoint receiving `{sender, message}` and answering with a reply.
    #[serde(default = "default_agent_url")]
    pub url: String,
    #[serde(default = "default_agent_timeout", rename = "timeoutSecs")]
    pub timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            url: default_agent_url(),
            timeout_secs: default_agent_timeout(),
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound bridge
// ---------------------------------------------------------------------------

fn default_bridge_host() -> String {
    "127.0.0.1".to_string()
}

fn default_bridge_port() -> u16 {
    8081
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_bridge_host")]
    pub host: String,
    #[serde(default = "default_bridge_port")]
    pub port: u16,
}

impl BridgeConfig {
    /// Base URL clients use to reach the bridge.
    pub fn base_url(&self) -> String {
        let host = if self.host == "0.0.0.0" {
            "127.0.0.1"
        } else {
            self.host.as_str()
        };
        format!("http://{}:{}", host, self.port)
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_bridge_host(),
            port: default_bridge_port(),
        }
    }
}

// ---------------------------------------------------------------------------
// Web chat
// ---------------------------------------------------------------------------

fn default_web_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_artifact_prefix() -> String {
    crate::stream::render::DEFAULT_ARTIFACT_PREFIX.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// Base URL of the agent's browser-facing chat API (`/api/chat`, `/api/status`).
    #[serde(default = "default_web_url")]
    pub url: String,
    /// Path generated artifacts are served under.
    #[serde(default = "default_artifact_prefix", rename = "artifactPrefix")]
    pub artifact_prefix: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            url: default_web_url(),
            artifact_prefix: default_artifact_prefix(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub channels: ChannelsConfig,
    #[serde(default)]
    pub web: WebConfig,
}

fn validate_http_url(field: &str, value: &str) -> Result<(), BridgeError> {
    match url::Url::parse(value) {
        Ok(u) if u.scheme() == "http" || u.scheme() == "https" => Ok(()),
        Ok(u) => Err(BridgeError::Config(format!(
            "{} must use http or https, got {}",
            field,
            u.scheme()
        ))),
        Err(e) => Err(BridgeError::Config(format!(
            "{} is not a valid URL ({}): {}",
            field, value, e
        ))),
    }
}

impl Config {
    /// Validate configuration values
    pub fn validate(&self) -> Result<(), BridgeError> {
        self.validate_agent()?;
        self.validate_bridge()?;
        self.validate_channels()?;
        self.validate_web()?;
        Ok(())
    }

    fn validate_agent(&self) -> Result<(), BridgeError> {
        validate_http_url("agent.url", &self.agent.url)?;
        if self.agent.timeout_secs == 0 {
            return Err(BridgeError::Config(
                "agent.timeoutSecs must be > 0".into(),
            ));
        }
        if self.agent.timeout_secs > 3600 {
            return Err(BridgeError::Config(
                "agent.timeoutSecs is unreasonably large (> 3600)".into(),
            ));
        }
        Ok(())
    }

    fn validate_bridge(&self) -> Result<(), BridgeError> {
        if self.bridge.enabled && self.bridge.port == 0 {
            return Err(BridgeError::Config("bridge.port must be > 0".into()));
        }
        Ok(())
    }

    fn validate_channels(&self) -> Result<(), BridgeError> {
        let wa = &self.channels.whatsapp;
        if !wa.enabled {
            return Ok(());
        }
        if wa.access_token.is_empty() {
            return Err(BridgeError::Config(
                "channels.whatsapp.accessToken is required when whatsapp is enabled".into(),
            ));
        }
        if wa.phone_number_id.is_empty() {
            return Err(BridgeError::Config(
                "channels.whatsapp.phoneNumberId is required when whatsapp is enabled".into(),
            ));
        }
        if wa.webhook_port == 0 {
            return Err(BridgeError::Config(
                "channels.whatsapp.webhookPort must be > 0".into(),
            ));
        }
        if !wa.webhook_path.starts_with('/') {
            return Err(BridgeError::Config(
                "channels.whatsapp.webhookPath must start with '/'".into(),
            ));
        }
        if self.bridge.enabled && wa.webhook_port == self.bridge.port {
            return Err(BridgeError::Config(
                "channels.whatsapp.webhookPort must differ from bridge.port".into(),
            ));
        }
        validate_http_url("channels.whatsapp.apiBaseUrl", &wa.api_base_url)
    }

    fn validate_web(&self) -> Result<(), BridgeError> {
        validate_http_url("web.url", &self.web.url)?;
        if !self.web.artifact_prefix.starts_with('/') {
            return Err(BridgeError::Config(
                "web.artifactPrefix must start with '/'".into(),
            ));
        }
        Ok(())
    }
}
