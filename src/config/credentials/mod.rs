use super::schema::Config;
use crate::access::Whitelist;
use tracing::debug;

/// Comma-separated override for `channels.whatsapp.allowFrom`.
pub const ALLOWED_NUMBERS_ENV: &str = "CLAWBRIDGE_WHATSAPP_ALLOWED_NUMBERS";

macro_rules! define_credentials {
    ($( $name:literal, $env:literal => $($path:ident).+ );* $(;)?) => {
        /// All known credential slot names.
        pub const CREDENTIAL_NAMES: &[&str] = &[$($name),*];

        /// (slot name, env var name) pairs.
        pub const CREDENTIAL_ENV_VARS: &[(&str, &str)] = &[$(($name, $env)),*];

        /// Get the current value of a credential field by slot name.
        pub fn get_credential_value<'a>(config: &'a Config, name: &str) -> Option<&'a str> {
            match name {
                $($name => Some(config.$($path).+.as_str()),)*
                _ => None,
            }
        }

        /// Apply overrides from an arbitrary variable source.
        ///
        /// Values that are unset or empty leave the config untouched.
        pub fn apply_overrides_from<F>(config: &mut Config, lookup: F)
        where
            F: Fn(&str) -> Option<String>,
        {
            $(
                if let Some(val) = lookup($env) {
                    if !val.is_empty() {
                        debug!("{} overridden from {}", $name, $env);
                        config.$($path).+ = val;
                    }
                }
            )*
            if let Some(csv) = lookup(ALLOWED_NUMBERS_ENV) {
                let whitelist = Whitelist::from_csv(&csv);
                if !whitelist.is_empty() {
                    debug!("whitelist overridden from {}", ALLOWED_NUMBERS_ENV);
                    config.channels.whatsapp.allow_from = whitelist.entries().to_vec();
                }
            }
        }
    };
}

define_credentials! {
    "agent-url",               "CLAWBRIDGE_AGENT_URL"               => agent.url;
    "whatsapp-access-token",   "CLAWBRIDGE_WHATSAPP_ACCESS_TOKEN"   => channels.whatsapp.access_token;
    "whatsapp-phone-number-id","CLAWBRIDGE_WHATSAPP_PHONE_NUMBER_ID" => channels.whatsapp.phone_number_id;
    "whatsapp-app-secret",     "CLAWBRIDGE_WHATSAPP_APP_SECRET"     => channels.whatsapp.app_secret;
    "whatsapp-verify-token",   "CLAWBRIDGE_WHATSAPP_VERIFY_TOKEN"   => channels.whatsapp.verify_token;
    "web-url",                 "CLAWBRIDGE_WEB_URL"                 => web.url;
}

/// Apply environment variable overrides.
///
/// Any `CLAWBRIDGE_*` env var that is set and non-empty will overwrite the
/// corresponding config field, so secrets can be injected without touching
/// the config file.
pub fn apply_env_overrides(config: &mut Config) {
    apply_overrides_from(config, |key| std::env::var(key).ok());
}

/// Names of credential slots that currently hold a value.
pub fn configured_credentials(config: &Config) -> Vec<&'static str> {
    CREDENTIAL_NAMES
        .iter()
        .copied()
        .filter(|name| get_credential_value(config, name).is_some_and(|v| !v.is_empty()))
        .collect()
}

#[cfg(test)]
mod tests;
