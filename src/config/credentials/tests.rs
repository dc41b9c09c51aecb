use super::*;
use std::collections::HashMap;

fn source(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_credential_tables_line_up() {
    assert_eq!(CREDENTIAL_NAMES.len(), CREDENTIAL_ENV_VARS.len());
    for (name, env) in CREDENTIAL_ENV_VARS {
        assert!(CREDENTIAL_NAMES.contains(name));
        assert!(env.starts_with("CLAWBRIDGE_"));
    }
}

#[test]
fn test_override_sets_secret_fields() {
    let mut config = Config::default();
    apply_overrides_from(
        &mut config,
        source(&[
            ("CLAWBRIDGE_WHATSAPP_ACCESS_TOKEN", "tok"),
            ("CLAWBRIDGE_WHATSAPP_APP_SECRET", "shh"),
            ("CLAWBRIDGE_AGENT_URL", "http://agent:9000/hook"),
        ]),
    );
    assert_eq!(config.channels.whatsapp.access_token, "tok");
    assert_eq!(config.channels.whatsapp.app_secret, "shh");
    assert_eq!(config.agent.url, "http://agent:9000/hook");
}

#[test]
fn test_empty_override_is_ignored() {
    let mut config = Config::default();
    config.channels.whatsapp.verify_token = "from-file".into();
    apply_overrides_from(
        &mut config,
        source(&[("CLAWBRIDGE_WHATSAPP_VERIFY_TOKEN", "")]),
    );
    assert_eq!(config.channels.whatsapp.verify_token, "from-file");
}

#[test]
fn test_allowed_numbers_csv_replaces_whitelist() {
    let mut config = Config::default();
    config.channels.whatsapp.allow_from = vec!["111".into()];
    apply_overrides_from(
        &mut config,
        source(&[(ALLOWED_NUMBERS_ENV, " 5511999 , ,+44 7700 ")]),
    );
    assert_eq!(
        config.channels.whatsapp.allow_from,
        vec!["447700@c.us".to_string(), "5511999@c.us".to_string()]
    );
}

#[test]
fn test_blank_allowed_numbers_keeps_whitelist() {
    let mut config = Config::default();
    config.channels.whatsapp.allow_from = vec!["111".into()];
    apply_overrides_from(&mut config, source(&[(ALLOWED_NUMBERS_ENV, " , ")]));
    assert_eq!(config.channels.whatsapp.allow_from, vec!["111".to_string()]);
}

#[test]
fn test_configured_credentials_lists_non_empty_slots() {
    let mut config = Config::default();
    config.channels.whatsapp.access_token = "tok".into();
    let names = configured_credentials(&config);
    assert!(names.contains(&"whatsapp-access-token"));
    assert!(names.contains(&"agent-url"));
    assert!(!names.contains(&"whatsapp-app-secret"));
}

#[test]
fn test_unknown_slot_has_no_value() {
    let config = Config::default();
    assert!(get_credential_value(&config, "nope").is_none());
}
