use super::*;

#[test]
fn test_load_config_missing_file_returns_default() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");
    let config = load_config(Some(&path)).unwrap();
    assert_eq!(config.bridge.port, 8081);
    assert_eq!(config.web.artifact_prefix, "/temp");
    assert!(!config.channels.whatsapp.enabled);
}

#[test]
fn test_load_config_minimal_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"bridge": {"port": 9090}}"#).unwrap();
    let config = load_config(Some(&path)).unwrap();
    assert_eq!(config.bridge.port, 9090);
    assert_eq!(config.bridge.host, "127.0.0.1");
    assert_eq!(config.agent.timeout_secs, 120);
}

#[test]
fn test_load_config_camel_case_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{
            "agent": {"url": "http://127.0.0.1:7000/whatsapp", "timeoutSecs": 30},
            "channels": {"whatsapp": {
                "enabled": true,
                "accessToken": "tok",
                "phoneNumberId": "1234",
                "allowFrom": ["+55 11 9999"]
            }},
            "web": {"artifactPrefix": "/files"}
        }"#,
    )
    .unwrap();
    let config = load_config(Some(&path)).unwrap();
    assert_eq!(config.agent.timeout_secs, 30);
    assert_eq!(config.channels.whatsapp.phone_number_id, "1234");
    assert_eq!(config.channels.whatsapp.allow_from, vec!["+55 11 9999"]);
    assert_eq!(config.web.artifact_prefix, "/files");
}

#[test]
fn test_load_config_invalid_json_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();
    let err = load_config(Some(&path)).unwrap_err();
    assert!(format!("{:#}", err).contains("parse"));
}

#[test]
fn test_load_config_validation_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"agent": {"timeoutSecs": 0}}"#).unwrap();
    let err = load_config(Some(&path)).unwrap_err();
    assert!(format!("{:#}", err).contains("timeoutSecs"));
}

#[test]
fn test_save_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.json");
    let mut config = Config::default();
    config.bridge.port = 9191;
    config.channels.whatsapp.allow_from = vec!["5511".into()];

    let written = save_config(&config, Some(&path)).unwrap();
    assert_eq!(written, path);

    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.contains("\"allowFrom\""));
    assert!(raw.contains("\"artifactPrefix\""));

    let loaded = load_config(Some(&path)).unwrap();
    assert_eq!(loaded.bridge.port, 9191);
    assert_eq!(loaded.channels.whatsapp.allow_from, vec!["5511"]);
}

#[cfg(unix)]
#[test]
fn test_save_config_restricts_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    save_config(&Config::default(), Some(&path)).unwrap();
    let mode = std::fs::metadata(&path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}
