use super::*;

use std::{
    env, fs,
    time::{SystemTime, UNIX_EPOCH},
};

fn temp_config(contents: &str) -> std::path::PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let dir = env::temp_dir().join(format!("agent_admin_config_test_{suffix}"));
    fs::create_dir_all(&dir).expect("temp dir");
    let path = dir.join("admin.toml");
    fs::write(&path, contents).expect("write config");
    path
}

#[test]
fn defaults_apply_without_sources() {
    let settings = load_settings(None).expect("settings");
    assert_eq!(settings.server_url, Settings::default().server_url);
}

#[test]
fn explicit_file_overrides_defaults() {
    let path = temp_config("server_url = \"http://agents.internal:9000\"\nscope = \"shared\"\n");

    let settings = load_settings(Some(&path)).expect("settings");

    assert_eq!(settings.server_url, "http://agents.internal:9000");
    assert_eq!(settings.scope, Scope::Shared);
    fs::remove_dir_all(path.parent().expect("parent")).expect("cleanup");
}

#[test]
fn missing_explicit_file_is_an_error() {
    let missing = env::temp_dir().join("agent_admin_definitely_missing.toml");
    assert!(load_settings(Some(&missing)).is_err());
}

#[test]
fn environment_overrides_timeout() {
    env::set_var("AGENT_ADMIN__REQUEST_TIMEOUT_SECS", "7");
    let settings = load_settings(None).expect("settings");
    env::remove_var("AGENT_ADMIN__REQUEST_TIMEOUT_SECS");

    assert_eq!(settings.request_timeout_secs, 7);
    assert_eq!(settings.request_timeout(), Duration::from_secs(7));
}

#[test]
fn cli_flags_take_precedence() {
    let settings = Settings::default()
        .with_overrides(Some("http://localhost:1234".into()), Some(Scope::Shared));
    assert_eq!(settings.server_url, "http://localhost:1234");
    assert_eq!(settings.scope, Scope::Shared);

    let zero = Settings {
        request_timeout_secs: 0,
        ..Settings::default()
    };
    assert_eq!(zero.request_timeout(), Duration::from_secs(1));
}
