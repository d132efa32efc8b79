use super::{normalize_api_base_url, resolve_settings, Settings};

use std::collections::HashMap;

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn defaults_without_file_or_env() {
    assert_eq!(resolve_settings(None, env_from(&[])), Settings::default());
}

#[test]
fn file_values_override_defaults() {
    let settings = resolve_settings(
        Some("api_base_url = \"https://places.example\"\nlog_filter = \"debug\"\n"),
        env_from(&[]),
    );
    assert_eq!(settings.api_base_url, "https://places.example");
    assert_eq!(settings.log_filter, "debug");
}

#[test]
fn env_beats_file_and_app_prefix_wins() {
    let settings = resolve_settings(
        Some("api_base_url = \"https://file.example\"\n"),
        env_from(&[
            ("PLACES_API_URL", "https://env.example"),
            ("APP__API_BASE_URL", "https://app.example"),
            ("PLACES_LOG", "client_core=debug"),
        ]),
    );
    assert_eq!(settings.api_base_url, "https://app.example");
    assert_eq!(settings.log_filter, "client_core=debug");
}

#[test]
fn unreadable_file_is_ignored() {
    let settings = resolve_settings(Some("api_base_url = ["), env_from(&[]));
    assert_eq!(settings, Settings::default());
}

#[test]
fn strips_trailing_slashes() {
    assert_eq!(
        normalize_api_base_url(" http://localhost:5000/ ").expect("normalize"),
        "http://localhost:5000"
    );
}

#[test]
fn blank_url_falls_back_to_default() {
    assert_eq!(
        normalize_api_base_url("  ").expect("normalize"),
        Settings::default().api_base_url
    );
}

#[test]
fn rejects_non_http_urls() {
    assert!(normalize_api_base_url("ftp://places.example").is_err());
    assert!(normalize_api_base_url("localhost:3000/api").is_err());
}
