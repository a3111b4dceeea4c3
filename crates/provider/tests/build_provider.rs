//! Tests for provider construction from config.

use ocore::Model;
use provider::{Provider, ProviderConfig, ProviderKind, build_provider};
use reqwest::Client;

#[test]
fn missing_key_is_a_configuration_error() {
    let config = ProviderConfig {
        kind: ProviderKind::OpenAi,
        ..Default::default()
    };
    let err = build_provider(&config, Client::new()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ocore::Error>(),
        Some(ocore::Error::Configuration(_))
    ));
}

#[test]
fn ollama_builds_without_key() {
    let config = ProviderConfig {
        kind: ProviderKind::Ollama,
        ..Default::default()
    };
    let provider = build_provider(&config, Client::new()).unwrap();
    assert!(matches!(provider, Provider::Ollama(_)));
    assert!(provider.streams());
}

#[test]
fn base_url_overrides_endpoint() {
    let config = ProviderConfig {
        kind: ProviderKind::DeepSeek,
        api_key: Some("sk-test".into()),
        base_url: Some("http://localhost:9999/v1/chat/completions".into()),
        ..Default::default()
    };
    let provider = build_provider(&config, Client::new()).unwrap();
    let Provider::OpenAi(inner) = provider else {
        panic!("expected the openai-compatible adapter");
    };
    assert_eq!(inner.endpoint(), "http://localhost:9999/v1/chat/completions");
}

#[test]
fn replicate_does_not_stream() {
    let config = ProviderConfig {
        kind: ProviderKind::Replicate,
        api_key: Some("r8_test".into()),
        webhook_url: Some("https://gw.example/hooks/{conversation}?token=t".into()),
        ..Default::default()
    };
    let provider = build_provider(&config, Client::new()).unwrap();
    assert!(!provider.streams());
}
