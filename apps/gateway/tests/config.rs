//! Tests for gateway configuration parsing.

use orca_gateway::GatewayConfig;
use provider::ProviderKind;

const SAMPLE: &str = r#"
[server]
bind = "0.0.0.0:8080"

[webhook]
secret = "hook-secret"

[selection]
analysis_model = "gpt-4o-mini"

[[providers]]
kind = "open_ai"
api_key = "sk-test"

[[providers]]
name = "anthropic"
kind = "claude"
api_key = "sk-ant-test"

[[providers]]
kind = "replicate"
api_key = "r8_test"
webhook_url = "https://gw.example/hooks/{conversation}?token=hook-secret"
"#;

#[test]
fn parses_full_config() {
    let config = GatewayConfig::from_toml(SAMPLE).unwrap();
    assert_eq!(config.server.bind, "0.0.0.0:8080");
    assert_eq!(config.webhook.secret, "hook-secret");
    assert_eq!(config.providers.len(), 3);
    assert_eq!(config.providers[0].config.kind, ProviderKind::OpenAi);
    assert_eq!(config.providers[0].name(), "openai");
    assert_eq!(config.providers[1].name(), "anthropic");
    assert_eq!(
        config.providers[2].config.webhook_url.as_deref(),
        Some("https://gw.example/hooks/{conversation}?token=hook-secret")
    );
}

#[test]
fn defaults_apply_without_sections() {
    let config = GatewayConfig::from_toml("").unwrap();
    assert_eq!(config.server.bind, "127.0.0.1:3000");
    assert!(config.webhook.secret.is_empty());
    assert_eq!(config.selection.analysis_model, "gpt-4o-mini");
    assert!(config.providers.is_empty());
}

#[test]
fn env_vars_expand_in_secrets() {
    // Safety: test-scoped env mutation.
    unsafe { std::env::set_var("ORCA_CONFIG_TEST_KEY", "sk-from-env") };
    let config = GatewayConfig::from_toml(
        "[[providers]]\nkind = \"open_ai\"\napi_key = \"${ORCA_CONFIG_TEST_KEY}\"\n",
    )
    .unwrap();
    assert_eq!(config.providers[0].config.api_key.as_deref(), Some("sk-from-env"));
}

#[test]
fn builtin_catalog_is_used_when_no_models_given() {
    let config = GatewayConfig::from_toml(SAMPLE).unwrap();
    let catalog = config.catalog().unwrap();
    assert!(catalog.get("gpt-4o").is_some());
}

#[test]
fn default_model_override_is_validated() {
    let mut config = GatewayConfig::from_toml(SAMPLE).unwrap();
    config.selection.default_model = "does-not-exist".into();
    assert!(config.catalog().is_err());
}

#[test]
fn load_reads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gateway.toml");
    std::fs::write(&path, SAMPLE).unwrap();

    let config = GatewayConfig::load(&path).unwrap();
    assert_eq!(config.providers.len(), 3);
}
