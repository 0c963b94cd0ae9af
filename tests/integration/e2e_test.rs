//! End-to-end integration tests

use cc_ticker::cli::{Cli, Commands, OutputFormat};
use cc_ticker::config::{Config, DEFAULT_SNAPSHOT_BASE_URL, DEFAULT_STREAM_URL};
use clap::Parser;
use std::time::Duration;

#[test]
fn test_config_example_loads() {
    let config = Config::load("config.toml.example").unwrap();
    assert_eq!(config.credentials.api_key_env, "CRYPTOCOMPARE_API_KEY");
    assert_eq!(config.stream.url, DEFAULT_STREAM_URL);
    assert_eq!(config.snapshot.base_url, DEFAULT_SNAPSHOT_BASE_URL);

    let ws = config.stream.ws_config("example-key");
    assert_eq!(ws.url, format!("{}?api_key=example-key", DEFAULT_STREAM_URL));
    assert_eq!(ws.initial_reconnect_delay, Duration::from_secs(1));
    assert_eq!(ws.max_reconnect_delay, Duration::from_secs(60));
    assert!(!ws.redacted_url().contains("example-key"));
}

#[test]
fn test_missing_credentials_are_reported() {
    let toml = r#"
        [credentials]
        api_key_env = "CC_TICKER_E2E_UNSET_KEY"
    "#;
    let config: Config = toml::from_str(toml).unwrap();
    let err = config.api_key().unwrap_err();
    assert!(err.to_string().contains("CC_TICKER_E2E_UNSET_KEY"));
}

#[test]
fn test_cli_parses_every_command() {
    let cli = Cli::try_parse_from(["cc-ticker", "watch", "BTC", "ETH"]).unwrap();
    assert!(matches!(cli.command, Commands::Watch(_)));

    let cli = Cli::try_parse_from(["cc-ticker", "snapshot", "BTC"]).unwrap();
    match cli.command {
        Commands::Snapshot(args) => assert_eq!(args.format, OutputFormat::Table),
        other => panic!("unexpected command: {:?}", other),
    }

    let cli = Cli::try_parse_from(["cc-ticker", "--config", "other.toml", "config"]).unwrap();
    assert_eq!(cli.config, "other.toml");
    assert!(matches!(cli.command, Commands::Config));
}
