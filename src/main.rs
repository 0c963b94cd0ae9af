use cc_ticker::cli::{Cli, Commands};
use cc_ticker::config::Config;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = if std::path::Path::new(&cli.config).exists() {
        Config::load(&cli.config)?
    } else {
        eprintln!("Warning: {} not found, using default configuration", cli.config);
        Config::default()
    };

    // Initialize telemetry
    cc_ticker::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Watch(args) => {
            tracing::info!(symbols = ?args.symbols, "Starting live ticker");
            args.execute(&config).await?;
        }
        Commands::Snapshot(args) => {
            args.execute(&config).await?;
        }
        Commands::Config => {
            let key_state = if config.api_key().is_ok() { "set" } else { "missing" };
            println!("Current configuration:");
            println!(
                "  Credentials: ${} ({})",
                config.credentials.api_key_env, key_state
            );
            println!("  Stream: {}", config.stream.url);
            println!(
                "  Reconnect: {}ms..{}ms, max attempts {}",
                config.stream.initial_reconnect_delay_ms,
                config.stream.max_reconnect_delay_ms,
                match config.stream.max_reconnect_attempts {
                    0 => "unlimited".to_string(),
                    n => n.to_string(),
                }
            );
            println!("  Snapshot: {}", config.snapshot.base_url);
            println!(
                "  Telemetry: level={} format={:?} metrics_port={:?}",
                config.telemetry.log_level,
                config.telemetry.log_format,
                config.telemetry.metrics_port
            );
        }
    }

    Ok(())
}
