mod cli;

use reelserve::{catalog, config, server};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::sync::Arc;

async fn start_server(host: String, port: u16, config_path: Option<&std::path::Path>) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    // Override host/port from CLI if specified
    config.server.host = host;
    config.server.port = port;

    tracing::info!("Starting reelserve");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    let catalog = Arc::new(catalog::Catalog::new(config.library.media_root.clone()));

    if config.library.scan_on_start {
        let media_root = config.library.media_root.clone();
        let extensions = config.library.extensions.clone();
        let scanned =
            tokio::task::spawn_blocking(move || catalog::scan_directory(&media_root, &extensions))
                .await?;
        let added = catalog.absorb_scan(scanned);
        tracing::info!(added, "initial library scan complete");
    }

    server::start_server(config, catalog).await
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise pick defaults from the verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "reelserve=trace,tower_http=debug".to_string()
        } else {
            "reelserve=debug,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Serve { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Scan { json } => scan_library(cli.config.as_deref(), json),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("reelserve {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn scan_library(config_path: Option<&std::path::Path>, json: bool) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    if !config.library.media_root.exists() {
        anyhow::bail!(
            "Media root does not exist: {:?}",
            config.library.media_root
        );
    }

    let found = catalog::scan_directory(&config.library.media_root, &config.library.extensions);

    if json {
        let items: Vec<_> = found
            .iter()
            .map(|f| {
                serde_json::json!({
                    "title": f.title,
                    "path": f.path,
                    "format": f.format,
                    "size": f.size,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        for file in &found {
            println!("{} ({}, {} bytes)", file.title, file.format, file.size);
        }
        println!("\n{} movies found", found.len());
    }

    Ok(())
}

fn validate_config(path: Option<&std::path::Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Media root: {:?}", config.library.media_root);
            println!("  Extensions: {}", config.library.extensions.join(", "));
            println!("  Chunk cap: {} bytes", config.streaming.max_chunk_bytes);
            println!("  ffmpeg: {:?}", config.ffmpeg_path());
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Media root: {:?}", config.library.media_root);
        }
    }

    Ok(())
}
