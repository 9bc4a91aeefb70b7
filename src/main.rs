mod cli;

use hlsrelay::{config, server};
use hlsrelay_av::{ConnectivityProbe, EngineLocator};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "hlsrelay=trace,hlsrelay_av=trace,tower_http=debug".to_string()
        } else {
            "hlsrelay=debug,hlsrelay_av=debug,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Serve { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(serve(host, port, cli.config.as_deref()))
        }
        Commands::Probe { source, json } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(probe_source(&source, json, cli.config.as_deref()))
        }
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate { file } => {
            let path = file.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("hlsrelay {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn serve(host: Option<String>, port: Option<u16>, config_path: Option<&Path>) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    // Override host/port from CLI if specified
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config.validate()?;

    tracing::info!("Starting hlsrelay");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    server::start_server(config).await
}

async fn probe_source(source: &str, json: bool, config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let locator = EngineLocator::discover(&config.engine);
    let probe = ConnectivityProbe::new(locator.command(), config.probe.clone());

    let result = probe.probe(source).await;

    if json {
        let body = match &result {
            Ok(()) => serde_json::json!({ "source": source, "reachable": true }),
            Err(hlsrelay_core::Error::ProbeFailed(reason)) => {
                serde_json::json!({ "source": source, "reachable": false, "reason": reason })
            }
            Err(e) => serde_json::json!({ "source": source, "reachable": false, "error": e.to_string() }),
        };
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        match &result {
            Ok(()) => println!("✓ {} is reachable", source),
            Err(hlsrelay_core::Error::ProbeFailed(reason)) => {
                println!("✗ {} is not reachable", source);
                println!("  Reason: {}", reason.kind);
                println!("  Detail: {}", reason.message);
            }
            Err(e) => println!("✗ {}", e),
        }
    }

    if result.is_err() {
        anyhow::bail!("Probe failed");
    }
    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking transcoding engine...\n");

    let config = config::load_config_or_default(config_path)?;
    let info = EngineLocator::discover(&config.engine).check();

    let status = if info.available { "✓" } else { "✗" };
    print!("{} {}", status, info.name);
    if let Some(ref version) = info.version {
        print!(" ({})", version);
    }
    if let Some(ref path) = info.path {
        print!(" - {}", path.display());
    }
    println!();

    println!();
    if info.available {
        println!("The engine is available!");
    } else {
        println!("ffmpeg is missing. Install it or set engine.ffmpeg_path.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            config::load_config(p)?
        }
        None => {
            println!("No config file specified, searching default locations");
            config::load_config_or_default(None)?
        }
    };

    println!("✓ Configuration is valid");
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Output: {}", config.output.dir.display());
    println!(
        "  Segments: {}s x {}",
        config.output.segment_seconds, config.output.list_size
    );
    println!(
        "  Engine: {}",
        config
            .engine
            .ffmpeg_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "ffmpeg (PATH)".to_string())
    );
    println!("  Default quality: {}", config.stream.default_quality);

    Ok(())
}
