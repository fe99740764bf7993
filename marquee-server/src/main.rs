//! # Marquee Server
//!
//! Catalog front end for a streaming client.
//!
//! - **Streams**: races mirror sources in tiers and remembers the winner
//! - **Categories**: regional listings aggregated from TMDB discover queries
//! - **Details**: stale-while-revalidate title records, seasons and episodes
//! - **Discovery**: hero banner, search and trending
//!
//! Redis backs every cache; without it the server runs on an in-process
//! store.

use anyhow::Context;
use axum::{Router, http::HeaderValue};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::{net::SocketAddr, path::PathBuf};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use marquee_config::{Config, ConfigLoad, ConfigLoader, CorsConfig};
use marquee_core::{cache::CacheClient, catalog::CategoryCatalog};
use marquee_server::{
    AppState,
    infra::startup::{
        ProdStartupHooks, StartupHooks, build_state, connect_cache, production_upstreams,
    },
    routes,
};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "marquee-server")]
#[command(about = "Stream resolver and TMDB catalog cache")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(ClapArgs, Debug, Clone)]
struct ServeArgs {
    /// Server port (overrides config)
    #[arg(short, long, env = "SERVER_PORT")]
    port: Option<u16>,

    /// Server host (overrides config)
    #[arg(long, env = "SERVER_HOST")]
    host: Option<String>,

    /// Path to marquee.toml (defaults to ./marquee.toml or config/marquee.toml)
    #[arg(long, env = "MARQUEE_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Path to a .env file (defaults to ./.env)
    #[arg(long)]
    env_file: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(subcommand)]
    Cache(CacheCommand),
}

#[derive(Debug, Subcommand)]
enum CacheCommand {
    /// Delete cached listings, details, search results and stream sources
    Purge {
        /// Only delete keys starting with this prefix
        #[arg(long)]
        prefix: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(command) = cli.command {
        match command {
            Command::Cache(CacheCommand::Purge { prefix }) => {
                run_cache_purge(&cli.serve, prefix).await?;
                return Ok(());
            }
        }
    }

    run_server(cli.serve).await
}

fn load_runtime_config(args: &ServeArgs) -> anyhow::Result<Config> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = args.config.clone() {
        loader = loader.with_config_path(path);
    }
    if let Some(path) = args.env_file.clone() {
        loader = loader.with_env_file(path);
    }

    let ConfigLoad {
        mut config,
        warnings,
    } = loader.load().context("failed to load configuration")?;

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = args.host.clone() {
        config.server.host = host;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if config.metadata.env_file_loaded {
        info!("loaded .env file");
    }
    if let Some(path) = config.metadata.config_path.as_ref() {
        info!(path = %path.display(), "configuration file loaded");
    }

    for warning in warnings.iter() {
        match &warning.hint {
            Some(hint) => {
                warn!(message = %warning.message, hint = %hint, "configuration warning")
            }
            None => {
                warn!(message = %warning.message, "configuration warning")
            }
        }
    }

    Ok(config)
}

async fn run_cache_purge(args: &ServeArgs, prefix: Option<String>) -> anyhow::Result<()> {
    let config = load_runtime_config(args)?;
    let cache = CacheClient::new(connect_cache(&config).await?)
        .with_operation_timeout(config.cache.operation_timeout);

    let prefixes = match prefix {
        Some(prefix) => vec![prefix],
        None => default_purge_prefixes(&CategoryCatalog::default()),
    };

    let mut removed = 0;
    for prefix in &prefixes {
        let count = cache
            .delete_prefix(prefix)
            .await
            .with_context(|| format!("failed to purge keys under '{prefix}'"))?;
        info!(prefix = %prefix, count, "purged cache keys");
        removed += count;
    }

    info!(removed, "cache purge complete");
    Ok(())
}

/// Every derived namespace. The offline watchlist is client data and is
/// left alone unless asked for by prefix.
fn default_purge_prefixes(categories: &CategoryCatalog) -> Vec<String> {
    let mut prefixes: Vec<String> = categories
        .names()
        .map(|name| format!("{name}:"))
        .collect();
    prefixes.extend(
        [
            "stream:",
            "movie:details:",
            "tv:details:",
            "search:",
            "genre:",
            "trending:",
            "home:hero",
        ]
        .map(String::from),
    );
    prefixes
}

async fn run_server(args: ServeArgs) -> anyhow::Result<()> {
    let config = load_runtime_config(&args)?;
    let addr: SocketAddr = config
        .server
        .bind_address()
        .parse()
        .with_context(|| format!("invalid bind address {}", config.server.bind_address()))?;

    let upstreams = production_upstreams(&config).await?;
    let state = build_state(config, upstreams)?;
    ProdStartupHooks.run(&state).await?;

    let app = create_app(state.clone());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "marquee-server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    state.shutdown();
    info!("marquee-server stopped");
    Ok(())
}

fn create_app(state: AppState) -> Router {
    let cors_layer = cors_layer(&state.config().cors);

    routes::create_api_router()
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    if cors.is_wildcard_included() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = cors
        .allowed_origins
        .iter()
        .filter_map(|s| HeaderValue::from_str(s.trim()).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
