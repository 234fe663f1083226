//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use mindgraph_core::ChatPipeline;
use mindgraph_gemini::GeminiClient;
use mindgraph_shared::{
    AppConfig, expand_home, init_config, init_config_at, load_config, load_config_from,
    resolve_api_key, resolve_store_token,
};
use mindgraph_storage::Storage;
use tracing::info;

use crate::routes::{self, AppState};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// MindGraph: answer questions and map them into a knowledge graph.
#[derive(Parser)]
#[command(
    name = "mindgraph",
    version,
    about = "Answer questions with Gemini and record each exchange as a knowledge graph.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.mindgraph/mindgraph.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Defaults to `serve`.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Start the HTTP API.
    Serve(ServeArgs),

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Overrides for the `[server]`, `[gemini]` and `[graph_store]` sections.
#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Interface to bind.
    #[arg(long, env = "MINDGRAPH_BIND")]
    pub bind: Option<String>,

    /// TCP port.
    #[arg(long, env = "MINDGRAPH_PORT")]
    pub port: Option<u16>,

    /// Gemini model id.
    #[arg(long, env = "GEMINI_MODEL")]
    pub model: Option<String>,

    /// Local graph database file.
    #[arg(long, env = "MINDGRAPH_DB")]
    pub db: Option<String>,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Write a default config file to --config or ~/.mindgraph/mindgraph.toml.
    Init,
    /// Print the effective configuration.
    Show(ServeArgs),
}

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Initialize the tracing subscriber from verbosity and log format.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "mindgraph=info,tower_http=info",
        1 => "mindgraph=debug,tower_http=debug",
        _ => "mindgraph=trace,tower_http=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => {
            let config = effective_config(cli.config.as_deref(), &args)?;
            cmd_serve(config).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => {
                let path = match cli.config {
                    Some(path) => {
                        init_config_at(&path)?;
                        path
                    }
                    None => init_config()?,
                };
                println!("Created {}", path.display());
                Ok(())
            }
            ConfigAction::Show(args) => {
                let config = effective_config(cli.config.as_deref(), &args)?;
                let rendered = toml::to_string_pretty(&config)
                    .wrap_err("failed to render config as TOML")?;
                print!("{rendered}");
                Ok(())
            }
        },
    }
}

/// Load the config file (or defaults) and layer CLI/env overrides on top.
fn effective_config(path: Option<&std::path::Path>, args: &ServeArgs) -> Result<AppConfig> {
    let mut config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    apply_overrides(&mut config, args);
    Ok(config)
}

fn apply_overrides(config: &mut AppConfig, args: &ServeArgs) {
    if let Some(bind) = &args.bind {
        config.server.bind = bind.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(model) = &args.model {
        config.gemini.model = model.clone();
    }
    if let Some(db) = &args.db {
        config.graph_store.path = db.clone();
        config.graph_store.url = None;
    }
}

/// Validate configuration, open collaborators, and serve until shutdown.
async fn cmd_serve(config: AppConfig) -> Result<()> {
    // Fail fast on missing credentials before touching the network.
    let api_key = resolve_api_key(&config.gemini)?;
    let store_token = resolve_store_token(&config.graph_store)?;
    let cors = routes::cors_layer(&config.server.cors_origins)?;

    let generator = GeminiClient::new(&config.gemini, api_key)?;

    let storage = match (&config.graph_store.url, store_token) {
        (Some(url), Some(token)) => {
            info!(%url, "connecting to remote graph store");
            Storage::open_remote(url, &token).await?
        }
        _ => {
            let path = expand_home(&config.graph_store.path)?;
            info!(path = %path.display(), "opening local graph store");
            Storage::open(&path).await?
        }
    };

    let pipeline = ChatPipeline::new(Arc::new(generator), Arc::new(storage))
        .with_ai_timeout(Duration::from_secs(config.gemini.timeout_secs));
    let app = routes::router(Arc::new(AppState { pipeline }), cors);

    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .wrap_err_with(|| format!("failed to bind {addr}"))?;

    info!(
        %addr,
        model = %config.gemini.model,
        origins = ?config.server.cors_origins,
        "mindgraph listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("server error")?;

    info!("mindgraph stopped");
    Ok(())
}

/// Resolve on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {e}");
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
