mod action;
mod app;
mod app_state;
mod component;
mod components;
mod focus;
mod mpv;
mod player;
mod theme;
mod widgets;

use std::path::PathBuf;

use clap::Parser;

use ibroadcast_core::api::Session;
use ibroadcast_core::cache::CacheStore;
use ibroadcast_core::config::{Config, ENV_PASSWORD, ENV_USERNAME};
use ibroadcast_core::normalize::Layouts;
use ibroadcast_core::platform;
use ibroadcast_core::pool::WorkerPool;
use ibroadcast_core::token::TokenStore;
use ibroadcast_core::{DataManager, LoadMode};

#[derive(Parser)]
#[command(name = "ibroadcast-tui")]
#[command(about = "Terminal client for an iBroadcast music library", version)]
struct Cli {
    /// Fetch the library from the server even if a cache exists
    #[arg(long)]
    refresh: bool,

    /// Delete the cached library before starting
    #[arg(long)]
    clear_cache: bool,

    /// Forget the stored login token and exit
    #[arg(long)]
    logout: bool,

    /// Config file to use instead of the default location
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let data_dir = platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join("tui.log");

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // RUST_LOG wins; HTTP client internals are noisy at debug.
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    eprintln!("ibroadcast-tui log: {}", log_path.display());
    tracing::info!("ibroadcast-tui starting");

    // ── Config ───────────────────────────────────────────────────────────────
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load().unwrap_or_else(|e| {
            tracing::warn!("config load failed, using defaults: {}", e);
            let mut config = Config::default();
            config.apply_env(|k| std::env::var(k).ok());
            config
        }),
    };

    let tokens = TokenStore::new(data_dir.join("token.json"));
    if cli.logout {
        tokens.delete()?;
        eprintln!("stored login removed");
        return Ok(());
    }

    let username = config.credentials.username.clone();

    // ── Session ──────────────────────────────────────────────────────────────
    let session = Session::new(config.api.clone(), config.credentials.clone())?;
    if let Some(name) = username.as_deref() {
        match tokens.load(name) {
            Some(stored) if stored.is_valid() => {
                tracing::info!("reusing stored login for {}", name);
                session.restore(stored.login()).await;
            }
            Some(_) => tracing::info!("stored login expired"),
            None => {}
        }
    }

    // ── Data manager ─────────────────────────────────────────────────────────
    let cache = CacheStore::new(config.library.cache_file(username.as_deref()));
    let manager = DataManager::new(
        session,
        cache,
        WorkerPool::new(config.library.workers),
        Layouts {
            album: config.library.album_layout,
        },
    );

    if cli.clear_cache {
        manager.clear_cache().await?;
        tracing::info!("library cache cleared");
    }

    if !config.credentials.is_complete() {
        eprintln!(
            "no credentials configured: set {} and {} or edit {}",
            ENV_USERNAME,
            ENV_PASSWORD,
            cli.config
                .clone()
                .unwrap_or_else(Config::config_path)
                .display()
        );
    }

    let app = app::App::new(app::AppConfig {
        manager,
        tokens,
        username,
        log_path,
        start_mode: if cli.refresh {
            LoadMode::Refresh
        } else {
            LoadMode::PreferCache
        },
        search_limit: config.library.search_limit,
        mpv_path: config.player.mpv_path.clone(),
        volume: config.player.volume,
        show_keys_bar: config.ui.show_keys_bar,
    });
    app.run().await
}
