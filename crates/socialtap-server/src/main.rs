//! socialtap server: entry point.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use socialtap::browser::chromium::find_chromium;
use socialtap::browser::storage_state::state_path;
use socialtap::config::ProxyConfig;
use socialtap::{Action, EngineConfig, Platform, Scraper};
use socialtap_server::rate_limit::RateLimiter;
use socialtap_server::stats::StatsStore;
use socialtap_server::{serve, AppState, ServerConfig};

const PRUNE_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Parser)]
#[command(
    name = "socialtap-server",
    about = "Extract normalized TikTok and X data through headless Chromium",
    version
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides on top of the `SOCIALTAP_*` engine environment.
#[derive(Args, Debug, Default)]
struct EngineArgs {
    /// Chromium binary.
    #[arg(long)]
    chromium_path: Option<PathBuf>,

    /// Show the browser window.
    #[arg(long)]
    headful: bool,

    /// Maximum concurrently open browsing contexts.
    #[arg(long)]
    pool_size: Option<usize>,

    /// Wait after navigation before reading responses, in milliseconds.
    #[arg(long)]
    settle_ms: Option<u64>,

    /// Per-call deadline, in seconds.
    #[arg(long)]
    deadline_secs: Option<u64>,

    #[arg(long)]
    user_agent: Option<String>,

    /// Upstream proxy (`host:port`).
    #[arg(long)]
    proxy_server: Option<String>,

    /// Directory holding `<platform>-state.json` session files.
    #[arg(long)]
    state_dir: Option<PathBuf>,
}

impl EngineArgs {
    fn into_config(self) -> EngineConfig {
        let mut config = EngineConfig::from_env();
        if let Some(path) = self.chromium_path {
            config.chromium_path = Some(path);
        }
        if self.headful {
            config.headless = false;
        }
        if let Some(size) = self.pool_size {
            config.pool_size = size.max(1);
        }
        if let Some(ms) = self.settle_ms {
            config.settle_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = self.deadline_secs {
            config.deadline = Duration::from_secs(secs.max(1));
        }
        if self.user_agent.is_some() {
            config.user_agent = self.user_agent;
        }
        if let Some(server) = self.proxy_server {
            let (username, password) = config
                .proxy
                .take()
                .map(|p| (p.username, p.password))
                .unwrap_or_default();
            config.proxy = Some(ProxyConfig {
                server,
                username,
                password,
            });
        }
        if let Some(dir) = self.state_dir {
            config.state_dir = dir;
        }
        config
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP and WebSocket API.
    Serve {
        /// Listen address (host:port).
        #[arg(long)]
        listen: Option<SocketAddr>,

        /// Usage statistics file.
        #[arg(long)]
        stats_file: Option<PathBuf>,

        /// Bearer token for /scrape and /ws. Also reads SOCIALTAP_TOKEN.
        #[arg(long)]
        token: Option<String>,

        /// Rate-limit window, in seconds.
        #[arg(long)]
        rate_window_secs: Option<u64>,

        /// Requests allowed per client inside the window.
        #[arg(long)]
        rate_max: Option<usize>,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Run one extraction and print the result as JSON.
    Scrape {
        /// tiktok or twitter (x).
        platform: Platform,

        /// Action name, e.g. getMetrics or verifyRetweet.
        action: Action,

        url: String,

        /// Handle for checkUserComment and verifyRetweet.
        #[arg(long)]
        target: Option<String>,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Check Chromium and session-state availability.
    Doctor {
        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   socialtap-server completions bash > ~/.local/share/bash-completion/completions/socialtap-server
    ///   socialtap-server completions zsh > ~/.zfunc/_socialtap-server
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

fn init_tracing(level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_json);

    match cli.command {
        Commands::Serve {
            listen,
            stats_file,
            token,
            rate_window_secs,
            rate_max,
            engine,
        } => {
            let mut config = ServerConfig::from_env();
            if let Some(addr) = listen {
                config.listen = addr;
            }
            if let Some(path) = stats_file {
                config.stats_path = path;
            }
            if token.is_some() {
                config.token = token;
            }
            if let Some(secs) = rate_window_secs {
                config.rate_window = Duration::from_secs(secs);
            }
            if let Some(max) = rate_max {
                config.rate_max = max;
            }

            let engine = engine.into_config();
            let scraper = Scraper::launch(&engine)
                .await
                .context("failed to launch Chromium (run `socialtap-server doctor`)")?;
            let stats = StatsStore::open(&config.stats_path)
                .await
                .with_context(|| format!("cannot open stats file {}", config.stats_path.display()))?;

            tracing::info!(pool = engine.pool_size, "engine ready");
            if config.token.is_some() {
                tracing::info!("Auth: bearer token required");
            }

            let state = Arc::new(
                AppState::new(
                    Arc::new(scraper),
                    RateLimiter::new(config.rate_window, config.rate_max),
                    stats,
                )
                .with_token(config.token.clone()),
            );

            let shutdown = state.shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("shutting down");
                    shutdown.cancel();
                }
            });

            let pruning = state.clone();
            tokio::spawn(async move {
                let mut tick = tokio::time::interval(PRUNE_INTERVAL);
                loop {
                    tick.tick().await;
                    pruning.limiter.prune().await;
                }
            });

            serve(&config, state).await?;
        }

        Commands::Scrape {
            platform,
            action,
            url,
            target,
            engine,
        } => {
            let engine = engine.into_config();
            let scraper = Scraper::launch(&engine).await?;
            let output = scraper
                .scrape(platform, &url, action, target.as_deref())
                .await?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Commands::Doctor { engine } => {
            let engine = engine.into_config();
            println!("socialtap doctor");
            println!("================");
            println!();
            println!("OS:   {}", std::env::consts::OS);
            println!("Arch: {}", std::env::consts::ARCH);
            println!();

            let chromium = find_chromium(engine.chromium_path.as_deref());
            match &chromium {
                Some(path) => println!("[OK] Chromium found: {}", path.display()),
                None => println!(
                    "[!!] Chromium NOT found. Set SOCIALTAP_CHROMIUM_PATH or install google-chrome / chromium."
                ),
            }
            for platform in [Platform::Tiktok, Platform::Twitter] {
                let path = state_path(&engine.state_dir, platform);
                if path.exists() {
                    println!("[OK] {platform} session state: {}", path.display());
                } else {
                    println!("[..] No {platform} session state at {} (anonymous)", path.display());
                }
            }
            if let Some(proxy) = &engine.proxy {
                println!("[OK] Proxy: {}", proxy.server);
            }

            println!();
            if chromium.is_some() {
                println!("Status: READY");
            } else {
                println!("Status: NOT READY");
            }
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "socialtap-server", &mut std::io::stdout());
        }
    }

    Ok(())
}

