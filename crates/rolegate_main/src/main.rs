use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use rolegate_core::{
    Address, ChallengeStore, IdentityOracle, MemberId, OracleClient, Reconciler, RolegateConfig,
    RolegateDb, SessionManager,
};
use rolegate_discord::serenity::http::Http;
use rolegate_discord::{DiscordBot, DiscordBotConfig, DiscordPlatform};
use rolegate_server::AppState;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "rolegate")]
#[command(about = "Discord roles from verified Idena identities", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file (defaults to the platform config dir)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Database file path (overrides config)
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the Discord bot and the login endpoints
    Run,
    /// Run only the login endpoints
    Serve,
    /// Delete pending logins older than the session lifetime
    Sweep,
    /// Look up the identity status of an address
    Status {
        /// Idena address, `0x` followed by 40 hex digits
        address: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .rgb_colors(miette::RgbColors::Preferred)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))?;
    miette::set_panic_hook();

    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.debug);

    let config_path = cli.config.clone().or_else(default_config_path);
    let mut config = RolegateConfig::load(config_path.as_deref())?;
    if let Some(db_path) = &cli.db_path {
        config.database.path = db_path.clone();
    }

    match cli.command {
        Commands::Run => run(config).await,
        Commands::Serve => serve(config).await,
        Commands::Sweep => sweep(config).await,
        Commands::Status { address } => status(config, &address).await,
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("rolegate").join("rolegate.toml"))
}

/// Terminal output plus a daily rolling log file. The returned guard must
/// live until exit or buffered file output is lost.
fn init_tracing(debug: bool) -> tracing_appender::non_blocking::WorkerGuard {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rolegate")
        .join("logs");
    std::fs::create_dir_all(&log_dir).ok();

    let file_appender = tracing_appender::rolling::daily(&log_dir, "rolegate.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = if debug {
        EnvFilter::new(
            "rolegate_main=debug,rolegate_core=debug,rolegate_db=debug,rolegate_server=debug,rolegate_discord=debug,tower_http=debug,serenity=warn,sqlx=warn",
        )
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(
                "rolegate_main=info,rolegate_core=info,rolegate_db=info,rolegate_server=info,rolegate_discord=info,serenity=warn,sqlx=warn",
            )
        })
    };

    let file_env_filter = EnvFilter::new(
        "rolegate_main=debug,rolegate_core=debug,rolegate_db=debug,rolegate_server=debug,rolegate_discord=debug,tower_http=info,serenity=info,sqlx=info",
    );

    let terminal_layer = if debug {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .pretty()
            .boxed()
    } else {
        fmt::layer().with_target(false).compact().boxed()
    };

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking)
        .with_file(true)
        .with_line_number(true)
        .pretty();

    tracing_subscriber::registry()
        .with(terminal_layer.with_filter(env_filter))
        .with(file_layer.with_filter(file_env_filter))
        .init();

    guard
}

/// Resolves once on ctrl-c for every subscriber.
fn shutdown_signal() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl-c: {}", e);
            return;
        }
        info!("Received ctrl-c, shutting down");
        let _ = tx.send(true);
    });
    rx
}

async fn wait_for(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// Apply roles as soon as a login commits.
fn spawn_login_listener(
    reconciler: Arc<Reconciler>,
    mut rx: mpsc::UnboundedReceiver<MemberId>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(member) = rx.recv().await {
            let reconciler = reconciler.clone();
            tokio::spawn(async move {
                match reconciler.reconcile_member_everywhere(member).await {
                    Ok(outcomes) => info!(
                        "Updated roles of member {} in {} guilds after login",
                        member,
                        outcomes.len()
                    ),
                    Err(e) => error!("Role update after login of {} failed: {}", member, e),
                }
            });
        }
    })
}

async fn run(config: RolegateConfig) -> Result<()> {
    let bot_config = DiscordBotConfig::from_config(&config)?;
    let db = RolegateDb::open(&config.database.path).await?;

    let oracle = OracleClient::from_config(&config.oracle).into_diagnostic()?;
    let status_cache = oracle.cache().clone();
    let platform = DiscordPlatform::new(Arc::new(Http::new(&bot_config.token)));
    let reconciler = Arc::new(Reconciler::new(
        db.clone(),
        Arc::new(oracle),
        Arc::new(platform),
    ));

    let (login_tx, login_rx) = mpsc::unbounded_channel();
    let sessions = SessionManager::new(db.clone()).with_notifier(login_tx);
    let listener = spawn_login_listener(reconciler.clone(), login_rx);

    let shutdown = shutdown_signal();

    let server = rolegate_server::serve(
        AppState::new(db.clone(), sessions.clone()),
        &config.auth.bind,
        wait_for(shutdown.clone()),
    );
    let bot = DiscordBot::new(bot_config, db.clone(), sessions, reconciler)
        .with_status_cache(status_cache)
        .run(wait_for(shutdown));

    let result = tokio::try_join!(
        async { server.await.map_err(miette::Report::from) },
        async { bot.await.map_err(miette::Report::from) },
    );

    listener.abort();
    db.close().await;
    result.map(|_| ())
}

async fn serve(config: RolegateConfig) -> Result<()> {
    let db = RolegateDb::open(&config.database.path).await?;
    warn!("Running without the Discord bot; roles update at the bot's next pass");

    let sessions = SessionManager::new(db.clone());
    rolegate_server::serve(
        AppState::new(db.clone(), sessions),
        &config.auth.bind,
        wait_for(shutdown_signal()),
    )
    .await?;

    db.close().await;
    Ok(())
}

async fn sweep(config: RolegateConfig) -> Result<()> {
    let db = RolegateDb::open(&config.database.path).await?;
    let removed = ChallengeStore::new(db.clone())
        .sweep(config.auth.session_ttl())
        .await?;
    let stats = db.stats().await?;
    println!("Removed {} stale pending logins", removed);
    println!(
        "Remaining: {} pending logins, {} bound identities, {} guilds",
        stats.pending_count, stats.bound_count, stats.guild_count
    );
    db.close().await;
    Ok(())
}

async fn status(config: RolegateConfig, raw: &str) -> Result<()> {
    let address: Address = raw.parse().into_diagnostic()?;
    let oracle = OracleClient::from_config(&config.oracle).into_diagnostic()?;
    let status = oracle.get_status(&address).await;
    println!("{}: {}", address, status.display_name());
    Ok(())
}
