//! Wiring & DI. Entry point: bootstrap adapters, inject into services, run the bot.
//! No business logic here.

use dotenv::dotenv;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tg_autojoin::adapters::bot::{BotInputPort, CommandHandler, TeloxideServiceIdentity};
use tg_autojoin::adapters::persistence::{AccessJson, RegistryJson};
use tg_autojoin::adapters::telegram::{GrammersAuthAdapter, GrammersSessionProvider, session};
use tg_autojoin::adapters::ui::tui::TuiLogin;
use tg_autojoin::ports::{
    AccessStorePort, AuthPort, ChatRegistryPort, InputPort, MessageSender, ServiceIdentityPort,
};
use tg_autojoin::shared::config::AppConfig;
use tg_autojoin::usecases::{
    AccessGate, AuthService, AuthState, BroadcastDispatcher, DelegatedIdentityJoiner,
    JoinOrchestrator, ServiceIdentityJoiner, SessionWorker,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let env_loaded = dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &env_loaded {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!(cwd = %cwd.display(), "no .env found (check CWD)"),
    }

    tg_autojoin::adapters::ui::init_ui();

    let cfg = AppConfig::load().map_err(|e| anyhow::anyhow!("config: {}", e))?;
    let Some(bot_token) = cfg.bot_token.clone() else {
        anyhow::bail!("Set TG_AUTOJOIN_BOT_TOKEN (env or .env). Get one from @BotFather");
    };

    let data_dir = cfg.data_dir_or_default();
    tokio::fs::create_dir_all(&data_dir)
        .await
        .map_err(|e| anyhow::anyhow!("create data dir {}: {}", data_dir.display(), e))?;
    info!(path = %data_dir.display(), "data directory");

    // --- Registry (one instance, shared by join and broadcast) ---
    let registry_impl = RegistryJson::new(cfg.registry_path());
    registry_impl
        .load()
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    let registry: Arc<dyn ChatRegistryPort> = Arc::new(registry_impl);

    // --- Access gate ---
    let access_store: Arc<dyn AccessStorePort> = Arc::new(AccessJson::new(cfg.access_path()));
    let gate = Arc::new(
        AccessGate::load(access_store, cfg.access_code.clone())
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))?,
    );

    // --- Delegated session (private invite links) ---
    let session_client = create_session_client(&cfg).await?;
    let provider = GrammersSessionProvider::new(session_client);
    let session_queue = SessionWorker::spawn(
        Box::new(DelegatedIdentityJoiner::new(Box::new(provider))),
        cfg.session_queue_size_or_default(),
        Duration::from_secs(cfg.join_timeout_secs_or_default()),
    );

    // --- Service identity (bot) ---
    let bot = TeloxideServiceIdentity::connect(&bot_token).await?;
    let bot_port: Arc<dyn ServiceIdentityPort> = Arc::new(bot.clone());
    let sender: Arc<dyn MessageSender> = Arc::new(bot.clone());

    // --- Services ---
    let orchestrator = Arc::new(JoinOrchestrator::new(
        Arc::new(ServiceIdentityJoiner::new(bot_port)),
        Arc::new(session_queue),
        Arc::clone(&registry),
        Duration::from_secs(cfg.join_timeout_secs_or_default()),
    ));

    let concurrency = cfg.broadcast_concurrency_or_default();
    let send_timeout_secs = cfg.send_timeout_secs_or_default();
    info!(concurrency, send_timeout_secs, "broadcast limits");
    let dispatcher = Arc::new(BroadcastDispatcher::new(
        Arc::clone(&sender),
        Arc::clone(&registry),
        concurrency,
        Duration::from_secs(send_timeout_secs),
    ));

    // --- Shutdown: Ctrl-C stops polling and cancels running broadcasts ---
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
            on_signal.cancel();
        }
    });

    let handler = Arc::new(CommandHandler::new(
        gate,
        orchestrator,
        dispatcher,
        registry,
        sender,
        bot.username().map(String::from),
        cancel.clone(),
    ));
    let input_port: Arc<dyn InputPort> =
        Arc::new(BotInputPort::new(bot.bot().clone(), handler, cancel));

    input_port
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    Ok(())
}

/// Connect the delegated session when its credentials are configured, and log in
/// interactively if needed. Returns `None` when private invite links are unavailable;
/// the bot still runs in that case.
async fn create_session_client(cfg: &AppConfig) -> anyhow::Result<Option<grammers_client::Client>> {
    let (Some(api_id), Some(api_hash), Some(phone)) =
        (cfg.api_id, cfg.api_hash.clone(), cfg.phone.clone())
    else {
        warn!("TG_AUTOJOIN_API_ID / API_HASH / PHONE not set; private invite links disabled");
        return Ok(None);
    };
    if !cfg.is_session_configured() {
        warn!("TG_AUTOJOIN_API_ID is 0; private invite links disabled");
        return Ok(None);
    }

    let client = session::connect(api_id, cfg.session_path_or_default()).await?;
    let auth_port: Arc<dyn AuthPort> = Arc::new(GrammersAuthAdapter::new(client.clone()));
    let auth = Arc::new(AuthService::new(auth_port, phone, api_hash));

    if std::io::stdin().is_terminal() {
        if let Err(e) = TuiLogin::new(Arc::clone(&auth)).run().await {
            warn!(error = %e, "login failed; private invite links unavailable until restart");
        }
    } else {
        match auth.refresh().await {
            Ok(AuthState::Authorized) => info!("delegated session authorized"),
            Ok(_) => warn!("delegated session not logged in; run once in a terminal to log in"),
            Err(e) => warn!(error = %e, "delegated session check failed"),
        }
    }
    Ok(Some(client))
}
