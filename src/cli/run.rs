use super::config::{default_config_path, LoggingConfig, QueuekeeperConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use queuekeeper::bot::{BotSettings, QueueBot, DEFAULT_POLL_INTERVAL};
use queuekeeper::directory::{AdminDirectory, GroupDirectory};
use queuekeeper::gateway::{ConsoleGateway, MessagingGateway};
use queuekeeper::moderation::ContentFilter;
use queuekeeper::qr::TerminalQrRenderer;
use queuekeeper::queue::{Evictor, QueueIdGenerator, TicketRegistry};

/// Run the bot service
///
/// Loads (or creates) the configuration, loads the admin and group
/// directories, starts the eviction sweep and serves the console gateway
/// until Ctrl-C.
///
/// ## Configuration Loading
///
/// 1. `--config` flag if provided
/// 2. Default config at `<data_dir>/queuekeeper/config.toml`
///
/// If the config file doesn't exist, a default one is generated.
pub async fn execute(config_path: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    println!("🚀 Starting queuekeeper...");
    println!();

    let config_path = config_path
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);
    println!("Config: {}", config_path.display());

    let config = if config_path.exists() {
        QueuekeeperConfig::load(&config_path)?
    } else {
        println!();
        println!("📝 No config file found. Creating default configuration...");
        QueuekeeperConfig::create_default(&config_path)?;
        println!("   Created: {}", config_path.display());
        QueuekeeperConfig::load(&config_path)?
    };

    init_tracing(&config.logging)?;

    let gateway = ConsoleGateway::spawn_stdin();
    let (bot, evictor) = assemble(&config, &config_path, gateway).await?;
    let evictor = evictor.spawn(config.queue.sweep_interval()?)?;

    println!();
    println!("Type `<user_id> <text>` to talk to the bot, `<user_id> !<payload>` to press a control.");
    println!("Press Ctrl-C to stop.");
    println!();

    tokio::select! {
        _ = bot.run() => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Shutdown requested");
        }
    }

    evictor.shutdown().await?;
    println!("👋 Stopped");
    Ok(())
}

/// Build the bot and its (not yet started) evictor from configuration.
pub(crate) async fn assemble<G: MessagingGateway>(
    config: &QueuekeeperConfig,
    config_path: &Path,
    gateway: G,
) -> Result<(QueueBot<G>, Evictor), Box<dyn std::error::Error>> {
    let admins_file = config.admins_file(config_path);
    let groups_file = config.groups_file(config_path);
    println!("Admins: {}", admins_file.display());
    println!("Groups: {}", groups_file.display());

    let admins = AdminDirectory::load(admins_file, &config.directory.seed_admins).await;
    let groups = GroupDirectory::load(groups_file, &config.directory.seed_groups, admins.clone()).await;

    let registry = TicketRegistry::new();
    let evictor = Evictor::new(registry.clone(), config.queue.retention()?)?;

    let settings = BotSettings {
        deep_link_base: config.bot.deep_link_base.clone(),
        business_name: config.bot.business_name.clone(),
        moderation_enabled: config.moderation.enabled,
        filter: ContentFilter::new(&config.moderation.extra_terms, config.moderation.thresholds()),
        renderer: Arc::new(TerminalQrRenderer),
        poll_interval: DEFAULT_POLL_INTERVAL,
    };

    let bot = QueueBot::new(
        gateway,
        registry,
        QueueIdGenerator::new(),
        admins,
        groups,
        settings,
    );
    Ok((bot, evictor))
}

/// `RUST_LOG` wins; otherwise the configured level. Logs go to stderr or
/// to the configured file.
fn init_tracing(logging: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    // A subscriber may already be installed (tests); keep it.
    let _ = match &logging.file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            builder
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .try_init()
        }
        None => builder.try_init(),
    };
    Ok(())
}
