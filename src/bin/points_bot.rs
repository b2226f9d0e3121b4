use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use twitch_points_bot::auth::IdentityClient;
use twitch_points_bot::config::{AppConfig, CONFIG_PATH};
use twitch_points_bot::env::{EnvSource, TWITCH_USERNAME};
use twitch_points_bot::logging;
use twitch_points_bot::miner::{MinerConfig, validate_username};
use twitch_points_bot::reporter;
use twitch_points_bot::watcher::{WatchEndpoints, Watcher};

/// Log file stem used until the username has been validated.
const FALLBACK_LOG_NAME: &str = "points-bot";

#[derive(Parser)]
#[command(
    name = "points-bot",
    about = "Watch a Twitch channel with chat presence. Credentials come from the environment."
)]
struct Args {
    /// Optional settings file (poll interval, logging)
    #[arg(long, default_value = CONFIG_PATH)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv_loaded = dotenvy::dotenv().is_ok();
    let args = Args::parse();

    let app_config = AppConfig::load_or_default(&args.config)?;
    let env = EnvSource::from_process();

    let log_name = env
        .get(TWITCH_USERNAME)
        .filter(|name| validate_username(name).is_ok())
        .unwrap_or(FALLBACK_LOG_NAME);
    logging::init(&app_config.logger, log_name)?;
    if dotenv_loaded {
        info!("Loaded .env file");
    }

    let identity = IdentityClient::default();
    let config = MinerConfig::resolve(&env, &identity).await?;

    print_banner(&config, app_config.logger.emoji);
    info!("Configured to watch: {}", config.target_channel);
    info!(
        "Features enabled: {}",
        config.streamer_settings.enabled_features().join(", ")
    );
    info!("Waiting for streamer to go online...");

    let mut watcher = Watcher::connect(
        config,
        &app_config.settings,
        &identity,
        WatchEndpoints::default(),
    )
    .await?;
    if app_config.logger.colored {
        watcher = watcher.with_palette(app_config.logger.color_palette);
    }

    let outcome = watcher.run().await;
    reporter::report_exit_summary(&watcher.exit_summary());

    if let Err(e) = &outcome {
        error!("Fatal error: {e:#}");
    }
    outcome
}

fn print_banner(config: &MinerConfig, emoji: bool) {
    let (title, user, watching, detect) = if emoji {
        ("🎮 ", "👤 ", "📺 ", "🔍 ")
    } else {
        ("", "", "", "")
    };
    let rule = "=".repeat(50);
    eprintln!("\n{rule}");
    eprintln!("{title}Twitch Channel Points Bot");
    eprintln!("{rule}");
    eprintln!("{user}Username: {}", config.username);
    eprintln!("{watching}Watching: {}", config.target_channel);
    eprintln!("{detect}Auto-detecting stream status...");
    eprintln!("{rule}\n");
}
