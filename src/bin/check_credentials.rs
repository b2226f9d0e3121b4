//! check-credentials — Verify the bot's Twitch credentials without starting it.
//!
//! Resolves the credential exactly as `points-bot` does (direct
//! `TWITCH_PASSWORD`, or a `CLIENT_ID`/`CLIENT_SECRET` exchange), validates
//! it against the identity service and prints what the token is good for.
//!
//! With `--prompt`, a missing `TWITCH_PASSWORD` is read interactively (hidden
//! input) instead of failing, to keep tokens out of shell history.

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use twitch_points_bot::auth::IdentityClient;
use twitch_points_bot::env::{EnvSource, TWITCH_PASSWORD};
use twitch_points_bot::miner::MinerConfig;

#[derive(Parser)]
#[command(
    name = "check-credentials",
    about = "Resolve and validate the Twitch credentials from the environment"
)]
struct Cli {
    /// Ask for the token when TWITCH_PASSWORD is not set.
    #[arg(long)]
    prompt: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();
    let mut env = EnvSource::from_process();

    println!("=== Twitch Channel Points Bot — Credential Check ===\n");

    // ── Step 1: Fill in the token if asked to ──────────────────────
    if cli.prompt && env.get(TWITCH_PASSWORD).is_none() {
        let token = rpassword::prompt_password("Enter access token (oauth:...): ")
            .context("failed to read access token")?;
        if token.trim().is_empty() {
            bail!("access token cannot be empty");
        }
        env.set(TWITCH_PASSWORD, token.trim());
    }

    // ── Step 2: Resolve configuration ──────────────────────────────
    println!("Resolving configuration...");
    let identity = IdentityClient::default();
    let config = MinerConfig::resolve(&env, &identity).await?;
    println!("  Username:       {}", config.username);
    println!("  Target channel: {}", config.target_channel);
    println!();

    // ── Step 3: Validate the token ─────────────────────────────────
    println!("Validating access token...");
    let info = identity
        .validate(&config.credential)
        .await
        .context("access token was rejected")?;
    println!("  Client ID:  {}", info.client_id);
    match (&info.login, &info.user_id) {
        (Some(login), Some(user_id)) => println!("  Login:      {login} (id {user_id})"),
        (Some(login), None) => println!("  Login:      {login}"),
        _ => println!("  Login:      none (app access token, chat presence unavailable)"),
    }
    let scopes = info.scopes.clone().unwrap_or_default();
    println!(
        "  Scopes:     {}",
        if scopes.is_empty() {
            "none".to_string()
        } else {
            scopes.join(", ")
        }
    );
    println!("  Expires in: {}s", info.expires_in);
    println!();

    if let Some(login) = &info.login {
        if !login.eq_ignore_ascii_case(&config.username) {
            println!(
                "WARNING: token belongs to {login}, but TWITCH_USERNAME is {}",
                config.username
            );
        }
    }

    println!("=== Credentials OK ===");
    Ok(())
}
