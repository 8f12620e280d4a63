//! tokenward - inspect and manage stored client credentials.
//!
//! Drives the core library against the configured storage backend so a
//! credential can be stored, inspected, previewed as a request header, and
//! cleared from the command line.

use std::io;

use anyhow::{Context, Result};
use tokenward_core::{AuthConfig, AuthContext, RequestParts, StorageType};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ============================================================================
// Constants
// ============================================================================

/// Overrides `storage_type` from the config file
const STORAGE_TYPE_ENV: &str = "TOKENWARD_STORAGE_TYPE";

/// URL used for the header preview; never contacted
const PREVIEW_URL: &str = "https://localhost/";

const USAGE: &str = "\
Usage: tokenward <command>

Commands:
  login <response-json> [--guest]   Store the token found in a login response
  logout                            Remove the stored token
  status                            Show authentication status
  token                             Print the raw stored token
  payload                           Print the decoded JWT payload
  header                            Print the header attached to requests
  storage <memory|file|keyring>     Select the storage backend";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn load_config() -> Result<AuthConfig> {
    let mut config = AuthConfig::load()?;
    if let Ok(value) = std::env::var(STORAGE_TYPE_ENV) {
        config.storage_type = value
            .parse()
            .with_context(|| format!("Invalid {}", STORAGE_TYPE_ENV))?;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    };

    let config = load_config()?;
    let ctx = AuthContext::with_default_storage(config)?;
    info!(storage = %ctx.config.storage_type(), command = %command, "tokenward starting");

    match command.as_str() {
        "login" => login(&ctx, &args[1..]),
        "logout" => {
            ctx.tokens.logout().await;
            println!("Logged out");
            Ok(())
        }
        "status" => {
            status(&ctx);
            Ok(())
        }
        "token" => {
            match ctx.tokens.token() {
                Some(token) => println!("{}", token),
                None => eprintln!("No token stored"),
            }
            Ok(())
        }
        "payload" => payload(&ctx),
        "header" => {
            header(&ctx);
            Ok(())
        }
        "storage" => storage(&ctx, &args[1..]),
        "help" | "--help" | "-h" => {
            println!("{}", USAGE);
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}\n\n{}", other, USAGE);
            std::process::exit(2);
        }
    }
}

fn login(ctx: &AuthContext, args: &[String]) -> Result<()> {
    let mut body = None;
    let mut is_guest = false;
    for arg in args {
        match arg.as_str() {
            "--guest" => is_guest = true,
            _ if body.is_none() => body = Some(arg.as_str()),
            other => anyhow::bail!("Unexpected argument: {}", other),
        }
    }
    let body = body.ok_or_else(|| anyhow::anyhow!("login needs a response JSON body"))?;
    let response: serde_json::Value =
        serde_json::from_str(body).context("Failed to parse response JSON")?;

    if !ctx.tokens.set_token(&response, is_guest) {
        eprintln!("No token found in response; nothing stored");
        return Ok(());
    }
    println!("Token stored{}", if is_guest { " (guest)" } else { "" });
    Ok(())
}

fn status(ctx: &AuthContext) {
    println!("Storage:        {}", ctx.config.storage_type());
    println!("Token stored:   {}", ctx.tokens.token().is_some());
    println!("Authenticated:  {}", ctx.tokens.is_authenticated());
    println!("Guest:          {}", ctx.tokens.is_guest());

    match (ctx.tokens.expires_at(), ctx.tokens.time_until_expiry()) {
        (Some(expiry), Some(remaining)) => {
            if remaining.num_seconds() > 0 {
                println!(
                    "Expires:        {} (in {}m)",
                    expiry.to_rfc3339(),
                    remaining.num_minutes()
                );
            } else {
                println!("Expires:        {} (expired)", expiry.to_rfc3339());
            }
        }
        _ => println!("Expires:        never"),
    }
}

fn payload(ctx: &AuthContext) -> Result<()> {
    match ctx.tokens.payload() {
        Some(payload) => println!("{}", serde_json::to_string_pretty(&payload)?),
        None => eprintln!("No decodable JWT payload"),
    }
    Ok(())
}

fn header(ctx: &AuthContext) {
    let request = ctx.authenticator.apply(RequestParts::get(PREVIEW_URL));
    if request.headers.is_empty() {
        eprintln!("No header would be attached");
        return;
    }
    for (name, value) in &request.headers {
        println!("{}: {}", name, String::from_utf8_lossy(value.as_bytes()));
    }
}

fn storage(ctx: &AuthContext, args: &[String]) -> Result<()> {
    let Some(value) = args.first() else {
        println!("{}", ctx.config.storage_type());
        return Ok(());
    };
    let storage_type: StorageType = value.parse()?;

    ctx.tokens.set_storage_type(storage_type);
    ctx.config.snapshot().save().context("Failed to save config")?;
    println!("Storage set to {}", storage_type);
    Ok(())
}
