//! gearhire - command-line client for the equipment rental marketplace.
//!
//! Every run restores the persisted session first, so `login` once and the
//! other commands reuse (and silently refresh) the token.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use gearhire_core::api::ApiRequest;
use gearhire_core::{CatalogClient, Config, ReqwestTransport, SessionManager, StoreBackend};
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable holding the passphrase for the file store
const PASSPHRASE_ENV: &str = "GEARHIRE_STORE_PASSPHRASE";

const USAGE: &str = "\
Usage: gearhire <command> [args]

Commands:
  login [email]                   Sign in (prompts for password)
  logout                          Sign out and forget the stored session
  register <email> [username]     Create an account (does not sign in)
  whoami                          Show the signed-in user
  categories                      List equipment categories
  subcategories <category_id>     List subcategories of a category
  equipment <subcategory_id>      List equipment in a subcategory
  get <path>                      Authenticated GET, prints the response body

Environment:
  GEARHIRE_API_URL, GEARHIRE_STORE, GEARHIRE_STORE_PASSPHRASE, RUST_LOG";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        eprintln!("{}", USAGE);
        return Ok(());
    };
    if command == "help" || command == "--help" || command == "-h" {
        println!("{}", USAGE);
        return Ok(());
    }

    let mut config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    };
    debug!(api = %config.api_base_url, store = ?config.store, "Config loaded");

    let passphrase = if config.store == StoreBackend::File {
        Some(store_passphrase()?)
    } else {
        None
    };
    let store = config.open_store(passphrase.as_deref())?;
    let transport = ReqwestTransport::new(&config.api_base_url, config.request_timeout())
        .context("Failed to create HTTP client")?;
    let session = Arc::new(SessionManager::new(Arc::new(transport), store));

    if session.restore().await {
        debug!("Using restored session");
    }

    let result = match command {
        "login" => login(&session, &mut config, args.get(1).cloned()).await,
        "logout" => {
            session.logout().await;
            println!("Signed out.");
            Ok(())
        }
        "register" => {
            let email = required_arg(&args, 1, "email")?;
            let password = rpassword::prompt_password("Password: ")?;
            let registration = session
                .register(email, &password, args.get(2).map(String::as_str))
                .await?;
            println!(
                "Account {} created for {}. Sign in with `gearhire login`.",
                registration.id, registration.email
            );
            Ok(())
        }
        "whoami" => {
            match session.user() {
                Some(user) if session.is_authenticated() => {
                    let minutes = session.session().minutes_until_expiry().unwrap_or(0);
                    println!(
                        "{} <{}> ({:?}), token valid for {} more minutes",
                        user.display_name(),
                        user.email,
                        user.role,
                        minutes
                    );
                }
                _ => println!("Not signed in."),
            }
            Ok(())
        }
        "categories" => {
            let catalog = CatalogClient::new(session.clone());
            for category in catalog.list_categories().await? {
                println!("{:>6}  {}", category.id, category.name);
            }
            Ok(())
        }
        "subcategories" => {
            let category_id = parse_id(required_arg(&args, 1, "category_id")?)?;
            let catalog = CatalogClient::new(session.clone());
            for sub in catalog.list_subcategories(category_id).await? {
                println!("{:>6}  {}", sub.id, sub.name);
            }
            Ok(())
        }
        "equipment" => {
            let subcategory_id = parse_id(required_arg(&args, 1, "subcategory_id")?)?;
            let catalog = CatalogClient::new(session.clone());
            for item in catalog.list_equipment(subcategory_id).await? {
                let availability = if item.available { "" } else { "  (unavailable)" };
                println!(
                    "{:>6}  {:<40} {}{}",
                    item.id,
                    item.name,
                    item.price_display(),
                    availability
                );
            }
            Ok(())
        }
        "get" => {
            let path = required_arg(&args, 1, "path")?;
            let response = session.authenticated_request(ApiRequest::get(path)).await?;
            match serde_json::from_str::<serde_json::Value>(&response.body) {
                Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
                Err(_) => println!("{}", response.body),
            }
            Ok(())
        }
        other => {
            eprintln!("Unknown command '{}'\n\n{}", other, USAGE);
            Ok(())
        }
    };

    // A silent refresh may have rotated the token without saving it
    if let Some(e) = session.take_storage_error() {
        eprintln!("Warning: refreshed session could not be saved ({}); you will need to sign in again next time.", e);
    }
    result
}

async fn login(session: &SessionManager, config: &mut Config, email: Option<String>) -> Result<()> {
    let email = match email.or_else(|| config.last_email.clone()) {
        Some(e) if !e.trim().is_empty() => e,
        _ => prompt_email()?,
    };
    let password = rpassword::prompt_password("Password: ")?;

    let signin = session.login(&email, &password).await?;
    if let Some(e) = signin.storage_error {
        eprintln!("Warning: session could not be saved ({}); you will need to sign in again next time.", e);
    }

    config.last_email = Some(email);
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }

    info!(user_id = signin.user.id, "Login successful");
    println!("Signed in as {}.", signin.user.display_name());
    Ok(())
}

fn prompt_email() -> Result<String> {
    print!("Email: ");
    io::stdout().flush()?;

    let mut email = String::new();
    io::stdin().read_line(&mut email)?;
    Ok(email.trim().to_string())
}

fn store_passphrase() -> Result<String> {
    match std::env::var(PASSPHRASE_ENV) {
        Ok(p) if !p.is_empty() => Ok(p),
        _ => Ok(rpassword::prompt_password("Session store passphrase: ")?),
    }
}

fn required_arg<'a>(args: &'a [String], index: usize, name: &str) -> Result<&'a str> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| anyhow::anyhow!("Missing <{}>\n\n{}", name, USAGE))
}

fn parse_id(raw: &str) -> Result<i64> {
    raw.parse()
        .with_context(|| format!("'{}' is not a valid id", raw))
}
