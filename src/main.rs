//! Muster binary entry point
//!
//! Operator-facing resolution tool:
//!
//! ```text
//! muster resolve <identifier>      # handle, @user@domain, or actor URL
//! muster resolve-id <opaque-id>    # Mastodon-style local account ID
//! muster resolve-email <email>     # private contact address
//! muster followers <identifier>    # aggregate the follower list
//! ```

use muster::service::IdentifierKind;
use muster::{AppState, config, error::AppError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application entry point
///
/// # Setup
/// 1. Initialize tracing/logging
/// 2. Load configuration from file and environment
/// 3. Initialize AppState
/// 4. Dispatch the requested resolution
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize tracing/logging
    let log_format =
        std::env::var("MUSTER__LOGGING__FORMAT").unwrap_or_else(|_| "pretty".to_string());

    if log_format == "json" {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "muster=info".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "muster=info".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    // 2. Initialize metrics
    muster::metrics::init_metrics();

    // 3. Load configuration
    let config = config::AppConfig::load()?;
    tracing::info!(
        domain = %config.server.domain,
        "Configuration loaded"
    );

    let mut args = std::env::args().skip(1);
    let (Some(command), Some(value)) = (args.next(), args.next()) else {
        eprintln!("usage: muster <resolve|resolve-id|resolve-email|followers> <value>");
        std::process::exit(2);
    };

    // 4. Initialize application state
    let state = AppState::new(config).await?;
    let domain = state.config.server.domain.clone();

    let output = match command.as_str() {
        "resolve" => state
            .account_service()
            .resolve_account(&domain, &value, IdentifierKind::Canonical)
            .await
            .map(|view| serde_json::to_value(view).unwrap_or_default()),
        "resolve-id" => state
            .account_service()
            .resolve_account(&domain, &value, IdentifierKind::Opaque)
            .await
            .map(|view| serde_json::to_value(view).unwrap_or_default()),
        "resolve-email" => state
            .account_service()
            .resolve_account_by_email(&domain, &value)
            .await
            .map(|view| serde_json::to_value(view).unwrap_or_default()),
        "followers" => state
            .follower_service()
            .get_followers(&domain, &value)
            .await
            .map(|views| serde_json::to_value(views).unwrap_or_default()),
        other => {
            eprintln!("unknown command: {}", other);
            std::process::exit(2);
        }
    };

    match output {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Err(AppError::NotFound) => {
            eprintln!("not found: {}", value);
            std::process::exit(1);
        }
        Err(error) => Err(error.into()),
    }
}
