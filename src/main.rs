//! SMS intake - qualifies solar leads over text messages
//!
//! Asks every new contact for consent, postal code, annual consumption and
//! an electricity bill photo, one reply per inbound message.

mod api;
mod config;
mod db;
mod phone;
mod replies;
mod runtime;
mod sms;
mod state_machine;
mod validate;

use api::{create_router, AppState};
use config::Config;
use db::Database;
use runtime::MessagingGateway;
use sms::{LogOnlyGateway, TwilioGateway};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sms_intake=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(false),
        )
        .init();

    let config = Config::from_env()?;

    // Ensure database directory exists
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %config.db_path.display(), "Opening database");
    let db = Database::open(&config.db_path)?;

    let gateway: Arc<dyn MessagingGateway> = match config.twilio.clone() {
        Some(twilio) => {
            tracing::info!(
                account = %twilio.account_sid,
                sender = %config.sender_number,
                "Sending replies via Twilio"
            );
            Arc::new(TwilioGateway::new(twilio)?)
        }
        None => {
            tracing::warn!(
                "No SMS provider configured. Set TWILIO_ACCOUNT_SID, TWILIO_AUTH_TOKEN and TWILIO_PHONE_NUMBER; replies are only logged."
            );
            Arc::new(LogOnlyGateway)
        }
    };

    let state = AppState::new(db, gateway, config.sender_number.clone(), config.retry);
    let app = create_router(state).layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("SMS intake listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
