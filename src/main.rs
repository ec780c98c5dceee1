// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

use relational_accounts_server::api::router;
use relational_accounts_server::auth::Authenticator;
use relational_accounts_server::config::AppConfig;
use relational_accounts_server::state::AppState;
use relational_accounts_server::store::UserStore;

#[tokio::main]
async fn main() {
    init_tracing();

    // Configuration is validated up front; a missing or malformed required
    // variable aborts startup with the offending variable named.
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Configuration error: {err}");
            std::process::exit(1);
        }
    };

    let auth = match Authenticator::new(&config.auth) {
        Ok(auth) => auth,
        Err(err) => {
            eprintln!("Authentication setup error: {err}");
            std::process::exit(1);
        }
    };

    let mut store = UserStore::new();
    if let Some(email) = &config.seed_admin_email {
        match store.insert(email.as_str(), "", "", true, None) {
            Ok(user) => tracing::info!(email = %user.email, "Seeded staff account"),
            Err(err) => tracing::warn!(error = %err.message, "Failed to seed staff account"),
        }
    }

    let state = AppState::new(store, auth);
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Failed to parse bind address");

    tracing::info!("Accounts server listening on http://{addr} (docs at /docs)");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind server address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server failed");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
        _ => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received");
}
