// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{env, net::SocketAddr, sync::Arc};

use axum_server::tls_rustls::RustlsConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tokenforge::api::router;
use tokenforge::auth::FileAuthenticator;
use tokenforge::claims::{ClaimsEngine, DescriptorStore, FunctionRegistry};
use tokenforge::config::{
    API_KEYS_DIR_ENV, DEFAULT_API_KEYS_DIR, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_USERS_FILE,
    HOST_ENV, INTERNAL_TOKEN_ENV, JWT_SECRET_ENV, PORT_ENV, TLS_CERT_ENV, TLS_KEY_ENV,
    USERS_FILE_ENV,
};
use tokenforge::state::AppState;
use tokenforge::token::TokenSigner;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);

    match env::var("LOG_FORMAT").as_deref() {
        Ok("json") => subscriber.json().init(),
        _ => subscriber.init(),
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    // Install the ring crypto provider for rustls (must be done before any TLS operations)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let secret = env::var(JWT_SECRET_ENV)
        .unwrap_or_else(|_| panic!("{JWT_SECRET_ENV} must be set"));
    let keys_dir =
        env::var(API_KEYS_DIR_ENV).unwrap_or_else(|_| DEFAULT_API_KEYS_DIR.to_string());
    let users_file = env::var(USERS_FILE_ENV).unwrap_or_else(|_| DEFAULT_USERS_FILE.to_string());
    let internal_token = env::var(INTERNAL_TOKEN_ENV).unwrap_or_default();

    let engine = ClaimsEngine::new(
        DescriptorStore::new(&keys_dir),
        Arc::new(FunctionRegistry::builtin()),
    );
    if let Err(e) = engine.store().load_default() {
        tracing::warn!(keys_dir, error = %e, "default api key descriptor is not loadable");
    }

    let state = AppState::new(
        engine,
        FileAuthenticator::new(&users_file),
        TokenSigner::new(&secret),
        internal_token,
    );
    let app = router(state);

    let host = env::var(HOST_ENV).unwrap_or_else(|_| DEFAULT_HOST.to_string());
    let port: u16 = env::var(PORT_ENV)
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .expect("Failed to parse bind address");

    // HTTPS when a certificate and key are configured, plain HTTP otherwise.
    match (env::var(TLS_CERT_ENV), env::var(TLS_KEY_ENV)) {
        (Ok(cert), Ok(key)) => {
            let tls_config = RustlsConfig::from_pem_file(&cert, &key)
                .await
                .expect("Failed to load TLS certificate or key");

            info!("tokenforge listening on https://{addr} (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .serve(app.into_make_service())
                .await
                .expect("HTTPS server failed");
        }
        _ => {
            info!("tokenforge listening on http://{addr} (docs at /docs)");
            axum_server::bind(addr)
                .serve(app.into_make_service())
                .await
                .expect("HTTP server failed");
        }
    }
}
