mod analysis;
mod auth;
mod client_ip;
mod config;
mod error;
mod handlers;
mod llm;
mod metrics;
mod models;
mod rate_limit;
mod retry;
mod state;
mod store;
#[cfg(test)]
mod test_support;

use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::auth::Authenticator;
use crate::config::Args;
use crate::llm::OpenAiClient;
use crate::rate_limit::{RateLimiter, sweeper};
use crate::state::AppState;
use crate::store::Store;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // parse cli arguments
    let args = Args::parse();
    let retry_policy = args.retry_policy();

    let rate_limiter = Arc::new(RateLimiter::new(
        args.rate_limit,
        Duration::from_secs(args.rate_window),
    ));

    let store = Store::new();
    if args.seed {
        store.seed_defaults();
    }

    let auth = Authenticator::new(args.supervisor_token.clone(), args.admin_token.clone());
    if !auth.is_enabled() {
        warn!("no API tokens configured, authentication is disabled");
    }
    if args.llm_api_key.is_none() {
        warn!("no LLM API key configured, analysis requests will likely fail");
    }

    let llm = OpenAiClient::new(
        reqwest::Client::new(),
        &args.llm_url,
        &args.llm_model,
        args.llm_api_key.clone(),
    );

    // creating shared state
    let state = Arc::new(AppState {
        store,
        rate_limiter: Arc::clone(&rate_limiter),
        llm: Arc::new(llm),
        retry_policy,
        auth,
    });

    if args.sweep_interval > 0 {
        tokio::spawn(sweeper(rate_limiter, Duration::from_secs(args.sweep_interval)));
    }

    let app = handlers::router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(%addr, "supervision gateway listening");
    info!(url = %args.llm_url, model = %args.llm_model, "LLM provider");
    info!(
        limit = args.rate_limit,
        window_secs = args.rate_window,
        "rate limit per client"
    );
    info!(?retry_policy, "LLM retry policy");

    axum::serve(listener, app).await
}
