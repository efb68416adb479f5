use axum::http::HeaderName;
use reqwest::Url;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Args;
use crate::error::StateError;
use crate::rate_limit::WindowLimiter;
use crate::store::CounterStore;
use crate::unblock::UnblockDispatcher;
use crate::verifier::{ChallengeVerifier, TurnstileVerifier};

// app's shared state
pub struct AppState {
    pub client: reqwest::Client,
    pub origin: Url,
    pub identity_header: HeaderName,
    pub limiter: WindowLimiter,
    pub dispatcher: UnblockDispatcher,
    pub verifier: Arc<dyn ChallengeVerifier>,
    pub admin_secret: Option<String>,
    pub site_key: String,
    pub max_body_bytes: usize,
}

impl AppState {
    // Build state with the turnstile verifier from the cli args
    pub fn new(args: &Args, store: Arc<dyn CounterStore>) -> Result<Self, StateError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(args.upstream_timeout))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        let verifier = Arc::new(TurnstileVerifier::new(
            client.clone(),
            args.turnstile_verify_url.clone(),
            args.turnstile_secret_key.clone(),
        ));
        Self::with_verifier(args, client, store, verifier)
    }

    pub fn with_verifier(
        args: &Args,
        client: reqwest::Client,
        store: Arc<dyn CounterStore>,
        verifier: Arc<dyn ChallengeVerifier>,
    ) -> Result<Self, StateError> {
        let origin =
            Url::parse(&args.origin).map_err(|e| StateError::Url("origin", e.to_string()))?;
        let unblock_base = Url::parse(&args.unblock_url)
            .map_err(|e| StateError::Url("unblock", e.to_string()))?;
        let identity_header = HeaderName::from_bytes(args.identity_header.as_bytes())?;

        Ok(Self {
            limiter: WindowLimiter::new(
                store,
                args.rate_limit,
                Duration::from_secs(args.rate_window),
            ),
            dispatcher: UnblockDispatcher::new(
                client.clone(),
                unblock_base,
                args.unblock_key.clone(),
                args.unblock_mode,
            ),
            client,
            origin,
            identity_header,
            verifier,
            admin_secret: args.admin_secret.clone(),
            site_key: args.turnstile_site_key.clone(),
            max_body_bytes: args.max_body_bytes,
        })
    }
}
