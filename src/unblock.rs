use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use reqwest::Url;

use crate::config::UnblockMode;
use crate::metrics::BLOCKED_TOTAL;

/// Sends blocked clients to the external unblock flow.
#[derive(Clone)]
pub struct UnblockDispatcher {
    client: reqwest::Client,
    base: Url,
    key: String,
    mode: UnblockMode,
}

impl UnblockDispatcher {
    pub fn new(client: reqwest::Client, base: Url, key: String, mode: UnblockMode) -> Self {
        Self {
            client,
            base,
            key,
            mode,
        }
    }

    // base url with student and key set, any existing values replaced
    pub fn target(&self, identity: &str) -> Url {
        let mut url = self.base.clone();
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| k != "student" && k != "key")
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(kept)
            .append_pair("student", identity)
            .append_pair("key", &self.key);
        url
    }

    pub fn dispatch(&self, identity: &str) -> Response {
        let target = self.target(identity);
        BLOCKED_TOTAL.inc();

        match self.mode {
            UnblockMode::Fetch => {
                tracing::info!(student = %identity, "client blocked, notifying unblock endpoint");
                let client = self.client.clone();
                // detached, outcome is ignored
                tokio::spawn(async move {
                    let _ = client.get(target).send().await;
                });
                (StatusCode::TOO_MANY_REQUESTS, "Too Many Requests").into_response()
            }
            UnblockMode::Redirect => {
                tracing::info!(
                    student = %identity,
                    "client blocked, redirecting to unblock endpoint"
                );
                (StatusCode::FOUND, [(header::LOCATION, target.to_string())]).into_response()
            }
        }
    }
}
