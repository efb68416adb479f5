use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::VerifierError;

// Name of the form field the Turnstile widget fills in
pub const PROOF_FIELD: &str = "cf-turnstile-response";

/// Checks a challenge proof token with an external provider.
#[async_trait]
pub trait ChallengeVerifier: Send + Sync {
    /// `Ok(true)` only when the provider reported success.
    async fn verify(&self, token: &str, remote_ip: Option<&str>) -> Result<bool, VerifierError>;
}

// siteverify request body
#[derive(Serialize)]
struct SiteVerifyRequest<'a> {
    secret: &'a str,
    response: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    remoteip: Option<&'a str>,
}

// siteverify response, only `success` matters
#[derive(Deserialize, Debug)]
pub struct SiteVerifyResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(rename = "error-codes", default)]
    pub error_codes: Vec<String>,
}

pub struct TurnstileVerifier {
    client: reqwest::Client,
    verify_url: String,
    secret: Option<String>,
}

impl TurnstileVerifier {
    pub fn new(client: reqwest::Client, verify_url: String, secret: Option<String>) -> Self {
        Self {
            client,
            verify_url,
            secret,
        }
    }
}

#[async_trait]
impl ChallengeVerifier for TurnstileVerifier {
    async fn verify(&self, token: &str, remote_ip: Option<&str>) -> Result<bool, VerifierError> {
        let secret = self.secret.as_deref().ok_or(VerifierError::NotConfigured)?;

        let body: SiteVerifyResponse = self
            .client
            .post(&self.verify_url)
            .form(&SiteVerifyRequest {
                secret,
                response: token,
                remoteip: remote_ip,
            })
            .send()
            .await?
            .json()
            .await?;

        if !body.success {
            tracing::info!(errors = ?body.error_codes, "challenge rejected by verifier");
        }
        Ok(body.success)
    }
}
