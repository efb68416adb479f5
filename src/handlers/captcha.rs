use axum::Form;
use axum::extract::rejection::FormRejection;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use std::sync::Arc;

use crate::error::GatekeeperError;
use crate::metrics::UNBLOCKS_TOTAL;
use crate::models::{CaptchaQuery, CaptchaVerifyForm, Params, non_empty};
use crate::state::AppState;
use crate::verifier::PROOF_FIELD;

const WIDGET_SCRIPT: &str = "https://challenges.cloudflare.com/turnstile/v0/api.js";

// Escape text for use inside element content or a double quoted attribute
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn render_captcha_page(student: &str, site_key: &str) -> String {
    format!(
        r#"<html>
<body>
  <h2>Complete CAPTCHA to unblock</h2>

  <form action="/captcha/verify" method="POST">
    <input type="hidden" name="student" value="{student}" />

    <div class="cf-turnstile" data-sitekey="{site_key}"></div>

    <br/>

    <button type="submit">Verify</button>
  </form>

  <script src="{WIDGET_SCRIPT}"></script>
</body>
</html>
"#,
        student = escape_html(student),
        site_key = escape_html(site_key),
    )
}

pub async fn captcha_page_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Params>,
) -> Html<String> {
    let student = CaptchaQuery::from(params).student.unwrap_or_default();
    Html(render_captcha_page(&student, &state.site_key))
}

// Client address as reported by the edge, passed along to the verifier
fn remote_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(ip) = headers.get("cf-connecting-ip").and_then(|v| v.to_str().ok()) {
        return Some(ip.trim().to_string());
    }
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
}

pub async fn captcha_verify_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    form: Result<Form<Params>, FormRejection>,
) -> Result<Response, GatekeeperError> {
    let Form(params) = form.map_err(|e| {
        tracing::debug!(error = %e, "unreadable verify form");
        GatekeeperError::BadRequest
    })?;
    let form = CaptchaVerifyForm::from(params);

    let (Some(student), Some(proof)) = (non_empty(form.student), non_empty(form.proof)) else {
        tracing::debug!(field = PROOF_FIELD, "verify form missing student or proof");
        return Err(GatekeeperError::BadRequest);
    };

    let ip = remote_ip(&headers);
    match state.verifier.verify(&proof, ip.as_deref()).await {
        Ok(true) => {}
        Ok(false) => return Err(GatekeeperError::ChallengeFailed),
        Err(e) => {
            tracing::warn!(student = %student, error = %e, "challenge verification errored");
            return Err(GatekeeperError::ChallengeFailed);
        }
    }

    state.limiter.reset(&student).await?;
    UNBLOCKS_TOTAL.with_label_values(&["challenge"]).inc();
    tracing::info!(student = %student, "student unblocked by challenge");

    Ok((StatusCode::FOUND, [(header::LOCATION, "/")]).into_response())
}
