use axum::body::{Body, to_bytes};
use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, header};
use axum::response::Response;
use std::sync::Arc;
use std::time::Instant;

use crate::error::GatekeeperError;
use crate::metrics::{ALLOWED_TOTAL, ORIGIN_LATENCY, REQUEST_TOTAL, UNTRACKED_TOTAL};
use crate::state::AppState;

pub const COUNT_HEADER: &str = "x-rate-limit-count";

// Connection level headers the server re-derives for the relayed body
const HOP_BY_HOP: [HeaderName; 3] = [
    header::CONNECTION,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

fn identity(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// Every path without its own endpoint ends up here
pub async fn proxy_handler(
    State(state): State<Arc<AppState>>,
    req: Request,
) -> Result<Response, GatekeeperError> {
    REQUEST_TOTAL.inc();

    let student = identity(req.headers(), &state.identity_header);

    match &student {
        Some(id) => {
            let hit = state.limiter.hit(id).await;
            if hit.blocked {
                return Ok(state.dispatcher.dispatch(id));
            }
            ALLOWED_TOTAL.inc();
            tracing::debug!(student = %id, count = hit.count, "request allowed");
        }
        None => UNTRACKED_TOTAL.inc(),
    }

    let mut response = forward(&state, req).await?;

    if let Some(id) = &student {
        let current = state.limiter.current(id).await;
        response.headers_mut().insert(
            HeaderName::from_static(COUNT_HEADER),
            HeaderValue::from(current),
        );
    }

    Ok(response)
}

// Send the request to origin as is and copy the answer back
async fn forward(state: &AppState, req: Request) -> Result<Response, GatekeeperError> {
    let (parts, body) = req.into_parts();

    let mut url = state.origin.clone();
    url.set_path(parts.uri.path());
    url.set_query(parts.uri.query());

    // buffered up to max_body_bytes
    let body = to_bytes(body, state.max_body_bytes)
        .await
        .map_err(|e| {
            tracing::debug!(error = %e, limit = state.max_body_bytes, "request body refused");
            GatekeeperError::PayloadTooLarge
        })?;

    let mut headers = parts.headers;
    headers.remove(header::HOST);
    headers.remove(header::CONTENT_LENGTH);

    let start = Instant::now();
    let upstream = state
        .client
        .request(parts.method, url)
        .headers(headers)
        .body(body)
        .send()
        .await
        .map_err(GatekeeperError::Origin)?;

    ORIGIN_LATENCY.observe(start.elapsed().as_secs_f64());

    let status = upstream.status();
    let mut out_headers = upstream.headers().clone();

    for name in HOP_BY_HOP.iter() {
        out_headers.remove(name);
    }

    // origin body is streamed through, never buffered
    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = out_headers;
    Ok(response)
}
