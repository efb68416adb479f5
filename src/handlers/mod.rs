mod admin;
mod captcha;
mod health;
mod metrics;
mod proxy;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use crate::state::AppState;

pub use admin::admin_unblock_handler;
pub use captcha::{captcha_page_handler, captcha_verify_handler, render_captcha_page};
pub use health::health_handler;
pub use metrics::metrics_handler;
pub use proxy::proxy_handler;

// Public surface: auxiliary endpoints are exact matches, everything else is proxied
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/admin/unblock", get(admin_unblock_handler))
        .route("/captcha", get(captcha_page_handler))
        .route("/captcha/verify", post(captcha_verify_handler))
        .fallback(proxy_handler)
        .with_state(state)
}

// Ops surface on its own port
pub fn ops_router() -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
}
