use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use std::sync::Arc;

use crate::error::GatekeeperError;
use crate::metrics::UNBLOCKS_TOTAL;
use crate::models::{AdminUnblockQuery, Params, non_empty};
use crate::state::AppState;

// Manual unblock, key is checked before anything else
pub async fn admin_unblock_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Params>,
) -> Result<impl IntoResponse, GatekeeperError> {
    let query = AdminUnblockQuery::from(params);
    let authorized = match (state.admin_secret.as_deref(), query.key.as_deref()) {
        (Some(secret), Some(key)) => !secret.is_empty() && secret == key,
        _ => false,
    };
    if !authorized {
        tracing::warn!("admin unblock with bad key");
        return Err(GatekeeperError::Unauthorized);
    }

    let student = non_empty(query.student).ok_or(GatekeeperError::MissingParameter("student"))?;

    state.limiter.reset(&student).await?;
    UNBLOCKS_TOTAL.with_label_values(&["admin"]).inc();
    tracing::info!(student = %student, "student unblocked manually");

    Ok((
        [(header::CONTENT_TYPE, "text/plain")],
        format!("Student {} unblocked manually", student),
    ))
}
