//! `/health`: build info plus Cloudant reachability.

use crate::{GIT_COMMIT_HASH, api::AppState};
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::{Duration, timeout};
use tracing::{Instrument, debug, error, info_span, warn};
use utoipa::ToSchema;

const HEALTH_CLOUDANT_TIMEOUT_SECONDS: u64 = 2;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    cloudant: String,
}

#[utoipa::path(
    get,
    path= "/health",
    responses (
        (status = 200, description = "Cloudant is reachable", body = Health),
        (status = 503, description = "Cloudant is unreachable", body = Health)
    ),
    tag = "health",
)]
/// Report build info and whether Cloudant answers with the admin credentials.
pub async fn health(method: Method, state: Extension<Arc<AppState>>) -> impl IntoResponse {
    let cloudant_healthy = probe_cloudant(&state).await;

    let health = Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cloudant: if cloudant_healthy {
            "ok".to_string()
        } else {
            "error".to_string()
        },
    };

    let body = if method == Method::GET {
        Json(&health).into_response()
    } else {
        Body::empty().into_response()
    };

    let short_hash = if health.commit.len() > 7 {
        &health.commit[0..7]
    } else {
        ""
    };

    let headers = format!("{}:{}:{}", health.name, health.version, short_hash)
        .parse::<HeaderValue>()
        .map(|x_app_header_value| {
            debug!("X-App header: {:?}", x_app_header_value);

            let mut headers = HeaderMap::new();
            headers.insert("X-App", x_app_header_value);
            headers
        })
        .map_err(|err| {
            debug!("Failed to parse X-App header: {}", err);
        })
        .unwrap_or_else(|()| HeaderMap::new());

    if cloudant_healthy {
        (StatusCode::OK, headers, body)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, headers, body)
    }
}

async fn probe_cloudant(state: &AppState) -> bool {
    let span = info_span!("cloudant.ping", server.address = %state.cloudant.endpoint().host);

    match timeout(
        Duration::from_secs(HEALTH_CLOUDANT_TIMEOUT_SECONDS),
        state.cloudant.ping().instrument(span),
    )
    .await
    {
        Ok(Ok(())) => {
            debug!("Cloudant is reachable");
            true
        }
        Ok(Err(detail)) => {
            error!("Failed to ping Cloudant: {detail}");
            false
        }
        Err(_) => {
            warn!("Cloudant health check timed out");
            false
        }
    }
}
