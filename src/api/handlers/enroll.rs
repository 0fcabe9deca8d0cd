use crate::{
    api::{
        AppState,
        handlers::{ApiError, ErrorBody, authenticate},
    },
    cloudant::{Endpoint, database_name},
};
use axum::{Json, extract::Extension, http::HeaderMap};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;

/// Public Cloudant endpoint handed to the device.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CloudantAccess {
    pub host: String,
    pub port: u16,
    pub protocol: String,
}

impl From<&Endpoint> for CloudantAccess {
    fn from(endpoint: &Endpoint) -> Self {
        Self {
            host: endpoint.host.clone(),
            port: endpoint.port,
            protocol: endpoint.protocol.clone(),
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct EnrollResponse {
    pub cloudant_access: CloudantAccess,
    pub database: String,
    #[serde(rename = "sessionCookie")]
    pub session_cookie: String,
}

#[utoipa::path(
    put,
    path = "/bluelist/enroll",
    responses (
        (status = 200, description = "Database ready, session opened", body = EnrollResponse),
        (status = 401, description = "Missing or rejected Authorization header", body = ErrorBody),
        (status = 500, description = "Cloudant provisioning failed", body = ErrorBody),
        (status = 503, description = "Identity service unavailable", body = ErrorBody),
    ),
    tag = "bluelist",
)]
/// Provision the caller's database and open a Cloudant session for it.
#[instrument(skip(state, headers))]
pub async fn enroll(
    state: Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<EnrollResponse>, ApiError> {
    let user = authenticate(&state, &headers).await?;
    let database = database_name(&user.id);

    info!("Enrolling user ({}) with database {database}", user.id);

    state.cloudant.provision(&database).await?;

    let api_key = state
        .cloudant
        .ensure_credentials(&state.registry, &database)
        .await?;
    let session_cookie = state.cloudant.session_cookie(&api_key).await?;

    Ok(Json(EnrollResponse {
        cloudant_access: state.cloudant.endpoint().into(),
        database,
        session_cookie,
    }))
}
