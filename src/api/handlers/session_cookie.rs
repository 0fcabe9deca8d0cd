use crate::{
    api::{
        AppState,
        handlers::{ApiError, ErrorBody, authenticate},
    },
    cloudant::database_name,
};
use axum::{Json, extract::Extension, http::HeaderMap};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SessionCookieResponse {
    #[serde(rename = "sessionCookie")]
    pub session_cookie: String,
}

#[utoipa::path(
    post,
    path = "/bluelist/sessioncookie",
    responses (
        (status = 200, description = "New session cookie", body = SessionCookieResponse),
        (status = 401, description = "Missing or rejected Authorization header", body = ErrorBody),
        (status = 404, description = "User has not enrolled", body = ErrorBody),
        (status = 500, description = "Cloudant refused the session", body = ErrorBody),
        (status = 503, description = "Identity service unavailable", body = ErrorBody),
    ),
    tag = "bluelist",
)]
/// Open a new Cloudant session for an enrolled user.
#[instrument(skip(state, headers))]
pub async fn session_cookie(
    state: Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SessionCookieResponse>, ApiError> {
    let user = authenticate(&state, &headers).await?;
    let database = database_name(&user.id);

    let Some(api_key) = state
        .cloudant
        .load_credentials(&state.registry, &database)
        .await?
    else {
        return Err(ApiError::NotEnrolled(user.id));
    };

    debug!("Opening session for database {database}");

    let session_cookie = state.cloudant.session_cookie(&api_key).await?;

    Ok(Json(SessionCookieResponse { session_cookie }))
}
