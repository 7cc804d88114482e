use super::{parse_body, require_email};
use crate::{
    api::error::{ApiError, ErrorBody},
    provider::IdentityProvider,
};
use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize, Debug)]
pub struct ForgotPasswordRequest {
    #[schema(format = Email)]
    email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ForgotPasswordResponse {
    message: String,
}

#[utoipa::path(
    post,
    path= "/forgot-password",
    request_body = ForgotPasswordRequest,
    responses (
        (status = 200, description = "Reset email requested", body = ForgotPasswordResponse, content_type = "application/json"),
        (status = 400, description = "Malformed request or email rejected by the identity provider", body = ErrorBody),
        (status = 500, description = "Identity provider misconfigured", body = ErrorBody),
    ),
    tag= "auth"
)]
#[instrument(skip_all)]
pub async fn forgot_password(
    provider: Extension<Arc<dyn IdentityProvider>>,
    payload: Result<Json<ForgotPasswordRequest>, JsonRejection>,
) -> Result<Json<ForgotPasswordResponse>, ApiError> {
    let request = parse_body("forgot password", payload)?;

    debug!("forgot password request: {:?}", request);

    // no provider call for addresses that are not even syntactically valid
    require_email(&request.email)?;

    let res = provider
        .forgot_password(&request.email)
        .await
        .map_err(|err| {
            error!("error in forgot password: {}", err);
            ApiError::from(err)
        })?;

    Ok(Json(ForgotPasswordResponse {
        message: res.message,
    }))
}
