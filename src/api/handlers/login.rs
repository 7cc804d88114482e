use super::{parse_body, require_email, require_non_empty};
use crate::{
    api::error::{ApiError, ErrorBody},
    provider::IdentityProvider,
};
use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
use tracing::{debug, error, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize)]
pub struct LoginRequest {
    email: String,
    #[schema(format = Password)]
    password: String,
}

impl LoginRequest {
    fn validate(&self) -> Result<(), ApiError> {
        require_email(&self.email)?;
        require_non_empty("password", &self.password)
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    message: String,
    token: String,
}

#[utoipa::path(
    post,
    path= "/login",
    request_body = LoginRequest,
    responses (
        (status = 200, description = "Login successful", body = LoginResponse, content_type = "application/json"),
        (status = 400, description = "Malformed request or credentials rejected by the identity provider", body = ErrorBody),
        (status = 500, description = "Identity provider misconfigured", body = ErrorBody),
    ),
    tag= "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    provider: Extension<Arc<dyn IdentityProvider>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let request = parse_body("login", payload)?;

    debug!("login request: {:?}", request);

    request.validate()?;

    let password = SecretString::from(request.password);
    let res = provider
        .login(&request.email, &password)
        .await
        .map_err(|err| {
            error!("error logging in: {}", err);
            ApiError::from(err)
        })?;

    Ok(Json(LoginResponse {
        message: res.message.unwrap_or_default(),
        token: res.access_token.unwrap_or_default(),
    }))
}
