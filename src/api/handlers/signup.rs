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
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    email: String,
    #[schema(format = Password)]
    password: String,
    #[schema(format = Password)]
    confirm_password: String,
}

impl SignupRequest {
    /// Password confirmation is checked here, before the provider sees the request.
    fn validate(&self) -> Result<(), ApiError> {
        require_email(&self.email)?;
        require_non_empty("password", &self.password)?;
        require_non_empty("confirmPassword", &self.confirm_password)?;

        if self.password != self.confirm_password {
            return Err(ApiError::BadRequest(
                "password and confirmPassword do not match".to_string(),
            ));
        }

        Ok(())
    }
}

impl fmt::Debug for SignupRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupRequest")
            .field("email", &self.email)
            .field("password", &"***")
            .field("confirm_password", &"***")
            .finish()
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SignupResponse {
    message: String,
}

#[utoipa::path(
    post,
    path= "/signup",
    request_body = SignupRequest,
    responses (
        (status = 200, description = "Signup accepted by the identity provider", body = SignupResponse, content_type = "application/json"),
        (status = 400, description = "Malformed request, password mismatch or signup rejected by the identity provider", body = ErrorBody),
        (status = 500, description = "Identity provider misconfigured", body = ErrorBody),
    ),
    tag= "auth"
)]
#[instrument(skip_all)]
pub async fn signup(
    provider: Extension<Arc<dyn IdentityProvider>>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<Json<SignupResponse>, ApiError> {
    let request = parse_body("sign up", payload)?;

    debug!("sign up request: {:?}", request);

    request.validate()?;

    let password = SecretString::from(request.password);
    let confirm_password = SecretString::from(request.confirm_password);
    let res = provider
        .sign_up(&request.email, &password, &confirm_password)
        .await
        .map_err(|err| {
            error!("error signing up: {}", err);
            ApiError::from(err)
        })?;

    Ok(Json(SignupResponse {
        message: res.message.unwrap_or_default(),
    }))
}
