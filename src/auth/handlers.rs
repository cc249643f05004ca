use crate::{
    auth::{jwt::generate_access_token, password::verify_password},
    config::Config,
    models::LoginReqDto,
};
use actix_web::{web, HttpResponse, Responder};
use serde::Serialize;
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    #[schema(example = "eyJhbGciOiJIUzI1NiJ9...")]
    pub access_token: String,
}

/// Admin login: credentials are checked against the configured admin
/// account, not a user table. Success yields a short-lived access token.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body(
        content = LoginReqDto,
        description = "Admin credentials",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Missing username or password"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(config, user),
    fields(username = %user.username)
)]
pub async fn login(user: web::Json<LoginReqDto>, config: web::Data<Config>) -> impl Responder {
    info!("Login request received");

    if user.username.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return HttpResponse::BadRequest().body("Username or password required");
    }

    if user.username != config.admin_username {
        info!("Invalid credentials: unknown username");
        return HttpResponse::Unauthorized().body("Invalid credentials");
    }

    debug!("Verifying password");

    if let Err(e) = verify_password(&user.password, &config.admin_password_hash) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return HttpResponse::Unauthorized().body("Invalid credentials");
    }

    debug!("Generating access token");

    let access_token = generate_access_token(
        user.username.clone(),
        &config.jwt_secret,
        config.access_token_ttl,
    );

    info!("Login successful");

    HttpResponse::Ok().json(LoginResponse { access_token })
}

/// Tokens are stateless; there is nothing to revoke server-side, so
/// logout only acknowledges that the client discarded its token.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 204, description = "Logged out")
    ),
    tag = "Auth"
)]
pub async fn logout() -> impl Responder {
    HttpResponse::NoContent().finish()
}
