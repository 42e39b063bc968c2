use crate::{
    auth::jwt::{TokenType, generate_access_token, generate_refresh_token, verify_token},
    config::Config,
    error::AttendanceError,
    model::{Employee, Identity},
    state::AppState,
};
use actix_web::{HttpRequest, HttpResponse, error::ErrorInternalServerError, web};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "ana@empresa.com")]
    pub email: String,
    /// National ID, punctuation allowed.
    #[schema(example = "529.982.247-25")]
    pub document: String,
}

#[derive(Serialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub employee: Employee,
}

fn issue_pair(identity: &Identity, config: &Config) -> actix_web::Result<TokenPair> {
    let access_token =
        generate_access_token(identity, &config.jwt_secret, config.access_token_ttl).map_err(
            |e| {
                error!(error = %e, "Failed to sign access token");
                ErrorInternalServerError("token signing failed")
            },
        )?;
    let (refresh_token, _) =
        generate_refresh_token(identity, &config.jwt_secret, config.refresh_token_ttl).map_err(
            |e| {
                error!(error = %e, "Failed to sign refresh token");
                ErrorInternalServerError("token signing failed")
            },
        )?;
    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

/// Log in with email and document number.
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = LoginResponse),
        (status = 400, description = "Missing email or document"),
        (status = 401, description = "Invalid credentials")
    )
)]
#[instrument(name = "auth_login", skip(state, config, body), fields(email = %body.email))]
pub async fn login(
    body: web::Json<LoginRequest>,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> actix_web::Result<HttpResponse> {
    info!("Login request received");

    let employee = state.gate.authenticate(&body.email, &body.document).await?;
    let pair = issue_pair(&Identity::from(&employee), &config)?;

    info!(matricula = %employee.matricula, "Login successful");
    Ok(HttpResponse::Ok().json(LoginResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        employee,
    }))
}

/// Exchange a refresh token for a new token pair.
#[utoipa::path(
    post,
    path = "/auth/refresh",
    tag = "Auth",
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 401, description = "Missing, invalid or non-refresh token")
    ),
    security(("bearer_auth" = []))
)]
#[instrument(name = "auth_refresh", skip_all)]
pub async fn refresh_token(
    req: HttpRequest,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> actix_web::Result<HttpResponse> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(AttendanceError::InvalidCredentials)?;

    let claims = verify_token(token, &config.jwt_secret)
        .map_err(|_| AttendanceError::InvalidCredentials)?;
    if claims.token_type != TokenType::Refresh {
        return Err(AttendanceError::InvalidCredentials.into());
    }
    let matricula = claims
        .identity()
        .ok_or(AttendanceError::InvalidCredentials)?
        .matricula;

    // Re-read the record so deleted employees and role changes take effect.
    let employee = state
        .store
        .find_employee(&matricula)
        .await
        .map_err(AttendanceError::from)?
        .ok_or(AttendanceError::InvalidCredentials)?;

    let pair = issue_pair(&Identity::from(&employee), &config)?;
    info!(matricula = %employee.matricula, "Tokens refreshed");
    Ok(HttpResponse::Ok().json(pair))
}
