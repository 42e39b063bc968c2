use crate::auth::auth::AuthUser;
use crate::auth::jwt::{TokenType, verify_token};
use crate::config::Config;
use crate::error::AttendanceError;
use crate::model::Identity;
use crate::state::AppState;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use serde_json::json;
use tracing::debug;

fn unauthorized(req: ServiceRequest, message: &str) -> ServiceResponse<BoxBody> {
    let resp = HttpResponse::Unauthorized().json(json!({"error": "UNAUTHORIZED", "message": message}));
    req.into_response(resp.map_into_boxed_body())
}

pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?
        .clone();
    let state = req
        .app_data::<Data<AppState>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App state missing"))?
        .clone();

    let header_value = match req.headers().get("Authorization") {
        Some(h) => match h.to_str() {
            Ok(v) => v,
            Err(_) => return Ok(unauthorized(req, "Invalid Authorization header encoding")),
        },
        None => return Ok(unauthorized(req, "Missing Authorization header")),
    };

    let token = match header_value.strip_prefix("Bearer ") {
        Some(t) => t,
        None => return Ok(unauthorized(req, "Authorization header must start with Bearer")),
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(e) => {
            debug!(error = %e, "Bearer token rejected");
            return Ok(unauthorized(req, "Invalid or expired token"));
        }
    };

    if claims.token_type != TokenType::Access {
        return Ok(unauthorized(req, "Access token required"));
    }

    let subject = match claims.identity() {
        Some(identity) => identity,
        None => return Ok(unauthorized(req, "Invalid token subject")),
    };

    // Role and existence come from the store, not from the token.
    let employee = match state
        .store
        .find_employee(&subject.matricula)
        .await
        .map_err(AttendanceError::from)?
    {
        Some(employee) => employee,
        None => {
            debug!(matricula = %subject.matricula, "Token subject no longer exists");
            return Ok(unauthorized(req, "Account no longer exists"));
        }
    };
    if employee.role != subject.role {
        debug!(
            matricula = %employee.matricula,
            token_role = %subject.role,
            role = %employee.role,
            "Role changed since token was issued"
        );
    }

    req.extensions_mut().insert(AuthUser(Identity::from(&employee)));

    next.call(req).await
}
