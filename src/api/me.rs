use crate::{auth::AuthUser, model::Employee, state::AppState};
use actix_web::{HttpResponse, Responder, web};

/// Profile of the authenticated caller
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Caller's employee record", body = Employee),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Record deleted since login")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn me(auth: AuthUser, state: web::Data<AppState>) -> actix_web::Result<impl Responder> {
    let employee = state
        .identities
        .get(auth.identity(), auth.matricula())
        .await?;
    Ok(HttpResponse::Ok().json(employee))
}
