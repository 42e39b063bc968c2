use crate::{
    api::parse_matricula,
    auth::AuthUser,
    model::{Employee, EmployeeUpdate, NewEmployee},
    state::AppState,
};
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct EmployeeQuery {
    /// Name substring, or registration/document prefix.
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<Employee>,
    #[schema(example = 10)]
    pub total: usize,
}

/// Register an employee (HR/Admin)
#[utoipa::path(
    post,
    path = "/api/employees",
    request_body = NewEmployee,
    responses(
        (status = 201, description = "Employee registered", body = Employee),
        (status = 400, description = "Invalid name, email or document"),
        (status = 403, description = "HR/Admin only"),
        (status = 409, description = "Email already registered")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_employee(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<NewEmployee>,
) -> actix_web::Result<impl Responder> {
    let employee = state
        .identities
        .create(auth.identity(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(employee))
}

/// List or search employees (HR/Admin)
#[utoipa::path(
    get,
    path = "/api/employees",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Employee list", body = EmployeeListResponse),
        (status = 403, description = "HR/Admin only")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_employees(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<EmployeeQuery>,
) -> actix_web::Result<impl Responder> {
    let data = match &query.search {
        Some(term) => state.identities.search(auth.identity(), term).await?,
        None => state.identities.list(auth.identity()).await?,
    };

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        total: data.len(),
        data,
    }))
}

/// Get Employee by registration number
#[utoipa::path(
    get,
    path = "/api/employees/{matricula}",
    params(
        ("matricula", Path, description = "Registration number, NNNNN-NN")
    ),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 403, description = "Not your record"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_employee(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    let matricula = parse_matricula(&path)?;
    let employee = state.identities.get(auth.identity(), &matricula).await?;
    Ok(HttpResponse::Ok().json(employee))
}

/// Update Employee (HR/Admin)
#[utoipa::path(
    put,
    path = "/api/employees/{matricula}",
    params(
        ("matricula", Path, description = "Registration number, NNNNN-NN")
    ),
    request_body = EmployeeUpdate,
    responses(
        (status = 200, description = "Employee updated", body = Employee),
        (status = 400, description = "Empty or invalid update"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_employee(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<EmployeeUpdate>,
) -> actix_web::Result<impl Responder> {
    let matricula = parse_matricula(&path)?;
    let employee = state
        .identities
        .update(auth.identity(), &matricula, body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(employee))
}

/// Delete Employee (HR/Admin). Punch history is kept.
#[utoipa::path(
    delete,
    path = "/api/employees/{matricula}",
    params(
        ("matricula", Path, description = "Registration number, NNNNN-NN")
    ),
    responses(
        (status = 200, description = "Successfully deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_employee(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> actix_web::Result<impl Responder> {
    let matricula = parse_matricula(&path)?;
    state.identities.delete(auth.identity(), &matricula).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Successfully deleted"
    })))
}
