use crate::{
    api::parse_matricula,
    auth::AuthUser,
    error::AttendanceError,
    model::{GeoLocation, Matricula, PunchId, PunchRecord, PunchType},
    session::RecordedPunch,
    state::AppState,
};
use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct RecordPunchRequest {
    /// Target employee; defaults to the caller. Other targets are HR/Admin only.
    #[schema(example = "04821-37")]
    pub employee: Option<String>,
    pub location: Option<GeoLocation>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct DayQuery {
    /// Defaults to the caller.
    pub employee: Option<String>,
    /// `YYYY-MM-DD`, defaults to today.
    #[param(value_type = Option<String>, format = "date")]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct EmployeeParam {
    pub employee: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct PeriodQuery {
    #[param(value_type = String, format = "date")]
    pub from: NaiveDate,
    #[param(value_type = String, format = "date")]
    pub to: NaiveDate,
    /// Omit for every employee (HR/Admin only).
    pub employee: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct DeleteQuery {
    /// Must be `true`.
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct AmendPunchRequest {
    pub punch_type: PunchType,
    /// Epoch milliseconds, must stay within the punch's original day.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    #[schema(value_type = i64)]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NextPunchResponse {
    pub complete: bool,
    #[schema(nullable = true)]
    pub next: Option<PunchType>,
    /// Button label for the next punch.
    #[schema(nullable = true, example = "Almoço")]
    pub label: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PunchListResponse {
    pub data: Vec<PunchRecord>,
    pub total: usize,
}

impl From<Vec<PunchRecord>> for PunchListResponse {
    fn from(data: Vec<PunchRecord>) -> Self {
        PunchListResponse {
            total: data.len(),
            data,
        }
    }
}

fn target_or_self(auth: &AuthUser, raw: Option<&str>) -> Result<Matricula, AttendanceError> {
    match raw {
        Some(raw) => parse_matricula(raw),
        None => Ok(auth.matricula().clone()),
    }
}

/// Record the next punch of today
#[utoipa::path(
    post,
    path = "/api/punches",
    request_body = RecordPunchRequest,
    responses(
        (status = 201, description = "Punch recorded; body holds the day re-read from storage", body = RecordedPunch),
        (status = 403, description = "Punching for someone else without HR/Admin role"),
        (status = 404, description = "Unknown employee"),
        (status = 409, description = "Duplicate punch, journey complete or punch in progress"),
        (status = 422, description = "Stored day is out of order")
    ),
    tag = "Punch",
    security(
        ("bearer_auth" = [])
    )
)]
#[instrument(name = "record_punch", skip_all, fields(by = %auth.matricula()))]
pub async fn record_punch(
    auth: AuthUser,
    state: web::Data<AppState>,
    body: Option<web::Json<RecordPunchRequest>>,
) -> actix_web::Result<impl Responder> {
    let body = body.map(web::Json::into_inner).unwrap_or_default();
    let target = target_or_self(&auth, body.employee.as_deref())?;

    let recorded = state
        .sessions
        .record_punch(auth.identity(), &target, body.location)
        .await?;
    Ok(HttpResponse::Created().json(recorded))
}

/// Punches of one day
#[utoipa::path(
    get,
    path = "/api/punches",
    params(DayQuery),
    responses(
        (status = 200, description = "Day's punches ascending by time", body = PunchListResponse),
        (status = 403, description = "Not your record")
    ),
    tag = "Punch",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn day_punches(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<DayQuery>,
) -> actix_web::Result<impl Responder> {
    let target = target_or_self(&auth, query.employee.as_deref())?;
    let day = query.date.unwrap_or_else(|| state.sessions.today());

    let punches = state
        .sessions
        .day_punches(auth.identity(), &target, day)
        .await?;
    Ok(HttpResponse::Ok().json(PunchListResponse::from(punches)))
}

/// Which punch comes next today
#[utoipa::path(
    get,
    path = "/api/punches/next",
    params(EmployeeParam),
    responses(
        (status = 200, description = "Next punch type, or complete", body = NextPunchResponse),
        (status = 422, description = "Stored day is out of order")
    ),
    tag = "Punch",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn next_punch(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<EmployeeParam>,
) -> actix_web::Result<impl Responder> {
    let target = target_or_self(&auth, query.employee.as_deref())?;
    let next = state.sessions.next_punch(auth.identity(), &target).await?;

    Ok(HttpResponse::Ok().json(NextPunchResponse {
        complete: next.is_complete(),
        next: next.punch_type(),
        label: next.punch_type().map(|t| t.label().to_string()),
    }))
}

/// Punches over a period of whole days
#[utoipa::path(
    get,
    path = "/api/punches/period",
    params(PeriodQuery),
    responses(
        (status = 200, description = "Punches in period ascending by time", body = PunchListResponse),
        (status = 400, description = "Invalid period"),
        (status = 403, description = "HR/Admin only for other or all employees")
    ),
    tag = "Punch",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn period_punches(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<PeriodQuery>,
) -> actix_web::Result<impl Responder> {
    let target = query
        .employee
        .as_deref()
        .map(parse_matricula)
        .transpose()?;

    let punches = state
        .sessions
        .punches_in_period(auth.identity(), target.as_ref(), query.from, query.to)
        .await?;
    Ok(HttpResponse::Ok().json(PunchListResponse::from(punches)))
}

/// Correct a punch (HR/Admin)
#[utoipa::path(
    put,
    path = "/api/punches/{id}",
    params(
        ("id", Path, description = "Punch id")
    ),
    request_body = AmendPunchRequest,
    responses(
        (status = 200, description = "Punch amended", body = Object, example = json!({
            "message": "Punch amended"
        })),
        (status = 400, description = "Timestamp outside the punch's day"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Punch not found"),
        (status = 409, description = "Type already present that day"),
        (status = 422, description = "Resulting day would be out of order")
    ),
    tag = "Punch",
    security(
        ("bearer_auth" = [])
    )
)]
#[instrument(name = "amend_punch", skip_all, fields(by = %auth.matricula(), punch_id = %path))]
pub async fn amend_punch(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<AmendPunchRequest>,
) -> actix_web::Result<impl Responder> {
    let id = PunchId::from(path.into_inner());
    state
        .sessions
        .amend_punch(auth.identity(), &id, body.punch_type, body.timestamp)
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Punch amended"
    })))
}

/// Delete a punch (HR/Admin, requires `confirm=true`)
#[utoipa::path(
    delete,
    path = "/api/punches/{id}",
    params(
        ("id", Path, description = "Punch id"),
        DeleteQuery
    ),
    responses(
        (status = 200, description = "Successfully deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 400, description = "Missing confirmation"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Punch not found"),
        (status = 422, description = "Only the last punch of a day may be removed")
    ),
    tag = "Punch",
    security(
        ("bearer_auth" = [])
    )
)]
#[instrument(name = "delete_punch", skip_all, fields(by = %auth.matricula(), punch_id = %path))]
pub async fn delete_punch(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<DeleteQuery>,
) -> actix_web::Result<impl Responder> {
    if !query.confirm {
        return Err(AttendanceError::validation("deletion requires confirm=true").into());
    }

    let id = PunchId::from(path.into_inner());
    state.sessions.delete_punch(auth.identity(), &id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Successfully deleted"
    })))
}
