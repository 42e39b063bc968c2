use crate::api::employee::{EmployeeListResponse, EmployeeQuery};
use crate::api::punch::{
    AmendPunchRequest, NextPunchResponse, PunchListResponse, RecordPunchRequest,
};
use crate::auth::handlers::{LoginRequest, LoginResponse, TokenPair};
use crate::model::{
    AmendmentStamp, Branch, Employee, EmployeeUpdate, GeoLocation, NewEmployee, PunchRecord,
    PunchType, Role, Sex, Shift,
};
use crate::session::RecordedPunch;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Ponto API",
        version = "1.0.0",
        description = r#"
## Time and attendance

Employees punch in and out through a fixed daily sequence:
**CHEGADA → ALMOCO → TERMINO_ALMOCO → SAIDA**.

### Roles
- **Funcionario** punches and reads their own records only.
- **RH** and **admin** manage employees, punch on behalf of others,
  and correct or delete punches. Every correction carries an audit stamp.

### Security
All endpoints except `/auth/*` require a **JWT Bearer** access token.

### Conventions
- Timestamps are epoch milliseconds.
- Days follow the server's configured local UTC offset.
- Errors are `{"error": CODE, "message": text}`.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,

        crate::api::me::me,

        crate::api::employee::create_employee,
        crate::api::employee::get_employee,
        crate::api::employee::list_employees,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,

        crate::api::punch::record_punch,
        crate::api::punch::day_punches,
        crate::api::punch::next_punch,
        crate::api::punch::period_punches,
        crate::api::punch::amend_punch,
        crate::api::punch::delete_punch
    ),
    components(
        schemas(
            LoginRequest,
            LoginResponse,
            TokenPair,
            Employee,
            NewEmployee,
            EmployeeUpdate,
            EmployeeQuery,
            EmployeeListResponse,
            Role,
            Branch,
            Shift,
            Sex,
            PunchType,
            PunchRecord,
            GeoLocation,
            AmendmentStamp,
            RecordedPunch,
            RecordPunchRequest,
            AmendPunchRequest,
            NextPunchResponse,
            PunchListResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login and token refresh"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "Punch", description = "Punch recording, queries and corrections"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
