use crate::api::employee::{CreateEmployee, RenameEmployee};
use crate::api::leave::{CalendarEntry, EditLeave, LeaveBatchRequest, LeaveBatchResponse};
use crate::api::schedule::{ReplacementEntry, ScheduleEntry};
use crate::auth::handlers::LoginResponse;
use crate::model::employee::Employee;
use crate::models::LoginReqDto;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Leavedesk API",
        version = "1.0.0",
        description = r#"
## Leave tracking & same-day replacements

Tracks single-day employee leaves and assigns a covering replacement for
each one.

### Key Features
- **Leave batches**: submit candidate dates for one employee/replacement
  pair; each date is approved or declined by the capacity and conflict
  rules.
- **Schedule**: chronological view of who is out and who covers.
- **Admin**: manage employees and edit or delete leave records.

### Security
Mutation endpoints require a **JWT Bearer token** obtained from
`/auth/login` with the configured admin credentials.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::leave::request_leave,
        crate::api::leave::get_leaves,
        crate::api::leave::edit_leave,
        crate::api::leave::delete_leave,

        crate::api::employee::list_employees,
        crate::api::employee::create_employee,
        crate::api::employee::rename_employee,
        crate::api::employee::delete_employee,

        crate::api::schedule::leave_schedule,
        crate::api::schedule::get_replacements,

        crate::auth::handlers::login,
        crate::auth::handlers::logout
    ),
    components(
        schemas(
            LeaveBatchRequest,
            LeaveBatchResponse,
            CalendarEntry,
            EditLeave,
            CreateEmployee,
            RenameEmployee,
            Employee,
            ScheduleEntry,
            ReplacementEntry,
            LoginReqDto,
            LoginResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Leave", description = "Leave submission and record editing"),
        (name = "Schedule", description = "Read-only schedule views"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "Auth", description = "Admin session APIs"),
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
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
}
