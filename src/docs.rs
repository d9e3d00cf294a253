use crate::api::paystub::{
    DetailsQuery, MonthlyDetails, MonthlySummary, PaginatedSummaries, PaginationQuery,
    PaystubEvent, PaystubHeader,
};
use crate::api::user::{CreateUserDto, UpdateUserDto, UserResponse};
use crate::auth::handlers::ResetPasswordDto;
use crate::model::paystub::Paystub;
use crate::models::LoginReqDto;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Contracheque API",
        version = "0.1.0",
        description = r#"
## Payroll (contracheque) self-service portal

Employees authenticate with CPF + password, browse monthly pay-period
summaries and fetch the full earning/deduction breakdown of each paystub.

### Key features
- **Auth**: CPF/password login issuing a JWT; password reset verified
  against payroll records (birth date + mother's first name)
- **Accounts**: self-registration restricted to CPFs present in payroll
- **Paystubs**: monthly summaries (paginated, newest first), full details
  per competency ("MONTH/YEAR"), single event lookup

### Security
Protected endpoints use **JWT Bearer authentication**; paystub queries are
always scoped to the CPF inside the token.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::me,
        crate::auth::handlers::profile,
        crate::auth::handlers::reset_password,

        crate::api::user::create_user,
        crate::api::user::list_users,
        crate::api::user::get_user,
        crate::api::user::update_user,
        crate::api::user::delete_user,

        crate::api::paystub::list_summaries,
        crate::api::paystub::get_details,
        crate::api::paystub::get_event
    ),
    components(
        schemas(
            LoginReqDto,
            ResetPasswordDto,
            CreateUserDto,
            UpdateUserDto,
            UserResponse,
            Paystub,
            MonthlySummary,
            PaginatedSummaries,
            PaystubHeader,
            PaystubEvent,
            MonthlyDetails,
            PaginationQuery,
            DetailsQuery
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login, token introspection and password reset"),
        (name = "Users", description = "Employee account management"),
        (name = "Paystubs", description = "Monthly paystub queries"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
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
