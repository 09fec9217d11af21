use crate::api::employee::{EmployeeListResponse, EmployeeQuery, UniqueQuery, UniqueResponse};
use crate::api::hike_letter::{HikeLetterInfo, HikeLetterReq};
use crate::api::offer_letter::{CodeMode, OfferLetterReq, OfferLetterResponse};
use crate::api::payslip::{PayslipListResponse, PayslipReq};
use crate::api::relieving_letter::{RelievingLetterReq, RelievingLetterResponse};
use crate::auth::handlers::DashboardResponse;
use crate::model::employee::{Employee, EmployeeForm, SubmitAction};
use crate::model::hike_letter::HikeLetter;
use crate::model::offer_letter::OfferLetter;
use crate::model::payslip::{BasedOn, Payslip};
use crate::model::relieving_letter::RelievingLetter;
use crate::models::{CreateUserReq, LoginReqDto, TokenPair};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HR Letters API",
        version = "1.0.0",
        description = r#"
## HR administration and letter generation

Internal API used by HR staff to keep employee records and produce their letters.

### Key Features
- **Employees**: draft or final records, search, uniqueness checks and CSV export
- **Offer letters**: employee code allocation and salary breakup tables
- **Hike letters**: revised package with old and new breakups
- **Payslips**: monthly payslips based on the offer or latest hike
- **Relieving letters**

Generated letters are `.docx` files rendered from Word templates.

### Security
Every `/api` endpoint needs a **JWT Bearer** access token. A login session ends after a
period of inactivity, after which both tokens are rejected.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::create_user,
        crate::auth::handlers::dashboard,

        crate::api::employee::create_employee,
        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,
        crate::api::employee::check_unique,
        crate::api::employee::export_employees,

        crate::api::offer_letter::generate_offer_letter,
        crate::api::offer_letter::get_offer_letter,
        crate::api::offer_letter::download_offer_letter,

        crate::api::hike_letter::generate_hike_letter,
        crate::api::hike_letter::get_hike_letter,
        crate::api::hike_letter::download_hike_letter,

        crate::api::payslip::generate_payslip,
        crate::api::payslip::get_payslips,
        crate::api::payslip::download_payslip,

        crate::api::relieving_letter::generate_relieving_letter,
        crate::api::relieving_letter::get_relieving_letter,
        crate::api::relieving_letter::download_relieving_letter
    ),
    components(
        schemas(
            LoginReqDto,
            TokenPair,
            CreateUserReq,
            DashboardResponse,
            Employee,
            EmployeeForm,
            SubmitAction,
            EmployeeQuery,
            EmployeeListResponse,
            UniqueQuery,
            UniqueResponse,
            OfferLetter,
            OfferLetterReq,
            OfferLetterResponse,
            CodeMode,
            HikeLetter,
            HikeLetterReq,
            HikeLetterInfo,
            Payslip,
            PayslipReq,
            PayslipListResponse,
            BasedOn,
            RelievingLetter,
            RelievingLetterReq,
            RelievingLetterResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login sessions and user accounts"),
        (name = "Employee", description = "Employee records"),
        (name = "Offer Letter", description = "Offer letters and employee codes"),
        (name = "Hike Letter", description = "Salary revision letters"),
        (name = "Payslip", description = "Monthly payslips"),
        (name = "Relieving Letter", description = "Relieving letters"),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/auth/login",
            "/api/employees",
            "/api/employees/{employee_id}/offer-letter",
            "/api/employees/{employee_id}/payslips/{payslip_id}/download",
            "/api/employees/{employee_id}/relieving-letter/download",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
