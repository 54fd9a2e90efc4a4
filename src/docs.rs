use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use schoolbase_core::pagination::PaginationMeta;

use crate::modules::auth::controller::ErrorResponse;
use crate::modules::auth::model::{LoginRequest, LoginResponse, MessageResponse};

/// Schemas reached from a path's request or response body are registered
/// automatically; the list below only adds the shared envelopes.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::auth::controller::login_user,
        crate::modules::auth::controller::get_me,
        crate::modules::users::controller::list_roles,
        crate::modules::users::controller::get_users,
        crate::modules::users::controller::create_user,
        crate::modules::users::controller::get_user,
        crate::modules::users::controller::update_user,
        crate::modules::users::controller::deactivate_user,
        crate::modules::users::controller::set_student_link,
        crate::modules::users::controller::list_guardian_links,
        crate::modules::users::controller::create_guardian_link,
        crate::modules::users::controller::delete_guardian_link,
        crate::modules::students::controller::create_student,
        crate::modules::students::controller::get_students,
        crate::modules::students::controller::get_student,
        crate::modules::students::controller::update_student,
        crate::modules::students::controller::delete_student,
        crate::modules::applications::controller::submit_application,
        crate::modules::applications::controller::get_application_status,
        crate::modules::applications::controller::list_applications,
        crate::modules::applications::controller::get_application,
        crate::modules::applications::controller::approve_application,
        crate::modules::applications::controller::reject_application,
        crate::modules::attendance::controller::get_sheet,
        crate::modules::attendance::controller::mark_attendance,
        crate::modules::attendance::controller::my_attendance,
        crate::modules::attendance::controller::get_streaks,
        crate::modules::teachers::controller::get_teachers,
        crate::modules::teachers::controller::create_teacher,
        crate::modules::teachers::controller::get_teacher,
        crate::modules::teachers::controller::update_teacher,
        crate::modules::teachers::controller::delete_teacher,
        crate::modules::teachers::controller::list_assignments,
        crate::modules::teachers::controller::create_assignment,
        crate::modules::teachers::controller::delete_assignment,
        crate::modules::exams::controller::list_assessments,
        crate::modules::exams::controller::create_assessment,
        crate::modules::exams::controller::get_assessment,
        crate::modules::exams::controller::update_assessment,
        crate::modules::exams::controller::delete_assessment,
        crate::modules::exams::controller::get_results,
        crate::modules::exams::controller::upsert_results,
        crate::modules::grades::controller::get_class_report,
        crate::modules::grades::controller::get_class_report_csv,
        crate::modules::grades::controller::my_grades,
        crate::modules::grades::controller::my_progress,
        crate::modules::grades::controller::my_report_card,
        crate::modules::grades::controller::class_report_cards_csv,
        crate::modules::grades::controller::student_report_card_csv,
        crate::modules::fees::controller::create_invoice,
        crate::modules::fees::controller::list_invoices,
        crate::modules::fees::controller::get_invoice,
        crate::modules::fees::controller::update_invoice,
        crate::modules::fees::controller::delete_invoice,
        crate::modules::fees::controller::list_payments,
        crate::modules::fees::controller::record_payment,
        crate::modules::fees::controller::update_payment_status,
        crate::modules::fees::controller::create_waiver,
        crate::modules::fees::controller::list_waivers,
        crate::modules::fees::controller::create_fee_structure,
        crate::modules::fees::controller::list_fee_structures,
        crate::modules::fees::controller::get_fee_structure,
        crate::modules::fees::controller::update_fee_structure,
        crate::modules::fees::controller::delete_fee_structure,
        crate::modules::fees::controller::list_overdue,
        crate::modules::fees::controller::run_overdue_sweep,
        crate::modules::fees::controller::run_reminder_sweep,
        crate::modules::fees::controller::my_fees,
        crate::modules::accounting::controller::create_expense,
        crate::modules::accounting::controller::list_expenses,
        crate::modules::accounting::controller::get_expense,
        crate::modules::accounting::controller::update_expense,
        crate::modules::accounting::controller::delete_expense,
        crate::modules::accounting::controller::create_payroll,
        crate::modules::accounting::controller::list_payroll,
        crate::modules::accounting::controller::get_payroll,
        crate::modules::accounting::controller::update_payroll,
        crate::modules::accounting::controller::delete_payroll,
        crate::modules::accounting::controller::summary,
        crate::modules::accounting::controller::monthly_series,
        crate::modules::accounting::controller::profit_and_loss,
        crate::modules::accounting::controller::balance_sheet,
        crate::modules::accounting::controller::export_invoices,
        crate::modules::accounting::controller::export_expenses,
        crate::modules::accounting::controller::export_payroll,
        crate::modules::timetable::controller::get_config,
        crate::modules::timetable::controller::upsert_config,
        crate::modules::timetable::controller::list_allocations,
        crate::modules::timetable::controller::create_allocation,
        crate::modules::timetable::controller::update_allocation,
        crate::modules::timetable::controller::delete_allocation,
        crate::modules::timetable::controller::list_slots,
        crate::modules::timetable::controller::create_slot,
        crate::modules::timetable::controller::update_slot,
        crate::modules::timetable::controller::delete_slot,
        crate::modules::timetable::controller::get_conflicts,
        crate::modules::timetable::controller::my_timetable,
        crate::modules::discipline::controller::create_case,
        crate::modules::discipline::controller::list_cases,
        crate::modules::discipline::controller::get_case,
        crate::modules::discipline::controller::update_case,
        crate::modules::discipline::controller::delete_case,
        crate::modules::discipline::controller::get_summary,
        crate::modules::discipline::controller::export_cases,
        crate::modules::notifications::controller::list_notifications,
        crate::modules::notifications::controller::unread_count,
        crate::modules::notifications::controller::mark_read,
        crate::modules::notifications::controller::mark_all_read,
        crate::modules::notifications::controller::get_preferences,
        crate::modules::notifications::controller::update_preferences,
        crate::modules::notifications::controller::linked_students,
        crate::modules::notifications::controller::linked_student_notifications,
        crate::modules::communication::controller::list_templates,
        crate::modules::communication::controller::create_template,
        crate::modules::communication::controller::get_template,
        crate::modules::communication::controller::update_template,
        crate::modules::communication::controller::delete_template,
        crate::modules::communication::controller::send_email,
        crate::modules::communication::controller::send_bulk_email,
        crate::modules::communication::controller::send_to_parents,
        crate::modules::settings::controller::get_settings,
        crate::modules::settings::controller::update_settings,
    ),
    components(
        schemas(
            ErrorResponse,
            PaginationMeta,
            LoginRequest,
            LoginResponse,
            MessageResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Login and current user"),
        (name = "Users", description = "User accounts, roles and guardian links"),
        (name = "Students", description = "Student records"),
        (name = "Admissions", description = "Public applications and their review"),
        (name = "Attendance", description = "Daily attendance sheets and streaks"),
        (name = "Teachers", description = "Teachers and their class assignments"),
        (name = "Exams", description = "Assessments and results"),
        (name = "Grades", description = "Class reports, report cards and student progress"),
        (name = "Fees", description = "Invoices, payments, waivers and fee structures"),
        (name = "Accounting", description = "Expenses, payroll and financial reports"),
        (name = "Timetable", description = "Timetable config, allocations, slots and conflicts"),
        (name = "Discipline", description = "Disciplinary cases"),
        (name = "Notifications", description = "In-app notifications and preferences"),
        (name = "Communication", description = "Message templates, direct email and guardian announcements"),
        (name = "Settings", description = "Versioned school settings")
    ),
    info(
        title = "Schoolbase API",
        version = "0.1.0",
        description = "School management backend: admissions, attendance, exams, fees, timetable and discipline.",
        license(
            name = "MIT"
        )
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

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
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_has_bearer_scheme_and_paths() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(doc.paths.paths.contains_key("/api/fees/payments"));
        assert!(doc.paths.paths.contains_key("/api/discipline/cases/{id}"));
        assert!(doc.paths.paths.contains_key("/api/communication/send-to-parents/{student_id}"));
    }
}
