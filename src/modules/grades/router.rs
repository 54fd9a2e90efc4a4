use axum::{Router, routing::get};

use super::controller::{
    class_report_cards_csv, get_class_report, get_class_report_csv, my_grades, my_progress,
    my_report_card, student_report_card_csv,
};
use crate::state::AppState;

pub fn init_grades_router() -> Router<AppState> {
    Router::new()
        .route("/class-report", get(get_class_report))
        .route("/class-report/csv", get(get_class_report_csv))
        .route("/my", get(my_grades))
        .route("/my/progress", get(my_progress))
        .route("/my/report-card", get(my_report_card))
        .route(
            "/report-cards/classes/{class_name}/csv",
            get(class_report_cards_csv),
        )
        .route(
            "/report-cards/students/{id}/csv",
            get(student_report_card_csv),
        )
}
