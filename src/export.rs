//! File download responses for report exports.

use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

/// Keeps a client-supplied label safe inside a `Content-Disposition` header.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .collect();
    if cleaned.is_empty() { "export".to_string() } else { cleaned }
}

/// Wraps a rendered CSV body as an attachment download.
pub fn csv_attachment(filename: &str, body: String) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", sanitize_filename(filename)),
            ),
        ],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("class_report_Form 2A.csv"), "class_report_Form_2A.csv");
        assert_eq!(sanitize_filename("a\"b;c"), "a_b_c");
        assert_eq!(sanitize_filename(""), "export");
    }

    #[test]
    fn test_csv_attachment_headers() {
        let response = csv_attachment("invoices.csv", "a,b\r\n".to_string());
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/csv; charset=utf-8"
        );
        assert_eq!(
            response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"invoices.csv\""
        );
    }
}
