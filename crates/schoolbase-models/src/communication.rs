//! Message templates and ad-hoc email.
//!
//! Templates are keyed by a unique `key` and carry `{name}` placeholders that
//! [`render`] fills from request params. `{{` and `}}` produce literal braces.
//! A placeholder with no matching param is left in the output verbatim.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::{Validate, ValidateEmail, ValidationError};

use crate::ids::CommTemplateId;

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct CommTemplate {
    pub id: CommTemplateId,
    #[schema(example = "fee_receipt")]
    pub key: String,
    pub description: Option<String>,
    #[schema(example = "Receipt for {student}")]
    pub subject: String,
    pub text_body: Option<String>,
    pub html_body: Option<String>,
    /// Inactive templates cannot be sent.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateTemplateDto {
    #[validate(length(min = 1, max = 100))]
    pub key: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub subject: String,
    #[validate(length(max = 20000))]
    pub text_body: Option<String>,
    #[validate(length(max = 50000))]
    pub html_body: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateTemplateDto {
    #[validate(length(min = 1, max = 100))]
    pub key: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub subject: Option<String>,
    #[validate(length(max = 20000))]
    pub text_body: Option<String>,
    #[validate(length(max = 50000))]
    pub html_body: Option<String>,
    pub is_active: Option<bool>,
}

/// One email, either written inline or drawn from a template.
///
/// Inline fields win over the template's. A subject is required from one or
/// the other.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SendEmailDto {
    #[validate(email)]
    pub to: String,
    pub key: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub subject: Option<String>,
    pub text_body: Option<String>,
    pub html_body: Option<String>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub params: HashMap<String, serde_json::Value>,
}

fn validate_recipients(recipients: &[String]) -> Result<(), ValidationError> {
    if recipients.iter().all(|r| r.validate_email()) {
        Ok(())
    } else {
        Err(ValidationError::new("email"))
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct BulkEmailDto {
    #[validate(
        length(min = 1, max = 500),
        custom(function = "validate_recipients")
    )]
    pub recipients: Vec<String>,
    pub key: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub subject: Option<String>,
    pub text_body: Option<String>,
    pub html_body: Option<String>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub params: HashMap<String, serde_json::Value>,
}

/// A notice to every guardian linked to one student.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AnnouncementDto {
    #[validate(length(min = 1, max = 200))]
    #[schema(example = "Sports day")]
    pub title: String,
    #[validate(length(min = 1, max = 5000))]
    pub message: String,
    /// Also email guardians whose preferences allow it. Defaults to true.
    pub send_email: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct DeliveryReport {
    pub sent: usize,
    pub failed: usize,
}

/// A rendered message ready to hand to the mailer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
}

/// Fills `{name}` placeholders in `template` from `params`.
///
/// String values are inserted as-is; other JSON values use their JSON text.
pub fn render(template: &str, params: &HashMap<String, serde_json::Value>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") || tail.starts_with("}}") {
            out.push_str(&tail[..1]);
            rest = &tail[2..];
            continue;
        }
        if tail.starts_with('}') {
            out.push('}');
            rest = &tail[1..];
            continue;
        }

        match tail[1..].find(['{', '}']) {
            Some(end) if tail.as_bytes()[end + 1] == b'}' => {
                let name = &tail[1..=end];
                match params.get(name) {
                    Some(serde_json::Value::String(s)) => out.push_str(s),
                    Some(other) => out.push_str(&other.to_string()),
                    None => out.push_str(&tail[..end + 2]),
                }
                rest = &tail[end + 2..];
            }
            _ => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Merges inline fields over `template` and renders the result.
///
/// Returns `None` when neither side supplies a subject. The text body falls
/// back to the rendered subject.
pub fn compose(
    template: Option<&CommTemplate>,
    subject: Option<&str>,
    text_body: Option<&str>,
    html_body: Option<&str>,
    params: &HashMap<String, serde_json::Value>,
) -> Option<Rendered> {
    let non_empty = |s: &&str| !s.trim().is_empty();

    let subject = subject
        .filter(non_empty)
        .or_else(|| template.map(|t| t.subject.as_str()).filter(non_empty))?;
    let text = text_body
        .filter(non_empty)
        .or_else(|| template.and_then(|t| t.text_body.as_deref()).filter(non_empty));
    let html = html_body
        .filter(non_empty)
        .or_else(|| template.and_then(|t| t.html_body.as_deref()).filter(non_empty));

    let subject = render(subject, params);
    let text = text.map(|t| render(t, params)).unwrap_or_else(|| subject.clone());
    Some(Rendered {
        subject,
        text,
        html: html.map(|h| render(h, params)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: serde_json::Value) -> HashMap<String, serde_json::Value> {
        serde_json::from_value(value).unwrap()
    }

    fn template() -> CommTemplate {
        CommTemplate {
            id: CommTemplateId::new(),
            key: "fee_receipt".into(),
            description: None,
            subject: "Receipt for {student}".into(),
            text_body: Some("We received {amount} for {student}.".into()),
            html_body: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_render_fills_placeholders() {
        let p = params(json!({ "student": "Amina", "amount": 1500 }));
        assert_eq!(
            render("{student} paid {amount}", &p),
            "Amina paid 1500"
        );
    }

    #[test]
    fn test_render_keeps_unknown_placeholders() {
        let p = params(json!({ "student": "Amina" }));
        assert_eq!(render("Dear {parent}, {student}", &p), "Dear {parent}, Amina");
    }

    #[test]
    fn test_render_escapes_and_stray_braces() {
        let p = params(json!({ "x": "1" }));
        assert_eq!(render("{{x}} = {x}", &p), "{x} = 1");
        assert_eq!(render("a } b { c", &p), "a } b { c");
        assert_eq!(render("{x", &p), "{x");
    }

    #[test]
    fn test_compose_prefers_inline_fields() {
        let t = template();
        let p = params(json!({ "student": "Amina", "amount": "KES 500.00" }));

        let from_template = compose(Some(&t), None, None, None, &p).unwrap();
        assert_eq!(from_template.subject, "Receipt for Amina");
        assert_eq!(from_template.text, "We received KES 500.00 for Amina.");

        let inline = compose(Some(&t), Some("Hello {student}"), None, Some("<b>hi</b>"), &p).unwrap();
        assert_eq!(inline.subject, "Hello Amina");
        assert_eq!(inline.text, "We received KES 500.00 for Amina.");
        assert_eq!(inline.html.as_deref(), Some("<b>hi</b>"));
    }

    #[test]
    fn test_compose_needs_a_subject() {
        assert!(compose(None, None, Some("body"), None, &HashMap::new()).is_none());
        assert!(compose(None, Some("  "), None, None, &HashMap::new()).is_none());

        let only_subject = compose(None, Some("Closed Friday"), None, None, &HashMap::new()).unwrap();
        assert_eq!(only_subject.text, "Closed Friday");
    }

    #[test]
    fn test_bulk_recipients_must_all_be_emails() {
        let dto = BulkEmailDto {
            recipients: vec!["a@school.test".into(), "not-an-email".into()],
            key: None,
            subject: Some("Hi".into()),
            text_body: None,
            html_body: None,
            params: HashMap::new(),
        };
        assert!(dto.validate().is_err());

        let empty = BulkEmailDto {
            recipients: vec![],
            ..dto
        };
        assert!(empty.validate().is_err());
    }
}
