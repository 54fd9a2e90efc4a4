use async_trait::async_trait;
use lettre::message::{Attachment as MailAttachment, MultiPart, SinglePart, header};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::{instrument, warn};

use schoolbase_config::EmailConfig;

use super::{Notifier, OutgoingEmail};

#[derive(Debug)]
pub struct SmtpNotifier {
    config: EmailConfig,
}

impl SmtpNotifier {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn build_message(&self, email: &OutgoingEmail) -> Result<Message, String> {
        let from = format!("{} <{}>", self.config.from_name, self.config.from_email);
        let html = email
            .html
            .clone()
            .unwrap_or_else(|| notice_template(&self.config.from_name, &email.subject, &email.text));

        let body = MultiPart::alternative()
            .singlepart(
                SinglePart::builder()
                    .header(header::ContentType::TEXT_PLAIN)
                    .body(email.text.clone()),
            )
            .singlepart(
                SinglePart::builder()
                    .header(header::ContentType::TEXT_HTML)
                    .body(html),
            );

        let builder = Message::builder()
            .from(from.parse().map_err(|e| format!("Invalid from email: {}", e))?)
            .to(email
                .to
                .parse()
                .map_err(|e| format!("Invalid to email: {}", e))?)
            .subject(email.subject.clone());

        if email.attachments.is_empty() {
            return builder
                .multipart(body)
                .map_err(|e| format!("Failed to build email: {}", e));
        }

        let mut mixed = MultiPart::mixed().multipart(body);
        for attachment in &email.attachments {
            let content_type = header::ContentType::parse(&attachment.content_type)
                .map_err(|e| format!("Invalid attachment content type: {}", e))?;
            mixed = mixed.singlepart(
                MailAttachment::new(attachment.filename.clone())
                    .body(attachment.bytes.clone(), content_type),
            );
        }

        builder
            .multipart(mixed)
            .map_err(|e| format!("Failed to build email: {}", e))
    }

    fn transport(&self) -> Result<SmtpTransport, String> {
        if !self.config.has_credentials() {
            return Ok(SmtpTransport::builder_dangerous(&self.config.smtp_host)
                .port(self.config.smtp_port)
                .build());
        }

        let creds = Credentials::new(
            self.config.smtp_username.clone(),
            self.config.smtp_password.clone(),
        );

        Ok(SmtpTransport::relay(&self.config.smtp_host)
            .map_err(|e| format!("Failed to create SMTP relay: {}", e))?
            .port(self.config.smtp_port)
            .credentials(creds)
            .build())
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    #[instrument(skip(self, email), fields(to = %email.to, subject = %email.subject))]
    async fn send(&self, email: &OutgoingEmail) -> bool {
        let prepared = self
            .build_message(email)
            .and_then(|message| Ok((message, self.transport()?)));

        let (message, mailer) = match prepared {
            Ok(parts) => parts,
            Err(e) => {
                warn!(error = %e, "Email not sent");
                return false;
            }
        };

        match tokio::task::spawn_blocking(move || mailer.send(&message)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                warn!(error = %e, "SMTP delivery failed");
                false
            }
            Err(e) => {
                warn!(error = %e, "Email task join error");
                false
            }
        }
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Wraps a plain notice in the school's branded HTML layout.
pub(crate) fn notice_template(school_name: &str, title: &str, message: &str) -> String {
    let paragraphs: String = message
        .split('\n')
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            format!(
                r#"<p style="margin: 0 0 16px 0; color: #555555; font-size: 16px; line-height: 1.5;">{}</p>"#,
                escape_html(line)
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
</head>
<body style="margin: 0; padding: 0; font-family: Arial, sans-serif; background-color: #f4f4f4;">
    <table width="100%" cellpadding="0" cellspacing="0" style="background-color: #f4f4f4; padding: 20px;">
        <tr>
            <td align="center">
                <table width="600" cellpadding="0" cellspacing="0" style="background-color: #ffffff; border-radius: 8px; overflow: hidden;">
                    <tr>
                        <td style="background-color: #1F6F50; padding: 24px; text-align: center;">
                            <h1 style="margin: 0; color: #ffffff; font-size: 24px;">{school}</h1>
                        </td>
                    </tr>
                    <tr>
                        <td style="padding: 32px 30px;">
                            <h2 style="margin: 0 0 20px 0; color: #333333; font-size: 20px;">{title}</h2>
                            {paragraphs}
                        </td>
                    </tr>
                    <tr>
                        <td style="background-color: #f8f9fa; padding: 16px 30px; text-align: center; border-top: 1px solid #e9ecef;">
                            <p style="margin: 0; color: #999999; font-size: 12px;">
                                This is an automated email from {school}. Please do not reply.
                            </p>
                        </td>
                    </tr>
                </table>
            </td>
        </tr>
    </table>
</body>
</html>"#,
        title = escape_html(title),
        school = escape_html(school_name),
        paragraphs = paragraphs,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::Attachment;

    fn config() -> EmailConfig {
        EmailConfig {
            enabled: true,
            smtp_host: "localhost".into(),
            smtp_port: 1025,
            smtp_username: String::new(),
            smtp_password: String::new(),
            from_email: "noreply@school.test".into(),
            from_name: "Greenfield High".into(),
            frontend_url: "http://localhost:3000".into(),
        }
    }

    #[test]
    fn test_template_escapes_and_brands() {
        let html = notice_template("Greenfield High", "Fee <Reminder>", "Line one\nLine & two");
        assert!(html.contains("Fee &lt;Reminder&gt;"));
        assert!(html.contains("Line &amp; two"));
        assert!(html.contains("automated email from Greenfield High"));
    }

    #[test]
    fn test_build_message_with_attachment() {
        let notifier = SmtpNotifier::new(config());
        let email = OutgoingEmail::new("parent@example.com", "Report card", "Attached")
            .with_attachment(Attachment {
                filename: "report.csv".into(),
                content_type: "text/csv".into(),
                bytes: b"a,b\r\n".to_vec(),
            });
        assert!(notifier.build_message(&email).is_ok());
    }

    #[test]
    fn test_build_message_rejects_bad_recipient() {
        let notifier = SmtpNotifier::new(config());
        let email = OutgoingEmail::new("not-an-address", "Hi", "Body");
        assert!(notifier.build_message(&email).is_err());
    }
}
