use crate::{env_flag, env_or, env_string};

#[derive(Clone, Debug)]
pub struct EmailConfig {
    pub enabled: bool,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub from_email: String,
    pub from_name: String,
    pub frontend_url: String,
}

impl EmailConfig {
    pub fn from_env() -> Self {
        Self {
            enabled: env_flag("SMTP_ENABLED", false),
            smtp_host: env_string("SMTP_HOST", "localhost"),
            smtp_port: env_or("SMTP_PORT", 1025),
            smtp_username: env_string("SMTP_USERNAME", ""),
            smtp_password: env_string("SMTP_PASSWORD", ""),
            from_email: env_string("FROM_EMAIL", "noreply@schoolbase.local"),
            from_name: env_string("FROM_NAME", "Schoolbase"),
            frontend_url: env_string("FRONTEND_URL", "http://localhost:3000"),
        }
    }

    /// Whether SMTP credentials were supplied (relay with auth vs. plain local relay).
    pub fn has_credentials(&self) -> bool {
        !self.smtp_username.is_empty() && !self.smtp_password.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_credentials() {
        let mut config = EmailConfig {
            enabled: true,
            smtp_host: "localhost".into(),
            smtp_port: 1025,
            smtp_username: String::new(),
            smtp_password: String::new(),
            from_email: "noreply@example.com".into(),
            from_name: "School".into(),
            frontend_url: "http://localhost".into(),
        };
        assert!(!config.has_credentials());
        config.smtp_username = "mailer".into();
        config.smtp_password = "secret".into();
        assert!(config.has_credentials());
    }
}
