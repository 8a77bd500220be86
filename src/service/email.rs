//! Email Service
//!
//! Outbound notifier for one-time-code delivery. The rest of the service
//! only hands it a recipient and a code; SMTP transport and templating stay
//! behind this module.

use anyhow::Result;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use log::{debug, info};
use tera::{Context, Tera};

use crate::utils::error::{AppError, AppResult};

/// Email service configuration
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// SMTP server hostname
    pub smtp_host: String,
    /// SMTP server port
    pub smtp_port: u16,
    /// SMTP username
    pub smtp_username: String,
    /// SMTP password
    pub smtp_password: String,
    /// From email address
    pub from_email: String,
    /// From name (display name)
    pub from_name: String,
}

impl EmailConfig {
    /// Create email configuration from environment variables.
    ///
    /// Returns `None` when SMTP credentials are absent so the caller can run
    /// without a notifier (codes are then logged as undeliverable, never
    /// printed).
    pub fn from_env() -> Result<Option<Self>> {
        let (Ok(smtp_username), Ok(smtp_password)) =
            (std::env::var("SMTP_USERNAME"), std::env::var("SMTP_PASSWORD"))
        else {
            return Ok(None);
        };

        let from_email = std::env::var("FROM_EMAIL")
            .map_err(|_| anyhow::anyhow!("FROM_EMAIL environment variable is required"))?;

        Ok(Some(Self {
            smtp_host: std::env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".to_string()),
            smtp_port: std::env::var("SMTP_PORT")
                .unwrap_or_else(|_| "587".to_string())
                .parse()
                .unwrap_or(587),
            smtp_username,
            smtp_password,
            from_email,
            from_name: std::env::var("FROM_NAME").unwrap_or_else(|_| "Auth Service".to_string()),
        }))
    }
}

/// Email service for delivering one-time codes
pub struct EmailService {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    templates: Tera,
    config: EmailConfig,
}

impl EmailService {
    /// Create a new email service
    pub fn new(config: EmailConfig) -> AppResult<Self> {
        let creds = Credentials::new(config.smtp_username.clone(), config.smtp_password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .map_err(|e| AppError::Configuration(format!("Failed to configure SMTP relay: {}", e)))?
            .port(config.smtp_port)
            .credentials(creds)
            .build();

        let mut templates = Tera::default();
        Self::add_embedded_templates(&mut templates)?;

        Ok(Self {
            transport,
            templates,
            config,
        })
    }

    /// Add embedded email templates
    fn add_embedded_templates(tera: &mut Tera) -> AppResult<()> {
        let otp_html = r#"
<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
    <h2>{{ heading }}</h2>
    <p>Hello {{ username }},</p>
    <p>{{ lead }}</p>
    <p style="font-size: 32px; font-weight: bold; letter-spacing: 4px; text-align: center; padding: 15px; background: #f8f9fa;">{{ code }}</p>
    <p>This code will expire in <strong>{{ expires_in_minutes }} minutes</strong>.</p>
    <p>If you did not request this, you can safely ignore this email.</p>
</body>
</html>
        "#;

        let otp_text = r#"
{{ heading }}

Hello {{ username }},

{{ lead }}

Code: {{ code }}

This code will expire in {{ expires_in_minutes }} minutes.

If you did not request this, you can safely ignore this email.
        "#;

        tera.add_raw_template("otp_email.html", otp_html)
            .map_err(|e| AppError::Configuration(format!("Failed to add HTML template: {}", e)))?;
        tera.add_raw_template("otp_email.txt", otp_text)
            .map_err(|e| AppError::Configuration(format!("Failed to add text template: {}", e)))?;

        Ok(())
    }

    /// Send a login verification code
    pub async fn send_login_otp(
        &self,
        to_email: &str,
        username: &str,
        code: &str,
        expires_in_minutes: i64,
    ) -> AppResult<()> {
        self.send_otp_email(
            to_email,
            "Your login verification code",
            "Login verification",
            "Use the code below to finish signing in:",
            username,
            code,
            expires_in_minutes,
        )
        .await
    }

    /// Send a password reset code
    pub async fn send_reset_otp(
        &self,
        to_email: &str,
        username: &str,
        code: &str,
        expires_in_minutes: i64,
    ) -> AppResult<()> {
        self.send_otp_email(
            to_email,
            "Your password reset code",
            "Password reset",
            "Use the code below to reset your password:",
            username,
            code,
            expires_in_minutes,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn send_otp_email(
        &self,
        to_email: &str,
        subject: &str,
        heading: &str,
        lead: &str,
        username: &str,
        code: &str,
        expires_in_minutes: i64,
    ) -> AppResult<()> {
        info!("Sending {} email to {}", heading, to_email);

        let mut context = Context::new();
        context.insert("heading", heading);
        context.insert("lead", lead);
        context.insert("username", username);
        context.insert("code", code);
        context.insert("expires_in_minutes", &expires_in_minutes);

        let html = self
            .templates
            .render("otp_email.html", &context)
            .map_err(|e| AppError::Internal(format!("Template rendering failed: {}", e)))?;
        let text = self
            .templates
            .render("otp_email.txt", &context)
            .map_err(|e| AppError::Internal(format!("Template rendering failed: {}", e)))?;

        let from: Mailbox = format!("{} <{}>", self.config.from_name, self.config.from_email)
            .parse()
            .map_err(|e| AppError::Configuration(format!("Invalid from address: {}", e)))?;
        let to: Mailbox = to_email
            .parse()
            .map_err(|e| AppError::Validation(format!("Invalid recipient address: {}", e)))?;

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .multipart(MultiPart::alternative_plain_html(text, html))
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::ExternalService(format!("Failed to send email: {}", e)))?;

        debug!("{} email sent to {}", heading, to_email);
        Ok(())
    }
}
