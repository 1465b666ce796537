use handlebars::Handlebars;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use serde_json::json;

use super::{MailJob, MailKind};
use crate::config::Config;
use crate::errors::CustomError;

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedMail {
    pub subject: String,
    pub html: String,
}

/// Static html templates, rendered with the recipient and the secret.
pub struct Templates {
    registry: Handlebars<'static>,
    brand: String,
    support_email: String,
}

impl Templates {
    pub fn new(brand: &str, support_email: &str) -> anyhow::Result<Self> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_partial("footer", include_str!("../../templates/footer.hbs"))?;
        registry.register_template_string("otp", include_str!("../../templates/otp.hbs"))?;
        registry.register_template_string(
            "verify_account",
            include_str!("../../templates/verify_account.hbs"),
        )?;
        registry.register_template_string(
            "password_reset",
            include_str!("../../templates/password_reset.hbs"),
        )?;
        registry.register_template_string(
            "login_confirmation",
            include_str!("../../templates/login_confirmation.hbs"),
        )?;

        Ok(Self {
            registry,
            brand: brand.to_string(),
            support_email: support_email.to_string(),
        })
    }

    pub fn render(&self, job: &MailJob) -> Result<RenderedMail, handlebars::RenderError> {
        let brand = &self.brand;
        let (template, subject, data) = match &job.kind {
            MailKind::Otp { code, ttl_minutes } => (
                "otp",
                format!("Verify Your Email - OTP Code - {brand}"),
                json!({ "code": code, "ttl_minutes": ttl_minutes }),
            ),
            MailKind::VerifyAccount { link, ttl_minutes } => (
                "verify_account",
                format!("Verify Your Account - {brand}"),
                json!({ "link": link, "ttl_minutes": ttl_minutes }),
            ),
            MailKind::PasswordReset { link, ttl_minutes } => (
                "password_reset",
                format!("Reset Your Password - {brand}"),
                json!({ "link": link, "ttl_minutes": ttl_minutes }),
            ),
            MailKind::LoginConfirmation { login_time } => (
                "login_confirmation",
                format!("New Login to Your {brand} Account"),
                json!({ "login_time": login_time }),
            ),
        };

        let mut data = data;
        data["full_name"] = json!(job.full_name);
        data["brand"] = json!(brand);
        data["support_email"] = json!(self.support_email);

        let html = self.registry.render(template, &data)?;
        Ok(RenderedMail { subject, html })
    }
}

/// Renders mail jobs and delivers them over SMTP.
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    templates: Templates,
}

impl Mailer {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let credentials = Credentials::new(config.smtp_user.clone(), config.smtp_pass.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();
        let from = Mailbox::new(
            Some(config.email_from_name.clone()),
            config.smtp_from.parse()?,
        );
        let templates = Templates::new(&config.email_from_name, &config.support_email)?;

        Ok(Self {
            transport,
            from,
            templates,
        })
    }

    pub async fn send(&self, job: &MailJob) -> Result<(), CustomError> {
        let rendered = self.templates.render(job).map_err(|e| {
            log::error!("Error rendering email for {}: {}", job.to, e);
            CustomError::MailDeliveryFailure
        })?;
        let to: Mailbox = job.to.parse().map_err(|e| {
            log::error!("Invalid recipient address {}: {}", job.to, e);
            CustomError::MailDeliveryFailure
        })?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(rendered.subject)
            .header(ContentType::TEXT_HTML)
            .body(rendered.html)
            .map_err(|e| {
                log::error!("Error building email for {}: {}", job.to, e);
                CustomError::MailDeliveryFailure
            })?;

        match self.transport.send(message).await {
            Ok(_) => {
                log::info!("Email sent to {}", job.to);
                Ok(())
            }
            Err(e) => {
                log::error!("Error sending email to {}: {:?}", job.to, e);
                Err(CustomError::MailDeliveryFailure)
            }
        }
    }
}
