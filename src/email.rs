use crate::config::SmtpConfig;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

/// Async SMTP gateway for tenant registration notifications.
pub struct EmailService {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_email: String,
    from_name: String,
}

impl EmailService {
    pub fn new(config: &SmtpConfig) -> anyhow::Result<Self> {
        let creds = Credentials::new(config.username.clone(), config.password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
            .port(config.port)
            .credentials(creds)
            .build();

        Ok(Self {
            transport,
            from_email: config.from_email.clone(),
            from_name: config.from_name.clone(),
        })
    }

    /// Send the welcome email for a freshly provisioned tenant.
    pub async fn send_tenant_registration(
        &self,
        to_email: &str,
        tenant_code: &str,
        company_name: &str,
        login_url: &str,
    ) -> anyhow::Result<()> {
        let from = format!("{} <{}>", self.from_name, self.from_email)
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid from address: {}", e))?;

        let to = to_email
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid to address: {}", e))?;

        let body = format!(
            "Welcome to the HR Platform!\n\n\
             Your workspace for {company_name} is ready.\n\n  \
             Tenant code: {tenant_code}\n  \
             Sign in: {login_url}\n\n\
             Use this email address and the password you chose during registration."
        );

        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(format!("{company_name} is ready — tenant {tenant_code}"))
            .header(ContentType::TEXT_PLAIN)
            .body(body)?;

        self.transport
            .send(email)
            .await
            .map_err(|e| anyhow::anyhow!("SMTP send failed: {}", e))?;

        Ok(())
    }
}
