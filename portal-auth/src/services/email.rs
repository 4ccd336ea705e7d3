//! Outbound email. All sends are fire-and-forget from the caller's point
//! of view: delivery failures are logged and never fail the request.

use anyhow::Result;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::config::SmtpConfig;

#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send_verification_email(&self, to: &str, verification_url: &str) -> Result<()>;

    async fn send_invitation_email(
        &self,
        to: &str,
        organization_name: &str,
        inviter_name: &str,
        invitation_url: &str,
    ) -> Result<()>;

    async fn send_invitation_accepted_email(
        &self,
        to: &str,
        invitee_email: &str,
        organization_name: &str,
    ) -> Result<()>;

    async fn send_welcome_email(&self, to: &str, organization_name: &str) -> Result<()>;

    async fn send_password_reset_email(&self, to: &str, reset_url: &str) -> Result<()>;

    async fn send_lockout_alert_email(&self, to: &str, minutes: i64) -> Result<()>;
}

pub struct SmtpEmailService {
    transport: SmtpTransport,
    from: String,
}

impl SmtpEmailService {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let transport = SmtpTransport::relay(&config.host)?
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self {
            transport,
            from: config.from.clone(),
        })
    }

    fn send(&self, to: &str, subject: &str, body: String) -> Result<()> {
        let message = Message::builder()
            .from(self.from.parse()?)
            .to(to.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)?;

        self.transport.send(&message)?;
        Ok(())
    }
}

#[async_trait]
impl EmailProvider for SmtpEmailService {
    async fn send_verification_email(&self, to: &str, verification_url: &str) -> Result<()> {
        self.send(
            to,
            "Verify your email address",
            format!(
                "Welcome! Please verify your email address by visiting:\n\n{verification_url}\n\n\
                 This link expires in 24 hours."
            ),
        )
    }

    async fn send_invitation_email(
        &self,
        to: &str,
        organization_name: &str,
        inviter_name: &str,
        invitation_url: &str,
    ) -> Result<()> {
        self.send(
            to,
            &format!("You've been invited to join {organization_name}"),
            format!(
                "{inviter_name} has invited you to join {organization_name}.\n\n\
                 Accept the invitation here:\n\n{invitation_url}\n\n\
                 This invitation expires in 7 days."
            ),
        )
    }

    async fn send_invitation_accepted_email(
        &self,
        to: &str,
        invitee_email: &str,
        organization_name: &str,
    ) -> Result<()> {
        self.send(
            to,
            &format!("{invitee_email} joined {organization_name}"),
            format!("{invitee_email} accepted your invitation to {organization_name}."),
        )
    }

    async fn send_welcome_email(&self, to: &str, organization_name: &str) -> Result<()> {
        self.send(
            to,
            &format!("Welcome to {organization_name}"),
            format!("Your membership in {organization_name} is now active."),
        )
    }

    async fn send_password_reset_email(&self, to: &str, reset_url: &str) -> Result<()> {
        self.send(
            to,
            "Reset your password",
            format!(
                "A password reset was requested for your account. Reset it here:\n\n{reset_url}\n\n\
                 If you did not request this, you can ignore this email. \
                 The link expires in 1 hour."
            ),
        )
    }

    async fn send_lockout_alert_email(&self, to: &str, minutes: i64) -> Result<()> {
        self.send(
            to,
            "Your account has been temporarily locked",
            format!(
                "Too many failed login attempts were made against your account. \
                 It is locked for the next {minutes} minutes. \
                 If this wasn't you, reset your password once the lock expires."
            ),
        )
    }
}

/// Records sends instead of delivering; tests assert against `sent()`.
#[derive(Default)]
pub struct MockEmailService {
    sent: std::sync::Mutex<Vec<SentEmail>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub kind: EmailKind,
    pub to: String,
    /// Link or context line the message carried; lets tests follow emailed
    /// token URLs.
    pub detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailKind {
    Verification,
    Invitation,
    InvitationAccepted,
    Welcome,
    PasswordReset,
    LockoutAlert,
}

impl MockEmailService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().expect("mock email lock").clone()
    }

    fn record(&self, kind: EmailKind, to: &str, detail: &str) {
        self.sent
            .lock()
            .expect("mock email lock")
            .push(SentEmail {
                kind,
                to: to.to_string(),
                detail: detail.to_string(),
            });
    }
}

#[async_trait]
impl EmailProvider for MockEmailService {
    async fn send_verification_email(&self, to: &str, verification_url: &str) -> Result<()> {
        self.record(EmailKind::Verification, to, verification_url);
        Ok(())
    }

    async fn send_invitation_email(
        &self,
        to: &str,
        _organization_name: &str,
        _inviter_name: &str,
        invitation_url: &str,
    ) -> Result<()> {
        self.record(EmailKind::Invitation, to, invitation_url);
        Ok(())
    }

    async fn send_invitation_accepted_email(
        &self,
        to: &str,
        invitee_email: &str,
        _organization_name: &str,
    ) -> Result<()> {
        self.record(EmailKind::InvitationAccepted, to, invitee_email);
        Ok(())
    }

    async fn send_welcome_email(&self, to: &str, organization_name: &str) -> Result<()> {
        self.record(EmailKind::Welcome, to, organization_name);
        Ok(())
    }

    async fn send_password_reset_email(&self, to: &str, reset_url: &str) -> Result<()> {
        self.record(EmailKind::PasswordReset, to, reset_url);
        Ok(())
    }

    async fn send_lockout_alert_email(&self, to: &str, _minutes: i64) -> Result<()> {
        self.record(EmailKind::LockoutAlert, to, "");
        Ok(())
    }
}
