pub mod audit;
pub mod auth;
pub mod email;
pub mod error;
pub mod invitation;
pub mod session;
pub mod token;

pub use audit::AuditService;
pub use auth::{AuthService, LoginOutcome};
pub use email::{EmailProvider, MockEmailService, SmtpEmailService};
pub use error::AuthError;
pub use invitation::{InvitationOutcome, InvitationService};
pub use session::{Session, SessionTokens};
pub use token::TokenService;
