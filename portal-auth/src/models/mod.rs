pub mod audit_log;
pub mod invitation;
pub mod member;
pub mod organization;
pub mod user;

pub use audit_log::AuditLogEntry;
pub use invitation::{InvitationStatus, OrganizationInvitation};
pub use member::OrganizationMember;
pub use organization::{is_valid_slug, Organization, OrganizationSummary, SubscriptionStatus};
pub use user::{SanitizedUser, User};
