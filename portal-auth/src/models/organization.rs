//! Organization (tenant) model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const TRIAL_DAYS: i64 = 30;
const DEFAULT_MEMBER_LIMIT: u32 = 25;
const DEFAULT_TERM_LENGTH_YEARS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Trial,
    Active,
    Suspended,
    Cancelled,
}

/// An organization (tenant). Owns zero-or-more memberships; all business
/// data and role assignments are scoped to one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    /// Unique, URL-safe identifier.
    pub slug: String,
    pub is_active: bool,
    pub subscription_status: SubscriptionStatus,
    pub trial_ends_at: Option<DateTime<Utc>>,
    /// Plan-based ceiling on active members.
    pub member_limit: u32,
    /// Default committee/office term length used when accepting invitations
    /// that carry a term start date.
    pub term_length_years: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    /// New organizations start on a trial subscription.
    pub fn new(name: String, slug: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            slug,
            is_active: true,
            subscription_status: SubscriptionStatus::Trial,
            trial_ends_at: Some(now + chrono::Duration::days(TRIAL_DAYS)),
            member_limit: DEFAULT_MEMBER_LIMIT,
            term_length_years: DEFAULT_TERM_LENGTH_YEARS,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn trial_expired(&self) -> bool {
        self.subscription_status == SubscriptionStatus::Trial
            && matches!(self.trial_ends_at, Some(end) if end <= Utc::now())
    }

    pub fn is_suspended(&self) -> bool {
        !self.is_active || self.subscription_status == SubscriptionStatus::Suspended
    }
}

/// Organization summary for API responses and the login selection list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationSummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub subscription_status: SubscriptionStatus,
}

impl From<&Organization> for OrganizationSummary {
    fn from(org: &Organization) -> Self {
        Self {
            id: org.id,
            name: org.name.clone(),
            slug: org.slug.clone(),
            subscription_status: org.subscription_status,
        }
    }
}

/// A slug is URL-safe: lowercase alphanumerics and hyphens, not empty,
/// no leading/trailing/double hyphen.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--")
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_org_starts_on_trial() {
        let org = Organization::new("Acme".into(), "acme".into());
        assert_eq!(org.subscription_status, SubscriptionStatus::Trial);
        assert!(org.trial_ends_at.is_some());
        assert!(!org.trial_expired());
    }

    #[test]
    fn expired_trial_is_detected() {
        let mut org = Organization::new("Acme".into(), "acme".into());
        org.trial_ends_at = Some(Utc::now() - chrono::Duration::days(1));
        assert!(org.trial_expired());
    }

    #[test]
    fn slug_validation() {
        assert!(is_valid_slug("acme"));
        assert!(is_valid_slug("acme-corp-2"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("Acme"));
        assert!(!is_valid_slug("-acme"));
        assert!(!is_valid_slug("acme-"));
        assert!(!is_valid_slug("ac--me"));
        assert!(!is_valid_slug("acme corp"));
    }
}
