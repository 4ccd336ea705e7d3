//! Organization membership - the tenant-scoped identity RBAC operates on.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rbac::Role;

/// The (organization, user, role) triple. Role is always evaluated
/// per-membership, never globally on the user. Soft-deleted via
/// `is_active = false`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationMember {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
    pub is_active: bool,
    pub department: Option<String>,
    pub title: Option<String>,
    pub joined_at: DateTime<Utc>,
    pub term_start_date: Option<NaiveDate>,
    pub term_end_date: Option<NaiveDate>,
}

impl OrganizationMember {
    pub fn new(organization_id: Uuid, user_id: Uuid, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            organization_id,
            user_id,
            role,
            is_active: true,
            department: None,
            title: None,
            joined_at: Utc::now(),
            term_start_date: None,
            term_end_date: None,
        }
    }

    /// Set term tracking dates; the end date is derived from the start plus
    /// the organization's configured term length.
    pub fn with_term(mut self, start: NaiveDate, term_length_years: u32) -> Self {
        self.term_start_date = Some(start);
        self.term_end_date = add_years(start, term_length_years);
        self
    }
}

fn add_years(date: NaiveDate, years: u32) -> Option<NaiveDate> {
    date.with_year(date.year() + years as i32)
        // Feb 29 in a non-leap target year clamps to Feb 28.
        .or_else(|| date.pred_opt()?.with_year(date.year() + years as i32))
}
