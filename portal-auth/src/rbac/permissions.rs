//! Permission capability tags and the compiled-in role-to-permission table.

use serde::{Deserialize, Serialize};

use super::Role;

/// Fine-grained capability tags, distinct from roles. The table below is the
/// sole mapping; it is not user-editable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    OrgView,
    OrgUpdate,
    OrgDelete,
    BillingView,
    BillingManage,
    MemberView,
    MemberInvite,
    MemberUpdate,
    MemberRemove,
    RoleAssign,
    CommitteeView,
    CommitteeCreate,
    CommitteeUpdate,
    CommitteeDelete,
    MeetingView,
    MeetingSchedule,
    MeetingMinutesRecord,
    MeetingMinutesApprove,
    TaskView,
    TaskCreate,
    TaskAssign,
    TaskComplete,
    DocView,
    DocUpload,
    DocApprove,
    DocDelete,
    ComplianceView,
    ComplianceReport,
    ComplianceApprove,
    RecruitmentView,
    RecruitmentManage,
    AuditLogView,
}

impl Permission {
    pub const ALL: [Permission; 32] = [
        Permission::OrgView,
        Permission::OrgUpdate,
        Permission::OrgDelete,
        Permission::BillingView,
        Permission::BillingManage,
        Permission::MemberView,
        Permission::MemberInvite,
        Permission::MemberUpdate,
        Permission::MemberRemove,
        Permission::RoleAssign,
        Permission::CommitteeView,
        Permission::CommitteeCreate,
        Permission::CommitteeUpdate,
        Permission::CommitteeDelete,
        Permission::MeetingView,
        Permission::MeetingSchedule,
        Permission::MeetingMinutesRecord,
        Permission::MeetingMinutesApprove,
        Permission::TaskView,
        Permission::TaskCreate,
        Permission::TaskAssign,
        Permission::TaskComplete,
        Permission::DocView,
        Permission::DocUpload,
        Permission::DocApprove,
        Permission::DocDelete,
        Permission::ComplianceView,
        Permission::ComplianceReport,
        Permission::ComplianceApprove,
        Permission::RecruitmentView,
        Permission::RecruitmentManage,
        Permission::AuditLogView,
    ];
}

/// Permission set for a role. Exhaustive over `Role`, so every role has a
/// defined (possibly empty) set. Super-admin is handled by the bypass in
/// `has_permission`, not by a table entry.
pub fn role_permissions(role: Role) -> &'static [Permission] {
    match role {
        Role::SuperAdmin => &[],
        Role::Owner => &[
            Permission::OrgView,
            Permission::OrgUpdate,
            Permission::OrgDelete,
            Permission::BillingView,
            Permission::BillingManage,
            Permission::MemberView,
            Permission::MemberInvite,
            Permission::MemberUpdate,
            Permission::MemberRemove,
            Permission::RoleAssign,
            Permission::CommitteeView,
            Permission::CommitteeCreate,
            Permission::CommitteeUpdate,
            Permission::CommitteeDelete,
            Permission::MeetingView,
            Permission::MeetingSchedule,
            Permission::MeetingMinutesRecord,
            Permission::MeetingMinutesApprove,
            Permission::TaskView,
            Permission::TaskCreate,
            Permission::TaskAssign,
            Permission::TaskComplete,
            Permission::DocView,
            Permission::DocUpload,
            Permission::DocApprove,
            Permission::DocDelete,
            Permission::ComplianceView,
            Permission::ComplianceReport,
            Permission::ComplianceApprove,
            Permission::RecruitmentView,
            Permission::RecruitmentManage,
            Permission::AuditLogView,
        ],
        Role::Admin => &[
            Permission::OrgView,
            Permission::OrgUpdate,
            Permission::BillingView,
            Permission::MemberView,
            Permission::MemberInvite,
            Permission::MemberUpdate,
            Permission::MemberRemove,
            Permission::RoleAssign,
            Permission::CommitteeView,
            Permission::CommitteeCreate,
            Permission::CommitteeUpdate,
            Permission::CommitteeDelete,
            Permission::MeetingView,
            Permission::MeetingSchedule,
            Permission::MeetingMinutesRecord,
            Permission::MeetingMinutesApprove,
            Permission::TaskView,
            Permission::TaskCreate,
            Permission::TaskAssign,
            Permission::TaskComplete,
            Permission::DocView,
            Permission::DocUpload,
            Permission::DocApprove,
            Permission::DocDelete,
            Permission::ComplianceView,
            Permission::ComplianceReport,
            Permission::RecruitmentView,
            Permission::RecruitmentManage,
            Permission::AuditLogView,
        ],
        Role::Chair => &[
            Permission::OrgView,
            Permission::MemberView,
            Permission::MemberInvite,
            Permission::CommitteeView,
            Permission::CommitteeCreate,
            Permission::CommitteeUpdate,
            Permission::MeetingView,
            Permission::MeetingSchedule,
            Permission::MeetingMinutesRecord,
            Permission::MeetingMinutesApprove,
            Permission::TaskView,
            Permission::TaskCreate,
            Permission::TaskAssign,
            Permission::TaskComplete,
            Permission::DocView,
            Permission::DocUpload,
            Permission::DocApprove,
            Permission::RecruitmentView,
        ],
        Role::ViceChair => &[
            Permission::OrgView,
            Permission::MemberView,
            Permission::CommitteeView,
            Permission::CommitteeUpdate,
            Permission::MeetingView,
            Permission::MeetingSchedule,
            Permission::MeetingMinutesRecord,
            Permission::TaskView,
            Permission::TaskCreate,
            Permission::TaskAssign,
            Permission::TaskComplete,
            Permission::DocView,
            Permission::DocUpload,
            Permission::RecruitmentView,
        ],
        Role::Treasurer => &[
            Permission::OrgView,
            Permission::BillingView,
            Permission::MemberView,
            Permission::CommitteeView,
            Permission::MeetingView,
            Permission::TaskView,
            Permission::TaskComplete,
            Permission::DocView,
            Permission::DocUpload,
            Permission::DocApprove,
        ],
        Role::Secretary => &[
            Permission::OrgView,
            Permission::MemberView,
            Permission::CommitteeView,
            Permission::MeetingView,
            Permission::MeetingSchedule,
            Permission::MeetingMinutesRecord,
            Permission::TaskView,
            Permission::TaskComplete,
            Permission::DocView,
            Permission::DocUpload,
        ],
        Role::Mlro => &[
            Permission::OrgView,
            Permission::MemberView,
            Permission::MeetingView,
            Permission::TaskView,
            Permission::TaskComplete,
            Permission::DocView,
            Permission::DocUpload,
            Permission::ComplianceView,
            Permission::ComplianceReport,
            Permission::ComplianceApprove,
        ],
        Role::ComplianceOfficer => &[
            Permission::OrgView,
            Permission::MemberView,
            Permission::MeetingView,
            Permission::TaskView,
            Permission::TaskComplete,
            Permission::DocView,
            Permission::DocUpload,
            Permission::ComplianceView,
            Permission::ComplianceReport,
        ],
        Role::HealthSafetyOfficer => &[
            Permission::OrgView,
            Permission::MemberView,
            Permission::MeetingView,
            Permission::TaskView,
            Permission::TaskComplete,
            Permission::DocView,
            Permission::DocUpload,
            Permission::ComplianceView,
            Permission::ComplianceReport,
        ],
        Role::Trustee => &[
            Permission::OrgView,
            Permission::MemberView,
            Permission::CommitteeView,
            Permission::MeetingView,
            Permission::TaskView,
            Permission::TaskComplete,
            Permission::DocView,
            Permission::DocUpload,
        ],
        Role::Volunteer => &[
            Permission::OrgView,
            Permission::MeetingView,
            Permission::TaskView,
            Permission::TaskComplete,
            Permission::DocView,
        ],
        Role::Viewer => &[
            Permission::OrgView,
            Permission::MeetingView,
            Permission::TaskView,
            Permission::DocView,
        ],
    }
}
