//! Role hierarchy.
//!
//! Roles form a total order by privilege level. Treasurer/Secretary are tied,
//! as are the three compliance-adjacent officer roles; ties share a level and
//! therefore cannot manage each other.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Owner,
    Admin,
    Chair,
    ViceChair,
    Treasurer,
    Secretary,
    Mlro,
    ComplianceOfficer,
    HealthSafetyOfficer,
    Trustee,
    Volunteer,
    Viewer,
}

impl Role {
    pub const ALL: [Role; 13] = [
        Role::SuperAdmin,
        Role::Owner,
        Role::Admin,
        Role::Chair,
        Role::ViceChair,
        Role::Treasurer,
        Role::Secretary,
        Role::Mlro,
        Role::ComplianceOfficer,
        Role::HealthSafetyOfficer,
        Role::Trustee,
        Role::Volunteer,
        Role::Viewer,
    ];

    /// Hierarchy level; higher means more privileged. Tied roles share a
    /// level.
    pub fn level(&self) -> u8 {
        match self {
            Role::SuperAdmin => 100,
            Role::Owner => 80,
            Role::Admin => 70,
            Role::Chair => 60,
            Role::ViceChair => 50,
            Role::Treasurer | Role::Secretary => 40,
            Role::Mlro | Role::ComplianceOfficer | Role::HealthSafetyOfficer => 30,
            Role::Trustee => 20,
            Role::Volunteer => 10,
            Role::Viewer => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Chair => "chair",
            Role::ViceChair => "vice_chair",
            Role::Treasurer => "treasurer",
            Role::Secretary => "secretary",
            Role::Mlro => "mlro",
            Role::ComplianceOfficer => "compliance_officer",
            Role::HealthSafetyOfficer => "health_safety_officer",
            Role::Trustee => "trustee",
            Role::Volunteer => "volunteer",
            Role::Viewer => "viewer",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hierarchy_is_totally_ordered_with_documented_ties() {
        assert!(Role::SuperAdmin.level() > Role::Owner.level());
        assert!(Role::Owner.level() > Role::Admin.level());
        assert!(Role::Admin.level() > Role::Chair.level());
        assert!(Role::Chair.level() > Role::ViceChair.level());
        assert!(Role::ViceChair.level() > Role::Treasurer.level());
        assert_eq!(Role::Treasurer.level(), Role::Secretary.level());
        assert!(Role::Secretary.level() > Role::Mlro.level());
        assert_eq!(Role::Mlro.level(), Role::ComplianceOfficer.level());
        assert_eq!(Role::Mlro.level(), Role::HealthSafetyOfficer.level());
        assert!(Role::Mlro.level() > Role::Trustee.level());
        assert!(Role::Trustee.level() > Role::Volunteer.level());
        assert!(Role::Volunteer.level() > Role::Viewer.level());
    }

    #[test]
    fn serde_round_trip_uses_snake_case() {
        let json = serde_json::to_string(&Role::ViceChair).unwrap();
        assert_eq!(json, "\"vice_chair\"");
        let role: Role = serde_json::from_str("\"trustee\"").unwrap();
        assert_eq!(role, Role::Trustee);
    }
}
