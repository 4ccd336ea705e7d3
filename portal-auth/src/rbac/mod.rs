//! Role-based authorization: static role hierarchy, permission matrix, and
//! the predicates enforced by both business logic and request middleware.
//!
//! Pure policy checks: no IO, no panics. The super-admin bypass is applied
//! at the top of every predicate.

mod permissions;
mod roles;

pub use permissions::{role_permissions, Permission};
pub use roles::Role;

/// Whether `role` holds `permission`. Super-admin implicitly holds every
/// permission.
pub fn has_permission(role: Role, permission: Permission) -> bool {
    if role == Role::SuperAdmin {
        return true;
    }
    role_permissions(role).contains(&permission)
}

pub fn has_all_permissions(role: Role, permissions: &[Permission]) -> bool {
    permissions.iter().all(|p| has_permission(role, *p))
}

pub fn has_any_permission(role: Role, permissions: &[Permission]) -> bool {
    permissions.iter().any(|p| has_permission(role, *p))
}

/// Hierarchy-level comparison. Super-admin always passes.
pub fn has_minimum_role(user_role: Role, required: Role) -> bool {
    user_role == Role::SuperAdmin || user_role.level() >= required.level()
}

/// A manager may only act on roles strictly below their own level.
/// Nobody may manage super-admin, and a role never manages itself.
pub fn can_manage_role(manager: Role, target: Role) -> bool {
    if target == Role::SuperAdmin {
        return false;
    }
    manager == Role::SuperAdmin || manager.level() > target.level()
}

/// Roles the inviter may grant through an invitation: the manageable range,
/// excluding owner and super-admin.
pub fn invitable_roles(inviter: Role) -> Vec<Role> {
    Role::ALL
        .into_iter()
        .filter(|r| *r != Role::Owner && *r != Role::SuperAdmin)
        .filter(|r| can_manage_role(inviter, *r))
        .collect()
}

/// Roles the caller may assign when changing an existing membership.
pub fn assignable_roles(assigner: Role) -> Vec<Role> {
    invitable_roles(assigner)
}

/// Guards a role change. No-op transitions are rejected, super-admin is
/// immutable from this path, and the changer must be able to manage both the
/// role being removed and the role being granted.
pub fn can_transition_role(current: Role, new: Role, changed_by: Role) -> bool {
    if current == new {
        return false;
    }
    if current == Role::SuperAdmin || new == Role::SuperAdmin {
        return false;
    }
    can_manage_role(changed_by, current) && can_manage_role(changed_by, new)
}
