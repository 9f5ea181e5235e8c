//! Command access checks.

use rolegate_db::RoleId;

/// Whether a member may run operator commands.
///
/// Administrators always may; otherwise the member needs the guild's
/// configured manager role.
pub fn has_manager_privilege(
    member_roles: &[RoleId],
    is_admin: bool,
    manager_role: Option<RoleId>,
) -> bool {
    if is_admin {
        return true;
    }
    manager_role.is_some_and(|role| member_roles.contains(&role))
}
