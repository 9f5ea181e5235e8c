use rolegate_db::RoleId;

/// Role changes that bring a member to their target role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleDelta {
    pub add: Option<RoleId>,
    pub remove: Vec<RoleId>,
}

impl RoleDelta {
    pub fn is_empty(&self) -> bool {
        self.add.is_none() && self.remove.is_empty()
    }
}

/// Compute the changes leaving `target` as the only managed role held.
///
/// `held` is every role the member has, `managed` the guild's status roles.
/// Roles outside `managed` are never touched.
pub fn compute_delta(held: &[RoleId], managed: &[RoleId], target: RoleId) -> RoleDelta {
    let mut remove: Vec<RoleId> = held
        .iter()
        .copied()
        .filter(|role| *role != target && managed.contains(role))
        .collect();
    remove.sort();
    remove.dedup();

    RoleDelta {
        add: (!held.contains(&target)).then_some(target),
        remove,
    }
}
