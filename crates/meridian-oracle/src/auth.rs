//! Admin authorization capability.
//!
//! The engine does not know who its operators are; callers hand it an
//! [`Authorizer`] at construction. Deployments embed whatever policy they
//! need behind the trait. [`AdminList`] covers the common fixed-set case
//! and [`AllowAll`] exists for tests and closed environments.

use std::collections::BTreeSet;

use meridian_types::AccountId;

/// Privileged operations an admin may perform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdminAction {
    /// Register, deregister, or reweight reporters.
    ManageReporters,
    /// Register, reconfigure, or remove feeds.
    ManageFeeds,
    /// Set or clear fallback values.
    SetFallback,
    /// Trip or reset the pause breaker.
    Pause,
}

/// Policy deciding which accounts may perform admin actions.
pub trait Authorizer: Send + Sync {
    /// Whether `who` may perform `action`.
    fn authorize(&self, who: &AccountId, action: AdminAction) -> bool;
}

/// Fixed allow-list granting members every admin action.
#[derive(Debug, Default)]
pub struct AdminList {
    admins: BTreeSet<AccountId>,
}

impl AdminList {
    /// Build from an explicit member set.
    pub fn new(admins: impl IntoIterator<Item = AccountId>) -> Self {
        Self {
            admins: admins.into_iter().collect(),
        }
    }

    /// Convenience constructor for a single operator.
    pub fn single(admin: AccountId) -> Self {
        Self::new([admin])
    }
}

impl Authorizer for AdminList {
    fn authorize(&self, who: &AccountId, _action: AdminAction) -> bool {
        self.admins.contains(who)
    }
}

/// Grants everything to everyone.
#[derive(Debug, Default)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn authorize(&self, _who: &AccountId, _action: AdminAction) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_list_membership() {
        let list = AdminList::new([[1; 32], [2; 32]]);
        assert!(list.authorize(&[1; 32], AdminAction::ManageReporters));
        assert!(list.authorize(&[2; 32], AdminAction::Pause));
        assert!(!list.authorize(&[3; 32], AdminAction::ManageFeeds));
    }

    #[test]
    fn test_single_admin() {
        let list = AdminList::single([7; 32]);
        assert!(list.authorize(&[7; 32], AdminAction::SetFallback));
        assert!(!list.authorize(&[8; 32], AdminAction::SetFallback));
    }

    #[test]
    fn test_empty_list_denies_all() {
        let list = AdminList::default();
        assert!(!list.authorize(&[1; 32], AdminAction::Pause));
    }

    #[test]
    fn test_allow_all() {
        let auth = AllowAll;
        assert!(auth.authorize(&[0; 32], AdminAction::ManageReporters));
        assert!(auth.authorize(&[255; 32], AdminAction::Pause));
    }
}
