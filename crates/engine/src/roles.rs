//! Staff roles and the capabilities they grant.

use std::fmt;

use crate::EngineError;

/// Role of a staff member, stored as its canonical string in `users.role`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    SuperAdmin,
    Admin,
    Supervisor,
    WarehouseManager,
    Agent,
}

/// An action guarded by role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    CreateDispatch,
    ApproveDispatch,
    VerifyDispatch,
    ConfirmDispatch,
    ViewDispatch,
    ViewInventory,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::SuperAdmin,
        Role::Admin,
        Role::Supervisor,
        Role::WarehouseManager,
        Role::Agent,
    ];

    /// Returns the canonical role string used by the database.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SuperAdmin => "SUPER ADMIN",
            Self::Admin => "ADMIN",
            Self::Supervisor => "SUPERVISOR",
            Self::WarehouseManager => "WAREHOUSE MANAGER",
            Self::Agent => "AGENT",
        }
    }

    /// Whether this role is allowed to perform `capability`.
    pub fn can(self, capability: Capability) -> bool {
        match capability {
            Capability::ApproveDispatch => matches!(self, Self::SuperAdmin),
            Capability::CreateDispatch
            | Capability::VerifyDispatch
            | Capability::ConfirmDispatch => matches!(self, Self::WarehouseManager),
            Capability::ViewDispatch | Capability::ViewInventory => !matches!(self, Self::Agent),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::CreateDispatch => "create dispatch",
            Self::ApproveDispatch => "approve dispatch",
            Self::VerifyDispatch => "verify dispatch",
            Self::ConfirmDispatch => "confirm dispatch",
            Self::ViewDispatch => "view dispatch",
            Self::ViewInventory => "view inventory",
        };
        f.write_str(label)
    }
}

impl TryFrom<&str> for Role {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| EngineError::InvalidRole(format!("unknown role: {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_super_admin_approves() {
        let approvers: Vec<_> = Role::ALL
            .into_iter()
            .filter(|role| role.can(Capability::ApproveDispatch))
            .collect();
        assert_eq!(approvers, vec![Role::SuperAdmin]);
    }

    #[test]
    fn warehouse_manager_drives_the_counter_party_steps() {
        let manager = Role::WarehouseManager;
        assert!(manager.can(Capability::CreateDispatch));
        assert!(manager.can(Capability::VerifyDispatch));
        assert!(manager.can(Capability::ConfirmDispatch));
        assert!(!manager.can(Capability::ApproveDispatch));
    }

    #[test]
    fn agents_cannot_view() {
        assert!(!Role::Agent.can(Capability::ViewDispatch));
        assert!(!Role::Agent.can(Capability::ViewInventory));
        assert!(Role::Supervisor.can(Capability::ViewInventory));
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(
            Role::try_from("warehouse manager").unwrap(),
            Role::WarehouseManager
        );
        assert_eq!(Role::try_from("SUPER ADMIN").unwrap(), Role::SuperAdmin);
    }

    #[test]
    #[should_panic(expected = "InvalidRole(\"unknown role: farmer\")")]
    fn fail_parse_unknown_role() {
        Role::try_from("farmer").unwrap();
    }
}
