//! Capability-based access control
//!
//! Every mutating operation on the router and the policy engine is guarded by
//! one of four named capabilities. This core only checks possession; grant and
//! revoke are themselves guarded operations seeded from the account that
//! constructed the component. Issuance policy (multisig, timelock) lives in
//! the governance layer, not here.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::types::Account;

/// Named administrative capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    /// Register transport modules, toggle protocol activity
    ProtocolAdmin,
    /// Chain support, default routes, router pause
    RouterAdmin,
    /// Security configs, limits, blocklist, suspicion resets
    SecurityAdmin,
    /// Emergency pause/unpause, independent of SecurityAdmin
    Emergency,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::ProtocolAdmin => "protocol_admin",
            Capability::RouterAdmin => "router_admin",
            Capability::SecurityAdmin => "security_admin",
            Capability::Emergency => "emergency",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when a caller lacks the required capability.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unauthorized: {caller} lacks {required} capability")]
pub struct Unauthorized {
    pub caller: Account,
    pub required: Capability,
}

/// Grant table mapping accounts to their capabilities.
///
/// Grants and revokes are idempotent: re-granting an existing capability or
/// revoking an absent one is a no-op.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Capabilities {
    grants: HashMap<Account, HashSet<Capability>>,
}

impl Capabilities {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table where `root` holds every capability. Used at construction so the
    /// deploying account can bootstrap the rest of the grants.
    pub fn with_root(root: Account) -> Self {
        let mut table = Self::new();
        for cap in [
            Capability::ProtocolAdmin,
            Capability::RouterAdmin,
            Capability::SecurityAdmin,
            Capability::Emergency,
        ] {
            table.grant(root.clone(), cap);
        }
        table
    }

    pub fn grant(&mut self, account: Account, cap: Capability) {
        self.grants.entry(account).or_default().insert(cap);
    }

    pub fn revoke(&mut self, account: &Account, cap: Capability) {
        if let Some(set) = self.grants.get_mut(account) {
            set.remove(&cap);
            if set.is_empty() {
                self.grants.remove(account);
            }
        }
    }

    pub fn has(&self, account: &Account, cap: Capability) -> bool {
        self.grants
            .get(account)
            .map(|set| set.contains(&cap))
            .unwrap_or(false)
    }

    /// Check that `caller` holds `cap`, returning `Unauthorized` otherwise.
    pub fn require(&self, caller: &Account, cap: Capability) -> Result<(), Unauthorized> {
        if self.has(caller, cap) {
            Ok(())
        } else {
            Err(Unauthorized {
                caller: caller.clone(),
                required: cap,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_and_require() {
        let mut caps = Capabilities::new();
        let admin = Account::new("terra1admin");
        caps.grant(admin.clone(), Capability::RouterAdmin);

        assert!(caps.require(&admin, Capability::RouterAdmin).is_ok());
        assert!(caps.require(&admin, Capability::Emergency).is_err());
    }

    #[test]
    fn test_grant_idempotent() {
        let mut caps = Capabilities::new();
        let admin = Account::new("terra1admin");
        caps.grant(admin.clone(), Capability::SecurityAdmin);
        caps.grant(admin.clone(), Capability::SecurityAdmin);
        assert!(caps.has(&admin, Capability::SecurityAdmin));
    }

    #[test]
    fn test_revoke() {
        let mut caps = Capabilities::new();
        let admin = Account::new("terra1admin");
        caps.grant(admin.clone(), Capability::Emergency);
        caps.revoke(&admin, Capability::Emergency);
        assert!(!caps.has(&admin, Capability::Emergency));

        // Revoking again is a no-op
        caps.revoke(&admin, Capability::Emergency);
    }

    #[test]
    fn test_with_root_holds_all() {
        let root = Account::new("terra1deployer");
        let caps = Capabilities::with_root(root.clone());
        for cap in [
            Capability::ProtocolAdmin,
            Capability::RouterAdmin,
            Capability::SecurityAdmin,
            Capability::Emergency,
        ] {
            assert!(caps.has(&root, cap));
        }
    }

    #[test]
    fn test_unauthorized_message() {
        let err = Unauthorized {
            caller: Account::new("terra1mallory"),
            required: Capability::SecurityAdmin,
        };
        assert_eq!(
            err.to_string(),
            "Unauthorized: terra1mallory lacks security_admin capability"
        );
    }
}
