//! Capabilities: what a player may do in each authentication status.
//!
//! The host represents permissions however it likes (permission nodes,
//! flags, roles). The lobby only computes WHICH capabilities a status
//! carries and, on every transition, the difference between the old and
//! new set. The host applies that difference.

use std::collections::BTreeSet;

use crate::AuthStatus;

/// A single thing a player can be allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Capability {
    /// May run `register`.
    Register,
    /// May run `login`.
    Login,
    /// May run `logout`.
    Logout,
    /// May run `changepassword`.
    ChangePassword,
    /// May do anything gated by [`is_allowed`](crate::AuthMachine::is_allowed):
    /// build, interact, use other commands.
    Act,
}

/// An ordered set of capabilities. Ordered so diffs and logs are stable.
pub type CapabilitySet = BTreeSet<Capability>;

/// The capabilities that come with `status`.
///
/// | Status | Capabilities |
/// |---|---|
/// | Unregistered | Register |
/// | Registered | Login |
/// | LoggedIn | Logout, ChangePassword, Act |
pub fn capabilities_for(status: AuthStatus) -> CapabilitySet {
    match status {
        AuthStatus::Unregistered => [Capability::Register].into(),
        AuthStatus::Registered => [Capability::Login].into(),
        AuthStatus::LoggedIn => [
            Capability::Logout,
            Capability::ChangePassword,
            Capability::Act,
        ]
        .into(),
    }
}

/// What changed between two capability sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilityDiff {
    pub granted: Vec<Capability>,
    pub revoked: Vec<Capability>,
}

impl CapabilityDiff {
    /// Computes the changes needed to go from `old` to `new`.
    pub fn between(old: &CapabilitySet, new: &CapabilitySet) -> Self {
        Self {
            granted: new.difference(old).copied().collect(),
            revoked: old.difference(new).copied().collect(),
        }
    }

    /// Returns `true` if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.granted.is_empty() && self.revoked.is_empty()
    }

    /// Folds a later diff into this one, so that two transitions applied
    /// back to back can be reported as one.
    ///
    /// A capability granted by `self` and revoked by `later` disappears
    /// entirely (and vice versa).
    pub fn then(mut self, later: CapabilityDiff) -> Self {
        for cap in later.granted {
            if let Some(pos) = self.revoked.iter().position(|c| *c == cap) {
                self.revoked.remove(pos);
            } else if !self.granted.contains(&cap) {
                self.granted.push(cap);
            }
        }
        for cap in later.revoked {
            if let Some(pos) = self.granted.iter().position(|c| *c == cap) {
                self.granted.remove(pos);
            } else if !self.revoked.contains(&cap) {
                self.revoked.push(cap);
            }
        }
        self.granted.sort();
        self.revoked.sort();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_for_each_status() {
        assert_eq!(
            capabilities_for(AuthStatus::Unregistered),
            CapabilitySet::from([Capability::Register])
        );
        assert_eq!(
            capabilities_for(AuthStatus::Registered),
            CapabilitySet::from([Capability::Login])
        );
        let logged_in = capabilities_for(AuthStatus::LoggedIn);
        assert!(logged_in.contains(&Capability::Act));
        assert!(logged_in.contains(&Capability::Logout));
        assert!(!logged_in.contains(&Capability::Login));
        assert!(!logged_in.contains(&Capability::Register));
    }

    #[test]
    fn test_between_registered_and_logged_in() {
        let diff = CapabilityDiff::between(
            &capabilities_for(AuthStatus::Registered),
            &capabilities_for(AuthStatus::LoggedIn),
        );

        assert_eq!(
            diff.granted,
            vec![
                Capability::Logout,
                Capability::ChangePassword,
                Capability::Act
            ]
        );
        assert_eq!(diff.revoked, vec![Capability::Login]);
    }

    #[test]
    fn test_between_same_set_is_empty() {
        let set = capabilities_for(AuthStatus::LoggedIn);

        assert!(CapabilityDiff::between(&set, &set).is_empty());
    }

    #[test]
    fn test_then_equals_direct_diff() {
        // Unregistered → Registered → LoggedIn, folded, must equal the
        // direct Unregistered → LoggedIn diff.
        let unregistered = capabilities_for(AuthStatus::Unregistered);
        let registered = capabilities_for(AuthStatus::Registered);
        let logged_in = capabilities_for(AuthStatus::LoggedIn);

        let folded = CapabilityDiff::between(&unregistered, &registered)
            .then(CapabilityDiff::between(&registered, &logged_in));

        assert_eq!(folded, CapabilityDiff::between(&unregistered, &logged_in));
    }
}
