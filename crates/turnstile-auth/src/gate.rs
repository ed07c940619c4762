//! Permission Gate: per-action access decisions over resolved identities.
//!
//! Rules are registered explicitly per `(resource, action)` pair. The gate
//! is default-deny: a pair with no rule never proceeds. Failing with
//! `Forbidden` requires a known identity; anonymous callers hitting a
//! protected action fail with `Unauthenticated` instead, since no rights can
//! be attributed to them.

use std::collections::HashMap;

use turnstile_core::{Action, PipelineError, Result};

use crate::identity::Identity;

/// Access rule for one `(resource, action)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessRule {
    /// Anyone may proceed, credential or not.
    AllowAnonymous,
    /// Any resolved identity may proceed.
    Authenticated,
    /// Only identities holding the named role may proceed.
    Role(String),
    /// The target entity's owner, or any identity holding the named elevated
    /// role, may proceed. With no target entity in scope (e.g. create), this
    /// behaves like [`Authenticated`]: the caller becomes the owner. An
    /// entity that exists but has no recorded owner can only be acted on
    /// with the elevated role.
    OwnerOrRole(String),
}

/// The entity a permission check applies to.
///
/// `None` (list, create) and an entity without a recorded owner are distinct
/// cases: the first grants ownership-to-be, the second grants nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
    /// No specific entity is in scope.
    None,
    /// A specific entity, with its owner id if one is recorded.
    Entity(Option<&'a str>),
}

/// Default-deny rule table keyed by `(resource, action)`.
#[derive(Debug, Clone, Default)]
pub struct PermissionGate {
    rules: HashMap<(String, Action), AccessRule>,
}

impl PermissionGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a rule for a `(resource, action)` pair.
    #[must_use]
    pub fn rule(mut self, resource: impl Into<String>, action: Action, rule: AccessRule) -> Self {
        self.rules.insert((resource.into(), action), rule);
        self
    }

    /// Returns `true` if the pair explicitly allows anonymous access.
    #[must_use]
    pub fn allows_anonymous(&self, resource: &str, action: Action) -> bool {
        matches!(
            self.rules.get(&(resource.to_string(), action)),
            Some(AccessRule::AllowAnonymous)
        )
    }

    /// Decides whether `identity` may perform `action` on `resource`.
    ///
    /// `target` names the specific entity being acted on, when one is in
    /// scope. Must be called strictly after credential resolution and before
    /// any entity read or write.
    pub fn check(
        &self,
        identity: Option<&Identity>,
        resource: &str,
        action: Action,
        target: Target<'_>,
    ) -> Result<()> {
        let rule = self.rules.get(&(resource.to_string(), action));

        let Some(rule) = rule else {
            // Default-deny.
            tracing::debug!(resource, %action, "no access rule registered");
            return match identity {
                Some(_) => Err(PipelineError::forbidden(resource, action.to_string())),
                None => Err(PipelineError::Unauthenticated),
            };
        };

        match rule {
            AccessRule::AllowAnonymous => Ok(()),
            AccessRule::Authenticated => match identity {
                Some(_) => Ok(()),
                None => Err(PipelineError::Unauthenticated),
            },
            AccessRule::Role(role) => match identity {
                Some(identity) if identity.has_role(role) => Ok(()),
                Some(_) => Err(PipelineError::forbidden(resource, action.to_string())),
                None => Err(PipelineError::Unauthenticated),
            },
            AccessRule::OwnerOrRole(role) => {
                let Some(identity) = identity else {
                    return Err(PipelineError::Unauthenticated);
                };
                if identity.has_role(role) {
                    return Ok(());
                }
                match target {
                    // No target in scope: the caller will own what it creates.
                    Target::None => Ok(()),
                    Target::Entity(Some(owner)) if owner == identity.id => Ok(()),
                    // An existing entity, ownerless or owned by someone else.
                    Target::Entity(_) => {
                        Err(PipelineError::forbidden(resource, action.to_string()))
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> PermissionGate {
        PermissionGate::new()
            .rule("posts", Action::List, AccessRule::AllowAnonymous)
            .rule("posts", Action::Read, AccessRule::AllowAnonymous)
            .rule("posts", Action::Create, AccessRule::Authenticated)
            .rule("posts", Action::Update, AccessRule::OwnerOrRole("admin".to_string()))
            .rule("posts", Action::Delete, AccessRule::OwnerOrRole("admin".to_string()))
            .rule("users", Action::List, AccessRule::Role("admin".to_string()))
    }

    #[test]
    fn test_default_deny_without_rule() {
        let gate = gate();
        let identity = Identity::new("user-1");

        let err = gate
            .check(Some(&identity), "comments", Action::List, Target::None)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Forbidden { .. }));

        let err = gate.check(None, "comments", Action::List, Target::None).unwrap_err();
        assert!(matches!(err, PipelineError::Unauthenticated));
    }

    #[test]
    fn test_allow_anonymous() {
        let gate = gate();
        assert!(gate.check(None, "posts", Action::List, Target::None).is_ok());
        assert!(gate.allows_anonymous("posts", Action::List));
        assert!(!gate.allows_anonymous("posts", Action::Create));
    }

    #[test]
    fn test_anonymous_write_is_unauthenticated() {
        let gate = gate();
        let err = gate.check(None, "posts", Action::Create, Target::None).unwrap_err();
        assert!(matches!(err, PipelineError::Unauthenticated));
    }

    #[test]
    fn test_authenticated_rule() {
        let gate = gate();
        let identity = Identity::new("user-1");
        assert!(gate.check(Some(&identity), "posts", Action::Create, Target::None).is_ok());
    }

    #[test]
    fn test_role_rule() {
        let gate = gate();
        let admin = Identity::new("admin-1").with_role("admin");
        let user = Identity::new("user-1");

        assert!(gate.check(Some(&admin), "users", Action::List, Target::None).is_ok());

        let err = gate
            .check(Some(&user), "users", Action::List, Target::None)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Forbidden { .. }));
    }

    #[test]
    fn test_owner_may_mutate_own_entity() {
        let gate = gate();
        let owner = Identity::new("user-1");

        assert!(
            gate.check(Some(&owner), "posts", Action::Update, Target::Entity(Some("user-1")))
                .is_ok()
        );
    }

    #[test]
    fn test_non_owner_is_forbidden() {
        let gate = gate();
        let intruder = Identity::new("user-2");

        let err = gate
            .check(Some(&intruder), "posts", Action::Update, Target::Entity(Some("user-1")))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Forbidden { .. }));
    }

    #[test]
    fn test_elevated_role_overrides_ownership() {
        let gate = gate();
        let admin = Identity::new("admin-1").with_role("admin");

        assert!(
            gate.check(Some(&admin), "posts", Action::Delete, Target::Entity(Some("user-1")))
                .is_ok()
        );
    }

    #[test]
    fn test_owner_rule_without_target_allows_authenticated() {
        let gate = gate();
        let identity = Identity::new("user-1");
        assert!(gate.check(Some(&identity), "posts", Action::Update, Target::None).is_ok());
    }

    #[test]
    fn test_ownerless_entity_denied_without_elevated_role() {
        let gate = gate();
        let identity = Identity::new("user-1");

        // An entity that exists but has no owner is not up for grabs.
        let err = gate
            .check(Some(&identity), "posts", Action::Update, Target::Entity(None))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Forbidden { .. }));

        let admin = Identity::new("admin-1").with_role("admin");
        assert!(
            gate.check(Some(&admin), "posts", Action::Update, Target::Entity(None))
                .is_ok()
        );
    }
}
