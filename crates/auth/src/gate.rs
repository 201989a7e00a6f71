//! Route-level permission gate.
//!
//! Requirements are resolved **once** at route-configuration time from the
//! raw route-meta shape into a tagged [`PermissionRequirement`]; evaluation
//! at navigation time is a pure set lookup with no IO and no network call.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::{Permission, SessionStore};

/// A route's declared permission requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionRequirement {
    /// No requirement declared; always allowed.
    None,
    /// The single named permission must be granted.
    Single(Permission),
    /// Every listed permission must be granted (empty list is vacuously true).
    All(Vec<Permission>),
    /// At least one listed permission must be granted (empty list denies).
    Any(Vec<Permission>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

/// Evaluate a requirement against a granted-permission set.
///
/// - No IO
/// - No panics
/// - No session mutation (pure policy check)
pub fn evaluate(requirement: &PermissionRequirement, granted: &HashSet<Permission>) -> Decision {
    let allowed = match requirement {
        PermissionRequirement::None => true,
        PermissionRequirement::Single(p) => granted.contains(p),
        PermissionRequirement::All(ps) => ps.iter().all(|p| granted.contains(p)),
        PermissionRequirement::Any(ps) => ps.iter().any(|p| granted.contains(p)),
    };
    if allowed { Decision::Allow } else { Decision::Deny }
}

/// Raw, duck-typed permission shape as it appears in route metadata:
/// an optional single permission, an optional list, and an AND/OR operator
/// (AND when absent).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RouteRules {
    #[serde(default)]
    pub permission: Option<String>,

    #[serde(default)]
    pub permissions: Option<Vec<String>>,

    #[serde(default)]
    pub operator: Option<String>,
}

/// Malformed route permission configuration.
///
/// Detected once at resolution time so a config bug is distinguishable
/// from a legitimate denial at navigation time.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PermissionConfigError {
    #[error("route declares both a single permission and a permission list")]
    ConflictingShapes,

    #[error("unknown permission operator '{0}' (expected AND or OR)")]
    UnknownOperator(String),

    #[error("route declares an empty permission name")]
    EmptyPermission,
}

/// Resolve the raw route-meta shape into a tagged requirement.
pub fn resolve_requirement(
    rules: &RouteRules,
) -> Result<PermissionRequirement, PermissionConfigError> {
    if rules.permission.is_some() && rules.permissions.is_some() {
        return Err(PermissionConfigError::ConflictingShapes);
    }

    let operator = match rules.operator.as_deref() {
        None | Some("AND") => Operator::And,
        Some("OR") => Operator::Or,
        Some(other) => return Err(PermissionConfigError::UnknownOperator(other.to_string())),
    };

    if let Some(name) = &rules.permission {
        if name.trim().is_empty() {
            return Err(PermissionConfigError::EmptyPermission);
        }
        return Ok(PermissionRequirement::Single(Permission::new(name.clone())));
    }

    match &rules.permissions {
        Some(names) => {
            if names.iter().any(|n| n.trim().is_empty()) {
                return Err(PermissionConfigError::EmptyPermission);
            }
            let perms = names.iter().cloned().map(Permission::new).collect();
            Ok(match operator {
                Operator::And => PermissionRequirement::All(perms),
                Operator::Or => PermissionRequirement::Any(perms),
            })
        }
        None => Ok(PermissionRequirement::None),
    }
}

#[derive(Debug, Clone, Copy)]
enum Operator {
    And,
    Or,
}

/// Where the router should send a rejected navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectTarget {
    /// Anonymous or expired session.
    SignIn,
    /// Authenticated but missing a required permission.
    AccessDenied,
    /// Malformed permission configuration (fail closed, but distinguishable
    /// from a legitimate denial).
    InternalError,
    /// Already authenticated on a guest-only page.
    Home,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    Proceed,
    Redirect(RedirectTarget),
}

/// A route's resolved guard policy.
///
/// Built once when routes are configured; a resolution failure is carried
/// so every navigation to the misconfigured route fails closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePolicy {
    requirement: Result<PermissionRequirement, PermissionConfigError>,
}

impl RoutePolicy {
    pub fn resolve(rules: &RouteRules) -> Self {
        let requirement = resolve_requirement(rules);
        if let Err(err) = &requirement {
            tracing::error!(error = %err, "route permission configuration is malformed");
        }
        Self { requirement }
    }

    pub fn open() -> Self {
        Self {
            requirement: Ok(PermissionRequirement::None),
        }
    }

    pub fn requirement(&self) -> Result<&PermissionRequirement, &PermissionConfigError> {
        self.requirement.as_ref()
    }

    /// Gate a navigation against the current session. No network call is
    /// made on any path through here.
    pub fn check(&self, store: &SessionStore, now: DateTime<Utc>) -> RouteOutcome {
        if store.is_expired(now) {
            // An expired session is unusable for navigation; drop it so the
            // sign-in flow starts from a clean anonymous state.
            store.clear();
            return RouteOutcome::Redirect(RedirectTarget::SignIn);
        }

        let requirement = match &self.requirement {
            Ok(requirement) => requirement,
            Err(_) => return RouteOutcome::Redirect(RedirectTarget::InternalError),
        };

        let granted = store
            .principal()
            .map(|p| p.permissions)
            .unwrap_or_default();

        match evaluate(requirement, &granted) {
            Decision::Allow => RouteOutcome::Proceed,
            Decision::Deny => {
                tracing::warn!(?requirement, "navigation denied, missing permissions");
                RouteOutcome::Redirect(RedirectTarget::AccessDenied)
            }
        }
    }
}

/// Guest-only pages (sign-in, register) send authenticated principals home.
pub fn guard_guest(store: &SessionStore) -> RouteOutcome {
    if store.is_authenticated() {
        RouteOutcome::Redirect(RedirectTarget::Home)
    } else {
        RouteOutcome::Proceed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Credential, Principal, Role};

    fn granted(names: &[&str]) -> HashSet<Permission> {
        names
            .iter()
            .map(|n| Permission::new(n.to_string()))
            .collect()
    }

    fn all(names: &[&str]) -> PermissionRequirement {
        PermissionRequirement::All(names.iter().map(|n| Permission::new(n.to_string())).collect())
    }

    fn any(names: &[&str]) -> PermissionRequirement {
        PermissionRequirement::Any(names.iter().map(|n| Permission::new(n.to_string())).collect())
    }

    #[test]
    fn evaluation_truth_table() {
        assert_eq!(evaluate(&all(&["a", "b"]), &granted(&["a"])), Decision::Deny);
        assert_eq!(evaluate(&all(&[]), &granted(&[])), Decision::Allow);
        assert_eq!(evaluate(&any(&[]), &granted(&["a"])), Decision::Deny);
        assert_eq!(evaluate(&any(&["a", "b"]), &granted(&["b"])), Decision::Allow);
        assert_eq!(
            evaluate(
                &PermissionRequirement::Single(Permission::new("x")),
                &granted(&["x", "y"])
            ),
            Decision::Allow
        );
        assert_eq!(evaluate(&PermissionRequirement::None, &granted(&[])), Decision::Allow);
    }

    #[test]
    fn raw_shapes_resolve_once() {
        let single = RouteRules {
            permission: Some("roles.read".into()),
            ..RouteRules::default()
        };
        assert_eq!(
            resolve_requirement(&single).unwrap(),
            PermissionRequirement::Single(Permission::new("roles.read"))
        );

        let and_list = RouteRules {
            permissions: Some(vec!["a".into(), "b".into()]),
            ..RouteRules::default()
        };
        assert_eq!(resolve_requirement(&and_list).unwrap(), all(&["a", "b"]));

        let or_list = RouteRules {
            permissions: Some(vec!["a".into(), "b".into()]),
            operator: Some("OR".into()),
            ..RouteRules::default()
        };
        assert_eq!(resolve_requirement(&or_list).unwrap(), any(&["a", "b"]));

        let nothing = RouteRules::default();
        assert_eq!(resolve_requirement(&nothing).unwrap(), PermissionRequirement::None);
    }

    #[test]
    fn malformed_shapes_fail_at_resolution() {
        let both = RouteRules {
            permission: Some("a".into()),
            permissions: Some(vec!["b".into()]),
            ..RouteRules::default()
        };
        assert_eq!(
            resolve_requirement(&both),
            Err(PermissionConfigError::ConflictingShapes)
        );

        let bad_op = RouteRules {
            permissions: Some(vec!["a".into()]),
            operator: Some("XOR".into()),
            ..RouteRules::default()
        };
        assert_eq!(
            resolve_requirement(&bad_op),
            Err(PermissionConfigError::UnknownOperator("XOR".into()))
        );

        let empty_name = RouteRules {
            permission: Some("  ".into()),
            ..RouteRules::default()
        };
        assert_eq!(
            resolve_requirement(&empty_name),
            Err(PermissionConfigError::EmptyPermission)
        );
    }

    fn store_with(perms: &[&str], expires: i64) -> SessionStore {
        let store = SessionStore::new();
        store.set(
            Credential::new("t", DateTime::from_timestamp(expires, 0).unwrap()),
            Principal {
                email: "ada@example.com".into(),
                username: "ada".into(),
                display_name: "Ada".into(),
                roles: vec![Role::new("user")],
                permissions: granted(perms),
            },
        );
        store
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn anonymous_navigation_redirects_to_sign_in() {
        let store = SessionStore::new();
        let policy = RoutePolicy::open();

        assert_eq!(
            policy.check(&store, at(0)),
            RouteOutcome::Redirect(RedirectTarget::SignIn)
        );
    }

    #[test]
    fn expired_session_is_cleared_and_sent_to_sign_in() {
        let store = store_with(&["a"], 1_000);
        let policy = RoutePolicy::open();

        assert_eq!(
            policy.check(&store, at(2_000)),
            RouteOutcome::Redirect(RedirectTarget::SignIn)
        );
        assert!(!store.is_authenticated());
    }

    #[test]
    fn denial_and_config_errors_reach_distinct_destinations() {
        let store = store_with(&["a"], 10_000);

        let denied = RoutePolicy::resolve(&RouteRules {
            permission: Some("b".into()),
            ..RouteRules::default()
        });
        assert_eq!(
            denied.check(&store, at(0)),
            RouteOutcome::Redirect(RedirectTarget::AccessDenied)
        );

        let broken = RoutePolicy::resolve(&RouteRules {
            permission: Some("a".into()),
            permissions: Some(vec!["b".into()]),
            ..RouteRules::default()
        });
        assert_eq!(
            broken.check(&store, at(0)),
            RouteOutcome::Redirect(RedirectTarget::InternalError)
        );
    }

    #[test]
    fn satisfied_requirement_proceeds() {
        let store = store_with(&["a", "b"], 10_000);
        let policy = RoutePolicy::resolve(&RouteRules {
            permissions: Some(vec!["a".into(), "b".into()]),
            ..RouteRules::default()
        });

        assert_eq!(policy.check(&store, at(0)), RouteOutcome::Proceed);
    }

    #[test]
    fn guest_pages_bounce_authenticated_principals() {
        let store = store_with(&[], 10_000);
        assert_eq!(
            guard_guest(&store),
            RouteOutcome::Redirect(RedirectTarget::Home)
        );

        store.clear();
        assert_eq!(guard_guest(&store), RouteOutcome::Proceed);
    }
}
