//! Pure authentication/authorization state.
//!
//! This crate is intentionally decoupled from HTTP and storage: no IO, no
//! clock ownership (time is always passed in), no async. The client layer
//! owns the wall clock and the wire.

pub mod credential;
pub mod gate;
pub mod permissions;
pub mod principal;
pub mod roles;
pub mod store;
pub mod token;

pub use credential::Credential;
pub use gate::{
    Decision, PermissionConfigError, PermissionRequirement, RedirectTarget, RoutePolicy,
    RouteOutcome, RouteRules, evaluate, guard_guest, resolve_requirement,
};
pub use permissions::Permission;
pub use principal::Principal;
pub use roles::Role;
pub use store::{Session, SessionStore};
pub use token::{DecodeError, DecodedToken, decode};
