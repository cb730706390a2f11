//! Route access decisions derived from the session.

use tienda_core::{Role, SessionStatus};

use crate::session::SessionSnapshot;

/// What a protected view needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessRequirement {
    /// Any signed-in user.
    #[default]
    SignedIn,
    /// Administrators only.
    Admin,
}

/// Outcome of a guard check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Restoration has not finished; show a loading state.
    Pending,
    /// Not signed in; send to the sign-in view.
    SignIn,
    /// Signed in without the required role; send home.
    Home,
    /// Render the view.
    Granted,
}

/// Decide whether `snapshot` may see a view with `requirement`.
#[must_use]
pub fn guard(snapshot: &SessionSnapshot, requirement: AccessRequirement) -> Access {
    match (snapshot.status(), snapshot.role(), requirement) {
        (SessionStatus::Restoring, _, _) => Access::Pending,
        (_, None, _) => Access::SignIn,
        (_, Some(Role::Customer), AccessRequirement::Admin) => Access::Home,
        (_, Some(_), _) => Access::Granted,
    }
}
