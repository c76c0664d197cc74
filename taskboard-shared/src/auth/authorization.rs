/// Role guard and permission checks
///
/// Privileged surfaces (the "new project" dialog, user management) are gated by
/// an allow-list of roles. The check runs at the call site of each privileged
/// action and returns a tagged result instead of silently swapping the surface.
///
/// # Decision
///
/// ```text
/// allowed(role, allow_list) = role is present && allow_list contains role
/// ```
///
/// A missing session user is always a denial, whatever the allow-list says.
///
/// # Example
///
/// ```
/// use taskboard_shared::auth::authorization::{authorize, Guarded, PROJECT_CREATORS};
/// use taskboard_shared::session::SessionState;
///
/// let state = SessionState::default();
/// match authorize(&state, PROJECT_CREATORS, "new project dialog") {
///     Guarded::Authorized(surface) => println!("open {}", surface),
///     Guarded::Denied(reason) => println!("access denied: {}", reason),
/// }
/// ```

use std::fmt;

use crate::models::user::Role;
use crate::session::SessionState;

/// Roles allowed to create projects
pub const PROJECT_CREATORS: &[Role] = &[Role::Admin, Role::ProjectManager];

/// Roles allowed to add and edit users
pub const USER_MANAGERS: &[Role] = &[Role::Admin, Role::ProjectManager];

/// Roles allowed to create tasks
pub const TASK_CREATORS: &[Role] = &[Role::Admin, Role::ProjectManager];

/// Roles allowed to move and delete tasks
pub const TASK_EDITORS: &[Role] = &[Role::Admin, Role::ProjectManager, Role::Developer];

/// Why access was denied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No user in the session
    NoSession,

    /// The session role is not in the allow-list
    RoleNotAllowed { role: Role },
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::NoSession => write!(f, "not signed in"),
            DenyReason::RoleNotAllowed { role } => {
                write!(f, "role {} is not allowed to access this", role)
            }
        }
    }
}

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// Nobody is signed in
    #[error("Not signed in")]
    NoSession,

    /// Signed-in role is not allowed
    #[error("Insufficient permissions: {role} is not one of {allowed:?}")]
    InsufficientRole { role: Role, allowed: Vec<Role> },
}

impl From<AuthzError> for DenyReason {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::NoSession => DenyReason::NoSession,
            AuthzError::InsufficientRole { role, .. } => DenyReason::RoleNotAllowed { role },
        }
    }
}

/// Outcome of guarding a privileged surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guarded<T> {
    /// The wrapped surface may be shown
    Authorized(T),

    /// An access-denied surface must be shown instead
    Denied(DenyReason),
}

impl<T> Guarded<T> {
    pub fn is_authorized(&self) -> bool {
        matches!(self, Guarded::Authorized(_))
    }

    /// Converts into a `Result`, dropping the surface on denial
    pub fn into_result(self) -> Result<T, DenyReason> {
        match self {
            Guarded::Authorized(surface) => Ok(surface),
            Guarded::Denied(reason) => Err(reason),
        }
    }
}

/// Pure allow-list decision
pub fn allowed(role: Option<Role>, allow_list: &[Role]) -> bool {
    match role {
        Some(role) => allow_list.contains(&role),
        None => false,
    }
}

/// Checks the session role against an allow-list
///
/// # Errors
///
/// - `AuthzError::NoSession` if no user is signed in
/// - `AuthzError::InsufficientRole` if the role is not listed
pub fn require_role(state: &SessionState, allow_list: &[Role]) -> Result<(), AuthzError> {
    let role = state.role().ok_or(AuthzError::NoSession)?;

    if !allowed(Some(role), allow_list) {
        return Err(AuthzError::InsufficientRole {
            role,
            allowed: allow_list.to_vec(),
        });
    }

    Ok(())
}

/// Guards a surface behind an allow-list
///
/// Re-evaluate on every use; the session may have changed since the last call.
pub fn authorize<T>(state: &SessionState, allow_list: &[Role], surface: T) -> Guarded<T> {
    match require_role(state, allow_list) {
        Ok(()) => Guarded::Authorized(surface),
        Err(err) => {
            tracing::debug!(error = %err, "Access denied");
            Guarded::Denied(err.into())
        }
    }
}
