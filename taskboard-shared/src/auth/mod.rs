/// Authorization utilities
///
/// Authentication itself (token issuance) happens on the backend; the client
/// only decides, from the role held in the session, which privileged surfaces
/// and actions the user may reach.
///
/// # Modules
///
/// - [`authorization`]: Role guard and allow-list checks
///
/// # Example
///
/// ```
/// use taskboard_shared::auth::authorization::{allowed, PROJECT_CREATORS};
/// use taskboard_shared::models::user::Role;
///
/// assert!(allowed(Some(Role::ProjectManager), PROJECT_CREATORS));
/// assert!(!allowed(None, PROJECT_CREATORS));
/// ```

pub mod authorization;
