/// Keeps the session role in line with the server
///
/// An administrator may change a user's role while that user is signed in.
/// The dashboard keeps a subscription on "fetch user by username" for the
/// signed-in user; whenever it resolves with the same username and a
/// different role, the session user is replaced. Each resolution is applied
/// once.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::TaskboardApi;
use crate::cache::QueryState;
use crate::error::ClientResult;

/// Fetches the signed-in user once and applies a role change
///
/// Returns whether the session user was replaced. Not signed in is `Ok(false)`.
pub async fn sync_role_once(api: &TaskboardApi) -> ClientResult<bool> {
    let Some(current) = api.session().user() else {
        return Ok(false);
    };
    let fetched = api.get_user(&current.username).await?;
    Ok(api.session().sync_fetched_user(&fetched))
}

/// Runs the role sync until cancelled
///
/// Follows sign-in and sign-out: the subscription is re-created whenever the
/// signed-in username changes.
pub async fn run_role_sync(api: TaskboardApi, shutdown: CancellationToken) {
    let mut session_rx = api.session().subscribe();

    loop {
        let username = session_rx
            .borrow_and_update()
            .user
            .as_ref()
            .map(|user| user.username.clone());

        let Some(username) = username else {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                changed = session_rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    continue;
                }
            }
        };

        tracing::debug!(username = %username, "Watching session user");
        let mut subscription = api.watch_user(&username);
        if let QueryState::Ready(user) = subscription.current() {
            api.session().sync_fetched_user(&user);
        }

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                changed = session_rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    let same_user = session_rx
                        .borrow()
                        .user
                        .as_ref()
                        .is_some_and(|user| user.username == username);
                    if !same_user {
                        break;
                    }
                }
                state = subscription.next_update() => match state {
                    QueryState::Ready(user) => {
                        api.session().sync_fetched_user(&user);
                    }
                    QueryState::Failed(e) => {
                        tracing::debug!(username = %username, error = %e, "User fetch failed");
                    }
                    QueryState::Loading => {}
                },
            }
        }
    }
}

/// Spawns [`run_role_sync`] on the current runtime
pub fn spawn_role_sync(api: TaskboardApi, shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(run_role_sync(api, shutdown))
}
