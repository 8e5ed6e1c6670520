use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::AppState;

/// Start the background no-show cleaner task.
///
/// A CALLED party gets a fixed window to show up at the entrance; once the
/// window lapses the party is canceled through the normal lifecycle path,
/// freeing its guest to rejoin.
pub fn start_no_show_cleaner(state: Arc<AppState>) -> JoinHandle<()> {
    let interval = Duration::from_secs(state.config.queue.cleanup_interval_seconds);

    tokio::spawn(async move {
        let mut interval_timer = tokio::time::interval(interval);

        loop {
            interval_timer.tick().await;
            run_cleanup(&state).await;
        }
    })
}

async fn run_cleanup(state: &Arc<AppState>) {
    debug!("Running no-show cleanup");

    let ttl = chrono::Duration::seconds(state.config.queue.called_ttl_seconds as i64);
    let task_state = Arc::clone(state);
    let result =
        tokio::task::spawn_blocking(move || task_state.waitlist.expire_overdue_calls(ttl)).await;

    match result {
        Ok(count) if count > 0 => debug!(no_shows_canceled = count, "No-show parties canceled"),
        Ok(_) => {}
        Err(e) => error!(error = %e, "No-show cleanup task panicked"),
    }
}
