// Deadline and panic isolation for participant calls
//
// Every participant call made by a coordinator goes through `guarded`, which
// turns a timeout or a panic into an ordinary `Err`. Coordinator control flow
// is then driven purely by return values.

use crate::error::{AppError, Result};
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tokio::time::{timeout_at, Instant};
use tracing::error;

/// Run a participant call, failing it if `deadline` passes or it panics
pub async fn guarded<F, T>(deadline: Instant, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let started = Instant::now();

    match timeout_at(deadline, AssertUnwindSafe(future).catch_unwind()).await {
        Ok(Ok(result)) => result,
        Ok(Err(panic_info)) => {
            let panic_msg = panic_message(panic_info.as_ref());
            error!(panic_msg = %panic_msg, "Participant call panicked");
            Err(AppError::Panicked(panic_msg))
        }
        Err(_) => {
            let budget_ms = deadline.saturating_duration_since(started).as_millis() as u64;
            Err(AppError::Timeout(budget_ms))
        }
    }
}

fn panic_message(panic_info: &(dyn Any + Send)) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
