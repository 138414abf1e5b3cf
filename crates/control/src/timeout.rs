use crate::error::{ControlError, Result};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub enum TimedOutcome<T> {
    Completed { value: T, elapsed: Duration },
    /// The deadline fired first. The operation keeps running detached; its result is dropped.
    TimedOut { elapsed: Duration },
}

/// Race `op` against `budget`.
///
/// `op` runs as its own task so that expiry returns to the caller immediately without
/// cancelling it. A completion that lands after the deadline is logged and discarded.
pub async fn run_with_timeout<F, T>(label: &str, budget: Duration, op: F) -> Result<TimedOutcome<T>>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let started = Instant::now();
    let abandoned = Arc::new(AtomicBool::new(false));

    let task_abandoned = Arc::clone(&abandoned);
    let task_label = label.to_string();
    let mut handle = tokio::spawn(async move {
        let value = op.await;
        if task_abandoned.load(Ordering::Acquire) {
            log::debug!("{task_label}: discarding result that completed after its deadline");
        }
        value
    });

    match tokio::time::timeout(budget, &mut handle).await {
        Ok(Ok(value)) => Ok(TimedOutcome::Completed {
            value,
            elapsed: started.elapsed(),
        }),
        Ok(Err(err)) => Err(ControlError::TaskFailed(format!("{label}: {err}"))),
        Err(_) => {
            abandoned.store(true, Ordering::Release);
            // Dropping the handle detaches the task; it is never joined again.
            drop(handle);
            let elapsed = started.elapsed();
            log::warn!(
                "{label}: timed out after {}ms (budget {}ms)",
                elapsed.as_millis(),
                budget.as_millis()
            );
            Ok(TimedOutcome::TimedOut { elapsed })
        }
    }
}
