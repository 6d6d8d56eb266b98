//! Fixed-delay bounded retry

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;

/// Injectable sleep, so tests do not wait on the wall clock
pub type SleepFn = Arc<dyn Fn(Duration) -> BoxFuture<'static, ()> + Send + Sync>;

/// Sleep on the tokio timer
pub fn tokio_sleep() -> SleepFn {
    Arc::new(|delay| Box::pin(tokio::time::sleep(delay)))
}

/// Return immediately
pub fn no_sleep() -> SleepFn {
    Arc::new(|_| Box::pin(async {}))
}

/// Run `op` up to `attempts` times (at least once), sleeping `delay` between
/// attempts. `on_retry` sees every failure that will be retried. The last
/// error is returned once the budget is spent.
pub async fn retry_fixed<T, E, Op, Fut, OnRetry>(
    attempts: u32,
    delay: Duration,
    sleep: &SleepFn,
    mut op: Op,
    mut on_retry: OnRetry,
) -> Result<T, E>
where
    Op: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    OnRetry: FnMut(u32, &E),
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= attempts => return Err(err),
            Err(err) => {
                on_retry(attempt, &err);
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
