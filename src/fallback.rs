use std::future::Future;

use futures::future::BoxFuture;
use tracing::debug;

use crate::error::Result;

type AttemptFn<'a, T> = Box<dyn FnOnce() -> BoxFuture<'a, Result<Option<T>>> + Send + 'a>;

/// One named strategy in a fallback chain.
pub struct Attempt<'a, T> {
    name: String,
    run: AttemptFn<'a, T>,
}

impl<'a, T> Attempt<'a, T> {
    pub fn new<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = Result<Option<T>>> + Send + 'a,
    {
        Attempt {
            name: name.into(),
            run: Box::new(move || Box::pin(f())),
        }
    }
}

/// Runs attempts strictly in order and returns the first `Some`.
///
/// An attempt that errors is treated like one that returned `None`. Attempts
/// after the first success are never started.
pub async fn try_in_order<T>(attempts: Vec<Attempt<'_, T>>) -> Option<T> {
    for attempt in attempts {
        let Attempt { name, run } = attempt;
        match run().await {
            Ok(Some(value)) => {
                debug!(attempt = %name, "fallback attempt succeeded");
                return Some(value);
            }
            Ok(None) => debug!(attempt = %name, "fallback attempt produced nothing"),
            Err(e) => debug!(attempt = %name, error = %e, "fallback attempt failed"),
        }
    }

    None
}
