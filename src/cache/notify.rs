//! Invalidation Notification Module
//!
//! Callbacks that observe keys leaving a cache through `invalidate`,
//! `clear` or `cleanup`. Hook failures are caught and logged; they never
//! reach the cache operation that fired them.

use std::fmt;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use tokio::runtime::Handle;
use tracing::{error, warn};

use crate::error::CacheError;

/// Future returned by an asynchronous invalidation hook.
pub type HookFuture = BoxFuture<'static, anyhow::Result<()>>;

type SyncHookFn = dyn Fn(&str) -> anyhow::Result<()> + Send + Sync;
type AsyncHookFn = dyn Fn(String) -> HookFuture + Send + Sync;

// == Invalidation Hook ==
/// A callback invoked once per key removed by an invalidation.
#[derive(Clone)]
pub enum InvalidationHook {
    /// Runs inline, before the key is removed.
    Sync(Arc<SyncHookFn>),
    /// Spawned as a detached task; the cache does not wait for it.
    Async(Arc<AsyncHookFn>),
}

impl InvalidationHook {
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&str) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(f))
    }

    pub fn asynchronous<F, Fut>(f: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self::Async(Arc::new(move |key| f(key).boxed()))
    }
}

impl fmt::Debug for InvalidationHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync(_) => f.write_str("InvalidationHook::Sync"),
            Self::Async(_) => f.write_str("InvalidationHook::Async"),
        }
    }
}

/// Handle returned by `on_invalidate`, used to unregister the hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

// == Hook Registry ==
#[derive(Default)]
pub(crate) struct HookRegistry {
    next_id: u64,
    hooks: Vec<(HookId, InvalidationHook)>,
}

impl HookRegistry {
    pub fn register(&mut self, hook: InvalidationHook) -> HookId {
        let id = HookId(self.next_id);
        self.next_id += 1;
        self.hooks.push((id, hook));
        id
    }

    pub fn unregister(&mut self, id: HookId) -> bool {
        let before = self.hooks.len();
        self.hooks.retain(|(hook_id, _)| *hook_id != id);
        self.hooks.len() != before
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Runs every registered hook for `key`.
    pub fn notify(&self, key: &str) {
        for (_, hook) in &self.hooks {
            dispatch(hook, key);
        }
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

fn dispatch(hook: &InvalidationHook, key: &str) {
    match hook {
        InvalidationHook::Sync(f) => match catch_unwind(AssertUnwindSafe(|| f(key))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => report_failure(key, format!("{:#}", err)),
            Err(panic) => report_failure(key, panic_message(panic.as_ref())),
        },
        InvalidationHook::Async(f) => {
            let handle = match Handle::try_current() {
                Ok(handle) => handle,
                Err(_) => {
                    warn!(key, "No async runtime available, skipping async invalidation hook");
                    return;
                }
            };

            let future = match catch_unwind(AssertUnwindSafe(|| f(key.to_string()))) {
                Ok(future) => future,
                Err(panic) => {
                    report_failure(key, panic_message(panic.as_ref()));
                    return;
                }
            };

            let key = key.to_string();
            handle.spawn(async move {
                match AssertUnwindSafe(future).catch_unwind().await {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => report_failure(&key, format!("{:#}", err)),
                    Err(panic) => report_failure(&key, panic_message(panic.as_ref())),
                }
            });
        }
    }
}

fn report_failure(key: &str, message: String) {
    let err = CacheError::HookExecution {
        key: key.to_string(),
        message,
    };
    error!("{}", err);
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "hook panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_register_and_unregister() {
        let mut registry = HookRegistry::default();
        let a = registry.register(InvalidationHook::sync(|_| Ok(())));
        let b = registry.register(InvalidationHook::sync(|_| Ok(())));

        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
        assert!(registry.unregister(a));
        assert!(!registry.unregister(a));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_failing_hooks_do_not_stop_others() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HookRegistry::default();

        registry.register(InvalidationHook::sync(|_| anyhow::bail!("boom")));
        registry.register(InvalidationHook::sync(|_| panic!("hook exploded")));
        let sink = seen.clone();
        registry.register(InvalidationHook::sync(move |key| {
            sink.lock().unwrap().push(key.to_string());
            Ok(())
        }));

        registry.notify("k1");
        registry.notify("k2");

        assert_eq!(*seen.lock().unwrap(), vec!["k1", "k2"]);
    }

    #[test]
    fn test_async_hook_without_runtime_is_skipped() {
        let mut registry = HookRegistry::default();
        registry.register(InvalidationHook::asynchronous(|_| async { Ok(()) }));

        // Must not panic outside a tokio runtime
        registry.notify("k");
    }

    #[tokio::test]
    async fn test_async_hook_runs_detached() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut registry = HookRegistry::default();
        registry.register(InvalidationHook::asynchronous(move |key| {
            let tx = tx.clone();
            async move {
                tx.send(key)?;
                Ok(())
            }
        }));
        registry.register(InvalidationHook::asynchronous(|_| async {
            anyhow::bail!("rejected")
        }));

        registry.notify("detached");

        let key = tokio::time::timeout(std::time::Duration::from_secs(1), rx.recv())
            .await
            .unwrap();
        assert_eq!(key.as_deref(), Some("detached"));
    }
}
