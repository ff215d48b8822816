//! Per-server registration cache.
//!
//! Each normalized server key maps to a slot that is filled at most once.
//! Concurrent requests for the same key wait on the first one; if it fails,
//! the slot stays empty and the next waiter tries again.

use mcpk_types::{FunctionHandle, ToolProvider};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;

/// Everything registered for one server.
pub struct Registration {
    pub key: String,
    pub handles: Vec<FunctionHandle>,
    pub client: Arc<dyn ToolProvider>,
    disposer: Mutex<Option<JoinHandle<()>>>,
}

impl Registration {
    pub fn new(
        key: String,
        handles: Vec<FunctionHandle>,
        client: Arc<dyn ToolProvider>,
        disposer: JoinHandle<()>,
    ) -> Self {
        Self {
            key,
            handles,
            client,
            disposer: Mutex::new(Some(disposer)),
        }
    }

    /// Take the task that disposes the client once the lifetime ends.
    /// Only the first caller gets it.
    pub fn take_disposer(&self) -> Option<JoinHandle<()>> {
        self.disposer.lock().unwrap_or_else(|e| e.into_inner()).take()
    }
}

type Slot = Arc<OnceCell<Arc<Registration>>>;

#[derive(Default)]
pub struct RegistrationCache {
    slots: Mutex<HashMap<String, Slot>>,
}

impl RegistrationCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(slots.entry(key.to_string()).or_default())
    }

    /// The completed registration for `key`, if any.
    pub fn get(&self, key: &str) -> Option<Arc<Registration>> {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.get(key).and_then(|slot| slot.get().cloned())
    }

    /// Return the registration for `key`, running `register` if there is none.
    ///
    /// The boolean is `true` when this call performed the registration.
    pub async fn get_or_register<F, Fut, E>(
        &self,
        key: &str,
        register: F,
    ) -> Result<(Arc<Registration>, bool), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Registration, E>>,
    {
        let slot = self.slot(key);
        let mut performed = false;
        let registration = slot
            .get_or_try_init(|| {
                performed = true;
                let fut = register();
                async move { fut.await.map(Arc::new) }
            })
            .await?;
        Ok((Arc::clone(registration), performed))
    }

    /// Every completed registration.
    pub fn registrations(&self) -> Vec<Arc<Registration>> {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.values().filter_map(|slot| slot.get().cloned()).collect()
    }

    pub fn len(&self) -> usize {
        self.registrations().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcpk_types::{BoxFuture, RemoteCallError, ToolArguments, ToolDescriptor, ToolResult};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_util::sync::CancellationToken;

    struct Idle;

    impl ToolProvider for Idle {
        fn server_name(&self) -> &str {
            "idle"
        }

        fn list_tools<'a>(
            &'a self,
            _cancel: &'a CancellationToken,
        ) -> BoxFuture<'a, Result<Vec<ToolDescriptor>, RemoteCallError>> {
            Box::pin(async { Ok(Vec::new()) })
        }

        fn call_tool<'a>(
            &'a self,
            _name: &'a str,
            _arguments: ToolArguments,
            _cancel: &'a CancellationToken,
        ) -> BoxFuture<'a, Result<ToolResult, RemoteCallError>> {
            Box::pin(async { Ok(ToolResult::default()) })
        }

        fn dispose(&self) -> BoxFuture<'_, ()> {
            Box::pin(async {})
        }
    }

    fn registration(key: &str) -> Registration {
        Registration::new(key.to_string(), Vec::new(), Arc::new(Idle), tokio::spawn(async {}))
    }

    #[tokio::test]
    async fn second_request_reuses_first() {
        let cache = RegistrationCache::new();
        let (_, first) = cache
            .get_or_register("k", || async { Ok::<_, ()>(registration("k")) })
            .await
            .unwrap();
        let (reg, second) = cache
            .get_or_register("k", || async { Ok::<_, ()>(registration("other")) })
            .await
            .unwrap();
        assert!(first);
        assert!(!second);
        assert_eq!(reg.key, "k");
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn failed_registration_leaves_slot_empty() {
        let cache = RegistrationCache::new();
        let result = cache
            .get_or_register("k", || async { Err::<Registration, _>("boom") })
            .await;
        assert!(result.is_err());
        assert!(cache.get("k").is_none());
        assert!(cache.is_empty());

        let (_, performed) = cache
            .get_or_register("k", || async { Ok::<_, &str>(registration("k")) })
            .await
            .unwrap();
        assert!(performed);
    }

    #[tokio::test]
    async fn concurrent_requests_register_once() {
        let cache = RegistrationCache::new();
        let runs = AtomicUsize::new(0);
        let runs = &runs;
        let register = move || async move {
            runs.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            Ok::<_, ()>(registration("k"))
        };
        let (a, b) = tokio::join!(
            cache.get_or_register("k", register),
            cache.get_or_register("k", register)
        );
        assert!(Arc::ptr_eq(&a.unwrap().0, &b.unwrap().0));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn disposer_is_taken_once() {
        let reg = registration("k");
        assert!(reg.take_disposer().is_some());
        assert!(reg.take_disposer().is_none());
    }
}
