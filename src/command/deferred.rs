//! Lazily-observed values produced by another task
//!
//! A [`Deferred`] can be handed out while a task graph is still being wired
//! up. Reading it with [`Deferred::get`] waits until the owning task calls
//! [`Resolver::resolve`]; checking [`Deferred::is_resolved`] never waits.

use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeferredError {
    /// The producing side was dropped without ever resolving a value
    #[error("the producing task finished without resolving '{0}'")]
    Abandoned(String),
}

/// Read side of a lazily-produced value
#[derive(Debug, Clone)]
pub struct Deferred<T> {
    label: String,
    rx: watch::Receiver<Option<T>>,
}

/// Write side of a lazily-produced value, held only by the producer
#[derive(Debug)]
pub struct Resolver<T> {
    label: String,
    tx: watch::Sender<Option<T>>,
}

/// Create a linked resolver/handle pair
pub fn channel<T>(label: impl Into<String>) -> (Resolver<T>, Deferred<T>) {
    let label = label.into();
    let (tx, rx) = watch::channel(None);
    (
        Resolver {
            label: label.clone(),
            tx,
        },
        Deferred { label, rx },
    )
}

impl<T: Clone> Deferred<T> {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_resolved(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// The value if it is already available
    pub fn try_get(&self) -> Option<T> {
        (*self.rx.borrow()).clone()
    }

    /// Wait for the value
    pub async fn get(&self) -> Result<T, DeferredError> {
        let mut rx = self.rx.clone();
        let value = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| DeferredError::Abandoned(self.label.clone()))?;
        (*value)
            .clone()
            .ok_or_else(|| DeferredError::Abandoned(self.label.clone()))
    }
}

impl<T> Resolver<T> {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Publish the value; returns false if a value was already resolved
    pub fn resolve(&self, value: T) -> bool {
        let mut slot = Some(value);
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = slot.take();
            true
        })
    }

    pub fn is_resolved(&self) -> bool {
        self.tx.borrow().is_some()
    }
}
