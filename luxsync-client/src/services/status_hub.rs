use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use luxsync_api::{Color, DeviceStatus};
use tokio::sync::{Notify, RwLock};
use tokio::task::AbortHandle;
use tracing::debug;

use super::StatusStore;

pub type Listener = Arc<dyn Fn(&DeviceStatus) + Send + Sync>;

/// Counter of user-intent transitions, used to tell whether a command's
/// tentative state has been superseded by a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Revision(u64);

#[derive(Debug, Clone)]
pub struct Transition {
    pub revision: Revision,
    /// Status before the transition was applied
    pub previous: DeviceStatus,
    /// Target of a blink restoration cancelled by this transition
    pub cancelled_restore: Option<Color>,
    pub status: DeviceStatus,
}

struct HubState {
    status: DeviceStatus,
    revision: u64,
}

struct PendingRestore {
    token: u64,
    target: Color,
    handle: AbortHandle,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
}

/// Handle returned by [`StatusHub::subscribe`]; the listener is removed
/// when it is dropped.
#[must_use = "dropping a subscription unsubscribes the listener"]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).listeners.retain(|(id, _)| *id != self.id);
        }
    }
}

/// Shared device status with observer notification. Cloning is cheap and
/// every clone sees the same state.
#[derive(Clone)]
pub struct StatusHub {
    state: Arc<RwLock<HubState>>,
    listeners: Arc<Mutex<Registry>>,
    restore: Arc<Mutex<Option<PendingRestore>>>,
    // signalled whenever the restore slot is emptied
    restore_done: Arc<Notify>,
    store: Arc<StatusStore>,
    persist_lock: Arc<tokio::sync::Mutex<()>>,
    renotify_delay: Duration,
}

impl StatusHub {
    /// Builds the hub from whatever the store holds.
    pub async fn hydrate(store: StatusStore, renotify_delay: Duration) -> Self {
        let status = store.load().await;
        Self::with_status(status, store, renotify_delay)
    }

    pub fn with_status(status: DeviceStatus, store: StatusStore, renotify_delay: Duration) -> Self {
        Self {
            state: Arc::new(RwLock::new(HubState {
                status,
                revision: 0,
            })),
            listeners: Arc::new(Mutex::new(Registry::default())),
            restore: Arc::new(Mutex::new(None)),
            restore_done: Arc::new(Notify::new()),
            store: Arc::new(store),
            persist_lock: Arc::new(tokio::sync::Mutex::new(())),
            renotify_delay,
        }
    }

    pub async fn status(&self) -> DeviceStatus {
        self.state.read().await.status.clone()
    }

    pub async fn current_color(&self) -> Color {
        self.state.read().await.status.current_color.clone()
    }

    pub async fn revision(&self) -> Revision {
        Revision(self.state.read().await.revision)
    }

    /// Listeners run in registration order, once per mutation, plus once
    /// more after the re-notification delay with the latest snapshot.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&DeviceStatus) + Send + Sync + 'static,
    {
        let mut registry = lock(&self.listeners);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.push((id, Arc::new(listener)));

        Subscription {
            id,
            registry: Arc::downgrade(&self.listeners),
        }
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).listeners.len()
    }

    /// Background mutation such as a health check. Does not count as a
    /// new user intent.
    pub async fn update<F>(&self, f: F) -> DeviceStatus
    where
        F: FnOnce(&mut DeviceStatus),
    {
        let snapshot = {
            let mut state = self.state.write().await;
            f(&mut state.status);
            state.status.clone()
        };

        self.commit(snapshot.clone()).await;
        snapshot
    }

    /// Applies the tentative state of a user command. Cancels any pending
    /// blink restoration so it cannot overwrite this intent.
    pub async fn begin<F>(&self, f: F) -> Transition
    where
        F: FnOnce(&mut DeviceStatus),
    {
        let transition = {
            let mut state = self.state.write().await;
            let cancelled_restore = self.take_restore().map(|pending| {
                pending.handle.abort();
                pending.target
            });

            let previous = state.status.clone();
            state.revision += 1;
            f(&mut state.status);

            Transition {
                revision: Revision(state.revision),
                previous,
                cancelled_restore,
                status: state.status.clone(),
            }
        };

        self.commit(transition.status.clone()).await;
        transition
    }

    /// Confirms or fails a command. The closure learns whether a newer
    /// transition has happened since `revision`.
    pub async fn settle<F>(&self, revision: Revision, f: F) -> DeviceStatus
    where
        F: FnOnce(&mut DeviceStatus, bool),
    {
        let snapshot = {
            let mut state = self.state.write().await;
            let superseded = state.revision != revision.0;
            f(&mut state.status, superseded);
            state.status.clone()
        };

        self.commit(snapshot.clone()).await;
        snapshot
    }

    /// Puts `target` back as the current color after `delay`, unless a
    /// newer transition cancels it first. Nothing is scheduled when a newer
    /// transition already happened since `revision`.
    pub async fn schedule_restore(&self, revision: Revision, target: Color, delay: Duration) -> bool {
        // held while installing, so `begin` cannot slip in between
        let state = self.state.read().await;
        if state.revision != revision.0 {
            debug!(color = %target, "not restoring, superseded by a newer command");
            return false;
        }

        let mut slot = lock(&self.restore);
        if let Some(previous) = slot.take() {
            previous.handle.abort();
        }

        let hub = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            hub.fire_restore(revision.0).await;
        })
        .abort_handle();

        *slot = Some(PendingRestore {
            token: revision.0,
            target,
            handle,
        });
        true
    }

    pub fn pending_restore(&self) -> Option<Color> {
        lock(&self.restore).as_ref().map(|pending| pending.target.clone())
    }

    pub fn cancel_restore(&self) -> bool {
        match self.take_restore() {
            Some(pending) => {
                pending.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Waits until no blink restoration is pending, then writes the final
    /// state. Short-lived callers use this before exiting.
    pub async fn wait_for_restore(&self) {
        loop {
            let done = self.restore_done.notified();
            if self.pending_restore().is_none() {
                break;
            }
            done.await;
        }

        let _guard = self.persist_lock.lock().await;
        let latest = self.status().await;
        self.store.save(&latest).await;
    }

    /// Forgets everything: pending restoration, live state and storage.
    pub async fn reset(&self) -> DeviceStatus {
        self.cancel_restore();

        let snapshot = {
            let mut state = self.state.write().await;
            state.revision += 1;
            state.status = DeviceStatus::default();
            state.status.clone()
        };

        {
            let _guard = self.persist_lock.lock().await;
            self.store.clear().await;
        }

        self.publish(&snapshot);
        snapshot
    }

    async fn fire_restore(&self, token: u64) {
        let snapshot = {
            let mut state = self.state.write().await;
            let target = {
                let mut slot = lock(&self.restore);
                match slot.take() {
                    Some(pending) if pending.token == token => pending.target,
                    other => {
                        *slot = other;
                        return;
                    }
                }
            };
            self.restore_done.notify_waiters();

            if state.revision != token {
                debug!(color = %target, "dropping restore superseded by a newer command");
                return;
            }

            debug!(color = %target, "restoring color after blink");
            state.status.current_color = target;
            state.status.clone()
        };

        self.commit(snapshot).await;
    }

    /// Cancels the restoration scheduled by the transition at `revision`,
    /// leaving newer ones alone.
    pub fn cancel_restore_from(&self, revision: Revision) -> bool {
        let mut slot = lock(&self.restore);
        match slot.take() {
            Some(pending) if pending.token == revision.0 => {
                pending.handle.abort();
                self.restore_done.notify_waiters();
                true
            }
            other => {
                *slot = other;
                false
            }
        }
    }

    fn take_restore(&self) -> Option<PendingRestore> {
        let pending = lock(&self.restore).take();
        if pending.is_some() {
            self.restore_done.notify_waiters();
        }
        pending
    }

    async fn commit(&self, snapshot: DeviceStatus) {
        self.publish(&snapshot);

        // Saves the latest state rather than `snapshot` so that racing
        // commits cannot leave an older record behind.
        let _guard = self.persist_lock.lock().await;
        let latest = self.status().await;
        self.store.save(&latest).await;
    }

    fn publish(&self, snapshot: &DeviceStatus) {
        notify(&self.listeners, snapshot);

        let state = self.state.clone();
        let listeners = self.listeners.clone();
        let delay = self.renotify_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let latest = state.read().await.status.clone();
            notify(&listeners, &latest);
        });
    }
}

fn notify(registry: &Mutex<Registry>, snapshot: &DeviceStatus) {
    let listeners: Vec<Listener> = lock(registry)
        .listeners
        .iter()
        .map(|(_, listener)| listener.clone())
        .collect();

    debug!(listeners = listeners.len(), color = %snapshot.current_color, "notifying status listeners");

    for listener in listeners {
        listener(snapshot);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
