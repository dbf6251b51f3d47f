//! Cancellation tokens and the one-shot recovery timers built on them.
//!
//! A dispatched emergency service returns to `Available` after its
//! response time. Each pending return is a detached thread waiting on a
//! [`CancelToken`]; cancelling the token (resource removed, snapshot
//! reloaded, scheduler stopped, or a newer dispatch) turns the callback
//! into a no-op.

use crate::{
    state::{lock_state, CityState},
    types::ResourceId,
};
use std::{
    collections::HashMap,
    sync::{Arc, Condvar, Mutex, PoisonError, Weak},
    thread,
    time::{Duration, Instant},
};

/// A shared boolean flag that sleepers can wait on.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let (flag, wake) = &*self.inner;
        *flag.lock().unwrap_or_else(PoisonError::into_inner) = true;
        wake.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleep for up to `timeout`. Returns `true` if cancelled meanwhile.
    pub fn wait(&self, timeout: Duration) -> bool {
        let (flag, wake) = &*self.inner;
        let deadline = Instant::now() + timeout;
        let mut cancelled = flag.lock().unwrap_or_else(PoisonError::into_inner);
        while !*cancelled {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            cancelled = wake
                .wait_timeout(cancelled, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        *cancelled
    }

    pub fn same_as(&self, other: &CancelToken) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Pending recovery callbacks, at most one per service.
#[derive(Debug)]
pub struct RecoveryTimers {
    home: Weak<Mutex<CityState>>,
    unit: Duration,
    pending: HashMap<ResourceId, CancelToken>,
}

impl RecoveryTimers {
    /// Timers whose callbacks re-enter the state behind `home`.
    pub(crate) fn new(home: Weak<Mutex<CityState>>, unit: Duration) -> Self {
        Self { home, unit, pending: HashMap::new() }
    }

    /// Timers with no shared state to return to. Callbacks still wait
    /// out their delay but never mutate anything.
    pub(crate) fn detached(unit: Duration) -> Self {
        Self::new(Weak::new(), unit)
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, service_id: &str) -> bool {
        self.pending.contains_key(service_id)
    }

    /// Schedule the return to `Available` after `response_time` units.
    /// Replaces (and cancels) any timer already pending for the service.
    pub fn schedule(&mut self, service_id: &str, response_time: u32) {
        let delay = self.unit * response_time;
        let token = CancelToken::new();
        if let Some(previous) = self.pending.insert(service_id.to_string(), token.clone()) {
            previous.cancel();
        }

        let home = self.home.clone();
        let id = service_id.to_string();
        let spawned = thread::Builder::new()
            .name("recovery".to_string())
            .spawn(move || {
                if token.wait(delay) {
                    return;
                }
                let Some(city) = home.upgrade() else {
                    return;
                };
                let mut state = lock_state(&city);
                // Cancellation happens under the state lock, so this check
                // cannot race a removal.
                if token.is_cancelled() {
                    return;
                }
                state.complete_response(&id, &token);
            });

        match spawned {
            Ok(_) => log::debug!("Recovery for {service_id} scheduled in {delay:?}"),
            Err(e) => {
                log::error!("Could not start recovery timer for {service_id}: {e}");
                self.pending.remove(service_id);
            }
        }
    }

    pub fn cancel(&mut self, service_id: &str) {
        if let Some(token) = self.pending.remove(service_id) {
            token.cancel();
            log::debug!("Recovery for {service_id} cancelled");
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, token) in self.pending.drain() {
            token.cancel();
        }
    }

    /// Drop the entry for a callback that is firing now. Returns `false`
    /// if the entry was superseded or cancelled.
    pub(crate) fn settle(&mut self, service_id: &str, token: &CancelToken) -> bool {
        match self.pending.get(service_id) {
            Some(current) if current.same_as(token) => {
                self.pending.remove(service_id);
                true
            }
            _ => false,
        }
    }
}

impl Drop for RecoveryTimers {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
