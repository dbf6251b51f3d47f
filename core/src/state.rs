//! The authoritative in-memory city state and its shared handle.
//!
//! RULE: Every read-then-mutate sequence runs under the single coarse lock
//! held by [`City`]. Workers, command handlers and recovery timers all go
//! through [`City::lock`]; nothing else touches the state concurrently.

use crate::{
    alert::{self, AlertContext},
    config::SimConfig,
    error::{RegistryError, RegistryResult},
    event::{CityEvent, NotificationLog},
    metrics::AggregateMetrics,
    repository::CityRepository,
    resource::{status, CityResource, ResourceKind},
    snapshot,
    timer::{CancelToken, RecoveryTimers},
};
use std::{
    path::Path,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

/// Lock the shared state, recovering from a poisoned mutex.
/// A worker that panicked mid-pass must not take the registry down with it.
pub(crate) fn lock_state(city: &Mutex<CityState>) -> MutexGuard<'_, CityState> {
    city.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct CityState {
    pub repository: CityRepository,
    pub metrics: AggregateMetrics,
    pub notifications: NotificationLog,
    pub(crate) timers: RecoveryTimers,
    unsaved_changes: bool,
}

impl CityState {
    /// A standalone state. Recovery timers started here never fire back
    /// into it; use [`City`] when services must return to `Available`.
    pub fn new(config: &SimConfig) -> Self {
        Self::with_timers(RecoveryTimers::detached(config.response_time_unit()))
    }

    fn with_timers(timers: RecoveryTimers) -> Self {
        Self {
            repository: CityRepository::new(),
            metrics: AggregateMetrics::new(),
            notifications: NotificationLog::new(),
            timers,
            unsaved_changes: false,
        }
    }

    // ── Repository API ─────────────────────────────────────────

    pub fn add(&mut self, resource: CityResource) -> RegistryResult<()> {
        self.repository.insert(resource, &mut self.metrics)
    }

    pub fn get(&self, id: &str) -> Option<&CityResource> {
        self.repository.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut CityResource> {
        self.repository.get_mut(id)
    }

    /// Remove a resource and cancel any recovery still pending for it.
    /// Aggregate counters are left untouched.
    pub fn remove(&mut self, id: &str) -> Option<CityResource> {
        self.timers.cancel(id);
        self.repository.remove(id)
    }

    pub fn list_all(&self) -> Vec<CityResource> {
        self.repository.list_all()
    }

    pub fn pending_recoveries(&self) -> usize {
        self.timers.pending()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved_changes
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.unsaved_changes = true;
    }

    // ── Persistence ────────────────────────────────────────────

    pub fn save_snapshot(&mut self, path: &Path) -> RegistryResult<()> {
        match snapshot::write_snapshot(path, self.repository.as_slice()) {
            Ok(()) => {
                self.unsaved_changes = false;
                self.notifications.push(CityEvent::DataSaved { path: path.display().to_string() });
                Ok(())
            }
            Err(e) => {
                self.notifications.push(CityEvent::SaveFailed {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Replace the population with the snapshot at `path` and rebuild the
    /// aggregate counters from it. Services loaded as `Responding` get a
    /// fresh recovery timer. On any error the state is unchanged.
    pub fn load_snapshot(&mut self, path: &Path) -> RegistryResult<usize> {
        let loaded = snapshot::read_snapshot(path)?;
        let repository = CityRepository::from_population(loaded)?;

        self.timers.cancel_all();
        self.repository = repository;
        self.metrics.rebuild(self.repository.iter());
        // Timers are not persisted: restart recovery for services saved mid-response.
        for resource in self.repository.iter() {
            if let (Some(service), true) = (resource.as_emergency(), resource.has_status(status::RESPONDING)) {
                self.timers.schedule(resource.id(), service.response_time());
            }
        }
        self.unsaved_changes = false;
        self.notifications.push(CityEvent::DataLoaded { path: path.display().to_string() });
        Ok(self.repository.len())
    }

    // ── Alerts ─────────────────────────────────────────────────

    /// Split the state so a pass can walk the repository while alerting.
    pub(crate) fn alert_parts(&mut self) -> (&mut CityRepository, AlertContext<'_>) {
        let ctx = AlertContext {
            metrics: &mut self.metrics,
            notifications: &mut self.notifications,
            timers: &mut self.timers,
        };
        (&mut self.repository, ctx)
    }

    /// Deliver an alert to one resource. Returns whether it reacted.
    pub fn send_emergency_alert(&mut self, id: &str, message: &str) -> RegistryResult<bool> {
        let (repository, mut ctx) = self.alert_parts();
        let resource = repository
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound { id: id.to_string() })?;
        Ok(alert::send_emergency_alert(resource, message, &mut ctx))
    }

    /// Timed `Responding → Available` transition, fired by a recovery timer.
    pub(crate) fn complete_response(&mut self, id: &str, token: &CancelToken) {
        if !self.timers.settle(id, token) {
            return;
        }
        let Some(resource) = self.repository.get_mut(id) else {
            return;
        };
        let ResourceKind::Emergency(service) = &resource.kind else {
            return;
        };
        let service_type = service.service_type().to_string();
        resource.set_status(status::AVAILABLE);
        self.notifications.push(CityEvent::ResponseCompleted {
            service_id: id.to_string(),
            service_type,
        });
    }

    // ── Reports ────────────────────────────────────────────────

    pub fn resource_report(&mut self, id: &str) -> RegistryResult<String> {
        let resource = self
            .repository
            .get(id)
            .ok_or_else(|| RegistryError::NotFound { id: id.to_string() })?;
        Ok(resource.usage_report(&mut self.metrics))
    }

    /// City-wide report. Computes each resource's maintenance cost exactly
    /// once, so the cumulative totals grow by one pass.
    pub fn city_report(&mut self) -> String {
        let resources = self.repository.as_slice();
        let (mut transport, mut power, mut emergency) = (0usize, 0usize, 0usize);
        for resource in resources {
            match resource.kind {
                ResourceKind::Transport(_) => transport += 1,
                ResourceKind::Power(_)     => power += 1,
                ResourceKind::Emergency(_) => emergency += 1,
            }
        }

        let mut report = format!(
            "Resource Report - {}\n",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S")
        );
        report.push_str(&format!("Transport Units: {transport}\n"));
        report.push_str(&format!("Power Stations: {power}\n"));
        for resource in resources {
            if let ResourceKind::Power(station) = &resource.kind {
                report.push_str(&format!(
                    "Power Station {}: {}MW output, Type: {}\n",
                    resource.id(),
                    station.energy_output(),
                    station.power_type()
                ));
            }
        }
        report.push_str(&format!("Emergency Services: {emergency}\n\n"));

        report.push_str("Maintenance Costs:\n");
        for resource in resources {
            let cost = resource.calculate_maintenance_cost(&mut self.metrics);
            report.push_str(&format!("- {}: ${cost:.2}\n", resource.id()));
        }
        report.push_str(&format!(
            "Total Maintenance Cost: ${:.2}\n",
            self.metrics.total_maintenance_cost
        ));
        report.push_str(&format!("Total Passengers: {}\n", self.metrics.total_passengers));
        report.push_str(&format!(
            "Total Energy Usage: {:.2} MW\n",
            self.metrics.total_energy_usage
        ));
        report
    }
}

/// Shared handle to the city state. Cloning shares the same state.
#[derive(Clone)]
pub struct City {
    inner: Arc<Mutex<CityState>>,
}

impl City {
    pub fn new(config: &SimConfig) -> Self {
        let unit = config.response_time_unit();
        Self::with_unit(unit)
    }

    fn with_unit(unit: Duration) -> Self {
        let inner = Arc::new_cyclic(|home| {
            Mutex::new(CityState::with_timers(RecoveryTimers::new(home.clone(), unit)))
        });
        Self { inner }
    }

    pub fn lock(&self) -> MutexGuard<'_, CityState> {
        lock_state(&self.inner)
    }

    /// Run `f` under the state lock.
    pub fn with<R>(&self, f: impl FnOnce(&mut CityState) -> R) -> R {
        f(&mut self.lock())
    }
}
