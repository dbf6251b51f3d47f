//! Status drift — equipment wear and routine patrols.
//!
//! Each pass:
//!   - every power station rolls for maintenance; an `Operational` one
//!     that hits goes to `Maintenance` with a notification.
//!   - every emergency service rolls for a patrol; an `Available` one that
//!     hits is dispatched through the alert cascade.

use crate::{
    alert::send_emergency_alert,
    config::SimConfig,
    error::RegistryResult,
    event::CityEvent,
    resource::{status, ResourceKind},
    rng::WorkerRng,
    state::CityState,
    worker::SimWorker,
};
use std::time::Duration;

pub const PATROL_MESSAGE: &str = "Routine patrol dispatch";

pub struct StatusDriftWorker {
    interval: Duration,
    maintenance_probability: f64,
    patrol_probability: f64,
    rng: WorkerRng,
}

impl StatusDriftWorker {
    pub fn new(config: &SimConfig, rng: WorkerRng) -> Self {
        Self {
            interval: Duration::from_millis(config.status_drift_interval_ms),
            maintenance_probability: config.maintenance_probability,
            patrol_probability: config.patrol_probability,
            rng,
        }
    }
}

impl SimWorker for StatusDriftWorker {
    fn name(&self) -> &'static str { "status_drift" }

    fn interval(&self) -> Duration { self.interval }

    fn run_once(&mut self, state: &mut CityState) -> RegistryResult<usize> {
        let (repository, mut ctx) = state.alert_parts();
        let mut touched = 0;

        for resource in repository.iter_mut() {
            match resource.kind {
                ResourceKind::Power(_) => {
                    // The roll happens for every station, operational or not.
                    if self.rng.chance(self.maintenance_probability)
                        && resource.has_status(status::OPERATIONAL)
                    {
                        resource.set_status(status::MAINTENANCE);
                        ctx.notifications.push(CityEvent::MaintenanceRequired {
                            station_id: resource.id().to_string(),
                        });
                        touched += 1;
                    }
                }
                ResourceKind::Emergency(_) => {
                    if self.rng.chance(self.patrol_probability)
                        && resource.has_status(status::AVAILABLE)
                        && send_emergency_alert(resource, PATROL_MESSAGE, &mut ctx)
                    {
                        touched += 1;
                    }
                }
                ResourceKind::Transport(_) => {}
            }
        }

        log::debug!("status_drift: {touched} resources changed");
        Ok(touched)
    }
}
