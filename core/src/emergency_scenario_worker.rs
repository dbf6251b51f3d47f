//! Emergency scenarios — occasional injected incidents.
//!
//! Each pass picks one resource uniformly at random:
//!   - power station: with `outage_probability`, a full outage cascade.
//!   - transport unit: with `transport_emergency_probability`, it goes to
//!     `Emergency` and the FIRST available emergency service responds.
//!   - emergency service: nothing happens.

use crate::{
    alert::{dispatch_first_available, simulate_outage, ProximityPolicy},
    config::SimConfig,
    error::RegistryResult,
    event::CityEvent,
    resource::{status, ResourceKind},
    rng::WorkerRng,
    state::CityState,
    worker::SimWorker,
};
use std::time::Duration;

pub const TRANSPORT_RESPONSE_MESSAGE: &str = "Transport emergency response needed";

#[derive(Clone, Copy)]
enum Picked {
    Station,
    Vehicle,
    Service,
}

impl Picked {
    fn of(kind: &ResourceKind) -> Self {
        match kind {
            ResourceKind::Power(_)     => Self::Station,
            ResourceKind::Transport(_) => Self::Vehicle,
            ResourceKind::Emergency(_) => Self::Service,
        }
    }
}

pub struct EmergencyScenarioWorker {
    interval: Duration,
    outage_probability: f64,
    transport_emergency_probability: f64,
    rng: WorkerRng,
    proximity: Box<dyn ProximityPolicy>,
}

impl EmergencyScenarioWorker {
    pub fn new(config: &SimConfig, rng: WorkerRng, proximity: Box<dyn ProximityPolicy>) -> Self {
        Self {
            interval: Duration::from_millis(config.scenario_interval_ms),
            outage_probability: config.outage_probability,
            transport_emergency_probability: config.transport_emergency_probability,
            rng,
            proximity,
        }
    }
}

impl SimWorker for EmergencyScenarioWorker {
    fn name(&self) -> &'static str { "emergency_scenario" }

    fn interval(&self) -> Duration { self.interval }

    fn run_once(&mut self, state: &mut CityState) -> RegistryResult<usize> {
        if state.repository.is_empty() {
            return Ok(0);
        }
        let index = self.rng.pick_index(state.repository.len());
        let Some(target) = state.repository.as_slice().get(index) else {
            return Ok(0);
        };
        let target_id = target.id().to_string();
        let location = target.location.clone();
        let picked = Picked::of(&target.kind);

        match picked {
            Picked::Station if self.rng.chance(self.outage_probability) => {
                let dispatched = simulate_outage(state, &target_id, self.proximity.as_mut())?;
                state.notifications.push(CityEvent::OutageScenario { location });
                Ok(1 + dispatched.len())
            }
            Picked::Vehicle if self.rng.chance(self.transport_emergency_probability) => {
                if let Some(unit) = state.get_mut(&target_id) {
                    unit.set_status(status::EMERGENCY);
                }
                state.notifications.push(CityEvent::TransportEmergency {
                    unit_id: target_id,
                    location,
                });
                let responder = dispatch_first_available(state, TRANSPORT_RESPONSE_MESSAGE);
                Ok(1 + usize::from(responder.is_some()))
            }
            Picked::Station | Picked::Vehicle | Picked::Service => Ok(0),
        }
    }
}
