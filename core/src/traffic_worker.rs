//! Traffic — passenger counts drift up and down on every transport unit.

use crate::{
    config::SimConfig,
    error::RegistryResult,
    event::{CityEvent, TrafficTrend},
    resource::ResourceKind,
    rng::WorkerRng,
    state::CityState,
    worker::SimWorker,
};
use std::time::Duration;

pub struct TrafficWorker {
    interval: Duration,
    swing: u32,
    rng: WorkerRng,
}

impl TrafficWorker {
    pub fn new(config: &SimConfig, rng: WorkerRng) -> Self {
        Self {
            interval: Duration::from_millis(config.traffic_interval_ms),
            swing: config.traffic_swing,
            rng,
        }
    }
}

impl SimWorker for TrafficWorker {
    fn name(&self) -> &'static str { "traffic" }

    fn interval(&self) -> Duration { self.interval }

    fn run_once(&mut self, state: &mut CityState) -> RegistryResult<usize> {
        let CityState { repository, notifications, .. } = state;
        let mut touched = 0;

        for resource in repository.iter_mut() {
            let ResourceKind::Transport(unit) = &mut resource.kind else {
                continue;
            };
            let change = self.rng.swing(self.swing);
            let passengers = unit.adjust_for_traffic(change);
            notifications.push(CityEvent::TrafficUpdate {
                unit_id: resource.id().to_string(),
                trend: TrafficTrend::from_change(change),
                passengers,
            });
            touched += 1;
        }

        log::debug!("traffic: adjusted {touched} transport units");
        Ok(touched)
    }
}
