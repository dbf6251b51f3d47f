//! Aggregate metrics registry — process-wide cumulative counters.
//!
//! The counters are historical sums, not live-population figures:
//! removing a resource never decrements them, and every maintenance-cost
//! calculation adds to `total_maintenance_cost` again.
//!
//! Only a snapshot load resets them, via [`AggregateMetrics::rebuild`].

use crate::resource::{CityResource, ResourceKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateMetrics {
    pub total_resources:           u64,
    pub total_maintenance_cost:    f64,
    pub total_passengers:          u64,
    pub total_energy_usage:        f64,
    pub total_emergency_responses: u64,
    pub total_energy_consumed:     f64,
}

impl AggregateMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Account for a resource that has just joined the population.
    pub fn record_added(&mut self, resource: &CityResource) {
        self.total_resources += 1;
        if let ResourceKind::Power(station) = &resource.kind {
            self.total_energy_usage += station.energy_output();
        }
    }

    pub(crate) fn record_maintenance(&mut self, cost: f64) {
        self.total_maintenance_cost += cost;
    }

    pub(crate) fn record_passengers(&mut self, passengers: u32) {
        self.total_passengers += u64::from(passengers);
    }

    pub(crate) fn record_consumption(&mut self, consumption: f64) {
        self.total_energy_consumed += consumption;
    }

    pub(crate) fn record_emergency_response(&mut self) {
        self.total_emergency_responses += 1;
    }

    /// Reset every counter and fold the loaded population in file order.
    ///
    /// Station consumers feed `total_energy_consumed`, transport units feed
    /// `total_passengers`; the resource count and energy usage are then set
    /// from the fold. Prior counter state never leaks into the result.
    pub fn rebuild<'a>(&mut self, population: impl IntoIterator<Item = &'a CityResource>) {
        self.reset();
        let mut count = 0u64;
        for resource in population {
            count += 1;
            match &resource.kind {
                ResourceKind::Power(station) => {
                    for consumer in station.consumers() {
                        self.record_consumption(consumer.consumption());
                    }
                }
                ResourceKind::Transport(unit) => {
                    self.record_passengers(unit.current_passengers());
                }
                ResourceKind::Emergency(_) => {}
            }
        }
        self.total_resources = count;
        self.total_energy_usage = self.total_energy_consumed;
    }

    /// One-line summary for a status bar.
    pub fn status_line(&self) -> String {
        format!(
            "Resources: {} | Passengers: {} | Energy: {:.2} MW | Maintenance: ${:.2} | Emergencies: {}",
            self.total_resources,
            self.total_passengers,
            self.total_energy_usage,
            self.total_maintenance_cost,
            self.total_emergency_responses,
        )
    }
}
