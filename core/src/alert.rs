//! Alert cascade protocol — cross-resource notification logic.
//!
//! CASCADE (power outage):
//!   1. The station goes to `Outage` and raises its own alert
//!      (gated by `alert_enabled`), which broadcasts the outage location.
//!   2. Every `Available` emergency service the proximity policy deems
//!      nearby is dispatched. There is no cap on how many respond.
//!   3. Each dispatch schedules that service's timed return to `Available`.
//!
//! Peers are looked up through the state passed in, never through
//! ambient globals.

use crate::{
    error::{RegistryError, RegistryResult},
    event::{CityEvent, NotificationLog},
    metrics::AggregateMetrics,
    resource::{status, CityResource, ResourceKind},
    rng::WorkerRng,
    state::CityState,
    timer::RecoveryTimers,
    types::ResourceId,
};

pub const OUTAGE_MESSAGE: &str = "Power outage detected! Emergency response required.";

/// The mutable pieces of state an alert may touch, borrowed apart from
/// the repository so a pass can walk resources while alerting them.
pub struct AlertContext<'a> {
    pub metrics: &'a mut AggregateMetrics,
    pub notifications: &'a mut NotificationLog,
    pub timers: &'a mut RecoveryTimers,
}

/// Deliver an alert to a single resource. Returns whether it reacted.
///
/// - Emergency service, on duty: `Responding`, one more call handled, one
///   more city-wide response, a dispatch notification, and a recovery timer.
/// - Power station, alerts enabled: a power alert plus the city-wide
///   outage broadcast for its location.
/// - Anything else (off duty, alerts disabled, transport units): no-op.
pub fn send_emergency_alert(resource: &mut CityResource, message: &str, ctx: &mut AlertContext<'_>) -> bool {
    match &mut resource.kind {
        ResourceKind::Emergency(service) => {
            if !service.on_duty() {
                return false;
            }
            service.record_call();
            let service_type = service.service_type().to_string();
            let response_time = service.response_time();

            resource.set_status(status::RESPONDING);
            ctx.metrics.record_emergency_response();
            ctx.notifications.push(CityEvent::EmergencyDispatched {
                service_id: resource.id().to_string(),
                service_type,
                message: message.to_string(),
            });
            ctx.timers.schedule(resource.id(), response_time);
            true
        }
        ResourceKind::Power(station) => {
            if !station.alert_enabled() {
                return false;
            }
            ctx.notifications.push(CityEvent::PowerAlert {
                station_id: resource.id().to_string(),
                message: message.to_string(),
            });
            ctx.notifications.push(CityEvent::OutageBroadcast { location: resource.location.clone() });
            true
        }
        ResourceKind::Transport(_) => false,
    }
}

/// Decides whether an emergency service counts as near a station.
pub trait ProximityPolicy: Send {
    fn is_nearby(&mut self, station_location: &str, service_location: &str) -> bool;
}

/// Same location, or otherwise a coin flip with `fallback_chance`.
pub struct RandomProximity {
    rng: WorkerRng,
    fallback_chance: f64,
}

impl RandomProximity {
    pub fn new(rng: WorkerRng, fallback_chance: f64) -> Self {
        Self { rng, fallback_chance }
    }
}

impl ProximityPolicy for RandomProximity {
    fn is_nearby(&mut self, station_location: &str, service_location: &str) -> bool {
        station_location == service_location || self.rng.chance(self.fallback_chance)
    }
}

/// Deterministic substitute: only an exact location match is nearby.
pub struct SameLocationOnly;

impl ProximityPolicy for SameLocationOnly {
    fn is_nearby(&mut self, station_location: &str, service_location: &str) -> bool {
        station_location == service_location
    }
}

/// Knock a power station out and dispatch every nearby available service.
/// Returns the IDs of the services dispatched, in population order.
pub fn simulate_outage(
    state: &mut CityState,
    station_id: &str,
    proximity: &mut dyn ProximityPolicy,
) -> RegistryResult<Vec<ResourceId>> {
    let (repository, mut ctx) = state.alert_parts();

    let station = repository
        .get_mut(station_id)
        .ok_or_else(|| RegistryError::NotFound { id: station_id.to_string() })?;
    if !matches!(station.kind, ResourceKind::Power(_)) {
        return Err(RegistryError::WrongVariant {
            id: station_id.to_string(),
            expected: "PowerStation",
        });
    }
    station.set_status(status::OUTAGE);
    send_emergency_alert(station, OUTAGE_MESSAGE, &mut ctx);
    let location = station.location.clone();

    let message = format!("Respond to power outage at {location}");
    let mut dispatched = Vec::new();
    for resource in repository.iter_mut() {
        if !matches!(resource.kind, ResourceKind::Emergency(_)) || !resource.has_status(status::AVAILABLE) {
            continue;
        }
        if proximity.is_nearby(&location, &resource.location)
            && send_emergency_alert(resource, &message, &mut ctx)
        {
            dispatched.push(resource.id().to_string());
        }
    }

    log::debug!("Outage at {station_id} ({location}) dispatched {} services", dispatched.len());
    Ok(dispatched)
}

/// Dispatch the first `Available` emergency service in population order.
pub fn dispatch_first_available(state: &mut CityState, message: &str) -> Option<ResourceId> {
    let (repository, mut ctx) = state.alert_parts();

    let service = repository.iter_mut().find(|r| {
        matches!(r.kind, ResourceKind::Emergency(_)) && r.has_status(status::AVAILABLE)
    })?;
    // Only the first one is tried, even if it turns out to be off duty.
    send_emergency_alert(service, message, &mut ctx).then(|| service.id().to_string())
}
