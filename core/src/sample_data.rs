//! Default population, used when no usable snapshot exists.

use crate::{
    error::RegistryResult,
    event::CityEvent,
    resource::{
        status, CityResource, Consumer, EmergencyService, PowerStation, PowerType, ResourceKind,
        ServiceType, TransportUnit, VehicleType,
    },
    state::CityState,
};
use std::path::Path;

/// What `load_or_initialize` ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupSource {
    Snapshot { count: usize },
    SampleData { reason: String },
}

fn transport(
    id: &str,
    location: &str,
    vehicle: VehicleType,
    capacity: u32,
    fuel: f64,
    passengers: i64,
) -> RegistryResult<CityResource> {
    let mut unit = TransportUnit::new(vehicle, capacity, fuel)?;
    unit.set_current_passengers(passengers);
    CityResource::new(id, location, status::ACTIVE, ResourceKind::Transport(unit))
}

fn station(
    state: &mut CityState,
    id: &str,
    location: &str,
    output: f64,
    power: PowerType,
    consumer: Consumer,
) -> RegistryResult<CityResource> {
    let mut station = PowerStation::new(output, power)?;
    station.add_consumer(consumer, &mut state.metrics);
    CityResource::new(id, location, status::OPERATIONAL, ResourceKind::Power(station))
}

fn service(id: &str, location: &str, service: ServiceType, response: u32, calls: u32) -> RegistryResult<CityResource> {
    let service = EmergencyService::new(service, response, calls)?;
    CityResource::new(id, location, status::AVAILABLE, ResourceKind::Emergency(service))
}

/// Add the six default resources: two transport units, two stations with
/// one consumer each, and two emergency services.
pub fn initialize_sample_data(state: &mut CityState) -> RegistryResult<()> {
    state.add(transport("BUS001", "Downtown Hub", VehicleType::Bus, 50, 15.5, 30)?)?;
    state.add(transport("TRAIN001", "Central Station", VehicleType::Train, 200, 25.0, 150)?)?;

    let solar = station(
        state,
        "SOLAR001",
        "Industrial Zone",
        500.0,
        PowerType::Solar,
        Consumer::new("C001", "Residential", 100.0)?,
    )?;
    state.add(solar)?;
    let nuclear = station(
        state,
        "NUCLEAR001",
        "Power District",
        1000.0,
        PowerType::Nuclear,
        Consumer::new("C002", "Commercial", 200.0)?,
    )?;
    state.add(nuclear)?;

    state.add(service("FIRE001", "Fire Station Alpha", ServiceType::Fire, 4, 10)?)?;
    state.add(service("POLICE001", "Police Precinct 1", ServiceType::Police, 6, 15)?)?;
    Ok(())
}

/// Load the snapshot at `path`, or fall back to the sample data if it is
/// missing or unreadable. The failure is reported on the notification
/// stream, not swallowed.
pub fn load_or_initialize(state: &mut CityState, path: &Path) -> RegistryResult<StartupSource> {
    match state.load_snapshot(path) {
        Ok(count) => Ok(StartupSource::Snapshot { count }),
        Err(e) => {
            let reason = e.to_string();
            log::warn!("Snapshot {} unusable: {reason}", path.display());
            state.notifications.push(CityEvent::LoadFailed {
                path: path.display().to_string(),
                reason: reason.clone(),
            });
            initialize_sample_data(state)?;
            state.notifications.push(CityEvent::SampleDataInitialized);
            Ok(StartupSource::SampleData { reason })
        }
    }
}
