//! Repository tests — ID uniqueness, ordering, live access, cumulative counters.

use smartcity_core::{
    config::SimConfig,
    resource::{status, CityResource, EmergencyService, PowerStation, PowerType, ResourceKind, ServiceType,
               TransportUnit, VehicleType},
    CityState, RegistryError,
};

fn bus(id: &str) -> CityResource {
    let unit = TransportUnit::new(VehicleType::Bus, 40, 12.0).expect("valid unit");
    CityResource::new(id, "Downtown Hub", status::ACTIVE, ResourceKind::Transport(unit)).expect("valid resource")
}

fn fresh() -> CityState {
    CityState::new(&SimConfig::default_test())
}

#[test]
fn get_after_add_returns_identical_entity() {
    let mut state = fresh();
    let original = bus("BUS001");
    state.add(original.clone()).unwrap();

    assert_eq!(state.get("BUS001"), Some(&original));
    assert!(state.get("BUS999").is_none());
}

#[test]
fn duplicate_id_is_rejected_and_original_untouched() {
    let mut state = fresh();
    state.add(bus("BUS001")).unwrap();
    let before = state.get("BUS001").cloned().unwrap();

    let station = PowerStation::new(250.0, PowerType::Nuclear).unwrap();
    let impostor =
        CityResource::new("BUS001", "Elsewhere", status::OPERATIONAL, ResourceKind::Power(station)).unwrap();
    let err = state.add(impostor).unwrap_err();

    assert!(matches!(err, RegistryError::DuplicateId { ref id } if id == "BUS001"), "got {err:?}");
    assert_eq!(state.get("BUS001"), Some(&before));
    assert_eq!(state.repository.len(), 1);
    assert_eq!(state.metrics.total_resources, 1);
}

#[test]
fn listing_preserves_insertion_order() {
    let mut state = fresh();
    for id in ["C", "A", "B"] {
        state.add(bus(id)).unwrap();
    }
    let ids: Vec<String> = state.list_all().iter().map(|r| r.id().to_string()).collect();
    assert_eq!(ids, ["C", "A", "B"]);
}

#[test]
fn list_all_is_an_independent_copy() {
    let mut state = fresh();
    state.add(bus("BUS001")).unwrap();

    let mut copy = state.list_all();
    copy[0].set_status(status::EMERGENCY);

    assert_eq!(state.get("BUS001").unwrap().status(), status::ACTIVE);
}

#[test]
fn get_mut_exposes_the_live_entity() {
    let mut state = fresh();
    state.add(bus("BUS001")).unwrap();
    let before = state.get("BUS001").unwrap().last_updated();

    state.get_mut("BUS001").unwrap().set_status(status::EMERGENCY);

    let live = state.get("BUS001").unwrap();
    assert_eq!(live.status(), status::EMERGENCY);
    assert!(live.last_updated() >= before);
}

#[test]
fn removal_does_not_decrement_counters() {
    let mut state = fresh();
    state.add(bus("BUS001")).unwrap();
    let station = PowerStation::new(500.0, PowerType::Solar).unwrap();
    state
        .add(CityResource::new("SOLAR001", "Industrial Zone", status::OPERATIONAL, ResourceKind::Power(station)).unwrap())
        .unwrap();

    assert!(state.remove("SOLAR001").is_some());
    assert!(state.remove("SOLAR001").is_none());

    assert_eq!(state.repository.len(), 1);
    assert_eq!(state.metrics.total_resources, 2);
    assert!((state.metrics.total_energy_usage - 500.0).abs() < 1e-9);
}

#[test]
fn removed_id_can_be_reused() {
    let mut state = fresh();
    state.add(bus("X1")).unwrap();
    state.remove("X1");

    let service = EmergencyService::new(ServiceType::Police, 6, 0).unwrap();
    state
        .add(CityResource::new("X1", "Precinct", status::AVAILABLE, ResourceKind::Emergency(service)).unwrap())
        .unwrap();
    assert_eq!(state.get("X1").unwrap().type_name(), "EmergencyService");
}
