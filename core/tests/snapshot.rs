//! Snapshot tests — round-trip fidelity and deterministic metric rebuild.

use smartcity_core::{
    config::SimConfig,
    resource::{status, CityResource, ResourceKind, TransportUnit, VehicleType},
    sample_data::{initialize_sample_data, load_or_initialize, StartupSource},
    CityState, RegistryError,
};
use std::fs;

fn sample_state() -> CityState {
    let mut state = CityState::new(&SimConfig::default_test());
    initialize_sample_data(&mut state).expect("sample data");
    state
}

#[test]
fn round_trip_restores_every_field() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("city.json");

    let mut original = sample_state();
    original.get_mut("BUS001").unwrap().set_status(status::EMERGENCY);
    original.save_snapshot(&path).unwrap();

    let mut restored = CityState::new(&SimConfig::default_test());
    let count = restored.load_snapshot(&path).unwrap();

    assert_eq!(count, 6);
    assert_eq!(restored.list_all(), original.list_all());
}

#[test]
fn load_rebuilds_metrics_regardless_of_prior_counters() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("city.json");

    let mut saved = sample_state();
    saved.city_report();
    saved.send_emergency_alert("FIRE001", "drill").unwrap();
    saved.save_snapshot(&path).unwrap();

    // A process that has been busy: different population, inflated counters.
    let mut busy = CityState::new(&SimConfig::default_test());
    let unit = TransportUnit::new(VehicleType::Train, 300, 40.0).unwrap();
    busy.add(CityResource::new("OLD1", "Depot", status::ACTIVE, ResourceKind::Transport(unit)).unwrap())
        .unwrap();
    busy.city_report();
    busy.city_report();
    busy.load_snapshot(&path).unwrap();

    // Fold: consumers 100 + 200, passengers 30 + 150, six resources.
    let m = &busy.metrics;
    assert_eq!(m.total_resources, 6);
    assert_eq!(m.total_passengers, 180);
    assert!((m.total_energy_consumed - 300.0).abs() < 1e-9);
    assert!((m.total_energy_usage - 300.0).abs() < 1e-9);
    assert_eq!(m.total_maintenance_cost, 0.0);
    assert_eq!(m.total_emergency_responses, 0);
    assert!(busy.get("OLD1").is_none());

    let mut again = CityState::new(&SimConfig::default_test());
    again.load_snapshot(&path).unwrap();
    assert_eq!(again.metrics, busy.metrics);
}

#[test]
fn missing_snapshot_is_not_found_and_state_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let mut state = sample_state();
    let before = state.list_all();
    let metrics_before = state.metrics.clone();

    let err = state.load_snapshot(&dir.path().join("absent.json")).unwrap_err();

    assert!(matches!(err, RegistryError::SnapshotNotFound { .. }), "got {err:?}");
    assert_eq!(state.list_all(), before);
    assert_eq!(state.metrics, metrics_before);
}

#[test]
fn corrupt_snapshot_is_a_deserialization_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("city.json");
    fs::write(&path, "{ this is not a snapshot").unwrap();

    let mut state = sample_state();
    let err = state.load_snapshot(&path).unwrap_err();

    assert!(matches!(err, RegistryError::Deserialization(_)), "got {err:?}");
    assert_eq!(state.repository.len(), 6);
}

#[test]
fn unknown_version_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("city.json");
    fs::write(&path, r#"{"version": 99, "saved_at": "2024-01-01T00:00:00Z", "resources": []}"#).unwrap();

    let err = CityState::new(&SimConfig::default_test()).load_snapshot(&path).unwrap_err();
    assert!(matches!(err, RegistryError::Deserialization(_)), "got {err:?}");
}

#[test]
fn failed_save_is_an_io_error_and_keeps_state() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("no_such_dir").join("city.json");

    let mut state = sample_state();
    let err = state.save_snapshot(&path).unwrap_err();

    assert!(matches!(err, RegistryError::Io(_)), "got {err:?}");
    assert_eq!(state.repository.len(), 6);
    assert_eq!(state.notifications.count_of("save_failed"), 1);
}

#[test]
fn startup_falls_back_to_sample_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("city.json");

    let mut state = CityState::new(&SimConfig::default_test());
    let source = load_or_initialize(&mut state, &path).unwrap();

    assert!(matches!(source, StartupSource::SampleData { .. }));
    assert_eq!(state.repository.len(), 6);
    assert_eq!(state.notifications.count_of("load_failed"), 1);

    state.save_snapshot(&path).unwrap();
    let mut next = CityState::new(&SimConfig::default_test());
    assert_eq!(load_or_initialize(&mut next, &path).unwrap(), StartupSource::Snapshot { count: 6 });
}

#[test]
fn snapshot_entities_must_satisfy_constructor_rules() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("city.json");
    sample_state().save_snapshot(&path).unwrap();
    let valid: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();

    let breakages: [(&str, serde_json::Value); 6] = [
        ("/resources/0/kind/current_passengers", 500.into()),
        ("/resources/0/kind/fuel_consumption_rate", (-50.0).into()),
        ("/resources/2/kind/consumers/0/consumption", (-1.0).into()),
        ("/resources/4/kind/response_time", 0.into()),
        ("/resources/5/id", "".into()),
        ("/resources/5/id", "POLICE\u{0}1".into()),
    ];

    for (pointer, bad) in breakages {
        let mut doc = valid.clone();
        *doc.pointer_mut(pointer).unwrap() = bad;
        fs::write(&path, serde_json::to_string(&doc).unwrap()).unwrap();

        let mut state = sample_state();
        let before = state.list_all();
        let metrics_before = state.metrics.clone();

        let err = state.load_snapshot(&path).unwrap_err();

        assert!(matches!(err, RegistryError::Deserialization(_)), "{pointer}: got {err:?}");
        assert_eq!(state.list_all(), before, "{pointer}");
        assert_eq!(state.metrics, metrics_before, "{pointer}");
    }
}
