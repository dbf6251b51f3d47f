//! Scheduler tests — worker passes in isolation, and the threaded engine.

use smartcity_core::{
    alert::RandomProximity,
    config::SimConfig,
    emergency_scenario_worker::EmergencyScenarioWorker,
    engine::SimEngine,
    resource::{status, ResourceKind},
    rng::{RngBank, WorkerSlot},
    sample_data::initialize_sample_data,
    status_drift_worker::StatusDriftWorker,
    traffic_worker::TrafficWorker,
    worker::SimWorker,
    City, CityState, RegistryResult,
};
use std::{
    collections::HashSet,
    sync::mpsc,
    time::{Duration, Instant},
};

fn sample_state() -> CityState {
    let mut state = CityState::new(&SimConfig::default_test());
    initialize_sample_data(&mut state).unwrap();
    state
}

fn passengers(state: &CityState) -> Vec<u32> {
    state
        .repository
        .iter()
        .filter_map(|r| match &r.kind {
            ResourceKind::Transport(unit) => Some(unit.current_passengers()),
            _ => None,
        })
        .collect()
}

#[test]
fn status_drift_sends_operational_stations_to_maintenance() {
    let config = SimConfig {
        maintenance_probability: 1.0,
        patrol_probability: 0.0,
        ..SimConfig::default_test()
    };
    let mut state = sample_state();
    let mut worker = StatusDriftWorker::new(&config, RngBank::new(7).for_slot(WorkerSlot::StatusDrift));

    assert_eq!(worker.run_once(&mut state).unwrap(), 2);
    assert_eq!(state.get("SOLAR001").unwrap().status(), status::MAINTENANCE);
    assert_eq!(state.get("NUCLEAR001").unwrap().status(), status::MAINTENANCE);
    assert_eq!(state.notifications.count_of("maintenance_required"), 2);

    // Already in maintenance: nothing left to change.
    assert_eq!(worker.run_once(&mut state).unwrap(), 0);
}

#[test]
fn status_drift_patrols_dispatch_available_services() {
    let config = SimConfig {
        maintenance_probability: 0.0,
        patrol_probability: 1.0,
        ..SimConfig::default_test()
    };
    let mut state = sample_state();
    let mut worker = StatusDriftWorker::new(&config, RngBank::new(7).for_slot(WorkerSlot::StatusDrift));

    assert_eq!(worker.run_once(&mut state).unwrap(), 2);
    assert_eq!(state.get("FIRE001").unwrap().status(), status::RESPONDING);
    assert_eq!(state.get("POLICE001").unwrap().status(), status::RESPONDING);
    assert_eq!(state.metrics.total_emergency_responses, 2);
    assert_eq!(state.get("SOLAR001").unwrap().status(), status::OPERATIONAL);
}

#[test]
fn traffic_keeps_passengers_within_capacity() {
    let config = SimConfig { traffic_swing: 500, ..SimConfig::default_test() };
    let mut state = sample_state();
    let mut worker = TrafficWorker::new(&config, RngBank::new(3).for_slot(WorkerSlot::Traffic));

    for _ in 0..50 {
        assert_eq!(worker.run_once(&mut state).unwrap(), 2);
        let counts = passengers(&state);
        assert!(counts[0] <= 50, "bus over capacity: {}", counts[0]);
        assert!(counts[1] <= 200, "train over capacity: {}", counts[1]);
    }
    assert_eq!(state.notifications.count_of("traffic_update"), 100);
}

#[test]
fn same_seed_same_traffic() {
    let config = SimConfig::default_test();
    let run = |seed: u64| {
        let mut state = sample_state();
        let mut worker = TrafficWorker::new(&config, RngBank::new(seed).for_slot(WorkerSlot::Traffic));
        let mut history = Vec::new();
        for _ in 0..20 {
            worker.run_once(&mut state).unwrap();
            history.extend(passengers(&state));
        }
        history
    };

    assert_eq!(run(42), run(42));
}

#[test]
fn outage_scenario_dispatches_both_services() {
    let config = SimConfig {
        outage_probability: 1.0,
        transport_emergency_probability: 0.0,
        ..SimConfig::default_test()
    };
    let bank = RngBank::new(11);
    let proximity = RandomProximity::new(bank.for_slot(WorkerSlot::Proximity), 1.0);
    let mut worker = EmergencyScenarioWorker::new(
        &config,
        bank.for_slot(WorkerSlot::EmergencyScenario),
        Box::new(proximity),
    );
    let mut state = sample_state();

    let hit = (0..500).any(|_| {
        worker.run_once(&mut state).unwrap();
        state.notifications.count_of("outage_scenario") > 0
    });

    assert!(hit, "no station was ever picked");
    let outages = state.repository.iter().filter(|r| r.has_status(status::OUTAGE)).count();
    assert_eq!(outages, 1);
    assert_eq!(state.get("FIRE001").unwrap().status(), status::RESPONDING);
    assert_eq!(state.get("POLICE001").unwrap().status(), status::RESPONDING);
    assert_eq!(state.metrics.total_emergency_responses, 2);
}

#[test]
fn transport_emergency_dispatches_only_the_first_service() {
    let config = SimConfig {
        outage_probability: 0.0,
        transport_emergency_probability: 1.0,
        ..SimConfig::default_test()
    };
    let bank = RngBank::new(5);
    let proximity = RandomProximity::new(bank.for_slot(WorkerSlot::Proximity), 0.5);
    let mut worker = EmergencyScenarioWorker::new(
        &config,
        bank.for_slot(WorkerSlot::EmergencyScenario),
        Box::new(proximity),
    );
    let mut state = sample_state();

    let hit = (0..500).any(|_| {
        worker.run_once(&mut state).unwrap();
        state.notifications.count_of("transport_emergency") > 0
    });

    assert!(hit, "no transport unit was ever picked");
    let emergencies = state.repository.iter().filter(|r| r.has_status(status::EMERGENCY)).count();
    assert_eq!(emergencies, 1);
    assert_eq!(state.get("FIRE001").unwrap().status(), status::RESPONDING);
    assert_eq!(state.get("POLICE001").unwrap().status(), status::AVAILABLE);
}

#[test]
fn engine_runs_all_workers_and_stops_promptly() {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = SimConfig::default_test();
    let city = City::new(&config);
    city.with(initialize_sample_data).unwrap();

    let (tx, rx) = mpsc::channel();
    let engine = SimEngine::start(city.clone(), &config, tx).unwrap();
    assert!(engine.is_running());

    let mut seen = HashSet::new();
    let deadline = Instant::now() + Duration::from_secs(5);
    while seen.len() < 3 && Instant::now() < deadline {
        if let Ok(signal) = rx.recv_timeout(Duration::from_millis(100)) {
            seen.insert(signal.worker);
        }
    }
    assert_eq!(seen, HashSet::from(["status_drift", "traffic", "emergency_scenario"]));

    let started = Instant::now();
    engine.stop();
    assert!(started.elapsed() < Duration::from_secs(1), "stop took {:?}", started.elapsed());

    city.with(|s| {
        assert!(s.notifications.count_of("traffic_update") >= 2);
        assert_eq!(s.pending_recoveries(), 0);
    });
}

#[test]
fn workers_keep_running_without_a_listener() {
    let config = SimConfig::default_test();
    let city = City::new(&config);
    city.with(initialize_sample_data).unwrap();

    let (tx, rx) = mpsc::channel();
    drop(rx);
    let engine = SimEngine::start(city.clone(), &config, tx).unwrap();
    std::thread::sleep(Duration::from_millis(120));
    engine.stop();

    assert!(city.with(|s| s.notifications.count_of("traffic_update")) >= 4);
}

/// Panics on its first pass, succeeds afterwards.
struct Flaky {
    passes: u32,
}

impl SimWorker for Flaky {
    fn name(&self) -> &'static str { "flaky" }

    fn interval(&self) -> Duration { Duration::from_millis(5) }

    fn run_once(&mut self, state: &mut CityState) -> RegistryResult<usize> {
        self.passes += 1;
        if self.passes == 1 {
            panic!("first pass blows up");
        }
        Ok(state.repository.len())
    }
}

#[test]
fn panicking_pass_is_contained_and_the_worker_keeps_running() {
    let city = City::new(&SimConfig::default_test());
    city.with(initialize_sample_data).unwrap();

    let (tx, rx) = mpsc::channel();
    let engine = SimEngine::start_with(city.clone(), vec![Box::new(Flaky { passes: 0 })], tx).unwrap();

    let mut last_pass = 0;
    let deadline = Instant::now() + Duration::from_secs(5);
    while last_pass < 3 && Instant::now() < deadline {
        if let Ok(signal) = rx.recv_timeout(Duration::from_millis(100)) {
            last_pass = signal.pass;
        }
    }
    engine.stop();

    assert!(last_pass >= 3, "worker stopped after pass {last_pass}");
    assert_eq!(city.with(|s| s.repository.len()), 6);
}
