//! The simulation scheduler — three periodic workers over one city.
//!
//! WORKERS (one thread each, independent intervals):
//!   1. Status drift        (default every 5s)
//!   2. Traffic             (default every 7s)
//!   3. Emergency scenario  (default every 30s)
//!
//! RULES:
//!   - Each pass runs entirely under the city lock.
//!   - After each pass the worker sends a refresh signal and moves on;
//!     it never waits for the receiver.
//!   - A failed or panicking pass is logged and the loop continues on the
//!     next interval.
//!   - Stopping is cooperative: the stop token wakes sleeping workers,
//!     which exit before their next pass. No pass is interrupted.

use crate::{
    alert::RandomProximity,
    config::SimConfig,
    emergency_scenario_worker::EmergencyScenarioWorker,
    error::RegistryResult,
    rng::{RngBank, WorkerSlot},
    state::City,
    status_drift_worker::StatusDriftWorker,
    timer::CancelToken,
    traffic_worker::TrafficWorker,
    worker::SimWorker,
};
use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::mpsc::Sender,
    thread::{self, JoinHandle},
};

/// Sent after every worker pass so a view can redraw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshSignal {
    pub worker: &'static str,
    pub pass: u64,
}

pub struct SimEngine {
    city: City,
    stop: CancelToken,
    handles: Vec<JoinHandle<()>>,
}

impl SimEngine {
    /// The standard worker set, each with its own RNG stream.
    pub fn build_workers(config: &SimConfig, seed: u64) -> Vec<Box<dyn SimWorker>> {
        let bank = RngBank::new(seed);
        let proximity = RandomProximity::new(
            bank.for_slot(WorkerSlot::Proximity),
            config.proximity_fallback_chance,
        );
        vec![
            Box::new(StatusDriftWorker::new(config, bank.for_slot(WorkerSlot::StatusDrift))),
            Box::new(TrafficWorker::new(config, bank.for_slot(WorkerSlot::Traffic))),
            Box::new(EmergencyScenarioWorker::new(
                config,
                bank.for_slot(WorkerSlot::EmergencyScenario),
                Box::new(proximity),
            )),
        ]
    }

    /// Start the standard workers against `city`.
    pub fn start(city: City, config: &SimConfig, refresh: Sender<RefreshSignal>) -> RegistryResult<Self> {
        let seed = config.effective_seed();
        log::info!("Starting simulation with seed {seed}");
        Self::start_with(city, Self::build_workers(config, seed), refresh)
    }

    /// Start an arbitrary worker set, one thread per worker.
    pub fn start_with(
        city: City,
        workers: Vec<Box<dyn SimWorker>>,
        refresh: Sender<RefreshSignal>,
    ) -> RegistryResult<Self> {
        let mut engine = Self {
            city,
            stop: CancelToken::new(),
            handles: Vec::new(),
        };
        for worker in workers {
            let city = engine.city.clone();
            let stop = engine.stop.clone();
            let refresh = refresh.clone();
            // On error, dropping `engine` stops the workers already started.
            let handle = thread::Builder::new()
                .name(worker.name().to_string())
                .spawn(move || run_worker(worker, city, stop, refresh))?;
            engine.handles.push(handle);
        }
        Ok(engine)
    }

    pub fn city(&self) -> &City {
        &self.city
    }

    pub fn is_running(&self) -> bool {
        !self.stop.is_cancelled()
    }

    /// Stop all workers, wait for them, and cancel pending recoveries.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.cancel();
        for handle in self.handles.drain(..) {
            let name = handle.thread().name().unwrap_or("worker").to_string();
            if handle.join().is_err() {
                log::error!("Worker {name} panicked");
            }
        }
        self.city.lock().timers.cancel_all();
        log::info!("Simulation stopped");
    }
}

impl Drop for SimEngine {
    fn drop(&mut self) {
        if !self.handles.is_empty() {
            self.shutdown();
        }
    }
}

fn run_worker(
    mut worker: Box<dyn SimWorker>,
    city: City,
    stop: CancelToken,
    refresh: Sender<RefreshSignal>,
) {
    let name = worker.name();
    let mut pass = 0u64;
    log::debug!("Worker {name} started, interval {:?}", worker.interval());

    while !stop.is_cancelled() {
        pass += 1;
        let mut state = city.lock();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| worker.run_once(&mut state)));
        drop(state);
        match outcome {
            Ok(Ok(touched)) => log::trace!("Worker {name} pass {pass} touched {touched}"),
            Ok(Err(e)) => log::error!("Worker {name} pass {pass} failed: {e}"),
            Err(payload) => log::error!("Worker {name} pass {pass} panicked: {}", panic_message(&*payload)),
        }
        if refresh.send(RefreshSignal { worker: name, pass }).is_err() {
            log::trace!("Worker {name}: no refresh listener");
        }
        if stop.wait(worker.interval()) {
            break;
        }
    }

    log::debug!("Worker {name} exited after {pass} passes");
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
