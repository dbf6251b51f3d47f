//! Smart-city resource registry: entities, repository, alert cascade and
//! the background simulation that drifts them.

pub mod alert;
pub mod command;
pub mod config;
pub mod emergency_scenario_worker;
pub mod engine;
pub mod error;
pub mod event;
pub mod metrics;
pub mod repository;
pub mod resource;
pub mod rng;
pub mod sample_data;
pub mod snapshot;
pub mod state;
pub mod status_drift_worker;
pub mod timer;
pub mod traffic_worker;
pub mod types;
pub mod worker;

pub use error::{RegistryError, RegistryResult};
pub use state::{City, CityState};
