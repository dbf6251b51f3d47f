//! Worker trait.
//!
//! RULE: Every periodic simulation process implements SimWorker.
//! The engine runs each worker on its own thread, calling run_once()
//! under the state lock, then sleeping for interval().

use crate::{error::RegistryResult, state::CityState};
use std::time::Duration;

/// The contract every worker must fulfill.
pub trait SimWorker: Send {
    /// Unique stable name, also used for the thread name.
    fn name(&self) -> &'static str;

    /// Pause between passes.
    fn interval(&self) -> Duration;

    /// One pass over the city. Notifications go straight into
    /// `state.notifications`. Returns how many resources were touched.
    fn run_once(&mut self, state: &mut CityState) -> RegistryResult<usize>;
}
