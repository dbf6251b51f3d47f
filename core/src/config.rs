use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Runtime tuning for the simulation. Every field has a default, so a
/// config file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub status_drift_interval_ms: u64,
    pub traffic_interval_ms: u64,
    pub scenario_interval_ms: u64,

    /// Per pass, per `Operational` station.
    pub maintenance_probability: f64,
    /// Per pass, per `Available` emergency service.
    pub patrol_probability: f64,
    /// Passenger perturbation is drawn from `[-swing, swing]`.
    pub traffic_swing: u32,
    pub outage_probability: f64,
    pub transport_emergency_probability: f64,
    /// Chance a service at another location still counts as nearby.
    pub proximity_fallback_chance: f64,

    /// Milliseconds of recovery delay per minute of response time.
    pub response_time_unit_ms: u64,

    pub snapshot_path: String,
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            status_drift_interval_ms: 5_000,
            traffic_interval_ms: 7_000,
            scenario_interval_ms: 30_000,
            maintenance_probability: 0.05,
            patrol_probability: 0.08,
            traffic_swing: 5,
            outage_probability: 0.3,
            transport_emergency_probability: 0.2,
            proximity_fallback_chance: 0.5,
            response_time_unit_ms: 100,
            snapshot_path: "city_resources.json".to_string(),
            seed: None,
        }
    }
}

impl SimConfig {
    /// Load from a JSON file.
    /// In tests, use SimConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: SimConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Short intervals and a fixed seed, for tests.
    pub fn default_test() -> Self {
        Self {
            status_drift_interval_ms: 20,
            traffic_interval_ms: 25,
            scenario_interval_ms: 40,
            response_time_unit_ms: 5,
            snapshot_path: "test_city_resources.json".to_string(),
            seed: Some(42),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let probabilities = [
            ("maintenance_probability", self.maintenance_probability),
            ("patrol_probability", self.patrol_probability),
            ("outage_probability", self.outage_probability),
            ("transport_emergency_probability", self.transport_emergency_probability),
            ("proximity_fallback_chance", self.proximity_fallback_chance),
        ];
        for (name, p) in probabilities {
            if !(0.0..=1.0).contains(&p) {
                anyhow::bail!("{name} must be within [0, 1], got {p}");
            }
        }
        if self.status_drift_interval_ms == 0 || self.traffic_interval_ms == 0 || self.scenario_interval_ms == 0 {
            anyhow::bail!("worker intervals must be non-zero");
        }
        Ok(())
    }

    pub fn response_time_unit(&self) -> Duration {
        Duration::from_millis(self.response_time_unit_ms)
    }

    /// The configured seed, or one derived from the wall clock.
    pub fn effective_seed(&self) -> u64 {
        self.seed.unwrap_or_else(|| {
            let now = chrono::Utc::now();
            let seed = now.timestamp_nanos_opt().unwrap_or_else(|| now.timestamp()) as u64;
            log::info!("No seed configured, using {seed}");
            seed
        })
    }
}
