//! The notification stream — every human-visible thing the core reports.
//!
//! RULE: The core appends; it never reads its own stream back.
//! How (or whether) the entries are displayed is the adapter's business.

use crate::types::{clock_time, ResourceId, Timestamp};
use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficTrend {
    Increased,
    Reduced,
    Stable,
}

impl TrafficTrend {
    pub fn from_change(change: i64) -> Self {
        match change {
            c if c > 0 => Self::Increased,
            c if c < 0 => Self::Reduced,
            _ => Self::Stable,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Self::Increased => "Increased traffic",
            Self::Reduced   => "Reduced traffic",
            Self::Stable    => "Stable traffic",
        }
    }
}

/// Every event the registry reports.
/// Variants are only ever appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CityEvent {
    // ── Commands ───────────────────────────────────
    ResourceAdded {
        summary: String,
    },
    ResourceUpdated {
        resource_id: ResourceId,
        status: String,
    },
    ResourceDeleted {
        resource_id: ResourceId,
    },

    // ── Persistence ────────────────────────────────
    DataSaved {
        path: String,
    },
    SaveFailed {
        path: String,
        reason: String,
    },
    DataLoaded {
        path: String,
    },
    LoadFailed {
        path: String,
        reason: String,
    },
    SampleDataInitialized,

    // ── Alert cascade ──────────────────────────────
    PowerAlert {
        station_id: ResourceId,
        message: String,
    },
    OutageBroadcast {
        location: String,
    },
    EmergencyDispatched {
        service_id: ResourceId,
        service_type: String,
        message: String,
    },
    ResponseCompleted {
        service_id: ResourceId,
        service_type: String,
    },

    // ── Simulation ─────────────────────────────────
    MaintenanceRequired {
        station_id: ResourceId,
    },
    TrafficUpdate {
        unit_id: ResourceId,
        trend: TrafficTrend,
        passengers: u32,
    },
    OutageScenario {
        location: String,
    },
    TransportEmergency {
        unit_id: ResourceId,
        location: String,
    },
}

impl CityEvent {
    /// Stable name for the variant, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ResourceAdded { .. }       => "resource_added",
            Self::ResourceUpdated { .. }     => "resource_updated",
            Self::ResourceDeleted { .. }     => "resource_deleted",
            Self::DataSaved { .. }           => "data_saved",
            Self::SaveFailed { .. }          => "save_failed",
            Self::DataLoaded { .. }          => "data_loaded",
            Self::LoadFailed { .. }          => "load_failed",
            Self::SampleDataInitialized      => "sample_data_initialized",
            Self::PowerAlert { .. }          => "power_alert",
            Self::OutageBroadcast { .. }     => "outage_broadcast",
            Self::EmergencyDispatched { .. } => "emergency_dispatched",
            Self::ResponseCompleted { .. }   => "response_completed",
            Self::MaintenanceRequired { .. } => "maintenance_required",
            Self::TrafficUpdate { .. }       => "traffic_update",
            Self::OutageScenario { .. }      => "outage_scenario",
            Self::TransportEmergency { .. }  => "transport_emergency",
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::ResourceAdded { summary } => format!("Added new resource: {summary}"),
            Self::ResourceUpdated { resource_id, status } => {
                format!("Updated resource {resource_id} status to: {status}")
            }
            Self::ResourceDeleted { resource_id } => format!("Deleted resource: {resource_id}"),
            Self::DataSaved { path } => format!("Data saved to {path}"),
            Self::SaveFailed { path, reason } => format!("Error saving data to {path}: {reason}"),
            Self::DataLoaded { path } => format!("Data loaded successfully from {path}"),
            Self::LoadFailed { path, reason } => {
                format!("Error loading {path}: {reason}. Initializing default data")
            }
            Self::SampleDataInitialized => "Initialized default data".to_string(),
            Self::PowerAlert { station_id, message } => format!("POWER ALERT [{station_id}]: {message}"),
            Self::OutageBroadcast { location } => {
                format!("Emergency services alerted for power outage at: {location}")
            }
            Self::EmergencyDispatched { service_id, service_type, message } => {
                format!("EMERGENCY DISPATCH [{service_type} - {service_id}]: {message}")
            }
            Self::ResponseCompleted { service_id, service_type } => {
                format!("{service_type} unit {service_id} completed response")
            }
            Self::MaintenanceRequired { station_id } => {
                format!("POWER ALERT: {station_id} requires maintenance")
            }
            Self::TrafficUpdate { unit_id, trend, passengers } => {
                format!("TRAFFIC UPDATE: {unit_id} - {}, Passengers: {passengers}", trend.describe())
            }
            Self::OutageScenario { location } => format!("EMERGENCY SCENARIO: Power outage at {location}"),
            Self::TransportEmergency { unit_id, location } => {
                format!("TRANSPORT EMERGENCY: {unit_id} at {location}")
            }
        }
    }
}

/// A timestamped entry in the notification stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub seq: u64,
    pub at: Timestamp,
    pub event: CityEvent,
}

impl Notification {
    pub fn message(&self) -> String {
        format!("{} at {}", self.event.describe(), clock_time(&self.at))
    }
}

/// Append-only notification stream.
#[derive(Debug, Default)]
pub struct NotificationLog {
    entries: Vec<Notification>,
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: CityEvent) {
        let entry = Notification {
            seq: self.entries.len() as u64,
            at: Utc::now(),
            event,
        };
        log::info!("{} ({})", entry.event.describe(), entry.event.kind());
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[Notification] {
        &self.entries
    }

    /// Entries with `seq >= from`, for adapters that poll incrementally.
    pub fn since(&self, from: u64) -> &[Notification] {
        let start = usize::try_from(from).unwrap_or(usize::MAX).min(self.entries.len());
        &self.entries[start..]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count_of(&self, kind: &str) -> usize {
        self.entries.iter().filter(|n| n.event.kind() == kind).count()
    }
}
