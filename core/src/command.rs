//! Adapter-issued commands and the validation in front of them.
//!
//! RULE: A command is fully validated before it touches the state.
//! Malformed numeric input is rejected as `InvalidInput` with nothing mutated.

use crate::{
    error::{RegistryError, RegistryResult},
    event::CityEvent,
    metrics::AggregateMetrics,
    resource::{CityResource, EmergencyService, PowerStation, ResourceKind, TransportUnit},
    state::CityState,
    types::ResourceId,
};
use serde::{Deserialize, Serialize};
use std::{path::Path, str::FromStr};

fn parse_field<T>(field: &'static str, raw: &str) -> RegistryResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| RegistryError::invalid(field, format!("'{raw}': {e}")))
}

/// Raw entry-form fields for a new resource. Numbers arrive as text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDraft {
    pub id: ResourceId,
    pub location: String,
    pub status: String,
    #[serde(flatten)]
    pub form: DraftForm,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DraftForm {
    Transport {
        vehicle_type: String,
        passenger_capacity: String,
        fuel_consumption_rate: String,
    },
    Power {
        power_type: String,
        energy_output: String,
    },
    Emergency {
        service_type: String,
        response_time: String,
        calls_handled: String,
    },
}

impl ResourceDraft {
    pub fn build(&self) -> RegistryResult<CityResource> {
        let kind = match &self.form {
            DraftForm::Transport { vehicle_type, passenger_capacity, fuel_consumption_rate } => {
                ResourceKind::Transport(TransportUnit::new(
                    vehicle_type.parse()?,
                    parse_field("passenger capacity", passenger_capacity)?,
                    parse_field("fuel consumption rate", fuel_consumption_rate)?,
                )?)
            }
            DraftForm::Power { power_type, energy_output } => ResourceKind::Power(PowerStation::new(
                parse_field("energy output", energy_output)?,
                power_type.parse()?,
            )?),
            DraftForm::Emergency { service_type, response_time, calls_handled } => {
                ResourceKind::Emergency(EmergencyService::new(
                    service_type.parse()?,
                    parse_field("response time", response_time)?,
                    parse_field("calls handled", calls_handled)?,
                )?)
            }
        };
        CityResource::new(self.id.trim(), self.location.trim(), self.status.trim(), kind)
    }
}

/// Edits to an existing resource. Absent fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceUpdate {
    pub id: ResourceId,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub current_passengers: Option<String>,
}

/// All adapter-issued commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum CityCommand {
    Add { draft: ResourceDraft },
    Update { update: ResourceUpdate },
    Delete { id: ResourceId },
    Report { id: ResourceId },
    CityReport,
    Save { path: String },
    Load { path: String },
    List,
    Metrics,
}

impl CityCommand {
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Add { .. }    => "add",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
            Self::Report { .. } => "report",
            Self::CityReport    => "city_report",
            Self::Save { .. }   => "save",
            Self::Load { .. }   => "load",
            Self::List          => "list",
            Self::Metrics       => "metrics",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    Done,
    Report { text: String },
    Resources { resources: Vec<CityResource> },
    Metrics { metrics: AggregateMetrics, status_line: String },
    Loaded { count: usize },
}

impl CityState {
    /// Execute one command. Errors are returned, never swallowed.
    pub fn apply(&mut self, command: CityCommand) -> RegistryResult<CommandOutcome> {
        let verb = command.verb();
        self.execute(command).map_err(|e| {
            log::warn!("Rejected {verb} command: {e}");
            e
        })
    }

    fn execute(&mut self, command: CityCommand) -> RegistryResult<CommandOutcome> {
        let outcome = match command {
            CityCommand::Add { draft } => {
                let resource = draft.build()?;
                let summary = resource.to_string();
                self.add(resource)?;
                self.mark_dirty();
                self.notifications.push(CityEvent::ResourceAdded { summary });
                CommandOutcome::Done
            }
            CityCommand::Update { update } => {
                self.update(update)?;
                CommandOutcome::Done
            }
            CityCommand::Delete { id } => {
                self.remove(&id).ok_or_else(|| RegistryError::NotFound { id: id.clone() })?;
                self.mark_dirty();
                self.notifications.push(CityEvent::ResourceDeleted { resource_id: id });
                CommandOutcome::Done
            }
            CityCommand::Report { id } => CommandOutcome::Report { text: self.resource_report(&id)? },
            CityCommand::CityReport => CommandOutcome::Report { text: self.city_report() },
            CityCommand::Save { path } => {
                self.save_snapshot(Path::new(&path))?;
                CommandOutcome::Done
            }
            CityCommand::Load { path } => CommandOutcome::Loaded {
                count: self.load_snapshot(Path::new(&path))?,
            },
            CityCommand::List => CommandOutcome::Resources { resources: self.list_all() },
            CityCommand::Metrics => CommandOutcome::Metrics {
                status_line: self.metrics.status_line(),
                metrics: self.metrics.clone(),
            },
        };
        Ok(outcome)
    }

    fn update(&mut self, update: ResourceUpdate) -> RegistryResult<()> {
        let passengers = update
            .current_passengers
            .as_deref()
            .map(|raw| parse_field::<i64>("current passengers", raw))
            .transpose()?;

        let resource = self
            .get_mut(&update.id)
            .ok_or_else(|| RegistryError::NotFound { id: update.id.clone() })?;
        if passengers.is_some() && !matches!(resource.kind, ResourceKind::Transport(_)) {
            return Err(RegistryError::WrongVariant { id: update.id, expected: "TransportUnit" });
        }

        if let Some(location) = update.location {
            resource.location = location.trim().to_string();
        }
        if let Some(status) = update.status {
            resource.set_status(status.trim());
        }
        if let (Some(count), Some(unit)) = (passengers, resource.as_transport_mut()) {
            unit.set_current_passengers(count);
        }
        let status = resource.status().to_string();

        self.mark_dirty();
        self.notifications.push(CityEvent::ResourceUpdated { resource_id: update.id, status });
        Ok(())
    }
}
