//! Resource entities — the physical city assets tracked by the registry.
//!
//! A [`CityResource`] carries the shared header (id, location, status,
//! last update) and a closed [`ResourceKind`] with the variant payload.
//! Every consumer matches on the kind exhaustively.
//!
//! RULE: `status` changes only through [`CityResource::set_status`],
//! which always refreshes `last_updated`.

use crate::{
    error::{RegistryError, RegistryResult},
    metrics::AggregateMetrics,
    types::{ResourceId, Timestamp},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Well-known status strings. Status itself stays free-form.
pub mod status {
    pub const ACTIVE:      &str = "Active";
    pub const OPERATIONAL: &str = "Operational";
    pub const MAINTENANCE: &str = "Maintenance";
    pub const OUTAGE:      &str = "Outage";
    pub const AVAILABLE:   &str = "Available";
    pub const RESPONDING:  &str = "Responding";
    pub const EMERGENCY:   &str = "Emergency";
}

// ── Vocabularies ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleType {
    Bus,
    Train,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerType {
    Solar,
    Nuclear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceType {
    Police,
    Fire,
}

macro_rules! vocabulary {
    ($ty:ident, $field:literal, [$($variant:ident),+]) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant),)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = RegistryError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $(stringify!($variant) => Ok(Self::$variant),)+
                    other => Err(RegistryError::invalid($field, format!("unknown value '{other}'"))),
                }
            }
        }
    };
}

vocabulary!(VehicleType, "vehicle type", [Bus, Train]);
vocabulary!(PowerType, "power type", [Solar, Nuclear]);
vocabulary!(ServiceType, "service type", [Police, Fire]);

fn non_negative(field: &'static str, value: f64) -> RegistryResult<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(RegistryError::invalid(field, format!("expected a non-negative number, got {value}")))
    }
}

// ── Consumer ─────────────────────────────────────────────────────────────────

/// An energy consumer supplied by exactly one power station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consumer {
    consumer_id: String,
    consumer_type: String,
    consumption: f64,
}

impl Consumer {
    pub fn new(
        consumer_id: impl Into<String>,
        consumer_type: impl Into<String>,
        consumption: f64,
    ) -> RegistryResult<Self> {
        Ok(Self {
            consumer_id: consumer_id.into(),
            consumer_type: consumer_type.into(),
            consumption: non_negative("consumption", consumption)?,
        })
    }

    pub fn consumer_id(&self) -> &str   { &self.consumer_id }
    pub fn consumer_type(&self) -> &str { &self.consumer_type }
    pub fn consumption(&self) -> f64    { self.consumption }

    fn validate(&self) -> RegistryResult<()> {
        non_negative("consumption", self.consumption).map(drop)
    }
}

// ── Transport ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportUnit {
    vehicle_type: VehicleType,
    passenger_capacity: u32,
    fuel_consumption_rate: f64,
    current_passengers: u32,
}

impl TransportUnit {
    pub fn new(
        vehicle_type: VehicleType,
        passenger_capacity: u32,
        fuel_consumption_rate: f64,
    ) -> RegistryResult<Self> {
        Ok(Self {
            vehicle_type,
            passenger_capacity,
            fuel_consumption_rate: non_negative("fuel consumption rate", fuel_consumption_rate)?,
            current_passengers: 0,
        })
    }

    pub fn vehicle_type(&self) -> VehicleType     { self.vehicle_type }
    pub fn passenger_capacity(&self) -> u32       { self.passenger_capacity }
    pub fn fuel_consumption_rate(&self) -> f64    { self.fuel_consumption_rate }
    pub fn current_passengers(&self) -> u32       { self.current_passengers }

    /// Set the passenger count, clamped to `[0, passenger_capacity]`.
    pub fn set_current_passengers(&mut self, passengers: i64) {
        let clamped = passengers.clamp(0, i64::from(self.passenger_capacity));
        self.current_passengers = u32::try_from(clamped).unwrap_or(self.passenger_capacity);
    }

    /// Apply a signed traffic perturbation. Returns the new passenger count.
    pub fn adjust_for_traffic(&mut self, change: i64) -> u32 {
        self.set_current_passengers(i64::from(self.current_passengers) + change);
        self.current_passengers
    }

    fn validate(&self) -> RegistryResult<()> {
        non_negative("fuel consumption rate", self.fuel_consumption_rate)?;
        if self.current_passengers > self.passenger_capacity {
            return Err(RegistryError::invalid(
                "current passengers",
                format!("{} exceeds capacity {}", self.current_passengers, self.passenger_capacity),
            ));
        }
        Ok(())
    }

    pub fn base_maintenance_cost(&self) -> f64 {
        let base = match self.vehicle_type {
            VehicleType::Bus   => 500.0,
            VehicleType::Train => 800.0,
        };
        base + self.fuel_consumption_rate * 3.5 + f64::from(self.passenger_capacity) * 0.5
    }
}

// ── Power ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerStation {
    energy_output: f64,
    power_type: PowerType,
    alert_enabled: bool,
    consumers: Vec<Consumer>,
}

impl PowerStation {
    pub fn new(energy_output: f64, power_type: PowerType) -> RegistryResult<Self> {
        Ok(Self {
            energy_output: non_negative("energy output", energy_output)?,
            power_type,
            alert_enabled: true,
            consumers: Vec::new(),
        })
    }

    pub fn energy_output(&self) -> f64    { self.energy_output }
    pub fn power_type(&self) -> PowerType { self.power_type }
    pub fn alert_enabled(&self) -> bool   { self.alert_enabled }
    pub fn consumers(&self) -> &[Consumer] { &self.consumers }

    pub fn set_alert_enabled(&mut self, enabled: bool) {
        self.alert_enabled = enabled;
    }

    /// Attach a consumer. Its consumption is counted once, here.
    pub fn add_consumer(&mut self, consumer: Consumer, metrics: &mut AggregateMetrics) {
        metrics.record_consumption(consumer.consumption());
        self.consumers.push(consumer);
    }

    pub fn base_maintenance_cost(&self) -> f64 {
        let rate = match self.power_type {
            PowerType::Solar   => 0.05,
            PowerType::Nuclear => 0.08,
        };
        let base = self.energy_output * rate;
        let usage = base * (self.consumers.len() as f64 * 0.01);
        base + usage
    }

    fn validate(&self) -> RegistryResult<()> {
        non_negative("energy output", self.energy_output)?;
        self.consumers.iter().try_for_each(Consumer::validate)
    }
}

// ── Emergency ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyService {
    service_type: ServiceType,
    response_time: u32,
    calls_handled: u32,
    on_duty: bool,
}

impl EmergencyService {
    pub fn new(service_type: ServiceType, response_time: u32, calls_handled: u32) -> RegistryResult<Self> {
        let service = Self {
            service_type,
            response_time,
            calls_handled,
            on_duty: true,
        };
        service.validate()?;
        Ok(service)
    }

    fn validate(&self) -> RegistryResult<()> {
        if self.response_time == 0 {
            return Err(RegistryError::invalid("response time", "must be at least one minute"));
        }
        Ok(())
    }

    pub fn service_type(&self) -> ServiceType { self.service_type }
    pub fn response_time(&self) -> u32        { self.response_time }
    pub fn calls_handled(&self) -> u32        { self.calls_handled }
    pub fn on_duty(&self) -> bool             { self.on_duty }

    pub fn set_on_duty(&mut self, on_duty: bool) {
        self.on_duty = on_duty;
    }

    pub(crate) fn record_call(&mut self) {
        self.calls_handled = self.calls_handled.saturating_add(1);
    }

    pub fn base_maintenance_cost(&self) -> f64 {
        let base = match self.service_type {
            ServiceType::Fire   => 2000.0,
            ServiceType::Police => 1500.0,
        };
        base + 500.0 + f64::from(self.calls_handled) * 100.0
    }
}

// ── Resource ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum ResourceKind {
    Transport(TransportUnit),
    Power(PowerStation),
    Emergency(EmergencyService),
}

impl ResourceKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Transport(_) => "TransportUnit",
            Self::Power(_)     => "PowerStation",
            Self::Emergency(_) => "EmergencyService",
        }
    }

    fn validate(&self) -> RegistryResult<()> {
        match self {
            Self::Transport(unit)    => unit.validate(),
            Self::Power(station)     => station.validate(),
            Self::Emergency(service) => service.validate(),
        }
    }
}

/// IDs must be non-blank and free of control characters.
fn check_id(id: &str) -> RegistryResult<()> {
    if id.trim().is_empty() {
        return Err(RegistryError::invalid("resource id", "must not be empty"));
    }
    if id.chars().any(char::is_control) {
        return Err(RegistryError::invalid("resource id", "must not contain control characters"));
    }
    Ok(())
}

/// One value in a resource's display metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Count(u64),
    Amount(f64),
    Label(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityResource {
    id: ResourceId,
    pub location: String,
    status: String,
    last_updated: Timestamp,
    pub kind: ResourceKind,
}

impl CityResource {
    pub fn new(
        id: impl Into<ResourceId>,
        location: impl Into<String>,
        status: impl Into<String>,
        kind: ResourceKind,
    ) -> RegistryResult<Self> {
        let id = id.into();
        check_id(&id)?;
        Ok(Self {
            id,
            location: location.into(),
            status: status.into(),
            last_updated: Utc::now(),
            kind,
        })
    }

    pub fn id(&self) -> &str               { &self.id }
    pub fn status(&self) -> &str           { &self.status }
    pub fn last_updated(&self) -> Timestamp { self.last_updated }
    pub fn type_name(&self) -> &'static str { self.kind.type_name() }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
        self.last_updated = Utc::now();
    }

    pub fn has_status(&self, status: &str) -> bool {
        self.status == status
    }

    /// Re-check everything the constructors enforce. Used on entities that
    /// did not come through a constructor, i.e. decoded from a snapshot.
    pub fn validate(&self) -> RegistryResult<()> {
        check_id(&self.id)?;
        self.kind.validate()
    }

    pub fn as_transport_mut(&mut self) -> Option<&mut TransportUnit> {
        match &mut self.kind {
            ResourceKind::Transport(unit) => Some(unit),
            _ => None,
        }
    }

    pub fn as_power_mut(&mut self) -> Option<&mut PowerStation> {
        match &mut self.kind {
            ResourceKind::Power(station) => Some(station),
            _ => None,
        }
    }

    pub fn as_emergency(&self) -> Option<&EmergencyService> {
        match &self.kind {
            ResourceKind::Emergency(service) => Some(service),
            _ => None,
        }
    }

    /// Compute the maintenance cost and add it to the cumulative totals.
    ///
    /// NOT idempotent: each call adds to `total_maintenance_cost` again,
    /// and a transport unit also adds its current passengers to
    /// `total_passengers`. Call once per reporting pass.
    pub fn calculate_maintenance_cost(&self, metrics: &mut AggregateMetrics) -> f64 {
        let cost = match &self.kind {
            ResourceKind::Transport(unit) => {
                metrics.record_passengers(unit.current_passengers());
                unit.base_maintenance_cost()
            }
            ResourceKind::Power(station) => station.base_maintenance_cost(),
            ResourceKind::Emergency(service) => service.base_maintenance_cost(),
        };
        metrics.record_maintenance(cost);
        cost
    }

    /// Formatted snapshot of the resource. Recomputes the maintenance cost,
    /// so the cumulative side effects fire.
    pub fn usage_report(&self, metrics: &mut AggregateMetrics) -> String {
        match &self.kind {
            ResourceKind::Transport(unit) => format!(
                "Transport Report [{}]:\n- Type: {}\n- Passenger Capacity: {}\n- Current Passengers: {}\n- Fuel Consumption: {:.2} L\n- Maintenance Cost: ${:.2}",
                self.id,
                unit.vehicle_type(),
                unit.passenger_capacity(),
                unit.current_passengers(),
                unit.fuel_consumption_rate(),
                self.calculate_maintenance_cost(metrics),
            ),
            ResourceKind::Power(station) => {
                let consumed = metrics.total_energy_consumed;
                format!(
                    "Power Station Report [{}]:\n- Type: {}\n- Output: {:.2} MW\n- Consumers: {}\n- Total Consumed: {:.2} MW\n- Maintenance Cost: ${:.2}",
                    self.id,
                    station.power_type(),
                    station.energy_output(),
                    station.consumers().len(),
                    consumed,
                    self.calculate_maintenance_cost(metrics),
                )
            }
            ResourceKind::Emergency(service) => {
                let responses = metrics.total_emergency_responses;
                format!(
                    "Emergency Service Report [{}]:\n- Type: {}\n- Response Time: {} min\n- Calls Handled: {}\n- Status: {}\n- Total Responses: {}\n- Maintenance Cost: ${:.2}",
                    self.id,
                    service.service_type(),
                    service.response_time(),
                    service.calls_handled(),
                    self.status,
                    responses,
                    self.calculate_maintenance_cost(metrics),
                )
            }
        }
    }

    /// Variant-specific display facts, in a fixed order. No side effects.
    pub fn metrics(&self, totals: &AggregateMetrics) -> Vec<MetricValue> {
        match &self.kind {
            ResourceKind::Transport(unit) => vec![
                MetricValue::Count(u64::from(unit.passenger_capacity())),
                MetricValue::Amount(unit.fuel_consumption_rate()),
                MetricValue::Label(unit.vehicle_type().to_string()),
                MetricValue::Count(u64::from(unit.current_passengers())),
            ],
            ResourceKind::Power(station) => vec![
                MetricValue::Amount(station.energy_output()),
                MetricValue::Label(station.power_type().to_string()),
                MetricValue::Count(station.consumers().len() as u64),
                MetricValue::Amount(totals.total_energy_consumed),
            ],
            ResourceKind::Emergency(service) => vec![
                MetricValue::Label(service.service_type().to_string()),
                MetricValue::Count(u64::from(service.response_time())),
                MetricValue::Count(u64::from(service.calls_handled())),
            ],
        }
    }
}

impl fmt::Display for CityResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] - {} at {}", self.type_name(), self.id, self.status, self.location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_vocabulary_is_invalid_input() {
        let err = "Tram".parse::<VehicleType>().unwrap_err();
        assert!(matches!(err, RegistryError::InvalidInput { field: "vehicle type", .. }));
        assert_eq!(" Fire ".parse::<ServiceType>().unwrap(), ServiceType::Fire);
    }

    #[test]
    fn transport_cost_depends_on_vehicle_type() {
        let bus = TransportUnit::new(VehicleType::Bus, 50, 15.5).unwrap();
        let train = TransportUnit::new(VehicleType::Train, 50, 15.5).unwrap();
        assert!((bus.base_maintenance_cost() - (500.0 + 54.25 + 25.0)).abs() < 1e-9);
        assert!((train.base_maintenance_cost() - bus.base_maintenance_cost() - 300.0).abs() < 1e-9);
    }

    #[test]
    fn negative_numbers_are_rejected() {
        assert!(TransportUnit::new(VehicleType::Bus, 10, -1.0).is_err());
        assert!(PowerStation::new(f64::NAN, PowerType::Solar).is_err());
        assert!(Consumer::new("C1", "Residential", -5.0).is_err());
        assert!(EmergencyService::new(ServiceType::Police, 0, 0).is_err());
    }
}
