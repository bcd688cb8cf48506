use crate::config::{FuelConfig, HeatNetworkConfig};
use crate::core::scenario::measures::MeasureId;
use crate::property::Fuel;
use indexmap::IndexMap;
use serde::Serialize;
use strum::Display;

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Pathway {
    HeatPump,
    HeatNetwork,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RemovalReason {
    /// The dwelling would still need too high a flow temperature after every readiness measure
    /// that could be injected.
    AshpNotEligible { flow_temperature: f64 },
}

/// How the heating technology part of a scenario resolved for one property.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PathwayOutcome {
    /// No technology change was asked for (or the property already has it).
    FabricOnly,
    Assigned { pathway: Pathway },
    /// Assigned, but only after extra fabric measures were added to make it viable.
    FabricInjected {
        pathway: Pathway,
        injected: Vec<MeasureId>,
    },
    /// The technology was dropped and the property keeps its fabric-only outcome.
    Removed { reason: RemovalReason },
}

impl PathwayOutcome {
    pub fn pathway(&self) -> Option<Pathway> {
        match self {
            PathwayOutcome::Assigned { pathway } | PathwayOutcome::FabricInjected { pathway, .. } => {
                Some(*pathway)
            }
            PathwayOutcome::FabricOnly | PathwayOutcome::Removed { .. } => None,
        }
    }

    pub fn injected(&self) -> &[MeasureId] {
        match self {
            PathwayOutcome::FabricInjected { injected, .. } => injected,
            _ => &[],
        }
    }

    pub fn fabric_inserted_for_hp(&self) -> bool {
        matches!(
            self,
            PathwayOutcome::FabricInjected {
                pathway: Pathway::HeatPump,
                ..
            }
        )
    }

    pub fn heat_pump_removed(&self) -> bool {
        matches!(self, PathwayOutcome::Removed { .. })
    }

    pub fn ashp_not_eligible(&self) -> bool {
        matches!(
            self,
            PathwayOutcome::Removed {
                reason: RemovalReason::AshpNotEligible { .. }
            }
        )
    }

    /// Short name for counting and tabular output.
    pub fn label(&self) -> &'static str {
        match self {
            PathwayOutcome::FabricOnly => "fabric_only",
            PathwayOutcome::Assigned {
                pathway: Pathway::HeatPump,
            } => "heat_pump",
            PathwayOutcome::Assigned {
                pathway: Pathway::HeatNetwork,
            } => "heat_network",
            PathwayOutcome::FabricInjected { .. } => "heat_pump_with_injected_fabric",
            PathwayOutcome::Removed { .. } => "heat_pump_removed",
        }
    }
}

/// Annual final energy use of a dwelling, by supply.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct EnergyUse {
    pub by_fuel: IndexMap<Fuel, f64>,
    pub heat_network_delivered_kwh: f64,
    /// Energy going into the network to deliver the above, after distribution losses.
    pub heat_network_input_kwh: f64,
}

impl EnergyUse {
    pub fn add(&mut self, fuel: Fuel, kwh: f64, heat_network: &HeatNetworkConfig) {
        match fuel {
            Fuel::HeatNetwork => {
                self.heat_network_delivered_kwh += kwh;
                self.heat_network_input_kwh += kwh / heat_network.distribution_efficiency;
            }
            fuel => *self.by_fuel.entry(fuel).or_default() += kwh,
        }
    }

    /// Energy bought by the household.
    pub fn total_kwh(&self) -> f64 {
        self.by_fuel.values().sum::<f64>() + self.heat_network_delivered_kwh
    }

    pub fn bill(&self, fuels: &FuelConfig, heat_network: &HeatNetworkConfig) -> f64 {
        self.by_fuel
            .iter()
            .map(|(fuel, kwh)| fuels.prices.get(*fuel).unwrap_or(0.) * kwh)
            .sum::<f64>()
            + heat_network.tariff_per_kwh * self.heat_network_delivered_kwh
    }

    pub fn emissions_kg(&self, fuels: &FuelConfig, heat_network: &HeatNetworkConfig) -> f64 {
        self.by_fuel
            .iter()
            .map(|(fuel, kwh)| fuels.carbon_factors.get(*fuel).unwrap_or(0.) * kwh)
            .sum::<f64>()
            + heat_network.carbon_intensity * self.heat_network_input_kwh
    }
}
