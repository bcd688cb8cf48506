use crate::config::FlowTemperatureConfig;
use crate::core::scenario::measures::FabricState;
use crate::errors::ComputationError;
use serde::Serialize;
use strum::Display;

/// Design flow temperature (deg C) a dwelling needs, from its SAP score and envelope.
pub fn estimate_flow_temperature(
    sap_score: Option<f64>,
    fabric: &FabricState,
    config: &FlowTemperatureConfig,
) -> Result<f64, ComputationError> {
    let sap = sap_score.ok_or(ComputationError::MissingSapScore("flow temperature estimate"))?;

    let slope = (config.high_sap_flow_temperature - config.low_sap_flow_temperature)
        / (config.high_sap_anchor - config.low_sap_anchor);
    let mut flow_temperature = config.low_sap_flow_temperature + (sap - config.low_sap_anchor) * slope;

    if !fabric.walls.is_insulated() {
        flow_temperature += config.uninsulated_wall_penalty;
    }
    if fabric.glazing.is_single() {
        flow_temperature += config.single_glazing_penalty;
    }

    Ok(flow_temperature.clamp(config.min_flow_temperature, config.max_flow_temperature))
}

/// How much of the existing emitter system needs replacing for a heat pump to run at the
/// dwelling's flow temperature.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EmitterTier {
    None,
    Partial,
    Full,
}

impl EmitterTier {
    pub fn for_flow_temperature(flow_temperature: f64, config: &FlowTemperatureConfig) -> Self {
        if flow_temperature <= config.no_upgrade_max {
            EmitterTier::None
        } else if flow_temperature <= config.partial_upgrade_max {
            EmitterTier::Partial
        } else {
            EmitterTier::Full
        }
    }

    /// Share of a full emitter upgrade's cost incurred.
    pub fn cost_fraction(&self, config: &FlowTemperatureConfig) -> f64 {
        match self {
            EmitterTier::None => 0.,
            EmitterTier::Partial => config.partial_upgrade_fraction,
            EmitterTier::Full => 1.,
        }
    }
}
