use crate::config::{ModelConfig, PlausibilityLimits};
use crate::core::costing::cost;
use crate::core::methodology::baseline::{prebound_adjusted, realised_saving};
use crate::core::methodology::cop::{fallback_cop, seasonal_cop};
use crate::core::methodology::flow_temperature::{estimate_flow_temperature, EmitterTier};
use crate::core::methodology::uncertainty::{band_uncertainty, ResultBounds};
use crate::core::methodology::AdjustmentFlags;
use crate::core::payback::{discounted_payback, simple_payback};
use crate::core::scenario::definition::{PathwayPreference, ScenarioDefinition};
use crate::core::scenario::epc::{estimate_epc, EpcEstimate};
use crate::core::scenario::measures::{FabricState, MeasureId};
use crate::core::scenario::pathway::{EnergyUse, Pathway, PathwayOutcome, RemovalReason};
use crate::core::spatial::{Tier, TierAssignment};
use crate::errors::{ConfigurationError, DataQualityError};
use crate::property::{EpcBand, Fuel, HeatingType, Property, PropertyId};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

pub type ScenarioName = smartstring::alias::String;

/// Outcome of one scenario for one property. Never mutated once built.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScenarioResult {
    pub property_id: PropertyId,
    pub scenario: ScenarioName,
    pub tier: Tier,
    pub hn_ready: bool,
    /// Annual demand after the prebound correction (kWh)
    pub baseline_kwh: f64,
    /// Modelled remaining demand fraction after each fabric measure finally applied, starting at 1.
    pub remaining_demand_steps: Vec<f64>,
    /// Annual demand after fabric measures and rebound (kWh)
    pub demand_after_fabric_kwh: f64,
    pub energy_before: EnergyUse,
    pub energy_after: EnergyUse,
    pub bill_before: f64,
    pub bill_after: f64,
    pub co2_before_kg: f64,
    pub co2_after_kg: f64,
    pub capital_cost: f64,
    pub measures_applied: Vec<MeasureId>,
    /// Listed by the scenario but already present in the dwelling.
    pub measures_not_applicable: Vec<MeasureId>,
    /// Attempted and then taken back out (a heat pump and any fabric injected for it).
    pub measures_removed: Vec<MeasureId>,
    pub pathway: PathwayOutcome,
    /// Flow temperature a heat pump was assessed at, when one was considered.
    pub flow_temperature: Option<f64>,
    pub emitter_tier: Option<EmitterTier>,
    pub cop: Option<f64>,
    pub simple_payback_years: f64,
    pub discounted_payback_years: f64,
    pub epc: Option<EpcEstimate>,
    /// Typical relative error of the modelled demand, from the EPC band.
    pub demand_uncertainty: Option<f64>,
    pub bounds: ResultBounds,
    #[serde(skip)]
    pub flags: AdjustmentFlags,
}

impl ScenarioResult {
    pub fn remaining_demand_fraction(&self) -> f64 {
        self.remaining_demand_steps.last().copied().unwrap_or(1.)
    }

    pub fn energy_before_kwh(&self) -> f64 {
        self.energy_before.total_kwh()
    }

    pub fn energy_after_kwh(&self) -> f64 {
        self.energy_after.total_kwh()
    }

    pub fn energy_saving_kwh(&self) -> f64 {
        self.energy_before_kwh() - self.energy_after_kwh()
    }

    pub fn bill_saving(&self) -> f64 {
        self.bill_before - self.bill_after
    }

    pub fn co2_saving_kg(&self) -> f64 {
        self.co2_before_kg - self.co2_after_kg
    }
}

#[derive(Debug, Error)]
pub enum EvaluationError {
    /// The property cannot be evaluated and is left out of the results.
    #[error(transparent)]
    Excluded(#[from] DataQualityError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// Counts of properties excluded from a scenario, by reason.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ExclusionCounts {
    pub missing_floor_area: usize,
    pub implausible_floor_area: usize,
    pub missing_baseline_intensity: usize,
    pub invalid_baseline_intensity: usize,
}

impl ExclusionCounts {
    fn record(&mut self, error: &DataQualityError) {
        match error {
            DataQualityError::MissingFloorArea(_) => self.missing_floor_area += 1,
            DataQualityError::ImplausibleFloorArea { .. } => self.implausible_floor_area += 1,
            DataQualityError::MissingBaselineIntensity(_) => self.missing_baseline_intensity += 1,
            DataQualityError::InvalidBaselineIntensity { .. } => {
                self.invalid_baseline_intensity += 1
            }
        }
    }

    pub fn total(&self) -> usize {
        self.missing_floor_area
            + self.implausible_floor_area
            + self.missing_baseline_intensity
            + self.invalid_baseline_intensity
    }

    fn merge(&mut self, other: &ExclusionCounts) {
        self.missing_floor_area += other.missing_floor_area;
        self.implausible_floor_area += other.implausible_floor_area;
        self.missing_baseline_intensity += other.missing_baseline_intensity;
        self.invalid_baseline_intensity += other.invalid_baseline_intensity;
    }
}

/// Audit counts for a scenario run.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RunDiagnostics {
    pub evaluated: usize,
    pub excluded: ExclusionCounts,
    pub fabric_injected: usize,
    pub heat_pump_removed: usize,
    /// Properties where some methodological adjustment fell back to a default.
    pub adjustment_flagged: usize,
    pub tiering_missing: usize,
    pub anomalous: usize,
}

impl RunDiagnostics {
    fn record(&mut self, result: &ScenarioResult) {
        self.evaluated += 1;
        self.fabric_injected += result.pathway.fabric_inserted_for_hp() as usize;
        self.heat_pump_removed += result.pathway.heat_pump_removed() as usize;
        self.adjustment_flagged += result.flags.has_adjustment_issues() as usize;
        self.tiering_missing += result.flags.contains(AdjustmentFlags::TIERING_MISSING) as usize;
        self.anomalous += result.flags.contains(AdjustmentFlags::ANOMALY) as usize;
    }

    pub fn merge(&mut self, other: &RunDiagnostics) {
        self.evaluated += other.evaluated;
        self.excluded.merge(&other.excluded);
        self.fabric_injected += other.fabric_injected;
        self.heat_pump_removed += other.heat_pump_removed;
        self.adjustment_flagged += other.adjustment_flagged;
        self.tiering_missing += other.tiering_missing;
        self.anomalous += other.anomalous;
    }
}

#[derive(Debug, Default)]
pub struct ChunkOutput {
    pub results: Vec<ScenarioResult>,
    pub diagnostics: RunDiagnostics,
}

/// Evaluate a scenario over a run of properties. Properties with unusable inputs are counted and
/// skipped; configuration problems abort the chunk.
pub fn run_chunk(
    properties: &[Property],
    scenario: &ScenarioDefinition,
    config: &ModelConfig,
) -> Result<ChunkOutput, ConfigurationError> {
    let mut output = ChunkOutput {
        results: Vec::with_capacity(properties.len()),
        ..Default::default()
    };

    for property in properties {
        match evaluate_property(property, scenario, config) {
            Ok(result) => {
                output.diagnostics.record(&result);
                output.results.push(result);
            }
            Err(EvaluationError::Excluded(error)) => {
                debug!("Excluding from '{}': {error}", scenario.name);
                output.diagnostics.excluded.record(&error);
            }
            Err(EvaluationError::Configuration(error)) => return Err(error),
        }
    }

    Ok(output)
}

/// Fabric measures applied so far and the modelled demand they leave.
#[derive(Clone, Debug)]
struct FabricProgress {
    state: FabricState,
    applied: Vec<MeasureId>,
    remaining_steps: Vec<f64>,
}

impl FabricProgress {
    fn of(property: &Property) -> Self {
        Self {
            state: FabricState::of(property),
            applied: vec![],
            remaining_steps: vec![1.],
        }
    }

    fn remaining(&self) -> f64 {
        self.remaining_steps.last().copied().unwrap_or(1.)
    }

    /// Apply the measure if the envelope still needs it. Savings compound multiplicatively on
    /// whatever demand is left.
    fn try_apply(
        &mut self,
        measure: MeasureId,
        config: &ModelConfig,
    ) -> Result<bool, ConfigurationError> {
        if !self.state.can_apply(measure) {
            return Ok(false);
        }
        let saving_fraction = config.measures.get(measure)?.saving_fraction;

        self.remaining_steps
            .push(self.remaining() * (1. - saving_fraction));
        self.state.apply(measure);
        self.applied.push(measure);

        Ok(true)
    }
}

/// Per-property inputs that every stage needs.
struct Evaluation<'a> {
    property: &'a Property,
    config: &'a ModelConfig,
    band: Option<EpcBand>,
    baseline_kwh: f64,
    flags: AdjustmentFlags,
}

impl Evaluation<'_> {
    /// Demand left after fabric measures, once part of the saving is taken back as comfort.
    fn demand_after(&mut self, progress: &FabricProgress) -> f64 {
        let modelled_saving = self.baseline_kwh * (1. - progress.remaining());
        let realised = match realised_saving(
            modelled_saving,
            self.band,
            &self.config.methodology.rebound,
        ) {
            Ok(realised) => realised,
            Err(_) => {
                self.flags.insert(AdjustmentFlags::REBOUND_SKIPPED);
                modelled_saving
            }
        };

        self.baseline_kwh - realised
    }

    /// Flow temperature the dwelling needs once the given fabric is in place.
    fn flow_temperature(&mut self, progress: &FabricProgress) -> f64 {
        let demand_after = self.demand_after(progress);
        let reduction = if self.baseline_kwh > 0. {
            1. - demand_after / self.baseline_kwh
        } else {
            0.
        };
        let sap_after = estimate_epc(self.property.sap_score, reduction, &self.config.epc)
            .ok()
            .map(|estimate| estimate.sap_after);
        let config = &self.config.methodology.flow_temperature;

        match estimate_flow_temperature(sap_after, &progress.state, config) {
            Ok(flow_temperature) => flow_temperature,
            Err(_) => {
                self.flags
                    .insert(AdjustmentFlags::FLOW_TEMPERATURE_DEFAULTED);
                config.max_flow_temperature
            }
        }
    }

    fn cop(&mut self, flow_temperature: f64) -> f64 {
        let config = &self.config.methodology.cop;

        seasonal_cop(flow_temperature, config).unwrap_or_else(|_| {
            self.flags.insert(AdjustmentFlags::COP_DEFAULTED);
            fallback_cop(config)
        })
    }

    fn cost(&self, measure: MeasureId, floor_area_m2: f64) -> Result<f64, ConfigurationError> {
        cost(
            measure,
            floor_area_m2,
            &self.config.measures,
            &self.config.size_adjustment,
        )
    }

    fn energy_use(&self, demand_kwh: f64, pathway: Option<Pathway>, cop: Option<f64>) -> EnergyUse {
        let heat_network = &self.config.heat_network;
        let fuel = self.property.heating.fuel();
        let heating_kwh = self.config.demand.heating_fraction * demand_kwh;
        let other_kwh = demand_kwh - heating_kwh;
        let mut energy = EnergyUse::default();

        match (pathway, cop) {
            (Some(Pathway::HeatPump), Some(cop)) => {
                energy.add(Fuel::Electricity, heating_kwh / cop, heat_network);
                energy.add(fuel, other_kwh, heat_network);
            }
            (Some(Pathway::HeatNetwork), _) => {
                energy.add(Fuel::HeatNetwork, heating_kwh, heat_network);
                energy.add(fuel, other_kwh, heat_network);
            }
            _ => energy.add(fuel, demand_kwh, heat_network),
        }

        energy
    }
}

/// How the technology part of the scenario resolved, and the fabric it leaves in place.
struct Resolution {
    outcome: PathwayOutcome,
    progress: FabricProgress,
    removed: Vec<MeasureId>,
    flow_temperature: Option<f64>,
}

fn requested_pathway(preference: PathwayPreference, tiering: &TierAssignment) -> Option<Pathway> {
    match preference {
        PathwayPreference::FabricOnly => None,
        PathwayPreference::HeatPump => Some(Pathway::HeatPump),
        PathwayPreference::HeatNetwork => Some(Pathway::HeatNetwork),
        PathwayPreference::Hybrid if tiering.hn_ready => Some(Pathway::HeatNetwork),
        PathwayPreference::Hybrid => Some(Pathway::HeatPump),
    }
}

fn already_has(pathway: Pathway, heating: HeatingType) -> bool {
    matches!(
        (pathway, heating),
        (Pathway::HeatPump, HeatingType::HeatPump)
            | (Pathway::HeatNetwork, HeatingType::HeatNetwork)
    )
}

fn resolve_pathway(
    evaluation: &mut Evaluation,
    preference: PathwayPreference,
    tiering: &TierAssignment,
    mut progress: FabricProgress,
) -> Result<Resolution, ConfigurationError> {
    let pathway = requested_pathway(preference, tiering)
        .filter(|pathway| !already_has(*pathway, evaluation.property.heating));

    let Some(pathway) = pathway else {
        return Ok(Resolution {
            outcome: PathwayOutcome::FabricOnly,
            progress,
            removed: vec![],
            flow_temperature: None,
        });
    };

    if pathway == Pathway::HeatNetwork {
        return Ok(Resolution {
            outcome: PathwayOutcome::Assigned { pathway },
            progress,
            removed: vec![],
            flow_temperature: None,
        });
    }

    let mut flow_temperature = evaluation.flow_temperature(&progress);
    if preference != PathwayPreference::Hybrid {
        return Ok(Resolution {
            outcome: PathwayOutcome::Assigned { pathway },
            progress,
            removed: vec![],
            flow_temperature: Some(flow_temperature),
        });
    }

    // readiness check, injecting fabric one measure at a time until it passes
    let config = evaluation.config;
    let max_flow_temperature = config.heat_pump.readiness_max_flow_temperature;
    let before_injection = progress.clone();
    let mut injected = vec![];
    for &measure in &config.heat_pump.readiness_fabric_package {
        if flow_temperature <= max_flow_temperature {
            break;
        }
        if progress.try_apply(measure, config)? {
            injected.push(measure);
            flow_temperature = evaluation.flow_temperature(&progress);
        }
    }

    Ok(if flow_temperature <= max_flow_temperature {
        Resolution {
            outcome: if injected.is_empty() {
                PathwayOutcome::Assigned { pathway }
            } else {
                PathwayOutcome::FabricInjected { pathway, injected }
            },
            progress,
            removed: vec![],
            flow_temperature: Some(flow_temperature),
        }
    } else {
        Resolution {
            outcome: PathwayOutcome::Removed {
                reason: RemovalReason::AshpNotEligible { flow_temperature },
            },
            progress: before_injection,
            removed: std::iter::once(MeasureId::AirSourceHeatPump)
                .chain(injected)
                .collect(),
            flow_temperature: Some(flow_temperature),
        }
    })
}

fn validated_floor_area(
    property: &Property,
    limits: &PlausibilityLimits,
) -> Result<f64, DataQualityError> {
    let floor_area = property
        .floor_area_m2
        .ok_or_else(|| DataQualityError::MissingFloorArea(property.id.to_string()))?;

    if !floor_area.is_finite()
        || floor_area < limits.min_floor_area_m2
        || floor_area > limits.max_floor_area_m2
    {
        return Err(DataQualityError::ImplausibleFloorArea {
            property_id: property.id.to_string(),
            floor_area,
        });
    }

    Ok(floor_area)
}

fn validated_intensity(property: &Property) -> Result<f64, DataQualityError> {
    let intensity = property
        .baseline_intensity_kwh_per_m2
        .ok_or_else(|| DataQualityError::MissingBaselineIntensity(property.id.to_string()))?;

    if !intensity.is_finite() || intensity < 0. {
        return Err(DataQualityError::InvalidBaselineIntensity {
            property_id: property.id.to_string(),
            intensity,
        });
    }

    Ok(intensity)
}

/// Run one scenario for one property: baseline, fabric, rebound, technology pathway, cost and
/// outcomes.
pub fn evaluate_property(
    property: &Property,
    scenario: &ScenarioDefinition,
    config: &ModelConfig,
) -> Result<ScenarioResult, EvaluationError> {
    let floor_area = validated_floor_area(property, &config.plausibility)?;
    let intensity = validated_intensity(property)?;

    let mut flags = AdjustmentFlags::empty();
    if property.anomaly {
        flags.insert(AdjustmentFlags::ANOMALY);
    }
    let band = property
        .epc_band
        .or_else(|| property.sap_score.map(EpcBand::from_sap));

    let raw_kwh = floor_area * intensity;
    let baseline_kwh = prebound_adjusted(raw_kwh, band, &config.methodology.prebound)
        .unwrap_or_else(|_| {
            flags.insert(AdjustmentFlags::PREBOUND_SKIPPED);
            raw_kwh
        });

    let tiering = property.tiering().unwrap_or_else(|| {
        flags.insert(AdjustmentFlags::TIERING_MISSING);
        TierAssignment::unclassifiable()
    });

    let mut evaluation = Evaluation {
        property,
        config,
        band,
        baseline_kwh,
        flags,
    };

    let mut progress = FabricProgress::of(property);
    let mut measures_not_applicable = vec![];
    for &measure in &scenario.measures {
        if !progress.try_apply(measure, config)? {
            measures_not_applicable.push(measure);
        }
    }

    let Resolution {
        outcome,
        progress,
        removed,
        flow_temperature,
    } = resolve_pathway(&mut evaluation, scenario.pathway, &tiering, progress)?;

    let demand_after_fabric_kwh = evaluation.demand_after(&progress);

    let mut measures_applied = progress.applied.clone();
    let mut capital_cost = progress
        .applied
        .iter()
        .map(|&measure| evaluation.cost(measure, floor_area))
        .sum::<Result<f64, _>>()?;

    let (cop, emitter_tier) = match (outcome.pathway(), flow_temperature) {
        (Some(Pathway::HeatPump), Some(flow_temperature)) => {
            let emitter_tier = EmitterTier::for_flow_temperature(
                flow_temperature,
                &config.methodology.flow_temperature,
            );
            capital_cost += evaluation.cost(MeasureId::AirSourceHeatPump, floor_area)?;
            measures_applied.push(MeasureId::AirSourceHeatPump);
            if emitter_tier != EmitterTier::None {
                capital_cost += evaluation.cost(MeasureId::EmitterUpgrade, floor_area)?
                    * emitter_tier.cost_fraction(&config.methodology.flow_temperature);
                measures_applied.push(MeasureId::EmitterUpgrade);
            }
            (Some(evaluation.cop(flow_temperature)), Some(emitter_tier))
        }
        (Some(Pathway::HeatNetwork), _) => {
            capital_cost += evaluation.cost(MeasureId::HeatNetworkConnection, floor_area)?;
            measures_applied.push(MeasureId::HeatNetworkConnection);
            (None, None)
        }
        _ => (None, None),
    };

    let energy_before = evaluation.energy_use(baseline_kwh, None, None);
    let energy_after = evaluation.energy_use(demand_after_fabric_kwh, outcome.pathway(), cop);
    let bill_before = energy_before.bill(&config.fuels, &config.heat_network);
    let bill_after = energy_after.bill(&config.fuels, &config.heat_network);
    let co2_before_kg = energy_before.emissions_kg(&config.fuels, &config.heat_network);
    let co2_after_kg = energy_after.emissions_kg(&config.fuels, &config.heat_network);
    let bill_saving = bill_before - bill_after;

    let energy_reduction = if energy_before.total_kwh() > 0. {
        1. - energy_after.total_kwh() / energy_before.total_kwh()
    } else {
        0.
    };
    let epc = match estimate_epc(property.sap_score, energy_reduction, &config.epc) {
        Ok(estimate) => Some(estimate),
        Err(_) => {
            evaluation
                .flags
                .insert(AdjustmentFlags::SAP_ESTIMATE_UNAVAILABLE);
            None
        }
    };

    let flags = evaluation.flags;
    let uncertainty = &config.methodology.uncertainty;

    Ok(ScenarioResult {
        property_id: property.id.clone(),
        scenario: scenario.name.as_str().into(),
        tier: tiering.tier,
        hn_ready: tiering.hn_ready,
        baseline_kwh,
        remaining_demand_steps: progress.remaining_steps,
        demand_after_fabric_kwh,
        bounds: ResultBounds::new(
            energy_after.total_kwh(),
            bill_saving,
            co2_before_kg - co2_after_kg,
            capital_cost,
            property.anomaly,
            uncertainty,
        ),
        energy_before,
        energy_after,
        bill_before,
        bill_after,
        co2_before_kg,
        co2_after_kg,
        capital_cost,
        measures_applied,
        measures_not_applicable,
        measures_removed: removed,
        pathway: outcome,
        flow_temperature,
        emitter_tier,
        cop,
        simple_payback_years: simple_payback(capital_cost, bill_saving),
        discounted_payback_years: discounted_payback(capital_cost, bill_saving, &config.financial),
        epc,
        demand_uncertainty: band_uncertainty(band, uncertainty),
        flags,
    })
}
