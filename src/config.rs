use crate::core::scenario::definition::{PathwayPreference, ScenarioDefinition};
use crate::core::scenario::measures::MeasureId;
use crate::core::spatial::geometry::Crs;
use crate::errors::ConfigurationError;
use crate::property::{EpcBand, Fuel};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_valid::Validate;
use std::io::{BufReader, Read};

/// Read and validate a model configuration from JSON. Any section left out takes its defaults.
pub fn ingest_config(json: impl Read) -> anyhow::Result<ModelConfig> {
    let config: ModelConfig = serde_json::from_reader(BufReader::new(json))?;
    config.validate()?;

    Ok(config)
}

/// All externally supplied technical and economic parameters for a run.
///
/// Built once, validated, and then only ever shared immutably (behind an `Arc` in the worker
/// pool).
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct ModelConfig {
    pub measures: MeasureTable,
    pub size_adjustment: SizeAdjustment,
    pub fuels: FuelConfig,
    pub demand: DemandConfig,
    pub heat_pump: HeatPumpConfig,
    pub heat_network: HeatNetworkConfig,
    pub financial: FinancialConfig,
    pub epc: EpcConfig,
    pub methodology: MethodologyConfig,
    pub spatial: SpatialConfig,
    pub execution: ExecutionConfig,
    pub plausibility: PlausibilityLimits,
}

impl ModelConfig {
    /// Check everything that does not depend on which scenarios are being run.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (measure, parameters) in self.measures.0.iter() {
            parameters.validate_for(*measure)?;
        }
        validate_section("size_adjustment", &self.size_adjustment)?;
        validate_section("fuels.prices", &self.fuels.prices)?;
        validate_section("fuels.carbon_factors", &self.fuels.carbon_factors)?;
        validate_section("demand", &self.demand)?;
        validate_section("heat_pump", &self.heat_pump)?;
        validate_section("heat_network", &self.heat_network)?;
        validate_section("financial", &self.financial)?;
        validate_section("epc", &self.epc)?;
        validate_section("spatial", &self.spatial)?;
        validate_section("execution", &self.execution)?;
        validate_section("plausibility", &self.plausibility)?;
        self.methodology.validate()?;

        if self.plausibility.min_floor_area_m2 >= self.plausibility.max_floor_area_m2 {
            return Err(ConfigurationError::invalid_section(
                "plausibility",
                "min_floor_area_m2 must be less than max_floor_area_m2",
            ));
        }
        if self.spatial.moderate_density_threshold > self.spatial.high_density_threshold {
            return Err(ConfigurationError::invalid_section(
                "spatial",
                "moderate_density_threshold must not exceed high_density_threshold",
            ));
        }
        let cells_across_radius = self.spatial.neighbourhood_radius_m / self.spatial.cell_size_m;
        if cells_across_radius > MAX_CELLS_ACROSS_NEIGHBOURHOOD_RADIUS {
            return Err(ConfigurationError::invalid_section(
                "spatial",
                format!(
                    "neighbourhood_radius_m may span at most {MAX_CELLS_ACROSS_NEIGHBOURHOOD_RADIUS} cells, got {cells_across_radius}"
                ),
            ));
        }
        if let Some(buffer_m) = self.spatial.planned_network_buffer.map(|p| p.buffer_m()) {
            if !(buffer_m.is_finite() && buffer_m >= 0.) {
                return Err(ConfigurationError::invalid_section(
                    "spatial",
                    format!("planned network buffer must be non-negative, got {buffer_m}"),
                ));
            }
        }
        if self.size_adjustment.small_floor_area_m2 > self.size_adjustment.large_floor_area_m2 {
            return Err(ConfigurationError::invalid_section(
                "size_adjustment",
                "small_floor_area_m2 must not exceed large_floor_area_m2",
            ));
        }

        Ok(())
    }

    /// Check that every measure a scenario could end up applying has cost parameters.
    pub fn validate_for_scenario(
        &self,
        scenario: &ScenarioDefinition,
    ) -> Result<(), ConfigurationError> {
        scenario.validate()?;

        let mut required = scenario.measures.clone();
        match scenario.pathway {
            PathwayPreference::FabricOnly => {}
            PathwayPreference::HeatPump => {
                required.extend([MeasureId::AirSourceHeatPump, MeasureId::EmitterUpgrade]);
            }
            PathwayPreference::HeatNetwork => required.push(MeasureId::HeatNetworkConnection),
            PathwayPreference::Hybrid => {
                required.extend([
                    MeasureId::AirSourceHeatPump,
                    MeasureId::EmitterUpgrade,
                    MeasureId::HeatNetworkConnection,
                ]);
                required.extend(self.heat_pump.readiness_fabric_package.iter().copied());
            }
        }

        for measure in required {
            self.measures.get(measure)?;
        }

        Ok(())
    }
}

fn validate_section(section: &'static str, value: &impl Validate) -> Result<(), ConfigurationError> {
    value
        .validate()
        .map_err(|errors| ConfigurationError::invalid_section(section, errors.to_string()))
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(transparent)]
pub struct MeasureTable(IndexMap<MeasureId, MeasureParameters>);

impl MeasureTable {
    pub fn get(&self, measure: MeasureId) -> Result<&MeasureParameters, ConfigurationError> {
        self.0
            .get(&measure)
            .ok_or(ConfigurationError::MissingMeasure(measure))
    }

    pub fn insert(&mut self, measure: MeasureId, parameters: MeasureParameters) {
        self.0.insert(measure, parameters);
    }

    pub fn remove(&mut self, measure: MeasureId) {
        self.0.shift_remove(&measure);
    }
}

impl Default for MeasureTable {
    fn default() -> Self {
        Self(IndexMap::from([
            (
                MeasureId::LoftInsulation,
                MeasureParameters::new(
                    CostRule::AreaScaled {
                        unit_rate: 25.,
                        area: AreaBasis::Loft,
                    },
                    0.15,
                )
                .with_bounds(Some(300.), Some(2_500.)),
            ),
            (
                MeasureId::WallInsulation,
                MeasureParameters::new(
                    CostRule::AreaScaled {
                        unit_rate: 110.,
                        area: AreaBasis::Wall,
                    },
                    0.30,
                )
                .with_bounds(Some(2_000.), Some(25_000.)),
            ),
            (
                MeasureId::FloorInsulation,
                MeasureParameters::new(
                    CostRule::AreaScaled {
                        unit_rate: 60.,
                        area: AreaBasis::Floor,
                    },
                    0.05,
                )
                .with_bounds(Some(800.), Some(8_000.)),
            ),
            (
                MeasureId::Glazing,
                MeasureParameters::new(
                    CostRule::AreaScaled {
                        unit_rate: 650.,
                        area: AreaBasis::Window,
                    },
                    0.10,
                )
                .with_bounds(Some(1_500.), Some(15_000.)),
            ),
            (
                MeasureId::DraughtProofing,
                MeasureParameters::new(CostRule::Fixed { amount: 450. }, 0.05),
            ),
            (
                MeasureId::EmitterUpgrade,
                MeasureParameters::new(
                    CostRule::CountScaled {
                        unit_rate: 450.,
                        floor_area_per_unit: 15.,
                    },
                    0.,
                )
                .with_bounds(None, Some(8_000.)),
            ),
            (
                MeasureId::AirSourceHeatPump,
                MeasureParameters::new(CostRule::Fixed { amount: 9_000. }, 0.)
                    .with_enabling_works(2_500.)
                    .with_bounds(None, Some(20_000.)),
            ),
            (
                MeasureId::HeatNetworkConnection,
                MeasureParameters::new(CostRule::Fixed { amount: 3_500. }, 0.)
                    .with_enabling_works(1_500.),
            ),
        ]))
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MeasureParameters {
    pub cost: CostRule,
    /// Fractional reduction in remaining demand, for fabric measures.
    #[serde(default)]
    pub saving_fraction: f64,
    /// Lump sum added for enabling works (installation, connection)
    #[serde(default)]
    pub enabling_works: f64,
    #[serde(default)]
    pub min_cost: Option<f64>,
    #[serde(default)]
    pub max_cost: Option<f64>,
}

impl MeasureParameters {
    pub fn new(cost: CostRule, saving_fraction: f64) -> Self {
        Self {
            cost,
            saving_fraction,
            enabling_works: 0.,
            min_cost: None,
            max_cost: None,
        }
    }

    pub fn with_bounds(mut self, min_cost: Option<f64>, max_cost: Option<f64>) -> Self {
        self.min_cost = min_cost;
        self.max_cost = max_cost;
        self
    }

    pub fn with_enabling_works(mut self, enabling_works: f64) -> Self {
        self.enabling_works = enabling_works;
        self
    }

    pub(crate) fn validate_for(&self, measure: MeasureId) -> Result<(), ConfigurationError> {
        let check = |parameter: &'static str, value: f64| {
            if value.is_finite() && value >= 0. {
                Ok(())
            } else {
                Err(ConfigurationError::InvalidMeasureParameter {
                    measure,
                    parameter,
                    value,
                })
            }
        };

        match self.cost {
            CostRule::Fixed { amount } => check("amount", amount)?,
            CostRule::AreaScaled { unit_rate, area } => {
                check("unit_rate", unit_rate)?;
                if let AreaBasis::Custom { factor } = area {
                    check("area.factor", factor)?;
                }
            }
            CostRule::CountScaled {
                unit_rate,
                floor_area_per_unit,
            } => {
                check("unit_rate", unit_rate)?;
                check("floor_area_per_unit", floor_area_per_unit)?;
                if floor_area_per_unit == 0. {
                    return Err(ConfigurationError::InvalidMeasureParameter {
                        measure,
                        parameter: "floor_area_per_unit",
                        value: floor_area_per_unit,
                    });
                }
            }
        }
        check("enabling_works", self.enabling_works)?;
        if let Some(min_cost) = self.min_cost {
            check("min_cost", min_cost)?;
        }
        if let Some(max_cost) = self.max_cost {
            check("max_cost", max_cost)?;
        }
        if let (Some(min_cost), Some(max_cost)) = (self.min_cost, self.max_cost) {
            if min_cost > max_cost {
                return Err(ConfigurationError::InvalidMeasureParameter {
                    measure,
                    parameter: "min_cost",
                    value: min_cost,
                });
            }
        }
        if !(0. ..=1.).contains(&self.saving_fraction) {
            return Err(ConfigurationError::SavingFractionOutOfRange {
                measure,
                value: self.saving_fraction,
            });
        }

        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum CostRule {
    /// A lump sum, regardless of dwelling size.
    Fixed { amount: f64 },
    /// A rate per m² of some area derived from the floor area.
    AreaScaled { unit_rate: f64, area: AreaBasis },
    /// A rate per unit, where the number of units is floor area / a fixed divisor.
    CountScaled {
        unit_rate: f64,
        floor_area_per_unit: f64,
    },
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaBasis {
    Loft,
    Wall,
    Window,
    Floor,
    Custom { factor: f64 },
}

impl AreaBasis {
    /// Multiplier from floor area to the area the measure is priced on.
    pub fn factor(&self) -> f64 {
        match self {
            AreaBasis::Loft => 0.9,
            AreaBasis::Wall => 1.5,
            AreaBasis::Window => 0.2,
            AreaBasis::Floor => 1.0,
            AreaBasis::Custom { factor } => *factor,
        }
    }
}

/// Dampens costs for dwellings far from a typical size.
#[derive(Clone, Debug, Deserialize, Serialize, Validate)]
#[serde(deny_unknown_fields, default)]
pub struct SizeAdjustment {
    #[validate(minimum = 0.)]
    pub small_floor_area_m2: f64,
    #[validate(minimum = 0.)]
    pub large_floor_area_m2: f64,
    #[validate(minimum = 0.)]
    pub small_multiplier: f64,
    #[validate(minimum = 0.)]
    pub large_multiplier: f64,
}

impl Default for SizeAdjustment {
    fn default() -> Self {
        Self {
            small_floor_area_m2: 50.,
            large_floor_area_m2: 200.,
            small_multiplier: 1.15,
            large_multiplier: 0.85,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct FuelConfig {
    /// £/kWh
    pub prices: FuelTable,
    /// kgCO₂e/kWh
    pub carbon_factors: FuelTable,
}

impl Default for FuelConfig {
    fn default() -> Self {
        Self {
            prices: FuelTable {
                mains_gas: 0.0624,
                electricity: 0.2450,
                oil: 0.0750,
                lpg: 0.1050,
                solid_fuel: 0.0650,
            },
            carbon_factors: FuelTable {
                mains_gas: 0.183,
                electricity: 0.136,
                oil: 0.247,
                lpg: 0.214,
                solid_fuel: 0.395,
            },
        }
    }
}

/// A value per fuel, with heat network supply handled separately by [`HeatNetworkConfig`].
#[derive(Clone, Debug, Deserialize, Serialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct FuelTable {
    #[validate(minimum = 0.)]
    pub mains_gas: f64,
    #[validate(minimum = 0.)]
    pub electricity: f64,
    #[validate(minimum = 0.)]
    pub oil: f64,
    #[validate(minimum = 0.)]
    pub lpg: f64,
    #[validate(minimum = 0.)]
    pub solid_fuel: f64,
}

impl FuelTable {
    /// `None` for heat networks, whose tariff and carbon intensity live in [`HeatNetworkConfig`].
    pub fn get(&self, fuel: Fuel) -> Option<f64> {
        match fuel {
            Fuel::MainsGas => Some(self.mains_gas),
            Fuel::Electricity => Some(self.electricity),
            Fuel::Oil => Some(self.oil),
            Fuel::Lpg => Some(self.lpg),
            Fuel::SolidFuel => Some(self.solid_fuel),
            Fuel::HeatNetwork => None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, Validate)]
#[serde(deny_unknown_fields, default)]
pub struct DemandConfig {
    /// Share of total demand that is space and water heating.
    #[validate(minimum = 0.)]
    #[validate(maximum = 1.)]
    pub heating_fraction: f64,
}

impl Default for DemandConfig {
    fn default() -> Self {
        Self {
            heating_fraction: 0.8,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, Validate)]
#[serde(deny_unknown_fields, default)]
pub struct HeatPumpConfig {
    /// Highest post-fabric flow temperature (deg C) at which a heat pump is considered viable.
    #[validate(minimum = 0.)]
    pub readiness_max_flow_temperature: f64,
    /// Fabric measures that may be injected, in this order, to make a heat pump viable.
    pub readiness_fabric_package: Vec<MeasureId>,
}

impl Default for HeatPumpConfig {
    fn default() -> Self {
        Self {
            readiness_max_flow_temperature: 60.,
            readiness_fabric_package: vec![
                MeasureId::WallInsulation,
                MeasureId::LoftInsulation,
                MeasureId::Glazing,
                MeasureId::FloorInsulation,
            ],
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, Validate)]
#[serde(deny_unknown_fields, default)]
pub struct HeatNetworkConfig {
    /// Delivered heat / input energy, accounting for network losses.
    #[validate(exclusive_minimum = 0.)]
    #[validate(maximum = 1.)]
    pub distribution_efficiency: f64,
    /// £/kWh of delivered heat
    #[validate(minimum = 0.)]
    pub tariff_per_kwh: f64,
    /// kgCO₂e/kWh of network input energy
    #[validate(minimum = 0.)]
    pub carbon_intensity: f64,
}

impl Default for HeatNetworkConfig {
    fn default() -> Self {
        Self {
            distribution_efficiency: 0.85,
            tariff_per_kwh: 0.105,
            carbon_intensity: 0.074,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, Validate)]
#[serde(deny_unknown_fields, default)]
pub struct FinancialConfig {
    #[validate(minimum = 0.)]
    pub discount_rate: f64,
    #[validate(minimum = 1)]
    pub horizon_years: u32,
}

impl Default for FinancialConfig {
    fn default() -> Self {
        Self {
            discount_rate: 0.035,
            horizon_years: 50,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, Validate)]
#[serde(deny_unknown_fields, default)]
pub struct EpcConfig {
    pub max_band_improvement: usize,
    /// SAP points gained as energy reduction approaches 100%.
    #[validate(minimum = 0.)]
    pub sap_gain_max_points: f64,
    #[validate(exclusive_minimum = 0.)]
    pub sap_gain_curvature: f64,
    /// Share of the population at band A above which results are flagged as implausible.
    #[validate(minimum = 0.)]
    #[validate(maximum = 1.)]
    pub top_band_share_ceiling: f64,
}

impl Default for EpcConfig {
    fn default() -> Self {
        Self {
            max_band_improvement: 2,
            sap_gain_max_points: 45.,
            sap_gain_curvature: 2.5,
            top_band_share_ceiling: 0.05,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    #[default]
    Central,
    Low,
    High,
}

/// A value per EPC band.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BandFactors {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
    pub g: f64,
}

impl BandFactors {
    pub const fn new(values: [f64; 7]) -> Self {
        let [a, b, c, d, e, f, g] = values;
        Self { a, b, c, d, e, f, g }
    }

    pub fn get(&self, band: EpcBand) -> f64 {
        match band {
            EpcBand::A => self.a,
            EpcBand::B => self.b,
            EpcBand::C => self.c,
            EpcBand::D => self.d,
            EpcBand::E => self.e,
            EpcBand::F => self.f,
            EpcBand::G => self.g,
        }
    }

    fn values(&self) -> [f64; 7] {
        [self.a, self.b, self.c, self.d, self.e, self.f, self.g]
    }

    fn check_within(
        &self,
        section: &'static str,
        range: std::ops::RangeInclusive<f64>,
    ) -> Result<(), ConfigurationError> {
        match self.values().into_iter().find(|value| !range.contains(value)) {
            Some(value) => Err(ConfigurationError::invalid_section(
                section,
                format!("band value {value} outside {range:?}"),
            )),
            None => Ok(()),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct MethodologyConfig {
    pub prebound: PreboundConfig,
    pub rebound: ReboundConfig,
    pub flow_temperature: FlowTemperatureConfig,
    pub cop: CopConfig,
    pub uncertainty: UncertaintyConfig,
}

impl MethodologyConfig {
    fn validate(&self) -> Result<(), ConfigurationError> {
        for factors in [
            &self.prebound.central,
            &self.prebound.low,
            &self.prebound.high,
        ] {
            factors.check_within("methodology.prebound", 0. ..=1.5)?;
        }
        self.rebound
            .factors
            .check_within("methodology.rebound", 0. ..=1.)?;
        self.uncertainty
            .sap_band_uncertainty
            .check_within("methodology.uncertainty", 0. ..=1.)?;
        validate_section("methodology.flow_temperature", &self.flow_temperature)?;
        validate_section("methodology.uncertainty", &self.uncertainty)?;
        self.flow_temperature.validate_ordering()?;
        self.cop.validate_curves()
    }
}

/// Corrects modelled baseline demand towards metered consumption, which is systematically lower
/// in poorly rated homes.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct PreboundConfig {
    pub enabled: bool,
    pub variant: Variant,
    pub central: BandFactors,
    pub low: BandFactors,
    pub high: BandFactors,
}

impl PreboundConfig {
    pub fn factors(&self) -> &BandFactors {
        match self.variant {
            Variant::Central => &self.central,
            Variant::Low => &self.low,
            Variant::High => &self.high,
        }
    }
}

impl Default for PreboundConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            variant: Variant::Central,
            central: BandFactors::new([1.0, 1.0, 0.95, 0.85, 0.75, 0.65, 0.55]),
            low: BandFactors::new([1.0, 1.0, 0.98, 0.92, 0.85, 0.78, 0.70]),
            high: BandFactors::new([1.0, 0.98, 0.90, 0.78, 0.67, 0.57, 0.48]),
        }
    }
}

/// Share of fabric savings actually realised, the rest being taken as extra comfort.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct ReboundConfig {
    pub enabled: bool,
    pub factors: BandFactors,
}

impl Default for ReboundConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            factors: BandFactors::new([1.0, 1.0, 0.95, 0.90, 0.80, 0.70, 0.60]),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, Validate)]
#[serde(deny_unknown_fields, default)]
pub struct FlowTemperatureConfig {
    pub low_sap_anchor: f64,
    pub low_sap_flow_temperature: f64,
    pub high_sap_anchor: f64,
    pub high_sap_flow_temperature: f64,
    #[validate(minimum = 0.)]
    pub uninsulated_wall_penalty: f64,
    #[validate(minimum = 0.)]
    pub single_glazing_penalty: f64,
    pub min_flow_temperature: f64,
    pub max_flow_temperature: f64,
    /// Flow temperatures up to this need no emitter work.
    pub no_upgrade_max: f64,
    /// Flow temperatures up to this need some radiators replaced; above it, all of them.
    pub partial_upgrade_max: f64,
    #[validate(minimum = 0.)]
    #[validate(maximum = 1.)]
    pub partial_upgrade_fraction: f64,
}

impl FlowTemperatureConfig {
    fn validate_ordering(&self) -> Result<(), ConfigurationError> {
        if self.high_sap_anchor <= self.low_sap_anchor {
            return Err(ConfigurationError::invalid_section(
                "methodology.flow_temperature",
                "high_sap_anchor must be greater than low_sap_anchor",
            ));
        }
        if self.min_flow_temperature > self.max_flow_temperature {
            return Err(ConfigurationError::invalid_section(
                "methodology.flow_temperature",
                "min_flow_temperature must not exceed max_flow_temperature",
            ));
        }
        if self.no_upgrade_max > self.partial_upgrade_max {
            return Err(ConfigurationError::invalid_section(
                "methodology.flow_temperature",
                "no_upgrade_max must not exceed partial_upgrade_max",
            ));
        }

        Ok(())
    }
}

impl Default for FlowTemperatureConfig {
    fn default() -> Self {
        Self {
            low_sap_anchor: 20.,
            low_sap_flow_temperature: 75.,
            high_sap_anchor: 80.,
            high_sap_flow_temperature: 50.,
            uninsulated_wall_penalty: 5.,
            single_glazing_penalty: 5.,
            min_flow_temperature: 45.,
            max_flow_temperature: 80.,
            no_upgrade_max: 55.,
            partial_upgrade_max: 65.,
            partial_upgrade_fraction: 0.5,
        }
    }
}

/// Piecewise-linear seasonal COP against flow temperature.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields, default)]
pub struct CopConfig {
    pub variant: Variant,
    /// deg C, strictly increasing
    pub flow_temperatures: Vec<f64>,
    pub central: Vec<f64>,
    pub low: Vec<f64>,
    pub high: Vec<f64>,
}

impl CopConfig {
    pub fn curve(&self) -> &[f64] {
        match self.variant {
            Variant::Central => &self.central,
            Variant::Low => &self.low,
            Variant::High => &self.high,
        }
    }

    fn validate_curves(&self) -> Result<(), ConfigurationError> {
        let invalid = |message: String| ConfigurationError::invalid_section("methodology.cop", message);

        if self.flow_temperatures.len() < 2 {
            return Err(invalid(
                "at least two flow temperatures are needed".to_string(),
            ));
        }
        if !self
            .flow_temperatures
            .windows(2)
            .all(|pair| pair[0] < pair[1])
        {
            return Err(invalid(
                "flow temperatures must be strictly increasing".to_string(),
            ));
        }
        for (name, curve) in [
            ("central", &self.central),
            ("low", &self.low),
            ("high", &self.high),
        ] {
            if curve.len() != self.flow_temperatures.len() {
                return Err(invalid(format!(
                    "{name} curve has {} points but there are {} flow temperatures",
                    curve.len(),
                    self.flow_temperatures.len()
                )));
            }
            if curve.iter().any(|cop| !cop.is_finite() || *cop <= 0.) {
                return Err(invalid(format!("{name} curve has a non-positive COP")));
            }
        }

        Ok(())
    }
}

impl Default for CopConfig {
    fn default() -> Self {
        Self {
            variant: Variant::Central,
            flow_temperatures: vec![35., 45., 55., 65., 75., 80.],
            central: vec![3.6, 3.2, 2.8, 2.4, 2.1, 1.95],
            low: vec![3.1, 2.8, 2.45, 2.1, 1.85, 1.7],
            high: vec![4.1, 3.6, 3.15, 2.7, 2.35, 2.2],
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, Validate)]
#[serde(deny_unknown_fields, default)]
pub struct UncertaintyConfig {
    /// Relative uncertainty of modelled demand by EPC band.
    pub sap_band_uncertainty: BandFactors,
    #[validate(minimum = 0.)]
    #[validate(maximum = 1.)]
    pub demand_fraction: f64,
    #[validate(minimum = 0.)]
    #[validate(maximum = 1.)]
    pub bill_fraction: f64,
    #[validate(minimum = 0.)]
    #[validate(maximum = 1.)]
    pub co2_fraction: f64,
    /// Widening applied to the bounds of properties flagged as anomalous.
    #[validate(minimum = 1.)]
    pub anomaly_multiplier: f64,
}

impl Default for UncertaintyConfig {
    fn default() -> Self {
        Self {
            sap_band_uncertainty: BandFactors::new([0.08, 0.08, 0.10, 0.12, 0.15, 0.20, 0.25]),
            demand_fraction: 0.20,
            bill_fraction: 0.25,
            co2_fraction: 0.25,
            anomaly_multiplier: 1.5,
        }
    }
}

/// How far a planned network is taken to reach when deciding tier 2.
///
/// There is no default: a run with planned network features must say which policy it uses.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum PlannedNetworkBuffer {
    /// A fixed radius around each planned point (or either side of a planned line).
    FixedPointBuffer { buffer_m: f64 },
    /// Treat a planned point as a line of its reported length centred on the point, buffered.
    /// Features without a reported length fall back to `buffer_m`.
    ReportedLength { buffer_m: f64 },
}

impl PlannedNetworkBuffer {
    /// Buffer either side of a planned line, whose length is already known from its geometry.
    pub fn buffer_m(&self) -> f64 {
        match self {
            PlannedNetworkBuffer::FixedPointBuffer { buffer_m }
            | PlannedNetworkBuffer::ReportedLength { buffer_m } => *buffer_m,
        }
    }

    pub fn radius_for(&self, reported_length_m: Option<f64>) -> f64 {
        match self {
            PlannedNetworkBuffer::FixedPointBuffer { buffer_m } => *buffer_m,
            PlannedNetworkBuffer::ReportedLength { buffer_m } => {
                reported_length_m
                    .filter(|length| length.is_finite() && *length > 0.)
                    .map_or(0., |length| length / 2.)
                    + buffer_m
            }
        }
    }
}

/// Limits the neighbourhood of a grid cell to (2 × 64 + 1)² offsets.
pub const MAX_CELLS_ACROSS_NEIGHBOURHOOD_RADIUS: f64 = 64.;

#[derive(Clone, Debug, Deserialize, Serialize, Validate)]
#[serde(deny_unknown_fields, default)]
pub struct SpatialConfig {
    pub crs: Crs,
    #[validate(exclusive_minimum = 0.)]
    pub cell_size_m: f64,
    #[validate(exclusive_minimum = 0.)]
    pub neighbourhood_radius_m: f64,
    #[validate(minimum = 0.)]
    pub max_network_distance_m: f64,
    /// GWh/km²
    #[validate(minimum = 0.)]
    pub high_density_threshold: f64,
    /// GWh/km²
    #[validate(minimum = 0.)]
    pub moderate_density_threshold: f64,
    pub planned_network_buffer: Option<PlannedNetworkBuffer>,
    /// Bucket size of the spatial index used for distance and containment queries.
    #[validate(exclusive_minimum = 0.)]
    pub index_bucket_size_m: f64,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            crs: Crs::Planar,
            cell_size_m: 125.,
            neighbourhood_radius_m: 250.,
            max_network_distance_m: 250.,
            high_density_threshold: 20.,
            moderate_density_threshold: 5.,
            planned_network_buffer: None,
            index_bucket_size_m: 500.,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, Validate)]
#[serde(deny_unknown_fields, default)]
pub struct ExecutionConfig {
    #[validate(minimum = 1)]
    pub workers: usize,
    #[validate(minimum = 1)]
    pub chunk_size: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            chunk_size: 50_000,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, Validate)]
#[serde(deny_unknown_fields, default)]
pub struct PlausibilityLimits {
    #[validate(exclusive_minimum = 0.)]
    pub min_floor_area_m2: f64,
    #[validate(exclusive_minimum = 0.)]
    pub max_floor_area_m2: f64,
}

impl Default for PlausibilityLimits {
    fn default() -> Self {
        Self {
            min_floor_area_m2: 10.,
            max_floor_area_m2: 1_500.,
        }
    }
}
