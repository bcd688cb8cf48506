pub mod definition;
pub mod epc;
pub mod measures;
pub mod orchestrator;
pub mod pathway;
pub mod summary;

pub use definition::{PathwayPreference, ScenarioDefinition};
pub use orchestrator::{evaluate_property, run_chunk, ChunkOutput, RunDiagnostics, ScenarioResult};
pub use summary::ScenarioSummary;

#[cfg(test)]
pub(crate) mod tests {
    use crate::property::{EpcBand, GlazingType, HeatingType, InsulationLevel, Property};

    /// A 100 m² gas-heated band E house with nothing insulated and single glazing.
    pub(crate) fn property_fixture() -> Property {
        Property {
            id: "p1".into(),
            floor_area_m2: Some(100.),
            baseline_intensity_kwh_per_m2: Some(200.),
            epc_band: Some(EpcBand::E),
            sap_score: Some(45.),
            wall_insulation: InsulationLevel::Uninsulated,
            loft_insulation: InsulationLevel::Uninsulated,
            floor_insulation: InsulationLevel::Uninsulated,
            glazing: GlazingType::Single,
            heating: HeatingType::GasBoiler,
            x: None,
            y: None,
            anomaly: false,
            tier_number: None,
            distance_to_network_m: None,
            in_heat_zone: None,
            heat_density_gwh_km2: None,
            hn_ready: None,
        }
    }
}
