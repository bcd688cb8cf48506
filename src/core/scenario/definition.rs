use crate::core::scenario::measures::MeasureId;
use crate::errors::ConfigurationError;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::io::{BufReader, Read};
use strum::Display;

/// Which heating technology a scenario moves properties onto, after its fabric measures.
#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PathwayPreference {
    #[default]
    FabricOnly,
    HeatPump,
    HeatNetwork,
    /// Heat network where the property is ready for one, otherwise a heat pump if the dwelling can
    /// run one at a low enough flow temperature.
    Hybrid,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioDefinition {
    pub name: String,
    /// Fabric measures, applied in this order.
    pub measures: Vec<MeasureId>,
    #[serde(default)]
    pub pathway: PathwayPreference,
}

impl ScenarioDefinition {
    pub fn new(name: impl Into<String>, measures: Vec<MeasureId>, pathway: PathwayPreference) -> Self {
        Self {
            name: name.into(),
            measures,
            pathway,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigurationError> {
        if self.name.trim().is_empty() {
            return Err(ConfigurationError::invalid_section(
                "scenarios",
                "scenario name must not be empty",
            ));
        }
        if let Some(measure) = self.measures.iter().find(|measure| !measure.is_fabric()) {
            return Err(ConfigurationError::invalid_section(
                "scenarios",
                format!(
                    "scenario '{}' lists '{measure}', but only fabric measures may be listed; heating technologies come from the pathway",
                    self.name
                ),
            ));
        }
        if let Some(measure) = self.measures.iter().duplicates().next() {
            return Err(ConfigurationError::invalid_section(
                "scenarios",
                format!("scenario '{}' lists '{measure}' more than once", self.name),
            ));
        }

        Ok(())
    }
}

pub fn read_scenarios(json: impl Read) -> anyhow::Result<Vec<ScenarioDefinition>> {
    Ok(serde_json::from_reader(BufReader::new(json))?)
}

/// The scenarios run when none are supplied.
pub fn default_scenarios() -> Vec<ScenarioDefinition> {
    use MeasureId::*;

    vec![
        ScenarioDefinition::new(
            "fabric_light",
            vec![LoftInsulation, DraughtProofing],
            PathwayPreference::FabricOnly,
        ),
        ScenarioDefinition::new(
            "fabric_deep",
            vec![
                LoftInsulation,
                WallInsulation,
                FloorInsulation,
                Glazing,
                DraughtProofing,
            ],
            PathwayPreference::FabricOnly,
        ),
        ScenarioDefinition::new(
            "heat_pump",
            vec![LoftInsulation, WallInsulation],
            PathwayPreference::HeatPump,
        ),
        ScenarioDefinition::new(
            "heat_network",
            vec![LoftInsulation],
            PathwayPreference::HeatNetwork,
        ),
        ScenarioDefinition::new(
            "hybrid",
            vec![LoftInsulation, WallInsulation],
            PathwayPreference::Hybrid,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use serde_json::json;

    #[rstest]
    fn should_read_scenarios_with_default_pathway() {
        let json = json!([
            {"name": "loft_then_walls", "measures": ["loft_insulation", "wall_insulation"]},
            {"name": "hybrid", "measures": [], "pathway": "hybrid"}
        ]);
        let scenarios = read_scenarios(json.to_string().as_bytes()).unwrap();

        assert_eq!(
            scenarios,
            vec![
                ScenarioDefinition::new(
                    "loft_then_walls",
                    vec![MeasureId::LoftInsulation, MeasureId::WallInsulation],
                    PathwayPreference::FabricOnly
                ),
                ScenarioDefinition::new("hybrid", vec![], PathwayPreference::Hybrid),
            ]
        );
    }

    #[rstest]
    fn should_accept_default_scenarios() {
        for scenario in default_scenarios() {
            assert_eq!(scenario.validate(), Ok(()));
        }
    }

    #[rstest]
    #[case(ScenarioDefinition::new("", vec![], PathwayPreference::FabricOnly))]
    #[case(ScenarioDefinition::new(
        "technology_listed",
        vec![MeasureId::AirSourceHeatPump],
        PathwayPreference::FabricOnly
    ))]
    #[case(ScenarioDefinition::new(
        "duplicated",
        vec![MeasureId::LoftInsulation, MeasureId::Glazing, MeasureId::LoftInsulation],
        PathwayPreference::FabricOnly
    ))]
    fn should_reject_invalid_scenarios(#[case] scenario: ScenarioDefinition) {
        assert!(matches!(
            scenario.validate(),
            Err(ConfigurationError::InvalidSection {
                section: "scenarios",
                ..
            })
        ));
    }
}
