mod compare_floats;
pub mod config;
pub mod core;
pub mod errors;
pub mod output;
pub mod property;
mod statistics;
#[cfg(test)]
mod tests;

pub use crate::config::{ingest_config, ModelConfig};
pub use crate::core::scenario::definition::{default_scenarios, read_scenarios};
pub use crate::core::spatial::read_spatial_inputs;
pub use crate::errors::PathwaysError;
pub use crate::property::read_properties;

use crate::core::execution::{ScenarioRun, ScenarioRunner};
use crate::core::scenario::{ScenarioDefinition, ScenarioSummary};
use crate::core::spatial::{classify_properties, ClassificationReport, SpatialInputs};
use crate::errors::ConfigurationError;
use crate::output::{write_classified_properties, write_scenario_results, write_summary, Output};
use crate::property::Property;
use itertools::Itertools;
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Debug)]
pub struct RunResults {
    pub classification: ClassificationReport,
    pub summaries: Vec<ScenarioSummary>,
}

/// Classify the properties against the spatial inputs, then run every scenario over them.
///
/// All configuration, including what each scenario needs, is checked before any property is
/// touched. Tier columns are written back onto `properties`.
#[instrument(skip_all, fields(properties = properties.len(), scenarios = scenarios.len()))]
pub fn run_scenarios(
    properties: &mut [Property],
    spatial: Option<&SpatialInputs>,
    scenarios: &[ScenarioDefinition],
    config: Arc<ModelConfig>,
    output: impl Output,
) -> Result<RunResults, PathwaysError> {
    let runner = ScenarioRunner::new(config)?;
    for scenario in scenarios {
        runner.config().validate_for_scenario(scenario)?;
    }
    if let Some(name) = scenarios.iter().map(|s| s.name.as_str()).duplicates().next() {
        return Err(ConfigurationError::invalid_section(
            "scenarios",
            format!("more than one scenario is named '{name}'"),
        )
        .into());
    }

    let classification = classify_properties(properties, spatial, &runner.config().spatial)?;
    write_classified_properties(&output, properties).map_err(PathwaysError::Output)?;

    let mut summaries = Vec::with_capacity(scenarios.len());
    for scenario in scenarios {
        let ScenarioRun { results, summary } = runner.run(properties, scenario)?;
        write_scenario_results(&output, &scenario.name, &results)
            .map_err(PathwaysError::Output)?;
        summaries.push(summary);
    }

    write_summary(&output, &classification, &summaries).map_err(PathwaysError::Output)?;
    info!("Ran {} scenarios", summaries.len());

    Ok(RunResults {
        classification,
        summaries,
    })
}
