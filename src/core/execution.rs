//! Runs scenarios over the property population on a bounded worker pool.
//!
//! Properties are split into fixed-size chunks. Each chunk is evaluated to completion on one
//! worker against a shared, read-only configuration, and the chunk outputs are stitched back
//! together in chunk order before the summary is reduced.

use crate::config::ModelConfig;
use crate::core::scenario::{
    run_chunk, ChunkOutput, RunDiagnostics, ScenarioDefinition, ScenarioResult, ScenarioSummary,
};
use crate::errors::{ConfigurationError, PathwaysError};
use crate::property::Property;
use rayon::prelude::*;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{info, instrument};

/// Everything produced by running one scenario.
#[derive(Debug)]
pub struct ScenarioRun {
    pub results: Vec<ScenarioResult>,
    pub summary: ScenarioSummary,
}

#[derive(Debug)]
pub struct ScenarioRunner {
    config: Arc<ModelConfig>,
    pool: rayon::ThreadPool,
}

impl ScenarioRunner {
    /// Validate the configuration and start the worker pool. The pool lives as long as the runner
    /// and is reused for every scenario.
    pub fn new(config: Arc<ModelConfig>) -> Result<Self, PathwaysError> {
        config.validate()?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.execution.workers)
            .thread_name(|index| format!("scenario-worker-{index}"))
            .build()
            .map_err(|e| PathwaysError::WorkerPool(e.to_string()))?;

        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    #[instrument(skip_all, fields(scenario = %scenario.name, properties = properties.len()))]
    pub fn run(
        &self,
        properties: &[Property],
        scenario: &ScenarioDefinition,
    ) -> Result<ScenarioRun, PathwaysError> {
        self.config.validate_for_scenario(scenario)?;

        let config = self.config.as_ref();
        let outputs = self.run_chunks(properties, |chunk| run_chunk(chunk, scenario, config))?;

        let mut results = Vec::with_capacity(properties.len());
        let mut diagnostics = RunDiagnostics::default();
        for output in outputs {
            diagnostics.merge(&output.diagnostics);
            results.extend(output.results);
        }

        info!(
            evaluated = diagnostics.evaluated,
            excluded = diagnostics.excluded.total(),
            fabric_injected = diagnostics.fabric_injected,
            heat_pump_removed = diagnostics.heat_pump_removed,
            adjustment_flagged = diagnostics.adjustment_flagged,
            "Scenario '{}' complete",
            scenario.name
        );

        let summary = ScenarioSummary::from_results(&scenario.name, &results, diagnostics, config);

        Ok(ScenarioRun { results, summary })
    }

    /// Evaluate every chunk on the pool, returning the outputs in chunk order. The first failing
    /// chunk fails the whole run; a panic is reported with the chunk's position and id range.
    fn run_chunks<F>(
        &self,
        properties: &[Property],
        evaluate: F,
    ) -> Result<Vec<ChunkOutput>, PathwaysError>
    where
        F: Fn(&[Property]) -> Result<ChunkOutput, ConfigurationError> + Sync,
    {
        let chunk_size = self.config.execution.chunk_size.max(1);

        self.pool.install(|| {
            properties
                .par_chunks(chunk_size)
                .enumerate()
                .map(|(chunk_index, chunk)| {
                    panic::catch_unwind(AssertUnwindSafe(|| evaluate(chunk)))
                        .map_err(|payload| PathwaysError::PanicInWorker {
                            chunk_index,
                            first_property_id: chunk
                                .first()
                                .map(|property| property.id.to_string())
                                .unwrap_or_default(),
                            last_property_id: chunk
                                .last()
                                .map(|property| property.id.to_string())
                                .unwrap_or_default(),
                            message: panic_message(payload.as_ref()),
                        })?
                        .map_err(PathwaysError::from)
                })
                .collect::<Result<Vec<_>, _>>()
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scenario::measures::MeasureId;
    use crate::core::scenario::tests::property_fixture;
    use crate::core::scenario::PathwayPreference;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn properties() -> Vec<Property> {
        (0..11)
            .map(|i| Property {
                id: format!("p{i}").into(),
                floor_area_m2: Some(60. + 10. * i as f64),
                ..property_fixture()
            })
            .collect()
    }

    #[fixture]
    fn scenario() -> ScenarioDefinition {
        ScenarioDefinition::new(
            "loft_and_walls",
            vec![MeasureId::LoftInsulation, MeasureId::WallInsulation],
            PathwayPreference::HeatPump,
        )
    }

    #[rstest]
    #[case(1, 100)]
    #[case(3, 2)]
    #[case(4, 1)]
    fn should_match_sequential_evaluation_in_order(
        properties: Vec<Property>,
        scenario: ScenarioDefinition,
        #[case] workers: usize,
        #[case] chunk_size: usize,
    ) {
        let mut config = ModelConfig::default();
        config.execution.workers = workers;
        config.execution.chunk_size = chunk_size;
        let sequential = run_chunk(&properties, &scenario, &config).unwrap();

        let runner = ScenarioRunner::new(Arc::new(config)).unwrap();
        let run = runner.run(&properties, &scenario).unwrap();

        assert_eq!(run.results, sequential.results);
        assert_eq!(run.summary.diagnostics, sequential.diagnostics);
        assert_eq!(run.summary.properties, 11);
    }

    #[rstest]
    fn should_reject_invalid_configuration_before_running() {
        let mut config = ModelConfig::default();
        config.financial.discount_rate = -1.;

        assert!(matches!(
            ScenarioRunner::new(Arc::new(config)),
            Err(PathwaysError::InvalidConfiguration(_))
        ));
    }

    #[rstest]
    fn should_reject_scenarios_missing_cost_parameters(
        properties: Vec<Property>,
        scenario: ScenarioDefinition,
    ) {
        let mut config = ModelConfig::default();
        config.measures.remove(MeasureId::AirSourceHeatPump);
        // the table as a whole is still valid, the scenario is not
        let runner = ScenarioRunner::new(Arc::new(config)).unwrap();

        assert!(matches!(
            runner.run(&properties, &scenario),
            Err(PathwaysError::InvalidConfiguration(
                ConfigurationError::MissingMeasure(MeasureId::AirSourceHeatPump)
            ))
        ));
    }

    #[rstest]
    fn should_fail_the_run_when_a_chunk_panics(properties: Vec<Property>) {
        let mut config = ModelConfig::default();
        config.execution.workers = 2;
        config.execution.chunk_size = 3;
        let runner = ScenarioRunner::new(Arc::new(config)).unwrap();

        let outcome = runner.run_chunks(&properties, |chunk| {
            if chunk.iter().any(|property| property.id.as_str() == "p5") {
                panic!("could not evaluate p5");
            }
            Ok(ChunkOutput::default())
        });

        match outcome {
            Err(PathwaysError::PanicInWorker {
                chunk_index,
                first_property_id,
                last_property_id,
                message,
            }) => {
                assert_eq!(chunk_index, 1);
                assert_eq!(first_property_id, "p3");
                assert_eq!(last_property_id, "p5");
                assert_eq!(message, "could not evaluate p5");
            }
            other => panic!("expected a worker panic, got {other:?}"),
        }
    }

    #[rstest]
    fn should_return_chunk_outputs_in_chunk_order(properties: Vec<Property>) {
        let mut config = ModelConfig::default();
        config.execution.workers = 3;
        config.execution.chunk_size = 4;
        let runner = ScenarioRunner::new(Arc::new(config)).unwrap();

        let outputs = runner
            .run_chunks(&properties, |chunk| {
                let mut output = ChunkOutput::default();
                output.diagnostics.evaluated = chunk.len();
                Ok(output)
            })
            .unwrap();

        assert_eq!(
            outputs
                .iter()
                .map(|output| output.diagnostics.evaluated)
                .collect::<Vec<_>>(),
            vec![4, 4, 3]
        );
    }

    #[rstest]
    fn should_describe_panic_payloads() {
        let payload = panic::catch_unwind(|| panic!("chunk went wrong")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "chunk went wrong");

        let payload = panic::catch_unwind(|| panic!("{} went wrong", "chunk")).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "chunk went wrong");
    }
}
