use crate::config::ModelConfig;
use crate::core::methodology::uncertainty::Bounds;
use crate::core::scenario::epc::EpcEstimate;
use crate::core::scenario::orchestrator::{RunDiagnostics, ScenarioName, ScenarioResult};
use crate::core::spatial::Tier;
use crate::property::EpcBand;
use crate::statistics::{confidence_half_width, median, percentile};
use indexmap::IndexMap;
use itertools::Itertools;
use serde::Serialize;
use strum::IntoEnumIterator;
use tracing::warn;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Outcomes {
    pub capital_cost: f64,
    pub energy_saving_kwh: f64,
    pub bill_saving: f64,
    pub co2_saving_kg: f64,
}

impl Outcomes {
    fn per_property(&self, count: usize) -> Self {
        let n = count.max(1) as f64;

        Self {
            capital_cost: self.capital_cost / n,
            energy_saving_kwh: self.energy_saving_kwh / n,
            bill_saving: self.bill_saving / n,
            co2_saving_kg: self.co2_saving_kg / n,
        }
    }
}

/// 95% confidence half-width on the aggregate energy saving.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConfidenceInterval {
    pub mean_band_uncertainty: f64,
    pub relative_half_width: f64,
    pub half_width_kwh: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScenarioSummary {
    pub scenario: ScenarioName,
    pub properties: usize,
    pub totals: Outcomes,
    pub means: Outcomes,
    pub median_capital_cost: Option<f64>,
    /// 10th to 90th percentile of capital cost.
    pub capital_cost_spread: Option<Bounds>,
    /// Medians over properties that pay back at all.
    pub median_simple_payback_years: Option<f64>,
    pub median_discounted_payback_years: Option<f64>,
    pub never_paying_back: usize,
    pub hn_ready: usize,
    pub pathway_counts: IndexMap<&'static str, usize>,
    pub tier_counts: IndexMap<Tier, usize>,
    pub epc_before: IndexMap<EpcBand, usize>,
    pub epc_after: IndexMap<EpcBand, usize>,
    pub energy_saving_confidence: Option<ConfidenceInterval>,
    pub top_band_warning: Option<String>,
    pub diagnostics: RunDiagnostics,
}

fn finite_median(values: impl Iterator<Item = f64>) -> Option<f64> {
    median(&values.filter(|value| value.is_finite()).collect_vec())
}

fn spread(values: &[f64]) -> Option<Bounds> {
    (!values.is_empty()).then(|| Bounds {
        low: percentile(values, 10),
        high: percentile(values, 90),
    })
}

fn band_counts(bands: impl Iterator<Item = EpcBand>) -> IndexMap<EpcBand, usize> {
    let counts = bands.counts();

    EpcBand::iter()
        .map(|band| (band, counts.get(&band).copied().unwrap_or(0)))
        .collect()
}

impl ScenarioSummary {
    pub fn from_results(
        scenario: &str,
        results: &[ScenarioResult],
        diagnostics: RunDiagnostics,
        config: &ModelConfig,
    ) -> Self {
        let totals = results.iter().fold(Outcomes::default(), |totals, result| Outcomes {
            capital_cost: totals.capital_cost + result.capital_cost,
            energy_saving_kwh: totals.energy_saving_kwh + result.energy_saving_kwh(),
            bill_saving: totals.bill_saving + result.bill_saving(),
            co2_saving_kg: totals.co2_saving_kg + result.co2_saving_kg(),
        });

        let capital_costs = results.iter().map(|r| r.capital_cost).collect_vec();
        let tiers = results.iter().map(|result| result.tier).counts();
        let estimates = results.iter().filter_map(|result| result.epc).collect_vec();

        let uncertainties = results
            .iter()
            .filter_map(|result| result.demand_uncertainty)
            .collect_vec();
        let energy_saving_confidence = (!uncertainties.is_empty()).then(|| {
            let mean_band_uncertainty =
                uncertainties.iter().sum::<f64>() / uncertainties.len() as f64;
            let relative_half_width =
                confidence_half_width(mean_band_uncertainty, uncertainties.len());

            ConfidenceInterval {
                mean_band_uncertainty,
                relative_half_width,
                half_width_kwh: relative_half_width * totals.energy_saving_kwh.abs(),
            }
        });

        let top_band_warning = top_band_warning(scenario, &estimates, config);

        Self {
            scenario: scenario.into(),
            properties: results.len(),
            means: totals.per_property(results.len()),
            totals,
            median_capital_cost: median(&capital_costs),
            capital_cost_spread: spread(&capital_costs),
            median_simple_payback_years: finite_median(
                results.iter().map(|r| r.simple_payback_years),
            ),
            median_discounted_payback_years: finite_median(
                results.iter().map(|r| r.discounted_payback_years),
            ),
            never_paying_back: results
                .iter()
                .filter(|r| r.simple_payback_years.is_infinite())
                .count(),
            hn_ready: results.iter().filter(|r| r.hn_ready).count(),
            pathway_counts: results
                .iter()
                .map(|r| r.pathway.label())
                .counts()
                .into_iter()
                .sorted()
                .collect(),
            tier_counts: Tier::iter()
                .map(|tier| (tier, tiers.get(&tier).copied().unwrap_or(0)))
                .collect(),
            epc_before: band_counts(estimates.iter().map(|estimate| estimate.band_before)),
            epc_after: band_counts(estimates.iter().map(|estimate| estimate.band_after)),
            energy_saving_confidence,
            top_band_warning,
            diagnostics,
        }
    }
}

/// A warning when implausibly many properties reach band A after retrofit.
fn top_band_warning(
    scenario: &str,
    estimates: &[EpcEstimate],
    config: &ModelConfig,
) -> Option<String> {
    if estimates.is_empty() {
        return None;
    }
    let at_top = estimates
        .iter()
        .filter(|estimate| estimate.band_after == EpcBand::A)
        .count();
    let share = at_top as f64 / estimates.len() as f64;

    (share > config.epc.top_band_share_ceiling).then(|| {
        let message = format!(
            "{:.1}% of properties reach band A under '{scenario}', above the plausible ceiling of {:.1}%",
            share * 100.,
            config.epc.top_band_share_ceiling * 100.
        );
        warn!("{message}");
        message
    })
}
