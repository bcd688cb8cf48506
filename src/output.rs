use crate::core::methodology::uncertainty::Bounds;
use crate::core::scenario::{ScenarioResult, ScenarioSummary};
use crate::core::spatial::ClassificationReport;
use crate::property::{EpcBand, Property};
use anyhow::anyhow;
use csv::WriterBuilder;
use formatx::formatx;
use itertools::Itertools;
use serde::Serialize;
use std::fmt::Debug;
use std::fs::File;
use std::io;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

pub trait Output: Debug {
    fn writer_for_location_key(
        &self,
        location_key: &str,
        file_extension: &str,
    ) -> anyhow::Result<impl Write>;
    /// Whether this output can be considered a no-op and therefore that any code that only writes to the output can be skipped.
    fn is_noop(&self) -> bool {
        false
    }
}

#[derive(Debug)]
pub struct FileOutput {
    directory_path: PathBuf,
    file_template: String,
}

impl FileOutput {
    /// `file_template` takes two placeholders: the location key and the file extension.
    pub fn new(directory_path: PathBuf, file_template: String) -> Self {
        Self {
            directory_path,
            file_template,
        }
    }
}

impl Output for FileOutput {
    fn writer_for_location_key(
        &self,
        location_key: &str,
        file_extension: &str,
    ) -> anyhow::Result<impl Write> {
        let file_name = formatx!(&self.file_template, location_key, file_extension)
            .map_err(|e| anyhow!("Output file template could not be filled: {e:?}"))?;

        Ok(BufWriter::new(File::create(
            self.directory_path.join(file_name),
        )?))
    }
}

impl Output for &FileOutput {
    fn writer_for_location_key(
        &self,
        location_key: &str,
        file_extension: &str,
    ) -> anyhow::Result<impl Write> {
        <FileOutput as Output>::writer_for_location_key(self, location_key, file_extension)
    }
}

/// An output that goes to nowhere/ a "sink"/ /dev/null.
#[derive(Debug, Default)]
pub struct SinkOutput;

impl Output for SinkOutput {
    fn writer_for_location_key(
        &self,
        _location_key: &str,
        _file_extension: &str,
    ) -> anyhow::Result<impl Write> {
        Ok(io::sink())
    }

    fn is_noop(&self) -> bool {
        true
    }
}

/// Properties with their tier columns, one row each.
pub fn write_classified_properties(
    output: &impl Output,
    properties: &[Property],
) -> anyhow::Result<()> {
    if output.is_noop() {
        return Ok(());
    }
    let writer = output.writer_for_location_key("properties", "csv")?;
    let mut writer = WriterBuilder::new().from_writer(writer);

    for property in properties {
        writer.serialize(property)?;
    }
    writer.flush()?;

    Ok(())
}

/// Flat form of a scenario result for tabular output.
#[derive(Debug, Serialize)]
struct ResultRow<'a> {
    property_id: &'a str,
    scenario: &'a str,
    tier: u8,
    hn_ready: bool,
    pathway: &'static str,
    measures_applied: String,
    measures_not_applicable: String,
    measures_removed: String,
    baseline_kwh: f64,
    energy_before_kwh: f64,
    energy_after_kwh: f64,
    energy_saving_kwh: f64,
    bill_before: f64,
    bill_after: f64,
    co2_before_kg: f64,
    co2_after_kg: f64,
    capital_cost: f64,
    simple_payback_years: f64,
    discounted_payback_years: f64,
    flow_temperature: Option<f64>,
    emitter_tier: Option<String>,
    cop: Option<f64>,
    sap_before: Option<f64>,
    sap_after: Option<f64>,
    band_before: Option<EpcBand>,
    band_after: Option<EpcBand>,
    energy_after_kwh_low: f64,
    energy_after_kwh_high: f64,
    bill_saving_low: f64,
    bill_saving_high: f64,
    payback_years_low: f64,
    payback_years_high: f64,
    flags: String,
}

fn joined<T: ToString>(items: &[T]) -> String {
    items.iter().map(ToString::to_string).join(";")
}

impl<'a> From<&'a ScenarioResult> for ResultRow<'a> {
    fn from(result: &'a ScenarioResult) -> Self {
        let Bounds {
            low: energy_after_kwh_low,
            high: energy_after_kwh_high,
        } = result.bounds.energy_after_kwh;

        Self {
            property_id: &result.property_id,
            scenario: &result.scenario,
            tier: result.tier.number(),
            hn_ready: result.hn_ready,
            pathway: result.pathway.label(),
            measures_applied: joined(&result.measures_applied),
            measures_not_applicable: joined(&result.measures_not_applicable),
            measures_removed: joined(&result.measures_removed),
            baseline_kwh: result.baseline_kwh,
            energy_before_kwh: result.energy_before_kwh(),
            energy_after_kwh: result.energy_after_kwh(),
            energy_saving_kwh: result.energy_saving_kwh(),
            bill_before: result.bill_before,
            bill_after: result.bill_after,
            co2_before_kg: result.co2_before_kg,
            co2_after_kg: result.co2_after_kg,
            capital_cost: result.capital_cost,
            simple_payback_years: result.simple_payback_years,
            discounted_payback_years: result.discounted_payback_years,
            flow_temperature: result.flow_temperature,
            emitter_tier: result.emitter_tier.map(|tier| tier.to_string()),
            cop: result.cop,
            sap_before: result.epc.map(|epc| epc.sap_before),
            sap_after: result.epc.map(|epc| epc.sap_after),
            band_before: result.epc.map(|epc| epc.band_before),
            band_after: result.epc.map(|epc| epc.band_after),
            energy_after_kwh_low,
            energy_after_kwh_high,
            bill_saving_low: result.bounds.bill_saving.low,
            bill_saving_high: result.bounds.bill_saving.high,
            payback_years_low: result.bounds.payback_years.low,
            payback_years_high: result.bounds.payback_years.high,
            flags: result.flags.describe(),
        }
    }
}

/// Per-property results for one scenario, written under the scenario's name.
pub fn write_scenario_results(
    output: &impl Output,
    scenario: &str,
    results: &[ScenarioResult],
) -> anyhow::Result<()> {
    if output.is_noop() {
        return Ok(());
    }
    let writer = output.writer_for_location_key(scenario, "csv")?;
    let mut writer = WriterBuilder::new().from_writer(writer);

    for result in results {
        writer.serialize(ResultRow::from(result))?;
    }
    writer.flush()?;

    Ok(())
}

#[derive(Serialize)]
struct SummaryDocument<'a> {
    classification: &'a ClassificationReport,
    scenarios: &'a [ScenarioSummary],
}

pub fn write_summary(
    output: &impl Output,
    classification: &ClassificationReport,
    summaries: &[ScenarioSummary],
) -> anyhow::Result<()> {
    if output.is_noop() {
        return Ok(());
    }
    let mut writer = output.writer_for_location_key("summary", "json")?;
    serde_json::to_writer_pretty(
        &mut writer,
        &SummaryDocument {
            classification,
            scenarios: summaries,
        },
    )?;
    writer.flush()?;

    Ok(())
}
