use crate::core::scenario::measures::MeasureId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PathwaysError {
    #[error("Configuration was considered invalid: {0}")]
    InvalidConfiguration(#[from] ConfigurationError),
    #[error("Request was considered invalid due to error: {0}")]
    InvalidRequest(#[from] anyhow::Error),
    #[error(
        "Worker failed while processing chunk {chunk_index} (properties '{first_property_id}' to '{last_property_id}'): {message}"
    )]
    PanicInWorker {
        chunk_index: usize,
        first_property_id: String,
        last_property_id: String,
        message: String,
    },
    #[error("Could not build worker pool: {0}")]
    WorkerPool(String),
    #[error("Could not write results: {0}")]
    Output(anyhow::Error),
}

/// Invalid or missing cost, threshold or methodology parameters. Always fatal, and raised before
/// any property is processed.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConfigurationError {
    #[error("No cost parameters configured for measure '{0}'")]
    MissingMeasure(MeasureId),
    #[error("Parameter '{parameter}' for measure '{measure}' must be a finite non-negative number, got {value}")]
    InvalidMeasureParameter {
        measure: MeasureId,
        parameter: &'static str,
        value: f64,
    },
    #[error("Saving fraction for measure '{measure}' must lie within [0, 1], got {value}")]
    SavingFractionOutOfRange { measure: MeasureId, value: f64 },
    #[error("Invalid '{section}' configuration: {message}")]
    InvalidSection {
        section: &'static str,
        message: String,
    },
    #[error("Planned network features were supplied but no planned network buffer policy is configured")]
    MissingPlannedNetworkBufferPolicy,
}

impl ConfigurationError {
    pub(crate) fn invalid_section(section: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidSection {
            section,
            message: message.into(),
        }
    }
}

/// A property was missing a field required by a computation. Recovered locally by excluding the
/// property from that computation.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum DataQualityError {
    #[error("Property '{0}' has no floor area")]
    MissingFloorArea(String),
    #[error("Property '{property_id}' has implausible floor area {floor_area} m²")]
    ImplausibleFloorArea { property_id: String, floor_area: f64 },
    #[error("Property '{0}' has no baseline energy intensity")]
    MissingBaselineIntensity(String),
    #[error("Property '{property_id}' has invalid baseline energy intensity {intensity} kWh/m²/yr")]
    InvalidBaselineIntensity { property_id: String, intensity: f64 },
}

/// Network and zone geometries were not supplied, so classification falls back to assigning the
/// lowest tier to every property.
#[derive(Clone, Debug, Error, PartialEq)]
#[error("Spatial data unavailable ({0}); all properties assigned tier 5 and not heat network ready")]
pub struct SpatialDataUnavailableError(pub(crate) String);

/// An unexpected non-finite or out-of-domain value for a single property. Recovered by flagging
/// the property and substituting a safe default.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ComputationError {
    #[error("SAP score is required for {0} but was absent")]
    MissingSapScore(&'static str),
    #[error("EPC band is required for {0} but was absent")]
    MissingEpcBand(&'static str),
    #[error("Heat density {0} is not a finite non-negative number")]
    InvalidDensity(f64),
    #[error("Flow temperature {0} is not finite so no COP could be looked up")]
    NonFiniteFlowTemperature(f64),
    #[error("COP lookup produced non-positive or non-finite value {0}")]
    InvalidCop(f64),
}
