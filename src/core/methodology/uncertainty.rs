use crate::config::UncertaintyConfig;
use crate::core::payback::simple_payback;
use crate::property::EpcBand;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Bounds {
    pub low: f64,
    pub high: f64,
}

impl Bounds {
    /// `value` ± `fraction` of itself, widened for anomalous records.
    pub fn around(value: f64, fraction: f64, anomaly: bool, config: &UncertaintyConfig) -> Self {
        let fraction = if anomaly {
            fraction * config.anomaly_multiplier
        } else {
            fraction
        };
        let (a, b) = (value * (1. - fraction), value * (1. + fraction));

        Self {
            low: a.min(b),
            high: a.max(b),
        }
    }

    /// Payback range: the fastest payback comes with the highest saving.
    pub fn payback(capex: f64, saving: &Bounds) -> Self {
        Self {
            low: simple_payback(capex, saving.high),
            high: simple_payback(capex, saving.low),
        }
    }
}

/// Typical relative error of modelled demand for a property in this band, if the band is known.
pub fn band_uncertainty(band: Option<EpcBand>, config: &UncertaintyConfig) -> Option<f64> {
    band.map(|band| config.sap_band_uncertainty.get(band))
}

/// Uncertainty bounds carried on every scenario result.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ResultBounds {
    pub energy_after_kwh: Bounds,
    pub bill_saving: Bounds,
    pub co2_saving_kg: Bounds,
    pub payback_years: Bounds,
}

impl ResultBounds {
    pub fn new(
        energy_after_kwh: f64,
        bill_saving: f64,
        co2_saving_kg: f64,
        capex: f64,
        anomaly: bool,
        config: &UncertaintyConfig,
    ) -> Self {
        let bill_saving = Bounds::around(bill_saving, config.bill_fraction, anomaly, config);

        Self {
            energy_after_kwh: Bounds::around(
                energy_after_kwh,
                config.demand_fraction,
                anomaly,
                config,
            ),
            bill_saving,
            co2_saving_kg: Bounds::around(co2_saving_kg, config.co2_fraction, anomaly, config),
            payback_years: Bounds::payback(capex, &bill_saving),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn should_widen_bounds_for_anomalies() {
        let config = UncertaintyConfig::default();

        let normal = Bounds::around(1_000., 0.2, false, &config);
        assert_relative_eq!(normal.low, 800., max_relative = 1e-12);
        assert_relative_eq!(normal.high, 1_200., max_relative = 1e-12);

        let anomalous = Bounds::around(1_000., 0.2, true, &config);
        assert_relative_eq!(anomalous.low, 700., max_relative = 1e-12);
        assert_relative_eq!(anomalous.high, 1_300., max_relative = 1e-12);
    }

    #[rstest]
    fn should_keep_bounds_ordered_for_negative_values() {
        let bounds = Bounds::around(-100., 0.25, false, &UncertaintyConfig::default());
        assert_eq!(bounds, Bounds { low: -125., high: -75. });
    }

    #[rstest]
    fn should_derive_payback_bounds_from_saving_bounds() {
        let saving = Bounds {
            low: 100.,
            high: 200.,
        };
        assert_eq!(Bounds::payback(1_000., &saving), Bounds { low: 5., high: 10. });

        let saving = Bounds {
            low: -50.,
            high: 50.,
        };
        assert_eq!(
            Bounds::payback(1_000., &saving),
            Bounds {
                low: 20.,
                high: f64::INFINITY
            }
        );
    }

    #[rstest]
    fn should_look_up_band_uncertainty() {
        let config = UncertaintyConfig::default();
        assert_eq!(band_uncertainty(Some(EpcBand::G), &config), Some(0.25));
        assert_eq!(band_uncertainty(None, &config), None);
    }
}
