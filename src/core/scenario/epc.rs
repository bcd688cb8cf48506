use crate::config::EpcConfig;
use crate::errors::ComputationError;
use crate::property::EpcBand;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct EpcEstimate {
    pub sap_before: f64,
    pub sap_after: f64,
    pub band_before: EpcBand,
    pub band_after: EpcBand,
}

impl EpcEstimate {
    pub fn bands_improved(&self) -> i64 {
        self.band_after.bands_better_than(self.band_before)
    }
}

/// SAP points gained for a fractional reduction in energy use. Concave: each further percent of
/// reduction is worth less than the last.
pub fn sap_gain(energy_reduction: f64, config: &EpcConfig) -> f64 {
    let reduction = energy_reduction.clamp(0., 1.);

    config.sap_gain_max_points * (1. - (-config.sap_gain_curvature * reduction).exp())
}

/// Post-retrofit SAP score and band.
///
/// The gain is capped so that the band moves by at most the configured number of bands, and the
/// score never exceeds 100.
pub fn estimate_epc(
    sap_before: Option<f64>,
    energy_reduction: f64,
    config: &EpcConfig,
) -> Result<EpcEstimate, ComputationError> {
    let sap_before = sap_before
        .filter(|sap| sap.is_finite())
        .ok_or(ComputationError::MissingSapScore("EPC estimate"))?;
    let band_before = EpcBand::from_sap(sap_before);
    let best_allowed = band_before.improved_by(config.max_band_improvement);

    let sap_after = (sap_before + sap_gain(energy_reduction, config))
        .min(best_allowed.upper_sap_bound())
        .max(sap_before)
        .min(100.);

    Ok(EpcEstimate {
        sap_before,
        sap_after,
        band_before,
        band_after: EpcBand::from_sap(sap_after),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn config() -> EpcConfig {
        EpcConfig::default()
    }

    #[rstest]
    fn should_have_diminishing_returns(config: EpcConfig) {
        let first_tenth = sap_gain(0.1, &config) - sap_gain(0., &config);
        let last_tenth = sap_gain(1., &config) - sap_gain(0.9, &config);

        assert_eq!(sap_gain(0., &config), 0.);
        assert!(first_tenth > last_tenth);
        assert!(sap_gain(1., &config) < config.sap_gain_max_points);
    }

    #[rstest]
    fn should_estimate_small_improvements_uncapped(config: EpcConfig) {
        let estimate = estimate_epc(Some(60.), 0.1, &config).unwrap();

        assert_relative_eq!(
            estimate.sap_after,
            60. + 45. * (1. - (-0.25_f64).exp()),
            max_relative = 1e-12
        );
        assert_eq!(estimate.band_before, EpcBand::D);
        assert_eq!(estimate.band_after, EpcBand::C);
    }

    #[rstest]
    #[case(10.)]
    #[case(30.)]
    #[case(45.)]
    #[case(60.)]
    #[case(85.)]
    #[case(99.)]
    #[case(105.)]
    fn should_never_exceed_band_cap(config: EpcConfig, #[case] sap: f64) {
        for reduction in [0., 0.2, 0.5, 0.8, 1.] {
            let estimate = estimate_epc(Some(sap), reduction, &config).unwrap();

            assert!(estimate.bands_improved() <= config.max_band_improvement as i64);
            assert!(estimate.bands_improved() >= 0);
            assert!(estimate.sap_after <= 100.);
            assert!(estimate.sap_after >= sap.min(100.));
        }
    }

    #[rstest]
    fn should_cap_at_two_bands(config: EpcConfig) {
        let estimate = estimate_epc(Some(15.), 1., &config).unwrap();

        assert_eq!(estimate.band_after, EpcBand::E);
        assert_eq!(estimate.sap_after, 54.);
    }

    #[rstest]
    fn should_hold_scores_above_the_scale_at_100(config: EpcConfig) {
        let estimate = estimate_epc(Some(105.), 0.5, &config).unwrap();

        assert_eq!(estimate.sap_before, 105.);
        assert_eq!(estimate.sap_after, 100.);
        assert_eq!(estimate.band_after, EpcBand::A);
        assert_eq!(estimate.bands_improved(), 0);
    }

    #[rstest]
    fn should_fail_without_sap(config: EpcConfig) {
        assert_eq!(
            estimate_epc(None, 0.5, &config),
            Err(ComputationError::MissingSapScore("EPC estimate"))
        );
    }
}
