//! Corrections between modelled and metered consumption.
//!
//! Modelled demand overstates what poorly rated homes actually use (prebound), and part of any
//! fabric saving is taken back as extra warmth (rebound). Both corrections are indexed by EPC
//! band.

use crate::config::{PreboundConfig, ReboundConfig};
use crate::errors::ComputationError;
use crate::property::EpcBand;

/// Annual baseline demand after the prebound correction.
pub fn prebound_adjusted(
    raw_annual_kwh: f64,
    band: Option<EpcBand>,
    config: &PreboundConfig,
) -> Result<f64, ComputationError> {
    if !config.enabled {
        return Ok(raw_annual_kwh);
    }
    let band = band.ok_or(ComputationError::MissingEpcBand("prebound adjustment"))?;

    Ok(raw_annual_kwh * config.factors().get(band))
}

/// The part of a modelled fabric saving that is actually realised.
pub fn realised_saving(
    modelled_saving_kwh: f64,
    band: Option<EpcBand>,
    config: &ReboundConfig,
) -> Result<f64, ComputationError> {
    if !config.enabled {
        return Ok(modelled_saving_kwh);
    }
    let band = band.ok_or(ComputationError::MissingEpcBand("rebound adjustment"))?;

    Ok(modelled_saving_kwh * config.factors.get(band))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Variant;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    #[case(Variant::Central, EpcBand::G, 11_000.)]
    #[case(Variant::Low, EpcBand::G, 14_000.)]
    #[case(Variant::High, EpcBand::G, 9_600.)]
    #[case(Variant::Central, EpcBand::A, 20_000.)]
    fn should_correct_poorer_bands_downwards(
        #[case] variant: Variant,
        #[case] band: EpcBand,
        #[case] expected: f64,
    ) {
        let config = PreboundConfig {
            variant,
            ..Default::default()
        };

        assert_relative_eq!(
            prebound_adjusted(20_000., Some(band), &config).unwrap(),
            expected,
            max_relative = 1e-12
        );
    }

    #[rstest]
    fn should_pass_through_when_disabled() {
        let config = PreboundConfig {
            enabled: false,
            ..Default::default()
        };
        assert_eq!(prebound_adjusted(20_000., None, &config), Ok(20_000.));

        let config = ReboundConfig {
            enabled: false,
            ..Default::default()
        };
        assert_eq!(realised_saving(5_000., None, &config), Ok(5_000.));
    }

    #[rstest]
    fn should_fail_without_band() {
        assert_eq!(
            prebound_adjusted(20_000., None, &PreboundConfig::default()),
            Err(ComputationError::MissingEpcBand("prebound adjustment"))
        );
        assert!(realised_saving(5_000., None, &ReboundConfig::default()).is_err());
    }

    #[rstest]
    fn should_take_back_part_of_saving() {
        assert_relative_eq!(
            realised_saving(5_000., Some(EpcBand::E), &ReboundConfig::default()).unwrap(),
            4_000.,
            max_relative = 1e-12
        );
        assert_eq!(
            realised_saving(5_000., Some(EpcBand::A), &ReboundConfig::default()),
            Ok(5_000.)
        );
    }
}
