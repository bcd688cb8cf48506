use crate::config::CopConfig;
use crate::errors::ComputationError;
use crate::statistics::np_interp;

/// Seasonal COP at the given flow temperature, from the configured curve variant.
pub fn seasonal_cop(flow_temperature: f64, config: &CopConfig) -> Result<f64, ComputationError> {
    if !flow_temperature.is_finite() {
        return Err(ComputationError::NonFiniteFlowTemperature(flow_temperature));
    }

    let cop = np_interp(flow_temperature, &config.flow_temperatures, config.curve());
    if cop.is_finite() && cop > 0. {
        Ok(cop)
    } else {
        Err(ComputationError::InvalidCop(cop))
    }
}

/// COP at the hottest point on the curve, used when a lookup fails.
pub fn fallback_cop(config: &CopConfig) -> f64 {
    config.curve().last().copied().unwrap_or(1.)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Variant;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    #[case(Variant::Central, 50., 3.0)]
    #[case(Variant::Low, 35., 3.1)]
    #[case(Variant::High, 80., 2.2)]
    #[case(Variant::Central, 30., 3.6)]
    #[case(Variant::Central, 85., 1.95)]
    fn should_look_up_cop(
        #[case] variant: Variant,
        #[case] flow_temperature: f64,
        #[case] expected: f64,
    ) {
        let config = CopConfig {
            variant,
            ..Default::default()
        };

        assert_relative_eq!(
            seasonal_cop(flow_temperature, &config).unwrap(),
            expected,
            max_relative = 1e-12
        );
    }

    #[rstest]
    fn should_reject_non_finite_flow_temperature() {
        assert!(matches!(
            seasonal_cop(f64::NAN, &CopConfig::default()),
            Err(ComputationError::NonFiniteFlowTemperature(_))
        ));
    }

    #[rstest]
    fn should_reject_non_positive_cop() {
        let config = CopConfig {
            central: vec![3.6, 3.2, 2.8, 2.4, 0., 0.],
            ..Default::default()
        };

        assert_eq!(
            seasonal_cop(80., &config),
            Err(ComputationError::InvalidCop(0.))
        );
        assert_eq!(fallback_cop(&CopConfig::default()), 1.95);
    }
}
