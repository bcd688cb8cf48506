use crate::compare_floats::{clamp_to_bounds, max_of_2};
use crate::config::{CostRule, MeasureTable, SizeAdjustment};
use crate::core::scenario::measures::MeasureId;
use crate::errors::ConfigurationError;

/// Capital cost of installing a measure in a dwelling of the given floor area.
///
/// The rule's base cost plus any enabling works is scaled for dwelling size and then clamped into
/// the measure's configured cost bounds. Never negative.
pub fn cost(
    measure: MeasureId,
    floor_area_m2: f64,
    measures: &MeasureTable,
    size_adjustment: &SizeAdjustment,
) -> Result<f64, ConfigurationError> {
    let parameters = measures.get(measure)?;
    parameters.validate_for(measure)?;

    let base = match parameters.cost {
        CostRule::Fixed { amount } => amount,
        CostRule::AreaScaled { unit_rate, area } => unit_rate * area.factor() * floor_area_m2,
        CostRule::CountScaled {
            unit_rate,
            floor_area_per_unit,
        } => unit_rate * floor_area_m2 / floor_area_per_unit,
    };

    let adjusted = (base + parameters.enabling_works) * size_multiplier(floor_area_m2, size_adjustment);

    Ok(max_of_2(
        clamp_to_bounds(adjusted, parameters.min_cost, parameters.max_cost),
        0.,
    ))
}

pub fn size_multiplier(floor_area_m2: f64, size_adjustment: &SizeAdjustment) -> f64 {
    if floor_area_m2 < size_adjustment.small_floor_area_m2 {
        size_adjustment.small_multiplier
    } else if floor_area_m2 > size_adjustment.large_floor_area_m2 {
        size_adjustment.large_multiplier
    } else {
        1.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AreaBasis, MeasureParameters};
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn measures() -> MeasureTable {
        let mut measures = MeasureTable::default();
        measures.insert(
            MeasureId::LoftInsulation,
            MeasureParameters::new(
                CostRule::AreaScaled {
                    unit_rate: 20.,
                    area: AreaBasis::Loft,
                },
                0.15,
            )
            .with_bounds(Some(500.), Some(2_000.)),
        );
        measures.insert(
            MeasureId::EmitterUpgrade,
            MeasureParameters::new(
                CostRule::CountScaled {
                    unit_rate: 400.,
                    floor_area_per_unit: 15.,
                },
                0.,
            ),
        );
        measures.insert(
            MeasureId::AirSourceHeatPump,
            MeasureParameters::new(CostRule::Fixed { amount: 8_000. }, 0.)
                .with_enabling_works(2_000.),
        );
        measures
    }

    #[fixture]
    fn size_adjustment() -> SizeAdjustment {
        SizeAdjustment::default()
    }

    #[rstest]
    #[case(MeasureId::LoftInsulation, 100., 1_800.)]
    // small dwelling: 20 × 0.9 × 30 = 540, × 1.15
    #[case(MeasureId::LoftInsulation, 30., 621.)]
    // clamped at the minimum after adjustment
    #[case(MeasureId::LoftInsulation, 20., 500.)]
    // large dwelling: 20 × 0.9 × 300 × 0.85 = 4590, capped
    #[case(MeasureId::LoftInsulation, 300., 2_000.)]
    // 100 / 15 = 6.67 radiators, not rounded
    #[case(MeasureId::EmitterUpgrade, 100., 400. * 100. / 15.)]
    #[case(MeasureId::EmitterUpgrade, 150., 4_000.)]
    #[case(MeasureId::AirSourceHeatPump, 100., 10_000.)]
    #[case(MeasureId::AirSourceHeatPump, 250., 8_500.)]
    fn should_cost_measures(
        measures: MeasureTable,
        size_adjustment: SizeAdjustment,
        #[case] measure: MeasureId,
        #[case] floor_area: f64,
        #[case] expected: f64,
    ) {
        assert_relative_eq!(
            cost(measure, floor_area, &measures, &size_adjustment).unwrap(),
            expected,
            max_relative = 1e-12
        );
    }

    #[rstest]
    fn should_fail_for_unconfigured_measure(
        mut measures: MeasureTable,
        size_adjustment: SizeAdjustment,
    ) {
        measures.remove(MeasureId::Glazing);

        assert_eq!(
            cost(MeasureId::Glazing, 100., &measures, &size_adjustment),
            Err(ConfigurationError::MissingMeasure(MeasureId::Glazing))
        );
    }

    #[rstest]
    fn should_fail_for_non_finite_parameters(
        mut measures: MeasureTable,
        size_adjustment: SizeAdjustment,
    ) {
        measures.insert(
            MeasureId::DraughtProofing,
            MeasureParameters::new(CostRule::Fixed { amount: f64::NAN }, 0.05),
        );

        assert!(matches!(
            cost(MeasureId::DraughtProofing, 100., &measures, &size_adjustment),
            Err(ConfigurationError::InvalidMeasureParameter {
                parameter: "amount",
                ..
            })
        ));
    }

    #[rstest]
    fn should_leave_reference_sized_dwellings_unadjusted(size_adjustment: SizeAdjustment) {
        assert_eq!(size_multiplier(50., &size_adjustment), 1.);
        assert_eq!(size_multiplier(200., &size_adjustment), 1.);
        assert_eq!(size_multiplier(49.9, &size_adjustment), 1.15);
        assert_eq!(size_multiplier(200.1, &size_adjustment), 0.85);
    }
}
