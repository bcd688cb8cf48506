pub const KWH_PER_GWH: f64 = 1_000_000.;
pub const M2_PER_KM2: f64 = 1_000_000.;
/// Mean Earth radius (IUGG)
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

pub(crate) fn degrees_to_radians(degrees: f64) -> f64 {
    degrees.to_radians()
}

pub(crate) fn kwh_to_gwh(kwh: f64) -> f64 {
    kwh / KWH_PER_GWH
}

pub(crate) fn m2_to_km2(m2: f64) -> f64 {
    m2 / M2_PER_KM2
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn should_convert_energy_and_area() {
        assert_eq!(kwh_to_gwh(2_500_000.), 2.5);
        assert_eq!(m2_to_km2(250_000.), 0.25);
    }
}
