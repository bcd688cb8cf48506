
use crate::core::scenario::tests::property_fixture;
use crate::core::spatial::geometry::LineString;
use crate::core::spatial::{NetworkFeature, NetworkGeometry, NetworkStatus, SpatialInputs};
use crate::property::Property;

pub(crate) fn property_at(id: &str, x: f64, y: f64) -> Property {
    Property {
        id: id.into(),
        x: Some(x),
        y: Some(y),
        ..property_fixture()
    }
}

/// A single existing network running east along y = 0 from the origin.
pub(crate) fn existing_network() -> SpatialInputs {
    SpatialInputs {
        networks: vec![NetworkFeature {
            status: NetworkStatus::Existing,
            geometry: NetworkGeometry::LineString(LineString::from(vec![(0., 0.), (2_000., 0.)])),
            reported_length_m: Some(2_000.),
        }],
        zones: vec![],
    }
}
