pub mod classifier;
pub mod geometry;
pub(crate) mod grid;
pub(crate) mod index;

use crate::core::spatial::geometry::{coordinates, LineString, Point, Polygon};
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};
use std::fmt::{Display, Formatter};
use std::io::{BufReader, Read};
use strum::EnumIter;

pub use classifier::{classify_properties, ClassificationReport};

/// Heat network readiness tier. Lower numbers mean more certainty that a heat network is viable.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize_repr,
    EnumIter,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize_repr,
)]
#[repr(u8)]
pub enum Tier {
    /// Within reach of an existing or under-construction network.
    ExistingNetwork = 1,
    /// Inside a designated heat network zone or near a planned network.
    PlannedOrZone = 2,
    HighDensity = 3,
    ModerateDensity = 4,
    Low = 5,
}

impl Tier {
    pub fn number(&self) -> u8 {
        *self as u8
    }
}

impl Display for Tier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "tier {}", self.number())
    }
}

/// The tier columns attached to a property by the classifier.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TierAssignment {
    pub tier: Tier,
    /// Distance to the nearest existing or under-construction network, if there is one.
    pub distance_to_network_m: Option<f64>,
    pub in_heat_zone: bool,
    pub near_planned_network: bool,
    pub heat_density_gwh_km2: f64,
    pub hn_ready: bool,
}

impl TierAssignment {
    /// What every property gets when there is nothing to classify it against.
    pub const fn unclassifiable() -> Self {
        Self {
            tier: Tier::Low,
            distance_to_network_m: None,
            in_heat_zone: false,
            near_planned_network: false,
            heat_density_gwh_km2: 0.,
            hn_ready: false,
        }
    }
}

pub fn read_spatial_inputs(json: impl Read) -> anyhow::Result<SpatialInputs> {
    Ok(serde_json::from_reader(BufReader::new(json))?)
}

/// Network and zone geometries, in the reference system named by the spatial configuration.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SpatialInputs {
    #[serde(default)]
    pub networks: Vec<NetworkFeature>,
    /// Designated heat network zones
    #[serde(default, with = "coordinates::polygons")]
    pub zones: Vec<Polygon>,
}

impl SpatialInputs {
    pub fn is_empty(&self) -> bool {
        self.networks.is_empty() && self.zones.is_empty()
    }

    pub fn has_planned_networks(&self) -> bool {
        self.networks
            .iter()
            .any(|feature| feature.status == NetworkStatus::Planned)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkFeature {
    pub status: NetworkStatus,
    pub geometry: NetworkGeometry,
    #[serde(default)]
    pub reported_length_m: Option<f64>,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkStatus {
    Existing,
    UnderConstruction,
    Planned,
}

impl NetworkStatus {
    pub fn is_built_or_building(&self) -> bool {
        matches!(self, NetworkStatus::Existing | NetworkStatus::UnderConstruction)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum NetworkGeometry {
    Point(#[serde(with = "coordinates::point")] Point),
    LineString(#[serde(with = "coordinates::line_string")] LineString),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use serde_json::json;

    #[rstest]
    fn should_read_geojson_like_spatial_inputs() {
        let json = json!({
            "networks": [
                {"status": "existing", "geometry": {"type": "LineString", "coordinates": [[0, 0], [100, 0]]}},
                {"status": "planned", "geometry": {"type": "Point", "coordinates": [500, 500]}, "reported_length_m": 1200.0}
            ],
            "zones": [[[[0, 0], [10, 0], [10, 10], [0, 10]]]]
        });
        let inputs = read_spatial_inputs(json.to_string().as_bytes()).unwrap();

        assert_eq!(inputs.networks.len(), 2);
        assert_eq!(
            inputs.networks[0].geometry,
            NetworkGeometry::LineString(LineString::from(vec![(0., 0.), (100., 0.)]))
        );
        assert_eq!(
            inputs.networks[1].geometry,
            NetworkGeometry::Point(Point::new(500., 500.))
        );
        assert!(inputs.has_planned_networks());
        assert_eq!(inputs.zones[0].exterior().0.len(), 5);
        assert!(inputs.zones[0].interiors().is_empty());
    }

    #[rstest]
    fn should_serialise_tiers_as_numbers() {
        assert_eq!(serde_json::to_string(&Tier::HighDensity).unwrap(), "3");
        assert_eq!(
            serde_json::from_str::<Tier>("1").unwrap(),
            Tier::ExistingNetwork
        );
        assert_eq!(Tier::Low.to_string(), "tier 5");
    }
}
