use crate::core::units::{degrees_to_radians, EARTH_RADIUS_M};
use geo::{Centroid, Coord, MultiPoint};
use serde::{Deserialize, Serialize};

pub type Point = geo::Point<f64>;
pub type LineString = geo::LineString<f64>;
pub type Polygon = geo::Polygon<f64>;

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Crs {
    /// Already in a planar metric reference (e.g. British National Grid).
    #[default]
    Planar,
    /// Longitude/latitude in degrees.
    Wgs84,
}

/// Maps input coordinates into one planar, metric reference so that Euclidean distances hold.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Projection {
    Identity,
    /// Local equirectangular projection about an origin (lon, lat in degrees). Accurate to well
    /// under a percent across a city-sized extent.
    Equirectangular {
        origin: Coord<f64>,
        cos_latitude: f64,
    },
}

impl Projection {
    /// Choose a projection for the given reference system, centred on the centroid of `points`
    /// when a projection is needed.
    pub fn for_points(crs: Crs, points: impl IntoIterator<Item = Point>) -> Self {
        match crs {
            Crs::Planar => Projection::Identity,
            Crs::Wgs84 => {
                let origin = MultiPoint::new(points.into_iter().collect())
                    .centroid()
                    .map_or(Coord { x: 0., y: 0. }, |centroid| centroid.0);

                Projection::Equirectangular {
                    origin,
                    cos_latitude: degrees_to_radians(origin.y).cos(),
                }
            }
        }
    }

    pub fn project_coord(&self, coord: Coord<f64>) -> Coord<f64> {
        match self {
            Projection::Identity => coord,
            Projection::Equirectangular {
                origin,
                cos_latitude,
            } => Coord {
                x: EARTH_RADIUS_M * degrees_to_radians(coord.x - origin.x) * cos_latitude,
                y: EARTH_RADIUS_M * degrees_to_radians(coord.y - origin.y),
            },
        }
    }

    pub fn project(&self, point: Point) -> Point {
        Point::from(self.project_coord(point.0))
    }
}

/// Serde adapters holding geometry as GeoJSON-style coordinate arrays.
pub(crate) mod coordinates {
    use super::{LineString, Point, Polygon};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    type Ring = Vec<[f64; 2]>;

    fn ring_of(line_string: &LineString) -> Ring {
        line_string.coords().map(|coord| [coord.x, coord.y]).collect()
    }

    /// Exterior ring first, then any holes. Rings are closed on reading if they are not already.
    fn polygon_of(mut rings: Vec<Ring>) -> Polygon {
        let holes = rings.split_off(rings.len().min(1));
        let exterior = rings.pop().unwrap_or_default();

        Polygon::new(
            LineString::from(exterior),
            holes.into_iter().map(LineString::from).collect(),
        )
    }

    pub(crate) mod point {
        use super::*;

        pub(crate) fn serialize<S: Serializer>(
            point: &Point,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            [point.x(), point.y()].serialize(serializer)
        }

        pub(crate) fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Point, D::Error> {
            Ok(Point::from(<[f64; 2]>::deserialize(deserializer)?))
        }
    }

    pub(crate) mod line_string {
        use super::*;

        pub(crate) fn serialize<S: Serializer>(
            line_string: &LineString,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            ring_of(line_string).serialize(serializer)
        }

        pub(crate) fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<LineString, D::Error> {
            Ok(LineString::from(Ring::deserialize(deserializer)?))
        }
    }

    pub(crate) mod polygons {
        use super::*;

        pub(crate) fn serialize<S: Serializer>(
            polygons: &[Polygon],
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            polygons
                .iter()
                .map(|polygon| {
                    std::iter::once(polygon.exterior())
                        .chain(polygon.interiors())
                        .map(ring_of)
                        .collect::<Vec<_>>()
                })
                .collect::<Vec<_>>()
                .serialize(serializer)
        }

        pub(crate) fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Vec<Polygon>, D::Error> {
            Ok(Vec::<Vec<Ring>>::deserialize(deserializer)?
                .into_iter()
                .map(polygon_of)
                .collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[derive(Debug, Deserialize, Serialize)]
    struct Zones {
        #[serde(with = "coordinates::polygons")]
        zones: Vec<Polygon>,
    }

    #[rstest]
    fn should_read_polygons_as_closed_rings() {
        let zones: Zones = serde_json::from_str(
            r#"{"zones": [[[[0, 0], [10, 0], [10, 10], [0, 10]], [[4, 4], [6, 4], [6, 6], [4, 4]]]]}"#,
        )
        .unwrap();

        let zone = &zones.zones[0];
        assert_eq!(zone.exterior().0.len(), 5);
        assert_eq!(zone.exterior().0[4], Coord { x: 0., y: 0. });
        assert_eq!(zone.interiors().len(), 1);

        let written = serde_json::to_value(&zones).unwrap();
        assert_eq!(written["zones"][0][0][2], serde_json::json!([10., 10.]));
        assert_eq!(written["zones"][0][1].as_array().unwrap().len(), 4);
    }

    #[rstest]
    fn should_read_an_empty_polygon() {
        let zones: Zones = serde_json::from_str(r#"{"zones": [[]]}"#).unwrap();
        assert!(zones.zones[0].exterior().0.is_empty());
    }

    #[rstest]
    fn should_project_wgs84_to_local_metres() {
        let points = [Point::new(-0.1, 51.5), Point::new(-0.1, 51.5)];
        let projection = Projection::for_points(Crs::Wgs84, points);

        assert_eq!(projection.project(points[0]), Point::new(0., 0.));

        // a thousandth of a degree of latitude is about 111 m
        let north = projection.project(Point::new(-0.1, 51.501));
        assert_relative_eq!(north.y(), 111.19, max_relative = 1e-3);
        assert_relative_eq!(north.x(), 0.);

        let east = projection.project(Point::new(-0.099, 51.5));
        assert_relative_eq!(
            east.x(),
            111.19 * 51.5_f64.to_radians().cos(),
            max_relative = 1e-3
        );
    }

    #[rstest]
    fn should_not_move_planar_points() {
        let projection = Projection::for_points(Crs::Planar, [Point::new(530_000., 180_000.)]);
        assert_eq!(
            projection.project(Point::new(1., 2.)),
            Point::new(1., 2.)
        );
    }
}
