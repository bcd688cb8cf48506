use crate::config::SpatialConfig;
use crate::core::spatial::geometry::{Point, Projection};
use crate::core::spatial::grid::HeatDensityGrid;
use crate::core::spatial::index::{line_at, lines_of, BufferIndex, LineIndex, PolygonIndex};
use geo::{Line, MapCoords};
use crate::core::spatial::{
    NetworkFeature, NetworkGeometry, NetworkStatus, SpatialInputs, Tier, TierAssignment,
};
use crate::errors::{ComputationError, ConfigurationError, SpatialDataUnavailableError};
use crate::property::Property;
use indexmap::IndexMap;
use itertools::Itertools;
use rayon::prelude::*;
use serde::Serialize;
use strum::IntoEnumIterator;
use tracing::{debug, info, instrument, warn};

/// First matching rule wins.
pub fn assign_tier(
    distance_to_network_m: Option<f64>,
    in_zone_or_planned_buffer: bool,
    heat_density_gwh_km2: f64,
    config: &SpatialConfig,
) -> Tier {
    if distance_to_network_m.is_some_and(|distance| distance <= config.max_network_distance_m) {
        Tier::ExistingNetwork
    } else if in_zone_or_planned_buffer {
        Tier::PlannedOrZone
    } else if heat_density_gwh_km2 >= config.high_density_threshold {
        Tier::HighDensity
    } else if heat_density_gwh_km2 >= config.moderate_density_threshold {
        Tier::ModerateDensity
    } else {
        Tier::Low
    }
}

pub fn is_hn_ready(
    tier: Tier,
    distance_to_network_m: Option<f64>,
    in_zone_or_planned_buffer: bool,
    heat_density_gwh_km2: f64,
    config: &SpatialConfig,
) -> bool {
    tier <= Tier::HighDensity
        || distance_to_network_m.is_some_and(|distance| distance <= config.max_network_distance_m)
        || heat_density_gwh_km2 >= config.high_density_threshold
        || in_zone_or_planned_buffer
}

/// Tier assignment from already-computed spatial measures.
pub fn assess(
    distance_to_network_m: Option<f64>,
    in_heat_zone: bool,
    near_planned_network: bool,
    heat_density_gwh_km2: f64,
    config: &SpatialConfig,
) -> TierAssignment {
    let in_zone_or_planned_buffer = in_heat_zone || near_planned_network;
    let tier = assign_tier(
        distance_to_network_m,
        in_zone_or_planned_buffer,
        heat_density_gwh_km2,
        config,
    );

    TierAssignment {
        tier,
        distance_to_network_m,
        in_heat_zone,
        near_planned_network,
        heat_density_gwh_km2,
        hn_ready: is_hn_ready(
            tier,
            distance_to_network_m,
            in_zone_or_planned_buffer,
            heat_density_gwh_km2,
            config,
        ),
    }
}

/// Counts describing a classification run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClassificationReport {
    pub classified: usize,
    pub tier_counts: IndexMap<Tier, usize>,
    pub hn_ready: usize,
    /// Properties with no usable point, which cannot be placed on the grid.
    pub unlocated: usize,
    /// Properties whose computed density was unusable and was replaced with 0.
    pub density_substituted: usize,
    #[serde(serialize_with = "serialize_warning")]
    pub spatial_data_unavailable: Option<SpatialDataUnavailableError>,
}

fn serialize_warning<S: serde::Serializer>(
    warning: &Option<SpatialDataUnavailableError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match warning {
        Some(warning) => serializer.serialize_some(&warning.to_string()),
        None => serializer.serialize_none(),
    }
}

impl ClassificationReport {
    fn tally(
        assignments: &[TierAssignment],
        unlocated: usize,
        density_substituted: usize,
        spatial_data_unavailable: Option<SpatialDataUnavailableError>,
    ) -> Self {
        let counts = assignments.iter().counts_by(|assignment| assignment.tier);

        Self {
            classified: assignments.len(),
            tier_counts: Tier::iter()
                .map(|tier| (tier, counts.get(&tier).copied().unwrap_or(0)))
                .collect(),
            hn_ready: assignments.iter().filter(|a| a.hn_ready).count(),
            unlocated,
            density_substituted,
            spatial_data_unavailable,
        }
    }
}

/// Attach tier columns to every property.
///
/// Runs over the whole population at once, since neighbourhood density needs every property's
/// demand. With no network or zone geometry at all, every property is given tier 5 and marked not
/// ready, and the report carries a warning.
#[instrument(skip_all, fields(properties = properties.len()))]
pub fn classify_properties(
    properties: &mut [Property],
    spatial: Option<&SpatialInputs>,
    config: &SpatialConfig,
) -> Result<ClassificationReport, ConfigurationError> {
    let spatial = match spatial {
        Some(inputs) if !inputs.is_empty() => inputs,
        _ => {
            let warning =
                SpatialDataUnavailableError("no network or zone geometries supplied".into());
            warn!("{warning}");
            let assignments = vec![TierAssignment::unclassifiable(); properties.len()];
            for (property, assignment) in properties.iter_mut().zip(&assignments) {
                property.attach_tiering(assignment);
            }
            let unlocated = properties.iter().filter(|p| p.location().is_none()).count();

            return Ok(ClassificationReport::tally(
                &assignments,
                unlocated,
                0,
                Some(warning),
            ));
        }
    };

    if spatial.has_planned_networks() && config.planned_network_buffer.is_none() {
        return Err(ConfigurationError::MissingPlannedNetworkBufferPolicy);
    }

    let projection =
        Projection::for_points(config.crs, properties.iter().filter_map(Property::location));
    let located: Vec<Option<Point>> = properties
        .iter()
        .map(|p| p.location().map(|point| projection.project(point)))
        .collect();

    let mut grid = HeatDensityGrid::new(config.cell_size_m, config.neighbourhood_radius_m);
    for (property, point) in properties.iter().zip(&located) {
        if let (Some(point), Some(annual_kwh)) = (point, property.raw_annual_kwh()) {
            grid.add(point, annual_kwh);
        }
    }
    let densities = grid.densities();
    debug!(
        occupied_cells = grid.occupied_cells(),
        "Aggregated annual demand into grid cells"
    );

    let indexes = NetworkIndexes::build(spatial, &projection, config);

    let outcomes: Vec<(TierAssignment, bool)> = located
        .par_iter()
        .map(|point| {
            let Some(point) = point else {
                return (TierAssignment::unclassifiable(), false);
            };

            let density = densities
                .get(&grid.cell_of(point))
                .copied()
                .unwrap_or(0.);
            let (density, substituted) = match checked_density(density) {
                Ok(density) => (density, false),
                Err(error) => {
                    debug!("{error}; treating density as 0");
                    (0., true)
                }
            };

            (
                assess(
                    indexes.existing.nearest_distance(point),
                    indexes.zones.contains(point),
                    indexes.planned.within_any(point),
                    density,
                    config,
                ),
                substituted,
            )
        })
        .collect();

    let (assignments, substituted): (Vec<TierAssignment>, Vec<bool>) = outcomes.into_iter().unzip();
    for (property, assignment) in properties.iter_mut().zip(&assignments) {
        property.attach_tiering(assignment);
    }

    let report = ClassificationReport::tally(
        &assignments,
        located.iter().filter(|point| point.is_none()).count(),
        substituted.iter().filter(|&&s| s).count(),
        None,
    );
    info!(
        classified = report.classified,
        hn_ready = report.hn_ready,
        unlocated = report.unlocated,
        "Classified properties into heat network tiers"
    );

    Ok(report)
}

fn checked_density(density: f64) -> Result<f64, ComputationError> {
    if density.is_finite() && density >= 0. {
        Ok(density)
    } else {
        Err(ComputationError::InvalidDensity(density))
    }
}

struct NetworkIndexes {
    existing: LineIndex,
    planned: BufferIndex,
    zones: PolygonIndex,
}

impl NetworkIndexes {
    fn build(spatial: &SpatialInputs, projection: &Projection, config: &SpatialConfig) -> Self {
        let bucket_size = config.index_bucket_size_m;

        let existing = LineIndex::new(
            spatial
                .networks
                .iter()
                .filter(|feature| feature.status.is_built_or_building())
                .flat_map(|feature| feature_lines(feature, projection, bucket_size)),
            bucket_size,
        );

        let planned = BufferIndex::new(
            config
                .planned_network_buffer
                .iter()
                .flat_map(|policy| {
                    spatial
                        .networks
                        .iter()
                        .filter(|feature| feature.status == NetworkStatus::Planned)
                        .flat_map(move |feature| {
                            let radius = match feature.geometry {
                                NetworkGeometry::Point(_) => {
                                    policy.radius_for(feature.reported_length_m)
                                }
                                NetworkGeometry::LineString(_) => policy.buffer_m(),
                            };
                            feature_lines(feature, projection, bucket_size)
                                .into_iter()
                                .map(move |line| (line, radius))
                        })
                })
                .collect_vec(),
            bucket_size,
        );

        let zones = PolygonIndex::new(
            spatial
                .zones
                .iter()
                .map(|zone| zone.map_coords(|coord| projection.project_coord(coord))),
            bucket_size,
        );

        debug!(
            existing_empty = existing.is_empty(),
            planned_empty = planned.is_empty(),
            zones_empty = zones.is_empty(),
            "Built spatial indexes"
        );

        Self {
            existing,
            planned,
            zones,
        }
    }
}

fn feature_lines(
    feature: &NetworkFeature,
    projection: &Projection,
    max_length: f64,
) -> Vec<Line<f64>> {
    match &feature.geometry {
        NetworkGeometry::Point(point) => vec![line_at(projection.project(*point))],
        NetworkGeometry::LineString(line_string) => lines_of(
            &line_string.map_coords(|coord| projection.project_coord(coord)),
            max_length,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlannedNetworkBuffer;
    use crate::core::scenario::tests::property_fixture;
    use crate::core::spatial::geometry::{LineString, Polygon};
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn config() -> SpatialConfig {
        SpatialConfig::default()
    }

    fn property_at(id: &str, x: f64, y: f64) -> Property {
        Property {
            id: id.into(),
            x: Some(x),
            y: Some(y),
            ..property_fixture()
        }
    }

    #[rstest]
    #[case(Some(50.), false, 0., Tier::ExistingNetwork)]
    #[case(Some(250.), false, 0., Tier::ExistingNetwork)]
    #[case(Some(251.), true, 50., Tier::PlannedOrZone)]
    #[case(None, false, 20., Tier::HighDensity)]
    #[case(Some(5_000.), false, 19.9, Tier::ModerateDensity)]
    #[case(Some(5_000.), false, 5., Tier::ModerateDensity)]
    #[case(Some(5_000.), false, 2., Tier::Low)]
    fn should_assign_first_matching_tier(
        config: SpatialConfig,
        #[case] distance: Option<f64>,
        #[case] in_zone: bool,
        #[case] density: f64,
        #[case] expected: Tier,
    ) {
        assert_eq!(assign_tier(distance, in_zone, density, &config), expected);
    }

    #[rstest]
    fn should_mark_readiness_only_for_tiers_one_to_three(config: SpatialConfig) {
        assert!(assess(Some(50.), false, false, 0., &config).hn_ready);
        assert!(assess(None, true, false, 0., &config).hn_ready);
        assert!(assess(None, false, true, 0., &config).hn_ready);
        assert!(assess(None, false, false, 25., &config).hn_ready);
        assert!(!assess(None, false, false, 10., &config).hn_ready);
        assert!(!assess(Some(5_000.), false, false, 2., &config).hn_ready);
    }

    #[rstest]
    fn should_fall_back_to_tier_five_without_spatial_data(config: SpatialConfig) {
        let mut properties = vec![property_at("a", 0., 0.), property_at("b", 10., 10.)];

        let report = classify_properties(&mut properties, None, &config).unwrap();

        assert!(report.spatial_data_unavailable.is_some());
        assert_eq!(report.tier_counts[&Tier::Low], 2);
        assert_eq!(report.hn_ready, 0);
        for property in &properties {
            assert_eq!(property.tier_number, Some(Tier::Low));
            assert_eq!(property.hn_ready, Some(false));
            assert_eq!(property.distance_to_network_m, None);
        }
    }

    #[rstest]
    fn should_require_planned_buffer_policy(config: SpatialConfig) {
        let spatial = SpatialInputs {
            networks: vec![NetworkFeature {
                status: NetworkStatus::Planned,
                geometry: NetworkGeometry::Point(Point::new(0., 0.)),
                reported_length_m: None,
            }],
            zones: vec![],
        };
        let mut properties = vec![property_at("a", 0., 0.)];

        assert_eq!(
            classify_properties(&mut properties, Some(&spatial), &config),
            Err(ConfigurationError::MissingPlannedNetworkBufferPolicy)
        );
    }

    #[rstest]
    fn should_classify_against_networks_zones_and_density(mut config: SpatialConfig) {
        config.planned_network_buffer =
            Some(PlannedNetworkBuffer::ReportedLength { buffer_m: 100. });
        let spatial = SpatialInputs {
            networks: vec![
                NetworkFeature {
                    status: NetworkStatus::Existing,
                    geometry: NetworkGeometry::LineString(LineString::from(vec![
                        (0., 0.),
                        (1_000., 0.),
                    ])),
                    reported_length_m: None,
                },
                NetworkFeature {
                    status: NetworkStatus::Planned,
                    geometry: NetworkGeometry::Point(Point::new(20_000., 0.)),
                    reported_length_m: Some(1_000.),
                },
            ],
            zones: vec![Polygon::new(
                LineString::from(vec![
                    (10_000., 10_000.),
                    (11_000., 10_000.),
                    (11_000., 11_000.),
                    (10_000., 11_000.),
                ]),
                vec![],
            )],
        };
        let mut properties = vec![
            property_at("near_existing", 500., 50.),
            property_at("in_zone", 10_500., 10_500.),
            property_at("near_planned", 20_550., 0.),
            property_at("far", 50_000., 50_000.),
            Property {
                x: None,
                ..property_at("unlocated", 0., 0.)
            },
        ];

        let report = classify_properties(&mut properties, Some(&spatial), &config).unwrap();

        let tiers = properties.iter().map(|p| p.tier_number).collect_vec();
        assert_eq!(
            tiers,
            vec![
                Some(Tier::ExistingNetwork),
                Some(Tier::PlannedOrZone),
                Some(Tier::PlannedOrZone),
                Some(Tier::Low),
                Some(Tier::Low),
            ]
        );
        assert_eq!(properties[0].distance_to_network_m, Some(50.));
        assert_eq!(properties[1].in_heat_zone, Some(true));
        assert_eq!(properties[2].in_heat_zone, Some(false));
        assert_eq!(properties[4].hn_ready, Some(false));
        assert_eq!(report.unlocated, 1);
        assert_eq!(report.hn_ready, 3);
        assert_eq!(report.tier_counts.values().sum::<usize>(), report.classified);
        assert!(report.spatial_data_unavailable.is_none());
    }
}
