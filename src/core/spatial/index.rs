use crate::core::spatial::geometry::{LineString, Point, Polygon};
use geo::{BoundingRect, Contains, Coord, Densify, EuclideanDistance, Line, Rect};
use std::collections::HashMap;

type BucketKey = (i64, i64);

/// Items bucketed by the square cells their bounding boxes overlap.
///
/// Only occupied buckets are stored, so memory follows the extent of the geometry actually
/// indexed rather than the extent of the study area.
#[derive(Debug)]
struct Buckets {
    bucket_size: f64,
    buckets: HashMap<BucketKey, Vec<usize>>,
    /// Range of occupied bucket keys, (min, max) on each axis.
    occupied: Option<(BucketKey, BucketKey)>,
}

impl Buckets {
    fn new(bucket_size: f64) -> Self {
        Self {
            bucket_size,
            buckets: Default::default(),
            occupied: None,
        }
    }

    fn key_of(&self, coord: Coord<f64>) -> BucketKey {
        (
            (coord.x / self.bucket_size).floor() as i64,
            (coord.y / self.bucket_size).floor() as i64,
        )
    }

    fn insert(&mut self, item: usize, bbox: &Rect<f64>) {
        let (min_bx, min_by) = self.key_of(bbox.min());
        let (max_bx, max_by) = self.key_of(bbox.max());

        for by in min_by..=max_by {
            for bx in min_bx..=max_bx {
                self.buckets.entry((bx, by)).or_default().push(item);
            }
        }

        self.occupied = Some(match self.occupied {
            None => ((min_bx, min_by), (max_bx, max_by)),
            Some(((lo_x, lo_y), (hi_x, hi_y))) => (
                (lo_x.min(min_bx), lo_y.min(min_by)),
                (hi_x.max(max_bx), hi_y.max(max_by)),
            ),
        });
    }

    fn at(&self, key: BucketKey) -> &[usize] {
        self.buckets.get(&key).map_or(&[], Vec::as_slice)
    }

    /// Items in the buckets at Chebyshev distance exactly `ring` from `centre`, restricted to
    /// the occupied range.
    fn ring(&self, centre: BucketKey, ring: i64) -> impl Iterator<Item = usize> + '_ {
        let ((lo_x, lo_y), (hi_x, hi_y)) = self.occupied.unwrap_or(((0, 0), (-1, -1)));
        let (cx, cy) = centre;

        ((cy - ring).max(lo_y)..=(cy + ring).min(hi_y))
            .flat_map(move |by| {
                let on_edge_row = (by - cy).abs() == ring;
                let xs: Box<dyn Iterator<Item = i64>> = if on_edge_row {
                    Box::new((cx - ring).max(lo_x)..=(cx + ring).min(hi_x))
                } else {
                    Box::new(
                        [cx - ring, cx + ring]
                            .into_iter()
                            .filter(move |bx| (lo_x..=hi_x).contains(bx)),
                    )
                };
                xs.map(move |bx| (bx, by))
            })
            .flat_map(|key| self.at(key).iter().copied())
    }

    /// Chebyshev bucket distance beyond which no occupied bucket lies.
    fn max_ring(&self, centre: BucketKey) -> Option<i64> {
        let ((lo_x, lo_y), (hi_x, hi_y)) = self.occupied?;
        let (cx, cy) = centre;

        Some(
            [cx - lo_x, hi_x - cx, cy - lo_y, hi_y - cy]
                .into_iter()
                .max()
                .unwrap_or(0)
                .max(0),
        )
    }

    /// Chebyshev bucket distance from `centre` to the nearest occupied bucket range.
    fn min_ring(&self, centre: BucketKey) -> i64 {
        let Some(((lo_x, lo_y), (hi_x, hi_y))) = self.occupied else {
            return 0;
        };
        let (cx, cy) = centre;
        let gap = |c: i64, lo: i64, hi: i64| (lo - c).max(c - hi).max(0);

        gap(cx, lo_x, hi_x).max(gap(cy, lo_y, hi_y))
    }
}

/// Break a line string into consecutive lines no longer than `max_length`, so that each touches
/// only a few buckets. Fewer than two vertices gives no lines.
pub(crate) fn lines_of(line_string: &LineString, max_length: f64) -> Vec<Line<f64>> {
    if line_string.0.len() < 2 {
        return vec![];
    }

    line_string.densify(max_length).lines().collect()
}

/// A point feature, as a line of zero length.
pub(crate) fn line_at(point: Point) -> Line<f64> {
    Line::new(point.0, point.0)
}

fn expanded(rect: Rect<f64>, margin: f64) -> Rect<f64> {
    Rect::new(
        Coord {
            x: rect.min().x - margin,
            y: rect.min().y - margin,
        },
        Coord {
            x: rect.max().x + margin,
            y: rect.max().y + margin,
        },
    )
}

/// Network lines for nearest-distance queries.
#[derive(Debug)]
pub(crate) struct LineIndex {
    lines: Vec<Line<f64>>,
    buckets: Buckets,
}

impl LineIndex {
    pub(crate) fn new(lines: impl IntoIterator<Item = Line<f64>>, bucket_size: f64) -> Self {
        let mut buckets = Buckets::new(bucket_size);
        let lines: Vec<Line<f64>> = lines.into_iter().collect();
        for (i, line) in lines.iter().enumerate() {
            buckets.insert(i, &line.bounding_rect());
        }

        Self { lines, buckets }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Exact distance to the nearest line, searching outward ring by ring.
    ///
    /// After ring k has been searched, anything not yet seen lies at least k bucket widths
    /// away, so the search stops as soon as the best distance found is within that bound.
    pub(crate) fn nearest_distance(&self, point: &Point) -> Option<f64> {
        let centre = self.buckets.key_of(point.0);
        let max_ring = self.buckets.max_ring(centre)?;
        let mut best = f64::INFINITY;

        for ring in self.buckets.min_ring(centre)..=max_ring {
            for i in self.buckets.ring(centre, ring) {
                best = best.min(point.euclidean_distance(&self.lines[i]));
            }
            if best <= ring as f64 * self.buckets.bucket_size {
                break;
            }
        }

        best.is_finite().then_some(best)
    }
}

/// Lines (or points) each with their own buffer radius, for "within reach of" queries.
#[derive(Debug)]
pub(crate) struct BufferIndex {
    items: Vec<(Line<f64>, f64)>,
    buckets: Buckets,
}

impl BufferIndex {
    pub(crate) fn new(items: impl IntoIterator<Item = (Line<f64>, f64)>, bucket_size: f64) -> Self {
        let mut buckets = Buckets::new(bucket_size);
        let items: Vec<(Line<f64>, f64)> = items.into_iter().collect();
        for (i, (line, radius)) in items.iter().enumerate() {
            buckets.insert(i, &expanded(line.bounding_rect(), *radius));
        }

        Self { items, buckets }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn within_any(&self, point: &Point) -> bool {
        self.buckets
            .at(self.buckets.key_of(point.0))
            .iter()
            .any(|&i| {
                let (line, radius) = &self.items[i];
                point.euclidean_distance(line) <= *radius
            })
    }
}

/// Zone polygons for containment queries.
#[derive(Debug)]
pub(crate) struct PolygonIndex {
    polygons: Vec<(Polygon, Rect<f64>)>,
    buckets: Buckets,
}

impl PolygonIndex {
    /// Polygons without any vertices are dropped.
    pub(crate) fn new(polygons: impl IntoIterator<Item = Polygon>, bucket_size: f64) -> Self {
        let mut buckets = Buckets::new(bucket_size);
        let polygons: Vec<(Polygon, Rect<f64>)> = polygons
            .into_iter()
            .filter_map(|polygon| {
                let bbox = polygon.bounding_rect()?;
                Some((polygon, bbox))
            })
            .collect();
        for (i, (_, bbox)) in polygons.iter().enumerate() {
            buckets.insert(i, bbox);
        }

        Self { polygons, buckets }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Strictly inside some zone (and outside its holes); boundaries do not count.
    pub(crate) fn contains(&self, point: &Point) -> bool {
        self.buckets
            .at(self.buckets.key_of(point.0))
            .iter()
            .map(|&i| &self.polygons[i])
            .filter(|(_, bbox)| bbox.contains(point))
            .any(|(polygon, _)| polygon.contains(point))
    }
}
