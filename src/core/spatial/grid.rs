use crate::core::spatial::geometry::Point;
use crate::core::units::{kwh_to_gwh, m2_to_km2};
use std::collections::HashMap;
use std::f64::consts::PI;

type CellKey = (i64, i64);

/// Annual heat demand summed into square cells, for neighbourhood heat density.
#[derive(Debug)]
pub(crate) struct HeatDensityGrid {
    cell_size_m: f64,
    radius_m: f64,
    cells: HashMap<CellKey, f64>,
    /// Cell offsets whose centres lie within the neighbourhood radius of a cell's centre.
    neighbourhood: Vec<CellKey>,
}

impl HeatDensityGrid {
    pub(crate) fn new(cell_size_m: f64, radius_m: f64) -> Self {
        let reach = (radius_m / cell_size_m).floor() as i64;
        let neighbourhood = (-reach..=reach)
            .flat_map(|dy| (-reach..=reach).map(move |dx| (dx, dy)))
            .filter(|(dx, dy)| {
                ((dx * dx + dy * dy) as f64).sqrt() * cell_size_m <= radius_m
            })
            .collect();

        Self {
            cell_size_m,
            radius_m,
            cells: Default::default(),
            neighbourhood,
        }
    }

    pub(crate) fn cell_of(&self, point: &Point) -> CellKey {
        (
            (point.x() / self.cell_size_m).floor() as i64,
            (point.y() / self.cell_size_m).floor() as i64,
        )
    }

    pub(crate) fn add(&mut self, point: &Point, annual_kwh: f64) {
        let key = self.cell_of(point);
        *self.cells.entry(key).or_default() += annual_kwh;
    }

    pub(crate) fn occupied_cells(&self) -> usize {
        self.cells.len()
    }

    /// Summed annual kWh of every occupied cell in the neighbourhood of the given cell.
    pub(crate) fn neighbourhood_kwh(&self, (cx, cy): CellKey) -> f64 {
        self.neighbourhood
            .iter()
            .filter_map(|(dx, dy)| self.cells.get(&(cx + dx, cy + dy)))
            .sum()
    }

    /// Heat density in GWh/km² over the circular neighbourhood of a cell.
    fn density_of(&self, key: CellKey) -> f64 {
        kwh_to_gwh(self.neighbourhood_kwh(key)) / m2_to_km2(PI * self.radius_m.powi(2))
    }

    /// Densities for every occupied cell, computed once so that properties sharing a cell do
    /// not repeat the neighbourhood sum.
    pub(crate) fn densities(&self) -> HashMap<CellKey, f64> {
        self.cells
            .keys()
            .map(|&key| (key, self.density_of(key)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn should_compute_density_of_single_cell() {
        let mut grid = HeatDensityGrid::new(125., 250.);
        grid.add(&Point::new(10., 10.), 1_000_000.);
        grid.add(&Point::new(100., 20.), 1_000_000.);

        assert_eq!(grid.occupied_cells(), 1);
        // 2 GWh over π × 0.25² km²
        assert_relative_eq!(
            grid.density_of(grid.cell_of(&Point::new(50., 50.))),
            2. / (PI * 0.0625),
            max_relative = 1e-12
        );
    }

    #[rstest]
    fn should_only_include_cells_with_centres_in_radius() {
        let mut grid = HeatDensityGrid::new(100., 150.);
        grid.add(&Point::new(50., 50.), 1.);
        // one cell across: centre 100 m away
        grid.add(&Point::new(150., 50.), 10.);
        // diagonal: centre 141 m away
        grid.add(&Point::new(150., 150.), 100.);
        // two cells across: centre 200 m away
        grid.add(&Point::new(250., 50.), 1_000.);

        assert_eq!(grid.neighbourhood_kwh((0, 0)), 111.);
    }

    #[rstest]
    fn should_give_empty_space_zero_density() {
        let grid = HeatDensityGrid::new(125., 250.);
        assert_eq!(grid.density_of(grid.cell_of(&Point::new(0., 0.))), 0.);
        assert!(grid.densities().is_empty());
    }

    #[rstest]
    fn should_share_densities_between_lookups() {
        let mut grid = HeatDensityGrid::new(125., 250.);
        grid.add(&Point::new(10., 10.), 5_000.);
        grid.add(&Point::new(260., 10.), 7_000.);

        let densities = grid.densities();
        for point in [Point::new(10., 10.), Point::new(260., 10.)] {
            let key = grid.cell_of(&point);
            assert_eq!(densities[&key], grid.density_of(key));
        }
    }
}
