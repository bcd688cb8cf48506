use crate::core::spatial::geometry::Point;
use crate::core::spatial::{Tier, TierAssignment};
use serde::{Deserialize, Serialize};
use std::io::Read;
use strum::{Display, EnumIter, IntoEnumIterator};

pub type PropertyId = smartstring::alias::String;

pub fn read_properties(csv: impl Read) -> anyhow::Result<Vec<Property>> {
    Ok(csv::Reader::from_reader(csv)
        .deserialize::<Property>()
        .collect::<Result<_, _>>()?)
}

/// One dwelling, as produced by upstream cleaning and categorisation.
///
/// The tier columns are absent until the spatial classifier has run (or were attached by an
/// earlier classification run and read back in).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Property {
    pub id: PropertyId,
    pub floor_area_m2: Option<f64>,
    /// kWh/m²/yr
    pub baseline_intensity_kwh_per_m2: Option<f64>,
    pub epc_band: Option<EpcBand>,
    pub sap_score: Option<f64>,
    pub wall_insulation: InsulationLevel,
    pub loft_insulation: InsulationLevel,
    pub floor_insulation: InsulationLevel,
    pub glazing: GlazingType,
    pub heating: HeatingType,
    /// Easting (or longitude, for WGS84 inputs)
    pub x: Option<f64>,
    /// Northing (or latitude, for WGS84 inputs)
    pub y: Option<f64>,
    /// Set upstream when validation noticed something unusual about the record.
    #[serde(default)]
    pub anomaly: bool,
    #[serde(default)]
    pub tier_number: Option<Tier>,
    #[serde(default)]
    pub distance_to_network_m: Option<f64>,
    #[serde(default)]
    pub in_heat_zone: Option<bool>,
    #[serde(default)]
    pub heat_density_gwh_km2: Option<f64>,
    #[serde(default)]
    pub hn_ready: Option<bool>,
}

impl Property {
    pub fn location(&self) -> Option<Point> {
        match (self.x, self.y) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some(Point::new(x, y)),
            _ => None,
        }
    }

    /// Annual demand from the raw record, before any methodological correction.
    pub fn raw_annual_kwh(&self) -> Option<f64> {
        match (self.floor_area_m2, self.baseline_intensity_kwh_per_m2) {
            (Some(area), Some(intensity)) if area > 0. && intensity >= 0. => Some(area * intensity),
            _ => None,
        }
    }

    pub fn attach_tiering(&mut self, assignment: &TierAssignment) {
        self.tier_number = Some(assignment.tier);
        self.distance_to_network_m = assignment.distance_to_network_m;
        self.in_heat_zone = Some(assignment.in_heat_zone);
        self.heat_density_gwh_km2 = Some(assignment.heat_density_gwh_km2);
        self.hn_ready = Some(assignment.hn_ready);
    }

    /// The tier columns, if classification has happened.
    pub fn tiering(&self) -> Option<TierAssignment> {
        Some(TierAssignment {
            tier: self.tier_number?,
            distance_to_network_m: self.distance_to_network_m,
            in_heat_zone: self.in_heat_zone.unwrap_or(false),
            near_planned_network: false,
            heat_density_gwh_km2: self.heat_density_gwh_km2.unwrap_or(0.),
            hn_ready: self.hn_ready?,
        })
    }
}

/// Energy performance certificate band. Ordering runs from best (A) to worst (G).
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Display,
    EnumIter,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
pub enum EpcBand {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
}

impl EpcBand {
    /// Lower SAP score bound of each band.
    const fn lower_sap_bound(&self) -> f64 {
        match self {
            EpcBand::A => 92.,
            EpcBand::B => 81.,
            EpcBand::C => 69.,
            EpcBand::D => 55.,
            EpcBand::E => 39.,
            EpcBand::F => 21.,
            EpcBand::G => f64::NEG_INFINITY,
        }
    }

    pub fn from_sap(sap: f64) -> Self {
        EpcBand::iter()
            .find(|band| sap >= band.lower_sap_bound())
            .unwrap_or(EpcBand::G)
    }

    /// Highest SAP score still inside this band (SAP scores being whole points).
    pub fn upper_sap_bound(&self) -> f64 {
        match self.improved_by(1) {
            better if better == *self => 100.,
            better => better.lower_sap_bound() - 1.,
        }
    }

    pub fn rank(&self) -> usize {
        *self as usize
    }

    /// The band `steps` better than this one, stopping at A.
    pub fn improved_by(&self, steps: usize) -> Self {
        let rank = self.rank().saturating_sub(steps);
        EpcBand::iter().nth(rank).unwrap_or(EpcBand::A)
    }

    /// How many bands better `self` is than `other` (negative when worse).
    pub fn bands_better_than(&self, other: EpcBand) -> i64 {
        other.rank() as i64 - self.rank() as i64
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InsulationLevel {
    Uninsulated,
    Partial,
    Insulated,
}

impl InsulationLevel {
    pub fn is_insulated(&self) -> bool {
        matches!(self, InsulationLevel::Insulated)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GlazingType {
    Single,
    Secondary,
    Double,
    Triple,
}

impl GlazingType {
    pub fn is_single(&self) -> bool {
        matches!(self, GlazingType::Single)
    }

    pub fn is_upgradeable(&self) -> bool {
        matches!(self, GlazingType::Single | GlazingType::Secondary)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HeatingType {
    GasBoiler,
    OilBoiler,
    LpgBoiler,
    SolidFuel,
    DirectElectric,
    StorageHeaters,
    HeatPump,
    HeatNetwork,
}

impl HeatingType {
    pub fn fuel(&self) -> Fuel {
        match self {
            HeatingType::GasBoiler => Fuel::MainsGas,
            HeatingType::OilBoiler => Fuel::Oil,
            HeatingType::LpgBoiler => Fuel::Lpg,
            HeatingType::SolidFuel => Fuel::SolidFuel,
            HeatingType::DirectElectric | HeatingType::StorageHeaters | HeatingType::HeatPump => {
                Fuel::Electricity
            }
            HeatingType::HeatNetwork => Fuel::HeatNetwork,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Display, EnumIter, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Fuel {
    MainsGas,
    Electricity,
    Oil,
    Lpg,
    SolidFuel,
    HeatNetwork,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use std::io::Cursor;

    #[rstest]
    #[case(95., EpcBand::A)]
    #[case(92., EpcBand::A)]
    #[case(91.5, EpcBand::B)]
    #[case(69., EpcBand::C)]
    #[case(60., EpcBand::D)]
    #[case(39., EpcBand::E)]
    #[case(21., EpcBand::F)]
    #[case(5., EpcBand::G)]
    #[case(-3., EpcBand::G)]
    fn should_map_sap_to_band(#[case] sap: f64, #[case] expected: EpcBand) {
        assert_eq!(EpcBand::from_sap(sap), expected);
    }

    #[rstest]
    fn should_improve_bands_stopping_at_a() {
        assert_eq!(EpcBand::E.improved_by(2), EpcBand::C);
        assert_eq!(EpcBand::B.improved_by(3), EpcBand::A);
        assert_eq!(EpcBand::C.bands_better_than(EpcBand::E), 2);
        assert_eq!(EpcBand::G.bands_better_than(EpcBand::F), -1);
    }

    #[rstest]
    fn should_give_upper_sap_bounds() {
        assert_eq!(EpcBand::A.upper_sap_bound(), 100.);
        assert_eq!(EpcBand::B.upper_sap_bound(), 91.);
        assert_eq!(EpcBand::G.upper_sap_bound(), 20.);
    }

    #[rstest]
    fn should_read_properties_from_csv() {
        let csv = "id,floor_area_m2,baseline_intensity_kwh_per_m2,epc_band,sap_score,wall_insulation,loft_insulation,floor_insulation,glazing,heating,x,y,anomaly,tier_number,distance_to_network_m,in_heat_zone,heat_density_gwh_km2,hn_ready\n\
                   p1,100,200,D,60,uninsulated,partial,uninsulated,double,gas_boiler,530000,180000,false,,,,,\n\
                   p2,,150,,,insulated,insulated,insulated,single,direct_electric,,,true,2,40.5,true,12.5,true\n";
        let properties = read_properties(Cursor::new(csv)).unwrap();

        assert_eq!(properties.len(), 2);
        assert_eq!(properties[0].id.as_str(), "p1");
        assert_eq!(properties[0].raw_annual_kwh(), Some(20_000.));
        assert_eq!(properties[0].location(), Some(Point::new(530_000., 180_000.)));
        assert_eq!(properties[0].tiering(), None);
        assert_eq!(properties[1].floor_area_m2, None);
        assert_eq!(properties[1].raw_annual_kwh(), None);
        assert_eq!(properties[1].location(), None);
        assert_eq!(properties[1].heating.fuel(), Fuel::Electricity);

        let tiering = properties[1].tiering().unwrap();
        assert_eq!(tiering.tier, Tier::PlannedOrZone);
        assert_eq!(tiering.distance_to_network_m, Some(40.5));
        assert!(tiering.hn_ready);
    }
}
