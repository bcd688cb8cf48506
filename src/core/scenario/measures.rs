use crate::property::{GlazingType, InsulationLevel, Property};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

#[derive(
    Clone, Copy, Debug, Deserialize, Display, EnumIter, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MeasureId {
    LoftInsulation,
    WallInsulation,
    FloorInsulation,
    Glazing,
    DraughtProofing,
    EmitterUpgrade,
    AirSourceHeatPump,
    HeatNetworkConnection,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MeasureKind {
    /// Reduces demand through the building envelope.
    Fabric,
    /// Changes how the remaining heat demand is met.
    HeatingTechnology,
    /// Work needed to make a heating technology viable (emitters etc.).
    Enabling,
}

impl MeasureId {
    pub fn kind(&self) -> MeasureKind {
        match self {
            MeasureId::LoftInsulation
            | MeasureId::WallInsulation
            | MeasureId::FloorInsulation
            | MeasureId::Glazing
            | MeasureId::DraughtProofing => MeasureKind::Fabric,
            MeasureId::AirSourceHeatPump | MeasureId::HeatNetworkConnection => {
                MeasureKind::HeatingTechnology
            }
            MeasureId::EmitterUpgrade => MeasureKind::Enabling,
        }
    }

    pub fn is_fabric(&self) -> bool {
        self.kind() == MeasureKind::Fabric
    }
}

/// The state of a property's envelope as measures are applied to it.
///
/// This is per (property, scenario) state: the shared property record is never mutated.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FabricState {
    pub walls: InsulationLevel,
    pub loft: InsulationLevel,
    pub floor: InsulationLevel,
    pub glazing: GlazingType,
    pub draught_proofed: bool,
}

impl FabricState {
    pub fn of(property: &Property) -> Self {
        Self {
            walls: property.wall_insulation,
            loft: property.loft_insulation,
            floor: property.floor_insulation,
            glazing: property.glazing,
            draught_proofed: false,
        }
    }

    /// Whether applying the measure would change anything about the envelope.
    pub fn can_apply(&self, measure: MeasureId) -> bool {
        match measure {
            MeasureId::LoftInsulation => !self.loft.is_insulated(),
            MeasureId::WallInsulation => !self.walls.is_insulated(),
            MeasureId::FloorInsulation => !self.floor.is_insulated(),
            MeasureId::Glazing => self.glazing.is_upgradeable(),
            MeasureId::DraughtProofing => !self.draught_proofed,
            _ => false,
        }
    }

    pub fn apply(&mut self, measure: MeasureId) {
        match measure {
            MeasureId::LoftInsulation => self.loft = InsulationLevel::Insulated,
            MeasureId::WallInsulation => self.walls = InsulationLevel::Insulated,
            MeasureId::FloorInsulation => self.floor = InsulationLevel::Insulated,
            MeasureId::Glazing => self.glazing = GlazingType::Double,
            MeasureId::DraughtProofing => self.draught_proofed = true,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scenario::tests::property_fixture;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn should_classify_measure_kinds() {
        assert!(MeasureId::LoftInsulation.is_fabric());
        assert!(MeasureId::DraughtProofing.is_fabric());
        assert_eq!(
            MeasureId::AirSourceHeatPump.kind(),
            MeasureKind::HeatingTechnology
        );
        assert_eq!(MeasureId::EmitterUpgrade.kind(), MeasureKind::Enabling);
    }

    #[rstest]
    fn should_not_reapply_fabric_measures() {
        let property = property_fixture();
        let mut fabric = FabricState::of(&property);

        assert!(fabric.can_apply(MeasureId::WallInsulation));
        fabric.apply(MeasureId::WallInsulation);
        assert!(!fabric.can_apply(MeasureId::WallInsulation));
        assert_eq!(fabric.walls, InsulationLevel::Insulated);

        assert!(fabric.can_apply(MeasureId::Glazing));
        fabric.apply(MeasureId::Glazing);
        assert!(!fabric.can_apply(MeasureId::Glazing));

        assert!(!fabric.can_apply(MeasureId::AirSourceHeatPump));
    }

    #[rstest]
    fn should_display_measure_ids_in_snake_case() {
        assert_eq!(MeasureId::HeatNetworkConnection.to_string(), "heat_network_connection");
    }
}
