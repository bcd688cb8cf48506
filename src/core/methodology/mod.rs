pub mod baseline;
pub mod cop;
pub mod flow_temperature;
pub mod uncertainty;

use bitflags::bitflags;
use itertools::Itertools;

bitflags! {
    /// Methodological adjustments that could not be made as intended for a property, and the
    /// safe default used instead.
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct AdjustmentFlags: u8 {
        /// No EPC band, so the baseline was used uncorrected.
        const PREBOUND_SKIPPED = 1;
        /// No EPC band, so fabric savings were taken in full.
        const REBOUND_SKIPPED = 1 << 1;
        /// No SAP score, so the configured maximum flow temperature was assumed.
        const FLOW_TEMPERATURE_DEFAULTED = 1 << 2;
        /// COP lookup failed, so the worst point on the curve was used.
        const COP_DEFAULTED = 1 << 3;
        /// No SAP score, so no post-retrofit EPC estimate was made.
        const SAP_ESTIMATE_UNAVAILABLE = 1 << 4;
        /// Tier columns missing, so the property was treated as tier 5 and not ready.
        const TIERING_MISSING = 1 << 5;
        /// Upstream validation flagged the record.
        const ANOMALY = 1 << 6;
    }
}

impl AdjustmentFlags {
    /// Flag names joined by `|`, empty when nothing was flagged.
    pub fn describe(&self) -> String {
        self.iter_names()
            .map(|(name, _)| name.to_lowercase())
            .join("|")
    }

    /// Whether anything other than the upstream anomaly marker was raised.
    pub fn has_adjustment_issues(&self) -> bool {
        !self.difference(AdjustmentFlags::ANOMALY).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn should_describe_flags() {
        assert_eq!(AdjustmentFlags::empty().describe(), "");
        assert_eq!(
            (AdjustmentFlags::PREBOUND_SKIPPED | AdjustmentFlags::COP_DEFAULTED).describe(),
            "prebound_skipped|cop_defaulted"
        );
    }

    #[rstest]
    fn should_not_count_anomaly_as_adjustment_issue() {
        assert!(!AdjustmentFlags::ANOMALY.has_adjustment_issues());
        assert!((AdjustmentFlags::ANOMALY | AdjustmentFlags::TIERING_MISSING).has_adjustment_issues());
    }
}
