//! Mock hazard reports for demos and manual testing.
//!
//! The AI results are fixed values; nothing here runs a classifier.

use crate::clock::Timestamp;
use crate::model::{AiClassification, CategoryTag, HazardReport};

/// A small set of reports covering every starting state.
pub fn mock_reports() -> Vec<HazardReport> {
    vec![
        HazardReport::new("HR-1001", "Blocked emergency exit")
            .with_reported_at(Timestamp::from_millis(1_717_400_000_000))
            .with_location("Warehouse B, north stairwell")
            .with_classification(
                AiClassification::new([CategoryTag::Tbc], 0.93)
                    .with_reasoning("Pallets stacked against the exit door in the photo"),
            ),
        HazardReport::new("HR-1002", "Exposed wiring near wash bay")
            .with_reported_at(Timestamp::from_millis(1_717_403_600_000))
            .with_location("Vehicle wash bay 2")
            .with_classification(
                AiClassification::new([CategoryTag::Gr, CategoryTag::Pspp], 0.78)
                    .with_reasoning("Open junction box within splash range of the hose"),
            ),
        HazardReport::new("HR-1003", "Missing handrail on mezzanine")
            .with_reported_at(Timestamp::from_millis(1_717_410_800_000))
            .with_location("Assembly hall mezzanine")
            .with_classification(
                AiClassification::new([CategoryTag::Pspp], 0.64)
                    .with_reasoning("Gap in the guard rail at the top of the ladder"),
            ),
        HazardReport::new("HR-1004", "Unlabelled chemical container")
            .with_reported_at(Timestamp::from_millis(1_717_414_400_000))
            .with_location("Lab 3 storage"),
        HazardReport::new("HR-1005", "Forklift speeding in pedestrian lane")
            .with_reported_at(Timestamp::from_millis(1_717_320_000_000))
            .with_location("Loading dock")
            .with_classification(
                AiClassification::new([CategoryTag::Tbc, CategoryTag::Gr], 0.88)
                    .with_reasoning("Report text mentions repeated near misses"),
            )
            .finalized(),
    ]
}
