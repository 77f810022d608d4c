use serde::Serialize;

/// One tier of the fixed grading scale: a letter, an inclusive score range,
/// and the remark/color the display layers attach to it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeBand {
    pub letter: &'static str,
    pub low: f64,
    pub high: f64,
    pub remark: &'static str,
    pub color: &'static str,
}

/// Scanned top-down, first match wins. Order and disjointness are part of
/// the contract; keep this a list, not a map.
pub const GRADE_BANDS: [GradeBand; 5] = [
    GradeBand {
        letter: "A",
        low: 90.0,
        high: 100.0,
        remark: "Excellent Performance!",
        color: "#00FF41",
    },
    GradeBand {
        letter: "B",
        low: 80.0,
        high: 89.0,
        remark: "Very Good! Keep it up.",
        color: "#00E676",
    },
    GradeBand {
        letter: "C",
        low: 70.0,
        high: 79.0,
        remark: "Good, but there's room for improvement.",
        color: "#FFEA00",
    },
    GradeBand {
        letter: "D",
        low: 60.0,
        high: 69.0,
        remark: "Needs more effort.",
        color: "#FF9100",
    },
    GradeBand {
        letter: "F",
        low: 0.0,
        high: 59.0,
        remark: "Failed. Please work harder.",
        color: "#FF1744",
    },
];

/// Answer for values outside [0, 100]. Validated inputs never produce such
/// an average, so any sighting of this band past the tests is an upstream bug.
pub const INVALID_BAND: GradeBand = GradeBand {
    letter: "F",
    low: 0.0,
    high: 59.0,
    remark: "Invalid score",
    color: "#FF1744",
};

/// Arithmetic mean, unrounded. Display layers round; 0.0 for no scores.
pub fn calculate_average(scores: &[i64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    let sum: i64 = scores.iter().sum();
    (sum as f64) / (scores.len() as f64)
}

/// Maps an average onto the band table. The bands partition [0, 100] with no
/// gap: the scan takes the first band whose lower bound the value clears, so
/// fractional averages between integer bounds (89.5) land in the band below.
pub fn assign_grade(average: f64) -> &'static GradeBand {
    if !(0.0..=100.0).contains(&average) {
        return &INVALID_BAND;
    }
    for band in &GRADE_BANDS {
        if average >= band.low {
            return band;
        }
    }
    &INVALID_BAND
}

/// Band for a single subject score, used by the per-subject export column
/// and the bar-chart coloring.
pub fn band_for_score(score: i64) -> &'static GradeBand {
    assign_grade(score as f64)
}
