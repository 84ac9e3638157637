use serde::Serialize;

use crate::complexity::MetricsAccumulator;
use crate::hierarchy::DepthStats;
use crate::overrides::OverrideTally;

/// Final metrics record for one archive.
///
/// Ratios with a zero denominator are NaN and serialize as `null`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub(crate) struct MetricsReport {
    #[serde(rename = "archiveName")]
    pub(crate) archive_name: String,
    #[serde(rename = "fieldsAverage")]
    pub(crate) fields_average: f64,
    #[serde(rename = "A")]
    pub(crate) assignments: u64,
    #[serde(rename = "B")]
    pub(crate) branches: u64,
    #[serde(rename = "C")]
    pub(crate) conditions: u64,
    #[serde(rename = "ABC")]
    pub(crate) abc: f64,
    #[serde(rename = "maxInheritanceDepth")]
    pub(crate) max_inheritance_depth: i64,
    #[serde(rename = "averageInheritanceDepth")]
    pub(crate) average_inheritance_depth: f64,
    #[serde(rename = "averageOverriddenMethods")]
    pub(crate) average_overridden_methods: f64,
    pub(crate) methods: u64,
    #[serde(rename = "overridenMethods")]
    pub(crate) overridden_methods: u64,
}

/// Combine the run totals, depth statistics and override tally into the report.
pub(crate) fn aggregate(
    archive_name: impl Into<String>,
    totals: &MetricsAccumulator,
    depths: &DepthStats,
    overrides: &OverrideTally,
) -> MetricsReport {
    let overridden_methods = overrides.total();
    MetricsReport {
        archive_name: archive_name.into(),
        fields_average: ratio(totals.field_count, totals.class_count),
        assignments: totals.assignments,
        branches: totals.branches,
        conditions: totals.conditions,
        abc: abc_magnitude(totals.assignments, totals.branches, totals.conditions),
        max_inheritance_depth: depths.max_depth(),
        average_inheritance_depth: depths.average_depth(),
        average_overridden_methods: ratio(overridden_methods, totals.method_count),
        methods: totals.method_count,
        overridden_methods,
    }
}

/// Euclidean length of the (A, B, C) vector.
pub(crate) fn abc_magnitude(assignments: u64, branches: u64, conditions: u64) -> f64 {
    let a = assignments as f64;
    let b = branches as f64;
    let c = conditions as f64;
    (a * a + b * b + c * c).sqrt()
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return f64::NAN;
    }
    numerator as f64 / denominator as f64
}
