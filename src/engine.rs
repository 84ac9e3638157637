use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use tracing::{debug, info};

use crate::hierarchy::ClassGraph;
use crate::metrics::{MetricsReport, aggregate};
use crate::overrides::count_overrides;
use crate::scan::scan_input;
use crate::telemetry::{Telemetry, in_phase};

/// Wall-clock time spent in each phase.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct PhaseTimings {
    pub(crate) scan_ms: u128,
    pub(crate) hierarchy_ms: u128,
    pub(crate) overrides_ms: u128,
    pub(crate) total_ms: u128,
}

/// Report for one input together with how long it took to build.
pub(crate) struct AnalysisOutput {
    pub(crate) report: MetricsReport,
    pub(crate) timings: PhaseTimings,
    pub(crate) class_count: usize,
}

/// Decode every class under `input`, then derive depth and override
/// statistics from the completed class table.
///
/// Nothing is aggregated unless every entry decoded.
pub(crate) fn analyze(input: &Path, telemetry: Option<&Telemetry>) -> Result<AnalysisOutput> {
    let started_at = Instant::now();

    let scan_started_at = Instant::now();
    let scan = in_phase(telemetry, "scan", || scan_input(input, telemetry))?;
    let scan_ms = scan_started_at.elapsed().as_millis();
    info!(
        classes = scan.entry_count,
        methods = scan.totals.method_count,
        "decoded class entries"
    );

    let hierarchy_started_at = Instant::now();
    let depths = in_phase(telemetry, "hierarchy", || {
        let graph = ClassGraph::build(&scan.classes);
        debug!(
            nodes = scan.classes.len(),
            edges = graph.edge_count(),
            "built class graph"
        );
        graph.depths()
    });
    let hierarchy_ms = hierarchy_started_at.elapsed().as_millis();
    let unresolved = scan.classes.unresolved_parents();
    if !unresolved.is_empty() {
        debug!(
            count = unresolved.len(),
            names = ?unresolved,
            "parents outside the input"
        );
    }
    info!(
        reachable = depths.reachable_count(),
        max_depth = depths.max_depth(),
        "computed inheritance depths"
    );

    let overrides_started_at = Instant::now();
    let tally = in_phase(telemetry, "overrides", || count_overrides(&scan.classes));
    let overrides_ms = overrides_started_at.elapsed().as_millis();
    debug!(
        superclass = tally.superclass,
        interface = tally.interface,
        "counted overrides"
    );

    let archive_name = input.display().to_string();
    let report = in_phase(telemetry, "aggregate", || {
        aggregate(archive_name, &scan.totals, &depths, &tally)
    });

    Ok(AnalysisOutput {
        report,
        timings: PhaseTimings {
            scan_ms,
            hierarchy_ms,
            overrides_ms,
            total_ms: started_at.elapsed().as_millis(),
        },
        class_count: scan.entry_count,
    })
}
