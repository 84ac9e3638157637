use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use opentelemetry::KeyValue;
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::classpath::ClassTable;
use crate::complexity::MetricsAccumulator;
use crate::decoder::decode_class;
use crate::telemetry::{Telemetry, with_span};

/// Class descriptors and run totals collected from every decoded entry.
pub(crate) struct ScanOutput {
    pub(crate) classes: ClassTable,
    pub(crate) totals: MetricsAccumulator,
    pub(crate) entry_count: usize,
    pub(crate) replaced_count: usize,
}

impl ScanOutput {
    fn new() -> Self {
        Self {
            classes: ClassTable::new(),
            totals: MetricsAccumulator::default(),
            entry_count: 0,
            replaced_count: 0,
        }
    }
}

/// Decode every `.class` entry under `path`, which is either an archive or a
/// directory. The first entry that fails to decode aborts the scan.
pub(crate) fn scan_input(path: &Path, telemetry: Option<&Telemetry>) -> Result<ScanOutput> {
    let mut output = ScanOutput::new();
    if path.is_dir() {
        scan_dir(path, telemetry, &mut output)?;
    } else {
        scan_archive(path, telemetry, &mut output)?;
    }
    debug!(
        entries = output.entry_count,
        replaced = output.replaced_count,
        "scan finished"
    );
    Ok(output)
}

fn scan_dir(path: &Path, telemetry: Option<&Telemetry>, output: &mut ScanOutput) -> Result<()> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(path)
        .with_context(|| format!("failed to read directory {}", path.display()))?
    {
        let entry =
            entry.with_context(|| format!("failed to read entry under {}", path.display()))?;
        entries.push(entry.path());
    }

    entries.sort_by(|a, b| path_key(a).cmp(&path_key(b)));

    for entry in entries {
        if entry.is_dir() {
            scan_dir(&entry, telemetry, output)?;
        } else if is_class_name(&path_key(&entry)) {
            let data =
                fs::read(&entry).with_context(|| format!("failed to read {}", entry.display()))?;
            let label = entry.display().to_string();
            record_entry(&label, &data, telemetry, output)?;
        }
    }

    Ok(())
}

fn scan_archive(path: &Path, telemetry: Option<&Telemetry>, output: &mut ScanOutput) -> Result<()> {
    let file =
        fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut archive =
        ZipArchive::new(file).with_context(|| format!("failed to read {}", path.display()))?;

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .with_context(|| format!("failed to read {}", path.display()))?;
        if entry.is_dir() || !is_class_name(entry.name()) {
            continue;
        }
        let name = entry.name().to_string();
        let mut data = Vec::new();
        entry
            .read_to_end(&mut data)
            .with_context(|| format!("failed to read {}:{}", path.display(), name))?;
        drop(entry);
        let label = format!("{}:{}", path.display(), name);
        record_entry(&label, &data, telemetry, output)?;
    }

    Ok(())
}

fn record_entry(
    label: &str,
    data: &[u8],
    telemetry: Option<&Telemetry>,
    output: &mut ScanOutput,
) -> Result<()> {
    let span_attributes = [KeyValue::new("jarmetrics.entry", label.to_string())];
    let decoded = with_span(telemetry, "class.decode", &span_attributes, || {
        decode_class(data)
    })
    .with_context(|| format!("failed to decode {label}"))?;

    output.entry_count += 1;
    output.totals.record_class(&decoded);
    let name = decoded.descriptor.qualified_name.clone();
    if output.classes.insert(decoded.descriptor).is_some() {
        output.replaced_count += 1;
        warn!(class = %name, entry = %label, "duplicate class replaces earlier descriptor");
    }
    Ok(())
}

fn is_class_name(name: &str) -> bool {
    name.ends_with(".class")
}

fn path_key(path: &Path) -> String {
    path.to_string_lossy().to_string()
}
