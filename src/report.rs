use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Serializer;
use serde_json::ser::PrettyFormatter;

use crate::metrics::MetricsReport;

/// Render the report as JSON indented with four spaces.
pub(crate) fn render_report(report: &MetricsReport) -> Result<String> {
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = Serializer::with_formatter(&mut buffer, formatter);
    report
        .serialize(&mut serializer)
        .context("failed to serialize metrics report")?;
    String::from_utf8(buffer).context("metrics report is not valid UTF-8")
}

/// Write a rendered report followed by a newline.
pub(crate) fn write_report(rendered: &str, path: &Path) -> Result<()> {
    let mut contents = String::with_capacity(rendered.len() + 1);
    contents.push_str(rendered);
    contents.push('\n');
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn sample_report() -> MetricsReport {
        MetricsReport {
            archive_name: "app.jar".to_string(),
            fields_average: 1.5,
            assignments: 3,
            branches: 4,
            conditions: 12,
            abc: 13.0,
            max_inheritance_depth: 3,
            average_inheritance_depth: 2.5,
            average_overridden_methods: 0.25,
            methods: 8,
            overridden_methods: 2,
        }
    }

    fn report_schema() -> Value {
        let number_or_null = json!({ "type": ["number", "null"] });
        let count = json!({ "type": "integer", "minimum": 0 });
        json!({
            "type": "object",
            "additionalProperties": false,
            "required": [
                "archiveName", "fieldsAverage", "A", "B", "C", "ABC",
                "maxInheritanceDepth", "averageInheritanceDepth",
                "averageOverriddenMethods", "methods", "overridenMethods"
            ],
            "properties": {
                "archiveName": { "type": "string" },
                "fieldsAverage": number_or_null,
                "A": count,
                "B": count,
                "C": count,
                "ABC": { "type": "number", "minimum": 0 },
                "maxInheritanceDepth": { "type": "integer", "minimum": -1 },
                "averageInheritanceDepth": number_or_null,
                "averageOverriddenMethods": number_or_null,
                "methods": count,
                "overridenMethods": count
            }
        })
    }

    #[test]
    fn fields_appear_in_declaration_order() {
        let rendered = render_report(&sample_report()).expect("render");
        let keys: Vec<&str> = rendered
            .lines()
            .filter_map(|line| line.trim_start().strip_prefix('"'))
            .filter_map(|line| line.split('"').next())
            .collect();

        assert_eq!(
            keys,
            vec![
                "archiveName",
                "fieldsAverage",
                "A",
                "B",
                "C",
                "ABC",
                "maxInheritanceDepth",
                "averageInheritanceDepth",
                "averageOverriddenMethods",
                "methods",
                "overridenMethods",
            ]
        );
    }

    #[test]
    fn uses_four_space_indent() {
        let rendered = render_report(&sample_report()).expect("render");

        assert!(rendered.starts_with("{\n    \"archiveName\": \"app.jar\",\n"));
        assert!(rendered.ends_with("\n}"));
    }

    #[test]
    fn nan_serializes_as_null() {
        let mut report = sample_report();
        report.fields_average = f64::NAN;
        report.average_inheritance_depth = f64::NAN;
        report.average_overridden_methods = f64::NAN;
        report.max_inheritance_depth = -1;

        let rendered = render_report(&report).expect("render");
        let value: Value = serde_json::from_str(&rendered).expect("parse");

        assert!(value["fieldsAverage"].is_null());
        assert!(value["averageInheritanceDepth"].is_null());
        assert!(value["averageOverriddenMethods"].is_null());
        assert_eq!(value["maxInheritanceDepth"], -1);
        assert!(jsonschema::is_valid(&report_schema(), &value));
    }

    #[test]
    fn rendered_report_matches_schema() {
        let rendered = render_report(&sample_report()).expect("render");
        let value: Value = serde_json::from_str(&rendered).expect("parse");

        assert!(jsonschema::is_valid(&report_schema(), &value));
        assert_eq!(value["ABC"], 13.0);
        assert_eq!(value["overridenMethods"], 2);
    }

    #[test]
    fn write_report_appends_newline() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("metrics.json");

        write_report("{}", &path).expect("write");

        assert_eq!(fs::read_to_string(&path).expect("read"), "{}\n");
    }

    #[test]
    fn write_report_fails_for_missing_directory() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("missing").join("metrics.json");

        let err = write_report("{}", &path).expect_err("missing parent");

        assert!(err.to_string().contains("failed to write"));
    }
}
