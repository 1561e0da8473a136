//! Export of the aggregated table.
//!
//! This module renders the aggregated table as CSV, JSON (with run
//! metadata) or a Markdown table.

use crate::cli::ExportFormat;
use crate::models::{AggregatedTable, ReportMetadata};
use anyhow::{Context, Result};
use serde_json::{json, Map, Value};
use std::path::Path;

/// Header row: key columns, value columns, then `count`.
fn header(table: &AggregatedTable) -> Vec<String> {
    table
        .key_columns
        .iter()
        .chain(table.value_columns.iter())
        .cloned()
        .chain(std::iter::once("count".to_string()))
        .collect()
}

/// Generate the table as CSV with a header row.
pub fn generate_csv_table(table: &AggregatedTable) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(header(table))?;

    for row in &table.rows {
        let record: Vec<String> = row
            .key
            .iter()
            .map(|k| k.to_string())
            .chain(row.values.iter().map(|v| v.to_string()))
            .chain(std::iter::once(row.count.to_string()))
            .collect();
        writer.write_record(&record)?;
    }

    let bytes = writer.into_inner().context("Failed to flush CSV output")?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

/// Generate a JSON report: metadata plus one object per aggregated row.
pub fn generate_json_report(table: &AggregatedTable, metadata: &ReportMetadata) -> Result<String> {
    let rows: Vec<Value> = table
        .rows
        .iter()
        .map(|row| {
            let mut object = Map::new();
            for (column, key) in table.key_columns.iter().zip(&row.key) {
                object.insert(column.clone(), serde_json::to_value(key).unwrap_or(Value::Null));
            }
            for (column, value) in table.value_columns.iter().zip(&row.values) {
                object.insert(column.clone(), json!(value));
            }
            object.insert("count".to_string(), json!(row.count));
            Value::Object(object)
        })
        .collect();

    let report = json!({
        "metadata": metadata,
        "key_columns": table.key_columns,
        "value_columns": table.value_columns,
        "groups": table.rows.len(),
        "rows": rows,
    });

    serde_json::to_string_pretty(&report).map_err(Into::into)
}

/// Generate the table as Markdown.
pub fn generate_markdown_table(table: &AggregatedTable, metadata: &ReportMetadata) -> String {
    let mut output = String::new();

    output.push_str("# EvoStats Summary\n\n");
    output.push_str(&format!("- **Input:** `{}`\n", metadata.input_dir));
    output.push_str(&format!("- **Prefix:** `{}`\n", metadata.prefix));
    output.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    output.push_str(&format!("- **Files Loaded:** {}\n", metadata.files_loaded));
    output.push_str(&format!("- **Rows Loaded:** {}\n", metadata.rows_loaded));
    output.push_str(&format!("- **Groups:** {}\n\n", table.rows.len()));

    if table.rows.is_empty() {
        output.push_str("No rows matched.\n");
        return output;
    }

    let columns = header(table);
    output.push_str(&format!("| {} |\n", columns.join(" | ")));

    let key_count = table.key_columns.len();
    let alignment: Vec<&str> = (0..columns.len())
        .map(|i| if i < key_count { ":---" } else { "---:" })
        .collect();
    output.push_str(&format!("| {} |\n", alignment.join(" | ")));

    for row in &table.rows {
        let cells: Vec<String> = row
            .key
            .iter()
            .map(|k| k.to_string())
            .chain(row.values.iter().map(|v| format!("{:.3}", v)))
            .chain(std::iter::once(row.count.to_string()))
            .collect();
        output.push_str(&format!("| {} |\n", cells.join(" | ")));
    }

    output
}

/// Render the table in `format` and write it to `path`.
pub fn write_export(
    table: &AggregatedTable,
    metadata: &ReportMetadata,
    format: ExportFormat,
    path: &Path,
) -> Result<()> {
    let content = match format {
        ExportFormat::Csv => generate_csv_table(table)?,
        ExportFormat::Json => generate_json_report(table, metadata)?,
        ExportFormat::Markdown => generate_markdown_table(table, metadata),
    };

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write export to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AggregatedRow, KeyValue};
    use chrono::Utc;

    fn create_test_table() -> AggregatedTable {
        AggregatedTable {
            key_columns: vec!["gen".into(), "alg".into(), "popSize".into()],
            value_columns: vec!["max_mean".into(), "avg_mean".into()],
            rows: vec![
                AggregatedRow {
                    key: vec![KeyValue::Int(0), text("cosyne"), text("50")],
                    values: vec![11.0, 2.5],
                    count: 2,
                },
                AggregatedRow {
                    key: vec![KeyValue::Int(1), text("cosyne"), text("50")],
                    values: vec![19.0, 3.25],
                    count: 2,
                },
            ],
        }
    }

    fn text(value: &str) -> KeyValue {
        KeyValue::Text(value.to_string())
    }

    fn create_test_metadata() -> ReportMetadata {
        ReportMetadata {
            generated_at: Utc::now(),
            input_dir: "alg_eval".to_string(),
            prefix: "eval_".to_string(),
            files_loaded: 2,
            rows_loaded: 6,
        }
    }

    #[test]
    fn test_generate_csv_table() {
        let csv = generate_csv_table(&create_test_table()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "gen,alg,popSize,max_mean,avg_mean,count");
        assert_eq!(lines[1], "0,cosyne,50,11,2.5,2");
        assert_eq!(lines[2], "1,cosyne,50,19,3.25,2");
    }

    #[test]
    fn test_generate_json_report() {
        let json = generate_json_report(&create_test_table(), &create_test_metadata()).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["metadata"]["prefix"], "eval_");
        assert_eq!(value["metadata"]["files_loaded"], 2);
        assert_eq!(value["groups"], 2);
        assert_eq!(value["rows"][0]["gen"], 0);
        assert_eq!(value["rows"][0]["alg"], "cosyne");
        assert_eq!(value["rows"][1]["max_mean"], 19.0);
        assert_eq!(value["rows"][1]["count"], 2);
    }

    #[test]
    fn test_generate_markdown_table() {
        let markdown = generate_markdown_table(&create_test_table(), &create_test_metadata());

        assert!(markdown.contains("# EvoStats Summary"));
        assert!(markdown.contains("| gen | alg | popSize | max_mean | avg_mean | count |"));
        assert!(markdown.contains("| 0 | cosyne | 50 | 11.000 | 2.500 | 2 |"));
        assert!(markdown.contains("**Files Loaded:** 2"));
    }

    #[test]
    fn test_markdown_empty_table() {
        let table = AggregatedTable {
            rows: Vec::new(),
            ..create_test_table()
        };
        let markdown = generate_markdown_table(&table, &create_test_metadata());
        assert!(markdown.contains("No rows matched."));
    }

    #[test]
    fn test_write_export() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("summary.csv");

        write_export(
            &create_test_table(),
            &create_test_metadata(),
            ExportFormat::Csv,
            &path,
        )
        .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("gen,alg,popSize"));
    }
}
