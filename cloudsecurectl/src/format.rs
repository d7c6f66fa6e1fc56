//! Output formatting utilities for the CLI
//!
//! Renders API records as a table, JSON or CSV. Records are JSON values;
//! columns are the union of their keys in first-seen order.

use anyhow::{Context, Result};
use cloudsecure_core::{OutputFormat, OutputSpec};
use colored::*;
use serde::Serialize;
use serde_json::Value;
use tabled::{builder::Builder, settings::Style};

/// Column used for records that are not JSON objects, and for empty objects
/// when no record has any key
const VALUE_COLUMN: &str = "value";

/// Convert typed records into JSON values for formatting
pub fn to_values<T: Serialize>(records: &[T]) -> Result<Vec<Value>> {
    records
        .iter()
        .map(|record| serde_json::to_value(record).context("failed to serialize record"))
        .collect()
}

/// Union of record keys in first-seen order
pub fn columns(records: &[Value]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for record in records {
        match record {
            Value::Object(map) => {
                for key in map.keys() {
                    if !columns.iter().any(|c| c == key) {
                        columns.push(key.clone());
                    }
                }
            }
            _ => {
                if !columns.iter().any(|c| c == VALUE_COLUMN) {
                    columns.push(VALUE_COLUMN.to_string());
                }
            }
        }
    }
    if columns.is_empty() && !records.is_empty() {
        columns.push(VALUE_COLUMN.to_string());
    }
    columns
}

fn cell(record: &Value, column: &str) -> String {
    let value = match record {
        Value::Object(map) if map.is_empty() && column == VALUE_COLUMN => Some(record),
        Value::Object(map) => map.get(column),
        other if column == VALUE_COLUMN => Some(other),
        _ => None,
    };

    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        // nested values stay compact so each record is one row
        Some(structured) => structured.to_string(),
    }
}

fn rows<'a>(records: &'a [Value], columns: &'a [String]) -> impl Iterator<Item = Vec<String>> + 'a {
    records
        .iter()
        .map(move |record| columns.iter().map(|c| cell(record, c)).collect())
}

fn format_table(records: &[Value]) -> String {
    if records.is_empty() {
        return String::new();
    }

    let columns = columns(records);
    let mut builder = Builder::default();
    builder.push_record(columns.clone());
    for row in rows(records, &columns) {
        builder.push_record(row);
    }

    builder.build().with(Style::rounded()).to_string()
}

fn format_json(records: &[Value], pretty: bool) -> Result<String> {
    let output = if pretty {
        serde_json::to_string_pretty(records)?
    } else {
        serde_json::to_string(records)?
    };
    Ok(output)
}

fn format_csv(records: &[Value]) -> Result<String> {
    if records.is_empty() {
        return Ok(String::new());
    }

    let columns = columns(records);
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&columns)?;
    for row in rows(records, &columns) {
        writer.write_record(&row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("failed to flush CSV output: {}", e.error()))?;
    Ok(String::from_utf8(bytes)?)
}

/// Format records according to `spec`. Empty input is never an error.
pub fn format(records: &[Value], spec: &OutputSpec) -> Result<String> {
    match spec.format {
        OutputFormat::Table => Ok(format_table(records)),
        OutputFormat::Json => format_json(records, spec.pretty),
        OutputFormat::Csv => format_csv(records),
    }
}

/// Like [`format`], with a bold collection heading above tables.
pub fn format_titled(records: &[Value], spec: &OutputSpec, title: Option<&str>) -> Result<String> {
    let body = format(records, spec)?;
    match (spec.format, title) {
        (OutputFormat::Table, Some(title)) => {
            Ok(format!("{}\n{}", format!("{}:", title).bold(), body))
        }
        _ => Ok(body),
    }
}

/// Format success message
pub fn format_success(message: &str) -> String {
    format!("{} {}", "✓".green().bold(), message)
}
