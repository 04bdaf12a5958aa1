//! Tabular data produced by tools, with Markdown and record renderings.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Write;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl TableData {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> anyhow::Result<Self> {
        if let Some((i, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            anyhow::bail!(
                "row {i} has {} cells but the table has {} columns",
                row.len(),
                columns.len()
            );
        }
        Ok(Self { columns, rows })
    }

    /// One JSON object per row, keyed by column name.
    pub fn to_records(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }

    pub fn to_markdown(&self) -> String {
        if self.columns.is_empty() {
            return "(empty table)".to_string();
        }

        let mut out = String::new();
        let header: Vec<String> = self.columns.iter().map(|c| escape_cell(c)).collect();
        let _ = writeln!(out, "| {} |", header.join(" | "));
        let _ = writeln!(out, "|{}|", vec!["---"; self.columns.len()].join("|"));
        for row in &self.rows {
            let cells: Vec<String> = row.iter().map(format_cell).collect();
            let _ = writeln!(out, "| {} |", cells.join(" | "));
        }
        out.truncate(out.trim_end().len());
        out
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

fn format_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Number(n) if n.is_f64() => n
            .as_f64()
            .map_or_else(|| n.to_string(), |f| format!("{f:.2}")),
        Value::Number(n) => n.to_string(),
        Value::String(s) => escape_cell(s),
        Value::Bool(b) => b.to_string(),
        other => escape_cell(&other.to_string()),
    }
}
