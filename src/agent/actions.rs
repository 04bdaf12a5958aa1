//! Follow-up actions: suggested by the wording of an assistant reply, then
//! run on request against the planning table.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

use super::keywords::{KeywordTable, MatchMode};
use crate::tools::TableData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedAction {
    ShowData,
    ShowChart,
    RunAnalysis,
}

const ACTION_KEYWORDS: [(&str, SuggestedAction); 9] = [
    ("filter", SuggestedAction::ShowData),
    ("show", SuggestedAction::ShowData),
    ("display", SuggestedAction::ShowData),
    ("chart", SuggestedAction::ShowChart),
    ("graph", SuggestedAction::ShowChart),
    ("visualize", SuggestedAction::ShowChart),
    ("analysis", SuggestedAction::RunAnalysis),
    ("trend", SuggestedAction::RunAnalysis),
    ("compare", SuggestedAction::RunAnalysis),
];

/// Actions hinted at by `response`, each at most once.
pub fn suggest_actions(response: &str) -> Vec<SuggestedAction> {
    KeywordTable::new(ACTION_KEYWORDS, MatchMode::Substring).categories(response)
}

// ── Running actions ──────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Unsupported action type: {0}")]
    Unsupported(String),
    #[error("invalid action_data: {0}")]
    InvalidData(#[from] serde_json::Error),
    #[error("planning data has no '{0}' column")]
    MissingColumn(&'static str),
}

impl ActionError {
    /// Whether the caller, rather than the data source, is at fault.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::MissingColumn(_))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DataFilters {
    /// Case-insensitive substring of the product name.
    pub product: Option<String>,
    /// Case-insensitive substring of the region name.
    pub region: Option<String>,
    /// Year prefix of the month column, as a number or string.
    pub year: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ShowDataArgs {
    pub filters: DataFilters,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    #[default]
    Sum,
    Average,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    #[default]
    Time,
    Product,
    Region,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    #[default]
    Measure1,
    Measure2,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChartArgs {
    pub aggregation: Aggregation,
    pub measure: Measure,
    #[serde(rename = "groupBy", alias = "group_by")]
    pub group_by: GroupBy,
}

/// A parsed action ready to run.
#[derive(Debug)]
pub enum ActionRequest {
    ShowData(ShowDataArgs),
    ShowChart(ChartArgs),
    RunAnalysis,
}

impl ActionRequest {
    /// Parse the wire form: an action type name plus optional `action_data`.
    pub fn parse(action_type: &str, action_data: Value) -> Result<Self, ActionError> {
        let kind: SuggestedAction = serde_json::from_value(Value::String(action_type.to_string()))
            .map_err(|_| ActionError::Unsupported(action_type.to_string()))?;
        let data = if action_data.is_null() {
            Value::Object(Map::new())
        } else {
            action_data
        };
        Ok(match kind {
            SuggestedAction::ShowData => Self::ShowData(serde_json::from_value(data)?),
            SuggestedAction::ShowChart => Self::ShowChart(serde_json::from_value(data)?),
            SuggestedAction::RunAnalysis => Self::RunAnalysis,
        })
    }

    pub fn kind(&self) -> SuggestedAction {
        match self {
            Self::ShowData(_) => SuggestedAction::ShowData,
            Self::ShowChart(_) => SuggestedAction::ShowChart,
            Self::RunAnalysis => SuggestedAction::RunAnalysis,
        }
    }
}

/// Column positions the actions read.
struct PlanningColumns {
    product: usize,
    region: usize,
    month: usize,
    measure1: usize,
    measure2: usize,
}

impl PlanningColumns {
    fn locate(table: &TableData) -> Result<Self, ActionError> {
        let find = |name: &'static str| {
            table
                .columns
                .iter()
                .position(|c| c == name)
                .ok_or(ActionError::MissingColumn(name))
        };
        Ok(Self {
            product: find("product")?,
            region: find("region")?,
            month: find("month")?,
            measure1: find("measure1")?,
            measure2: find("measure2")?,
        })
    }

    fn measure(&self, measure: Measure) -> usize {
        match measure {
            Measure::Measure1 => self.measure1,
            Measure::Measure2 => self.measure2,
        }
    }

    fn group(&self, group_by: GroupBy) -> usize {
        match group_by {
            GroupBy::Time => self.month,
            GroupBy::Product => self.product,
            GroupBy::Region => self.region,
        }
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn contains_ci(haystack: &Value, needle: &str) -> bool {
    cell_text(haystack).to_lowercase().contains(&needle.trim().to_lowercase())
}

/// Run `request` against `table` and return the JSON result payload.
pub fn run_action(request: &ActionRequest, table: &TableData) -> Result<Value, ActionError> {
    let cols = PlanningColumns::locate(table)?;
    let result = match request {
        ActionRequest::ShowData(args) => show_data(&args.filters, table, &cols),
        ActionRequest::ShowChart(args) => show_chart(args, table, &cols),
        ActionRequest::RunAnalysis => run_analysis(table, &cols),
    };
    tracing::debug!(action = ?request.kind(), "action executed");
    Ok(result)
}

fn show_data(filters: &DataFilters, table: &TableData, cols: &PlanningColumns) -> Value {
    let year = filters.year.as_ref().map(cell_text);
    let rows = table
        .rows
        .iter()
        .filter(|row| {
            filters
                .product
                .as_deref()
                .map_or(true, |p| contains_ci(&row[cols.product], p))
                && filters
                    .region
                    .as_deref()
                    .map_or(true, |r| contains_ci(&row[cols.region], r))
                && year
                    .as_deref()
                    .map_or(true, |y| cell_text(&row[cols.month]).starts_with(y.trim()))
        })
        .cloned()
        .collect();
    let filtered = TableData {
        columns: table.columns.clone(),
        rows,
    };
    json!({ "data": filtered.to_records() })
}

/// Groups keep first-seen order; a missing measure counts as zero.
#[allow(clippy::cast_precision_loss)]
fn show_chart(args: &ChartArgs, table: &TableData, cols: &PlanningColumns) -> Value {
    let key_col = cols.group(args.group_by);
    let measure_col = cols.measure(args.measure);

    let mut groups: Vec<(String, f64, usize)> = Vec::new();
    for row in &table.rows {
        let key = cell_text(&row[key_col]);
        let value = row[measure_col].as_f64().unwrap_or(0.0);
        match groups.iter_mut().find(|(k, _, _)| *k == key) {
            Some((_, total, count)) => {
                *total += value;
                *count += 1;
            }
            None => groups.push((key, value, 1)),
        }
    }

    let (labels, values): (Vec<String>, Vec<f64>) = groups
        .into_iter()
        .map(|(key, total, count)| match args.aggregation {
            Aggregation::Sum => (key, total),
            Aggregation::Average => (key, total / count as f64),
        })
        .unzip();
    json!({ "labels": labels, "values": values })
}

/// Per-period totals of both measures, skipping rows missing either one.
fn run_analysis(table: &TableData, cols: &PlanningColumns) -> Value {
    let mut periods: BTreeMap<String, (f64, f64)> = BTreeMap::new();
    for row in &table.rows {
        let (Some(m1), Some(m2)) = (row[cols.measure1].as_f64(), row[cols.measure2].as_f64())
        else {
            continue;
        };
        let entry = periods.entry(cell_text(&row[cols.month])).or_default();
        entry.0 += m1;
        entry.1 += m2;
    }

    let trends: Map<String, Value> = periods
        .into_iter()
        .map(|(period, (m1, m2))| {
            let variance = m2 - m1;
            let percentage = (m1 != 0.0).then(|| variance / m1 * 100.0);
            (
                period,
                json!({
                    "measure1": m1,
                    "measure2": m2,
                    "variance": variance,
                    "variancePercentage": percentage,
                }),
            )
        })
        .collect();
    json!({ "trends": trends })
}
