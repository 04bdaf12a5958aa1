//! Planning tools available to the agent loops.
//!
//! The spreadsheet and business-logic tools acknowledge with fixed text; the
//! planning-data tool serves a fixed sample table.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::table::TableData;
use super::traits::{Tool, ToolResult};

pub const SPREADSHEET_UPDATED: &str = "Spreadsheet updated successfully";
pub const BUSINESS_LOGIC_RETRIEVED: &str = "Retrieved business logic rules";

pub struct UpdateSpreadsheetTool;

#[async_trait]
impl Tool for UpdateSpreadsheetTool {
    fn name(&self) -> &str {
        "update_spreadsheet"
    }

    fn description(&self) -> &str {
        "Update the planning spreadsheet with new information"
    }

    async fn execute(&self, args: Value) -> anyhow::Result<ToolResult> {
        let input_len: usize = args.get("input").and_then(Value::as_str).map_or(0, str::len);
        tracing::debug!(input_len, "update_spreadsheet invoked");
        Ok(ToolResult::ok(SPREADSHEET_UPDATED))
    }
}

pub struct BusinessLogicTool;

#[async_trait]
impl Tool for BusinessLogicTool {
    fn name(&self) -> &str {
        "get_business_logic"
    }

    fn description(&self) -> &str {
        "Retrieve business logic rules and constraints"
    }

    async fn execute(&self, _args: Value) -> anyhow::Result<ToolResult> {
        Ok(ToolResult::ok(BUSINESS_LOGIC_RETRIEVED))
    }
}

pub struct PlanningDataTool {
    table: TableData,
}

impl PlanningDataTool {
    pub fn new(table: TableData) -> Self {
        Self { table }
    }
}

impl Default for PlanningDataTool {
    fn default() -> Self {
        Self::new(sample_planning_data())
    }
}

#[async_trait]
impl Tool for PlanningDataTool {
    fn name(&self) -> &str {
        "get_planning_data"
    }

    fn description(&self) -> &str {
        "Fetch planning measures by product, region and month as a table"
    }

    async fn execute(&self, _args: Value) -> anyhow::Result<ToolResult> {
        Ok(ToolResult::table(self.table.clone()))
    }
}

/// Fixed sample of planning measures.
pub fn sample_planning_data() -> TableData {
    let row = |product: &str, region: &str, month: &str, m1: f64, m2: Option<f64>| {
        vec![
            json!(product),
            json!(region),
            json!(month),
            json!(m1),
            m2.map_or(Value::Null, |v| json!(v)),
        ]
    };
    TableData {
        columns: ["product", "region", "month", "measure1", "measure2"]
            .into_iter()
            .map(String::from)
            .collect(),
        rows: vec![
            row("Comfortable Office Chair", "Asia Pacific", "2024-01", 1250.0, Some(1312.5)),
            row("Comfortable Office Chair", "Asia Pacific", "2024-02", 1180.0, Some(1239.0)),
            row("Comfortable Office Chair", "Europe", "2024-01", 980.5, Some(1015.25)),
            row("Standing Desk", "North America", "2024-01", 640.0, None),
            row("Standing Desk", "North America", "2024-02", 702.75, Some(690.0)),
        ],
    }
}
