//! Tool subsystem for agent-callable capabilities.
//!
//! Each tool implements the [`Tool`] trait defined in [`traits`]: a name, a
//! description, a JSON parameter schema and an async `execute` returning a
//! [`ToolResult`]. Registries are assembled per pipeline by
//! [`planning_tools`] and [`tabular_tools`].

pub mod planning;
pub mod table;
pub mod traits;

pub use planning::{BusinessLogicTool, PlanningDataTool, UpdateSpreadsheetTool};
pub use table::TableData;
pub use traits::{Tool, ToolResult, ToolSpec};

/// Tools for the plain agent loop.
pub fn planning_tools() -> Vec<Box<dyn Tool>> {
    vec![Box::new(UpdateSpreadsheetTool), Box::new(BusinessLogicTool)]
}

/// Planning tools plus the tabular data source.
pub fn tabular_tools() -> Vec<Box<dyn Tool>> {
    let mut tools = planning_tools();
    tools.push(Box::new(PlanningDataTool::default()));
    tools
}

/// Find the first tool whose name occurs in `text` (case-insensitive).
pub fn find_mentioned<'a>(tools: &'a [Box<dyn Tool>], text: &str) -> Option<&'a dyn Tool> {
    let lowered = text.to_lowercase();
    tools
        .iter()
        .find(|t| lowered.contains(&t.name().to_lowercase()))
        .map(|t| &**t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registries_have_expected_tools() {
        let names: Vec<String> = planning_tools().iter().map(|t| t.name().to_string()).collect();
        assert_eq!(names, ["update_spreadsheet", "get_business_logic"]);

        let tabular = tabular_tools();
        assert_eq!(tabular.len(), 3);
        assert_eq!(tabular[2].name(), "get_planning_data");
    }

    #[test]
    fn tool_names_are_unique() {
        let tools = tabular_tools();
        let mut names: Vec<&str> = tools.iter().map(|t| t.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), tools.len());
    }

    #[test]
    fn find_mentioned_picks_first_registered_match() {
        let tools = tabular_tools();
        let reply = "I will USE TOOL Get_Business_Logic then update_spreadsheet";
        let found = find_mentioned(&tools, reply);
        assert_eq!(found.map(|t| t.name()), Some("update_spreadsheet"));
        assert!(find_mentioned(&tools, "use tool please").is_none());
    }
}
