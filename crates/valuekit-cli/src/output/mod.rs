pub mod csv_out;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Result fields holding a list of records, in the order they are looked
/// for when a command's output is rendered as rows.
pub(crate) const RECORD_KEYS: [&str; 4] = ["rows", "ranking", "projections", "year_by_year"];

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("JSON serialization error: {e}"),
    }
}

/// A sensitivity grid as (row label, row values, column values, cells).
pub(crate) struct GridView<'a> {
    pub row_label: &'a str,
    pub rows: &'a [Value],
    pub columns: &'a [Value],
    pub cells: &'a [Value],
}

impl<'a> GridView<'a> {
    pub fn from_result(result: &'a Value) -> Option<Self> {
        Some(GridView {
            row_label: result.get("row_variable")?.as_str()?,
            rows: result.get("row_values")?.as_array()?,
            columns: result.get("column_values")?.as_array()?,
            cells: result.get("cells")?.as_array()?,
        })
    }

    pub fn header(&self) -> Vec<String> {
        let mut header = vec![format!("{} \\ discount_rate", self.row_label)];
        header.extend(self.columns.iter().map(scalar));
        header
    }

    pub fn body(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .zip(self.cells)
            .map(|(row_value, cells)| {
                let mut line = vec![scalar(row_value)];
                if let Some(cells) = cells.as_array() {
                    line.extend(cells.iter().map(|c| match c {
                        Value::Null => "n/a".to_string(),
                        other => scalar(other),
                    }));
                }
                line
            })
            .collect()
    }
}

/// Plain text for a scalar; nested values fall back to compact JSON.
pub(crate) fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
