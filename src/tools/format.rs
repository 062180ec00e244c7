//! Text renderings of a [`QueryResult`] for `run_query`.

use crate::models::QueryResult;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use unicode_width::UnicodeWidthStr;

/// Output format for query results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Structured JSON (default)
    #[default]
    Json,
    /// ASCII table, like a database CLI
    Table,
    /// Markdown table
    Markdown,
}

pub fn format_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "NULL".to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn cell(result: &QueryResult, row: usize, column: &str) -> JsonValue {
    result.rows[row]
        .get(column)
        .cloned()
        .unwrap_or(JsonValue::Null)
}

fn footer(result: &QueryResult) -> String {
    let count = result.row_count();
    let noun = if count == 1 { "row" } else { "rows" };
    let mut line = format!(
        "{} {} in set ({:.2} sec)",
        count,
        noun,
        result.execution_time_ms as f64 / 1000.0
    );
    if result.truncated {
        line.push_str(", truncated at limit");
    }
    line
}

pub fn format_as_table(result: &QueryResult) -> String {
    let columns = result.column_names();
    if columns.is_empty() {
        return "Empty set".to_string();
    }

    let mut widths: Vec<usize> = columns.iter().map(|c| c.width()).collect();
    for row in 0..result.row_count() {
        for (i, col) in columns.iter().enumerate() {
            widths[i] = widths[i].max(format_value(&cell(result, row, col)).width());
        }
    }

    let separator: String = widths
        .iter()
        .map(|w| format!("+{}", "-".repeat(w + 2)))
        .collect::<String>()
        + "+\n";

    let mut output = separator.clone();
    for (col, w) in columns.iter().zip(&widths) {
        output.push_str(&format!("| {} ", pad_center(col, *w)));
    }
    output.push_str("|\n");
    output.push_str(&separator);

    for row in 0..result.row_count() {
        for (col, w) in columns.iter().zip(&widths) {
            let value = cell(result, row, col);
            let text = format_value(&value);
            let padding = " ".repeat(w.saturating_sub(text.width()));
            if value.is_number() {
                output.push_str(&format!("| {}{} ", padding, text));
            } else {
                output.push_str(&format!("| {}{} ", text, padding));
            }
        }
        output.push_str("|\n");
    }

    output.push_str(&separator);
    output.push_str(&footer(result));
    output.push('\n');
    output
}

// `format!` pads by char count, which misaligns wide glyphs.
fn pad_center(text: &str, width: usize) -> String {
    let total = width.saturating_sub(text.width());
    let left = total / 2;
    format!("{}{}{}", " ".repeat(left), text, " ".repeat(total - left))
}

pub fn format_as_markdown(result: &QueryResult) -> String {
    let columns = result.column_names();
    if columns.is_empty() {
        return "*Empty set*".to_string();
    }

    let mut output = String::new();
    for col in &columns {
        output.push_str(&format!("| {} ", escape_pipes(col)));
    }
    output.push_str("|\n");
    output.push_str(&"|---".repeat(columns.len()));
    output.push_str("|\n");

    for row in 0..result.row_count() {
        for col in &columns {
            let text = format_value(&cell(result, row, col));
            output.push_str(&format!("| {} ", escape_pipes(&text)));
        }
        output.push_str("|\n");
    }

    output.push_str(&format!("\n*{}*", footer(result)));
    output
}

fn escape_pipes(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
