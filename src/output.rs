//! Rendering of query results and metadata for the command line.

use serde::Serialize;

use crate::error::{ConduitError, Result};
use crate::query::{QuerySession, Row};

/// Renders every row of a session as an aligned text table.
pub fn format_session_table(session: &QuerySession) -> String {
    let headers = result_headers(session);
    let rows: Vec<Vec<String>> = session
        .rows()
        .map(|row| {
            headers
                .iter()
                .map(|h| row.get(h).map(|v| v.to_display_string()).unwrap_or_default())
                .collect()
        })
        .collect();

    format_table(&headers, &rows)
}

/// Renders every row of a session as a JSON array of objects.
pub fn format_session_json(session: &QuerySession) -> Result<String> {
    let rows: Vec<&Row> = session.rows().collect();
    to_pretty_json(&rows)
}

/// Serializes any value as pretty JSON.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ConduitError::internal(format!("Failed to serialize output: {e}")))
}

/// Columns reported by the server, or the row keys in first-seen order when none were.
fn result_headers(session: &QuerySession) -> Vec<String> {
    if !session.columns().is_empty() {
        return session.columns().to_vec();
    }

    let mut headers: Vec<String> = Vec::new();
    for row in session.rows() {
        for key in row.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }
    headers
}

/// Formats a table as a string for display.
fn format_table(headers: &[String], rows: &[Vec<String>]) -> String {
    if headers.is_empty() {
        return String::new();
    }

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
    }

    let mut output = String::new();

    let header_line: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
        .collect();
    output.push_str(&header_line.join(" │ "));
    output.push('\n');

    let separator: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
    output.push_str(&separator.join("─┼─"));
    output.push('\n');

    for row in rows {
        let row_line: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let width = widths.get(i).copied().unwrap_or(cell.len());
                format!("{:width$}", cell, width = width)
            })
            .collect();
        output.push_str(&row_line.join(" │ "));
        output.push('\n');
    }

    output.trim_end().to_string()
}
