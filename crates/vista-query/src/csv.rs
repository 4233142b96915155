//! CSV encoding of JSON rows.
//!
//! Fields containing a comma, quote, CR or LF are quoted with internal
//! quotes doubled. NULL and missing keys render as an empty field. Lines end
//! with `\n`.

use serde_json::Value;

/// Quote `field` if it needs it.
pub fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn render(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => escape_field(s),
        Some(other) => escape_field(&other.to_string()),
    }
}

/// Writes rows in a fixed column order.
#[derive(Debug, Clone)]
pub struct CsvEncoder {
    columns: Vec<String>,
}

impl CsvEncoder {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    pub fn header_line(&self) -> String {
        let fields: Vec<String> = self.columns.iter().map(|c| escape_field(c)).collect();
        format!("{}\n", fields.join(","))
    }

    /// One line for `row`, a JSON object keyed by column name.
    pub fn encode_row(&self, row: &Value) -> String {
        let fields: Vec<String> = self
            .columns
            .iter()
            .map(|c| render(row.get(c)))
            .collect();
        format!("{}\n", fields.join(","))
    }
}
