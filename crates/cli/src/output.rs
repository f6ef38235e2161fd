//! Output formatting shared by every subcommand.

use serde::Serialize;
use serde_json::Value;
use sluice_connectors::Row;

#[derive(clap::ValueEnum, Clone, Debug, Default, PartialEq, Eq, Copy)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn is_machine_readable(&self) -> bool {
        !matches!(self, OutputFormat::Human)
    }
}

/// Envelope for machine-readable responses.
#[derive(Serialize)]
pub struct CommandResponse<T> {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(flatten)]
    pub data: T,
}

impl<T> CommandResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: None,
            exit_code: Some(0),
            data,
        }
    }

    pub fn error(message: String, exit_code: i32, data: T) -> Self {
        Self {
            status: "error".to_string(),
            message: Some(message),
            exit_code: Some(exit_code),
            data,
        }
    }
}

pub fn render<T: Serialize>(format: OutputFormat, data: &T) -> anyhow::Result<Option<String>> {
    Ok(match format {
        OutputFormat::Human => None,
        OutputFormat::Json => Some(serde_json::to_string_pretty(data)?),
        OutputFormat::Yaml => Some(serde_yaml::to_string(data)?),
    })
}

/// Print a success envelope. Human mode prints nothing; commands write their own text.
pub fn print_success<T: Serialize>(format: OutputFormat, data: T) -> anyhow::Result<()> {
    if let Some(text) = render(format, &CommandResponse::success(data))? {
        println!("{}", text);
    }
    Ok(())
}

/// Print an error envelope carrying `data` (typically the error's own JSON form).
pub fn print_error<T: Serialize>(
    format: OutputFormat,
    message: &str,
    exit_code: i32,
    data: T,
) -> anyhow::Result<()> {
    let response = CommandResponse::error(message.to_string(), exit_code, data);
    if let Some(text) = render(format, &response)? {
        println!("{}", text);
    }
    Ok(())
}

/// Render rows as an aligned text table, columns in result order.
pub fn format_table(rows: &[Row]) -> String {
    let Some(first) = rows.first() else {
        return "(0 rows)".to_string();
    };
    let headers: Vec<&str> = first.keys().map(String::as_str).collect();

    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            headers
                .iter()
                .map(|h| row.get(*h).map(cell_text).unwrap_or_default())
                .collect()
        })
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            cells
                .iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |values: Vec<&str>| {
        values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{:<width$}", v, width = *w))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut out = vec![
        line(headers.clone()),
        widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("-+-"),
    ];
    for row in &cells {
        out.push(line(row.iter().map(String::as_str).collect()));
    }
    out.push(format!(
        "({} row{})",
        rows.len(),
        if rows.len() == 1 { "" } else { "s" }
    ));
    out.join("\n")
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_table_keeps_column_order_and_pads() {
        let rows = vec![
            row(json!({ "id": 1, "name": "ada", "note": null })),
            row(json!({ "id": 20, "name": "grace", "note": "x" })),
        ];
        let table = format_table(&rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "id | name  | note");
        assert_eq!(lines[1], "---+-------+-----");
        assert_eq!(lines[2], "1  | ada   | NULL");
        assert_eq!(lines[3], "20 | grace | x");
        assert_eq!(lines[4], "(2 rows)");
    }

    #[test]
    fn test_empty_result() {
        assert_eq!(format_table(&[]), "(0 rows)");
    }

    #[test]
    fn test_json_envelope_flattens_data() {
        #[derive(Serialize)]
        struct Data {
            valid: bool,
        }
        let text = render(OutputFormat::Json, &CommandResponse::success(Data { valid: true }))
            .unwrap()
            .unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["valid"], true);
        assert!(render(OutputFormat::Human, &value).unwrap().is_none());
    }
}
