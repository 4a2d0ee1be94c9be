use anyhow::Result;
use comfy_table::Table;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn is_table(&self) -> bool {
        matches!(self, Self::Table)
    }
}

pub fn print_output<T: Serialize>(data: T, format: OutputFormat) -> Result<()> {
    println!("{}", render(data, format)?);
    Ok(())
}

pub fn render<T: Serialize>(data: T, format: OutputFormat) -> Result<String> {
    let json_value = serde_json::to_value(data)?;

    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&json_value)?,
        OutputFormat::Yaml => serde_yaml::to_string(&json_value)?.trim_end().to_string(),
        OutputFormat::Table => render_table(&json_value),
    };
    Ok(rendered)
}

fn render_table(value: &Value) -> String {
    match value {
        Value::Array(arr) if arr.is_empty() => "(none)".to_string(),
        Value::Array(arr) => {
            let mut table = Table::new();

            // Get headers from first object
            if let Value::Object(first) = &arr[0] {
                let headers: Vec<String> = first.keys().cloned().collect();
                table.set_header(&headers);

                for item in arr {
                    if let Value::Object(obj) = item {
                        let row: Vec<String> = headers
                            .iter()
                            .map(|h| format_value(obj.get(h).unwrap_or(&Value::Null)))
                            .collect();
                        table.add_row(row);
                    }
                }
            } else {
                table.set_header(vec!["Value"]);
                for item in arr {
                    table.add_row(vec![format_value(item)]);
                }
            }

            table.to_string()
        }
        Value::Object(obj) => {
            let mut table = Table::new();
            table.set_header(vec!["Key", "Value"]);

            for (key, val) in obj {
                table.add_row(vec![key.clone(), format_value(val)]);
            }

            table.to_string()
        }
        _ => format_value(value),
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(arr) => format!("[{} items]", arr.len()),
        Value::Object(obj) => format!("{{{} fields}}", obj.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_json() {
        let out = render(json!({"id": "d-1"}), OutputFormat::Json).unwrap();
        assert_eq!(out, "{\n  \"id\": \"d-1\"\n}");
    }

    #[test]
    fn test_render_yaml() {
        let out = render(json!({"id": "d-1", "block_size": 4096}), OutputFormat::Yaml).unwrap();
        assert!(out.contains("id: d-1"));
        assert!(out.contains("block_size: 4096"));
    }

    #[test]
    fn test_table_of_objects_uses_keys_as_headers() {
        let out = render(
            json!([{"id": "a", "mode": "read-only"}, {"id": "b", "mode": "read-write"}]),
            OutputFormat::Table,
        )
        .unwrap();
        assert!(out.contains("mode"));
        assert!(out.contains("read-only"));
        assert!(out.contains("b"));
    }

    #[test]
    fn test_table_of_nothing() {
        assert_eq!(render(json!([]), OutputFormat::Table).unwrap(), "(none)");
    }

    #[test]
    fn test_nested_values_are_summarized() {
        assert_eq!(format_value(&json!([1, 2])), "[2 items]");
        assert_eq!(format_value(&json!({"a": 1})), "{1 fields}");
        assert_eq!(format_value(&Value::Null), "-");
    }
}
