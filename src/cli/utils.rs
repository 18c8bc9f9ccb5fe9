use serde_json::{json, Map, Value};

use crate::cli::OutputFormat;
use crate::database::DatabaseManager;

/// Output a success message in the appropriate format
pub fn output_success(output_format: OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = Map::new();
            response.insert("success".to_string(), json!(true));
            response.insert("message".to_string(), json!(message));
            if let Some(Value::Object(fields)) = data {
                response.extend(fields);
            }
            println!("{}", serde_json::to_string_pretty(&Value::Object(response))?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Print a JSON document as-is, or as `key: value` lines for text output
pub fn output_value(output_format: OutputFormat, value: &Value) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => match value {
            Value::Object(fields) => {
                for (key, field) in fields {
                    match field {
                        Value::String(s) => println!("{}: {}", key, s),
                        other => println!("{}: {}", key, other),
                    }
                }
            }
            other => println!("{}", other),
        },
    }
    Ok(())
}

/// Pool for commands that talk to the database directly
pub fn connect() -> anyhow::Result<DatabaseManager> {
    let config = crate::config::config();
    Ok(DatabaseManager::connect_lazy(&config.database)?)
}
