use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use krpc_client::{decode, DecodeError};
use serde::Serialize;
use serde_json::Value;

use krpc::hex::hexlify;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Table,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Text
        } else {
            Self::Json
        }
    }
}

/// How to interpret a raw result payload.
#[derive(Clone, Debug, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ValueType {
    #[default]
    Hex,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Bool,
    Float,
    Double,
    String,
    Bytes,
}

/// Decode `payload` as `ty` for display.
pub fn render_value(payload: &[u8], ty: ValueType) -> Result<Value, DecodeError> {
    Ok(match ty {
        ValueType::Hex => Value::from(hexlify(payload)),
        ValueType::Int32 => Value::from(decode::<i32>(payload)?),
        ValueType::Int64 => Value::from(decode::<i64>(payload)?),
        ValueType::Uint32 => Value::from(decode::<u32>(payload)?),
        ValueType::Uint64 => Value::from(decode::<u64>(payload)?),
        ValueType::Bool => Value::from(decode::<bool>(payload)?),
        ValueType::Float => Value::from(decode::<f32>(payload)?),
        ValueType::Double => Value::from(decode::<f64>(payload)?),
        ValueType::String => Value::from(decode::<String>(payload)?),
        ValueType::Bytes => Value::from(hexlify(&decode::<bytes::Bytes>(payload)?)),
    })
}

#[derive(Serialize)]
struct ValueOutput<'a> {
    procedure: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    update: Option<u64>,
    value: &'a Value,
    timestamp: String,
}

/// Print one result, either from a call or a stream update.
pub fn print_value(
    procedure: &str,
    stream: Option<(u64, u64)>,
    value: &Value,
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => {
            let out = ValueOutput {
                procedure,
                stream_id: stream.map(|(id, _)| id),
                update: stream.map(|(_, n)| n),
                value,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic);
            match stream {
                Some((id, n)) => {
                    table
                        .set_header(vec!["PROCEDURE", "STREAM", "UPDATE", "VALUE"])
                        .add_row(vec![
                            procedure.to_string(),
                            id.to_string(),
                            n.to_string(),
                            plain(value),
                        ]);
                }
                None => {
                    table
                        .set_header(vec!["PROCEDURE", "VALUE"])
                        .add_row(vec![procedure.to_string(), plain(value)]);
                }
            }
            println!("{table}");
        }
        OutputFormat::Text => match stream {
            Some((id, n)) => println!("{procedure} [stream {id} #{n}] = {}", plain(value)),
            None => println!("{}", plain(value)),
        },
    }
}

/// Strings without JSON quoting, everything else as JSON.
pub fn plain(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
