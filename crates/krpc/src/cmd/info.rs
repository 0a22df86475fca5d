use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use krpc::hex::hexlify;
use serde::Serialize;

use crate::cmd::{ConnectArgs, InfoArgs};
use crate::exit::{CliResult, SUCCESS};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct InfoOutput {
    client_id: String,
    client_name: String,
    host: String,
    rpc_port: u16,
    stream_port: Option<u16>,
    streams: bool,
    state: &'static str,
}

pub fn run(_args: InfoArgs, connection: &ConnectArgs, format: OutputFormat) -> CliResult<i32> {
    let client = connection.connect(true)?;
    let config = client.config();

    let out = InfoOutput {
        client_id: hexlify(client.client_id()),
        client_name: client.name().to_string(),
        host: config.host.clone(),
        rpc_port: config.rpc_port,
        stream_port: config.stream_port,
        streams: client.has_streams(),
        state: client.state().as_str(),
    };
    client.close();

    print_info(&out, format);
    Ok(SUCCESS)
}

fn print_info(out: &InfoOutput, format: OutputFormat) {
    let stream_port = out
        .stream_port
        .map_or_else(|| "none".to_string(), |port| port.to_string());
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"])
                .add_row(vec!["client id", out.client_id.as_str()])
                .add_row(vec!["client name", out.client_name.as_str()])
                .add_row(vec!["host", out.host.as_str()])
                .add_row(vec!["rpc port".to_string(), out.rpc_port.to_string()])
                .add_row(vec!["stream port".to_string(), stream_port])
                .add_row(vec!["streams".to_string(), out.streams.to_string()]);
            println!("{table}");
        }
        OutputFormat::Text => {
            println!("Connection Info:");
            println!("  Client ID:    {}", out.client_id);
            println!("  Client name:  {}", out.client_name);
            println!("  Server:       {}:{}", out.host, out.rpc_port);
            println!("  Stream port:  {stream_port}");
            println!(
                "  Streams:      {}",
                if out.streams { "available" } else { "unavailable" }
            );
        }
    }
}
