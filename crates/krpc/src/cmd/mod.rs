use std::time::Duration;

use bytes::Bytes;
use clap::{Args, Subcommand};
use krpc::hex::unhexlify;
use krpc_client::{
    build_call, CallDescriptor, Client, ClientConfig, DEFAULT_RPC_PORT, DEFAULT_STREAM_PORT,
};
use tracing::debug;

use crate::exit::{client_error, CliError, CliResult, USAGE};
use crate::output::{OutputFormat, ValueType};

pub mod call;
pub mod info;
pub mod version;
pub mod watch;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect and print handshake metadata.
    Info(InfoArgs),
    /// Invoke one procedure and print its result.
    Call(CallArgs),
    /// Register a stream and print its updates.
    Watch(WatchArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, connection: &ConnectArgs, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Info(args) => info::run(args, connection, format),
        Command::Call(args) => call::run(args, connection, format),
        Command::Watch(args) => watch::run(args, connection, format),
        Command::Version(args) => version::run(args),
    }
}

/// Server address flags shared by every networked command.
#[derive(Args, Debug, Clone)]
pub struct ConnectArgs {
    /// Server host name or address.
    #[arg(long, env = "KRPC_ADDRESS", default_value = "127.0.0.1", global = true)]
    pub address: String,

    /// Call channel port.
    #[arg(long, env = "KRPC_RPC_PORT", default_value_t = DEFAULT_RPC_PORT, global = true)]
    pub rpc_port: u16,

    /// Stream channel port.
    #[arg(long, env = "KRPC_STREAM_PORT", default_value_t = DEFAULT_STREAM_PORT, global = true)]
    pub stream_port: u16,

    /// Skip the stream channel.
    #[arg(long, global = true)]
    pub no_streams: bool,

    /// Name the server shows for this client.
    #[arg(long, env = "KRPC_CLIENT_NAME", default_value = "krpc-cli", global = true)]
    pub name: String,

    /// Handshake timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s", global = true)]
    pub timeout: String,
}

impl ConnectArgs {
    pub fn config(&self, streams: bool) -> CliResult<ClientConfig> {
        let mut config = ClientConfig::new(&self.address)
            .with_rpc_port(self.rpc_port)
            .with_client_name(&self.name)
            .with_handshake_timeout(parse_timeout(&self.timeout)?);
        config = if streams && !self.no_streams {
            config.with_stream_port(self.stream_port)
        } else {
            config.without_streams()
        };
        Ok(config)
    }

    pub fn connect(&self, streams: bool) -> CliResult<Client> {
        let config = self.config(streams)?;
        debug!(host = %config.host, rpc_port = config.rpc_port, "connecting");
        Client::connect(config).map_err(|err| client_error("connect failed", err))
    }
}

/// A procedure plus hex-encoded positional arguments.
#[derive(Args, Debug)]
pub struct ProcedureArgs {
    /// Service name, e.g. KRPC.
    pub service: String,
    /// Procedure name, e.g. GetStatus.
    pub procedure: String,
    /// Encoded argument as hex, repeatable, in position order.
    #[arg(long = "arg", value_name = "HEX")]
    pub args: Vec<String>,
    /// Decode the result as this type.
    #[arg(long, value_enum, default_value_t = ValueType::Hex)]
    pub decode: ValueType,
}

impl ProcedureArgs {
    pub fn descriptor(&self) -> CliResult<CallDescriptor> {
        let args = self
            .args
            .iter()
            .enumerate()
            .map(|(i, text)| {
                unhexlify(text)
                    .map(Bytes::from)
                    .map_err(|err| CliError::new(USAGE, format!("argument {i}: {err}")))
            })
            .collect::<CliResult<Vec<Bytes>>>()?;
        Ok(build_call(&self.service, &self.procedure, args))
    }

    pub fn label(&self) -> String {
        format!("{}.{}", self.service, self.procedure)
    }
}

#[derive(Args, Debug)]
pub struct InfoArgs {}

#[derive(Args, Debug)]
pub struct CallArgs {
    #[command(flatten)]
    pub procedure: ProcedureArgs,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    #[command(flatten)]
    pub procedure: ProcedureArgs,
    /// Exit after N updates.
    #[arg(long)]
    pub count: Option<u64>,
    /// Requested update rate in hertz.
    #[arg(long, value_name = "HZ")]
    pub rate: Option<f32>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_timeout(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::usage("timeout must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::usage(format!("invalid timeout value: {input}")))?;

    if value == 0 {
        return Err(CliError::usage("timeout must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_timeout_units() {
        assert_eq!(parse_timeout("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_timeout("2").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_timeout("150ms").unwrap(), Duration::from_millis(150));
    }

    #[test]
    fn parse_timeout_invalid() {
        assert!(parse_timeout("0s").is_err());
        assert!(parse_timeout("bad").is_err());
        assert!(parse_timeout(" ").is_err());
    }

    #[test]
    fn descriptor_decodes_hex_args() {
        let args = ProcedureArgs {
            service: "Svc".into(),
            procedure: "Double".into(),
            args: vec!["0a".into(), "".into()],
            decode: ValueType::Int32,
        };
        let call = args.descriptor().unwrap();
        assert_eq!(call.argument(0).map(|b| &b[..]), Some(&[0x0a][..]));
        assert_eq!(call.argument(1).map(|b| b.len()), Some(0));
        assert_eq!(args.label(), "Svc.Double");
    }

    #[test]
    fn descriptor_rejects_bad_hex() {
        let args = ProcedureArgs {
            service: "Svc".into(),
            procedure: "Double".into(),
            args: vec!["0x".into()],
            decode: ValueType::Hex,
        };
        assert_eq!(args.descriptor().unwrap_err().code, USAGE);
    }

    #[test]
    fn streams_follow_flag() {
        let connect = ConnectArgs {
            address: "10.0.0.5".into(),
            rpc_port: 1,
            stream_port: 2,
            no_streams: false,
            name: "n".into(),
            timeout: "1s".into(),
        };
        assert_eq!(connect.config(true).unwrap().stream_port, Some(2));
        assert_eq!(connect.config(false).unwrap().stream_port, None);

        let no_streams = ConnectArgs {
            no_streams: true,
            ..connect
        };
        assert_eq!(no_streams.config(true).unwrap().stream_port, None);
    }
}
