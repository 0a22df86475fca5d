mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::{Command, ConnectArgs};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "krpc", version, about = "Inspect and call krpc servers")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    #[command(flatten)]
    connection: ConnectArgs,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, &cli.connection, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::ValueType;

    #[test]
    fn parses_call_subcommand() {
        let cli = Cli::try_parse_from([
            "krpc",
            "call",
            "TestService",
            "Double",
            "--arg",
            "0a",
            "--decode",
            "int32",
        ])
        .expect("call args should parse");

        match cli.command {
            Command::Call(args) => {
                assert_eq!(args.procedure.service, "TestService");
                assert_eq!(args.procedure.args, ["0a"]);
                assert_eq!(args.procedure.decode, ValueType::Int32);
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn parses_watch_subcommand() {
        let cli = Cli::try_parse_from([
            "krpc", "watch", "KRPC", "GetStatus", "--count", "3", "--rate", "2.5",
        ])
        .expect("watch args should parse");

        match cli.command {
            Command::Watch(args) => {
                assert_eq!(args.count, Some(3));
                assert_eq!(args.rate, Some(2.5));
                assert_eq!(args.procedure.decode, ValueType::Hex);
            }
            other => panic!("expected watch, got {other:?}"),
        }
    }

    #[test]
    fn connection_flags_are_global() {
        let cli = Cli::try_parse_from([
            "krpc",
            "info",
            "--address",
            "10.1.2.3",
            "--rpc-port",
            "6000",
            "--stream-port",
            "6001",
            "--name",
            "flight-log",
        ])
        .expect("info args should parse");

        assert!(matches!(cli.command, Command::Info(_)));
        assert_eq!(cli.connection.address, "10.1.2.3");
        assert_eq!(cli.connection.rpc_port, 6000);
        assert_eq!(cli.connection.stream_port, 6001);
        assert_eq!(cli.connection.name, "flight-log");
    }

    #[test]
    fn rejects_unknown_decode_type() {
        let err = Cli::try_parse_from(["krpc", "call", "S", "P", "--decode", "quaternion"])
            .expect_err("unknown type should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }

    #[test]
    fn format_flag() {
        let cli = Cli::try_parse_from(["krpc", "--format", "json", "version"])
            .expect("version args should parse");
        assert_eq!(cli.format, Some(OutputFormat::Json));
    }
}
