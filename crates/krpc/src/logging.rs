use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

/// Crates whose events follow `--log-level`. Everything else is capped at warn.
const KRPC_TARGETS: [&str; 4] = ["krpc", "krpc_client", "krpc_frame", "krpc_transport"];

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

fn targets(level: LogLevel) -> Targets {
    let level = LevelFilter::from(level);
    Targets::new()
        .with_targets(KRPC_TARGETS.map(|target| (target, level)))
        .with_default(level.min(LevelFilter::WARN))
}

/// Install the stderr subscriber. Stdout stays reserved for command output.
///
/// At debug and below, events carry their module and thread so traffic from
/// the stream reader thread can be told apart from calls.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let verbose = LevelFilter::from(level) >= LevelFilter::DEBUG;
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(verbose)
        .with_thread_names(verbose);
    let layer = match format {
        LogFormat::Text => layer.boxed(),
        LogFormat::Json => layer.json().boxed(),
    };

    let _ = tracing_subscriber::registry()
        .with(layer.with_filter(targets(level)))
        .try_init();
}
