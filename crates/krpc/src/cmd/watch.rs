use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use krpc_client::{Raw, Stream};
use tracing::info;

use crate::cmd::{ConnectArgs, WatchArgs};
use crate::exit::{client_error, CliError, CliResult, DATA_INVALID, INTERNAL, SUCCESS};
use crate::output::{print_value, render_value, OutputFormat};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

pub fn run(args: WatchArgs, connection: &ConnectArgs, format: OutputFormat) -> CliResult<i32> {
    let call = args.procedure.descriptor()?;
    let label = args.procedure.label();
    let client = connection.connect(true)?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let stream: Stream<Raw> = client
        .add_stream(&call)
        .map_err(|err| client_error("add stream failed", err))?;
    if let Some(hz) = args.rate {
        stream
            .set_rate(hz)
            .map_err(|err| client_error("set rate failed", err))?;
    }
    info!(id = stream.id(), procedure = %label, "watching stream");

    let mut printed = 0u64;
    let mut seen = 0u64;
    while running.load(Ordering::SeqCst) {
        let version = stream
            .version()
            .map_err(|err| client_error("stream failed", err))?;
        if version > seen {
            seen = version;
            let payload = stream
                .get_raw()
                .map_err(|err| client_error("stream failed", err))?;
            let value = render_value(&payload, args.procedure.decode)
                .map_err(|err| CliError::new(DATA_INVALID, format!("decode failed: {err}")))?;
            printed += 1;
            print_value(&label, Some((stream.id(), printed)), &value, format);

            if args.count.is_some_and(|count| printed >= count) {
                break;
            }
        }
        stream
            .wait_timeout(POLL_INTERVAL)
            .map_err(|err| client_error("stream failed", err))?;
    }

    if let Err(err) = stream.remove() {
        info!(error = %err, "stream removal failed");
    }
    client.close();
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
