use crate::cmd::{CallArgs, ConnectArgs};
use crate::exit::{client_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_value, render_value, OutputFormat};

pub fn run(args: CallArgs, connection: &ConnectArgs, format: OutputFormat) -> CliResult<i32> {
    let call = args.procedure.descriptor()?;
    let client = connection.connect(false)?;

    let payload = client
        .invoke(&call)
        .map_err(|err| client_error("call failed", err))?;
    client.close();

    let value = render_value(&payload, args.procedure.decode)
        .map_err(|err| CliError::new(DATA_INVALID, format!("decode failed: {err}")))?;
    print_value(&args.procedure.label(), None, &value, format);
    Ok(SUCCESS)
}
