//! Request/response invocation over the call channel.

use bytes::Bytes;
use krpc_schema::{ProcedureResult, Request, Response};
use tracing::debug;

use crate::call::CallDescriptor;
use crate::connection::Connection;
use crate::error::{ClientError, Result};
use crate::exception::ExceptionRegistry;

/// The call channel paired with the registry that translates its errors.
#[derive(Clone, Copy)]
pub(crate) struct Invoker<'a> {
    pub(crate) conn: &'a Connection,
    pub(crate) registry: &'a ExceptionRegistry,
}

impl Invoker<'_> {
    pub(crate) fn invoke(&self, call: &CallDescriptor) -> Result<Bytes> {
        invoke(self.conn, self.registry, call)
    }
}

/// Invoke a single call and return its raw result payload.
pub(crate) fn invoke(
    conn: &Connection,
    registry: &ExceptionRegistry,
    call: &CallDescriptor,
) -> Result<Bytes> {
    let request = Request {
        calls: vec![call.to_proto()],
    };
    let response = conn.round_trip(&request)?;
    let mut results = checked_results(registry, response, 1)?;
    match results.pop() {
        Some(result) => result_payload(registry, result),
        None => Err(ClientError::Protocol("response carried no result".into())),
    }
}

/// Invoke several calls in one request. Results keep submission order and
/// fail independently.
pub(crate) fn invoke_batch(
    conn: &Connection,
    registry: &ExceptionRegistry,
    calls: &[CallDescriptor],
) -> Result<Vec<Result<Bytes>>> {
    if calls.is_empty() {
        return Ok(Vec::new());
    }

    let request = Request {
        calls: calls.iter().map(CallDescriptor::to_proto).collect(),
    };
    let response = conn.round_trip(&request)?;
    let results = checked_results(registry, response, calls.len())?;
    Ok(results
        .into_iter()
        .map(|result| result_payload(registry, result))
        .collect())
}

fn checked_results(
    registry: &ExceptionRegistry,
    response: Response,
    expected: usize,
) -> Result<Vec<ProcedureResult>> {
    if let Some(error) = &response.error {
        debug!(
            service = %error.service,
            name = %error.name,
            "request rejected by server"
        );
        return Err(registry.translate(error));
    }
    if response.results.len() != expected {
        return Err(ClientError::Protocol(format!(
            "expected {expected} results, server returned {}",
            response.results.len()
        )));
    }
    Ok(response.results)
}

pub(crate) fn result_payload(
    registry: &ExceptionRegistry,
    result: ProcedureResult,
) -> Result<Bytes> {
    match &result.error {
        Some(error) => Err(registry.translate(error)),
        None => Ok(result.value),
    }
}
