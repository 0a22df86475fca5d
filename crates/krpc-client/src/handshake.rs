//! Connection handshakes for the call and stream channels.
//!
//! Each channel opens with one `ConnectionRequest` from the client and one
//! `ConnectionResponse` from the server. The call channel introduces the client
//! by name and receives an opaque identifier; the stream channel presents that
//! identifier so the server can route updates for this client to it.

use std::io::{Read, Write};
use std::time::{Duration, Instant};

use bytes::Bytes;
use krpc_frame::{FrameError, FrameReader, FrameWriter};
use krpc_schema::{
    connection_request, connection_response, ConnectionRequest, ConnectionResponse, Message,
};
use tracing::debug;

use crate::config::MAX_CLIENT_NAME_LEN;
use crate::error::{ClientError, Result};

/// Outcome of a successful call channel handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeResult {
    /// Identifier the server assigned to this client.
    pub client_identifier: Bytes,
    /// Informational text from the server, usually empty.
    pub message: String,
}

/// Introduce the client on the call channel.
pub fn handshake_rpc<R: Read, W: Write>(
    reader: &mut FrameReader<R>,
    writer: &mut FrameWriter<W>,
    client_name: &str,
    timeout: Duration,
) -> Result<HandshakeResult> {
    if client_name.len() > MAX_CLIENT_NAME_LEN {
        return Err(ClientError::Connection(format!(
            "client name is {} bytes (max {MAX_CLIENT_NAME_LEN})",
            client_name.len()
        )));
    }

    send_message(writer, &ConnectionRequest::rpc(client_name))?;
    let resp = recv_response(reader, timeout)?;
    check_status(&resp)?;

    debug!(
        client_id = ?resp.client_identifier,
        "call channel handshake complete"
    );
    Ok(HandshakeResult {
        client_identifier: resp.client_identifier,
        message: resp.message,
    })
}

/// Attach the stream channel to the client identified by `client_identifier`.
pub fn handshake_stream<R: Read, W: Write>(
    reader: &mut FrameReader<R>,
    writer: &mut FrameWriter<W>,
    client_identifier: &Bytes,
    timeout: Duration,
) -> Result<()> {
    if client_identifier.is_empty() {
        return Err(ClientError::Connection(
            "server assigned no client identifier".to_string(),
        ));
    }

    send_message(writer, &ConnectionRequest::stream(client_identifier.clone()))?;
    let resp = recv_response(reader, timeout)?;
    check_status(&resp)?;

    debug!(client_id = ?client_identifier, "stream channel handshake complete");
    Ok(())
}

/// Server side of either handshake: read the request and answer with
/// whatever `respond` decides.
pub fn handshake_server<R, W, F>(
    reader: &mut FrameReader<R>,
    writer: &mut FrameWriter<W>,
    timeout: Duration,
    respond: F,
) -> Result<ConnectionRequest>
where
    R: Read,
    W: Write,
    F: FnOnce(&ConnectionRequest) -> ConnectionResponse,
{
    let payload = recv_payload(reader, timeout)?;
    let req = ConnectionRequest::decode(payload)?;
    let resp = respond(&req);
    send_message(writer, &resp)?;
    Ok(req)
}

fn check_status(resp: &ConnectionResponse) -> Result<()> {
    match connection_response::Status::try_from(resp.status) {
        Ok(connection_response::Status::Ok) => Ok(()),
        Ok(status) => Err(ClientError::Connection(describe_rejection(
            &format!("{status:?}"),
            &resp.message,
        ))),
        Err(_) => Err(ClientError::Connection(describe_rejection(
            &format!("unknown status {}", resp.status),
            &resp.message,
        ))),
    }
}

fn describe_rejection(status: &str, message: &str) -> String {
    if message.is_empty() {
        format!("server rejected handshake ({status})")
    } else {
        format!("server rejected handshake ({status}): {message}")
    }
}

fn send_message<M: Message, W: Write>(writer: &mut FrameWriter<W>, message: &M) -> Result<()> {
    writer.send(&message.encode_to_vec())?;
    Ok(())
}

fn recv_response<R: Read>(
    reader: &mut FrameReader<R>,
    timeout: Duration,
) -> Result<ConnectionResponse> {
    let payload = recv_payload(reader, timeout)?;
    ConnectionResponse::decode(payload).map_err(|err| {
        ClientError::Connection(format!("malformed handshake response: {err}"))
    })
}

fn recv_payload<R: Read>(reader: &mut FrameReader<R>, timeout: Duration) -> Result<Bytes> {
    let deadline = Instant::now() + timeout;
    loop {
        if Instant::now() >= deadline {
            return Err(ClientError::Timeout(timeout));
        }

        match reader.read_frame() {
            Ok(payload) => return Ok(payload),
            Err(err) if err.is_timeout() => continue,
            Err(FrameError::ConnectionClosed | FrameError::Truncated { .. }) => {
                return Err(ClientError::Connection(
                    "connection closed during handshake".to_string(),
                ));
            }
            Err(err) => return Err(ClientError::Frame(err)),
        }
    }
}

/// Request type of a handshake, for servers built on [`handshake_server`].
pub fn request_kind(req: &ConnectionRequest) -> Option<connection_request::Type> {
    connection_request::Type::try_from(req.r#type).ok()
}
