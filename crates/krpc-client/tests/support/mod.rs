//! In-process stand-in for a krpc server.
//!
//! Serves a small `TestService` plus the `KRPC` stream management procedures
//! over real TCP sockets, speaking the same framing and handshake as a real
//! server.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use krpc_client::handshake::handshake_server;
use krpc_client::schema::{
    self, connection_response, ConnectionResponse, Message, ProcedureCall, ProcedureResult,
    Request, Response, StreamResult, StreamUpdate,
};
use krpc_client::{decode, encode, ClientConfig};
use krpc_frame::{FrameReader, FrameWriter};
use krpc_transport::{RpcStream, TcpTransport};

pub const CLIENT_ID: &[u8] = b"\x10\x20\x30\x40\x50\x60\x70\x80\x90\xa0\xb0\xc0\xd0\xe0\xf0\x00";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handshake {
    Accept,
    Reject,
}

struct StreamEntry {
    call: ProcedureCall,
    started: bool,
    rate: f32,
}

#[derive(Default)]
struct State {
    counter: i32,
    flag: bool,
    next_stream_id: u64,
    streams: BTreeMap<u64, StreamEntry>,
    updates: Option<FrameWriter<RpcStream>>,
    updates_socket: Option<RpcStream>,
    requests: usize,
}

pub struct StubServer {
    rpc_port: u16,
    stream_port: u16,
    state: Arc<Mutex<State>>,
}

impl StubServer {
    pub fn start() -> Self {
        Self::spawn(Handshake::Accept, true)
    }

    /// Serve the call channel only.
    pub fn start_without_streams() -> Self {
        Self::spawn(Handshake::Accept, false)
    }

    pub fn start_rejecting() -> Self {
        Self::spawn(Handshake::Reject, false)
    }

    fn spawn(handshake: Handshake, streams: bool) -> Self {
        let rpc = TcpTransport::bind("127.0.0.1:0").expect("rpc listener should bind");
        let stream = TcpTransport::bind("127.0.0.1:0").expect("stream listener should bind");
        let state = Arc::new(Mutex::new(State {
            next_stream_id: 1,
            ..State::default()
        }));
        let server = Self {
            rpc_port: rpc.local_addr().port(),
            stream_port: stream.local_addr().port(),
            state: Arc::clone(&state),
        };

        thread::spawn(move || {
            let Ok(conn) = rpc.accept() else { return };
            let mut reader = FrameReader::new(conn.try_clone().expect("clone"));
            let mut writer = FrameWriter::new(conn);
            let accepted = handshake_server(&mut reader, &mut writer, Duration::from_secs(5), |_| {
                match handshake {
                    Handshake::Accept => ConnectionResponse {
                        status: connection_response::Status::Ok as i32,
                        message: String::new(),
                        client_identifier: Bytes::from_static(CLIENT_ID),
                    },
                    Handshake::Reject => ConnectionResponse {
                        status: connection_response::Status::MalformedMessage as i32,
                        message: "go away".into(),
                        client_identifier: Bytes::new(),
                    },
                }
            });
            if accepted.is_err() || handshake == Handshake::Reject {
                return;
            }

            if streams {
                let Ok(updates) = stream.accept() else { return };
                let mut stream_reader = FrameReader::new(updates.try_clone().expect("clone"));
                let socket = updates.try_clone().expect("clone");
                let mut stream_writer = FrameWriter::new(updates);
                let result = handshake_server(
                    &mut stream_reader,
                    &mut stream_writer,
                    Duration::from_secs(5),
                    |req| {
                        let status = if req.client_identifier.as_ref() == CLIENT_ID {
                            connection_response::Status::Ok
                        } else {
                            connection_response::Status::MalformedMessage
                        };
                        ConnectionResponse {
                            status: status as i32,
                            ..ConnectionResponse::default()
                        }
                    },
                );
                if result.is_err() {
                    return;
                }
                let mut st = state.lock().unwrap();
                st.updates = Some(stream_writer);
                st.updates_socket = Some(socket);
            }

            serve_calls(&state, reader, writer);
        });

        server
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::new("127.0.0.1")
            .with_rpc_port(self.rpc_port)
            .with_stream_port(self.stream_port)
            .with_client_name("integration")
            .with_handshake_timeout(Duration::from_secs(5))
    }

    pub fn rpc_port(&self) -> u16 {
        self.rpc_port
    }

    pub fn stream_port(&self) -> u16 {
        self.stream_port
    }

    /// Requests the server has answered.
    pub fn requests(&self) -> usize {
        self.state.lock().unwrap().requests
    }

    pub fn stream_rate(&self, id: u64) -> Option<f32> {
        self.state.lock().unwrap().streams.get(&id).map(|s| s.rate)
    }

    pub fn has_stream(&self, id: u64) -> bool {
        self.state.lock().unwrap().streams.contains_key(&id)
    }

    /// Drop the stream channel as if the server went away.
    pub fn hang_up_streams(&self) {
        let mut st = self.state.lock().unwrap();
        st.updates = None;
        if let Some(socket) = st.updates_socket.take() {
            let _ = socket.shutdown();
        }
    }
}

fn serve_calls(
    state: &Arc<Mutex<State>>,
    mut reader: FrameReader<RpcStream>,
    mut writer: FrameWriter<RpcStream>,
) {
    while let Ok(frame) = reader.read_frame() {
        let request = Request::decode(frame).expect("client sent a valid request");

        if request
            .calls
            .iter()
            .any(|c| c.service == "TestService" && c.procedure == "RejectAll")
        {
            let response = Response {
                error: Some(schema::Error::untyped("request rejected")),
                results: Vec::new(),
            };
            if writer.send(&response.encode_to_vec()).is_err() {
                return;
            }
            continue;
        }

        let mut results = Vec::with_capacity(request.calls.len());
        let mut hold = false;
        for call in &request.calls {
            match dispatch(state, call) {
                Some(result) => results.push(result),
                None => hold = true,
            }
        }
        if hold {
            // Never answer; the client has to give up on its own.
            continue;
        }

        state.lock().unwrap().requests += 1;
        let response = Response {
            error: None,
            results,
        };
        if writer.send(&response.encode_to_vec()).is_err() {
            return;
        }
    }
}

fn arg(call: &ProcedureCall, position: u32) -> Bytes {
    call.arguments
        .iter()
        .find(|a| a.position == position)
        .map(|a| a.value.clone())
        .unwrap_or_default()
}

/// Evaluate a call against current state. `None` means "do not respond".
fn dispatch(state: &Arc<Mutex<State>>, call: &ProcedureCall) -> Option<ProcedureResult> {
    let mut st = state.lock().unwrap();
    let result = match (call.service.as_str(), call.procedure.as_str()) {
        ("KRPC", "AddStream") => {
            let inner = ProcedureCall::decode(arg(call, 0)).expect("stream call");
            let start: bool = decode(&arg(call, 1)).unwrap_or(true);
            let existing = st
                .streams
                .iter()
                .find(|(_, s)| s.call == inner)
                .map(|(id, _)| *id);
            let id = match existing {
                Some(id) => id,
                None => {
                    let id = st.next_stream_id;
                    st.next_stream_id += 1;
                    st.streams.insert(
                        id,
                        StreamEntry {
                            call: inner,
                            started: false,
                            rate: 0.0,
                        },
                    );
                    id
                }
            };
            if start {
                if let Some(entry) = st.streams.get_mut(&id) {
                    entry.started = true;
                }
                // Push the first value ahead of the AddStream response.
                push_updates(&mut st, Some(id));
            }
            ProcedureResult::ok(schema::Stream { id }.encode_to_vec())
        }
        ("KRPC", "StartStream") => {
            let id: u64 = decode(&arg(call, 0)).unwrap_or_default();
            match st.streams.get_mut(&id) {
                Some(entry) => {
                    entry.started = true;
                    push_updates(&mut st, Some(id));
                    ProcedureResult::ok(Bytes::new())
                }
                None => no_such_stream(id),
            }
        }
        ("KRPC", "RemoveStream") => {
            let id: u64 = decode(&arg(call, 0)).unwrap_or_default();
            match st.streams.remove(&id) {
                Some(_) => ProcedureResult::ok(Bytes::new()),
                None => no_such_stream(id),
            }
        }
        ("KRPC", "SetStreamRate") => {
            let id: u64 = decode(&arg(call, 0)).unwrap_or_default();
            let rate: f32 = decode(&arg(call, 1)).unwrap_or_default();
            match st.streams.get_mut(&id) {
                Some(entry) => {
                    entry.rate = rate;
                    ProcedureResult::ok(Bytes::new())
                }
                None => no_such_stream(id),
            }
        }
        ("TestService", "SetCounter") => {
            st.counter = decode(&arg(call, 0)).unwrap_or_default();
            push_updates(&mut st, None);
            ProcedureResult::ok(Bytes::new())
        }
        ("TestService", "SetFlag") => {
            st.flag = decode(&arg(call, 0)).unwrap_or_default();
            push_updates(&mut st, None);
            ProcedureResult::ok(Bytes::new())
        }
        ("TestService", "AddEvent") => {
            let watch = ProcedureCall {
                service: "TestService".into(),
                procedure: "Flag".into(),
                ..ProcedureCall::default()
            };
            let id = st.next_stream_id;
            st.next_stream_id += 1;
            st.streams.insert(
                id,
                StreamEntry {
                    call: watch,
                    started: false,
                    rate: 0.0,
                },
            );
            let event = schema::Event {
                stream: Some(schema::Stream { id }),
            };
            ProcedureResult::ok(event.encode_to_vec())
        }
        ("TestService", "Block") => return None,
        _ => evaluate(&st, call),
    };
    Some(result)
}

/// Pure procedures, usable both as calls and as stream expressions.
fn evaluate(st: &State, call: &ProcedureCall) -> ProcedureResult {
    match (call.service.as_str(), call.procedure.as_str()) {
        ("TestService", "Double") => match decode::<i32>(&arg(call, 0)) {
            Ok(value) => ProcedureResult::ok(encode(&(value * 2))),
            Err(err) => ProcedureResult::err(schema::Error::typed(
                "TestService",
                "ArgumentException",
                err.to_string(),
            )),
        },
        ("TestService", "Echo") => ProcedureResult::ok(arg(call, 0)),
        ("TestService", "Counter") => ProcedureResult::ok(encode(&st.counter)),
        ("TestService", "CounterTimes") => {
            let factor: i32 = decode(&arg(call, 0)).unwrap_or(1);
            ProcedureResult::ok(encode(&(st.counter * factor)))
        }
        ("TestService", "Flag") => ProcedureResult::ok(encode(&st.flag)),
        // Streams over this call never receive a value.
        ("TestService", "Silent") => ProcedureResult::ok(encode(&0i32)),
        ("TestService", "Fail") => {
            let message: String = decode(&arg(call, 0)).unwrap_or_default();
            ProcedureResult::err(schema::Error::typed("TestService", "CustomError", message))
        }
        ("TestService", "FailUntyped") => ProcedureResult::err(schema::Error {
            service: "TestService".into(),
            name: "Unregistered".into(),
            description: "something broke".into(),
            stack_trace: "at TestService.FailUntyped()".into(),
        }),
        ("TestService", "FailWhenCounterNegative") => {
            if st.counter < 0 {
                ProcedureResult::err(schema::Error::typed(
                    "TestService",
                    "CustomError",
                    "negative counter",
                ))
            } else {
                ProcedureResult::ok(encode(&st.counter))
            }
        }
        (service, procedure) => ProcedureResult::err(schema::Error::untyped(format!(
            "procedure {service}.{procedure} not found"
        ))),
    }
}

fn no_such_stream(id: u64) -> ProcedureResult {
    ProcedureResult::err(schema::Error::untyped(format!("no stream with id {id}")))
}

/// Re-evaluate started streams (or just `only`) and push one update batch.
fn push_updates(st: &mut State, only: Option<u64>) {
    let view: &State = st;
    let results: Vec<StreamResult> = view
        .streams
        .iter()
        .filter(|(id, entry)| entry.started && only.is_none_or(|only| only == **id))
        .filter(|(_, entry)| entry.call.procedure != "Silent")
        .map(|(id, entry)| StreamResult {
            id: *id,
            result: Some(evaluate(view, &entry.call)),
        })
        .collect();
    if results.is_empty() {
        return;
    }
    let update = StreamUpdate { results }.encode_to_vec();
    if let Some(writer) = st.updates.as_mut() {
        if writer.send(&update).is_err() {
            st.updates = None;
        }
    }
}
