use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::debug;

use crate::call::{self, CallDescriptor};
use crate::codec::{decode, Decode};
use crate::config::ClientConfig;
use crate::connection::{Connection, ConnectionState};
use crate::error::{ClientError, Result};
use crate::event::Event;
use crate::exception::ExceptionRegistry;
use crate::invoker::{self, Invoker};
use crate::stream::Stream;
use crate::stream_manager::{StreamFreeze, StreamManager};

/// A connection to a server.
///
/// `Client` is a cheap handle: clones share one connection, and the
/// connection closes when the last clone (including those held by streams and
/// events) is dropped, or earlier through [`close`](Self::close).
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    conn: Connection,
    registry: ExceptionRegistry,
    streams: Option<StreamManager>,
}

impl ClientInner {
    fn close(&self) {
        if !self.conn.begin_close() {
            return;
        }
        debug!("closing connection");
        if let Some(streams) = &self.streams {
            streams.stop();
        }
        self.conn.finish_close();
        if let Some(streams) = &self.streams {
            streams.join();
        }
    }
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        self.close();
    }
}

impl Client {
    /// Connect and complete the handshake on every configured channel.
    pub fn connect(config: ClientConfig) -> Result<Self> {
        let (conn, stream_channel) = Connection::open(config)?;
        let streams = match stream_channel {
            Some(channel) => Some(StreamManager::spawn(channel)?),
            None => None,
        };
        Ok(Self {
            inner: Arc::new(ClientInner {
                conn,
                registry: ExceptionRegistry::new(),
                streams,
            }),
        })
    }

    /// Close both channels. Blocked calls and stream waiters fail with
    /// [`ClientError::ConnectionClosed`]. Calling this again does nothing.
    pub fn close(&self) {
        self.inner.close();
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.conn.state()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Identifier the server assigned during the handshake.
    pub fn client_id(&self) -> &Bytes {
        self.inner.conn.client_id()
    }

    pub fn name(&self) -> &str {
        &self.inner.conn.config().client_name
    }

    pub fn config(&self) -> &ClientConfig {
        self.inner.conn.config()
    }

    /// Whether the stream channel is connected.
    pub fn has_streams(&self) -> bool {
        self.inner.streams.is_some()
    }

    /// See [`build_call`](crate::build_call).
    pub fn build_call<I>(
        &self,
        service: impl Into<String>,
        procedure: impl Into<String>,
        args: I,
    ) -> CallDescriptor
    where
        I: IntoIterator,
        I::Item: Into<Bytes>,
    {
        call::build_call(service, procedure, args)
    }

    /// Invoke a call and return the raw result payload.
    pub fn invoke(&self, call: &CallDescriptor) -> Result<Bytes> {
        self.invoker().invoke(call)
    }

    /// Invoke a call and decode its result.
    pub fn call<T: Decode>(&self, call: &CallDescriptor) -> Result<T> {
        let payload = self.invoke(call)?;
        Ok(decode(&payload)?)
    }

    /// Invoke several calls in one round trip.
    ///
    /// The outer error means the whole request failed. Otherwise there is one
    /// inner result per call, in submission order.
    pub fn invoke_batch(&self, calls: &[CallDescriptor]) -> Result<Vec<Result<Bytes>>> {
        invoker::invoke_batch(&self.inner.conn, &self.inner.registry, calls)
    }

    /// Route server errors tagged `(service, name)` to `factory`.
    pub fn add_exception_thrower<F, E>(
        &self,
        service: impl Into<String>,
        name: impl Into<String>,
        factory: F,
    ) -> bool
    where
        F: Fn(&str) -> E + Send + Sync + 'static,
        E: Error + Send + Sync + 'static,
    {
        self.inner.registry.register(service, name, factory)
    }

    pub fn exceptions(&self) -> &ExceptionRegistry {
        &self.inner.registry
    }

    /// Register `call` as a started stream.
    pub fn add_stream<T: Decode>(&self, call: &CallDescriptor) -> Result<Stream<T>> {
        Stream::new(self, call)
    }

    /// Wrap the event returned by `call`.
    pub fn add_event(&self, call: &CallDescriptor) -> Result<Event> {
        Event::from_call(self, call)
    }

    /// Hold stream delivery so several streams can be read consistently.
    ///
    /// Updates arriving while the guard lives are queued, not lost. Streams
    /// can still be added and the connection closed from the freezing thread.
    pub fn freeze_streams(&self) -> Result<StreamFreeze<'_>> {
        Ok(self.streams()?.freeze())
    }

    /// Block until the server's next update batch lands, for any stream.
    ///
    /// Returns `Ok(false)` when `timeout` elapses first; `None` waits
    /// indefinitely.
    pub fn wait_for_stream_update(&self, timeout: Option<Duration>) -> Result<bool> {
        self.streams()?.wait_for_update(timeout)
    }

    /// Number of streams this client tracks.
    pub fn stream_count(&self) -> usize {
        self.inner.streams.as_ref().map_or(0, StreamManager::len)
    }

    pub(crate) fn streams(&self) -> Result<&StreamManager> {
        if !self.is_connected() {
            return Err(ClientError::ConnectionClosed);
        }
        self.inner
            .streams
            .as_ref()
            .ok_or(ClientError::StreamsUnavailable)
    }

    pub(crate) fn invoker(&self) -> Invoker<'_> {
        Invoker {
            conn: &self.inner.conn,
            registry: &self.inner.registry,
        }
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("name", &self.name())
            .field("connection", &self.inner.conn)
            .field("streams", &self.has_streams())
            .finish()
    }
}
