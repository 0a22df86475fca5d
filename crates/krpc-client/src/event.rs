use std::fmt;
use std::time::{Duration, Instant};

use krpc_schema::{self as schema, Message};

use crate::call::CallDescriptor;
use crate::client::Client;
use crate::error::{ClientError, Result};
use crate::stream::Stream;

/// A server-side condition, observed through a boolean stream.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Event {
    stream: Stream<bool>,
}

impl Event {
    /// Wrap the `Event` message returned by an event-creating procedure.
    pub fn new(client: &Client, message: &schema::Event) -> Result<Self> {
        let stream = message
            .stream
            .as_ref()
            .ok_or_else(|| ClientError::Protocol("event carries no stream".into()))?;
        Ok(Self {
            stream: Stream::from_id(client, stream.id)?,
        })
    }

    /// Invoke an event-creating procedure and wrap its result.
    pub fn from_call(client: &Client, call: &CallDescriptor) -> Result<Self> {
        let payload = client.invoke(call)?;
        let message = schema::Event::decode(payload)?;
        Self::new(client, &message)
    }

    pub fn from_stream(stream: Stream<bool>) -> Self {
        Self { stream }
    }

    pub fn start(&self) -> Result<()> {
        self.stream.start()
    }

    /// Block until the condition holds.
    pub fn wait(&self) -> Result<()> {
        self.wait_until(None).map(|_| ())
    }

    /// Block until the condition holds or `timeout` elapses. Returns `false`
    /// on timeout.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<bool> {
        self.wait_until(Some(Instant::now() + timeout))
    }

    fn wait_until(&self, deadline: Option<Instant>) -> Result<bool> {
        self.stream.start()?;
        loop {
            let version = self.stream.version()?;
            if self.stream.try_get()? == Some(true) {
                return Ok(true);
            }
            let streams = self.stream.client().streams()?;
            let timeout = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Ok(false);
                    }
                    Some(remaining)
                }
                None => None,
            };
            if streams.wait(self.stream.id(), version, timeout)?.is_none() {
                return Ok(false);
            }
        }
    }

    /// The boolean stream behind this event.
    pub fn stream(&self) -> &Stream<bool> {
        &self.stream
    }

    pub fn into_stream(self) -> Stream<bool> {
        self.stream
    }

    /// Remove the event's stream from the server.
    pub fn remove(self) -> Result<()> {
        self.stream.remove()
    }
}

impl From<Stream<bool>> for Event {
    fn from(stream: Stream<bool>) -> Self {
        Self::from_stream(stream)
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("stream", &self.stream.id())
            .finish()
    }
}
