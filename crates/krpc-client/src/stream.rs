use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::time::Duration;

use bytes::Bytes;

use crate::call::CallDescriptor;
use crate::client::Client;
use crate::codec::{decode, Decode};
use crate::error::Result;
use crate::stream_manager::StreamId;

/// A server-side expression re-evaluated and pushed to the client.
///
/// Values arrive in the background; [`get`](Self::get) returns the latest
/// one, decoded as `T`. Two handles on the same server stream compare equal.
pub struct Stream<T> {
    client: Client,
    id: StreamId,
    _value: PhantomData<fn() -> T>,
}

impl<T: Decode> Stream<T> {
    /// Register `call` as a stream and start it.
    pub fn new(client: &Client, call: &CallDescriptor) -> Result<Self> {
        Self::register(client, call, true)
    }

    /// Register `call` without starting it. The stream starts on the first
    /// [`start`](Self::start), [`get`](Self::get) or [`wait`](Self::wait).
    pub fn dormant(client: &Client, call: &CallDescriptor) -> Result<Self> {
        Self::register(client, call, false)
    }

    fn register(client: &Client, call: &CallDescriptor, start: bool) -> Result<Self> {
        let id = client
            .streams()?
            .add_stream(&client.invoker(), call, start)?;
        Ok(Self::with_id(client, id))
    }

    /// Track a stream the server created by some other route.
    pub fn from_id(client: &Client, id: StreamId) -> Result<Self> {
        client.streams()?.attach(id)?;
        Ok(Self::with_id(client, id))
    }

    fn with_id(client: &Client, id: StreamId) -> Self {
        Self {
            client: client.clone(),
            id,
            _value: PhantomData,
        }
    }

    pub fn id(&self) -> StreamId {
        self.id
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn start(&self) -> Result<()> {
        self.client
            .streams()?
            .start(&self.client.invoker(), self.id)
    }

    pub fn is_started(&self) -> Result<bool> {
        self.client.streams()?.is_started(self.id)
    }

    /// Latest value, blocking until the first one arrives.
    pub fn get(&self) -> Result<T> {
        let payload = self.get_raw()?;
        Ok(decode(&payload)?)
    }

    /// Latest value as received, without decoding.
    pub fn get_raw(&self) -> Result<Bytes> {
        self.client.streams()?.get(&self.client.invoker(), self.id)
    }

    /// Latest value, or `None` before the first update.
    pub fn try_get(&self) -> Result<Option<T>> {
        match self
            .client
            .streams()?
            .try_get(self.client.exceptions(), self.id)?
        {
            Some(payload) => Ok(Some(decode(&payload)?)),
            None => Ok(None),
        }
    }

    /// Number of updates received so far.
    pub fn version(&self) -> Result<u64> {
        self.client.streams()?.version(self.id)
    }

    /// Block until the next update arrives.
    pub fn wait(&self) -> Result<()> {
        self.wait_for(None).map(|_| ())
    }

    /// Block until the next update arrives or `timeout` elapses. Returns
    /// `false` on timeout.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<bool> {
        self.wait_for(Some(timeout))
    }

    fn wait_for(&self, timeout: Option<Duration>) -> Result<bool> {
        let streams = self.client.streams()?;
        let since = streams.version(self.id)?;
        streams.start(&self.client.invoker(), self.id)?;
        Ok(streams.wait(self.id, since, timeout)?.is_some())
    }

    /// Update rate in hertz; zero means unlimited.
    pub fn rate(&self) -> Result<f32> {
        self.client.streams()?.rate(self.id)
    }

    pub fn set_rate(&self, hz: f32) -> Result<()> {
        self.client
            .streams()?
            .set_rate(&self.client.invoker(), self.id, hz)
    }

    /// Remove the stream from the server. Other handles on the same stream
    /// fail with [`ClientError::StreamNotFound`](crate::ClientError::StreamNotFound)
    /// afterwards.
    pub fn remove(self) -> Result<()> {
        self.client
            .streams()?
            .remove(&self.client.invoker(), self.id)
    }
}

impl<T> Clone for Stream<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            id: self.id,
            _value: PhantomData,
        }
    }
}

impl<T> PartialEq for Stream<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Stream<T> {}

impl<T> Hash for Stream<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> fmt::Debug for Stream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("id", &self.id)
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}
