//! Stream registration and the cache fed by the stream channel.
//!
//! One background thread owns the stream channel. It reads `StreamUpdate`
//! batches and writes each result into the cache entry for its stream id,
//! bumping the entry's version. Readers never see a partially applied batch:
//! the whole batch lands under one cache lock, followed by a single
//! notification on the shared condition variable.
//!
//! Delivery can be held back. While a freeze guard or a stream registration
//! is outstanding, the reader keeps draining the socket but parks incoming
//! results in a pending queue, applied in arrival order once the last hold is
//! released. The server may push the first value for a new stream before the
//! `AddStream` response reaches us; the hold taken during registration keeps
//! that value until the cache entry exists.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use bytes::Bytes;
use krpc_frame::{FrameError, FrameReader};
use krpc_schema::{self as schema, Message, StreamResult, StreamUpdate};
use krpc_transport::RpcStream;
use tracing::{debug, trace, warn};

use crate::call::{build_call, CallDescriptor};
use crate::codec::encode;
use crate::connection::StreamChannel;
use crate::error::{ClientError, Result};
use crate::exception::ExceptionRegistry;
use crate::invoker::Invoker;

/// Server-assigned stream identifier.
pub type StreamId = u64;

const KRPC_SERVICE: &str = "KRPC";
const READER_THREAD_NAME: &str = "krpc-stream-reader";

type CachedValue = std::result::Result<Bytes, schema::Error>;

#[derive(Default)]
struct Entry {
    value: Option<CachedValue>,
    version: u64,
    started: bool,
    rate: f32,
}

enum ChannelStatus {
    Open,
    Closed,
    Failed(String),
}

struct Cache {
    entries: HashMap<StreamId, Entry>,
    status: ChannelStatus,
    /// Outstanding freeze guards and registrations.
    holds: usize,
    /// Results read while delivery was held.
    pending: Vec<StreamResult>,
    /// Bumped once per delivered batch, across all streams.
    generation: u64,
}

impl Cache {
    fn check_open(&self) -> Result<()> {
        match &self.status {
            ChannelStatus::Open => Ok(()),
            ChannelStatus::Closed => Err(ClientError::ConnectionClosed),
            ChannelStatus::Failed(reason) => Err(ClientError::Disconnected(reason.clone())),
        }
    }

    fn entry(&self, id: StreamId) -> Result<&Entry> {
        self.entries.get(&id).ok_or(ClientError::StreamNotFound(id))
    }

    fn entry_mut(&mut self, id: StreamId) -> Result<&mut Entry> {
        self.entries
            .get_mut(&id)
            .ok_or(ClientError::StreamNotFound(id))
    }

    /// Apply one batch of results. Returns how many landed on known streams.
    fn deliver(&mut self, results: Vec<StreamResult>) -> usize {
        let mut applied = 0;
        for result in results {
            let Some(entry) = self.entries.get_mut(&result.id) else {
                trace!(id = result.id, "update for unknown stream discarded");
                continue;
            };
            entry.value = Some(match result.result {
                Some(schema::ProcedureResult {
                    error: Some(error), ..
                }) => Err(error),
                Some(result) => Ok(result.value),
                None => Ok(Bytes::new()),
            });
            entry.version += 1;
            applied += 1;
        }
        self.generation += 1;
        applied
    }
}

struct Shared {
    cache: Mutex<Cache>,
    updated: Condvar,
}

impl Shared {
    fn lock_cache(&self) -> MutexGuard<'_, Cache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(&self, cache: MutexGuard<'a, Cache>) -> MutexGuard<'a, Cache> {
        self.updated
            .wait(cache)
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn wait_until<'a>(
        &self,
        cache: MutexGuard<'a, Cache>,
        deadline: Instant,
    ) -> MutexGuard<'a, Cache> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        self.updated
            .wait_timeout(cache, remaining)
            .unwrap_or_else(PoisonError::into_inner)
            .0
    }

    fn hold(&self) -> StreamFreeze<'_> {
        self.lock_cache().holds += 1;
        StreamFreeze { shared: self }
    }

    fn release(&self) {
        let mut cache = self.lock_cache();
        cache.holds = cache.holds.saturating_sub(1);
        if cache.holds > 0 || cache.pending.is_empty() {
            return;
        }
        let pending = std::mem::take(&mut cache.pending);
        let applied = cache.deliver(pending);
        drop(cache);
        trace!(applied, "held stream updates applied");
        self.updated.notify_all();
    }
}

/// Holds stream delivery still while alive.
///
/// Values read through any stream while the guard is held come from the same
/// set of server updates. Updates that arrive in the meantime are queued and
/// applied when the last guard drops. A blocking `get` on a stream that has
/// no value yet waits for that, so read with `try_get` while frozen.
#[must_use = "delivery resumes as soon as the guard is dropped"]
pub struct StreamFreeze<'a> {
    shared: &'a Shared,
}

impl Drop for StreamFreeze<'_> {
    fn drop(&mut self) {
        self.shared.release();
    }
}

impl fmt::Debug for StreamFreeze<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StreamFreeze")
    }
}

pub(crate) struct StreamManager {
    shared: Arc<Shared>,
    reader: Mutex<Option<JoinHandle<()>>>,
    shutdown: RpcStream,
}

impl StreamManager {
    /// Take over the stream channel and start the background reader.
    pub(crate) fn spawn(channel: StreamChannel) -> Result<Self> {
        let shared = Arc::new(Shared {
            cache: Mutex::new(Cache {
                entries: HashMap::new(),
                status: ChannelStatus::Open,
                holds: 0,
                pending: Vec::new(),
                generation: 0,
            }),
            updated: Condvar::new(),
        });

        let reader_shared = Arc::clone(&shared);
        let reader = channel.reader;
        let handle = thread::Builder::new()
            .name(READER_THREAD_NAME.into())
            .spawn(move || run_reader(&reader_shared, reader))
            .map_err(|err| ClientError::Transport(err.into()))?;
        debug!("stream reader started");

        Ok(Self {
            shared,
            reader: Mutex::new(Some(handle)),
            shutdown: channel.shutdown,
        })
    }

    /// Register `call` with the server and create its cache entry.
    pub(crate) fn add_stream(
        &self,
        rpc: &Invoker<'_>,
        call: &CallDescriptor,
        start: bool,
    ) -> Result<StreamId> {
        let _hold = self.shared.hold();
        self.shared.lock_cache().check_open()?;

        let add = build_call(KRPC_SERVICE, "AddStream", [encode(call), encode(&start)]);
        let payload = rpc.invoke(&add)?;
        let stream = schema::Stream::decode(payload)?;

        let mut cache = self.shared.lock_cache();
        let entry = cache.entries.entry(stream.id).or_default();
        entry.started |= start;
        drop(cache);
        debug!(id = stream.id, call = %call, start, "stream registered");
        Ok(stream.id)
    }

    /// Track a stream the server created on our behalf, e.g. for an event.
    pub(crate) fn attach(&self, id: StreamId) -> Result<()> {
        let mut cache = self.shared.lock_cache();
        cache.check_open()?;
        cache.entries.entry(id).or_default();
        debug!(id, "stream attached");
        Ok(())
    }

    pub(crate) fn start(&self, rpc: &Invoker<'_>, id: StreamId) -> Result<()> {
        {
            let cache = self.shared.lock_cache();
            cache.check_open()?;
            if cache.entry(id)?.started {
                return Ok(());
            }
        }

        rpc.invoke(&build_call(KRPC_SERVICE, "StartStream", [encode(&id)]))?;
        if let Ok(entry) = self.shared.lock_cache().entry_mut(id) {
            entry.started = true;
        }
        debug!(id, "stream started");
        Ok(())
    }

    pub(crate) fn is_started(&self, id: StreamId) -> Result<bool> {
        Ok(self.shared.lock_cache().entry(id)?.started)
    }

    /// Latest value, blocking until the first one arrives.
    pub(crate) fn get(&self, rpc: &Invoker<'_>, id: StreamId) -> Result<Bytes> {
        self.start(rpc, id)?;

        let mut cache = self.shared.lock_cache();
        loop {
            cache.check_open()?;
            if let Some(value) = &cache.entry(id)?.value {
                return cached(rpc.registry, value);
            }
            cache = self.shared.wait(cache);
        }
    }

    /// Latest value if one has arrived.
    pub(crate) fn try_get(
        &self,
        registry: &ExceptionRegistry,
        id: StreamId,
    ) -> Result<Option<Bytes>> {
        let cache = self.shared.lock_cache();
        cache.check_open()?;
        cache
            .entry(id)?
            .value
            .as_ref()
            .map(|value| cached(registry, value))
            .transpose()
    }

    /// Number of updates applied to the stream so far.
    pub(crate) fn version(&self, id: StreamId) -> Result<u64> {
        Ok(self.shared.lock_cache().entry(id)?.version)
    }

    /// Block until the stream's version passes `since`.
    ///
    /// Returns the new version, or `None` when `timeout` elapses first.
    pub(crate) fn wait(
        &self,
        id: StreamId,
        since: u64,
        timeout: Option<Duration>,
    ) -> Result<Option<u64>> {
        self.block_on(timeout, |cache| {
            let version = cache.entry(id)?.version;
            Ok((version > since).then_some(version))
        })
    }

    /// Block until the next batch lands on any stream. `false` on timeout.
    pub(crate) fn wait_for_update(&self, timeout: Option<Duration>) -> Result<bool> {
        let mut since = None;
        let delivered = self.block_on(timeout, |cache| {
            let since = *since.get_or_insert(cache.generation);
            Ok((cache.generation != since).then_some(()))
        })?;
        Ok(delivered.is_some())
    }

    /// Park on the update signal until `ready` yields a value, the channel
    /// stops, or the deadline passes.
    fn block_on<R>(
        &self,
        timeout: Option<Duration>,
        mut ready: impl FnMut(&Cache) -> Result<Option<R>>,
    ) -> Result<Option<R>> {
        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        let mut cache = self.shared.lock_cache();
        loop {
            cache.check_open()?;
            if let Some(value) = ready(&*cache)? {
                return Ok(Some(value));
            }
            cache = match deadline {
                Some(deadline) if Instant::now() >= deadline => return Ok(None),
                Some(deadline) => self.shared.wait_until(cache, deadline),
                None => self.shared.wait(cache),
            };
        }
    }

    /// Stop tracking the stream and remove it on the server.
    pub(crate) fn remove(&self, rpc: &Invoker<'_>, id: StreamId) -> Result<()> {
        {
            let mut cache = self.shared.lock_cache();
            if cache.entries.remove(&id).is_none() {
                return Err(ClientError::StreamNotFound(id));
            }
            cache.pending.retain(|result| result.id != id);
        }
        self.shared.updated.notify_all();
        debug!(id, "stream removed");

        rpc.invoke(&build_call(KRPC_SERVICE, "RemoveStream", [encode(&id)]))?;
        Ok(())
    }

    /// Set the update rate in hertz. Zero means as fast as the server can.
    pub(crate) fn set_rate(&self, rpc: &Invoker<'_>, id: StreamId, hz: f32) -> Result<()> {
        self.shared.lock_cache().entry(id)?;
        rpc.invoke(&build_call(
            KRPC_SERVICE,
            "SetStreamRate",
            [encode(&id), encode(&hz)],
        ))?;
        self.shared.lock_cache().entry_mut(id)?.rate = hz;
        trace!(id, hz, "stream rate set");
        Ok(())
    }

    pub(crate) fn rate(&self, id: StreamId) -> Result<f32> {
        Ok(self.shared.lock_cache().entry(id)?.rate)
    }

    pub(crate) fn freeze(&self) -> StreamFreeze<'_> {
        self.shared.hold()
    }

    pub(crate) fn len(&self) -> usize {
        self.shared.lock_cache().entries.len()
    }

    /// Stop the reader and fail every current and future waiter.
    pub(crate) fn shutdown(&self) {
        self.stop();
        self.join();
    }

    /// Mark the channel closed, wake waiters and shut the socket down.
    pub(crate) fn stop(&self) {
        {
            let mut cache = self.shared.lock_cache();
            cache.status = ChannelStatus::Closed;
            cache.pending.clear();
        }
        self.shared.updated.notify_all();

        if let Err(err) = self.shutdown.shutdown() {
            warn!(error = %err, "stream channel shutdown failed");
        }
    }

    /// Wait for the reader thread to exit.
    pub(crate) fn join(&self) {
        let handle = self
            .reader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                warn!("stream reader panicked");
            }
        }
    }
}

fn cached(registry: &ExceptionRegistry, value: &CachedValue) -> Result<Bytes> {
    match value {
        Ok(bytes) => Ok(bytes.clone()),
        Err(error) => Err(registry.translate(error)),
    }
}

fn run_reader(shared: &Shared, mut reader: FrameReader<RpcStream>) {
    loop {
        let payload = match reader.read_frame() {
            Ok(payload) => payload,
            Err(err) => {
                stop_reader(shared, err);
                return;
            }
        };

        let update = match StreamUpdate::decode(payload) {
            Ok(update) => update,
            Err(err) => {
                warn!(error = %err, "discarding malformed stream update");
                continue;
            }
        };

        let mut cache = shared.lock_cache();
        if !matches!(cache.status, ChannelStatus::Open) {
            return;
        }
        if cache.holds > 0 {
            trace!(results = update.results.len(), "stream update held");
            cache.pending.extend(update.results);
            continue;
        }
        let applied = cache.deliver(update.results);
        drop(cache);
        trace!(applied, "stream update applied");
        shared.updated.notify_all();
    }
}

fn stop_reader(shared: &Shared, err: FrameError) {
    let mut cache = shared.lock_cache();
    if matches!(cache.status, ChannelStatus::Open) {
        let reason = match err {
            FrameError::ConnectionClosed => "stream channel closed by server".to_string(),
            other => other.to_string(),
        };
        warn!(reason = %reason, "stream reader stopped");
        cache.status = ChannelStatus::Failed(reason);
    } else {
        debug!("stream reader stopped");
    }
    drop(cache);
    shared.updated.notify_all();
}
