use std::io::Read;
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};
use wxblend_buffer::{AddOutcome, BufferError, FrameKey, ReorderBuffer, UplinkMap};
use wxblend_frame::{FeedReader, FrameError, WireFrame};

use crate::error::{IngestError, Result};

/// How often a sleeping reconnect loop rechecks the running flag.
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

/// Configuration shared by all fanout connections.
#[derive(Debug, Clone, Copy)]
pub struct FanoutConfig {
    /// Pause between reconnection attempts to a lost fanout server.
    pub reconnect_delay: Duration,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(60),
        }
    }
}

/// One inbound fanout connection: reads frames, keys them, feeds the buffer.
///
/// Every configured fanout server delivers the same logical stream; the
/// buffer's duplicate detection collapses them back into one. A client keeps
/// reconnecting for as long as the running flag is set.
pub struct FanoutClient {
    server: String,
    buffer: Arc<ReorderBuffer>,
    uplinks: Arc<Mutex<UplinkMap>>,
    running: Arc<AtomicBool>,
    config: FanoutConfig,
}

impl FanoutClient {
    pub fn new(
        server: String,
        buffer: Arc<ReorderBuffer>,
        uplinks: Arc<Mutex<UplinkMap>>,
        running: Arc<AtomicBool>,
        config: FanoutConfig,
    ) -> Self {
        Self {
            server,
            buffer,
            uplinks,
            running,
            config,
        }
    }

    /// Run the connect/ingest/reconnect loop on a new thread.
    pub fn spawn(self) -> JoinHandle<()> {
        thread::spawn(move || self.run())
    }

    /// Connect, ingest until the stream ends, reconnect. Returns when the
    /// running flag clears or the buffer closes.
    pub fn run(&self) {
        while self.running.load(Ordering::SeqCst) {
            match TcpStream::connect(&self.server) {
                Ok(stream) => {
                    info!(server = %self.server, "connected to fanout server");
                    match self.ingest_stream(stream) {
                        Ok(()) => {
                            info!(server = %self.server, "fanout connection ended");
                        }
                        Err(IngestError::Buffer(BufferError::Closed)) => return,
                        Err(err) => {
                            warn!(server = %self.server, %err, "fanout connection failed");
                        }
                    }
                }
                Err(err) => {
                    warn!(server = %self.server, %err, "could not connect to fanout server");
                }
            }

            if !self.sleep_before_reconnect() {
                return;
            }
            info!(server = %self.server, "retrying fanout server");
        }
    }

    /// Ingest frames from one stream until it ends.
    ///
    /// Generic over `Read` so tests can drive it without a socket. A closed
    /// stream returns `Ok(())` (the caller reconnects); frame corruption the
    /// reader cannot resync past, and fatal buffer errors, are returned.
    pub fn ingest_stream<R: Read>(&self, stream: R) -> Result<()> {
        let mut reader = FeedReader::new(stream);

        while self.running.load(Ordering::SeqCst) {
            let frame = match reader.read_frame() {
                Ok(frame) => frame,
                Err(FrameError::ConnectionClosed) => return Ok(()),
                Err(err) => return Err(err.into()),
            };

            let key = self.frame_key(&frame);
            match self.buffer.add(key, &frame.bytes) {
                Ok(AddOutcome::Added) => {}
                Ok(outcome) => {
                    debug!(server = %self.server, %key, ?outcome, "frame dropped");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    fn frame_key(&self, frame: &WireFrame) -> FrameKey {
        let epoch = self
            .uplinks
            .lock()
            .expect("uplink map mutex poisoned")
            .epoch_for(u32::from(frame.header.source));
        FrameKey::new(epoch, frame.header.seq, frame.product.block)
    }

    /// Sleep out the reconnect delay, waking early if the flag clears.
    /// Returns whether the client should keep running.
    fn sleep_before_reconnect(&self) -> bool {
        let mut remaining = self.config.reconnect_delay;
        while !remaining.is_zero() {
            if !self.running.load(Ordering::SeqCst) {
                return false;
            }
            let step = remaining.min(SHUTDOWN_POLL);
            thread::sleep(step);
            remaining -= step;
        }
        self.running.load(Ordering::SeqCst)
    }
}

/// Spawn one [`FanoutClient`] thread per server, the way the feed is meant
/// to be consumed: every server carries the same stream, arrival order be
/// damned, and the buffer sorts it out.
pub fn spawn_readers(
    servers: &[String],
    buffer: Arc<ReorderBuffer>,
    uplinks: Arc<Mutex<UplinkMap>>,
    running: Arc<AtomicBool>,
    config: FanoutConfig,
) -> Result<Vec<JoinHandle<()>>> {
    for server in servers {
        let (host, port) = server
            .rsplit_once(':')
            .ok_or_else(|| IngestError::InvalidServer(server.clone()))?;
        if host.is_empty() || port.parse::<u16>().is_err() {
            return Err(IngestError::InvalidServer(server.clone()));
        }
    }

    Ok(servers
        .iter()
        .map(|server| {
            FanoutClient::new(
                server.clone(),
                Arc::clone(&buffer),
                Arc::clone(&uplinks),
                Arc::clone(&running),
                config,
            )
            .spawn()
        })
        .collect())
}
