use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tracing::info;
use wxblend_buffer::{BufferConfig, ReorderBuffer, UplinkMap};
use wxblend_frame::FeedWriter;
use wxblend_ingest::{drain, open_sink, spawn_readers, FanoutConfig};

use crate::cmd::RunArgs;
use crate::exit::{ingest_error, io_error, CliError, CliResult, SUCCESS, USAGE};

pub fn run(args: RunArgs) -> CliResult<i32> {
    if !args.delay.is_finite() || args.delay < 0.0 {
        return Err(CliError::new(
            USAGE,
            format!("invalid release delay: {}", args.delay),
        ));
    }

    let config = BufferConfig {
        delay: Duration::from_secs_f64(args.delay),
        policy: args.policy.into(),
    };
    let buffer = Arc::new(ReorderBuffer::new(config));
    let uplinks = Arc::new(Mutex::new(UplinkMap::new()));
    let running = Arc::new(AtomicBool::new(true));

    install_ctrlc_handler(Arc::clone(&running), Arc::clone(&buffer))?;

    let readers = spawn_readers(
        &args.servers,
        Arc::clone(&buffer),
        uplinks,
        Arc::clone(&running),
        FanoutConfig {
            reconnect_delay: Duration::from_secs(args.reconnect_delay),
        },
    )
    .map_err(|err| ingest_error("starting fanout readers failed", err))?;

    let stats_logger = spawn_stats_logger(
        Arc::clone(&buffer),
        Arc::clone(&running),
        args.stats_interval,
    );

    info!(
        servers = args.servers.len(),
        delay = args.delay,
        policy = ?config.policy,
        "blending fanout feeds"
    );

    // This thread is the single consumer; it blocks here until Ctrl-C
    // closes the buffer and the remaining frames have drained.
    let sink = open_sink(args.pipe.as_deref()).map_err(|err| io_error("opening sink failed", err))?;
    let mut writer = FeedWriter::new(sink);
    let frames = drain(&buffer, &mut writer).map_err(|err| ingest_error("drain failed", err))?;

    for reader in readers {
        let _ = reader.join();
    }
    let _ = stats_logger.join();

    let stats = buffer.stats();
    info!(
        frames,
        added = stats.added,
        duplicate = stats.duplicate,
        too_late = stats.too_late,
        "blender stopped"
    );
    Ok(SUCCESS)
}

fn install_ctrlc_handler(
    running: Arc<AtomicBool>,
    buffer: Arc<ReorderBuffer>,
) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
        buffer.close();
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}

/// Periodically log buffer depth and drop counters so operators can see
/// where frames went. Exits when the running flag clears.
fn spawn_stats_logger(
    buffer: Arc<ReorderBuffer>,
    running: Arc<AtomicBool>,
    interval_secs: u64,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        if interval_secs == 0 {
            return;
        }
        let step = Duration::from_millis(200);
        let mut elapsed = Duration::ZERO;
        let interval = Duration::from_secs(interval_secs);
        while running.load(Ordering::SeqCst) {
            thread::sleep(step);
            elapsed += step;
            if elapsed >= interval {
                elapsed = Duration::ZERO;
                let stats = buffer.stats();
                info!(
                    depth = buffer.len(),
                    added = stats.added,
                    released = stats.released,
                    duplicate = stats.duplicate,
                    too_late = stats.too_late,
                    "buffer status"
                );
            }
        }
    })
}
