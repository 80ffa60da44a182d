//! Host service core logic.
//!
//! Owns the [`HostPeer`] and, when enabled, the frame streaming loop
//! that paints a synthetic test pattern and sends it to the connected
//! pad as XOR-delta frames.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};

use tablink_core::{FrameEncoder, HostPeer, TabLinkError};

use crate::config::HostConfig;

/// How often the service reports what the pad has sent.
const REPORT_PERIOD: Duration = Duration::from_secs(1);

// ── HostService ──────────────────────────────────────────────────

/// The top-level host service.
pub struct HostService {
    config: HostConfig,
    running: Arc<AtomicBool>,
}

impl HostService {
    pub fn new(config: HostConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Obtain a handle that can be used to stop the service from
    /// another task.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Run the service until stopped.
    ///
    /// 1. Binds the host socket and starts answering pads.
    /// 2. Once a pad has shaken hands, streams frames if enabled.
    /// 3. Logs received samples once per second.
    pub async fn run(&self) -> Result<(), TabLinkError> {
        self.running.store(true, Ordering::SeqCst);

        let host = HostPeer::bind(self.config.listen_addr(), self.config.behavior()).await?;
        info!("host listening on {}", host.local_addr()?);

        let screen = &self.config.screen;
        let mut encoder = FrameEncoder::new(screen.compression_level);
        let mut frame_tick = tokio::time::interval(self.config.frame_period());
        let mut report_tick = tokio::time::interval(REPORT_PERIOD);
        let mut frame_index: u32 = 0;
        let mut reported_samples = 0u64;
        let mut client = None;
        let mut streamed_to = None;

        while self.running.load(Ordering::SeqCst) {
            tokio::select! {
                _ = frame_tick.tick(), if screen.stream_frames => {
                    let current = host.client();
                    if current.is_none() {
                        continue;
                    }
                    if current != streamed_to {
                        // A new pad has no previous frame to apply deltas to.
                        encoder.reset();
                        streamed_to = current;
                    }
                    let pixels = test_pattern(screen.width, screen.height, frame_index);
                    frame_index = frame_index.wrapping_add(1);
                    let encoded = match encoder.encode(
                        screen.width,
                        screen.height,
                        i32::from(screen.fps),
                        &pixels,
                        unix_millis(),
                    ) {
                        Ok(encoded) => encoded,
                        Err(e) => {
                            warn!("frame encode failed: {e}");
                            continue;
                        }
                    };
                    debug!(
                        full = encoded.is_full_frame,
                        compressed = encoded.message.payload.len(),
                        raw = encoded.raw_len,
                        "sending frame"
                    );
                    if let Err(e) = host.send_frame(&encoded.message).await {
                        warn!("frame send failed: {e}");
                        // The pad cannot apply the next delta without this frame.
                        encoder.reset();
                    }
                }
                _ = report_tick.tick() => {
                    let (current, descriptor, sample_count, last) = host.with_record(|r| {
                        (r.client, r.descriptor, r.sample_count, r.samples.back().copied())
                    });
                    if current != client {
                        if let Some(addr) = current {
                            info!(pad = %addr, ?descriptor, "pad connected");
                        }
                        client = current;
                    }
                    if let Some(last) = last.filter(|_| sample_count > reported_samples) {
                        info!(
                            count = sample_count - reported_samples,
                            action = ?last.action,
                            x = last.x,
                            y = last.y,
                            pressure = last.pressure,
                            "stylus samples"
                        );
                    }
                    reported_samples = sample_count;
                }
            }
        }

        host.close();
        info!("host stopped");
        Ok(())
    }

    /// Signal the service to stop.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

// ── Test pattern ─────────────────────────────────────────────────

/// RGBA gradient with a vertical bar that moves one step per frame.
/// Only the bar's old and new columns change between frames, which
/// keeps the XOR deltas sparse.
pub fn test_pattern(width: u32, height: u32, frame: u32) -> Vec<u8> {
    let (w, h) = (width as usize, height as usize);
    let bar_width = (w / 16).max(1);
    let bar_x = if w == 0 { 0 } else { (frame as usize * 2) % w };

    let mut pixels = vec![0u8; w * h * 4];
    for (i, px) in pixels.chunks_exact_mut(4).enumerate() {
        let (x, y) = (i % w, i / w);
        let on_bar = x >= bar_x && x < bar_x + bar_width;
        px[0] = if on_bar { 255 } else { (x * 255 / w.max(1)) as u8 };
        px[1] = (y * 255 / h.max(1)) as u8;
        px[2] = if on_bar { 255 } else { 96 };
        px[3] = 255;
    }
    pixels
}

fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as i64)
}

// ── Tests ────────────────────────────────────────────────────────
