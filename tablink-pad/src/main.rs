//! TabLink pad client: entry point.
//!
//! ```text
//! tablink-pad                      Connect to the configured / last host
//! tablink-pad --host <addr>        Connect to <addr> (default port 9999)
//! tablink-pad --config <path>      Use custom config TOML
//! tablink-pad --gen-config         Dump default config and exit
//! tablink-pad --demo-stroke        Draw a synthetic stroke once connected
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use tablink_core::{DeviceDescriptor, Engine, SessionEvent};

use tablink_pad::config::PadConfig;
use tablink_pad::state::PadState;
use tablink_pad::stroke::{DEMO_POINTS, demo_stroke};

/// Spacing of replayed stroke samples; twice the throttle rate so the
/// submission throttle has something to do.
const REPLAY_PERIOD: Duration = Duration::from_millis(4);

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "tablink-pad", about = "TabLink network graphics tablet client")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "tablink-pad.toml")]
    config: PathBuf,

    /// Host address (overrides config). Example: 192.168.1.100:9999
    #[arg(long)]
    host: Option<String>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,

    /// Replay a synthetic pen stroke after each successful connect.
    #[arg(long)]
    demo_stroke: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&PadConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let config = PadConfig::load(&cli.config);

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("tablink-pad v{}", env!("CARGO_PKG_VERSION"));

    let state_path = PathBuf::from(&config.network.state_file);
    let mut state = PadState::load(&state_path);

    let address = cli
        .host
        .clone()
        .or_else(|| Some(config.network.host_address.clone()).filter(|a| !a.is_empty()))
        .or_else(|| state.last_peer.clone())
        .ok_or("no host address: pass --host or set network.host_address")?;

    let (engine, mut events) = Engine::new(config.engine.clone());
    let engine = Arc::new(engine);
    let mut frames = events.frames();
    let device = config.device;

    // ── 1. Connect ──────────────────────────────────────────────

    let mut connecting = Some(spawn_connect(&engine, address.clone(), device, Duration::ZERO));
    let mut stroke: Option<JoinHandle<()>> = None;

    // ── 2. Event loop ───────────────────────────────────────────

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("interrupted");
                break;
            }
            event = events.recv() => {
                let Some(event) = event else { break };
                match event {
                    SessionEvent::Connected(peer) => {
                        info!(%peer, "session established");
                        remember_peer(&mut state, &state_path, peer.to_string());
                        if cli.demo_stroke {
                            stroke = Some(tokio::spawn(replay_stroke(Arc::clone(&engine), device)));
                        }
                    }
                    SessionEvent::ConnectionFailed(reason) if !config.network.auto_reconnect => {
                        error!(%reason, "could not connect");
                        break;
                    }
                    SessionEvent::ConnectionLost(reason) if !config.network.auto_reconnect => {
                        error!(%reason, "session lost");
                        break;
                    }
                    other => {
                        warn!(event = %other, "reconnecting in {:?}", config.network.reconnect_delay());
                        if let Some(task) = stroke.take() {
                            task.abort();
                        }
                        connecting = Some(spawn_connect(
                            &engine,
                            address.clone(),
                            device,
                            config.network.reconnect_delay(),
                        ));
                    }
                }
            }
            Ok(()) = frames.changed() => {
                if let Some(frame) = frames.borrow_and_update().clone() {
                    debug!(
                        width = frame.width,
                        height = frame.height,
                        timestamp = frame.timestamp,
                        "frame ready"
                    );
                }
            }
        }
    }

    // ── 3. Shutdown ─────────────────────────────────────────────

    info!("shutting down");
    for task in [connecting.take(), stroke.take()].into_iter().flatten() {
        task.abort();
    }
    engine.disconnect();
    let stats = engine.stats();
    info!(
        sent = stats.samples_sent,
        throttled = stats.samples_throttled,
        dropped = stats.samples_dropped,
        frames = stats.frames_reconstructed,
        bad_packets = stats.dropped_packets,
        "session stats"
    );

    Ok(())
}

// ── Helpers ──────────────────────────────────────────────────────

fn spawn_connect(
    engine: &Arc<Engine>,
    address: String,
    device: DeviceDescriptor,
    delay: Duration,
) -> JoinHandle<()> {
    let engine = Arc::clone(engine);
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        info!(%address, "connecting");
        // Outcome is reported through the event channel.
        let _ = engine.connect(&address, device).await;
    })
}

fn remember_peer(state: &mut PadState, path: &Path, peer: String) {
    if state.last_peer.as_deref() == Some(peer.as_str()) {
        return;
    }
    state.last_peer = Some(peer);
    if let Err(e) = state.save(path) {
        warn!("could not save state to {}: {e}", path.display());
    }
}

async fn replay_stroke(engine: Arc<Engine>, device: DeviceDescriptor) {
    let samples = demo_stroke(&device, DEMO_POINTS);
    let total = samples.len();
    let mut ticker = tokio::time::interval(REPLAY_PERIOD);

    let mut sent = 0usize;
    for sample in samples {
        ticker.tick().await;
        if engine.submit_stylus_sample(sample) {
            sent += 1;
        }
    }
    info!(sent, total, "demo stroke finished");
}
