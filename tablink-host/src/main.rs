//! TabLink host: entry point.
//!
//! ```text
//! tablink-host                    Listen with defaults (UDP 9999)
//! tablink-host --listen <addr>    Bind a specific ip:port
//! tablink-host --config <path>    Load a custom config TOML
//! tablink-host --gen-config       Write default config to stdout
//! tablink-host --stream-frames    Mirror a synthetic screen to the pad
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tablink_host::config::HostConfig;
use tablink_host::service::HostService;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "tablink-host", about = "TabLink host: stylus input and screen mirroring")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "tablink-host.toml")]
    config: PathBuf,

    /// Address to listen on (overrides config). Example: 0.0.0.0:9999
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,

    /// Stream test-pattern frames to the connected pad.
    #[arg(long)]
    stream_frames: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        let text = toml::to_string_pretty(&HostConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    // Load config.
    let mut config = HostConfig::load(&cli.config);
    if let Some(addr) = cli.listen {
        config.network.listen_address = addr.ip();
        config.network.listen_port = addr.port();
    }
    if cli.stream_frames {
        config.screen.stream_frames = true;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("tablink-host v{}", env!("CARGO_PKG_VERSION"));
    info!("listen address: {}", config.listen_addr());
    info!("answer pings: {}", config.network.answer_pings);
    if config.screen.stream_frames {
        info!(
            "streaming {}x{} @ {} fps",
            config.screen.width, config.screen.height, config.screen.fps
        );
    }

    let service = HostService::new(config);
    let stop = service.stop_handle();

    // Ctrl-C handler.
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received, shutting down");
        stop.store(false, std::sync::atomic::Ordering::SeqCst);
    });

    service.run().await?;

    Ok(())
}
