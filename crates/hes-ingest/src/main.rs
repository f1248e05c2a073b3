//! HES push ingestion demo binary.
//!
//! Reads length-prefixed push frames from stdin (a 2-byte big-endian length
//! followed by that many bytes) and dispatches each one, logging the
//! outcome. Real gateway/transport wiring (`IngressSource`) is the excluded
//! collaborator this stands in for.
//!
//! ```bash
//! hes-ingest --mac-prefix 10:20:30:40 --gateway-id gw-1 < frames.bin
//! ```

use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use hes_core::SystemEnv;
use hes_ingest::sink::LoggingSink;
use hes_ingest::{CycleClock, Dispatcher, EvictionTicker, HalfHourCycleClock, HesConfig};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// HES push ingestion core, demo binary.
#[derive(Parser, Debug)]
#[command(name = "hes-ingest")]
#[command(about = "Push-data ingestion core for a meter head-end system")]
#[command(version)]
struct Args {
    /// 4-byte MAC prefix, as colon-separated hex octets (e.g. `10:20:30:40`).
    #[arg(long, default_value = "00:00:00:00")]
    mac_prefix: String,

    /// Gateway identifier attached to every insert call.
    #[arg(long, default_value = "gw-0")]
    gateway_id: String,

    /// Staleness bound, in seconds.
    #[arg(long, default_value_t = 120)]
    stale_bound_secs: u64,

    /// Eviction ticker cadence, in seconds.
    #[arg(long, default_value_t = 30)]
    eviction_period_secs: u64,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn parse_mac_prefix(s: &str) -> Result<[u8; 4], String> {
    let mut out = [0u8; 4];
    let mut parts = s.split(':');
    for slot in &mut out {
        let part = parts.next().ok_or_else(|| format!("mac prefix {s:?} has fewer than 4 octets"))?;
        *slot = u8::from_str_radix(part, 16).map_err(|e| format!("invalid octet {part:?}: {e}"))?;
    }
    if parts.next().is_some() {
        return Err(format!("mac prefix {s:?} has more than 4 octets"));
    }
    Ok(out)
}

/// Reads one length-prefixed frame from `reader`. Returns `Ok(None)` on
/// clean EOF before any bytes of a new frame are read.
fn read_frame(reader: &mut impl Read) -> std::io::Result<Option<Vec<u8>>> {
    let mut len_bytes = [0u8; 2];
    match reader.read_exact(&mut len_bytes) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }
    let len = u16::from_be_bytes(len_bytes) as usize;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    Ok(Some(buf))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let mac_prefix = parse_mac_prefix(&args.mac_prefix)?;
    let config = HesConfig {
        mac_prefix,
        stale_bound: Duration::from_secs(args.stale_bound_secs),
        eviction_period: Duration::from_secs(args.eviction_period_secs),
        ..HesConfig::default()
    };

    tracing::info!(?config, "HES push ingestion starting");

    let cycle_clock: Arc<dyn CycleClock> = Arc::new(HalfHourCycleClock);
    let dispatcher = Arc::new(Dispatcher::new(SystemEnv, config, Arc::new(LoggingSink), cycle_clock));
    let ticker = EvictionTicker::spawn(dispatcher.clone(), config.eviction_period);

    let mut stdin = std::io::stdin().lock();
    let mut frame_count = 0u64;
    while let Some(frame) = read_frame(&mut stdin)? {
        let outcome = dispatcher.ingest(&frame, &args.gateway_id);
        tracing::debug!(?outcome, frame_count, "ingested push frame");
        frame_count += 1;
    }

    tracing::info!(frame_count, "stdin closed, shutting down");
    ticker.stop();
    Ok(())
}
