//! Fenestras CLI
//!
//! Simulation harness for the pooled reseeding core: harvests synthetic
//! samples from a handful of sources, drives the reseed schedule, and
//! prints a random sample plus a metrics dump.

use clap::Parser;
use fenestras::{
    metrics::{MetricsRegistry, MetricsSnapshot},
    ChaChaRoot, EntropySource, EntropyState, FileConfig, HarvestedEvent, ReseedWorker,
    RootGenerator,
};
use rand_core::{OsRng, RngCore};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "fenestras", version, about = "Pooled entropy reseeding simulator")]
struct Args {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Events to harvest per batch (overrides the config file).
    #[arg(long)]
    events: Option<u32>,

    /// Scheduler rounds to drive synchronously (overrides the config file).
    #[arg(long)]
    ticks: Option<u32>,

    /// Run the background reseed worker until Ctrl-C.
    #[arg(long)]
    continuous: bool,

    /// Metrics server port, 0 to disable (needs the `metrics` feature).
    #[arg(long)]
    metrics_port: Option<u16>,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match FileConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config: {}", e);
                std::process::exit(1);
            }
        },
        None => FileConfig::default(),
    };
    if let Some(events) = args.events {
        config.demo.events = events;
    }
    if let Some(ticks) = args.ticks {
        config.demo.ticks = ticks;
    }
    if let Some(port) = args.metrics_port {
        config.metrics.port = port;
    }
    if let Err(e) = config.reseed.validate() {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    info!("Fenestras v{}", fenestras::VERSION);

    let sources = resolve_sources(&config.demo.sources);
    if sources.is_empty() {
        eprintln!("No known entropy sources configured");
        std::process::exit(1);
    }

    let state = Arc::new(EntropyState::new(&config.reseed, ChaChaRoot::new()));
    let mut harvester = Harvester::new(sources);

    info!(events = config.demo.events, "Harvesting before first keying");
    harvester.run(&*state, config.demo.events);

    if args.continuous {
        run_continuous(&state, &mut harvester, &config);
    } else {
        run_ticks(&*state, &mut harvester, &config);
    }

    // Generate some random output to demonstrate
    let mut output = [0u8; 32];
    state.fill_random(&mut output);
    println!(
        "Random bytes: {}",
        output
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<String>()
    );

    match MetricsRegistry::new() {
        Ok(registry) => {
            registry.update(&MetricsSnapshot::from_state(&*state));
            match registry.encode() {
                Ok(text) => print!("{}", text),
                Err(e) => warn!("Failed to encode metrics: {}", e),
            }
        }
        Err(e) => warn!("Failed to create metrics registry: {}", e),
    }
}

fn resolve_sources(names: &[String]) -> Vec<EntropySource> {
    names
        .iter()
        .filter_map(|name| {
            let source = EntropySource::from_name(name);
            if source.is_none() {
                warn!(name = %name, "Ignoring unknown entropy source");
            }
            source
        })
        .collect()
}

/// Synthetic sample generator.
///
/// High-quality sources draw from the OS RNG; the rest contribute
/// timestamp jitter.
struct Harvester {
    sources: Vec<EntropySource>,
    sequence: u64,
}

impl Harvester {
    fn new(sources: Vec<EntropySource>) -> Self {
        Self {
            sources,
            sequence: 0,
        }
    }

    fn run<R: RootGenerator>(&mut self, state: &EntropyState<R>, events: u32) {
        for _ in 0..events {
            self.harvest_one(state);
        }
    }

    fn harvest_one<R: RootGenerator>(&mut self, state: &EntropyState<R>) {
        let source = self.sources[(self.sequence as usize) % self.sources.len()];
        let now = chrono::Utc::now();
        let nanos = now.timestamp_nanos_opt().unwrap_or_default() as u64;

        let mut payload = [0u8; 16];
        let len = if source.is_high_quality() {
            OsRng.fill_bytes(&mut payload);
            payload.len()
        } else {
            let jitter = nanos ^ self.sequence.rotate_left(17);
            payload[..8].copy_from_slice(&jitter.to_le_bytes());
            4
        };

        let event = HarvestedEvent::new(source, &payload[..len], nanos, self.sequence as u32);
        state.process_event(&event);
        self.sequence += 1;
    }
}

fn run_ticks<R: RootGenerator>(
    state: &EntropyState<R>,
    harvester: &mut Harvester,
    config: &FileConfig,
) {
    state.ensure_seeded();

    for tick in 0..config.demo.ticks {
        harvester.run(state, config.demo.events);
        let next = state.timer_reseed();
        info!(
            tick,
            active_pools = state.active_pools(),
            next_secs = next.as_secs(),
            "Scheduler round"
        );
    }
}

fn run_continuous(state: &Arc<EntropyState<ChaChaRoot>>, harvester: &mut Harvester, config: &FileConfig) {
    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        if let Err(e) = ctrlc::set_handler(move || running.store(false, Ordering::SeqCst)) {
            warn!("Failed to install Ctrl-C handler: {}", e);
        }
    }

    let worker = match ReseedWorker::spawn(state) {
        Ok(worker) => worker,
        Err(e) => {
            eprintln!("Failed to start reseed worker: {}", e);
            std::process::exit(1);
        }
    };
    start_metrics_server(config.metrics.port, state);

    state.ensure_seeded();
    info!("Running until Ctrl-C");

    while running.load(Ordering::SeqCst) {
        harvester.run(state.as_ref(), config.demo.events.min(100));
        std::thread::sleep(Duration::from_millis(100));
    }

    info!(
        generation = state.root().generation(),
        active_pools = state.active_pools(),
        "Shutting down"
    );
    worker.shutdown();
}

#[cfg(feature = "metrics")]
fn start_metrics_server(port: u16, state: &Arc<EntropyState<ChaChaRoot>>) {
    use fenestras::metrics::{MetricsServer, MetricsServerConfig};

    if port == 0 {
        return;
    }

    let registry = match MetricsRegistry::new() {
        Ok(registry) => registry,
        Err(e) => {
            warn!("Failed to create metrics registry: {}", e);
            return;
        }
    };
    let server = MetricsServer::new(MetricsServerConfig::with_port(port), Arc::clone(state), registry);

    let spawned = std::thread::Builder::new()
        .name("fx-metrics".to_string())
        .spawn(move || match tokio::runtime::Runtime::new() {
            Ok(runtime) => {
                if let Err(e) = runtime.block_on(server.run()) {
                    warn!("Metrics server stopped: {}", e);
                }
            }
            Err(e) => warn!("Failed to start metrics runtime: {}", e),
        });
    if let Err(e) = spawned {
        warn!("Failed to spawn metrics thread: {}", e);
    }
}

#[cfg(not(feature = "metrics"))]
fn start_metrics_server(port: u16, _state: &Arc<EntropyState<ChaChaRoot>>) {
    if port != 0 {
        info!("Built without the metrics feature; not serving metrics");
    }
}
