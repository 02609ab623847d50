use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use agriflyer::{
    SimulationConfig, SimulationEngine, SimulationEvent, SimulationRunner,
};

/// Headless agricultural drone simulation
#[derive(Parser, Debug)]
#[command(name = "agriflyer_serve", version, about)]
struct Args {
    /// YAML simulation config
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Backend address (host:port) to stream observations to
    #[arg(short, long)]
    backend: Option<String>,

    /// Stop after this many seconds; runs until interrupted otherwise
    #[arg(short, long)]
    seconds: Option<f64>,

    /// Master seed for every random stream
    #[arg(long)]
    seed: Option<u64>,

    /// Start in manual control (hover command until actions arrive)
    #[arg(long)]
    manual: bool,
}

fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("agriflyer=info")),
        )
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_logging();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    if let Some(address) = args.backend {
        config.bridge.address = Some(address);
    }
    config.engine.manual_control |= args.manual;

    let mut engine = SimulationEngine::new(config)?;
    engine.initialize()?;

    let mut logged = 0u64;
    engine.subscribe(move |event| match event {
        SimulationEvent::Update(snapshot) if snapshot.step >= logged + 60 => {
            logged = snapshot.step;
            info!(
                step = snapshot.step,
                fps = format!("{:.1}", snapshot.fps),
                altitude = format!("{:.2}", snapshot.altitude()),
                battery = format!("{:.1}", snapshot.drone.battery),
                visible = snapshot.visible_plants.len(),
                "tick"
            );
        }
        SimulationEvent::Recovered { errors } => warn!(errors, "engine recovered"),
        SimulationEvent::BackendMessage(value) => info!(%value, "backend message"),
        _ => {}
    });

    let mut runner = SimulationRunner::new(engine);
    runner.handle().start()?;

    let limit = args
        .seconds
        .filter(|s| s.is_finite() && *s > 0.0)
        .map(Duration::from_secs_f64);
    let ticks = runner.run(limit);

    let mut engine = runner.into_engine();
    if let Some(bridge) = engine.bridge() {
        let stats = bridge.stats();
        info!(sent = stats.sent, dropped = stats.dropped, failed = stats.failed, "bridge totals");
    }
    engine.stop();
    engine.destroy();
    info!(ticks, "simulation finished");
    Ok(())
}
