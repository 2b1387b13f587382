use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use ectask_experiment::{PacedRenderer, Renderer, Session, SessionConfig, SessionOutput};
use ectask_timing::{FrameTimer, InputBus};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::console::ConsoleSurface;
use crate::input::spawn_stdin_reader;
use crate::simulate::SimulatedParticipant;

#[derive(Debug, Parser)]
#[command(name = "ectask", about = "Adaptive cognitive task battery")]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the full session: calibration, line discrimination, digit span, flanker
    Run(RunArgs),
}

#[derive(Debug, Args, Clone)]
struct RunArgs {
    /// JSON file overriding any part of the default session configuration
    #[arg(long)]
    config: Option<PathBuf>,
    /// Write the session output here instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,
    /// Seed for every random draw in the session
    #[arg(long)]
    seed: Option<u64>,
    /// Let a simulated participant answer instead of reading stdin
    #[arg(long)]
    simulate: bool,
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long)]
    verbose: bool,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Run(args) => {
                init_tracing(args.verbose);
                run_session(args).await
            }
        }
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<SessionConfig> {
    let Some(path) = path else {
        return Ok(SessionConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

async fn run_session(args: RunArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    let seed = args.seed.unwrap_or_else(|| rand::rng().random());
    info!(seed, simulate = args.simulate, "starting session");

    let period = config.frames.period()?;
    let timer = FrameTimer::new(period);
    let bus = InputBus::default();
    let mut rng = StdRng::seed_from_u64(seed);
    let console = PacedRenderer::new(ConsoleSurface::new(std::io::stderr()), timer.clone());

    let output = if args.simulate {
        let participant = SimulatedParticipant::new(
            console,
            bus.clone(),
            period,
            config.line_discrimination.keys.clone(),
            config.flanker.keys.clone(),
            StdRng::seed_from_u64(rng.random()),
        );
        drive(config, timer, participant, bus, rng).await?
    } else {
        let reader = spawn_stdin_reader(bus.clone());
        let output = drive(config, timer, console, bus, rng).await;
        reader.abort();
        output?
    };

    let json = output.to_json().context("serializing session output")?;
    match &args.out {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), study_id = %output.study_id, "session saved");
        }
        None => println!("{json}"),
    }
    Ok(())
}

async fn drive<D: Renderer>(
    config: SessionConfig,
    timer: FrameTimer,
    renderer: D,
    bus: InputBus,
    rng: StdRng,
) -> anyhow::Result<SessionOutput> {
    let mut session = Session::new(config, timer, renderer, bus, rng)?;
    Ok(session.run().await?)
}
