//! # lfgsim
//!
//! CLI runner for LFGSim: drops a swarm of nodes from altitude and lets their
//! firmware look for a group while they fall.

use clap::Parser;
use lfgsim_common::node_tracer::NodeTracerConfig;
use lfgsim_common::Settings;
use lfgsim_firmware::NodeTracer;
use lfgsim_runner::{OutputWriter, RunnerError, Simulation, SimulationStats};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Falling-swarm LFG simulator.
#[derive(Parser, Debug)]
#[command(name = "lfgsim", version, about)]
struct Cli {
    /// YAML settings file; command-line options override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Debug level (0 = warn, 1 = info, 2 = debug, 3+ = trace).
    #[arg(short = 'd', long)]
    debug: Option<u8>,

    /// Print configuration and progress (0 or 1).
    #[arg(short = 'v', long)]
    verbose: Option<u8>,

    /// Number of nodes.
    #[arg(short = 'c', long = "count")]
    node_count: Option<usize>,

    /// Gravitational acceleration (m/s²).
    #[arg(short = 'g', long)]
    gravity: Option<f64>,

    /// Seconds of simulated time per tick.
    #[arg(short = 'r', long = "resolution")]
    time_resolution: Option<f64>,

    /// Starting x coordinate (m).
    #[arg(long)]
    start_x: Option<f64>,

    /// Starting y coordinate (m).
    #[arg(long)]
    start_y: Option<f64>,

    /// Starting height (m).
    #[arg(short = 'z', long)]
    start_z: Option<f64>,

    /// Base terminal velocity (m/s).
    #[arg(short = 't', long)]
    terminal_velocity: Option<f64>,

    /// Percent chance per tick of an x/y acceleration change.
    #[arg(short = 's', long = "spread")]
    spread_factor: Option<f64>,

    /// Random seed.
    #[arg(short = 'e', long = "seed")]
    random_seed: Option<u64>,

    /// Transmit power of every node.
    #[arg(short = 'p', long = "power")]
    default_power_output: Option<f64>,

    /// Write output files (0 or 1).
    #[arg(short = 'o', long)]
    output: Option<u8>,

    /// Number of channel groups.
    #[arg(short = 'm', long)]
    group_max: Option<usize>,

    /// Seconds of simulated time between output records.
    #[arg(long)]
    write_interval: Option<f64>,

    /// Size of the channel space.
    #[arg(long = "channels")]
    channel_count: Option<usize>,

    /// Number of low-id nodes that broadcast instead of scanning.
    #[arg(long)]
    broadcast_count: Option<usize>,

    /// Directory the timestamped run directories are created in.
    #[arg(long)]
    output_root: Option<PathBuf>,

    /// Trace nodes: comma-separated ids, `node:<id>`, or `*` for all.
    #[arg(long)]
    trace: Option<String>,

    /// Print run statistics as JSON.
    #[arg(long)]
    json: bool,

    /// Stop with an error after this many ticks.
    #[arg(long)]
    max_ticks: Option<u64>,
}

impl Cli {
    /// Resolve settings: defaults, then the YAML file, then options.
    fn settings(&self) -> Result<Settings, RunnerError> {
        let mut settings = match &self.config {
            Some(path) => Settings::from_yaml_file(path)?,
            None => Settings::default(),
        };

        macro_rules! override_with {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = self.$field.clone() {
                    settings.$field = value;
                })*
            };
        }
        override_with!(
            debug,
            node_count,
            gravity,
            time_resolution,
            start_x,
            start_y,
            start_z,
            terminal_velocity,
            spread_factor,
            default_power_output,
            group_max,
            write_interval,
            channel_count,
            broadcast_count,
            output_root,
        );
        if let Some(seed) = self.random_seed {
            settings.random_seed = Some(seed);
        }
        if let Some(verbose) = self.verbose {
            settings.verbose = verbose != 0;
        }
        if let Some(output) = self.output {
            settings.output = output != 0;
        }
        Ok(settings)
    }
}

fn default_filter(debug: u8) -> &'static str {
    match debug {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn print_settings(settings: &Settings, seed: u64) {
    println!("Node count:           {}", settings.node_count);
    println!("Gravity:              {}", settings.gravity);
    println!("Time resolution:      {}", settings.time_resolution);
    println!(
        "Start position:       ({}, {}, {})",
        settings.start_x, settings.start_y, settings.start_z
    );
    println!("Terminal velocity:    {}", settings.terminal_velocity);
    println!("Spread factor:        {}", settings.spread_factor);
    println!("Power output:         {}", settings.default_power_output);
    println!("Channels:             {}", settings.channel_count);
    println!("Group max:            {}", settings.group_max);
    println!("Broadcasters:         {}", settings.broadcast_count);
    println!("Random seed:          {}", seed);
    println!("Output:               {}", settings.output);
}

fn print_summary(settings: &Settings, stats: &SimulationStats) {
    println!("Simulation complete");
    println!("Run time:             {:.3}s", stats.wall_time_ms as f64 / 1000.0);
    println!("Simulation time:      {:.6}s", stats.final_time_us as f64 / 1_000_000.0);
    for node in &stats.nodes {
        let outcome = node
            .outcome
            .map(|o| o.to_string())
            .unwrap_or_else(|| "unfinished".to_string());
        println!("node {:<4} {}", node.id, outcome);
    }
    if settings.debug > 0 {
        for node in &stats.nodes {
            println!(
                "node {:<4} velocity ({:.6}, {:.6}, {:.6}) position ({:.6}, {:.6}, {:.6})",
                node.id,
                node.velocity.x,
                node.velocity.y,
                node.velocity.z,
                node.position.x,
                node.position.y,
                node.position.z,
            );
        }
    }
}

fn main() -> Result<(), RunnerError> {
    let cli = Cli::parse();
    let settings = cli.settings()?;

    // RUST_LOG wins over the debug level.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(settings.debug)));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    lfgsim_metrics::describe_metrics();

    let tracer = match &cli.trace {
        Some(spec) => NodeTracer::new(NodeTracerConfig::from_spec(spec)),
        None => NodeTracer::disabled(),
    };

    let started = Instant::now();
    let mut sim = Simulation::new(settings.clone(), tracer)?;
    if settings.verbose {
        print_settings(&settings, sim.seed());
    }

    let mut writer = if settings.output {
        Some(OutputWriter::create(&settings, sim.nodes())?)
    } else {
        None
    };
    if settings.verbose {
        if let Some(writer) = &writer {
            println!("Output directory:     {}", writer.dir().display());
        }
        println!("Starting simulation");
    }

    let stats = sim.run(writer.as_mut(), cli.max_ticks)?;
    tracing::info!("run finished in {:?}", started.elapsed());

    if settings.verbose {
        print_summary(&settings, &stats);
    }
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    }
    Ok(())
}
