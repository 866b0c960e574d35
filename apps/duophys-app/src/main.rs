//! duophys command line.
//!
//! Provides two modes of operation:
//! - `headless`: Build a scene, run it through the manager and print metrics
//! - `info`: Print the detected device, its tier and the effective config

use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use duophys_gameplay::prelude::*;
use duophys_physics::prelude::*;
use nalgebra::Vector3;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

/// Dimension-agnostic physics runner.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a generated scene and print metrics and the quality trace.
    Headless {
        /// World dimension: 2d or 3d.
        #[arg(short, long, default_value = "3d")]
        dimension: Dimension,

        /// Frames to simulate.
        #[arg(short, long, default_value_t = 600)]
        frames: u32,

        /// Dynamic bodies in the scene.
        #[arg(short, long, default_value_t = 100)]
        bodies: u32,

        /// Override the detected device tier: low, medium or high.
        #[arg(short, long)]
        tier: Option<DeviceTier>,

        /// Host frame time fed to the optimizer, in milliseconds.
        #[arg(long, default_value_t = 1000.0 / 60.0)]
        frame_ms: f32,

        /// Particles per second from a fountain above the pile.
        #[arg(long, default_value_t = 0.0)]
        particles: f32,

        /// TOML configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print device detection and the effective configuration.
    Info {
        /// TOML configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

struct HeadlessArgs {
    dimension: Dimension,
    frames: u32,
    bodies: u32,
    tier: Option<DeviceTier>,
    frame_ms: f32,
    particles: f32,
    config: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Mode implementations
// ---------------------------------------------------------------------------

fn load_config(path: Option<&Path>) -> Result<PhysicsConfig, ConfigError> {
    match path {
        Some(path) => {
            info!("duophys: loading config from {}", path.display());
            PhysicsConfig::load(path)
        }
        None => Ok(PhysicsConfig::default()),
    }
}

/// Ground plus a pile of alternating balls and boxes above it.
fn build_scene(manager: &mut PhysicsManager, bodies: u32) -> Result<(), PhysicsError> {
    manager.create_body(
        SimpleBodyConfig::new(
            SimpleShape::Box {
                width: 60.0,
                height: 1.0,
                depth: 60.0,
            },
            [0.0, 0.0, 0.0],
        )
        .fixed(),
    )?;

    let columns = 10;
    for i in 0..bodies {
        let x = (i % columns) as f32 * 1.2 - 5.4;
        let y = 2.0 + (i / columns) as f32 * 1.2;
        let shape = if i % 2 == 0 {
            SimpleShape::Sphere { radius: 0.4 }
        } else {
            SimpleShape::Box {
                width: 0.8,
                height: 0.8,
                depth: 0.8,
            }
        };
        let material = ["default", "rubber", "wood", "metal"][(i % 4) as usize];
        manager.create_body(SimpleBodyConfig::new(shape, [x, y, 0.0]).with_material(material))?;
    }
    Ok(())
}

fn run_headless(args: HeadlessArgs) -> Result<(), Box<dyn Error>> {
    let config = load_config(args.config.as_deref())?;
    let mut manager = PhysicsManager::new(config, DeviceInfo::from_host());
    pollster::block_on(manager.initialize(args.dimension, None))?;
    if let Some(tier) = args.tier {
        manager.set_device_tier(tier)?;
    }
    let events = manager.mailbox();
    manager.create_world(None)?;
    build_scene(&mut manager, args.bodies)?;

    let mut fountain = (args.particles > 0.0).then(|| {
        ParticleEmitter::new(
            Vector3::new(0.0, 20.0, 0.0),
            EmitterSettings {
                rate: args.particles,
                lifetime: 2.0,
                ..EmitterSettings::default()
            },
        )
    });

    let dt = args.frame_ms / 1000.0;
    let mut trace = Vec::new();
    for frame in 0..args.frames {
        manager.update(dt)?;
        if let Some(fountain) = fountain.as_mut() {
            fountain.update(manager.world_mut()?, dt);
        }
        for event in events.drain() {
            if let ManagerEvent::QualityChanged { from, to } = event {
                trace.push((frame, from, to));
            }
        }
    }

    let metrics = manager.performance_metrics()?;
    let world = manager.world()?;
    println!(
        "{} world, {} frames, {:.2}s simulated",
        world.engine_type(),
        args.frames,
        world.simulated_time()
    );
    println!(
        "tier={}, quality={}",
        manager.tier(),
        manager
            .quality()
            .map_or_else(|| "none".to_string(), |q| q.to_string())
    );
    println!();
    println!("metrics:");
    println!("  bodies           {}", metrics.bodies);
    println!("  active           {}", metrics.active_bodies);
    println!("  sleeping         {}", metrics.sleeping_bodies);
    println!("  contacts         {}", metrics.contacts);
    println!("  pooled handles   {}", metrics.pooled_handles);
    println!("  avg step         {:.3} ms", metrics.average_step_ms);
    println!("  last step        {:.3} ms", metrics.last_step_ms);
    println!("  est. memory      {} bytes", metrics.estimated_memory_bytes);

    println!();
    if trace.is_empty() {
        println!("quality trace: unchanged");
    } else {
        println!("quality trace:");
        for (frame, from, to) in trace {
            println!("  frame {frame:>5}: {from} -> {to}");
        }
    }

    let degradations = world.degradations();
    if !degradations.is_empty() {
        println!();
        println!("degradations:");
        for degradation in degradations {
            println!("  {degradation}");
        }
    }
    Ok(())
}

fn run_info(config: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let device = DeviceInfo::from_host();
    let config = load_config(config)?;
    println!("duophys v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("device:");
    println!("  user agent  {}", device.user_agent);
    println!("  cores       {}", device.cores);
    println!(
        "  memory      {}",
        device
            .memory_gb
            .map_or_else(|| "unknown".to_string(), |gb| format!("{gb} GB"))
    );
    println!("  mobile      {}", device.is_mobile());
    println!("  tier        {}", device.tier());
    println!();
    println!("config:");
    print!("{}", config.to_toml_string()?);
    Ok(())
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Some(Commands::Headless {
            dimension,
            frames,
            bodies,
            tier,
            frame_ms,
            particles,
            config,
        }) => run_headless(HeadlessArgs {
            dimension,
            frames,
            bodies,
            tier,
            frame_ms,
            particles,
            config,
        }),
        Some(Commands::Info { config }) => run_info(config.as_deref()),
        None => run_headless(HeadlessArgs {
            dimension: Dimension::Three,
            frames: 600,
            bodies: 100,
            tier: None,
            frame_ms: 1000.0 / 60.0,
            particles: 0.0,
            config: None,
        }),
    };
    if let Err(e) = result {
        error!("duophys: {e}");
        std::process::exit(1);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_arguments_parse() {
        let cli = Cli::try_parse_from([
            "duophys", "headless", "-d", "2d", "--frames", "10", "--tier", "low",
        ])
        .unwrap();
        let Some(Commands::Headless {
            dimension,
            frames,
            bodies,
            tier,
            ..
        }) = cli.command
        else {
            panic!("expected headless");
        };
        assert_eq!(dimension, Dimension::Two);
        assert_eq!(frames, 10);
        assert_eq!(bodies, 100);
        assert_eq!(tier, Some(DeviceTier::Low));
    }

    #[test]
    fn unknown_tier_is_rejected() {
        assert!(Cli::try_parse_from(["duophys", "headless", "--tier", "ultra"]).is_err());
    }

    #[test]
    fn small_scene_runs() {
        run_headless(HeadlessArgs {
            dimension: Dimension::Two,
            frames: 5,
            bodies: 4,
            tier: Some(DeviceTier::Medium),
            frame_ms: 1000.0 / 60.0,
            particles: 30.0,
            config: None,
        })
        .unwrap();
    }
}
