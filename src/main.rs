//! Run driver: composes the configuration, builds the simulation and the
//! observer chain, and runs the tick loop on a worker thread to `Tmax`.
//!
//! This build carries no viewer; a viewer would sit on the main thread here,
//! pace the worker and read the kernel through its gates. Without one the
//! `--headless` flag is accepted and implied.

use clap::Parser;
use log::{error, info, warn};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use torusflock::agents::SpeciesSnapshots;
use torusflock::cli::Cli;
use torusflock::config::{self, Config};
use torusflock::observers::{self, Msg, ObserverChain};
use torusflock::simulation::Simulation;
use torusflock::world::Tick;
use torusflock::Result;

/// The worker loop: install initial snapshots, tick to `tmax` or
/// termination, dump a final snapshot and announce the finish. Always ends
/// with a `Finished` notification so observers flush their buffers.
fn run_simulation(
    sim: &Simulation,
    observers: &mut ObserverChain,
    snapshots: &SpeciesSnapshots,
    tmax: Tick,
) -> Result<()> {
    let result = sim.initialize(observers, snapshots);
    if result.is_ok() {
        while !sim.terminated() {
            sim.update(observers);
            if sim.tick() == tmax {
                break;
            }
        }
        observers.notify_once(sim);
    }
    observers.notify(Msg::Finished, sim);
    result
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    if !cli.headless {
        warn!("built without a viewer; running headless");
    }

    let paths = cli.config_paths();
    let cfg = Config::from_files(&paths)?;
    if cli.exp_files {
        config::save(&cfg.raw, Path::new("composed_config.json"))?;
    }

    let threads = cfg.simulation.num_threads;
    if threads > 0 {
        let max = std::thread::available_parallelism().map_or(1, |n| n.get());
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads((threads as usize).clamp(1, max))
            .build_global();
        if let Err(e) = pool {
            warn!("thread pool already initialized: {e}");
        }
    }

    let (mut chain, out_dir) = observers::create_observer_chain(&cfg, &cli.config_name())?;
    if let Some(dir) = &out_dir {
        info!("writing run data to {}", dir.display());
    }

    let world = cfg.world();
    let tmax = world.to_ticks(cfg.simulation.tmax);
    let sim = Arc::new(Simulation::new(&cfg)?);
    info!(
        "simulation ready: {} prey, {} predators, dt {} s, world {} m, {} ticks",
        cfg.prey.n, cfg.pred.n, world.dt, world.wh, tmax
    );

    // the worker owns the loop; the main thread would host a viewer
    let worker_sim = Arc::clone(&sim);
    let worker = thread::spawn(move || {
        let result = run_simulation(&worker_sim, &mut chain, &SpeciesSnapshots::default(), tmax);
        if let Err(e) = &result {
            error!("worker stopped: {e}");
        }
        result
    });

    worker
        .join()
        .expect("simulation worker panicked")?;
    info!("finished at tick {}", sim.tick());
    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        error!("{e}");
        eprintln!("{e}");
        std::process::exit(-1);
    }
}
