//! # Observer Chain
//!
//! Observers receive lifecycle notifications from the run driver — one
//! [`Msg::Tick`] per simulation step, in strict tick order, from the worker
//! thread, always *outside* the kernel lock — and read the simulation
//! through its gates. The analysis observers sample at a configurable
//! period, buffer rows in memory and flush CSV files on `Finished` or when
//! the buffer grows past [`sink::FLUSH_ROWS`].
//!
//! Observer I/O failures after construction are logged, never propagated:
//! nothing is allowed to unwind into the tick loop.
//!
//! ## Submodules
//!
//! - [`sink`]: buffered CSV emission and the sampling clock
//! - [`timeseries`]: per-prey kinematics and predator-relative measures
//! - [`flockdata`]: per-flock aggregate rows
//! - [`neighbors`]: full sorted neighbor tables per prey
//! - [`forces`]: the prey coordination force angles
//! - [`snapshot`]: on-demand population snapshots
//! - [`export`]: composed-config and marker-file export

pub mod export;
pub mod flockdata;
pub mod forces;
pub mod neighbors;
pub mod sink;
pub mod snapshot;
pub mod timeseries;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::simulation::Simulation;
use chrono::Local;
use log::info;
use rand::Rng;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// Lifecycle notifications delivered to the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Msg {
    Tick,
    Initialized,
    Finished,
}

/// A sink for simulation notifications. `notify_once` serves on-demand
/// requests (snapshot dumps); the periodic observers ignore it.
pub trait Observer: Send {
    fn notify(&mut self, msg: Msg, sim: &Simulation);

    fn notify_once(&mut self, _sim: &Simulation) {}
}

/// An ordered collection of observers, notified front to back.
#[derive(Default)]
pub struct ObserverChain {
    observers: Vec<Box<dyn Observer>>,
}

impl ObserverChain {
    pub fn new() -> Self {
        ObserverChain::default()
    }

    pub fn append(&mut self, observer: Box<dyn Observer>) {
        self.observers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn notify(&mut self, msg: Msg, sim: &Simulation) {
        for obs in &mut self.observers {
            obs.notify(msg, sim);
        }
    }

    pub fn notify_once(&mut self, sim: &Simulation) {
        for obs in &mut self.observers {
            obs.notify_once(sim);
        }
    }
}

/// Creates the output folder for one run:
/// `<cwd>/simulated_data/<data_folder>/<local datetime><epoch><random>/`.
pub fn unique_output_folder(data_folder: &str) -> Result<PathBuf> {
    let stamp = Local::now().format("%Y%m%d%H%M%S");
    let epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let suffix: u32 = rand::rng().random_range(0..1000);
    let dir = std::env::current_dir()?
        .join("simulated_data")
        .join(data_folder)
        .join(format!("{stamp}{epoch}{suffix}"));
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Builds the observer chain configured under `Simulation.Analysis`, plus
/// the config-export observer. Returns the chain and the run's output
/// folder (`None` when analysis is disabled and no data will be written).
pub fn create_observer_chain(
    cfg: &Config,
    config_name: &str,
) -> Result<(ObserverChain, Option<PathBuf>)> {
    let mut chain = ObserverChain::new();
    let Some(analysis) = &cfg.simulation.analysis else {
        info!("no analysis section; data extraction disabled");
        return Ok((chain, None));
    };
    if analysis.data_folder.is_empty() {
        info!("empty data folder; data extraction disabled");
        return Ok((chain, None));
    }

    let out_dir = unique_output_folder(&analysis.data_folder)?;
    let world = cfg.world();

    for spec in &analysis.observers {
        let obs: Box<dyn Observer> = match spec.kind.as_str() {
            "TimeSeries" => Box::new(timeseries::TimeSeriesObserver::new(&out_dir, spec, world)?),
            "FlockData" => Box::new(flockdata::FlockObserver::new(&out_dir, spec, world)?),
            "NeighbData" => Box::new(neighbors::AllNeighborsObserver::new(
                &out_dir, spec, world, cfg.prey.n,
            )?),
            "SnapShot" => Box::new(snapshot::SnapshotObserver::new(&out_dir, spec)),
            "CoordForces" => Box::new(forces::ForcesObserver::new(&out_dir, spec, world)?),
            other => return Err(Error::UnknownObserver(other.to_string())),
        };
        chain.append(obs);
    }
    chain.append(Box::new(export::ConfigExportObserver::new(
        &cfg.raw,
        &out_dir,
        config_name,
    )?));
    Ok((chain, Some(out_dir)))
}
