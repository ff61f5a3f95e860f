//! # Agent Module - Prey and Predator Species
//!
//! This module defines the two agent species of the model and the data they
//! exchange with the rest of the system:
//!
//! - [`prey::Prey`] and [`predator::Pred`], the per-agent structs built around
//!   a shared physical [`Body`](crate::flight::Body),
//! - the read-only *frames* ([`PreyView`], [`PredView`]) the kernel publishes
//!   at the start of every tick so steering actions can read the whole
//!   population while their own agent is being mutated,
//! - the snapshot entries used to save and restore a population, with their
//!   CSV row format,
//! - the per-species color-map projections consumed by a renderer,
//! - the initial-condition generators ([`init`]).
//!
//! ## Submodules
//!
//! - [`prey`]: the flocking prey agent
//! - [`predator`]: the hunting predator agent
//! - [`init`]: initial-condition generators (`InitCondit` config section)
//! - [`tests`]: unit tests for snapshots, CSV round trips and color maps

use crate::error::{Error, Result};
use crate::flight::Body;
use crate::vector::Vec2;

pub mod init;
pub mod predator;
pub mod prey;
// Unit tests
pub mod tests;

pub use predator::Pred;
pub use prey::Prey;

/// Common surface of the two species: access to the physical body and the
/// hook the state machine calls when a state is left.
pub trait Agent {
    fn body(&self) -> &Body;
    fn body_mut(&mut self) -> &mut Body;

    /// Called on every state exit, before the next state is sampled.
    fn on_state_exit(&mut self) {}
}

/// Read-only per-tick view of one prey, published in the kernel's frame.
#[derive(Debug, Clone, Copy)]
pub struct PreyView {
    pub pos: Vec2,
    pub dir: Vec2,
    pub speed: f32,
    pub alive: bool,
}

/// Read-only per-tick view of one predator.
#[derive(Debug, Clone, Copy)]
pub struct PredView {
    pub pos: Vec2,
    pub dir: Vec2,
    pub speed: f32,
    /// The prey individual the predator is locked on, if any.
    pub target: Option<u32>,
    pub alive: bool,
}

/// Minimal restartable state of one prey.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct PreySnapshot {
    pub pos: Vec2,
    pub dir: Vec2,
    pub speed: f32,
    pub accel: Vec2,
}

/// Minimal restartable state of one predator; additionally carries the alive
/// flag so hunts can be staged from files.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PredSnapshot {
    pub pos: Vec2,
    pub dir: Vec2,
    pub speed: f32,
    pub accel: Vec2,
    pub alive: bool,
}

impl Default for PredSnapshot {
    fn default() -> Self {
        PredSnapshot {
            pos: Vec2::zero(),
            dir: Vec2::zero(),
            speed: 0.0,
            accel: Vec2::zero(),
            alive: true,
        }
    }
}

fn csv_fields(line: &str, ctx: &str) -> Result<Vec<f32>> {
    line.split(',')
        .map(|f| {
            f.trim()
                .parse::<f32>()
                .map_err(|_| Error::Config(format!("{ctx}: bad csv field `{}`", f.trim())))
        })
        .collect()
}

impl PreySnapshot {
    /// Parses a `id,posx,posy,dirx,diry,speed,accelx,accely` row; the id
    /// column is discarded (rows are applied in population order).
    pub fn from_csv_row(line: &str) -> Result<Self> {
        let f = csv_fields(line, "prey snapshot")?;
        if f.len() < 8 {
            return Err(Error::Config(format!(
                "prey snapshot row has {} fields, expected 8",
                f.len()
            )));
        }
        Ok(PreySnapshot {
            pos: Vec2::new(f[1], f[2]),
            dir: Vec2::new(f[3], f[4]),
            speed: f[5],
            accel: Vec2::new(f[6], f[7]),
        })
    }

    pub fn to_csv_row(&self, id: usize) -> String {
        format!(
            "{},{},{},{},{},{},{},{}",
            id, self.pos.x, self.pos.y, self.dir.x, self.dir.y, self.speed, self.accel.x,
            self.accel.y
        )
    }
}

impl PredSnapshot {
    /// Parses a `id,posx,posy,dirx,diry,speed,accelx,accely,alive` row.
    pub fn from_csv_row(line: &str) -> Result<Self> {
        let f = csv_fields(line, "predator snapshot")?;
        if f.len() < 9 {
            return Err(Error::Config(format!(
                "predator snapshot row has {} fields, expected 9",
                f.len()
            )));
        }
        Ok(PredSnapshot {
            pos: Vec2::new(f[1], f[2]),
            dir: Vec2::new(f[3], f[4]),
            speed: f[5],
            accel: Vec2::new(f[6], f[7]),
            alive: f[8] != 0.0,
        })
    }

    pub fn to_csv_row(&self, id: usize) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{}",
            id,
            self.pos.x,
            self.pos.y,
            self.dir.x,
            self.dir.y,
            self.speed,
            self.accel.x,
            self.accel.y,
            self.alive as u8
        )
    }
}

/// Per-species snapshot vectors; an empty vector means "leave that species
/// untouched" when installing.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SpeciesSnapshots {
    pub prey: Vec<PreySnapshot>,
    pub preds: Vec<PredSnapshot>,
}

/// Renderer scalar selection for prey.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreyColorMap {
    None,
    Idx,
    Speed,
    Banking,
    State,
    Flock,
    Targeted,
}

/// Renderer scalar selection for predators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredColorMap {
    None,
    Speed,
    State,
}
