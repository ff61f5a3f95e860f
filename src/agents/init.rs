//! Initial-condition generators.
//!
//! Each species configures an `InitCondit` section whose `type` selects how
//! the population's starting snapshot is produced. `none` skips the snapshot
//! entirely and leaves the constructor state in place.

use super::{PredSnapshot, PreySnapshot};
use crate::config;
use crate::error::{Error, Result};
use crate::random;
use crate::torus;
use crate::vector::Vec2;
use crate::world::World;
use rand::Rng;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

/// Parsed `InitCondit` section.
#[derive(Debug, Clone)]
pub enum InitCondit {
    /// Leave the constructor state untouched.
    None,
    /// Uniform positions, random unit headings.
    Random,
    /// Like `Random`, but the agents start dead (predators staged for later
    /// release).
    RandomDead,
    /// A loose flock in a `radius`-sized square at the origin corner, all
    /// heading roughly along `dir`.
    Flock {
        speed: f32,
        dir: Vec2,
        radius: f32,
        rad_dev: f32,
    },
    /// Like `Flock`, around an explicit position.
    Defined {
        speed: f32,
        pos: Vec2,
        dir: Vec2,
        radius: f32,
        rad_dev: f32,
    },
    /// Rows from a snapshot CSV (header skipped).
    Csv { file: PathBuf },
}

impl InitCondit {
    pub fn from_config(j: &Value, ctx: &str) -> Result<Self> {
        let ty = config::str_field(j, "type", ctx)?;
        match ty {
            "none" => Ok(InitCondit::None),
            "random" => Ok(InitCondit::Random),
            "random_dead" => Ok(InitCondit::RandomDead),
            "flock" => Ok(InitCondit::Flock {
                speed: config::num_f32(j, "speed", ctx)?,
                dir: config::vec2_field(j, "dir", ctx)?,
                radius: config::num_f32(j, "radius", ctx)?,
                rad_dev: config::num_f32(j, "degdev", ctx)?.to_radians(),
            }),
            "defined" => Ok(InitCondit::Defined {
                speed: config::num_f32(j, "speed", ctx)?,
                pos: config::vec2_field(j, "pos", ctx)?,
                dir: config::vec2_field(j, "dir", ctx)?,
                radius: config::num_f32(j, "radius", ctx)?,
                rad_dev: config::num_f32(j, "degdev", ctx)?.to_radians(),
            }),
            "csv" => Ok(InitCondit::Csv {
                file: PathBuf::from(config::str_field(j, "file", ctx)?),
            }),
            other => Err(Error::UnknownInitializer(other.to_string())),
        }
    }
}

fn sampled_heading<R: Rng>(dir0: Vec2, rad_dev: f32, rng: &mut R) -> Vec2 {
    let a = if rad_dev > 0.0 {
        rand_distr::Distribution::sample(&rand_distr::Normal::new(0.0, rad_dev).unwrap(), rng)
    } else {
        0.0
    };
    dir0.rotate(a).safe_normalize(Vec2::x_hat())
}

fn csv_rows(file: &PathBuf, n: usize) -> Result<Vec<String>> {
    let text = fs::read_to_string(file)
        .map_err(|e| Error::Config(format!("cannot read snapshot {}: {e}", file.display())))?;
    let rows: Vec<String> = text
        .lines()
        .skip(1) // header
        .filter(|l| !l.trim().is_empty())
        .map(str::to_string)
        .collect();
    if rows.len() < n {
        return Err(Error::Config(format!(
            "snapshot {} holds {} rows, population needs {n}",
            file.display(),
            rows.len()
        )));
    }
    Ok(rows)
}

/// Generates the initial snapshot for the prey population, or `None` for the
/// `none` initializer. `random_dead` is rejected: prey aliveness is not part
/// of the prey snapshot.
pub fn prey_init(ic: &InitCondit, n: usize, world: World) -> Result<Option<Vec<PreySnapshot>>> {
    let mut rng = rand::rng();
    match ic {
        InitCondit::None => Ok(None),
        InitCondit::Random => Ok(Some(
            (0..n)
                .map(|_| PreySnapshot {
                    pos: Vec2::new(
                        rng.random_range(0.0..world.wh),
                        rng.random_range(0.0..world.wh),
                    ),
                    dir: random::unit_vec(&mut rng),
                    ..PreySnapshot::default()
                })
                .collect(),
        )),
        InitCondit::Flock {
            speed,
            dir,
            radius,
            rad_dev,
        } => Ok(Some(
            (0..n)
                .map(|_| PreySnapshot {
                    pos: torus::wrap(
                        world.wh,
                        Vec2::new(
                            *radius * rng.random_range(0.0..1.0f32),
                            *radius * rng.random_range(0.0..1.0f32),
                        ),
                    ),
                    dir: sampled_heading(*dir, *rad_dev, &mut rng),
                    speed: *speed,
                    accel: Vec2::zero(),
                })
                .collect(),
        )),
        InitCondit::Defined {
            speed,
            pos,
            dir,
            radius,
            rad_dev,
        } => Ok(Some(
            (0..n)
                .map(|_| PreySnapshot {
                    pos: torus::wrap(
                        world.wh,
                        *pos + Vec2::new(
                            *radius * rng.random_range(0.0..1.0f32),
                            *radius * rng.random_range(0.0..1.0f32),
                        ),
                    ),
                    dir: sampled_heading(*dir, *rad_dev, &mut rng),
                    speed: *speed,
                    accel: Vec2::zero(),
                })
                .collect(),
        )),
        InitCondit::Csv { file } => {
            let rows = csv_rows(file, n)?;
            rows[..n].iter().map(|r| PreySnapshot::from_csv_row(r)).collect::<Result<Vec<_>>>().map(Some)
        }
        InitCondit::RandomDead => Err(Error::Config(
            "initializer `random_dead` only applies to predators".into(),
        )),
    }
}

/// Generates the initial snapshot for the predator population.
pub fn pred_init(ic: &InitCondit, n: usize, world: World) -> Result<Option<Vec<PredSnapshot>>> {
    let mut rng = rand::rng();
    let random_entry = |rng: &mut rand::rngs::ThreadRng, alive: bool| PredSnapshot {
        pos: Vec2::new(
            rng.random_range(0.0..world.wh),
            rng.random_range(0.0..world.wh),
        ),
        dir: random::unit_vec(rng),
        speed: 0.0,
        accel: Vec2::zero(),
        alive,
    };
    match ic {
        InitCondit::None => Ok(None),
        InitCondit::Random => Ok(Some((0..n).map(|_| random_entry(&mut rng, true)).collect())),
        InitCondit::RandomDead => Ok(Some((0..n).map(|_| random_entry(&mut rng, false)).collect())),
        InitCondit::Defined {
            speed,
            pos,
            dir,
            radius,
            rad_dev,
        } => Ok(Some(
            (0..n)
                .map(|_| PredSnapshot {
                    pos: torus::wrap(
                        world.wh,
                        *pos + Vec2::new(
                            *radius * rng.random_range(0.0..1.0f32),
                            *radius * rng.random_range(0.0..1.0f32),
                        ),
                    ),
                    dir: sampled_heading(*dir, *rad_dev, &mut rng),
                    speed: *speed,
                    accel: Vec2::zero(),
                    alive: true,
                })
                .collect(),
        )),
        InitCondit::Csv { file } => {
            let rows = csv_rows(file, n)?;
            rows[..n].iter().map(|r| PredSnapshot::from_csv_row(r)).collect::<Result<Vec<_>>>().map(Some)
        }
        InitCondit::Flock { .. } => Err(Error::Config(
            "initializer `flock` only applies to prey".into(),
        )),
    }
}
